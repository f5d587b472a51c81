//! Global Registry (spec §4.D/§6, component H): the interface-only
//! collaborator that maps process ids to Process Objects under a
//! per-process lock and issues monotonic ref-ticks. Spec §1 lists the
//! registry's full implementation (process table, atom table, ref-tick
//! generator) as out of scope beyond this interface — no atom table or
//! name-to-pid registry beyond what §6 actually names is implemented here.
//!
//! Grounded on `ream::runtime::ReamRuntime`'s `Arc<DashMap<Pid, ProcessHandle>>`
//! process table, generalized to the "lookup + lock in one call, release
//! with unlock" shape spec §5 calls for, and on `ream::runtime::actor::MonitorRef`'s
//! `AtomicU64` counter for ref-ticks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::hostio::RefTickSource;
use crate::process::{HeapConfig, Process};
use crate::types::Pid;

/// What the registry hands back from a lookup: the same `Arc<Mutex<Process>>`
/// every holder shares, so locking it is exactly "acquiring the per-process
/// lock" from spec §5.
pub type ProcessLock = Arc<Mutex<Process>>;

/// Process table + name registry + ref-tick counter. A real VM also bundles
/// the atom table here (`globalcontext_get_ref_ticks` and friends); that
/// table belongs to the module-loading subsystem this crate does not
/// implement, so it is absent.
#[derive(Debug, Default)]
pub struct GlobalRegistry {
    processes: DashMap<Pid, ProcessLock>,
    names: DashMap<String, Pid>,
    ref_ticks: AtomicU64,
}

impl GlobalRegistry {
    pub fn new() -> Self {
        GlobalRegistry {
            processes: DashMap::new(),
            names: DashMap::new(),
            ref_ticks: AtomicU64::new(1),
        }
    }

    /// `globalcontext_init_process(glb, ctx)` / `process_new(glb) -> &mut
    /// Process` (spec §6): allocate a fresh process, assign it `pid`, and
    /// install it into the table. The pid is drawn before construction so
    /// `Process::new` can be handed its final identity directly.
    pub fn spawn(&self, heap_config: HeapConfig) -> ProcessLock {
        let pid = Pid::new();
        let process = Arc::new(Mutex::new(Process::new(pid, heap_config)));
        self.processes.insert(pid, Arc::clone(&process));
        tracing::info!(%pid, "process installed into registry");
        process
    }

    /// `globalcontext_get_process_lock(glb, pid) -> option<&Process>` (spec
    /// §6): returns the shared lock, or `None` if the pid was never
    /// installed or has already gone through Teardown step 1.
    pub fn get_process_lock(&self, pid: Pid) -> Option<ProcessLock> {
        self.processes.get(&pid).map(|entry| Arc::clone(entry.value()))
    }

    /// Convenience over `get_process_lock` for call sites that only need to
    /// check liveness, not actually touch the process.
    pub fn is_alive(&self, pid: Pid) -> bool {
        self.processes.contains_key(&pid)
    }

    /// Teardown step 1: "Remove self from the global process table. After
    /// this point, no new sender may acquire a per-process lock on this
    /// process — but senders that already hold the lock continue." Removing
    /// the `DashMap` entry does exactly this: existing `Arc<Mutex<Process>>`
    /// clones already in another thread's hands keep working until dropped.
    pub fn remove_process(&self, pid: Pid) {
        self.processes.remove(&pid);
        tracing::info!(%pid, "process removed from registry");
    }

    /// Teardown step 2: unregister the process's name, if any.
    pub fn unregister_name(&self, pid: Pid) {
        self.names.retain(|_, registered_pid| *registered_pid != pid);
    }

    pub fn register_name(&self, name: impl Into<String>, pid: Pid) {
        self.names.insert(name.into(), pid);
    }

    pub fn whereis(&self, name: &str) -> Option<Pid> {
        self.names.get(name).map(|entry| *entry.value())
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }
}

impl RefTickSource for GlobalRegistry {
    /// `globalcontext_get_ref_ticks(glb) -> u64` (spec §6): strictly
    /// increasing monotonic counter, shared by every process's `monitor`
    /// call so refs are globally unique.
    fn next_ref_ticks(&self) -> u64 {
        self.ref_ticks.fetch_add(1, Ordering::SeqCst)
    }
}
