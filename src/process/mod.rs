//! The Process Object (spec §3 / §4.F, component F): binds the heap,
//! mailbox, dictionary, monitor table and flag register together with
//! registers, continuation state, and identity, and exposes the lifecycle
//! operations the interpreter and drivers call.
//!
//! Grounded on `ream::runtime::process::Process` bundling pid/mailbox/links
//! /monitors on one struct behind `ProcessHandle = Arc<RwLock<Process>>`.
//! This crate keeps that shape — the registry (`GlobalRegistry`) owns
//! `Arc<parking_lot::Mutex<Process>>` per process and hands out the guard
//! as the "per-process lock" of spec §5 — rather than splitting Process
//! itself into locked/unlocked halves, which would fight Rust's
//! aliasing rules for no real benefit at this crate's scale. The one field
//! that stays genuinely lock-free is `flags`: its own compare-exchange loop
//! is what spec §4.E and invariant 2 actually require, independent of
//! whatever coarser lock a caller might also be holding.

pub mod dictionary;
pub mod flags;
pub mod heap;
pub mod mailbox;
pub mod monitor;
pub mod signal;
pub mod teardown;

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::hostio::{RefTickSource, TimerHandle};
use crate::term::Term;
use crate::types::{Pid, ProcessInfoKey, RefTicks};

pub use dictionary::Dictionary;
pub use flags::Flags;
pub use heap::{HeapConfig, ProcessHeap};
pub use mailbox::{Mailbox, Signal};
pub use monitor::{MonitorTable, PeerKind};

/// Number of addressable `x` registers — a fixed, small bank appropriate to
/// a resource-constrained VM rather than a growable `Vec`.
pub const REGISTER_COUNT: usize = 16;

/// Fixed overhead charged for the Process Object itself in `process_size`,
/// standing in for `sizeof(Context)` in the original.
const PROCESS_OBJECT_OVERHEAD_BYTES: usize = 128;

/// Word width used to convert heap words into bytes for `process_info(memory)`.
const WORD_SIZE_BYTES: usize = 8;

/// An in-progress binary-match cursor: position into a binary term being
/// matched by the (external) interpreter. A GC root while present (spec
/// §4.A); reset to `None` on process creation.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMatchState {
    pub binary: Term,
    pub offset: usize,
}

/// The saved continuation a process resumes when a trap is cleared:
/// `{module, ip, restore_trap_handler}` in spec §3 prose.
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    pub saved_module: String,
    pub saved_ip: usize,
    pub restore_trap_handler: bool,
}

/// Marker distinguishing *port* processes (driven by a native handler)
/// from ordinary bytecode processes. Only presence matters to this crate;
/// the handler body itself belongs to the embedding VM.
#[derive(Debug, Clone)]
pub struct NativeHandler {
    pub name: Arc<str>,
}

/// Per-process call/send/receive counters, recovered from context.c's
/// `#ifdef ENABLE_ADVANCED_TRACE` block (SPEC_FULL §3).
#[cfg(feature = "advanced-trace")]
#[derive(Debug, Default)]
pub struct AdvancedTrace {
    pub calls: u64,
    pub call_args: u64,
    pub returns: u64,
    pub sends: u64,
    pub receives: u64,
}

/// A process: isolated heap+stack, mailbox, registers, links/monitors, and
/// identity (spec §3). Callers reach a `Process` either with exclusive
/// ownership (construction, tests) or through the registry's per-process
/// lock; `flags` is safe to read and update from either situation without
/// that lock.
#[derive(Debug)]
pub struct Process {
    pub pid: Pid,

    heap: ProcessHeap,
    mailbox: Mailbox,
    monitors: MonitorTable,
    trap_exit: bool,
    platform_data: Option<u64>,

    flags: Flags,

    registers: Vec<Term>,
    cp: usize,
    e: usize,
    fr: Option<Vec<f64>>,

    dictionary: Dictionary,
    exit_reason: Term,
    group_leader: Pid,
    native_handler: Option<NativeHandler>,
    continuation: Option<Continuation>,
    bs: Option<BinaryMatchState>,
    timer_list_head: Option<TimerHandle>,
    min_heap_size: Option<usize>,
    max_heap_size: Option<usize>,

    #[cfg(feature = "advanced-trace")]
    pub trace: AdvancedTrace,
}

impl Process {
    /// `process_new(glb, heap_config)` (SPEC_FULL §4.F): allocates the
    /// heap+stack and zeroes registers. Installing the result into the
    /// registry (assigning it a place in the process table, per
    /// `globalcontext_init_process`) is `GlobalRegistry::spawn`'s job, not
    /// this constructor's — a process that fails to allocate its heap is
    /// never installed (registry invariant only needs to hold from a
    /// successfully constructed process onward).
    pub fn new(pid: Pid, heap_config: HeapConfig) -> Self {
        tracing::debug!(%pid, "process created");
        Process {
            pid,
            heap: ProcessHeap::init(heap_config),
            mailbox: Mailbox::new(),
            monitors: MonitorTable::new(),
            trap_exit: false,
            platform_data: None,
            flags: Flags::new(),
            registers: vec![Term::Nil; REGISTER_COUNT],
            cp: 0,
            e: 0,
            fr: None,
            dictionary: Dictionary::new(),
            exit_reason: Term::atom("normal"),
            group_leader: Pid::INVALID,
            native_handler: None,
            continuation: None,
            bs: None,
            timer_list_head: None,
            // GC hints are a separate process-level knob from the heap's
            // own hard ceiling; a fresh process carries neither until the
            // interpreter sets them explicitly.
            min_heap_size: None,
            max_heap_size: None,
            #[cfg(feature = "advanced-trace")]
            trace: AdvancedTrace::default(),
        }
    }

    // --- registers -----------------------------------------------------

    pub fn register(&self, index: usize) -> &Term {
        &self.registers[index]
    }

    pub fn set_register(&mut self, index: usize, value: Term) {
        self.registers[index] = value;
    }

    /// `context_clean_registers(ctx, live)`: reset registers beyond `live`
    /// to a safe default term so a conservative root scan never finds a
    /// stale pointer-shaped value left by an earlier call frame (S7).
    pub fn clear_registers_from(&mut self, live: usize) {
        for slot in self.registers.iter_mut().skip(live) {
            *slot = Term::Nil;
        }
    }

    pub fn continuation_pointer(&self) -> usize {
        self.cp
    }

    pub fn set_continuation_pointer(&mut self, cp: usize) {
        self.cp = cp;
    }

    pub fn stack_pointer(&self) -> usize {
        self.e
    }

    pub fn set_stack_pointer(&mut self, e: usize) {
        self.e = e;
    }

    /// Lazily allocate the floating-point register bank on first use.
    pub fn float_register_mut(&mut self, index: usize) -> &mut f64 {
        if self.fr.is_none() {
            self.fr = Some(vec![0.0; REGISTER_COUNT]);
        }
        &mut self.fr.as_mut().unwrap()[index]
    }

    pub fn free_float_registers(&mut self) {
        self.fr = None;
    }

    // --- owner-only state ------------------------------------------------

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    pub fn exit_reason(&self) -> &Term {
        &self.exit_reason
    }

    pub fn set_exit_reason(&mut self, reason: Term) {
        self.exit_reason = reason;
    }

    pub fn group_leader(&self) -> Pid {
        self.group_leader
    }

    pub fn set_group_leader(&mut self, pid: Pid) {
        self.group_leader = pid;
    }

    pub fn is_port(&self) -> bool {
        self.native_handler.is_some()
    }

    pub fn set_native_handler(&mut self, handler: Option<NativeHandler>) {
        self.native_handler = handler;
    }

    pub fn continuation(&self) -> Option<&Continuation> {
        self.continuation.as_ref()
    }

    pub fn set_continuation(&mut self, continuation: Option<Continuation>) {
        self.continuation = continuation;
    }

    pub fn binary_match_state(&self) -> Option<&BinaryMatchState> {
        self.bs.as_ref()
    }

    pub fn set_binary_match_state(&mut self, bs: Option<BinaryMatchState>) {
        self.bs = bs;
    }

    pub fn timer_handle(&self) -> Option<TimerHandle> {
        self.timer_list_head
    }

    pub fn arm_timer(&mut self, handle: TimerHandle) {
        self.timer_list_head = Some(handle);
    }

    pub fn disarm_timer(&mut self) {
        self.timer_list_head = None;
    }

    pub fn heap_size_hints(&self) -> (Option<usize>, Option<usize>) {
        (self.min_heap_size, self.max_heap_size)
    }

    pub fn set_heap_size_hints(&mut self, min: Option<usize>, max: Option<usize>) {
        self.min_heap_size = min;
        self.max_heap_size = max;
    }

    // --- flags: lock-free regardless of caller's ownership situation ----

    /// `process_update_flags(&Process, mask, value)` (spec §6).
    pub fn update_flags(&self, mask: u32, value: u32) {
        self.flags.update(mask, value);
    }

    pub fn flags(&self) -> u32 {
        self.flags.get()
    }

    pub fn is_trap_set(&self) -> bool {
        self.flags.is_set(flags::TRAP)
    }

    pub fn is_killed(&self) -> bool {
        self.flags.is_set(flags::KILLED)
    }

    // --- heap, mailbox, monitors, trap_exit, platform_data ---------------

    pub fn trap_exit(&self) -> bool {
        self.trap_exit
    }

    pub fn set_trap_exit(&mut self, trap_exit: bool) {
        self.trap_exit = trap_exit;
    }

    pub fn platform_data(&self) -> Option<u64> {
        self.platform_data
    }

    pub fn set_platform_data(&mut self, value: Option<u64>) {
        self.platform_data = value;
    }

    pub fn heap(&self) -> &ProcessHeap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut ProcessHeap {
        &mut self.heap
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn mailbox_mut(&mut self) -> &mut Mailbox {
        &mut self.mailbox
    }

    pub fn monitors(&self) -> &MonitorTable {
        &self.monitors
    }

    pub fn monitors_mut(&mut self) -> &mut MonitorTable {
        &mut self.monitors
    }

    /// `process_message_queue_len` (spec §6).
    pub fn message_queue_len(&self) -> usize {
        self.mailbox.len()
    }

    /// `send(msg_term)` (spec §4.B): copy `msg` onto this process's own
    /// heap, then append it to the mailbox. Called by a sender while
    /// holding this process's per-process lock (via the registry), or by
    /// the owner directly when it has exclusive access.
    pub fn send(&mut self, msg: Term) -> CoreResult<()> {
        self.heap.allocate(msg.word_size())?;
        self.mailbox.send(msg);
        #[cfg(feature = "advanced-trace")]
        {
            self.trace.sends += 1;
        }
        Ok(())
    }

    /// Complete a `receive`: remove the message at the cursor, the way the
    /// interpreter does once a clause has matched it. Kept on `Process`
    /// rather than left to `Mailbox::remove_message` directly so the
    /// `advanced-trace` counters (SPEC_FULL §3) have a single place to tick.
    pub fn receive_remove_message(&mut self) -> Option<Term> {
        let msg = self.mailbox.remove_message();
        #[cfg(feature = "advanced-trace")]
        if msg.is_some() {
            self.trace.receives += 1;
        }
        msg
    }

    /// `send_signal(signal)` (spec §4.B): append to the signal channel and
    /// set `Trap`. The flag write uses the lock-free path regardless of
    /// whether the caller also holds the per-process lock.
    pub fn send_signal(&mut self, signal: Signal) {
        self.mailbox.send_signal(signal);
        self.flags.update(!flags::NO_FLAGS, flags::TRAP);
    }

    /// `monitor(target_pid, linked) -> ref_ticks` (spec §4.D): installs the
    /// observer's half of the relationship on `self` only — the caller
    /// installs the symmetric half on the target when `linked` is true.
    pub fn monitor(&mut self, target: Pid, linked: bool, ref_source: &dyn RefTickSource) -> RefTicks {
        let ref_ticks = ref_source.next_ref_ticks();
        let kind = if self.is_port() { PeerKind::Port } else { PeerKind::Process };
        if linked {
            self.monitors.add_link(target);
        } else {
            self.monitors.add_monitor(target, ref_ticks, kind);
        }
        ref_ticks
    }

    /// `demonitor(target_pid, linked)` (spec §4.D).
    pub fn demonitor(&mut self, target: Pid, linked: bool) {
        self.monitors.demonitor_by_target(target, linked);
    }

    // --- introspection ----------------------------------------------------

    pub fn heap_size(&self) -> usize {
        self.heap.heap_words()
    }

    pub fn stack_size(&self) -> usize {
        self.heap.stack_words()
    }

    /// `process_size` (spec §6): Process Object + mailbox bytes + heap
    /// words × word size.
    pub fn process_size(&self) -> usize {
        let heap_bytes = self.heap.size_in_words() * WORD_SIZE_BYTES;
        let mailbox_bytes = self.mailbox.size_bytes(WORD_SIZE_BYTES);
        PROCESS_OBJECT_OVERHEAD_BYTES + heap_bytes + mailbox_bytes
    }

    /// `process_get_process_info` (spec §4.G / §6), keyed by an
    /// already-parsed `ProcessInfoKey`. Use
    /// [`Process::process_get_process_info_by_atom`] when the caller still
    /// has the raw atom name and needs `badarg` behavior for unknown keys.
    pub fn process_get_process_info(&self, key: ProcessInfoKey) -> Term {
        let value = match key {
            ProcessInfoKey::HeapSize => self.heap_size() as i64,
            ProcessInfoKey::StackSize => self.stack_size() as i64,
            ProcessInfoKey::MessageQueueLen => self.message_queue_len() as i64,
            ProcessInfoKey::Memory => self.process_size() as i64,
        };
        Term::SmallInt(value)
    }

    /// `process_get_process_info(&Process, out, key:atom) -> bool`: unknown
    /// keys yield `CoreError::BadArg` rather than a silent default (spec §7).
    pub fn process_get_process_info_by_atom(&self, key_atom: &str) -> CoreResult<Term> {
        let key = ProcessInfoKey::from_atom(key_atom).ok_or(CoreError::BadArg)?;
        Ok(self.process_get_process_info(key))
    }
}
