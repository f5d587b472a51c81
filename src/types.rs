//! Core identifiers shared across the process core.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process identifier, locally unique and stable for the process's lifetime.
///
/// Mirrors AtomVM's `local_process_id`: a small integer rather than a UUID,
/// since processes never leave the local node (see spec Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Pid(pub u64);

impl Pid {
    /// Sentinel used for `group_leader` and similar slots that must always
    /// hold a term-shaped value rather than `Option::None`.
    pub const INVALID: Pid = Pid(0);

    /// Draw a fresh, process-table-unique id.
    ///
    /// In a full VM this would be assigned by the global registry at
    /// `globalcontext_init_process` time (ids can be recycled once a slot is
    /// freed); here we hand out ever-increasing integers, which satisfies
    /// "locally unique" without needing a free-list.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Pid(COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_invalid(&self) -> bool {
        *self == Pid::INVALID
    }
}

impl Default for Pid {
    fn default() -> Self {
        Pid::INVALID
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<0.{}.0>", self.0)
    }
}

/// Monotonic identifier for monitors and reference-tagged messages.
///
/// Always drawn from `GlobalRegistry::next_ref_ticks`, never constructed
/// directly by core code outside of tests.
pub type RefTicks = u64;

/// Process-info keys recognized by `process_get_process_info` (spec §4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessInfoKey {
    HeapSize,
    StackSize,
    MessageQueueLen,
    Memory,
}

impl ProcessInfoKey {
    /// Parse the atom-shaped key used by the interpreter's `process_info/2`
    /// builtin. Unknown keys are the caller's `badarg`, not this function's.
    pub fn from_atom(atom: &str) -> Option<Self> {
        match atom {
            "heap_size" => Some(ProcessInfoKey::HeapSize),
            "stack_size" => Some(ProcessInfoKey::StackSize),
            "message_queue_len" => Some(ProcessInfoKey::MessageQueueLen),
            "memory" => Some(ProcessInfoKey::Memory),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> &'static str {
        match self {
            ProcessInfoKey::HeapSize => "heap_size",
            ProcessInfoKey::StackSize => "stack_size",
            ProcessInfoKey::MessageQueueLen => "message_queue_len",
            ProcessInfoKey::Memory => "memory",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_allocation_is_monotonic_and_unique() {
        let a = Pid::new();
        let b = Pid::new();
        assert!(b.raw() > a.raw());
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_pid_is_the_zero_sentinel() {
        assert!(Pid::INVALID.is_invalid());
        assert!(Pid::default().is_invalid());
        assert!(!Pid::new().is_invalid());
    }

    #[test]
    fn process_info_key_round_trips_through_atom_names() {
        for key in [
            ProcessInfoKey::HeapSize,
            ProcessInfoKey::StackSize,
            ProcessInfoKey::MessageQueueLen,
            ProcessInfoKey::Memory,
        ] {
            assert_eq!(ProcessInfoKey::from_atom(key.as_atom()), Some(key));
        }
        assert_eq!(ProcessInfoKey::from_atom("nonsense"), None);
    }
}
