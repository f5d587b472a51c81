//! Flag Register (spec §4.E): an atomically-updated bitset controlling
//! execution, consulted by the interpreter at safe points.

use std::sync::atomic::{AtomicU32, Ordering};

/// Bits recognized by the interpreter's safe-point check and by signal
/// processing. Values match the small, stable set context.c's
/// `enum ContextFlags` defines. Plain constants rather than the `bitflags`
/// crate: three stable bits don't carry their weight.
pub const NO_FLAGS: u32 = 0;
pub const TRAP: u32 = 1 << 0;
pub const KILLED: u32 = 1 << 1;
pub const WAITING_TIMEOUT: u32 = 1 << 2;

/// Lock-free atomically-updated flag register.
///
/// `update_flags(mask, value)` is the only mutator, and is implemented as a
/// compare-exchange retry loop under SMP (spec §4.E); the per-process lock
/// described in spec §5 is therefore not required to call it safely from
/// another thread — the CAS loop supplies the needed atomicity on its own.
#[derive(Debug, Default)]
pub struct Flags(AtomicU32);

impl Flags {
    pub fn new() -> Self {
        Flags(AtomicU32::new(NO_FLAGS))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// `(flags & mask) | value`: bits outside `mask` become those of
    /// `value`; bits inside `mask` are preserved from the prior state.
    #[cfg(not(feature = "no-smp"))]
    pub fn update(&self, mask: u32, value: u32) {
        let mut expected = self.0.load(Ordering::Acquire);
        loop {
            let desired = (expected & mask) | value;
            match self.0.compare_exchange_weak(
                expected,
                desired,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => expected = actual,
            }
        }
    }

    /// Single-threaded builds degrade to a plain read-modify-write, per
    /// spec §4.E ("a plain read-modify-write under a uniprocessor build").
    #[cfg(feature = "no-smp")]
    pub fn update(&self, mask: u32, value: u32) {
        let current = self.0.load(Ordering::Relaxed);
        self.0.store((current & mask) | value, Ordering::Relaxed);
    }

    pub fn is_set(&self, bit: u32) -> bool {
        self.get() & bit != 0
    }

    pub fn set_trap(&self) {
        self.update(!NO_FLAGS, TRAP);
    }

    pub fn clear_trap(&self) {
        self.update(!TRAP, NO_FLAGS);
    }

    pub fn set_killed(&self) {
        self.update(!NO_FLAGS, KILLED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn update_preserves_bits_outside_mask() {
        let flags = Flags::new();
        flags.set_trap();
        flags.update(!KILLED, KILLED);
        assert!(flags.is_set(TRAP));
        assert!(flags.is_set(KILLED));
    }

    #[test]
    fn clear_trap_only_clears_trap_bit() {
        let flags = Flags::new();
        flags.set_trap();
        flags.set_killed();
        flags.clear_trap();
        assert!(!flags.is_set(TRAP));
        assert!(flags.is_set(KILLED));
    }

    /// S6 — concurrent updates never produce a torn value with unrelated
    /// bits set; the final state is always exactly `TRAP` or `NO_FLAGS`.
    #[test]
    fn concurrent_updates_never_tear() {
        let flags = Arc::new(Flags::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let flags = Arc::clone(&flags);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    flags.update(!NO_FLAGS, TRAP);
                    flags.update(!TRAP, NO_FLAGS);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let final_state = flags.get();
        assert!(final_state == NO_FLAGS || final_state == TRAP);
    }
}
