//! Trait seams for the collaborators spec §6 lists as "consumed" but which
//! this crate does not implement: the scheduler's timer wheel and anything
//! else a host VM owns on the core's behalf.
//!
//! `GlobalRegistry` (see `registry.rs`) satisfies `RefTickSource` directly,
//! since ref-tick issuance is the registry's job per spec §6
//! (`globalcontext_get_ref_ticks`). `TimerCancel` is supplied by whatever
//! embeds this crate; `NullTimer` is a standalone stand-in so the teardown
//! path is exercisable without a real scheduler attached.

use std::fmt;

/// Opaque handle to a scheduler timer-wheel entry, armed by `receive ... after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(pub u64);

/// Disarms a scheduler timeout. Exposed to the core so teardown step 8
/// (`scheduler_cancel_timeout`) can run without this crate depending on a
/// concrete scheduler implementation.
pub trait TimerCancel: fmt::Debug + Send + Sync {
    fn cancel(&self, handle: TimerHandle);
}

/// Monotonically increasing ref-tick source, owned by the global registry
/// in a full VM (spec §6: `globalcontext_get_ref_ticks`).
pub trait RefTickSource: Send + Sync {
    fn next_ref_ticks(&self) -> u64;
}

/// A `TimerCancel` that does nothing, for processes created without a
/// scheduler attached (unit tests, standalone use of the core).
#[derive(Debug, Default)]
pub struct NullTimer;

impl TimerCancel for NullTimer {
    fn cancel(&self, _handle: TimerHandle) {}
}
