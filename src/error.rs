//! Error taxonomy for the process core (spec §7).
//!
//! Kept flat and small on purpose: unlike `ream`'s full `ReamError`, which
//! wraps bytecode/JIT/TLISP/STM/WASM subsystems this crate doesn't carry,
//! `CoreError` only needs the four failure modes spec §7 actually names.

use thiserror::Error;

use crate::types::Pid;

/// Failures surfaced by the process core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Heap expansion failed. The interpreter converts this into the atom
    /// `out_of_memory` delivered to `x[0]`; fatal (abort) if raised while
    /// draining monitors during teardown.
    #[error("out of memory")]
    OutOfMemory,

    /// An unrecognized `process_info/2` key, or any other malformed
    /// argument to a core operation.
    #[error("badarg")]
    BadArg,

    /// A signal or monitor target is no longer in the registry.
    #[error("process {0} is not alive")]
    DeadTarget(Pid),

    /// A `Monitor` record could not be allocated; `monitor()` reports this
    /// by returning ref-ticks `0` rather than propagating the error, per
    /// spec §7, but the type exists for callers that want to distinguish it.
    #[error("failed to allocate monitor record")]
    AllocationFailure,
}

pub type CoreResult<T> = Result<T, CoreError>;
