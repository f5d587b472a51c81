//! # ream-core
//!
//! The process core of a small BEAM-style bytecode VM: isolated per-process
//! heaps, mailboxes with a disjoint signal channel, bidirectional links and
//! one-way monitors, and strict teardown ordering.
//!
//! This crate deliberately stops at the process boundary. The bytecode
//! interpreter, garbage collector internals, scheduler, module loader, and
//! term wire encoding are external collaborators — [`hostio`] and
//! [`registry`] are the seams an embedding VM plugs into.

#![warn(clippy::all)]
#![allow(dead_code)] // fields read only by a future interpreter/scheduler integration

pub mod error;
pub mod hostio;
pub mod process;
pub mod registry;
pub mod term;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use process::{HeapConfig, Process};
pub use registry::{GlobalRegistry, ProcessLock};
pub use types::{Pid, ProcessInfoKey, RefTicks};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
