//! Operon: a structured concurrency runtime for suspendable operations.
//!
//! # Overview
//!
//! Operon executes cooperative, suspendable computations ("operations")
//! organised into a dynamically-growing tree of tasks. The runtime is built
//! on the principle that teardown should be structural, not conventional:
//! every task has a well-defined parent, a task is never considered finished
//! while a descendant is still live, and resources acquired inside an
//! operation are released on every exit path.
//!
//! # Core Guarantees
//!
//! - **No orphan tasks**: every spawned task is owned by its parent; a task
//!   settles only after all of its descendants have settled
//! - **Halt-correctness**: halting is request → drain → unwind → finalize,
//!   never a silent drop; cleanup blocks always run and may themselves
//!   suspend and spawn
//! - **Dominant errors**: an error raised during cleanup supersedes any
//!   prior settlement cause
//! - **Deterministic scheduling**: a single-threaded FIFO scheduler with
//!   virtual time, so every interleaving is reproducible
//!
//! # Module Structure
//!
//! - [`types`]: Core types (identifiers, settlement lattice, logical time)
//! - [`op`]: The `Operation` description type and its combinators
//! - [`task`]: Task records, lifecycle states, and task handles
//! - [`runtime`]: Scheduler, runtime state, and the turn loop
//! - [`channel`]: Broadcast channel with independent subscriber cursors
//! - [`bridge`]: Adapter for externally-settled completions
//! - [`time`]: Sleep primitives over the runtime clock
//! - [`util`]: Internal utilities (generational arena)
//! - [`error`]: Error types
//! - [`tracing_compat`]: Structured logging shim (no-op unless the
//!   `tracing-integration` feature is enabled)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod bridge;
pub mod channel;
pub mod error;
pub mod op;
pub mod runtime;
pub mod task;
pub mod time;
pub mod tracing_compat;
pub mod types;
pub mod util;

pub use error::{Error, ErrorKind, Result, ResultExt};
pub use op::{action, current, fail, resource, spawn, suspend, value, yield_now, Operation};
pub use runtime::{RootHandle, Runtime, RuntimeConfig};
pub use task::{TaskHandle, TaskRef};
pub use types::{Settlement, TaskId, Time};
