//! Type-erased operation tree.
//!
//! Public [`Operation`](super::Operation)s are typed wrappers over `RawOp`, a
//! small expression tree whose values travel as boxed `Any` payloads. The
//! [`Frame`](super::frame::Frame) driver interprets the tree one node at a
//! time; every suspension point is an explicit [`Instruction`] leaf, which is
//! what makes computations resumable (and haltable) without language-level
//! coroutines.

use crate::error::{Error, Result};
use crate::runtime::waker::Resolver;
use crate::types::TaskId;
use core::fmt;
use std::any::Any;
use std::time::Duration;

/// An erased operation value.
pub(crate) type Payload = Box<dyn Any + Send>;

/// A continuation applied to a successful payload.
pub(crate) type ThenFn = Box<dyn FnOnce(Payload) -> RawOp + Send>;

/// A handler applied to a raised error.
pub(crate) type RescueFn = Box<dyn FnOnce(Error) -> RawOp + Send>;

/// A cleanup block producer.
pub(crate) type CleanupFn = Box<dyn FnOnce() -> RawOp + Send>;

/// A deferred resource release producer, stored on the owning task.
pub(crate) type ReleaseFn = Box<dyn FnOnce() -> RawOp + Send>;

/// A one-shot registration invoked with the resolver of a parked frame.
pub(crate) type WaitFn = Box<dyn FnOnce(Resolver) + Send>;

/// The unit payload.
pub(crate) fn unit() -> Payload {
    Box::new(())
}

/// One node of the erased operation tree.
pub(crate) enum RawOp {
    /// A ready value.
    Value(Payload),
    /// A raised error.
    Fail(Error),
    /// One synchronous step.
    Action(Box<dyn FnOnce() -> Result<Payload> + Send>),
    /// Run the first operation, then feed its value to the continuation.
    Chain(Box<RawOp>, ThenFn),
    /// Run the body; on error, the handler's operation replaces it.
    Rescue(Box<RawOp>, RescueFn),
    /// Run the body; the cleanup block runs on every exit path.
    Ensure(Box<RawOp>, CleanupFn),
    /// Yield an instruction to the scheduler.
    Instr(Instruction),
}

impl fmt::Debug for RawOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Value(_) => "Value",
            Self::Fail(_) => "Fail",
            Self::Action(_) => "Action",
            Self::Chain(..) => "Chain",
            Self::Rescue(..) => "Rescue",
            Self::Ensure(..) => "Ensure",
            Self::Instr(i) => return write!(f, "Instr({i:?})"),
        };
        f.write_str(name)
    }
}

/// An instruction surfaced by a frame to the scheduler.
pub(crate) enum Instruction {
    /// Park forever; only halt or failure escapes. This is the distinguished
    /// forever-suspend that becomes a no-op while the task is halting.
    Suspend,
    /// Park until the registered resolver fires. Honoured even while halting.
    Wait(WaitFn),
    /// Park until the runtime clock reaches `now + duration`.
    Sleep(Duration),
    /// Create a child task; the parent resumes with its id on the same turn.
    Spawn(Box<RawOp>),
    /// Park until the target task settles, then resume with its result.
    Join(TaskId),
    /// Request the halt protocol on the target; resume once it has settled.
    Halt(TaskId),
    /// Resume with the running task's own id on the same turn.
    Current,
    /// Push a release block onto the owning task's LIFO resource list.
    Register(ReleaseFn),
    /// Reschedule at the back of the run queue.
    Yield,
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suspend => f.write_str("Suspend"),
            Self::Wait(_) => f.write_str("Wait"),
            Self::Sleep(d) => write!(f, "Sleep({d:?})"),
            Self::Spawn(_) => f.write_str("Spawn"),
            Self::Join(id) => write!(f, "Join({id:?})"),
            Self::Halt(id) => write!(f, "Halt({id:?})"),
            Self::Current => f.write_str("Current"),
            Self::Register(_) => f.write_str("Register"),
            Self::Yield => f.write_str("Yield"),
        }
    }
}

/// Adapts a typed continuation to an erased one.
///
/// A payload of the wrong type becomes a raised internal error rather than a
/// panic; it indicates a bug in the combinator layer, not in user code.
pub(crate) fn typed<T: 'static, F>(f: F) -> ThenFn
where
    F: FnOnce(T) -> RawOp + Send + 'static,
{
    Box::new(move |payload: Payload| match payload.downcast::<T>() {
        Ok(v) => f(*v),
        Err(_) => RawOp::Fail(
            Error::new(crate::error::ErrorKind::Internal)
                .with_context("operation payload type mismatch"),
        ),
    })
}
