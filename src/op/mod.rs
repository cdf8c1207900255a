//! Operations: descriptions of suspendable computations.
//!
//! An [`Operation`] is a value describing a computation that, when driven by
//! the runtime, performs a sequence of instructions and eventually produces a
//! value of type `T` or raises an [`Error`]. Operations are inert until a
//! [`Runtime`](crate::runtime::Runtime) runs them; constructing one has no
//! effect.
//!
//! # Building operations
//!
//! ```
//! use operon::{op, Runtime};
//!
//! let mut rt = Runtime::new();
//! let sum = rt
//!     .block_on(op::value(40).and_then(|n| op::action(move || Ok(n + 2))))
//!     .unwrap();
//! assert_eq!(sum, 42);
//! ```
//!
//! Cleanup registered with [`Operation::finally`] runs on every exit path —
//! normal return, error, or halt — and may itself suspend and spawn.

pub(crate) mod frame;
pub(crate) mod raw;

use crate::error::{Error, Result};
use crate::task::{TaskHandle, TaskRef};
use crate::types::TaskId;
use raw::{typed, Instruction, RawOp};
use std::marker::PhantomData;

/// A description of a suspendable computation producing `T`.
///
/// Operations compose with [`and_then`](Operation::and_then) (delegation),
/// [`or_else`](Operation::or_else) (catching), and
/// [`finally`](Operation::finally) (cleanup). Each operation value is
/// one-shot: running it consumes it.
#[must_use = "operations are inert until run on a Runtime"]
pub struct Operation<T> {
    raw: RawOp,
    _marker: PhantomData<fn() -> T>,
}

impl<T> core::fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Operation").field(&self.raw).finish()
    }
}

impl<T: Send + 'static> Operation<T> {
    pub(crate) fn from_raw(raw: RawOp) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    pub(crate) fn into_raw(self) -> RawOp {
        self.raw
    }

    /// Runs this operation, then feeds its value to `f` and runs the
    /// resulting operation.
    pub fn and_then<U, F>(self, f: F) -> Operation<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Operation<U> + Send + 'static,
    {
        Operation::from_raw(RawOp::Chain(
            Box::new(self.raw),
            typed(move |v: T| f(v).into_raw()),
        ))
    }

    /// Maps the value of this operation.
    pub fn map<U, F>(self, f: F) -> Operation<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.and_then(move |v| value(f(v)))
    }

    /// Catches an error raised by this operation (or by any operation it
    /// delegates to) and replaces the computation with the handler's.
    ///
    /// Termination unwinds — halt, or the failure of a spawned child — are
    /// not catchable; only cleanup blocks observe those.
    pub fn or_else<F>(self, handler: F) -> Self
    where
        F: FnOnce(Error) -> Self + Send + 'static,
    {
        Self::from_raw(RawOp::Rescue(
            Box::new(self.raw),
            Box::new(move |e| handler(e).into_raw()),
        ))
    }

    /// Registers a cleanup block that runs on every exit path.
    ///
    /// The cleanup operation may suspend and spawn. An error it raises
    /// supersedes the operation's own outcome.
    pub fn finally<F>(self, cleanup: F) -> Self
    where
        F: FnOnce() -> Operation<()> + Send + 'static,
    {
        Self::from_raw(RawOp::Ensure(
            Box::new(self.raw),
            Box::new(move || cleanup().into_raw()),
        ))
    }
}

/// An operation that immediately produces `v`.
pub fn value<T: Send + 'static>(v: T) -> Operation<T> {
    Operation::from_raw(RawOp::Value(Box::new(v)))
}

/// An operation that immediately raises `error`.
pub fn fail<T: Send + 'static>(error: Error) -> Operation<T> {
    Operation::from_raw(RawOp::Fail(error))
}

/// An operation performing one synchronous step.
pub fn action<T, F>(f: F) -> Operation<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    Operation::from_raw(RawOp::Action(Box::new(move || {
        f().map(|v| Box::new(v) as raw::Payload)
    })))
}

/// An operation that suspends forever.
///
/// It only escapes through halt or failure of the surrounding task. Inside a
/// cleanup block of a halting task it resumes immediately, so `finally`
/// blocks cannot deadlock a halt.
pub fn suspend() -> Operation<()> {
    Operation::from_raw(RawOp::Instr(Instruction::Suspend))
}

/// An operation that reschedules the task at the back of the run queue.
pub fn yield_now() -> Operation<()> {
    Operation::from_raw(RawOp::Instr(Instruction::Yield))
}

/// An operation yielding a [`TaskRef`] for the running task.
pub fn current() -> Operation<TaskRef> {
    Operation::from_raw(RawOp::Chain(
        Box::new(RawOp::Instr(Instruction::Current)),
        typed(|id: TaskId| RawOp::Value(Box::new(TaskRef::new(id)))),
    ))
}

/// Spawns `op` as a child of the running task.
///
/// The child is registered in the parent's scope and its frame is enqueued;
/// the parent resumes with the child's [`TaskHandle`] on the same turn. The
/// child is halted when the parent winds down, and a child failure cascades
/// into the parent.
pub fn spawn<T: Send + 'static>(op: Operation<T>) -> Operation<TaskHandle<T>> {
    Operation::from_raw(RawOp::Chain(
        Box::new(RawOp::Instr(Instruction::Spawn(Box::new(op.into_raw())))),
        typed(|id: TaskId| RawOp::Value(Box::new(TaskHandle::<T>::new(id)))),
    ))
}

/// Acquires a value and registers its release on the owning task.
///
/// `acquire` runs inline; `release` is pushed onto the task's LIFO resource
/// list and runs — with a clone of the acquired value — before the task
/// settles, on every exit path. Release operations may suspend and spawn.
pub fn resource<T, F>(acquire: Operation<T>, release: F) -> Operation<T>
where
    T: Clone + Send + 'static,
    F: FnOnce(T) -> Operation<()> + Send + 'static,
{
    acquire.and_then(move |v| {
        let held = v.clone();
        let register = Operation::<()>::from_raw(RawOp::Instr(Instruction::Register(Box::new(
            move || release(held).into_raw(),
        ))));
        register.map(move |()| v)
    })
}

/// An operation that parks until the registration's resolver fires.
///
/// This is the building block for channels and external completions; the
/// registration receives the parked frame's one-shot resolver.
pub(crate) fn wait<T, F>(register: F) -> Operation<T>
where
    T: Send + 'static,
    F: FnOnce(crate::runtime::waker::Resolver) + Send + 'static,
{
    Operation::from_raw(RawOp::Instr(Instruction::Wait(Box::new(register))))
}
