//! Handles for observing and steering tasks.
//!
//! Three flavours exist:
//!
//! - [`TaskRef`]: an untyped reference to any task, enough to halt it
//! - [`TaskHandle<T>`]: a typed handle to a spawned child, awaitable as an
//!   operation
//! - [`RootHandle<T>`]: the external handle returned by
//!   [`Runtime::run`](crate::runtime::Runtime::run)
//!
//! Handles never own the task; the parent does. Dropping a handle has no
//! effect on the task it refers to.

use crate::op::raw::{Instruction, RawOp};
use crate::op::Operation;
use crate::types::{Settlement, TaskId};
use std::marker::PhantomData;

/// An untyped reference to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRef {
    id: TaskId,
}

impl TaskRef {
    pub(crate) fn new(id: TaskId) -> Self {
        Self { id }
    }

    /// Returns the task's identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Requests the halt protocol on the task.
    ///
    /// The returned operation completes once the task has settled; halting an
    /// already-halting or settled task is a no-op that still waits for (or
    /// observes) settlement. Halt is void: an error raised by the target's
    /// cleanup surfaces through the failure cascade into the target's
    /// parent, not here.
    pub fn halt(&self) -> Operation<()> {
        Operation::from_raw(RawOp::Instr(Instruction::Halt(self.id)))
    }
}

/// A typed handle to a spawned task.
///
/// The handle is awaitable as an operation via [`join`](TaskHandle::join).
/// The task's value is delivered once: the first claimant takes it.
#[derive(Debug)]
pub struct TaskHandle<T> {
    task: TaskRef,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            task: self.task,
            _marker: PhantomData,
        }
    }
}

impl<T: Send + 'static> TaskHandle<T> {
    pub(crate) fn new(id: TaskId) -> Self {
        Self {
            task: TaskRef::new(id),
            _marker: PhantomData,
        }
    }

    /// Returns the task's identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.task.id()
    }

    /// Returns the untyped reference to the same task.
    #[must_use]
    pub fn as_ref(&self) -> TaskRef {
        self.task
    }

    /// Awaits the task: suspends until it settles, then resumes with its
    /// value, or re-raises its error (a halted task raises the halt
    /// sentinel).
    pub fn join(&self) -> Operation<T> {
        Operation::from_raw(RawOp::Instr(Instruction::Join(self.id())))
    }

    /// Requests the halt protocol on the task. See [`TaskRef::halt`].
    pub fn halt(&self) -> Operation<()> {
        self.task.halt()
    }
}

/// The external handle to a root task.
///
/// Unlike [`TaskHandle`], a root handle is observed from outside the runtime:
/// settlement is reached by driving the runtime
/// ([`run_until_settled`](crate::runtime::Runtime::run_until_settled)), and
/// halt is requested through [`Runtime::halt`](crate::runtime::Runtime::halt).
#[derive(Debug)]
pub struct RootHandle<T> {
    id: TaskId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RootHandle<T> {
    pub(crate) fn new(id: TaskId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Returns the root task's identifier.
    #[must_use]
    pub fn task_id(&self) -> TaskId {
        self.id
    }

    /// Returns the task's settlement, if it has settled.
    #[must_use]
    pub fn settlement(&self, runtime: &crate::runtime::Runtime) -> Option<Settlement> {
        runtime.settlement_of(self.id)
    }

    /// Returns true once the task has settled.
    #[must_use]
    pub fn is_settled(&self, runtime: &crate::runtime::Runtime) -> bool {
        self.settlement(runtime).is_some()
    }

    /// Requests the halt protocol on the root task.
    ///
    /// Settlement is then observed by driving the runtime; the awaiter sees
    /// the stable `halted` error unless cleanup raised.
    pub fn halt(&self, runtime: &mut crate::runtime::Runtime) {
        runtime.halt(self.id);
    }
}
