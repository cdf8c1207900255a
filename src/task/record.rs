//! Internal record for a task in the runtime.
//!
//! The record tracks the task's position in the tree, its lifecycle state,
//! its frame, and the bookkeeping that keeps wakes exactly-once: the park
//! token. Every suspension bumps the token and every wake carries the token
//! it was created under, so a wake from a source the task no longer waits on
//! (a cancelled timer, a resolver fired after halt) is recognisably stale.

use crate::op::frame::{Frame, Resume};
use crate::op::raw::{Payload, ReleaseFn};
use crate::types::{Settlement, TaskId, Time};

/// The state of a task in its lifecycle.
///
/// Wind-down states carry the pending cause, which is strengthened by child
/// failures observed during the drain and dominated by cleanup errors.
#[derive(Debug)]
pub(crate) enum TaskState {
    /// Created and enqueued, never stepped.
    Created,
    /// Actively driving the root frame.
    Running,
    /// Halt requested; draining children (LIFO) before the frame unwinds.
    HaltRequested {
        /// Pending settlement cause.
        cause: Settlement,
    },
    /// The frame is unwinding: cleanup blocks are running.
    Unwinding {
        /// Pending settlement cause.
        cause: Settlement,
    },
    /// Cleanup done; releasing resources and draining late children.
    Finalizing {
        /// Pending settlement cause.
        cause: Settlement,
        /// True while the frame is driving a resource release operation.
        releasing: bool,
    },
    /// Terminal state.
    Settled(Settlement),
}

impl TaskState {
    /// Returns true if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled(_))
    }

    /// Returns true if the task is winding down (halt lane scheduling).
    pub fn is_winding_down(&self) -> bool {
        matches!(
            self,
            Self::HaltRequested { .. } | Self::Unwinding { .. } | Self::Finalizing { .. }
        )
    }

    /// Returns a string name for the current state (for tracing).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Running => "Running",
            Self::HaltRequested { .. } => "HaltRequested",
            Self::Unwinding { .. } => "Unwinding",
            Self::Finalizing { .. } => "Finalizing",
            Self::Settled(_) => "Settled",
        }
    }
}

/// Why a task is waiting on another task's settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaiterKind {
    /// Awaiting the result: resumes with the value, or throws the error.
    Join,
    /// Awaiting a requested halt: resumes with unit once settled, throwing
    /// only if the target's cleanup raised.
    Halt,
    /// A parent waiting for this child during its own wind-down.
    Finalize,
}

/// A task parked on another task's settlement.
#[derive(Debug)]
pub(crate) struct Waiter {
    /// The parked task.
    pub task: TaskId,
    /// Its park token at suspension time.
    pub token: u64,
    /// What to deliver on settlement.
    pub kind: WaiterKind,
}

/// Internal record for one task.
pub(crate) struct TaskRecord {
    /// Unique identifier for this task.
    pub id: TaskId,
    /// Parent link; the root task has none.
    pub parent: Option<TaskId>,
    /// Live children, in spawn order. Settled children are removed.
    pub children: Vec<TaskId>,
    /// The root frame.
    pub frame: Frame,
    /// Current lifecycle state.
    pub state: TaskState,
    /// Registered resource releases, applied in LIFO order before settling.
    pub resources: Vec<ReleaseFn>,
    /// Tasks waiting for this task to settle.
    pub waiters: Vec<Waiter>,
    /// The result value, delivered once to the first claimant.
    pub result: Option<Payload>,
    /// The resume to apply on the next scheduler pop.
    pub pending: Option<Resume>,
    /// Current park token; see the module docs.
    pub park_token: u64,
    /// Logical time when the task was created.
    pub created_at: Time,
    /// Number of frame steps executed (for diagnostics).
    pub total_steps: u64,
}

impl TaskRecord {
    /// Creates a new record in the `Created` state.
    pub fn new(id: TaskId, parent: Option<TaskId>, frame: Frame, created_at: Time) -> Self {
        Self {
            id,
            parent,
            children: Vec::new(),
            frame,
            state: TaskState::Created,
            resources: Vec::new(),
            waiters: Vec::new(),
            result: None,
            pending: None,
            park_token: 0,
            created_at,
            total_steps: 0,
        }
    }

    /// Parks the task: bumps the token and returns the value a wake source
    /// must present to be accepted.
    pub fn park(&mut self) -> u64 {
        self.park_token += 1;
        self.park_token
    }

    /// Invalidates every outstanding wake source.
    pub fn invalidate_wakes(&mut self) {
        self.park_token += 1;
    }

    /// Returns true if a wake carrying `token` is still current.
    pub fn accepts_wake(&self, token: u64) -> bool {
        !self.state.is_terminal() && self.park_token == token && self.pending.is_none()
    }
}

impl core::fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskRecord")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("state", &self.state.name())
            .field("children", &self.children)
            .field("waiters", &self.waiters.len())
            .field("resources", &self.resources.len())
            .field("created_at", &self.created_at)
            .field("total_steps", &self.total_steps)
            .finish_non_exhaustive()
    }
}
