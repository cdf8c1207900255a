//! Aggregate runtime state.
//!
//! The state owns the task arena, the shared wake queue, the timer heap, and
//! the virtual clock. The turn loop in [`Runtime`](super::Runtime) is the
//! only mutator; everything here is bookkeeping.

use super::timer::Timers;
use super::waker::WakeQueue;
use crate::task::record::TaskRecord;
use crate::types::{TaskId, Time};
use crate::util::Arena;

/// The mutable state of a runtime.
pub(crate) struct RuntimeState {
    /// All task records, settled ones included, for the runtime's lifetime.
    pub tasks: Arena<TaskRecord>,
    /// Shared FIFO queue of pending wakes.
    pub wake_queue: WakeQueue,
    /// Pending timers.
    pub timers: Timers,
    /// Current virtual time.
    pub now: Time,
    /// Number of scheduler turns executed.
    pub steps: u64,
}

impl RuntimeState {
    /// Creates a fresh state at time zero.
    pub fn new() -> Self {
        Self {
            tasks: Arena::new(),
            wake_queue: WakeQueue::new(),
            timers: Timers::new(),
            now: Time::ZERO,
            steps: 0,
        }
    }

    /// Returns the record for a task, if the id is current.
    pub fn task(&self, id: TaskId) -> Option<&TaskRecord> {
        self.tasks.get(id.arena_index())
    }

    /// Returns the mutable record for a task, if the id is current.
    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut TaskRecord> {
        self.tasks.get_mut(id.arena_index())
    }

    /// Returns true when every task has settled.
    pub fn is_quiescent(&self) -> bool {
        self.tasks.iter().all(|(_, t)| t.state.is_terminal())
    }
}

impl core::fmt::Debug for RuntimeState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RuntimeState")
            .field("tasks", &self.tasks.len())
            .field("now", &self.now)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}
