//! Wake delivery for parked frames.
//!
//! A parked frame is resumed by pushing a [`Wake`] onto the runtime's shared
//! wake queue. The queue is drained at turn boundaries in FIFO order, which
//! is what gives resolver-firing order its resume-order guarantee. Each wake
//! carries the park token captured when the frame suspended; a token mismatch
//! marks the wake as stale (the task was halted, or already woken by another
//! source) and it is dropped instead of resuming the frame twice.

use crate::error::Error;
use crate::op::raw::Payload;
use crate::types::TaskId;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// The payload of a wake: resume the frame with a value, or throw into it.
pub(crate) enum Signal {
    /// Resume the suspension point with a value.
    Value(Payload),
    /// Re-raise an error at the suspension point.
    Throw(Error),
}

/// A pending wake for a parked task.
pub(crate) struct Wake {
    /// The task to resume.
    pub task: TaskId,
    /// The park token captured at suspension time.
    pub token: u64,
    /// What to resume the frame with.
    pub signal: Signal,
}

/// Shared FIFO queue of pending wakes.
///
/// Cloning the queue yields another handle to the same queue; resolvers,
/// channels, and external completions all hold one.
#[derive(Clone, Default)]
pub(crate) struct WakeQueue {
    inner: Arc<Mutex<VecDeque<Wake>>>,
}

impl WakeQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a wake.
    pub fn push(&self, wake: Wake) {
        self.inner
            .lock()
            .expect("wake queue poisoned")
            .push_back(wake);
    }

    /// Pops the oldest wake, if any.
    pub fn pop(&self) -> Option<Wake> {
        self.inner.lock().expect("wake queue poisoned").pop_front()
    }
}

/// A one-shot settle callback for a parked frame.
///
/// Firing the resolver enqueues a wake; it does not advance the frame
/// directly, so resolvers may be fired from inside another frame's step
/// (channel sends) or from outside the runtime (external completions).
pub(crate) struct Resolver {
    task: TaskId,
    token: u64,
    queue: WakeQueue,
}

impl Resolver {
    /// Creates a resolver bound to a parked task and its park token.
    pub fn new(task: TaskId, token: u64, queue: WakeQueue) -> Self {
        Self { task, token, queue }
    }

    /// Fires the resolver with a value.
    pub fn resolve(self, payload: Payload) {
        self.queue.push(Wake {
            task: self.task,
            token: self.token,
            signal: Signal::Value(payload),
        });
    }

    /// Fires the resolver with an error.
    pub fn reject(self, error: Error) {
        self.queue.push(Wake {
            task: self.task,
            token: self.token,
            signal: Signal::Throw(error),
        });
    }
}

impl core::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Resolver")
            .field("task", &self.task)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wakes_drain_in_fifo_order() {
        let queue = WakeQueue::new();
        let a = TaskId::new_for_test(1, 0);
        let b = TaskId::new_for_test(2, 0);

        Resolver::new(a, 1, queue.clone()).resolve(Box::new(12_i32));
        Resolver::new(b, 1, queue.clone()).reject(Error::msg("boom"));

        let first = queue.pop().expect("first wake");
        assert_eq!(first.task, a);
        assert!(matches!(first.signal, Signal::Value(_)));

        let second = queue.pop().expect("second wake");
        assert_eq!(second.task, b);
        assert!(matches!(second.signal, Signal::Throw(_)));

        assert!(queue.pop().is_none());
    }
}
