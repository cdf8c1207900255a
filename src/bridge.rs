//! Adapter for externally-settled completions.
//!
//! [`completion`] is the bridge between the runtime and work it does not
//! drive: host futures, callbacks, other threads. It returns a
//! [`Completion`] — a one-shot settle handle — paired with the operation
//! that produces whatever the completion is settled with.
//!
//! Settling before the operation is driven is fine: the value is stored and
//! delivered on the operation's first turn. Halting the task that awaits the
//! operation abandons the result; nothing here cancels the external work.
//!
//! ```
//! use operon::{bridge, Runtime};
//!
//! let mut rt = Runtime::new();
//! let (done, op) = bridge::completion::<i32>();
//! done.resolve(12);
//! assert_eq!(rt.block_on(op).unwrap(), 12);
//! ```

use crate::error::{Error, Result};
use crate::op::{self, Operation};
use crate::runtime::waker::Resolver;
use std::sync::{Arc, Mutex};

struct Slot<T> {
    settled: Option<Result<T>>,
    waiter: Option<Resolver>,
}

/// A one-shot handle settling a bridged operation from outside the runtime.
///
/// Dropping an unsettled completion leaves the operation suspended forever;
/// the surrounding task can still be halted.
pub struct Completion<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T: Send + 'static> Completion<T> {
    /// Settles the operation with a value.
    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    /// Settles the operation with an error, re-raised at the awaiting
    /// suspension point.
    pub fn reject(self, error: Error) {
        self.settle(Err(error));
    }

    fn settle(self, outcome: Result<T>) {
        let mut slot = self.slot.lock().expect("completion lock poisoned");
        if let Some(waiter) = slot.waiter.take() {
            match outcome {
                Ok(v) => waiter.resolve(Box::new(v)),
                Err(e) => waiter.reject(e),
            }
        } else {
            slot.settled = Some(outcome);
        }
    }
}

impl<T> core::fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

/// Creates an externally-settled operation.
///
/// The returned operation suspends until the [`Completion`] is resolved or
/// rejected, then produces that outcome at its suspension point.
#[must_use]
pub fn completion<T: Send + 'static>() -> (Completion<T>, Operation<T>) {
    let slot = Arc::new(Mutex::new(Slot {
        settled: None,
        waiter: None,
    }));

    let registration = Arc::clone(&slot);
    let operation = op::wait(move |resolver| {
        let mut slot = registration.lock().expect("completion lock poisoned");
        match slot.settled.take() {
            Some(Ok(v)) => resolver.resolve(Box::new(v)),
            Some(Err(e)) => resolver.reject(e),
            None => slot.waiter = Some(resolver),
        }
    });

    (Completion { slot }, operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{op, Runtime};

    #[test]
    fn pre_resolved_completion_delivers_value() {
        let mut rt = Runtime::new();
        let (done, op) = completion::<i32>();
        done.resolve(12);
        assert_eq!(rt.block_on(op).unwrap(), 12);
    }

    #[test]
    fn rejection_raises_at_the_suspension_point() {
        let mut rt = Runtime::new();
        let (done, op) = completion::<i32>();
        done.reject(Error::msg("boom"));
        let err = rt.block_on(op).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn rejection_is_catchable() {
        let mut rt = Runtime::new();
        let (done, operation) = completion::<i32>();
        done.reject(Error::msg("boom"));
        let result = rt
            .block_on(operation.or_else(|e| op::value(if e.to_string() == "boom" { 1 } else { 0 })))
            .unwrap();
        assert_eq!(result, 1);
    }

    #[test]
    fn unsettled_completion_stalls_the_task() {
        let mut rt = Runtime::new();
        let (done, op) = completion::<i32>();
        let handle = rt.run(op);
        rt.run_until_stalled();
        assert!(!handle.is_settled(&rt));

        done.resolve(5);
        assert_eq!(rt.run_until_settled(&handle).unwrap(), 5);
    }

    #[test]
    fn halting_abandons_the_external_result() {
        let mut rt = Runtime::new();
        let (done, op) = completion::<i32>();
        let handle = rt.run(op);
        rt.run_until_stalled();

        rt.halt(handle.task_id());
        let err = rt.run_until_settled(&handle).unwrap_err();
        assert!(err.is_halted());

        // Late settlement is a stale wake; nothing resurrects the task.
        done.resolve(5);
        rt.run_until_stalled();
        assert!(rt.is_quiescent());
    }
}
