//! Sleep primitives over the runtime clock.
//!
//! Sleeps are timer-backed suspensions: the frame parks and a timer entry is
//! queued at `now + duration`. Halting the task invalidates the entry before
//! it can unpark the frame, so cleanup never waits on a dead timer — while a
//! sleep issued *inside* cleanup is honoured and completes normally.
//!
//! Timeouts are intentionally not a primitive; compose them from `sleep`
//! plus [`TaskRef::halt`](crate::task::TaskRef::halt).

use crate::op::raw::{Instruction, RawOp};
use crate::op::Operation;
use std::time::Duration;

/// An operation that completes after `duration` of runtime time.
pub fn sleep(duration: Duration) -> Operation<()> {
    Operation::from_raw(RawOp::Instr(Instruction::Sleep(duration)))
}

/// An operation that completes after `millis` milliseconds of runtime time.
pub fn sleep_ms(millis: u64) -> Operation<()> {
    sleep(Duration::from_millis(millis))
}
