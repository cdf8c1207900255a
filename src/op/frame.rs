//! The operation driver.
//!
//! A `Frame` is the live execution state of one operation inside a task: the
//! node currently being evaluated, a continuation stack, and the flags that
//! control unwinding. `step` advances the computation until it either yields
//! an instruction, produces a value, or raises — and supports bidirectional
//! resumption: a parked frame can be resumed with a value or have an error
//! thrown into its suspension point.
//!
//! # Unwinding
//!
//! Two distinct unwind modes exist:
//!
//! - **Error propagation** (`Fail` nodes, thrown resumes): catch handlers
//!   run, cleanup blocks run and re-raise, delegation continuations are
//!   skipped. Fully catchable.
//! - **Termination** ([`hijack`](Frame::hijack)): entered when the task is
//!   halted or a spawned child failed. Catch handlers registered before the
//!   hijack are discarded — the task runs no more forward code — but cleanup
//!   blocks still run, may suspend and spawn, and may use their own catch
//!   handlers internally.
//!
//! While a frame is unwinding for termination, the distinguished
//! forever-suspend instruction resumes immediately instead of parking, so a
//! cleanup block can never deadlock a halt. Every other instruction behaves
//! normally.

use super::raw::{unit, Instruction, Payload, RawOp};
use crate::error::{Error, ErrorKind};

/// How a parked frame is resumed.
pub(crate) enum Resume {
    /// Begin, or continue from a turn boundary.
    Start,
    /// The pending instruction produced a value.
    Value(Payload),
    /// Re-raise an error at the suspension point.
    Throw(Error),
}

impl core::fmt::Debug for Resume {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Start => f.write_str("Start"),
            Self::Value(_) => f.write_str("Value"),
            Self::Throw(e) => write!(f, "Throw({e})"),
        }
    }
}

/// The observable result of one `step`.
pub(crate) enum StepEvent {
    /// The frame yielded an instruction and is parked (or rescheduled).
    Yielded(Instruction),
    /// The computation returned a value; the frame is finished.
    Returned(Payload),
    /// The computation raised; the frame is finished.
    Threw(Error),
}

/// A value or error flowing through the continuation stack.
enum Flow {
    Value(Payload),
    Fail(Error),
}

/// One entry of the continuation stack.
enum Cont {
    /// Delegation continuation: applied to the value, skipped on error.
    Then(super::raw::ThenFn),
    /// Catch handler: applied to the error, skipped on success.
    Rescue(super::raw::RescueFn),
    /// Cleanup block: runs on both paths.
    Ensure(super::raw::CleanupFn),
    /// Marker restoring the pre-cleanup outcome once a cleanup block
    /// finishes. An error escaping the cleanup discards the marker and
    /// supersedes the saved outcome.
    Restore(Flow),
}

/// The live execution state of one operation.
pub(crate) struct Frame {
    current: Option<RawOp>,
    conts: Vec<Cont>,
    stash: Option<Flow>,
    halting: bool,
    cleanup_raised: bool,
}

impl Frame {
    /// Creates a frame for the given operation, not yet started.
    pub fn new(op: RawOp) -> Self {
        Self {
            current: Some(op),
            conts: Vec::new(),
            stash: None,
            halting: false,
            cleanup_raised: false,
        }
    }

    /// Loads a follow-up operation (a resource release block) into a frame
    /// whose previous computation has finished.
    pub fn load(&mut self, op: RawOp, halting: bool) {
        debug_assert!(self.conts.is_empty(), "frame reloaded mid-computation");
        self.current = Some(op);
        self.stash = None;
        self.halting = halting;
        self.cleanup_raised = false;
    }

    /// Returns true if a cleanup block raised during the termination unwind,
    /// meaning the thrown error supersedes the injected cause.
    pub fn cleanup_raised(&self) -> bool {
        self.cleanup_raised
    }

    /// Begins the termination unwind with the given cause.
    ///
    /// Whatever the frame was doing is abandoned: a parked suspension point
    /// never resumes with its value, an unstarted operation never runs. The
    /// cause is thrown at the current point and outstanding cleanup blocks
    /// run in LIFO order. Catch handlers already on the stack are discarded;
    /// handlers created afterwards (inside cleanup blocks) work normally.
    pub fn hijack(&mut self, cause: Error) {
        self.halting = true;
        self.cleanup_raised = false;
        self.current = None;
        self.stash = Some(Flow::Fail(cause));
        self.conts.retain(|c| !matches!(c, Cont::Rescue(_)));
    }

    /// Advances the computation until it parks, returns, or raises.
    ///
    /// `fuel` bounds the number of nodes evaluated in this call; when it runs
    /// out the frame parks at a turn boundary and yields
    /// [`Instruction::Yield`], resuming exactly where it left off.
    pub fn step(&mut self, resume: Resume, fuel: u32) -> StepEvent {
        let mut flow = match resume {
            Resume::Start => self.stash.take(),
            Resume::Value(v) => Some(Flow::Value(v)),
            Resume::Throw(e) => Some(Flow::Fail(e)),
        };
        let mut budget = fuel.max(1);

        loop {
            if let Some(sig) = flow.take() {
                match sig {
                    Flow::Value(v) => match self.conts.pop() {
                        None => return StepEvent::Returned(v),
                        Some(Cont::Then(f)) => self.current = Some(f(v)),
                        Some(Cont::Rescue(_)) => flow = Some(Flow::Value(v)),
                        Some(Cont::Ensure(f)) => {
                            self.conts.push(Cont::Restore(Flow::Value(v)));
                            self.current = Some(f());
                        }
                        Some(Cont::Restore(saved)) => flow = Some(saved),
                    },
                    Flow::Fail(e) => match self.conts.pop() {
                        None => return StepEvent::Threw(e),
                        Some(Cont::Then(_)) => flow = Some(Flow::Fail(e)),
                        Some(Cont::Rescue(handler)) => self.current = Some(handler(e)),
                        Some(Cont::Ensure(f)) => {
                            self.conts.push(Cont::Restore(Flow::Fail(e)));
                            self.current = Some(f());
                        }
                        Some(Cont::Restore(_)) => {
                            // An error escaped a cleanup block: it supersedes
                            // the saved outcome.
                            if self.halting {
                                self.cleanup_raised = true;
                            }
                            flow = Some(Flow::Fail(e));
                        }
                    },
                }
            } else {
                let Some(node) = self.current.take() else {
                    return StepEvent::Threw(
                        Error::new(ErrorKind::Internal)
                            .with_context("frame stepped without a pending operation"),
                    );
                };
                match node {
                    RawOp::Value(v) => flow = Some(Flow::Value(v)),
                    RawOp::Fail(e) => flow = Some(Flow::Fail(e)),
                    RawOp::Action(f) => {
                        flow = Some(match f() {
                            Ok(v) => Flow::Value(v),
                            Err(e) => Flow::Fail(e),
                        });
                    }
                    RawOp::Chain(first, then) => {
                        self.conts.push(Cont::Then(then));
                        self.current = Some(*first);
                    }
                    RawOp::Rescue(body, handler) => {
                        self.conts.push(Cont::Rescue(handler));
                        self.current = Some(*body);
                    }
                    RawOp::Ensure(body, cleanup) => {
                        self.conts.push(Cont::Ensure(cleanup));
                        self.current = Some(*body);
                    }
                    RawOp::Instr(Instruction::Suspend) if self.halting => {
                        // Forever-suspend inside a cleanup block resumes
                        // immediately so the halt can complete.
                        flow = Some(Flow::Value(unit()));
                    }
                    RawOp::Instr(Instruction::Yield) => {
                        self.stash = Some(Flow::Value(unit()));
                        return StepEvent::Yielded(Instruction::Yield);
                    }
                    RawOp::Instr(instr) => return StepEvent::Yielded(instr),
                }
            }

            budget -= 1;
            if budget == 0 {
                self.stash = flow.take();
                return StepEvent::Yielded(Instruction::Yield);
            }
        }
    }
}

impl core::fmt::Debug for Frame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Frame")
            .field("pending", &self.current.is_some())
            .field("depth", &self.conts.len())
            .field("halting", &self.halting)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::raw::typed;

    const FUEL: u32 = 1024;

    fn expect_returned<T: 'static>(event: StepEvent) -> T {
        match event {
            StepEvent::Returned(v) => *v.downcast::<T>().expect("payload type"),
            StepEvent::Threw(e) => panic!("unexpected throw: {e}"),
            StepEvent::Yielded(i) => panic!("unexpected yield: {i:?}"),
        }
    }

    fn expect_threw(event: StepEvent) -> Error {
        match event {
            StepEvent::Threw(e) => e,
            StepEvent::Returned(_) => panic!("unexpected return"),
            StepEvent::Yielded(i) => panic!("unexpected yield: {i:?}"),
        }
    }

    #[test]
    fn value_returns_immediately() {
        let mut frame = Frame::new(RawOp::Value(Box::new(42_i32)));
        assert_eq!(expect_returned::<i32>(frame.step(Resume::Start, FUEL)), 42);
    }

    #[test]
    fn chain_threads_values() {
        let op = RawOp::Chain(
            Box::new(RawOp::Value(Box::new(20_i32))),
            typed(|n: i32| RawOp::Value(Box::new(n + 22))),
        );
        let mut frame = Frame::new(op);
        assert_eq!(expect_returned::<i32>(frame.step(Resume::Start, FUEL)), 42);
    }

    #[test]
    fn rescue_catches_failure() {
        let op = RawOp::Rescue(
            Box::new(RawOp::Fail(Error::msg("boom"))),
            Box::new(|e| RawOp::Value(Box::new(e.to_string()))),
        );
        let mut frame = Frame::new(op);
        assert_eq!(
            expect_returned::<String>(frame.step(Resume::Start, FUEL)),
            "boom"
        );
    }

    #[test]
    fn rescue_is_skipped_on_success() {
        let op = RawOp::Rescue(
            Box::new(RawOp::Value(Box::new(1_i32))),
            Box::new(|_| RawOp::Value(Box::new(2_i32))),
        );
        let mut frame = Frame::new(op);
        assert_eq!(expect_returned::<i32>(frame.step(Resume::Start, FUEL)), 1);
    }

    #[test]
    fn ensure_runs_on_success_and_restores_value() {
        let op = RawOp::Ensure(
            Box::new(RawOp::Value(Box::new(7_i32))),
            Box::new(|| RawOp::Value(Box::new(()))),
        );
        let mut frame = Frame::new(op);
        assert_eq!(expect_returned::<i32>(frame.step(Resume::Start, FUEL)), 7);
    }

    #[test]
    fn ensure_runs_on_failure_and_rethrows() {
        let op = RawOp::Ensure(
            Box::new(RawOp::Fail(Error::msg("boom"))),
            Box::new(|| RawOp::Value(Box::new(()))),
        );
        let mut frame = Frame::new(op);
        assert_eq!(expect_threw(frame.step(Resume::Start, FUEL)).to_string(), "boom");
    }

    #[test]
    fn cleanup_error_supersedes_body_error() {
        let op = RawOp::Ensure(
            Box::new(RawOp::Fail(Error::msg("boom"))),
            Box::new(|| RawOp::Fail(Error::msg("bang"))),
        );
        let mut frame = Frame::new(op);
        assert_eq!(expect_threw(frame.step(Resume::Start, FUEL)).to_string(), "bang");
    }

    #[test]
    fn resume_value_feeds_suspension_point() {
        let op = RawOp::Chain(
            Box::new(RawOp::Instr(Instruction::Suspend)),
            typed(|n: i32| RawOp::Value(Box::new(n * 2))),
        );
        let mut frame = Frame::new(op);
        assert!(matches!(
            frame.step(Resume::Start, FUEL),
            StepEvent::Yielded(Instruction::Suspend)
        ));
        assert_eq!(
            expect_returned::<i32>(frame.step(Resume::Value(Box::new(21_i32)), FUEL)),
            42
        );
    }

    #[test]
    fn resume_throw_is_catchable() {
        let op = RawOp::Rescue(
            Box::new(RawOp::Instr(Instruction::Suspend)),
            Box::new(|e| RawOp::Value(Box::new(e.to_string()))),
        );
        let mut frame = Frame::new(op);
        assert!(matches!(
            frame.step(Resume::Start, FUEL),
            StepEvent::Yielded(Instruction::Suspend)
        ));
        assert_eq!(
            expect_returned::<String>(frame.step(Resume::Throw(Error::msg("late")), FUEL)),
            "late"
        );
    }

    #[test]
    fn hijack_runs_cleanup_and_rethrows_cause() {
        let cleaned = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let observed = cleaned.clone();
        let op = RawOp::Ensure(
            Box::new(RawOp::Instr(Instruction::Suspend)),
            Box::new(move || {
                observed.store(true, std::sync::atomic::Ordering::SeqCst);
                RawOp::Value(Box::new(()))
            }),
        );
        let mut frame = Frame::new(op);
        assert!(matches!(
            frame.step(Resume::Start, FUEL),
            StepEvent::Yielded(Instruction::Suspend)
        ));

        frame.hijack(Error::halted());
        let err = expect_threw(frame.step(Resume::Start, FUEL));
        assert!(err.is_halted());
        assert!(cleaned.load(std::sync::atomic::Ordering::SeqCst));
        assert!(!frame.cleanup_raised());
    }

    #[test]
    fn hijack_discards_catch_handlers() {
        let op = RawOp::Rescue(
            Box::new(RawOp::Instr(Instruction::Suspend)),
            Box::new(|_| RawOp::Value(Box::new(()))),
        );
        let mut frame = Frame::new(op);
        let _ = frame.step(Resume::Start, FUEL);

        frame.hijack(Error::halted());
        assert!(expect_threw(frame.step(Resume::Start, FUEL)).is_halted());
    }

    #[test]
    fn cleanup_error_marks_unwind_dirty() {
        let op = RawOp::Ensure(
            Box::new(RawOp::Instr(Instruction::Suspend)),
            Box::new(|| RawOp::Fail(Error::msg("bang"))),
        );
        let mut frame = Frame::new(op);
        let _ = frame.step(Resume::Start, FUEL);

        frame.hijack(Error::halted());
        let err = expect_threw(frame.step(Resume::Start, FUEL));
        assert_eq!(err.to_string(), "bang");
        assert!(frame.cleanup_raised());
    }

    #[test]
    fn cleanup_may_catch_its_own_errors() {
        let op = RawOp::Ensure(
            Box::new(RawOp::Instr(Instruction::Suspend)),
            Box::new(|| {
                RawOp::Rescue(
                    Box::new(RawOp::Fail(Error::msg("internal"))),
                    Box::new(|_| RawOp::Value(Box::new(()))),
                )
            }),
        );
        let mut frame = Frame::new(op);
        let _ = frame.step(Resume::Start, FUEL);

        frame.hijack(Error::halted());
        let err = expect_threw(frame.step(Resume::Start, FUEL));
        assert!(err.is_halted());
        assert!(!frame.cleanup_raised());
    }

    #[test]
    fn forever_suspend_is_noop_while_halting() {
        let op = RawOp::Ensure(
            Box::new(RawOp::Instr(Instruction::Suspend)),
            Box::new(|| {
                RawOp::Chain(
                    Box::new(RawOp::Instr(Instruction::Suspend)),
                    typed(|(): ()| RawOp::Value(Box::new(()))),
                )
            }),
        );
        let mut frame = Frame::new(op);
        let _ = frame.step(Resume::Start, FUEL);

        frame.hijack(Error::halted());
        // The cleanup's suspend must not park; the unwind completes in one step.
        assert!(expect_threw(frame.step(Resume::Start, FUEL)).is_halted());
    }

    #[test]
    fn fuel_exhaustion_parks_and_resumes() {
        // A long chain of pure nodes forced through a tiny budget.
        let mut op = RawOp::Value(Box::new(0_i32));
        for _ in 0..10 {
            op = RawOp::Chain(Box::new(op), typed(|n: i32| RawOp::Value(Box::new(n + 1))));
        }
        let mut frame = Frame::new(op);

        let mut turns = 0;
        loop {
            match frame.step(Resume::Start, 4) {
                StepEvent::Yielded(Instruction::Yield) => turns += 1,
                event => {
                    assert_eq!(expect_returned::<i32>(event), 10);
                    break;
                }
            }
            assert!(turns < 100, "frame failed to make progress");
        }
        assert!(turns > 0, "budget was never exhausted");
    }
}
