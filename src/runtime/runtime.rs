//! The runtime: turn loop, instruction handling, and the halt protocol.
//!
//! One [`Runtime`] drives a tree of tasks over a single thread. Each turn
//! pops one task from the run queue and advances its frame until it parks,
//! finishes, or exhausts its synchronous step quota. Terminal transitions
//! run the wind-down sequence:
//!
//! 1. **HaltRequested** — children are halted in LIFO order, each awaited to
//!    settlement, before the task's own frame is touched
//! 2. **Unwinding** — the pending cause is thrown into the frame's
//!    suspension point and cleanup blocks run (they may suspend and spawn)
//! 3. **Finalizing** — registered resources are released in LIFO order and
//!    children spawned during cleanup are drained; the loop over children is
//!    re-entrant because cleanup may grow the tree
//! 4. **Settled** — waiters resolve, the parent is notified, and a failed
//!    settlement cascades into a running parent
//!
//! A natural return or an uncaught error skips straight to Finalizing (the
//! frame has already unwound its own cleanup blocks inline).

use super::config::RuntimeConfig;
use super::scheduler::Scheduler;
use super::state::RuntimeState;
use super::waker::{Resolver, Signal, Wake};
use crate::error::{Error, ErrorKind, Result};
use crate::op::frame::{Frame, Resume, StepEvent};
use crate::op::raw::{unit, Instruction, RawOp};
use crate::op::Operation;
use crate::task::record::{TaskRecord, TaskState, Waiter, WaiterKind};
use crate::task::RootHandle;
use crate::tracing_compat::{debug, trace};
use crate::types::{Settlement, TaskId, Time};
use std::time::Duration;

/// Where a frame step originated, for interpreting its result.
enum Origin {
    Running,
    Unwinding,
    Releasing,
}

/// What a dispatch decided to do with the task this iteration.
enum Turn {
    Stepped(StepEvent, Origin),
    Drain,
    Finalize,
    Again,
    Done,
}

/// A single-threaded cooperative runtime driving a tree of tasks.
pub struct Runtime {
    state: RuntimeState,
    scheduler: Scheduler,
    config: RuntimeConfig,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Creates a runtime with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Creates a runtime with the given configuration.
    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            state: RuntimeState::new(),
            scheduler: Scheduler::new(),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns the current virtual time.
    #[must_use]
    pub fn now(&self) -> Time {
        self.state.now
    }

    /// Returns the number of scheduler turns executed.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.state.steps
    }

    /// Returns true when every task has settled.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        self.state.is_quiescent()
    }

    /// Creates a root task for `op` and enqueues its frame.
    ///
    /// The operation does not advance until the runtime is driven.
    pub fn run<T: Send + 'static>(&mut self, op: Operation<T>) -> RootHandle<T> {
        let id = self.create_task(None, op.into_raw());
        RootHandle::new(id)
    }

    /// Runs `op` to settlement and returns its result.
    pub fn block_on<T: Send + 'static>(&mut self, op: Operation<T>) -> Result<T> {
        let handle = self.run(op);
        self.run_until_settled(&handle)
    }

    /// Requests the halt protocol on a task.
    ///
    /// Idempotent; settlement is observed by driving the runtime.
    pub fn halt(&mut self, task: TaskId) {
        self.request_halt(task, Settlement::Halted);
    }

    /// Returns a task's settlement, if it has settled.
    #[must_use]
    pub fn settlement_of(&self, task: TaskId) -> Option<Settlement> {
        match self.state.task(task).map(|r| &r.state) {
            Some(TaskState::Settled(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Advances the virtual clock by `duration`.
    ///
    /// Only useful with [`RuntimeConfig::manual_time`]; due timers fire on
    /// the next turn.
    pub fn advance_time(&mut self, duration: Duration) {
        self.state.now = self.state.now + duration;
    }

    /// Executes one scheduler turn.
    ///
    /// Returns false if no task could be advanced: the runtime is settled,
    /// or stalled on external input.
    pub fn step(&mut self) -> bool {
        self.drain_wakes();
        while self.scheduler.is_empty() {
            self.fire_due_timers();
            self.drain_wakes();
            if !self.scheduler.is_empty() || !self.config.auto_advance {
                break;
            }
            let Some(deadline) = self.state.timers.next_deadline() else {
                break;
            };
            if deadline > self.state.now {
                self.state.now = deadline;
                trace!(now = %self.state.now, "virtual clock advanced");
            }
        }

        let Some(id) = self.scheduler.pop() else {
            return false;
        };
        self.state.steps += 1;
        let resume = self
            .state
            .task_mut(id)
            .and_then(|r| r.pending.take())
            .unwrap_or(Resume::Start);
        self.advance(id, resume);
        true
    }

    /// Drives the runtime until no task can make progress without external
    /// input. Returns the number of turns executed.
    pub fn run_until_stalled(&mut self) -> u64 {
        let start = self.state.steps;
        while self.step() {
            if let Some(max) = self.config.max_steps {
                if self.state.steps >= max {
                    break;
                }
            }
        }
        self.state.steps - start
    }

    /// Drives the runtime until the root task settles, then returns its
    /// value or error.
    ///
    /// Fails with [`ErrorKind::Stalled`] if the runtime deadlocks first.
    pub fn run_until_settled<T: Send + 'static>(&mut self, handle: &RootHandle<T>) -> Result<T> {
        let id = handle.task_id();
        loop {
            if self.settlement_of(id).is_some() {
                break;
            }
            if let Some(max) = self.config.max_steps {
                if self.state.steps >= max {
                    return Err(Error::new(ErrorKind::Stalled)
                        .with_context("step limit reached before settlement"));
                }
            }
            if !self.step() {
                if self.settlement_of(id).is_some() {
                    break;
                }
                return Err(Error::new(ErrorKind::Stalled)
                    .with_context("no runnable tasks and no pending timers"));
            }
        }
        self.claim_result(id)
    }

    // ─── Task creation ──────────────────────────────────────────────────

    fn create_task(&mut self, parent: Option<TaskId>, raw: RawOp) -> TaskId {
        let now = self.state.now;
        let idx = self.state.tasks.insert_with(|idx| {
            TaskRecord::new(TaskId::from_arena(idx), parent, Frame::new(raw), now)
        });
        let id = TaskId::from_arena(idx);
        if let Some(parent) = parent {
            if let Some(rec) = self.state.task_mut(parent) {
                rec.children.push(id);
            }
        }
        trace!(task = %id, parent = ?parent, "task created");
        self.scheduler.schedule(id);
        id
    }

    // ─── The per-task driver ────────────────────────────────────────────

    /// Advances one task for one turn, starting from `resume`.
    #[allow(clippy::too_many_lines)]
    fn advance(&mut self, id: TaskId, mut resume: Resume) {
        let fuel = self.config.step_quota;
        let mut rounds: u32 = 0;

        loop {
            rounds += 1;
            if rounds > self.config.step_quota {
                // Turn boundary: hand the lane back and continue later.
                let winding = {
                    let Some(rec) = self.state.task_mut(id) else {
                        return;
                    };
                    rec.pending = Some(resume);
                    rec.state.is_winding_down()
                };
                if winding {
                    self.scheduler.schedule_halt(id);
                } else {
                    self.scheduler.schedule(id);
                }
                return;
            }

            let turn = {
                let Some(rec) = self.state.task_mut(id) else {
                    return;
                };
                match &mut rec.state {
                    TaskState::Settled(_) => Turn::Done,
                    TaskState::Created => {
                        rec.state = TaskState::Running;
                        trace!(task = %id, "task started");
                        Turn::Again
                    }
                    TaskState::Running => {
                        rec.total_steps += 1;
                        let r = std::mem::replace(&mut resume, Resume::Start);
                        Turn::Stepped(rec.frame.step(r, fuel), Origin::Running)
                    }
                    TaskState::Unwinding { .. } => {
                        rec.total_steps += 1;
                        let r = std::mem::replace(&mut resume, Resume::Start);
                        Turn::Stepped(rec.frame.step(r, fuel), Origin::Unwinding)
                    }
                    TaskState::Finalizing {
                        releasing: true, ..
                    } => {
                        rec.total_steps += 1;
                        let r = std::mem::replace(&mut resume, Resume::Start);
                        Turn::Stepped(rec.frame.step(r, fuel), Origin::Releasing)
                    }
                    TaskState::HaltRequested { .. } => Turn::Drain,
                    TaskState::Finalizing {
                        releasing: false, ..
                    } => Turn::Finalize,
                }
            };

            match turn {
                Turn::Done => return,
                Turn::Again => {}
                Turn::Stepped(event, origin) => match event {
                    StepEvent::Yielded(instr) => match self.handle_instruction(id, instr) {
                        Some(r) => resume = r,
                        None => return,
                    },
                    StepEvent::Returned(v) => self.apply_finished(id, origin, Ok(v)),
                    StepEvent::Threw(e) => self.apply_finished(id, origin, Err(e)),
                },
                Turn::Drain => {
                    let child = self.state.task(id).and_then(|r| r.children.last().copied());
                    if let Some(child) = child {
                        if self.wait_for_child(id, child) {
                            return;
                        }
                        continue;
                    }
                    // Children drained: throw the cause into the frame.
                    let Some(rec) = self.state.task_mut(id) else {
                        return;
                    };
                    let cause = match &rec.state {
                        TaskState::HaltRequested { cause } => cause.clone(),
                        _ => return,
                    };
                    let injected = cause.to_error().unwrap_or_else(Error::halted);
                    rec.state = TaskState::Unwinding { cause };
                    rec.frame.hijack(injected);
                    trace!(task = %id, "frame unwinding");
                    resume = Resume::Start;
                }
                Turn::Finalize => {
                    // Resources release in LIFO order, then late children
                    // (cleanup may have spawned) are drained, then settle.
                    let release = {
                        let Some(rec) = self.state.task_mut(id) else {
                            return;
                        };
                        rec.resources.pop()
                    };
                    if let Some(release) = release {
                        let release_op = release();
                        let Some(rec) = self.state.task_mut(id) else {
                            return;
                        };
                        let halting = match &rec.state {
                            TaskState::Finalizing { cause, .. } => !cause.is_ok(),
                            _ => true,
                        };
                        rec.frame.load(release_op, halting);
                        if let TaskState::Finalizing { releasing, .. } = &mut rec.state {
                            *releasing = true;
                        }
                        trace!(task = %id, "releasing resource");
                        resume = Resume::Start;
                        continue;
                    }

                    let child = self.state.task(id).and_then(|r| r.children.last().copied());
                    if let Some(child) = child {
                        if self.wait_for_child(id, child) {
                            return;
                        }
                        continue;
                    }

                    let Some(rec) = self.state.task(id) else {
                        return;
                    };
                    let cause = match &rec.state {
                        TaskState::Finalizing { cause, .. } => cause.clone(),
                        _ => return,
                    };
                    self.settle(id, cause);
                    return;
                }
            }
        }
    }

    /// Applies a finished frame step (`Returned` or `Threw`) to the task's
    /// lifecycle state.
    fn apply_finished(&mut self, id: TaskId, origin: Origin, outcome: Result<crate::op::raw::Payload>) {
        let Some(rec) = self.state.task_mut(id) else {
            return;
        };
        match origin {
            Origin::Running => match outcome {
                Ok(v) => {
                    rec.result = Some(v);
                    rec.state = TaskState::Finalizing {
                        cause: Settlement::Ok,
                        releasing: false,
                    };
                }
                Err(e) => {
                    rec.state = TaskState::Finalizing {
                        cause: Settlement::from_error(e),
                        releasing: false,
                    };
                }
            },
            Origin::Unwinding => {
                // The stored cause may have been strengthened by sibling
                // failures while the frame was unwinding; a cleanup error
                // supersedes it, the re-thrown injected cause does not.
                let stored = match &rec.state {
                    TaskState::Unwinding { cause } => cause.clone(),
                    _ => Settlement::Halted,
                };
                let cause = match outcome {
                    Err(e) if rec.frame.cleanup_raised() => Settlement::Err(e),
                    _ => stored,
                };
                rec.state = TaskState::Finalizing {
                    cause,
                    releasing: false,
                };
            }
            Origin::Releasing => {
                if let TaskState::Finalizing { cause, releasing } = &mut rec.state {
                    if let Err(e) = outcome {
                        trace!(task = %id, error = %e, "resource release raised");
                        cause.dominate(e);
                    }
                    *releasing = false;
                }
            }
        }
    }

    /// Handles an instruction yielded by a task's frame.
    ///
    /// Returns `Some(resume)` to continue the same turn, or `None` if the
    /// task parked or was re-enqueued.
    fn handle_instruction(&mut self, id: TaskId, instr: Instruction) -> Option<Resume> {
        match instr {
            Instruction::Suspend => {
                // Parked forever; only halt or failure escapes.
                if let Some(rec) = self.state.task_mut(id) {
                    rec.park();
                }
                None
            }
            Instruction::Wait(register) => {
                let token = self.state.task_mut(id)?.park();
                let resolver = Resolver::new(id, token, self.state.wake_queue.clone());
                register(resolver);
                None
            }
            Instruction::Sleep(duration) => {
                let deadline = self.state.now + duration;
                let token = self.state.task_mut(id)?.park();
                self.state.timers.insert(deadline, id, token);
                None
            }
            Instruction::Yield => {
                let winding = {
                    let rec = self.state.task_mut(id)?;
                    rec.pending = Some(Resume::Start);
                    rec.state.is_winding_down()
                };
                if winding {
                    self.scheduler.schedule_halt(id);
                } else {
                    self.scheduler.schedule(id);
                }
                None
            }
            Instruction::Spawn(op) => {
                let child = self.create_task(Some(id), *op);
                Some(Resume::Value(Box::new(child)))
            }
            Instruction::Register(release) => {
                self.state.task_mut(id)?.resources.push(release);
                Some(Resume::Value(unit()))
            }
            Instruction::Current => Some(Resume::Value(Box::new(id))),
            Instruction::Join(target) => {
                let ready = match self.state.task_mut(target) {
                    None => Some(Resume::Throw(
                        Error::new(ErrorKind::Internal).with_context("joined task does not exist"),
                    )),
                    Some(t) => match &t.state {
                        TaskState::Settled(Settlement::Ok) => Some(match t.result.take() {
                            Some(v) => Resume::Value(v),
                            None => Resume::Throw(
                                Error::new(ErrorKind::ResultUnavailable)
                                    .with_context("task result already claimed"),
                            ),
                        }),
                        TaskState::Settled(Settlement::Halted) => {
                            Some(Resume::Throw(Error::halted()))
                        }
                        TaskState::Settled(Settlement::Err(e)) => Some(Resume::Throw(e.clone())),
                        _ => None,
                    },
                };
                if let Some(r) = ready {
                    return Some(r);
                }
                let token = self.state.task_mut(id)?.park();
                self.state.task_mut(target)?.waiters.push(Waiter {
                    task: id,
                    token,
                    kind: WaiterKind::Join,
                });
                None
            }
            Instruction::Halt(target) => {
                self.request_halt(target, Settlement::Halted);
                let settled = match self.state.task(target) {
                    None => Some(Resume::Value(unit())),
                    Some(t) => match &t.state {
                        TaskState::Settled(_) => Some(Resume::Value(unit())),
                        _ => None,
                    },
                };
                if let Some(r) = settled {
                    return Some(r);
                }
                let token = self.state.task_mut(id)?.park();
                self.state.task_mut(target)?.waiters.push(Waiter {
                    task: id,
                    token,
                    kind: WaiterKind::Halt,
                });
                None
            }
        }
    }

    // ─── Halt protocol ──────────────────────────────────────────────────

    /// Step 1–2 of the halt protocol: record the cause and schedule the
    /// wind-down. Idempotent; on an already-winding task the cause is
    /// strengthened in place (first failure wins).
    fn request_halt(&mut self, target: TaskId, cause: Settlement) {
        let Some(rec) = self.state.task_mut(target) else {
            return;
        };
        match &mut rec.state {
            TaskState::Settled(_) => {}
            TaskState::HaltRequested { cause: current }
            | TaskState::Unwinding { cause: current }
            | TaskState::Finalizing { cause: current, .. } => {
                if current.strengthen(cause) {
                    trace!(task = %target, "halt cause strengthened");
                }
            }
            TaskState::Created | TaskState::Running => {
                debug!(task = %target, cause = %cause, "halt requested");
                rec.state = TaskState::HaltRequested { cause };
                // Forward work never resumes: drop any delivered value and
                // invalidate in-flight wakes and timers.
                rec.invalidate_wakes();
                rec.pending = Some(Resume::Start);
                self.scheduler.move_to_halt_lane(target);
            }
        }
    }

    /// Halts `child` and parks `parent` until it settles.
    ///
    /// Returns false (without parking) if the child turned out to be settled
    /// already, in which case the caller simply continues its drain.
    fn wait_for_child(&mut self, parent: TaskId, child: TaskId) -> bool {
        self.request_halt(child, Settlement::Halted);
        let terminal = self
            .state
            .task(child)
            .is_none_or(|c| c.state.is_terminal());
        if terminal {
            // Settled children are normally removed at settlement; drop the
            // stale link and keep draining.
            if let Some(rec) = self.state.task_mut(parent) {
                rec.children.retain(|c| *c != child);
            }
            return false;
        }
        let Some(token) = self.state.task_mut(parent).map(TaskRecord::park) else {
            return false;
        };
        if let Some(child_rec) = self.state.task_mut(child) {
            child_rec.waiters.push(Waiter {
                task: parent,
                token,
                kind: WaiterKind::Finalize,
            });
        }
        true
    }

    /// Steps 6–7 of the halt protocol: transition to `Settled`, resolve
    /// waiters, notify the parent, and cascade failures.
    fn settle(&mut self, id: TaskId, settlement: Settlement) {
        let queue = self.state.wake_queue.clone();
        let (waiters, parent) = {
            let Some(rec) = self.state.task_mut(id) else {
                return;
            };
            debug_assert!(rec.children.is_empty(), "settling with live children");
            rec.state = TaskState::Settled(settlement.clone());
            rec.invalidate_wakes();
            rec.pending = None;
            (std::mem::take(&mut rec.waiters), rec.parent)
        };
        self.scheduler.remove(id);
        debug!(task = %id, outcome = %settlement, "task settled");

        for waiter in waiters {
            let signal = match (&settlement, waiter.kind) {
                (Settlement::Ok, WaiterKind::Join) => {
                    match self.state.task_mut(id).and_then(|r| r.result.take()) {
                        Some(v) => Signal::Value(v),
                        None => Signal::Throw(
                            Error::new(ErrorKind::ResultUnavailable)
                                .with_context("task result already claimed"),
                        ),
                    }
                }
                (Settlement::Halted, WaiterKind::Join) => Signal::Throw(Error::halted()),
                (Settlement::Err(e), WaiterKind::Join) => Signal::Throw(e.clone()),
                // Halt is void: waiters just proceed. A failed settlement
                // reaches them through the parent cascade instead.
                (_, WaiterKind::Halt | WaiterKind::Finalize) => Signal::Value(unit()),
            };
            queue.push(Wake {
                task: waiter.task,
                token: waiter.token,
                signal,
            });
        }

        if let Some(parent) = parent {
            if let Some(rec) = self.state.task_mut(parent) {
                rec.children.retain(|c| *c != id);
            }
            if let Settlement::Err(e) = &settlement {
                trace!(child = %id, parent = %parent, "child failure cascades");
                self.request_halt(parent, Settlement::Err(e.clone()));
            }
        }
    }

    // ─── Wake and timer delivery ────────────────────────────────────────

    fn drain_wakes(&mut self) {
        while let Some(wake) = self.state.wake_queue.pop() {
            let winding = {
                let Some(rec) = self.state.task_mut(wake.task) else {
                    continue;
                };
                if !rec.accepts_wake(wake.token) {
                    trace!(task = %wake.task, "stale wake dropped");
                    continue;
                }
                rec.invalidate_wakes();
                rec.pending = Some(match wake.signal {
                    Signal::Value(v) => Resume::Value(v),
                    Signal::Throw(e) => Resume::Throw(e),
                });
                rec.state.is_winding_down()
            };
            if winding {
                self.scheduler.schedule_halt(wake.task);
            } else {
                self.scheduler.schedule(wake.task);
            }
        }
    }

    fn fire_due_timers(&mut self) {
        let now = self.state.now;
        while let Some(entry) = self.state.timers.pop_due(now) {
            self.state.wake_queue.push(Wake {
                task: entry.task,
                token: entry.token,
                signal: Signal::Value(unit()),
            });
        }
    }

    // ─── Result extraction ──────────────────────────────────────────────

    fn claim_result<T: Send + 'static>(&mut self, id: TaskId) -> Result<T> {
        let Some(rec) = self.state.task_mut(id) else {
            return Err(Error::new(ErrorKind::Internal).with_context("task does not exist"));
        };
        match &rec.state {
            TaskState::Settled(Settlement::Ok) => match rec.result.take() {
                Some(v) => v.downcast::<T>().map(|b| *b).map_err(|_| {
                    Error::new(ErrorKind::Internal).with_context("task result type mismatch")
                }),
                None => Err(Error::new(ErrorKind::ResultUnavailable)
                    .with_context("task result already claimed")),
            },
            TaskState::Settled(Settlement::Halted) => Err(Error::halted()),
            TaskState::Settled(Settlement::Err(e)) => Err(e.clone()),
            _ => Err(Error::new(ErrorKind::Internal).with_context("task has not settled")),
        }
    }
}

impl core::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Runtime")
            .field("state", &self.state)
            .field("scheduled", &self.scheduler.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op;

    #[test]
    fn block_on_value() {
        let mut rt = Runtime::new();
        assert_eq!(rt.block_on(op::value(42)).unwrap(), 42);
        assert!(rt.is_quiescent());
    }

    #[test]
    fn block_on_failure() {
        let mut rt = Runtime::new();
        let err = rt.block_on(op::fail::<i32>(Error::msg("boom"))).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn actions_chain_within_one_run() {
        let mut rt = Runtime::new();
        let result = rt
            .block_on(op::action(|| Ok(12)).and_then(|a| op::action(move || Ok(a + 55))))
            .unwrap();
        assert_eq!(result, 67);
    }

    #[test]
    fn suspended_root_stalls_until_halted() {
        let mut rt = Runtime::new();
        let handle = rt.run(op::suspend());
        rt.run_until_stalled();
        assert!(!handle.is_settled(&rt));

        rt.halt(handle.task_id());
        let err = rt.run_until_settled(&handle).unwrap_err();
        assert!(err.is_halted());
        assert!(rt.is_quiescent());
    }

    #[test]
    fn run_until_settled_reports_stall() {
        let mut rt = Runtime::new();
        let handle = rt.run(op::suspend());
        let err = rt.run_until_settled(&handle).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Stalled);
    }

    #[test]
    fn spawn_returns_handle_same_turn() {
        let mut rt = Runtime::new();
        let result = rt
            .block_on(op::spawn(op::value(7)).and_then(|child| child.join()))
            .unwrap();
        assert_eq!(result, 7);
    }

    #[test]
    fn sleeping_advances_virtual_time() {
        let mut rt = Runtime::new();
        let handle = rt.run(crate::time::sleep(Duration::from_millis(5)));
        rt.run_until_settled(&handle).unwrap();
        assert_eq!(rt.now().as_millis(), 5);
    }

    #[test]
    fn yield_now_round_trips_through_the_queue() {
        let mut rt = Runtime::new();
        let result = rt
            .block_on(op::yield_now().and_then(|()| op::value("after")))
            .unwrap();
        assert_eq!(result, "after");
    }

    #[test]
    fn halt_is_idempotent() {
        let mut rt = Runtime::new();
        let handle = rt.run(op::suspend());
        rt.run_until_stalled();
        rt.halt(handle.task_id());
        rt.halt(handle.task_id());
        let err = rt.run_until_settled(&handle).unwrap_err();
        assert!(err.is_halted());
    }

    #[test]
    fn halting_a_settled_task_is_a_noop() {
        let mut rt = Runtime::new();
        let handle = rt.run(op::value(1));
        let value = rt.run_until_settled(&handle).unwrap();
        assert_eq!(value, 1);
        rt.halt(handle.task_id());
        assert!(handle
            .settlement(&rt)
            .is_some_and(|s| s.is_ok()));
    }

    #[test]
    fn step_quota_forces_turn_boundaries() {
        let mut rt = Runtime::with_config(RuntimeConfig::new().step_quota(2));
        // Deep pure chain: must complete across several turns.
        let mut op = op::value(0_u32);
        for _ in 0..32 {
            op = op.and_then(|n| op::value(n + 1));
        }
        let handle = rt.run(op);
        let result = rt.run_until_settled(&handle).unwrap();
        assert_eq!(result, 32);
        assert!(rt.steps() > 1, "expected multiple scheduler turns");
    }
}
