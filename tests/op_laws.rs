//! Algebraic laws of operations, checked over randomly generated programs.
//!
//! - **Composition**: delegating to an operation settles identically to
//!   running it directly.
//! - **Catchability**: an error raised by a delegated sub-operation is
//!   caught by an enclosing handler and does not propagate.
//! - **Cleanup transparency**: a no-op cleanup block never changes a
//!   program's settlement.

mod common;

use common::*;
use operon::{op, time, Error, Operation};
use proptest::prelude::*;

/// A deterministic little program over `i32`, with a pure evaluator.
#[derive(Debug, Clone)]
enum Prog {
    Value(i32),
    Action(i32),
    AddThen(i32, Box<Prog>),
    FailCatch(Box<Prog>),
    Ensure(Box<Prog>),
    YieldThen(Box<Prog>),
    SleepThen(u8, Box<Prog>),
    SpawnJoin(Box<Prog>),
}

fn build(prog: Prog) -> Operation<i32> {
    match prog {
        Prog::Value(v) => op::value(v),
        Prog::Action(v) => op::action(move || Ok(v)),
        Prog::AddThen(k, rest) => build(*rest).map(move |n| n.wrapping_add(k)),
        Prog::FailCatch(rest) => {
            op::fail::<i32>(Error::msg("expected")).or_else(move |_| build(*rest))
        }
        Prog::Ensure(rest) => build(*rest).finally(|| op::value(())),
        Prog::YieldThen(rest) => op::yield_now().and_then(move |()| build(*rest)),
        Prog::SleepThen(ms, rest) => {
            time::sleep_ms(u64::from(ms)).and_then(move |()| build(*rest))
        }
        Prog::SpawnJoin(rest) => op::spawn(build(*rest)).and_then(|child| child.join()),
    }
}

fn expected(prog: &Prog) -> i32 {
    match prog {
        Prog::Value(v) | Prog::Action(v) => *v,
        Prog::AddThen(k, rest) => expected(rest).wrapping_add(*k),
        Prog::FailCatch(rest)
        | Prog::Ensure(rest)
        | Prog::YieldThen(rest)
        | Prog::SpawnJoin(rest) => expected(rest),
        Prog::SleepThen(_, rest) => expected(rest),
    }
}

fn prog_strategy() -> impl Strategy<Value = Prog> {
    let leaf = prop_oneof![
        any::<i32>().prop_map(Prog::Value),
        any::<i32>().prop_map(Prog::Action),
    ];
    leaf.prop_recursive(6, 24, 4, |inner| {
        prop_oneof![
            (any::<i32>(), inner.clone()).prop_map(|(k, p)| Prog::AddThen(k, Box::new(p))),
            inner.clone().prop_map(|p| Prog::FailCatch(Box::new(p))),
            inner.clone().prop_map(|p| Prog::Ensure(Box::new(p))),
            inner.clone().prop_map(|p| Prog::YieldThen(Box::new(p))),
            (0_u8..10, inner.clone()).prop_map(|(ms, p)| Prog::SleepThen(ms, Box::new(p))),
            inner.prop_map(|p| Prog::SpawnJoin(Box::new(p))),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn programs_settle_to_their_pure_evaluation(prog in prog_strategy()) {
        let mut rt = test_runtime();
        let want = expected(&prog);
        let got = rt.block_on(build(prog)).unwrap();
        prop_assert_eq!(got, want);
        prop_assert!(rt.is_quiescent());
    }

    #[test]
    fn delegation_is_transparent(prog in prog_strategy()) {
        let mut rt = test_runtime();
        let want = expected(&prog);
        // run(delegate(op)) settles identically to run(op).
        let got = rt
            .block_on(op::value(()).and_then(move |()| build(prog)))
            .unwrap();
        prop_assert_eq!(got, want);
    }

    #[test]
    fn noop_cleanup_is_transparent(prog in prog_strategy()) {
        let mut rt = test_runtime();
        let want = expected(&prog);
        let got = rt.block_on(build(prog).finally(|| op::value(()))).unwrap();
        prop_assert_eq!(got, want);
    }

    #[test]
    fn raised_messages_are_caught_verbatim(msg in "[a-z]{1,12}") {
        let mut rt = test_runtime();
        let raised = msg.clone();
        let got = rt
            .block_on(
                op::fail::<String>(Error::msg(raised)).or_else(|e| op::value(e.to_string())),
            )
            .unwrap();
        prop_assert_eq!(got, msg);
    }

    #[test]
    fn uncaught_errors_reject_the_run(msg in "[a-z]{1,12}") {
        let mut rt = test_runtime();
        let raised = msg.clone();
        let err = rt.block_on(op::fail::<i32>(Error::msg(raised))).unwrap_err();
        prop_assert_eq!(err.to_string(), msg);
    }
}
