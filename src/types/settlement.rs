//! Settlement lattice for task outcomes.
//!
//! A task's terminal state is one of:
//!
//! - `Ok`: the operation returned normally (the value travels separately,
//!   through the task's result slot)
//! - `Halted`: the task was cancelled and its cleanup ran to completion
//! - `Err(e)`: the task failed, or its cleanup raised
//!
//! These form a severity lattice: `Ok < Halted < Err`. While a task is
//! winding down the same type doubles as the *pending cause*, updated by two
//! distinct rules:
//!
//! - [`strengthen`](Settlement::strengthen): sibling/child failures observed
//!   during the drain adopt a strictly more severe cause; among equally
//!   severe causes the first one observed wins
//! - [`dominate`](Settlement::dominate): an error raised by a cleanup block
//!   unconditionally replaces the current cause, whatever it is

use crate::error::Error;
use core::fmt;

/// The three-valued settlement of a task, and the pending cause while a task
/// is halting.
#[derive(Debug, Clone)]
pub enum Settlement {
    /// The task returned normally.
    Ok,
    /// The task was halted and unwound cleanly.
    Halted,
    /// The task failed with an error.
    Err(Error),
}

impl Settlement {
    /// Returns the severity level of this settlement (0 = Ok, 2 = Err).
    #[must_use]
    pub const fn severity(&self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Halted => 1,
            Self::Err(_) => 2,
        }
    }

    /// Returns true if this settlement is `Ok`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns true if this settlement is `Halted`.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        matches!(self, Self::Halted)
    }

    /// Returns true if this settlement is `Err`.
    #[must_use]
    pub const fn is_err(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    /// Adopts `other` if it is strictly more severe.
    ///
    /// Equal severity keeps the current cause, which is what implements the
    /// "earliest failure wins" tie-break when several children fail within
    /// one turn. Returns `true` if the cause changed.
    pub fn strengthen(&mut self, other: Self) -> bool {
        if other.severity() > self.severity() {
            *self = other;
            return true;
        }
        false
    }

    /// Replaces the cause with a cleanup error, whatever the current cause.
    pub fn dominate(&mut self, error: Error) {
        *self = Self::Err(error);
    }

    /// Converts the cause into the error injected at the frame's suspension
    /// point, or `None` for a normal return.
    #[must_use]
    pub fn to_error(&self) -> Option<Error> {
        match self {
            Self::Ok => None,
            Self::Halted => Some(Error::halted()),
            Self::Err(e) => Some(e.clone()),
        }
    }

    /// Classifies a terminal frame error back into a settlement.
    #[must_use]
    pub fn from_error(error: Error) -> Self {
        if error.is_halted() {
            Self::Halted
        } else {
            Self::Err(error)
        }
    }
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Halted => write!(f, "halted"),
            Self::Err(e) => write!(f, "error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Settlement::Ok.severity() < Settlement::Halted.severity());
        assert!(Settlement::Halted.severity() < Settlement::Err(Error::msg("x")).severity());
    }

    #[test]
    fn strengthen_adopts_more_severe() {
        let mut cause = Settlement::Ok;
        assert!(cause.strengthen(Settlement::Halted));
        assert!(cause.is_halted());
        assert!(cause.strengthen(Settlement::Err(Error::msg("boom"))));
        assert!(cause.is_err());
    }

    #[test]
    fn strengthen_keeps_first_among_equals() {
        let mut cause = Settlement::Err(Error::msg("first"));
        assert!(!cause.strengthen(Settlement::Err(Error::msg("second"))));
        match cause {
            Settlement::Err(e) => assert_eq!(e.to_string(), "first"),
            _ => panic!("expected err"),
        }
    }

    #[test]
    fn strengthen_never_weakens() {
        let mut cause = Settlement::Err(Error::msg("boom"));
        assert!(!cause.strengthen(Settlement::Halted));
        assert!(!cause.strengthen(Settlement::Ok));
        assert!(cause.is_err());
    }

    #[test]
    fn dominate_replaces_any_cause() {
        let mut cause = Settlement::Err(Error::msg("boom"));
        cause.dominate(Error::msg("bang"));
        match cause {
            Settlement::Err(e) => assert_eq!(e.to_string(), "bang"),
            _ => panic!("expected err"),
        }
    }

    #[test]
    fn error_round_trip() {
        assert!(Settlement::Halted
            .to_error()
            .is_some_and(|e| e.is_halted()));
        assert!(Settlement::from_error(Error::halted()).is_halted());
        assert!(Settlement::from_error(Error::msg("boom")).is_err());
        assert!(Settlement::Ok.to_error().is_none());
    }
}
