//! Error types and error handling strategy for Operon.
//!
//! This module defines the core error type used throughout the runtime.
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - Halt is a sentinel with a stable, matchable rendering (`"halted"`)
//! - Cleanup errors are ordinary errors; the settlement lattice decides
//!   which cause survives

use core::fmt;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The task was halted. Displays as exactly `halted`.
    Halted,
    /// An error raised by user code.
    User,
    /// Send on a closed channel.
    ChannelClosed,
    /// A task's result was already claimed by another awaiter.
    ResultUnavailable,
    /// The runtime can make no further progress without external input.
    Stalled,
    /// Internal runtime error (bug).
    Internal,
}

/// The main error type for Operon operations.
///
/// Errors are cheap to clone: the optional source is reference-counted so a
/// single failure can be delivered to every waiter of a settled task.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    context: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
            source: None,
        }
    }

    /// Creates a user error carrying a message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::User).with_context(message)
    }

    /// Creates the halt sentinel error.
    #[must_use]
    pub const fn halted() -> Self {
        Self::new(ErrorKind::Halted)
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true if this error is the halt sentinel.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        matches!(self.kind, ErrorKind::Halted)
    }

    /// Adds deterministic context text to the error.
    #[must_use]
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, &self.context) {
            // Stable marker: external awaiters match on this exact text.
            (ErrorKind::Halted, _) => write!(f, "halted"),
            (ErrorKind::User, Some(ctx)) => write!(f, "{ctx}"),
            (ErrorKind::User, None) => write!(f, "user error"),
            (kind, Some(ctx)) => write!(f, "{kind:?}: {ctx}"),
            (kind, None) => write!(f, "{kind:?}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Attach a context string on error.
    fn context(self, ctx: impl Into<String>) -> Result<T>;
    /// Attach context computed lazily on error.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
    fn context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(ctx))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().with_context(f()))
    }
}

/// A specialized Result type for Operon operations.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug)]
    struct Underlying;

    impl fmt::Display for Underlying {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "underlying")
        }
    }

    impl std::error::Error for Underlying {}

    #[test]
    fn halted_displays_stable_marker() {
        assert_eq!(Error::halted().to_string(), "halted");
        // Context must not leak into the marker.
        assert_eq!(
            Error::halted().with_context("extra").to_string(),
            "halted"
        );
    }

    #[test]
    fn user_error_displays_message_only() {
        assert_eq!(Error::msg("boom").to_string(), "boom");
    }

    #[test]
    fn display_with_kind_and_context() {
        let err = Error::new(ErrorKind::ChannelClosed).with_context("send after close");
        assert_eq!(err.to_string(), "ChannelClosed: send after close");
    }

    #[test]
    fn source_chain_is_exposed() {
        let err = Error::msg("outer").with_source(Underlying);
        let source = err.source().expect("source missing");
        assert_eq!(source.to_string(), "underlying");
    }

    #[test]
    fn predicates_match_kind() {
        assert!(Error::halted().is_halted());
        assert!(!Error::msg("boom").is_halted());
        assert_eq!(Error::msg("boom").kind(), ErrorKind::User);
    }

    #[test]
    fn result_ext_adds_context() {
        let res: core::result::Result<(), Error> = Err(Error::new(ErrorKind::Internal));
        let err = res.context("during finalize").expect_err("expected err");
        assert_eq!(err.to_string(), "Internal: during finalize");
    }
}
