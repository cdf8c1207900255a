//! Tasks: scheduled, live instances of operations.
//!
//! A task owns one root [`Frame`](crate::op::frame::Frame) and an ordered
//! list of children. Tasks settle only after every descendant has settled,
//! and resources registered on a task are released before it settles.

pub(crate) mod record;

mod handle;

pub use handle::{RootHandle, TaskHandle, TaskRef};
