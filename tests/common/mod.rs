#![allow(dead_code)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use operon::{Runtime, RuntimeConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Create a runtime for tests, with a step bound so a scheduling bug can
/// never hang the suite.
#[must_use]
pub fn test_runtime() -> Runtime {
    init_test_logging();
    Runtime::with_config(RuntimeConfig::new().max_steps(100_000))
}

/// A shared flag settable from inside operations.
#[must_use]
pub fn flag() -> (Arc<AtomicBool>, Arc<AtomicBool>) {
    let f = Arc::new(AtomicBool::new(false));
    (f.clone(), f)
}

/// Reads a shared flag.
#[must_use]
pub fn flagged(f: &Arc<AtomicBool>) -> bool {
    f.load(Ordering::SeqCst)
}

/// Sets a shared flag.
pub fn set_flag(f: &Arc<AtomicBool>) {
    f.store(true, Ordering::SeqCst);
}

/// A shared event log for asserting ordering across tasks.
#[must_use]
pub fn event_log() -> (Arc<Mutex<Vec<&'static str>>>, Arc<Mutex<Vec<&'static str>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    (log.clone(), log)
}

/// Appends an event to the log.
pub fn record(log: &Arc<Mutex<Vec<&'static str>>>, event: &'static str) {
    log.lock().expect("event log poisoned").push(event);
}

/// Snapshots the log contents.
#[must_use]
pub fn events(log: &Arc<Mutex<Vec<&'static str>>>) -> Vec<&'static str> {
    log.lock().expect("event log poisoned").clone()
}
