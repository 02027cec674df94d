//! End-of-run diagnostics flushing.
//!
//! Invoked once before process exit so buffered diagnostics are persisted
//! even when the run ends early.

use std::io::Write;
use tracing::debug;

/// Flushes buffered diagnostics streams
pub fn flush() {
    debug!("flushing diagnostics");
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
}
