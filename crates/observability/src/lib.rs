//! Tracing and logging setup shared by the binaries.

/// Initialize process-wide tracing from `config`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(config: &LogConfig) {
    tracing::init(config);
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::{LogConfig, LogFormat, ParseLogFormatError};
