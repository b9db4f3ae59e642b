//! Logging setup shared by binaries.

/// Initialize process-wide tracing (filter from `RUST_LOG`, format from
/// `RXOFFICE_LOG_FORMAT`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    self::tracing::init(LogFormat::from_env());
}

pub use self::tracing::LogFormat;

/// Tracing configuration (filters, layers).
pub mod tracing;
