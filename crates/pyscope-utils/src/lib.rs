//! # Pyscope Utilities
//!
//! Logging setup shared by the Pyscope binaries.
//!
//! Library crates only emit `tracing` events; this crate decides where they
//! go. Call [`init_logging`] once at startup and keep the returned guard
//! alive until exit.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogConfig, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
