//! # zvaldump Utilities
//!
//! Logging setup shared by the zvaldump binary and anything else embedding
//! `zvaldump-core`, built on `tracing`.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
