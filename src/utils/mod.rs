//! Utilities: per-process logging context (stderr + rotating file).
//!
//! Key items:
//!   LogContext / LogLevel
//!   Rotation / log_dir_from

pub mod logging;

pub use logging::{LOG_DIR_ENV, LogContext, LogLevel, Rotation, log_dir_from};
