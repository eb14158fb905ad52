use std::io;

use thiserror::Error;

/// Failure while configuring or installing the logger.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// Unknown output format name.
    #[error("unknown log format {0:?} (expected text, json or journald)")]
    InvalidFormat(String),

    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidLevel { filter: String, reason: String },

    #[error("unknown timezone {0:?} (expected utc or local)")]
    InvalidTimeZone(String),

    #[error("journald output requires Linux")]
    JournaldNotSupported,

    #[error("connecting to journald failed: {0}")]
    JournaldUnavailable(#[source] io::Error),

    /// A global subscriber is already set, possibly by another `init_logger` call.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

pub type LoggerResult<T> = Result<T, LoggerError>;
