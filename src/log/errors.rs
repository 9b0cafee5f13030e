//! Error types for the log writer.
//!
//! Severity model:
//! - `Error`: the operation fails, the writer keeps running
//! - `Fatal`: durability can no longer be trusted (failed force, corruption)
//!
//! Errors cross the producer/sync-thread boundary by value: the commit loop
//! never unwinds into a producer, it resolves each pending request with a
//! clone of the triggering error. That is why `LogError` is `Clone` and
//! carries I/O failures as kind + message rather than a live `io::Error`.

use std::fmt;
use std::io;

use thiserror::Error;

/// Severity of a log error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, writer continues.
    Error,
    /// Durability guarantee is broken; the writer should be closed.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Errors raised by the writer and recovery surfaces.
#[derive(Debug, Clone, Error)]
pub enum LogError {
    /// Configuration rejected before the writer was constructed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Payload exceeds the configured per-record cap. Never enqueued.
    #[error("record of {actual} bytes exceeds maximum record size {limit}")]
    RecordTooLarge { actual: usize, limit: usize },

    /// Operation attempted after shutdown began.
    #[error("log writer is closed")]
    Closed,

    /// Failure while serializing, writing, or forcing a batch.
    #[error("{op} failed ({kind:?}): {message}")]
    Io {
        op: &'static str,
        kind: io::ErrorKind,
        message: String,
    },

    /// Structural damage detected while opening or scanning a log file.
    #[error("corruption at byte offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },
}

impl LogError {
    /// Wrap an I/O failure from the named operation.
    pub fn io(op: &'static str, source: &io::Error) -> Self {
        LogError::Io {
            op,
            kind: source.kind(),
            message: source.to_string(),
        }
    }

    /// Corruption with a byte-offset context.
    pub fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        LogError::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    /// Stable string code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            LogError::InvalidConfig(_) => "LOG_INVALID_CONFIG",
            LogError::RecordTooLarge { .. } => "LOG_RECORD_TOO_LARGE",
            LogError::Closed => "LOG_CLOSED",
            LogError::Io { .. } => "LOG_IO_FAILED",
            LogError::Corruption { .. } => "LOG_CORRUPTION",
        }
    }

    /// Severity of this error.
    pub fn severity(&self) -> Severity {
        match self {
            LogError::InvalidConfig(_) | LogError::RecordTooLarge { .. } | LogError::Closed => {
                Severity::Error
            }
            LogError::Io { .. } | LogError::Corruption { .. } => Severity::Fatal,
        }
    }

    /// Whether this error invalidates the durability guarantee.
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Result type for log operations.
pub type LogResult<T> = Result<T, LogError>;
