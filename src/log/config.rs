//! Writer configuration.
//!
//! A flat set of recognized options, validated once at `open`. The batch
//! limits bound worst-case latency (`max_batch_wait_millis`) and worst-case
//! memory (`max_batch_size_bytes`); the queue limit bounds outstanding
//! unflushed work (backpressure).

use super::errors::{LogError, LogResult};
use super::format::{MAX_FRAME_LENGTH, MIN_FRAME_LENGTH};

/// Configuration for a [`super::LogWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Frame bytes accumulated in a batch before a flush is forced.
    pub max_batch_size_bytes: usize,
    /// Upper bound on how long a collected request waits before its batch
    /// is flushed.
    pub max_batch_wait_millis: u64,
    /// Maximum outstanding (queued or in-flight) requests before `push`
    /// blocks for admission.
    pub max_queue_size: usize,
    /// Per-record payload cap.
    pub max_record_size_bytes: usize,
    /// Whether a flush forces file metadata as well as data. `false` is the
    /// faster data-only force; `true` additionally makes file size and
    /// timestamps durable.
    pub sync_metadata: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_batch_size_bytes: 1024 * 1024,
            max_batch_wait_millis: 5,
            max_queue_size: 100_000,
            max_record_size_bytes: 16 * 1024 * 1024,
            sync_metadata: false,
        }
    }
}

impl WriterConfig {
    /// Largest payload any configuration may allow: a frame must stay
    /// within the scanner's sanity bound to be readable after a crash.
    pub const MAX_ALLOWED_RECORD_SIZE: usize =
        (MAX_FRAME_LENGTH - MIN_FRAME_LENGTH) as usize;

    /// Validates option values. Called by `open`; rejected configurations
    /// never construct a writer.
    pub fn validate(&self) -> LogResult<()> {
        if self.max_batch_size_bytes == 0 {
            return Err(LogError::InvalidConfig(
                "max_batch_size_bytes must be positive".into(),
            ));
        }
        if self.max_queue_size == 0 {
            return Err(LogError::InvalidConfig(
                "max_queue_size must be positive".into(),
            ));
        }
        if self.max_record_size_bytes == 0 {
            return Err(LogError::InvalidConfig(
                "max_record_size_bytes must be positive".into(),
            ));
        }
        if self.max_record_size_bytes > Self::MAX_ALLOWED_RECORD_SIZE {
            return Err(LogError::InvalidConfig(format!(
                "max_record_size_bytes {} exceeds format limit {}",
                self.max_record_size_bytes,
                Self::MAX_ALLOWED_RECORD_SIZE
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = WriterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_batch_size_bytes, 1024 * 1024);
        assert_eq!(config.max_batch_wait_millis, 5);
        assert_eq!(config.max_queue_size, 100_000);
        assert_eq!(config.max_record_size_bytes, 16 * 1024 * 1024);
        assert!(!config.sync_metadata);
    }

    #[test]
    fn zero_batch_size_rejected() {
        let config = WriterConfig {
            max_batch_size_bytes: 0,
            ..WriterConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().code(), "LOG_INVALID_CONFIG");
    }

    #[test]
    fn zero_queue_size_rejected() {
        let config = WriterConfig {
            max_queue_size: 0,
            ..WriterConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_record_size_rejected() {
        let config = WriterConfig {
            max_record_size_bytes: 0,
            ..WriterConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn record_size_beyond_format_limit_rejected() {
        let config = WriterConfig {
            max_record_size_bytes: WriterConfig::MAX_ALLOWED_RECORD_SIZE + 1,
            ..WriterConfig::default()
        };
        assert!(config.validate().is_err());

        let config = WriterConfig {
            max_record_size_bytes: WriterConfig::MAX_ALLOWED_RECORD_SIZE,
            ..WriterConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_wait_is_valid() {
        let config = WriterConfig {
            max_batch_wait_millis: 0,
            ..WriterConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
