//! Crash recovery: validate a log file and truncate its torn tail.
//!
//! State machine over file positions: header check, record scan, truncate.
//! The scan accepts records strictly in order and halts at the first frame
//! that fails a bounds or checksum check; the halting frame and everything
//! after it are discarded by physically truncating the file, leaving a
//! clean append point for the next writer.
//!
//! A torn tail is an expected post-crash condition: recovery reports it in
//! the result rather than failing. Only real I/O errors surface as `Err`.

use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;

use crate::crash_point::{maybe_crash, points};
use crate::log::{LogError, LogResult};
use crate::observability::Logger;

use super::reader::LogReader;

/// Outcome of one `recover` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Whether the file was structurally usable (header valid). Scans that
    /// truncated a torn tail still count as success.
    pub success: bool,
    /// Records accepted by the scan.
    pub valid_records: u64,
    /// Corrupt or truncated records encountered (the scan halts at the
    /// first, so this is 0 or 1).
    pub corrupt_records: u64,
    /// Bytes physically removed from the file.
    pub bytes_truncated: u64,
    /// Human-readable diagnostic.
    pub message: String,
}

impl RecoveryResult {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            valid_records: 0,
            corrupt_records: 0,
            bytes_truncated: 0,
            message: message.into(),
        }
    }
}

impl fmt::Display for RecoveryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "recovery: success={} valid={} corrupt={} truncated={} ({})",
            self.success,
            self.valid_records,
            self.corrupt_records,
            self.bytes_truncated,
            self.message
        )
    }
}

/// Validates the file at `path` and truncates any torn tail.
///
/// Never runs concurrently with an active writer on the same file. Running
/// it twice in succession yields the same result with zero additional
/// bytes removed.
pub fn recover(path: impl AsRef<Path>) -> LogResult<RecoveryResult> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(RecoveryResult::failed("file does not exist"));
    }

    let mut reader = match LogReader::open(path) {
        Ok(reader) => reader,
        // Structural problems (short file, bad magic, bad version) fail
        // fast without truncation.
        Err(LogError::Corruption { reason, .. }) => {
            return Ok(RecoveryResult::failed(reason));
        }
        Err(error) => return Err(error),
    };

    while reader.read_next()?.is_some() {}
    let valid_records = reader.records_read();
    let valid_end = reader.valid_prefix_end();
    let file_size = reader.file_size();
    let halt_reason = reader.halt_reason().map(str::to_string);
    drop(reader);

    let bytes_truncated = file_size - valid_end;
    let corrupt_records = u64::from(halt_reason.is_some());

    if bytes_truncated > 0 {
        maybe_crash(points::RECOVERY_BEFORE_TRUNCATE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| LogError::io("open for truncate", &e))?;
        file.set_len(valid_end)
            .map_err(|e| LogError::io("truncate", &e))?;
        file.sync_all()
            .map_err(|e| LogError::io("force truncation", &e))?;
        maybe_crash(points::RECOVERY_AFTER_TRUNCATE);

        Logger::warn(
            "RECOVERY_TRUNCATED",
            &[
                ("path", &path.display().to_string()),
                ("bytes", &bytes_truncated.to_string()),
                ("valid_records", &valid_records.to_string()),
            ],
        );
    } else {
        Logger::info(
            "RECOVERY_CLEAN",
            &[
                ("path", &path.display().to_string()),
                ("valid_records", &valid_records.to_string()),
            ],
        );
    }

    let message = match halt_reason {
        Some(reason) => format!("truncated {bytes_truncated} bytes: {reason}"),
        None if bytes_truncated > 0 => format!("truncated {bytes_truncated} trailing bytes"),
        None => "file is clean".to_string(),
    };

    Ok(RecoveryResult {
        success: true,
        valid_records,
        corrupt_records,
        bytes_truncated,
        message,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::super::reader::read_all;
    use super::*;
    use crate::log::{LogWriter, WriterConfig, FILE_HEADER_SIZE};

    fn write_records(path: &Path, payloads: &[&[u8]]) {
        let writer = LogWriter::open(path, WriterConfig::default()).unwrap();
        for payload in payloads {
            writer.push(payload).unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn missing_file_fails_without_error() {
        let dir = TempDir::new().unwrap();
        let result = recover(dir.path().join("absent.log")).unwrap();
        assert!(!result.success);
        assert!(result.message.contains("does not exist"));
    }

    #[test]
    fn empty_file_fails_fast() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.log");
        std::fs::File::create(&path).unwrap();

        let result = recover(&path).unwrap();
        assert!(!result.success);
        assert!(result.message.contains("too small"));
        // No truncation on structural failure.
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn bad_magic_fails_fast_without_truncation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foreign.log");
        std::fs::write(&path, vec![0x55; 64]).unwrap();

        let result = recover(&path).unwrap();
        assert!(!result.success);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 64);
    }

    #[test]
    fn clean_file_reports_no_truncation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clean.log");
        write_records(&path, &[b"one", b"two"]);

        let result = recover(&path).unwrap();
        assert!(result.success);
        assert_eq!(result.valid_records, 2);
        assert_eq!(result.corrupt_records, 0);
        assert_eq!(result.bytes_truncated, 0);
        assert_eq!(result.message, "file is clean");
    }

    #[test]
    fn header_only_file_is_clean() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("headeronly.log");
        write_records(&path, &[]);

        let result = recover(&path).unwrap();
        assert!(result.success);
        assert_eq!(result.valid_records, 0);
        assert_eq!(result.bytes_truncated, 0);
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            FILE_HEADER_SIZE as u64
        );
    }

    #[test]
    fn garbage_tail_is_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("torn.log");
        write_records(&path, &[b"alpha", b"beta"]);
        let clean_size = std::fs::metadata(&path).unwrap().len();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.extend_from_slice(&[0x12, 0x34, 0x56, 0x78, 0x00, 0x00]);
        std::fs::write(&path, &bytes).unwrap();

        let result = recover(&path).unwrap();
        assert!(result.success);
        assert_eq!(result.valid_records, 2);
        assert_eq!(result.bytes_truncated, 6);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), clean_size);

        let records = read_all(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].payload, b"alpha");
        assert_eq!(records[1].payload, b"beta");
    }

    #[test]
    fn flipped_payload_byte_halts_scan_at_that_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bitflip.log");
        write_records(&path, &[b"good one", b"victim!!", b"unreachable"]);

        let mut bytes = std::fs::read(&path).unwrap();
        // Second record's payload starts after header + frame 1 + frame 2's
        // record header.
        let victim_payload_start = FILE_HEADER_SIZE + (16 + 8) + 16;
        bytes[victim_payload_start] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let result = recover(&path).unwrap();
        assert!(result.success);
        assert_eq!(result.valid_records, 1);
        assert_eq!(result.corrupt_records, 1);
        assert!(result.bytes_truncated > 0);

        let records = read_all(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload, b"good one");
    }

    #[test]
    fn recovery_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("twice.log");
        write_records(&path, &[b"kept"]);

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.extend_from_slice(&[0xFF; 20]);
        std::fs::write(&path, &bytes).unwrap();

        let first = recover(&path).unwrap();
        assert_eq!(first.bytes_truncated, 20);

        let second = recover(&path).unwrap();
        assert!(second.success);
        assert_eq!(second.valid_records, first.valid_records);
        assert_eq!(second.bytes_truncated, 0);
        assert_eq!(second.corrupt_records, 0);
    }

    #[test]
    fn writer_can_append_after_recovery() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resume.log");
        write_records(&path, &[b"before crash"]);

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.extend_from_slice(&[0x01, 0x02, 0x03]);
        std::fs::write(&path, &bytes).unwrap();

        recover(&path).unwrap();
        write_records(&path, &[b"after recovery"]);

        let records = read_all(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].payload, b"before crash");
        assert_eq!(records[1].payload, b"after recovery");
    }

    #[test]
    fn short_garbage_tail_counts_as_truncated_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shorttail.log");
        write_records(&path, &[b"data"]);

        // Fewer bytes than a frame header: an incomplete write, not a
        // decodable record.
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.extend_from_slice(&[0xAB; 5]);
        std::fs::write(&path, &bytes).unwrap();

        let result = recover(&path).unwrap();
        assert!(result.success);
        assert_eq!(result.valid_records, 1);
        assert_eq!(result.corrupt_records, 1);
        assert_eq!(result.bytes_truncated, 5);
    }
}
