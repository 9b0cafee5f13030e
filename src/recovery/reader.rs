//! Read-only valid-prefix scanning of log files.
//!
//! The reader walks record frames from the end of the file header, yielding
//! each record whose frame fits the file and whose checksum verifies. The
//! first frame that fails any check halts the scan; records are never
//! repaired or skipped. A halted scan is not an error here: a torn tail is
//! an expected post-crash condition, and everything before it is a
//! consistent log.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::log::{
    record_checksum, FileHeader, FrameHeader, LogError, LogResult, FILE_HEADER_SIZE,
    RECORD_HEADER_SIZE,
};

/// One valid record recovered from a log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredRecord {
    pub producer_id: u64,
    pub payload: Vec<u8>,
}

/// Sequential reader over the valid prefix of a log file.
pub struct LogReader {
    reader: BufReader<File>,
    file_size: u64,
    offset: u64,
    records_read: u64,
    halt_reason: Option<String>,
}

impl LogReader {
    /// Opens a log file and validates its header.
    ///
    /// Returns `LogError::Corruption` for a missing-sized or foreign file,
    /// `LogError::Io` for underlying I/O failures.
    pub fn open(path: &Path) -> LogResult<Self> {
        let file = File::open(path).map_err(|e| LogError::io("open", &e))?;
        let file_size = file
            .metadata()
            .map_err(|e| LogError::io("stat", &e))?
            .len();
        if file_size < FILE_HEADER_SIZE as u64 {
            return Err(LogError::corruption(
                0,
                format!(
                    "file too small for header: {file_size} bytes, need {FILE_HEADER_SIZE}"
                ),
            ));
        }

        let mut reader = BufReader::new(file);
        let mut header_buf = [0u8; FILE_HEADER_SIZE];
        reader
            .read_exact(&mut header_buf)
            .map_err(|e| LogError::io("read header", &e))?;
        FileHeader::decode(&header_buf)?;

        Ok(Self {
            reader,
            file_size,
            offset: FILE_HEADER_SIZE as u64,
            records_read: 0,
            halt_reason: None,
        })
    }

    /// File size observed at open.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// End of the valid prefix: the offset just past the last valid record
    /// (or the header, if none). Only meaningful once the scan has stopped.
    pub fn valid_prefix_end(&self) -> u64 {
        self.offset
    }

    /// Number of valid records read so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Why the scan stopped before end-of-file, if it did.
    pub fn halt_reason(&self) -> Option<&str> {
        self.halt_reason.as_deref()
    }

    fn halt(&mut self, reason: String) {
        self.halt_reason = Some(reason);
    }

    /// Reads the next valid record.
    ///
    /// Returns `Ok(None)` at clean end-of-file and at the first invalid
    /// frame (check [`LogReader::halt_reason`] to distinguish). Returns
    /// `Err` only for I/O failures, never for corruption.
    pub fn read_next(&mut self) -> LogResult<Option<RecoveredRecord>> {
        if self.halt_reason.is_some() || self.offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.offset;
        if remaining < RECORD_HEADER_SIZE as u64 {
            self.halt(format!(
                "incomplete frame header: {remaining} trailing bytes"
            ));
            return Ok(None);
        }

        let mut header_buf = [0u8; RECORD_HEADER_SIZE];
        self.reader
            .read_exact(&mut header_buf)
            .map_err(|e| LogError::io("read frame header", &e))?;
        let frame = FrameHeader::decode(&header_buf);

        if !frame.length_in_bounds() {
            self.halt(format!("frame length {} out of bounds", frame.frame_length));
            return Ok(None);
        }
        let payload_len = frame.payload_len() as u64;
        if self.offset + RECORD_HEADER_SIZE as u64 + payload_len > self.file_size {
            self.halt(format!(
                "frame of {} bytes extends past end of file",
                RECORD_HEADER_SIZE as u64 + payload_len
            ));
            return Ok(None);
        }

        let mut payload = vec![0u8; payload_len as usize];
        self.reader
            .read_exact(&mut payload)
            .map_err(|e| LogError::io("read payload", &e))?;

        if record_checksum(frame.producer_id, &payload) != frame.checksum {
            self.halt(format!(
                "checksum mismatch for producer {}",
                frame.producer_id
            ));
            return Ok(None);
        }

        self.offset += RECORD_HEADER_SIZE as u64 + payload_len;
        self.records_read += 1;
        Ok(Some(RecoveredRecord {
            producer_id: frame.producer_id,
            payload,
        }))
    }

    /// Reads every remaining valid record.
    pub fn read_to_end(&mut self) -> LogResult<Vec<RecoveredRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_next()? {
            records.push(record);
        }
        Ok(records)
    }
}

/// Iterator adapter over a [`LogReader`].
///
/// Stops at the first invalid frame or I/O error; inspect
/// [`LogRecordIterator::error`] afterwards if the distinction matters.
pub struct LogRecordIterator {
    reader: LogReader,
    error: Option<LogError>,
}

impl LogRecordIterator {
    pub fn error(&self) -> Option<&LogError> {
        self.error.as_ref()
    }
}

impl Iterator for LogRecordIterator {
    type Item = RecoveredRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }
        match self.reader.read_next() {
            Ok(record) => record,
            Err(error) => {
                self.error = Some(error);
                None
            }
        }
    }
}

impl IntoIterator for LogReader {
    type Item = RecoveredRecord;
    type IntoIter = LogRecordIterator;

    fn into_iter(self) -> Self::IntoIter {
        LogRecordIterator {
            reader: self,
            error: None,
        }
    }
}

/// Reads every valid record from the file at `path`.
///
/// Missing files and files without a valid header yield an empty list;
/// the scan stops silently at the first invalid record.
pub fn read_all(path: impl AsRef<Path>) -> LogResult<Vec<RecoveredRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    match LogReader::open(path) {
        Ok(mut reader) => reader.read_to_end(),
        Err(LogError::Corruption { .. }) => Ok(Vec::new()),
        Err(error) => Err(error),
    }
}
