//! Durable log writer subsystem.
//!
//! An acknowledged push exists on stable storage; there is no weaker mode.
//!
//! # Invariants Enforced
//!
//! - Force before acknowledgment: `push` returns only after the force
//!   covering its record has completed
//! - Per-producer order: a producer's records appear in the file in
//!   submission order
//! - Single flusher: one background thread owns the file handle and write
//!   offset
//! - Bounded admission: outstanding unflushed work never exceeds
//!   `max_queue_size`
//! - Checksums on every record; a record is fully valid or absent
//!
//! # Group Commit
//!
//! Concurrent pushes are collected into batches flushed on a size or time
//! trigger, so one force covers many records.

mod batch;
mod checksum;
mod config;
mod errors;
mod format;
mod queue;
mod request;
mod sequence;
mod storage;
mod writer;

pub use checksum::{compute_checksum, record_checksum, verify_checksum};
pub use config::WriterConfig;
pub use errors::{LogError, LogResult, Severity};
pub use format::{
    FileHeader, FrameHeader, FILE_HEADER_SIZE, FORMAT_VERSION, LOG_MAGIC, MAX_FRAME_LENGTH,
    MIN_FRAME_LENGTH, RECORD_HEADER_SIZE,
};
pub use request::{Completion, WriteRequest};
pub use sequence::{SequenceTable, SequencedId};
pub use storage::{FileStorage, LogStorage, MemoryStorage};
pub use writer::LogWriter;
