//! durlog - a durable, group-committing append-only log
//!
//! Many threads push byte records; each push blocks until its record is on
//! stable storage. A single background thread batches concurrent pushes so
//! one force covers many records, and a recovery scanner repairs
//! crash-torn files by truncating back to the last fully durable record.

pub mod crash_point;
pub mod log;
pub mod observability;
pub mod recovery;
