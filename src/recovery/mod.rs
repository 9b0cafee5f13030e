//! Recovery subsystem: offline validation and repair of log files.
//!
//! Runs against a closed or crashed file, never concurrently with an
//! active writer. [`recover`] truncates a torn tail back to the last fully
//! durable record; [`read_all`] returns the valid prefix without modifying
//! the file.

mod reader;
mod scanner;

pub use reader::{read_all, LogReader, LogRecordIterator, RecoveredRecord};
pub use scanner::{recover, RecoveryResult};
