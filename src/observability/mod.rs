//! Observability for the log writer.
//!
//! Structured JSON logging and exact counters. Observability is read-only:
//! no side effects on the write path, no background threads, deterministic
//! output.

mod logger;
mod metrics;

pub use logger::{LogLevel, Logger};
pub use metrics::{StatsSnapshot, WriterMetrics};
