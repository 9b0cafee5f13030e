//! Structured JSON logger.
//!
//! One log line = one event, written synchronously with no buffering.
//! Fields are emitted in deterministic order (event, severity, then
//! alphabetical keys) so log output is stable across runs. JSON is built by
//! hand: deterministic ordering matters more here than a serializer.

use std::fmt;
use std::io::{self, Write};

/// Log severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Normal operations.
    Info,
    /// Recoverable or expected-but-notable conditions.
    Warn,
    /// Operation failures.
    Error,
    /// Durability can no longer be trusted.
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Synchronous structured logger.
pub struct Logger;

impl Logger {
    /// Log an INFO event to stdout.
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log_to_writer(LogLevel::Info, event, fields, &mut io::stdout());
    }

    /// Log a WARN event to stdout.
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log_to_writer(LogLevel::Warn, event, fields, &mut io::stdout());
    }

    /// Log an ERROR event to stderr.
    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log_to_writer(LogLevel::Error, event, fields, &mut io::stderr());
    }

    /// Log a FATAL event to stderr.
    pub fn fatal(event: &str, fields: &[(&str, &str)]) {
        Self::log_to_writer(LogLevel::Fatal, event, fields, &mut io::stderr());
    }

    fn log_to_writer<W: Write>(
        level: LogLevel,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let line = Self::format_line(level, event, fields);
        // One write_all per line keeps events whole under concurrency.
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    fn format_line(level: LogLevel, event: &str, fields: &[(&str, &str)]) -> String {
        let mut output = String::with_capacity(128);
        output.push('{');

        output.push_str("\"event\":\"");
        Self::escape_json_string(&mut output, event);
        output.push('"');

        output.push_str(",\"severity\":\"");
        output.push_str(level.as_str());
        output.push('"');

        let mut sorted_fields: Vec<_> = fields.iter().collect();
        sorted_fields.sort_by_key(|(k, _)| *k);

        for (key, value) in sorted_fields {
            output.push_str(",\"");
            Self::escape_json_string(&mut output, key);
            output.push_str("\":\"");
            Self::escape_json_string(&mut output, value);
            output.push('"');
        }

        output.push('}');
        output.push('\n');
        output
    }

    fn escape_json_string(output: &mut String, s: &str) {
        for c in s.chars() {
            match c {
                '"' => output.push_str("\\\""),
                '\\' => output.push_str("\\\\"),
                '\n' => output.push_str("\\n"),
                '\r' => output.push_str("\\r"),
                '\t' => output.push_str("\\t"),
                c if c.is_control() => {
                    output.push_str(&format!("\\u{:04x}", c as u32));
                }
                c => output.push(c),
            }
        }
    }
}
