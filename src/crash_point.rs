//! Crash point injection for durability testing.
//!
//! When the `DURLOG_CRASH_POINT` environment variable names an enabled
//! point, the process terminates immediately via `std::process::abort()` -
//! no cleanup, no unwinding, no catching. Out-of-process tests use this to
//! leave torn tails at precise positions in the write pipeline and then
//! exercise recovery.
//!
//! Zero-cost when the variable is unset.

use std::sync::OnceLock;

/// Cache the crash point name to avoid repeated env var lookups
static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn configured_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var("DURLOG_CRASH_POINT").ok())
        .as_deref()
}

/// Check if a specific crash point is enabled.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    configured_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Trigger a crash if the named crash point is enabled.
///
/// No-op when `DURLOG_CRASH_POINT` is not set or doesn't match.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names.
pub mod points {
    /// Before a batch's bytes are written to the file.
    pub const LOG_BEFORE_WRITE: &str = "log_before_write";
    /// After the write, before the force. A crash here leaves a tail that
    /// may or may not have reached the platters.
    pub const LOG_BEFORE_FORCE: &str = "log_before_force";
    /// After the force, before completions are resolved.
    pub const LOG_AFTER_FORCE: &str = "log_after_force";
    /// Before recovery truncates a torn tail.
    pub const RECOVERY_BEFORE_TRUNCATE: &str = "recovery_before_truncate";
    /// After recovery truncated and forced.
    pub const RECOVERY_AFTER_TRUNCATE: &str = "recovery_after_truncate";

    /// Get all crash point names.
    pub fn all() -> &'static [&'static str] {
        &[
            LOG_BEFORE_WRITE,
            LOG_BEFORE_FORCE,
            LOG_AFTER_FORCE,
            RECOVERY_BEFORE_TRUNCATE,
            RECOVERY_AFTER_TRUNCATE,
        ]
    }
}
