//! Process-wide logging threshold.
//!
//! Fault profiles and matched services can raise or lower how chatty the
//! pipeline is. The threshold is a single atomic shared by every call in the
//! process: concurrent calls that apply different overrides race, and the last
//! write wins. Events that pass the gate are handed to `tracing` unchanged, so
//! the subscriber's own filter still applies on top.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Gate threshold, ordered from most to least verbose
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum LoggingLevel {
    /// Everything
    Debug = 0,
    /// Decisions taken
    Info = 1,
    /// Recoverable configuration oddities
    Warn = 2,
    /// Broken configuration only
    #[default]
    Error = 3,
    /// Silence
    None = 4,
}

impl LoggingLevel {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Debug,
            1 => Self::Info,
            2 => Self::Warn,
            3 => Self::Error,
            _ => Self::None,
        }
    }

    /// Upper-case name as written in profiles
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for LoggingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoggingLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            "NONE" | "OFF" => Ok(Self::None),
            other => Err(format!("unknown logging level \"{other}\"")),
        }
    }
}

impl TryFrom<String> for LoggingLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

static THRESHOLD: AtomicU8 = AtomicU8::new(LoggingLevel::Error as u8);
static FORCE: AtomicBool = AtomicBool::new(false);

/// Current threshold
pub fn logging_level() -> LoggingLevel {
    LoggingLevel::from_u8(THRESHOLD.load(Ordering::Relaxed))
}

/// Replace the threshold for the whole process
pub fn set_logging_level(level: LoggingLevel) {
    THRESHOLD.store(level as u8, Ordering::Relaxed);
}

/// Whether the gate is bypassed
pub fn force_logging() -> bool {
    FORCE.load(Ordering::Relaxed)
}

/// Bypass (or restore) the gate for every message
pub fn set_force_logging(force: bool) {
    FORCE.store(force, Ordering::Relaxed);
}

/// Whether a message at `level` passes the gate
#[must_use]
#[inline]
pub fn enabled(level: LoggingLevel) -> bool {
    level != LoggingLevel::None && (force_logging() || level >= logging_level())
}

/// Apply an optional override taken from a profile, service or data-store rule
pub fn apply_override(level: Option<LoggingLevel>) {
    if let Some(level) = level {
        set_logging_level(level);
    }
}

/// Emit an error event if the threshold allows it
#[macro_export]
macro_rules! gated_error {
    ($($arg:tt)+) => {
        if $crate::logging::enabled($crate::logging::LoggingLevel::Error) {
            ::tracing::error!($($arg)+);
        }
    };
}

/// Emit a warning event if the threshold allows it
#[macro_export]
macro_rules! gated_warn {
    ($($arg:tt)+) => {
        if $crate::logging::enabled($crate::logging::LoggingLevel::Warn) {
            ::tracing::warn!($($arg)+);
        }
    };
}

/// Emit an info event if the threshold allows it
#[macro_export]
macro_rules! gated_info {
    ($($arg:tt)+) => {
        if $crate::logging::enabled($crate::logging::LoggingLevel::Info) {
            ::tracing::info!($($arg)+);
        }
    };
}

/// Emit a debug event if the threshold allows it
#[macro_export]
macro_rules! gated_debug {
    ($($arg:tt)+) => {
        if $crate::logging::enabled($crate::logging::LoggingLevel::Debug) {
            ::tracing::debug!($($arg)+);
        }
    };
}

/// Report a skipped decision at the severity its reason carries
pub(crate) fn report_skip(skip: &crate::error::Skip, action: &str) {
    match skip.level() {
        LoggingLevel::Debug => gated_debug!(reason = %skip, "{action}"),
        LoggingLevel::Info => gated_info!(reason = %skip, "{action}"),
        LoggingLevel::Warn => gated_warn!(reason = %skip, "{action}"),
        LoggingLevel::Error | LoggingLevel::None => gated_error!(reason = %skip, "{action}"),
    }
}

/// Serializes tests that read or write the process-wide threshold
#[cfg(test)]
pub(crate) static TEST_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("debug".parse::<LoggingLevel>().unwrap(), LoggingLevel::Debug);
        assert_eq!("Warn".parse::<LoggingLevel>().unwrap(), LoggingLevel::Warn);
        assert_eq!("NONE".parse::<LoggingLevel>().unwrap(), LoggingLevel::None);
        assert!("loud".parse::<LoggingLevel>().is_err());
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let level: LoggingLevel = serde_yaml::from_str("info").unwrap();
        assert_eq!(level, LoggingLevel::Info);
    }

    #[test]
    fn test_gate_follows_threshold() {
        let _guard = TEST_LOCK.lock();
        let previous = logging_level();

        set_logging_level(LoggingLevel::Error);
        assert!(enabled(LoggingLevel::Error));
        assert!(!enabled(LoggingLevel::Warn));
        assert!(!enabled(LoggingLevel::Debug));

        set_logging_level(LoggingLevel::Debug);
        assert!(enabled(LoggingLevel::Debug));
        assert!(enabled(LoggingLevel::Info));
        assert!(enabled(LoggingLevel::Error));

        set_logging_level(LoggingLevel::None);
        assert!(!enabled(LoggingLevel::Error));

        set_logging_level(previous);
    }

    #[test]
    fn test_force_logging_bypasses_threshold() {
        let _guard = TEST_LOCK.lock();
        let previous = logging_level();

        set_logging_level(LoggingLevel::None);
        set_force_logging(true);
        assert!(enabled(LoggingLevel::Debug));
        set_force_logging(false);
        assert!(!enabled(LoggingLevel::Debug));

        set_logging_level(previous);
    }

    #[test]
    fn test_apply_override_ignores_absent_level() {
        let _guard = TEST_LOCK.lock();
        let previous = logging_level();

        set_logging_level(LoggingLevel::Warn);
        apply_override(None);
        assert_eq!(logging_level(), LoggingLevel::Warn);
        apply_override(Some(LoggingLevel::Info));
        assert_eq!(logging_level(), LoggingLevel::Info);

        set_logging_level(previous);
    }
}
