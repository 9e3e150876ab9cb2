//! Process-wide routing of decoding-engine log messages into `tracing`.
//!
//! Engines report through [`emit`] with a Kaldi-style severity. Routing is
//! installed once, the first time a [`Model`](crate::model::Model) is built,
//! which resolves the initial level. Messages always go through `tracing`.
//!
//! Verbosity follows the Kaldi convention: messages with a severity level
//! above the global level are dropped. `0` shows info and above, negative
//! values silence info (`-1`) or warnings too (`-2`), positive values enable
//! verbose messages up to that level.

use std::sync::Once;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Environment variable consulted once, at install time, for the initial level.
pub const LOG_LEVEL_ENV: &str = "KALDO_LOG_LEVEL";

static ROUTING: Once = Once::new();
static LEVEL_SET: AtomicBool = AtomicBool::new(false);
static LEVEL: AtomicI32 = AtomicI32::new(0);

/// Severity of an engine message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    AssertFailed,
    Error,
    Warning,
    Info,
    /// Verbose message at the given level (1 = least chatty)
    Verbose(i32),
}

impl Severity {
    /// Numeric level used for verbosity filtering.
    pub fn level(self) -> i32 {
        match self {
            Severity::AssertFailed => -3,
            Severity::Error => -2,
            Severity::Warning => -1,
            Severity::Info => 0,
            Severity::Verbose(n) => n.max(1),
        }
    }

    fn tag(self) -> String {
        match self {
            Severity::AssertFailed => "ASSERTION_FAILED".to_string(),
            Severity::Error => "ERROR".to_string(),
            Severity::Warning => "WARNING".to_string(),
            Severity::Info => "LOG".to_string(),
            Severity::Verbose(n) => format!("VLOG[{n}]"),
        }
    }
}

/// Set the global verbosity level.
pub fn set_log_level(level: i32) {
    LEVEL.store(level, Ordering::Relaxed);
    LEVEL_SET.store(true, Ordering::Relaxed);
}

/// Current global verbosity level.
pub fn log_level() -> i32 {
    LEVEL.load(Ordering::Relaxed)
}

/// Resolve the initial level from the environment. Only the first call has
/// any effect, and a level set earlier with [`set_log_level`] wins.
pub fn install() {
    ROUTING.call_once(|| {
        if !LEVEL_SET.load(Ordering::Relaxed)
            && let Some(level) = std::env::var(LOG_LEVEL_ENV)
                .ok()
                .and_then(|v| v.trim().parse::<i32>().ok())
        {
            LEVEL.store(level, Ordering::Relaxed);
        }

        tracing::debug!(level = log_level(), "engine log routing installed");
    });
}

/// Whether a message of this severity passes the global verbosity filter.
pub fn enabled(severity: Severity) -> bool {
    severity.level() <= log_level()
}

/// Report an engine message.
pub fn emit(severity: Severity, component: &str, message: &str) {
    if !enabled(severity) {
        return;
    }

    let tag = severity.tag();
    match severity {
        Severity::AssertFailed | Severity::Error => {
            tracing::error!(target: "kaldo_asr::engine", component, %tag, "{message}")
        }
        Severity::Warning => {
            tracing::warn!(target: "kaldo_asr::engine", component, %tag, "{message}")
        }
        Severity::Info => tracing::info!(target: "kaldo_asr::engine", component, %tag, "{message}"),
        Severity::Verbose(1) => {
            tracing::debug!(target: "kaldo_asr::engine", component, %tag, "{message}")
        }
        Severity::Verbose(_) => {
            tracing::trace!(target: "kaldo_asr::engine", component, %tag, "{message}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_levels_are_ordered() {
        assert!(Severity::AssertFailed.level() < Severity::Error.level());
        assert!(Severity::Error.level() < Severity::Warning.level());
        assert!(Severity::Warning.level() < Severity::Info.level());
        assert!(Severity::Info.level() < Severity::Verbose(1).level());
        assert_eq!(Severity::Verbose(0).level(), 1);
    }

    #[test]
    fn tags_follow_kaldi_prefixes() {
        assert_eq!(Severity::Info.tag(), "LOG");
        assert_eq!(Severity::Verbose(2).tag(), "VLOG[2]");
        assert_eq!(Severity::AssertFailed.tag(), "ASSERTION_FAILED");
    }

    #[test]
    fn explicit_level_survives_install() {
        set_log_level(2);
        install();
        install();
        assert_eq!(log_level(), 2);
        assert!(enabled(Severity::Verbose(2)));
        assert!(!enabled(Severity::Verbose(3)));

        // Dispatches through tracing whether or not a subscriber is set
        emit(Severity::Verbose(2), "logging", "routed");
        emit(Severity::Warning, "logging", "routed");

        set_log_level(0);
        assert!(!enabled(Severity::Verbose(1)));
    }
}
