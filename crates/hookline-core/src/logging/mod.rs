//! Structured logging with `tracing`.
//!
//! Streams report through `tracing` macros with structured fields
//! (`event_type`, `subscription_id`, `depth`, `error`). Embedders pick the
//! subscriber; [`init_subscriber`] is the stderr default, and
//! [`capture_logs`] keeps events in memory for tests.

pub mod test_utils;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

use std::fmt::Write;

use tracing_subscriber::EnvFilter;

/// Level for everything outside the hookline crates.
pub const DEFAULT_LEVEL: &str = "warn";

/// Targets that `init_subscriber`'s `level` applies to.
pub const HOOKLINE_TARGETS: [&str; 3] = ["hookline_core", "hookline_events", "hookline_streams"];

/// Filter directives putting the hookline crates at `level` and every other
/// target at [`DEFAULT_LEVEL`].
#[must_use]
pub fn default_directives(level: &str) -> String {
    let mut directives = DEFAULT_LEVEL.to_owned();
    for target in HOOKLINE_TARGETS {
        let _ = write!(directives, ",{target}={level}");
    }
    directives
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install a compact stderr subscriber for the process.
///
/// `level` applies to the hookline crates; `RUST_LOG`, when set, replaces
/// the whole filter. Only the first call in a process installs anything.
pub fn init_subscriber(level: &str) {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(level, "hookline logging initialized");
    }
}

/// Same as [`init_subscriber`], emitting one JSON object per line.
pub fn init_json_subscriber(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .json()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_scope_level_to_hookline_targets() {
        assert_eq!(
            default_directives("debug"),
            "warn,hookline_core=debug,hookline_events=debug,hookline_streams=debug"
        );
        assert!(EnvFilter::try_new(default_directives("trace")).is_ok());
    }

    #[test]
    fn init_subscriber_is_idempotent() {
        init_subscriber(DEFAULT_LEVEL);
        init_subscriber("debug");
        init_json_subscriber("trace");
    }
}
