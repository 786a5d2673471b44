//! Stream settings.
//!
//! Sources, lowest priority first: [`StreamSettings::default()`], an optional
//! JSON file whose missing keys keep their defaults, then the `HOOKLINE_*`
//! environment variables. A bad environment value is ignored with a warning;
//! a bad file value is an error.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::SettingsError;

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Upper bound accepted for [`StreamSettings::max_nesting`].
pub const MAX_NESTING_LIMIT: usize = 10_000;

/// Overrides [`StreamSettings::flowing`].
pub const ENV_FLOWING: &str = "HOOKLINE_FLOWING";
/// Overrides [`StreamSettings::max_nesting`].
pub const ENV_MAX_NESTING: &str = "HOOKLINE_MAX_NESTING";
/// Overrides [`StreamSettings::warn_on_handler_failure`].
pub const ENV_WARN_ON_FAILURE: &str = "HOOKLINE_WARN_ON_FAILURE";

const ENV_KEYS: [&str; 3] = [ENV_FLOWING, ENV_MAX_NESTING, ENV_WARN_ON_FAILURE];

/// Per-stream behavior knobs.
///
/// ```json
/// { "flowing": false, "maxNesting": 16 }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamSettings {
    /// Whether a new stream starts Open.
    pub flowing: bool,
    /// Dispatch frames of one stream allowed on a single call stack.
    ///
    /// Bounds re-entrant dispatch from inside callbacks and stops chain
    /// cycles from recursing forever.
    pub max_nesting: usize,
    /// Log a warning for every failed handler.
    pub warn_on_handler_failure: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            flowing: true,
            max_nesting: 64,
            warn_on_handler_failure: true,
        }
    }
}

impl StreamSettings {
    /// Defaults for a stream that starts Closed.
    #[must_use]
    pub fn bottled() -> Self {
        Self {
            flowing: false,
            ..Self::default()
        }
    }

    /// Check ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.max_nesting == 0 || self.max_nesting > MAX_NESTING_LIMIT {
            return Err(SettingsError::InvalidValue(format!(
                "maxNesting must be within 1..={MAX_NESTING_LIMIT}, got {}",
                self.max_nesting
            )));
        }
        Ok(())
    }

    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        apply_env_overrides(&mut settings);
        settings
    }

    /// Set the field named by the environment key `key` from its raw text.
    ///
    /// Switches accept `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off` in
    /// any case. On error the settings are unchanged.
    pub fn set_override(&mut self, key: &str, raw: &str) -> Result<()> {
        let raw = raw.trim();
        match key {
            ENV_FLOWING => self.flowing = parse_switch(key, raw)?,
            ENV_WARN_ON_FAILURE => self.warn_on_handler_failure = parse_switch(key, raw)?,
            ENV_MAX_NESTING => {
                self.max_nesting = raw
                    .parse()
                    .ok()
                    .filter(|n| (1..=MAX_NESTING_LIMIT).contains(n))
                    .ok_or_else(|| {
                        SettingsError::InvalidValue(format!(
                            "{key} must be within 1..={MAX_NESTING_LIMIT}, got {raw:?}"
                        ))
                    })?;
            }
            _ => {
                return Err(SettingsError::InvalidValue(format!(
                    "unknown stream setting {key}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_switch(key: &str, raw: &str) -> Result<bool> {
    const ON: [&str; 4] = ["true", "1", "yes", "on"];
    const OFF: [&str; 4] = ["false", "0", "no", "off"];

    if ON.iter().any(|word| raw.eq_ignore_ascii_case(word)) {
        Ok(true)
    } else if OFF.iter().any(|word| raw.eq_ignore_ascii_case(word)) {
        Ok(false)
    } else {
        Err(SettingsError::InvalidValue(format!(
            "{key} must be a switch like true/false, got {raw:?}"
        )))
    }
}

/// Load settings from `path` with environment overrides.
///
/// A missing file yields defaults. Invalid JSON or out-of-range values are
/// errors.
pub fn load_settings_from_path(path: &Path) -> Result<StreamSettings> {
    let mut settings = if path.exists() {
        debug!(?path, "loading stream settings from file");
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)?
    } else {
        debug!(?path, "stream settings file not found, using defaults");
        StreamSettings::default()
    };

    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Apply `HOOKLINE_*` environment overrides.
pub fn apply_env_overrides(settings: &mut StreamSettings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

/// Apply overrides for every key `lookup` has a value for.
///
/// `lookup` stands in for the process environment; invalid values are
/// skipped with a warning.
pub fn apply_overrides(settings: &mut StreamSettings, lookup: impl Fn(&str) -> Option<String>) {
    for key in ENV_KEYS {
        let Some(raw) = lookup(key) else {
            continue;
        };
        if let Err(error) = settings.set_override(key, &raw) {
            warn!(key, value = %raw, %error, "ignoring stream setting override");
        }
    }
}
