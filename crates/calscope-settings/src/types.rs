//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so partial JSON
//! files only need to name the values they change.

use std::ops::RangeInclusive;
use std::time::Duration;

use calscope_core::DisplayMode;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Accepted `sync.debounceMs` values.
pub const DEBOUNCE_MS_RANGE: RangeInclusive<u64> = 1..=10_000;

/// Root settings type.
///
/// ```json
/// {
///   "scope": { "defaultMode": "18w" },
///   "sync": { "debounceMs": 80 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalscopeSettings {
    /// Scope defaults.
    pub scope: ScopeSettings,
    /// URL synchronization.
    pub sync: SyncSettings,
    /// Focus resolution.
    pub resolver: ResolverSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

impl CalscopeSettings {
    /// Check cross-field constraints the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        let names = &self.sync.query_param_names;
        let all = [&names.start, &names.mode, &names.focus, &names.expanded];
        if all.iter().any(|n| n.is_empty()) {
            return Err(SettingsError::InvalidValue(
                "query parameter names must not be empty".into(),
            ));
        }
        for (i, a) in all.iter().enumerate() {
            if all[i + 1..].contains(a) {
                return Err(SettingsError::InvalidValue(format!(
                    "duplicate query parameter name: {a}"
                )));
            }
        }
        if !DEBOUNCE_MS_RANGE.contains(&self.sync.debounce_ms) {
            return Err(SettingsError::InvalidValue(format!(
                "sync.debounceMs must be within {}..={}, got {}",
                DEBOUNCE_MS_RANGE.start(),
                DEBOUNCE_MS_RANGE.end(),
                self.sync.debounce_ms
            )));
        }
        if self.resolver.intent_buffer == 0 {
            return Err(SettingsError::InvalidValue(
                "resolver.intentBuffer must be at least 1".into(),
            ));
        }
        if self.sync.expanded_delimiter.is_empty() {
            return Err(SettingsError::InvalidValue(
                "expanded delimiter must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Scope defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScopeSettings {
    /// Mode used when none is stored or requested.
    pub default_mode: DisplayMode,
}

/// URL synchronization settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    /// Quiet period after the last state change before the URL is written.
    pub debounce_ms: u64,
    /// Query parameter names of the four scope facets.
    pub query_param_names: QueryParamNames,
    /// Separator of the `expanded` week list.
    pub expanded_delimiter: String,
    /// Upper bound for the synchronizer's graceful shutdown.
    pub shutdown_timeout_ms: u64,
}

impl SyncSettings {
    /// Debounce window as a [`Duration`].
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            query_param_names: QueryParamNames::default(),
            expanded_delimiter: ",".to_string(),
            shutdown_timeout_ms: 5_000,
        }
    }
}

/// Query parameter names (the URL wire contract).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryParamNames {
    /// Window start.
    pub start: String,
    /// Display mode.
    pub mode: String,
    /// Focus token.
    pub focus: String,
    /// Expanded weeks.
    pub expanded: String,
}

impl Default for QueryParamNames {
    fn default() -> Self {
        Self {
            start: "start".to_string(),
            mode: "mode".to_string(),
            focus: "focus".to_string(),
            expanded: "expanded".to_string(),
        }
    }
}

/// Focus resolution settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverSettings {
    /// Drop transitions of a resolution superseded by a newer request.
    pub stale_suppression: bool,
    /// Capacity of the intent channel feeding the resolver.
    pub intent_buffer: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            stale_suppression: true,
            intent_buffer: 64,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
