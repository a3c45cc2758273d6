//! # calscope-settings
//!
//! Tunables for the scope subsystem: default display mode, URL parameter
//! names, debounce and shutdown timing, resolver behavior and log filter.
//!
//! A value is built from compiled defaults, then `~/.calscope/settings.json`
//! merged on top, then `CALSCOPE_*` environment variables. The result is
//! validated before use.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

use tracing::warn;

static PROCESS_SETTINGS: OnceLock<CalscopeSettings> = OnceLock::new();

/// Process-wide settings.
///
/// The first caller triggers [`load_settings`]. A load or validation error is
/// logged and the compiled defaults are used in its place.
pub fn get_settings() -> &'static CalscopeSettings {
    PROCESS_SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|error| {
            warn!(%error, "settings unusable, using defaults");
            CalscopeSettings::default()
        })
    })
}

/// Pin the process-wide settings before anything reads them.
///
/// Hands `settings` back in `Err` once [`get_settings`] or an earlier call
/// has fixed the value.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: CalscopeSettings) -> std::result::Result<(), CalscopeSettings> {
    PROCESS_SETTINGS.set(settings)
}
