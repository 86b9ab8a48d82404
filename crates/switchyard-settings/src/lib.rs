//! # switchyard-settings
//!
//! Layered configuration for the switchyard server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`SwitchyardSettings::default()`]
//! 2. **User file**: `~/.switchyard/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `SWITCHYARD_*` overrides (highest priority)
//!
//! The binary's command-line flags are applied on top by the caller.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path,
    load_settings_with_env, settings_path,
};
pub use types::{LoggingSettings, ServerSettings, SessionSettings, SwitchyardSettings};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = SwitchyardSettings::default();
        assert!(settings_path().ends_with(".switchyard/settings.json"));
    }
}
