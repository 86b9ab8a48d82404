//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`SwitchyardSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `SWITCHYARD_*` environment overrides
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::SwitchyardSettings;

/// Resolve the default settings file (`~/.switchyard/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".switchyard").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<SwitchyardSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid merged value
/// is an error.
pub fn load_settings_from_path(path: &Path) -> Result<SwitchyardSettings> {
    load_settings_with_env(path, |name| std::env::var(name).ok())
}

/// Load settings from `path`, reading overrides through `env`.
pub fn load_settings_with_env(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<SwitchyardSettings> {
    let defaults = serde_json::to_value(SwitchyardSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: SwitchyardSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, env);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `SWITCHYARD_*` environment overrides from the process environment.
pub fn apply_env_overrides(settings: &mut SwitchyardSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides looked up through `env`.
///
/// Integers must parse and fall within range; booleans accept
/// `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`. Invalid values are
/// ignored with a warning.
pub fn apply_overrides(settings: &mut SwitchyardSettings, env: impl Fn(&str) -> Option<String>) {
    let env = EnvReader(env);

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("SWITCHYARD_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.parsed("SWITCHYARD_PORT", 0u16, u16::MAX) {
        settings.server.port = v;
    }
    if let Some(v) = env.parsed("SWITCHYARD_MAX_CONNECTIONS", 1usize, 1_000_000) {
        settings.server.max_connections = v;
    }
    if let Some(v) = env.parsed("SWITCHYARD_SEND_QUEUE_CAPACITY", 1usize, 65_536) {
        settings.server.send_queue_capacity = v;
    }
    if let Some(v) = env.parsed("SWITCHYARD_HEARTBEAT_INTERVAL_SECS", 1u64, 3600) {
        settings.server.heartbeat_interval_secs = v;
    }
    if let Some(v) = env.parsed("SWITCHYARD_HEARTBEAT_TIMEOUT_SECS", 2u64, 7200) {
        settings.server.heartbeat_timeout_secs = v;
    }
    if let Some(v) = env.parsed("SWITCHYARD_MAX_MESSAGE_SIZE", 128usize, 16 * 1024 * 1024) {
        settings.server.max_message_size = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("SWITCHYARD_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("SWITCHYARD_LOG_JSON") {
        settings.logging.json = v;
    }

    // ── Sessions ────────────────────────────────────────────────────
    if let Some(v) = env.string("SWITCHYARD_SESSIONS_FILE") {
        settings.sessions.seed_file = Some(v);
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a number within an inclusive range.
pub fn parse_range<T>(val: &str, min: T, max: T) -> Option<T>
where
    T: std::str::FromStr + PartialOrd,
{
    let n: T = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

struct EnvReader<F>(F);

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.0)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn parsed<T>(&self, name: &str, min: T, max: T) -> Option<T>
    where
        T: std::str::FromStr + PartialOrd,
    {
        let val = (self.0)(name)?;
        let result = parse_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid numeric env var, ignoring");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::errors::SettingsError;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 8065, "host": "localhost"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "localhost");
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4]});
        assert_eq!(deep_merge(target, source)["items"], serde_json::json!([4]));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        assert_eq!(deep_merge(target, source)["a"], 42);
    }

    // ── load_settings_with_env ──────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let path = Path::new("/nonexistent/settings.json");
        let settings = load_settings_with_env(path, no_env).unwrap();
        assert_eq!(settings, SwitchyardSettings::default());
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 9090, "maxConnections": 5}, "logging": {"json": true}}"#,
        )
        .unwrap();

        let settings = load_settings_with_env(&path, no_env).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.max_connections, 5);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert!(settings.logging.json);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = load_settings_with_env(&path, no_env);
        assert!(matches!(result.unwrap_err(), SettingsError::Json(_)));
    }

    #[test]
    fn load_rejects_invalid_combination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"heartbeatIntervalSecs": 60, "heartbeatTimeoutSecs": 30}}"#,
        )
        .unwrap();

        let result = load_settings_with_env(&path, no_env);
        assert!(matches!(result.unwrap_err(), SettingsError::InvalidValue(_)));
    }

    #[test]
    fn env_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": 9090}}"#).unwrap();

        let env = env_of(&[("SWITCHYARD_PORT", "7000"), ("SWITCHYARD_LOG_LEVEL", "debug")]);
        let settings = load_settings_with_env(&path, env).unwrap();
        assert_eq!(settings.server.port, 7000);
        assert_eq!(settings.logging.level, "debug");
    }

    // ── apply_overrides ─────────────────────────────────────────────

    #[test]
    fn overrides_every_group() {
        let mut settings = SwitchyardSettings::default();
        apply_overrides(
            &mut settings,
            env_of(&[
                ("SWITCHYARD_HOST", "0.0.0.0"),
                ("SWITCHYARD_MAX_CONNECTIONS", "10"),
                ("SWITCHYARD_SEND_QUEUE_CAPACITY", "8"),
                ("SWITCHYARD_HEARTBEAT_INTERVAL_SECS", "5"),
                ("SWITCHYARD_HEARTBEAT_TIMEOUT_SECS", "15"),
                ("SWITCHYARD_MAX_MESSAGE_SIZE", "4096"),
                ("SWITCHYARD_LOG_JSON", "yes"),
                ("SWITCHYARD_SESSIONS_FILE", "/tmp/sessions.json"),
            ]),
        );
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.max_connections, 10);
        assert_eq!(settings.server.send_queue_capacity, 8);
        assert_eq!(settings.server.heartbeat_interval_secs, 5);
        assert_eq!(settings.server.heartbeat_timeout_secs, 15);
        assert_eq!(settings.server.max_message_size, 4096);
        assert!(settings.logging.json);
        assert_eq!(settings.sessions.seed_file.as_deref(), Some("/tmp/sessions.json"));
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut settings = SwitchyardSettings::default();
        apply_overrides(
            &mut settings,
            env_of(&[
                ("SWITCHYARD_PORT", "99999"),
                ("SWITCHYARD_MAX_CONNECTIONS", "0"),
                ("SWITCHYARD_LOG_JSON", "maybe"),
                ("SWITCHYARD_HOST", ""),
            ]),
        );
        assert_eq!(settings, SwitchyardSettings::default());
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in ["true", "1", "yes", "on", "TRUE", "On"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in ["false", "0", "no", "off", "FALSE", "Off"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn parse_range_bounds() {
        assert_eq!(parse_range("9090", 1u16, u16::MAX), Some(9090));
        assert_eq!(parse_range("0", 1u16, u16::MAX), None);
        assert_eq!(parse_range("99999", 1u16, u16::MAX), None);
        assert_eq!(parse_range(" 30 ", 1u64, 60), Some(30));
        assert_eq!(parse_range("abc", 1usize, 10), None);
    }
}
