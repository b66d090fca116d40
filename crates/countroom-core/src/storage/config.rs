//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Whether new timers start immediately
//! - What happens to running timers after a relaunch
//! - Urgency thresholds
//! - History timestamp layout
//! - Completion notices
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::history::{is_valid_time_format, DEFAULT_TIME_FORMAT};
use crate::registry::{RegistrySettings, RelaunchPolicy};
use crate::timer::UrgencyThresholds;

/// Timer lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimersConfig {
    /// New timers start `Running` instead of `Paused`.
    #[serde(default)]
    pub start_on_create: bool,
    #[serde(default)]
    pub on_relaunch: RelaunchPolicy,
}

/// Urgency thresholds as remaining-time ratios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyConfig {
    #[serde(default = "default_calm_above")]
    pub calm_above: f64,
    #[serde(default = "default_warning_above")]
    pub warning_above: f64,
}

/// History configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// strftime layout for `completionTime`, rendered in local time.
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timers: TimersConfig,
    #[serde(default)]
    pub urgency: UrgencyConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_calm_above() -> f64 {
    0.7
}
fn default_warning_above() -> f64 {
    0.4
}
fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.into()
}
fn default_true() -> bool {
    true
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            start_on_create: false,
            on_relaunch: RelaunchPolicy::default(),
        }
    }
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        Self {
            calm_above: default_calm_above(),
            warning_above: default_warning_above(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            time_format: default_time_format(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot replace a whole section".to_string()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, writing the defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing the defaults there if it is missing.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Check cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for misordered thresholds or an
    /// unusable time format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds()?;
        if !is_valid_time_format(&self.history.time_format) {
            return Err(ConfigError::InvalidValue {
                key: "history.time_format".to_string(),
                message: format!("'{}' is not a valid strftime layout", self.history.time_format),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the resulting config is invalid.
    /// `self` is left untouched on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for misordered thresholds.
    pub fn thresholds(&self) -> Result<UrgencyThresholds, ConfigError> {
        UrgencyThresholds::new(self.urgency.calm_above, self.urgency.warning_above)
    }

    /// Registry settings derived from this config; invalid thresholds fall back
    /// to the defaults.
    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            start_on_create: self.timers.start_on_create,
            on_relaunch: self.timers.on_relaunch,
            thresholds: self.thresholds().unwrap_or_default(),
            time_format: self.history.time_format.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert!(!parsed.timers.start_on_create);
        assert_eq!(parsed.timers.on_relaunch, RelaunchPolicy::CatchUp);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[timers]\nstart_on_create = true\n").unwrap();
        assert!(parsed.timers.start_on_create);
        assert_eq!(parsed.urgency.calm_above, 0.7);
        assert_eq!(parsed.history.time_format, DEFAULT_TIME_FORMAT);
        assert!(parsed.notifications.enabled);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timers.start_on_create").as_deref(), Some("false"));
        assert_eq!(cfg.get("timers.on_relaunch").as_deref(), Some("catch_up"));
        assert_eq!(cfg.get("urgency.calm_above").as_deref(), Some("0.7"));
        assert!(cfg.get("timers.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("timers.start_on_create", "true").unwrap();
        cfg.apply("timers.on_relaunch", "pause").unwrap();
        cfg.apply("urgency.warning_above", "0.25").unwrap();
        cfg.apply("history.time_format", "%H:%M").unwrap();
        assert!(cfg.timers.start_on_create);
        assert_eq!(cfg.timers.on_relaunch, RelaunchPolicy::Pause);
        assert_eq!(cfg.urgency.warning_above, 0.25);
        assert_eq!(cfg.history.time_format, "%H:%M");
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("timers.nonexistent_key", "value"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.apply("", "value"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn apply_rejects_invalid_values_and_keeps_state() {
        let mut cfg = Config::default();
        assert!(cfg.apply("timers.start_on_create", "not_a_bool").is_err());
        assert!(cfg.apply("timers.on_relaunch", "sometimes").is_err());
        assert!(cfg.apply("urgency.warning_above", "0.9").is_err());
        assert!(cfg.apply("history.time_format", "%Q").is_err());
        assert!(cfg.apply("urgency", "1").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.apply("timers.on_relaunch", "resume").unwrap();
        changed.save_to(&path).unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.timers.on_relaunch, RelaunchPolicy::Resume);
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[urgency]\ncalm_above = 0.2\nwarning_above = 0.5\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));

        std::fs::write(&path, "not = [valid").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseFailed(_))));
    }

    #[test]
    fn registry_settings_follow_config() {
        let mut cfg = Config::default();
        cfg.apply("timers.start_on_create", "true").unwrap();
        let settings = cfg.registry_settings();
        assert!(settings.start_on_create);
        assert_eq!(settings.thresholds, UrgencyThresholds::default());
        assert_eq!(settings.time_format, DEFAULT_TIME_FORMAT);
    }
}
