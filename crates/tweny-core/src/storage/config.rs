//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Quick-session defaults (daily goal, work length, break length)
//! - Reminder preferences
//! - Debug time acceleration
//! - Companion sync toggle
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::{BreakPolicy, Pace, TimerDefaults};

/// Quick-session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_goal_hours")]
    pub daily_goal_hours: f64,
    #[serde(default = "default_work_minutes")]
    pub work_minutes: f64,
    /// Fixed break length. When unset, breaks are drawn from the
    /// `break_min_seconds..=break_max_seconds` window.
    #[serde(default)]
    pub break_seconds: Option<f64>,
    #[serde(default = "default_break_min")]
    pub break_min_seconds: u64,
    #[serde(default = "default_break_max")]
    pub break_max_seconds: u64,
}

/// Reminder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Time acceleration for trying out full cycles quickly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugConfig {
    #[serde(default)]
    pub accelerated: bool,
    #[serde(default = "default_debug_work")]
    pub work_seconds: u64,
    #[serde(default = "default_debug_break")]
    pub break_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_true")]
    pub companion_enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

// Default functions
fn default_goal_hours() -> f64 {
    4.0
}
fn default_work_minutes() -> f64 {
    20.0
}
fn default_break_min() -> u64 {
    20
}
fn default_break_max() -> u64 {
    25
}
fn default_debug_work() -> u64 {
    10
}
fn default_debug_break() -> u64 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            daily_goal_hours: default_goal_hours(),
            work_minutes: default_work_minutes(),
            break_seconds: None,
            break_min_seconds: default_break_min(),
            break_max_seconds: default_break_max(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            accelerated: false,
            work_seconds: default_debug_work(),
            break_seconds: default_debug_break(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            companion_enabled: true,
        }
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
        if parts.peek().is_none() || key.is_empty() {
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
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) | serde_json::Value::Null => {
                        parse_number(value).ok_or_else(|| {
                            invalid(format!("cannot parse '{value}' as number"))
                        })?
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
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

    /// Load from disk or return (and write) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
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

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
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

    /// Set a config value by dot-separated key. The value is parsed against
    /// the type of the existing value; unknown keys are rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "using default configuration");
                Self::default()
            }
        }
    }

    /// Quick-session defaults derived from the `[timer]` section.
    pub fn timer_defaults(&self) -> TimerDefaults {
        let break_policy = match self.timer.break_seconds {
            Some(secs) => BreakPolicy::Fixed {
                secs: whole_secs(secs),
            },
            None => BreakPolicy::Randomized {
                min_secs: self.timer.break_min_seconds,
                max_secs: self.timer.break_max_seconds,
            },
        };
        TimerDefaults {
            goal_secs: whole_secs(self.timer.daily_goal_hours * 3600.0),
            work_secs: whole_secs(self.timer.work_minutes * 60.0).max(1),
            break_policy,
        }
    }

    pub fn pace(&self) -> Pace {
        if self.debug.accelerated {
            Pace::Accelerated {
                work_secs: self.debug.work_seconds.max(1),
                break_secs: self.debug.break_seconds,
            }
        } else {
            Pace::RealTime
        }
    }
}

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<u64>() {
        return Some(serde_json::Value::Number(n.into()));
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
}

fn whole_secs(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        secs.round() as u64
    } else {
        0
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
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[timer]\nwork_minutes = 25.0\n").unwrap();
        assert_eq!(parsed.timer.work_minutes, 25.0);
        assert_eq!(parsed.timer.daily_goal_hours, 4.0);
        assert!(parsed.notifications.enabled);
        assert!(!parsed.debug.accelerated);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("notifications.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("timer.break_min_seconds").as_deref(), Some("20"));
        assert!(cfg.get("timer.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("debug.accelerated", "true").unwrap();
        cfg.set("timer.work_minutes", "25").unwrap();
        assert!(cfg.debug.accelerated);
        assert_eq!(cfg.timer.work_minutes, 25.0);
    }

    #[test]
    fn set_fills_optional_break() {
        let mut cfg = Config::default();
        cfg.set("timer.break_seconds", "30").unwrap();
        assert_eq!(cfg.timer.break_seconds, Some(30.0));
        assert_eq!(
            cfg.timer_defaults().break_policy,
            BreakPolicy::Fixed { secs: 30 }
        );
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("timer.nonexistent_key", "value"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("notifications.enabled", "not_a_bool").is_err());
        assert!(cfg.set("timer.work_minutes", "soon").is_err());
    }

    #[test]
    fn timer_defaults_from_config() {
        let defaults = Config::default().timer_defaults();
        assert_eq!(defaults.goal_secs, 4 * 3600);
        assert_eq!(defaults.work_secs, 1200);
        assert_eq!(defaults.break_policy, BreakPolicy::randomized_default());
    }

    #[test]
    fn pace_follows_debug_section() {
        let mut cfg = Config::default();
        assert_eq!(cfg.pace(), Pace::RealTime);
        cfg.debug.accelerated = true;
        assert_eq!(
            cfg.pace(),
            Pace::Accelerated {
                work_secs: 10,
                break_secs: 5
            }
        );
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timer = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
