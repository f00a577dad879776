//! TOML-based application configuration.
//!
//! Stores:
//! - API endpoint and request timeout
//! - Raffle announcement delay and the UI refresh period
//! - Ad-view limits
//! - Raffle multiplier default
//! - Display locale
//!
//! Configuration is stored at `~/.config/sprintraffle/config.toml`.
//! `SPRINTRAFFLE_API_URL` overrides `api.base_url` at load time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::ads::AdViewPolicy;
use crate::error::{ConfigError, Result};
use crate::locale::Locale;

pub const API_URL_ENV: &str = "SPRINTRAFFLE_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintConfig {
    /// Minutes after the sprint ends before winners are announced.
    #[serde(default = "default_announcement_delay")]
    pub raffle_announcement_delay_min: u32,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdsConfig {
    #[serde(default = "default_min_view_duration")]
    pub min_view_duration_secs: u64,
    #[serde(default = "default_max_views")]
    pub max_views_per_sprint: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaffleConfig {
    #[serde(default = "default_multiplier")]
    pub default_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UiConfig {
    #[serde(default)]
    pub locale: Locale,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/sprintraffle/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sprint: SprintConfig,
    #[serde(default)]
    pub ads: AdsConfig,
    #[serde(default)]
    pub raffle: RaffleConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".into()
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_announcement_delay() -> u32 {
    15
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_min_view_duration() -> u64 {
    15
}
fn default_max_views() -> u32 {
    100
}
fn default_multiplier() -> f64 {
    1.0
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            raffle_announcement_delay_min: default_announcement_delay(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            min_view_duration_secs: default_min_view_duration(),
            max_views_per_sprint: default_max_views(),
        }
    }
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            default_multiplier: default_multiplier(),
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
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
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
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Load the file alone, without environment overrides. Use this before
    /// [`set`](Self::set) so an override is never written back.
    pub fn load_file() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Load from disk, returning defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            let mut cfg = Self::default();
            cfg.apply_env_overrides();
            cfg
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
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

    /// Set a value by dot-separated key in memory, keeping the existing type.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse
    /// into the key's type.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// [`set_value`](Self::set_value) and persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value)?;
        self.save()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.raffle.default_multiplier.is_finite() && self.raffle.default_multiplier > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "raffle.default_multiplier".into(),
                message: "must be a positive number".into(),
            });
        }
        if self.sprint.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sprint.tick_interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        url::Url::parse(&self.api.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "api.base_url".into(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms)
    }

    pub fn announcement_delay(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.sprint.raffle_announcement_delay_min))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.sprint.tick_interval_ms.max(1))
    }

    pub fn ad_view_policy(&self) -> AdViewPolicy {
        AdViewPolicy {
            min_view_duration_secs: self.ads.min_view_duration_secs,
            max_views_per_sprint: self.ads.max_views_per_sprint,
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
        assert_eq!(parsed.api.timeout_ms, 30_000);
        assert_eq!(parsed.ads.min_view_duration_secs, 15);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[ui]\nlocale = \"tr\"\n").unwrap();
        assert_eq!(parsed.ui.locale, Locale::Tr);
        assert_eq!(parsed.ads.max_views_per_sprint, 100);
        assert_eq!(parsed.api.base_url, "http://localhost:8080/api");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("ui.locale").as_deref(), Some("en"));
        assert_eq!(cfg.get("ads.min_view_duration_secs").as_deref(), Some("15"));
        assert_eq!(cfg.get("raffle.default_multiplier").as_deref(), Some("1.0"));
        assert!(cfg.get("ui.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_value_keeps_types() {
        let mut cfg = Config::default();
        cfg.set_value("ads.max_views_per_sprint", "50").unwrap();
        cfg.set_value("raffle.default_multiplier", "1.25").unwrap();
        cfg.set_value("ui.locale", "tr").unwrap();
        assert_eq!(cfg.ads.max_views_per_sprint, 50);
        assert_eq!(cfg.raffle.default_multiplier, 1.25);
        assert_eq!(cfg.ui.locale, Locale::Tr);
    }

    #[test]
    fn set_value_rejects_bad_input() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("ads.nope", "1").is_err());
        assert!(cfg.set_value("ads.max_views_per_sprint", "many").is_err());
        assert!(cfg.set_value("ui.locale", "fr").is_err());
        assert!(cfg.set_value("raffle.default_multiplier", "0").is_err());
        assert!(cfg.set_value("api.base_url", "not a url").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set_value("sprint.tick_interval_ms", "500").unwrap();
        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.tick_interval(), Duration::from_millis(500));
    }

    #[test]
    fn load_from_broken_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nbase_url = ").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn announcement_delay_in_minutes() {
        let mut cfg = Config::default();
        assert_eq!(cfg.announcement_delay(), chrono::Duration::minutes(15));
        cfg.set_value("sprint.raffle_announcement_delay_min", "30").unwrap();
        assert_eq!(cfg.announcement_delay(), chrono::Duration::minutes(30));
        assert!(cfg.get("sprint.duration_min").is_none());
    }

    #[test]
    fn policy_reflects_config() {
        let mut cfg = Config::default();
        cfg.set_value("ads.min_view_duration_secs", "20").unwrap();
        let policy = cfg.ad_view_policy();
        assert_eq!(policy.min_view_duration_secs, 20);
        assert_eq!(policy.max_views_per_sprint, 100);
    }
}
