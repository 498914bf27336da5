//! TOML-based engine configuration.
//!
//! Stores:
//! - Tick intervals for breath and sequence practices
//! - Biometric simulator ranges, targets and seed
//! - Scoring band thresholds
//! - An optional custom catalog path
//!
//! Configuration is stored at `~/.config/pranaroom/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::biometrics::SimulatorConfig;
use crate::error::ConfigError;
use crate::scoring::ScoringConfig;
use crate::technique::{Catalog, PracticeMode};
use crate::timer::{MAX_INTERVAL_MS, MIN_INTERVAL_MS};

/// Tick intervals per practice kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Breath cycles need sub-second resolution for phase changes.
    #[serde(default = "default_breath_interval_ms")]
    pub breath_interval_ms: u64,
    /// Pose and meditation holds are counted in whole seconds.
    #[serde(default = "default_sequence_interval_ms")]
    pub sequence_interval_ms: u64,
}

/// Custom catalog location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// TOML catalog replacing the built-in one.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/pranaroom/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub biometrics: SimulatorConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

fn default_breath_interval_ms() -> u64 {
    100
}
fn default_sequence_interval_ms() -> u64 {
    1000
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            breath_interval_ms: default_breath_interval_ms(),
            sequence_interval_ms: default_sequence_interval_ms(),
        }
    }
}

impl ClockConfig {
    pub fn interval_for(&self, mode: PracticeMode) -> Duration {
        let ms = match mode {
            PracticeMode::Breath => self.breath_interval_ms,
            PracticeMode::Pose | PracticeMode::Meditation => self.sequence_interval_ms,
        };
        Duration::from_millis(ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, ms) in [
            ("clock.breath_interval_ms", self.breath_interval_ms),
            ("clock.sequence_interval_ms", self.sequence_interval_ms),
        ] {
            if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&ms) {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: format!("must lie within {MIN_INTERVAL_MS}..={MAX_INTERVAL_MS}"),
                });
            }
        }
        Ok(())
    }
}

impl EngineConfig {
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

    fn parse_scalar(key: &str, value: &str) -> Result<serde_json::Value, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.into(),
            message: format!("cannot parse '{value}' as number"),
        };
        if let Ok(n) = value.parse::<u64>() {
            Ok(serde_json::Value::Number(n.into()))
        } else if let Ok(n) = value.parse::<f64>() {
            serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .ok_or_else(invalid)
        } else {
            Err(invalid())
        }
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
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
                    serde_json::Value::Bool(_) => {
                        serde_json::Value::Bool(value.parse::<bool>().map_err(|e| {
                            ConfigError::InvalidValue {
                                key: key.into(),
                                message: e.to_string(),
                            }
                        })?)
                    }
                    serde_json::Value::Number(_) => match value {
                        "none" | "null" => serde_json::Value::Null,
                        _ => Self::parse_scalar(key, value)?,
                    },
                    // Unset optionals: "none" clears, numbers stay numbers.
                    serde_json::Value::Null => match value {
                        "" | "none" | "null" => serde_json::Value::Null,
                        _ => Self::parse_scalar(key, value)
                            .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    },
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| ConfigError::InvalidValue {
                            key: key.into(),
                            message: e.to_string(),
                        })?
                    }
                    serde_json::Value::String(_) => match value {
                        "none" | "null" => serde_json::Value::Null,
                        _ => serde_json::Value::String(value.into()),
                    },
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there when the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: EngineConfig = toml::from_str(&content).map_err(|e| {
                    ConfigError::LoadFailed {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    }
                })?;
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
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
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

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting config fails validation. `self` is left unchanged
    /// on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: EngineConfig =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.into(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Flattened `key = value` pairs for every leaf setting.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clock.validate()?;
        self.biometrics.validate()?;
        self.scoring.validate()?;
        Ok(())
    }

    /// The custom catalog when one is configured, otherwise the built-in one.
    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        match &self.catalog.path {
            Some(path) => Catalog::load(path),
            None => Ok(Catalog::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: EngineConfig = toml::from_str("[clock]\nbreath_interval_ms = 50\n").unwrap();
        assert_eq!(parsed.clock.breath_interval_ms, 50);
        assert_eq!(parsed.clock.sequence_interval_ms, 1000);
        assert_eq!(parsed.scoring, ScoringConfig::default());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.get("clock.breath_interval_ms").as_deref(), Some("100"));
        assert_eq!(cfg.get("scoring.elite").as_deref(), Some("90.0"));
        assert_eq!(cfg.get("biometrics.seed").as_deref(), Some("null"));
        assert!(cfg.get("clock.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_number() {
        let mut cfg = EngineConfig::default();
        cfg.set("clock.sequence_interval_ms", "500").unwrap();
        assert_eq!(cfg.clock.sequence_interval_ms, 500);
        cfg.set("biometrics.alignment.jitter", "0.5").unwrap();
        assert_eq!(cfg.biometrics.alignment.jitter, 0.5);
    }

    #[test]
    fn set_fills_and_clears_optional_seed() {
        let mut cfg = EngineConfig::default();
        cfg.set("biometrics.seed", "7").unwrap();
        assert_eq!(cfg.biometrics.seed, Some(7));
        cfg.set("biometrics.seed", "none").unwrap();
        assert_eq!(cfg.biometrics.seed, None);
    }

    #[test]
    fn set_catalog_path() {
        let mut cfg = EngineConfig::default();
        cfg.set("catalog.path", "/tmp/custom.toml").unwrap();
        assert_eq!(cfg.catalog.path, Some(PathBuf::from("/tmp/custom.toml")));
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = EngineConfig::default();
        assert_eq!(
            cfg.set("clock.nonexistent_key", "1"),
            Err(ConfigError::UnknownKey("clock.nonexistent_key".into()))
        );
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = EngineConfig::default();
        assert!(cfg.set("clock.breath_interval_ms", "fast").is_err());
    }

    #[test]
    fn set_rejects_zero_interval_and_keeps_old_value() {
        let mut cfg = EngineConfig::default();
        let err = cfg.set("clock.breath_interval_ms", "0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "clock.breath_interval_ms"));
        assert_eq!(cfg.clock.breath_interval_ms, 100);
    }

    #[test]
    fn set_rejects_inverted_thresholds() {
        let mut cfg = EngineConfig::default();
        assert!(cfg.set("scoring.good", "95").is_err());
        assert_eq!(cfg.scoring.good, 75.0);
    }

    #[test]
    fn entries_cover_every_section() {
        let entries = EngineConfig::default().entries();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"clock.breath_interval_ms"));
        assert!(keys.contains(&"biometrics.heart_rate.min"));
        assert!(keys.contains(&"scoring.good"));
        assert!(keys.contains(&"catalog.path"));
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = EngineConfig::load_from(&path).unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scoring]\nelite = 60.0\ngood = 80.0\n").unwrap();
        assert!(EngineConfig::load_from(&path).is_err());
    }

    #[test]
    fn interval_depends_on_mode() {
        let clock = ClockConfig::default();
        assert_eq!(clock.interval_for(PracticeMode::Breath), Duration::from_millis(100));
        assert_eq!(clock.interval_for(PracticeMode::Pose), Duration::from_secs(1));
        assert_eq!(clock.interval_for(PracticeMode::Meditation), Duration::from_secs(1));
    }
}
