//! TOML-based application configuration.
//!
//! Holds the pilot's training stage and the tunable thresholds of the
//! currency engine and notification pipeline. Every field has a default, so
//! partial files load.
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::currency::CurrencyConfig;
use crate::error::ConfigError;
use crate::notifications::{EvaluatorConfig, RateLimitConfig, ScoringConfig};
use crate::training::TrainingStage;

/// Who is flying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub training_stage: TrainingStage,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
}

/// Longest window or cooldown accepted from configuration (days).
const MAX_SPAN_DAYS: i64 = 3650;

fn check_range<T>(key: &str, value: T, range: RangeInclusive<T>) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!(
                "{value} is out of range ({}..={})",
                range.start(),
                range.end()
            ),
        })
    }
}

impl Config {
    /// Check every tunable against the range the engines support.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] naming the first value out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let currency = &self.currency;
        check_range("currency.lookback_days", currency.lookback_days, 1..=MAX_SPAN_DAYS)?;
        check_range("currency.required_landings", currency.required_landings, 1..=1000)?;
        check_range(
            "currency.caution_threshold_days",
            currency.caution_threshold_days,
            0..=currency.lookback_days,
        )?;

        check_range(
            "evaluator.stall_after_days",
            self.evaluator.stall_after_days,
            1..=MAX_SPAN_DAYS,
        )?;
        check_range("scoring.send_threshold", self.scoring.send_threshold, 0.0..=1.0)?;

        let limits = &self.rate_limits;
        check_range(
            "rate_limits.global_cooldown_hours",
            limits.global_cooldown_hours,
            0..=MAX_SPAN_DAYS * 24,
        )?;
        check_range(
            "rate_limits.currency_cliff_cooldown_days",
            limits.currency_cliff_cooldown_days,
            0..=MAX_SPAN_DAYS,
        )?;
        check_range(
            "rate_limits.milestone_cooldown_hours",
            limits.milestone_cooldown_hours,
            0..=MAX_SPAN_DAYS * 24,
        )?;
        check_range(
            "rate_limits.momentum_stall_cooldown_days",
            limits.momentum_stall_cooldown_days,
            0..=MAX_SPAN_DAYS,
        )?;
        Ok(())
    }

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
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<i64>() {
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
                        return Err(invalid("not a leaf value".into()));
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
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from `path`, or defaults if the file does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// holds a value out of range.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Self = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to `path`.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from the data directory, writing defaults on first use.
    ///
    /// # Errors
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("using default configuration: {e}");
            Self::default()
        })
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

    /// Set a config value by dot-separated key, in memory.
    ///
    /// The value is parsed as the type of the current value and the result
    /// must still deserialize and pass [`Config::validate`], so
    /// `profile.training_stage` only accepts a known stage and cooldowns
    /// stay within range.
    ///
    /// # Errors
    /// Returns an error if the key is unknown, or the value does not parse or
    /// is out of range.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}
