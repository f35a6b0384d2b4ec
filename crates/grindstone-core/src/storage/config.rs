//! TOML-based application configuration.
//!
//! Stores:
//! - The reward table (base amounts per action type)
//! - Ledger behaviour (how reopening a task refunds XP)
//! - The day boundary used for daily bonuses, habits and challenges
//!
//! Configuration is stored at `<data dir>/config.toml`.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};
use crate::xp::rewards::RewardTable;

/// How much XP reopening a completed task takes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RefundPolicy {
    /// The unmodified priority base, ignoring any streak bonus that was paid.
    #[default]
    Base,
    /// Exactly what the completion awarded (`Task::xp_awarded`).
    Exact,
}

/// Ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LedgerConfig {
    #[serde(default)]
    pub refund_policy: RefundPolicy,
}

/// Day-boundary configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClockConfig {
    /// Offset from UTC, in hours, of the user's calendar day.
    #[serde(default)]
    pub utc_offset_hours: i32,
}

impl ClockConfig {
    fn offset(&self) -> FixedOffset {
        let hours = self.utc_offset_hours.clamp(-12, 14);
        FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    /// Calendar day that `instant` falls on.
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset()).date_naive()
    }

    /// `[start, end)` of `day` expressed in UTC.
    pub fn day_bounds(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let local_midnight = day.and_hms_opt(0, 0, 0).unwrap_or_default();
        let start = local_midnight.and_utc() - Duration::seconds(self.offset().local_minus_utc() as i64);
        (start, start + Duration::days(1))
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub rewards: RewardTable,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub clock: ClockConfig,
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

    fn set_json_value_by_path(root: &mut serde_json::Value, key: &str, value: &str) -> Result<()> {
        let unknown = || CoreError::from(ConfigError::UnknownKey(key.to_string()));
        let invalid = |message: String| {
            CoreError::from(ConfigError::InvalidValue {
                key: key.to_string(),
                message,
            })
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
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as integer")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
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

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
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
            Err(e) => Err(e.into()),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
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

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field's type. `self` is left untouched on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }
}
