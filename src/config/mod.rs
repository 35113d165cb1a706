//! Persistent user preferences: principal currency, opening balance, rate service settings.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    currency::{
        Currency, UnknownCurrency, DEFAULT_ENDPOINT, DEFAULT_MAX_AGE_HOURS, DEFAULT_TIMEOUT_SECS,
    },
    errors::TrackerError,
    utils::persistence::{load_json, save_json},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, alias = "principalCurrency")]
    pub principal_currency: Currency,
    /// Opening balance, expressed in the principal currency.
    #[serde(default, alias = "initialBalance")]
    pub initial_balance: f64,
    #[serde(default)]
    pub rates: RateSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            principal_currency: Currency::Usd,
            initial_balance: 0.0,
            rates: RateSettings::default(),
        }
    }
}

impl Config {
    /// Applies a `key value` pair coming from the shell.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), TrackerError> {
        match key.trim().to_ascii_lowercase().as_str() {
            "principal" | "principal_currency" | "currency" => {
                self.principal_currency = value
                    .parse()
                    .map_err(|err: UnknownCurrency| TrackerError::Config(err.to_string()))?;
            }
            "balance" | "initial_balance" => {
                let amount: f64 = value.trim().parse().map_err(|_| {
                    TrackerError::Config(format!("`{}` is not a valid amount", value))
                })?;
                if !amount.is_finite() {
                    return Err(TrackerError::Config("balance must be finite".into()));
                }
                self.initial_balance = amount;
            }
            other => {
                return Err(TrackerError::Config(format!(
                    "unknown setting `{}` (use principal or balance)",
                    other
                )))
            }
        }
        Ok(())
    }
}

/// How and how often exchange rates are fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSettings {
    #[serde(default = "RateSettings::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "RateSettings::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "RateSettings::default_max_age_hours")]
    pub max_age_hours: i64,
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            timeout_secs: Self::default_timeout_secs(),
            max_age_hours: Self::default_max_age_hours(),
        }
    }
}

impl RateSettings {
    pub fn default_endpoint() -> String {
        DEFAULT_ENDPOINT.into()
    }

    pub fn default_timeout_secs() -> u64 {
        DEFAULT_TIMEOUT_SECS
    }

    pub fn default_max_age_hours() -> i64 {
        DEFAULT_MAX_AGE_HOURS
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.max_age_hours.max(0)).unwrap_or(chrono::Duration::MAX)
    }
}

/// Loads and saves [`Config`] at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored configuration, or the defaults when none was saved yet.
    pub fn load(&self) -> Result<Config, TrackerError> {
        Ok(load_json(&self.path)?.unwrap_or_default())
    }

    pub fn save(&self, config: &Config) -> Result<(), TrackerError> {
        save_json(config, &self.path)
    }
}
