use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use ureq::Agent;

use super::{Currency, ExchangeRateSnapshot};

/// USD-based endpoint of the free exchangerate-api service.
pub const DEFAULT_ENDPOINT: &str = "https://api.exchangerate-api.com/v4/latest/USD";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum RateError {
    #[error("rate service request failed: {0}")]
    Http(#[from] ureq::Error),
    #[error("rate service returned an unusable payload: {0}")]
    Payload(String),
}

/// Source of USD-relative exchange rates.
pub trait RateProvider: Send + Sync {
    /// Fetches current rates, stamping the snapshot with `now`.
    fn fetch_live(&self, now: DateTime<Utc>) -> Result<ExchangeRateSnapshot, RateError>;

    /// Rates used when [`RateProvider::fetch_live`] fails.
    fn backup_snapshot(&self, now: DateTime<Utc>) -> ExchangeRateSnapshot {
        ExchangeRateSnapshot::backup(now)
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// Fetches rates with a blocking HTTP GET bounded by a global timeout.
pub struct HttpRateProvider {
    agent: Agent,
    endpoint: String,
}

impl HttpRateProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = Agent::from(
            Agent::config_builder()
                .timeout_global(Some(timeout))
                .build(),
        );
        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }
}

impl Default for HttpRateProvider {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl RateProvider for HttpRateProvider {
    fn fetch_live(&self, now: DateTime<Utc>) -> Result<ExchangeRateSnapshot, RateError> {
        debug!(endpoint = %self.endpoint, "requesting exchange rates");
        let mut response = self.agent.get(self.endpoint.as_str()).call()?;
        let payload: LatestRatesResponse = response
            .body_mut()
            .read_json()
            .map_err(|err| RateError::Payload(err.to_string()))?;
        Ok(snapshot_from_quotes(&payload.rates, now))
    }
}

/// Keeps only the supported currencies, substituting backup rates for missing quotes.
pub(crate) fn snapshot_from_quotes(
    quotes: &HashMap<String, f64>,
    now: DateTime<Utc>,
) -> ExchangeRateSnapshot {
    let rates = Currency::ALL.iter().map(|currency| {
        if *currency == Currency::Usd {
            return (Currency::Usd, 1.0);
        }
        match quotes.get(currency.code()) {
            Some(rate) if rate.is_finite() && *rate > 0.0 => (*currency, *rate),
            _ => {
                warn!(currency = %currency, "rate service omitted currency, using backup rate");
                (*currency, currency.backup_rate())
            }
        }
    });
    ExchangeRateSnapshot::new(rates, now)
}
