//! Currency model and the exchange-rate subsystem.
//!
//! Rates are expressed as units of a currency per one US dollar, so every
//! conversion pivots through USD.

pub mod cache;
pub mod converter;
pub mod provider;

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use cache::{default_max_age, is_stale, RateCache, DEFAULT_MAX_AGE_HOURS};
pub use converter::{Conversion, CurrencyConverter, RateSource, RefreshOutcome};
pub use provider::{
    HttpRateProvider, RateError, RateProvider, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS,
};

/// Fallback ARS rate used when the rate service is unavailable or omits ARS.
pub const BACKUP_ARS_RATE: f64 = 950.0;
/// Fallback EUR rate used when the rate service is unavailable or omits EUR.
pub const BACKUP_EUR_RATE: f64 = 0.92;

/// The closed set of currencies the tracker understands.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Ars,
    Eur,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Ars, Currency::Eur];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Ars => "ARS",
            Currency::Eur => "EUR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Ars => "AR$",
            Currency::Eur => "€",
        }
    }

    /// Rate used when no live quote is available.
    pub fn backup_rate(&self) -> f64 {
        match self {
            Currency::Usd => 1.0,
            Currency::Ars => BACKUP_ARS_RATE,
            Currency::Eur => BACKUP_EUR_RATE,
        }
    }
}

impl AsRef<str> for Currency {
    fn as_ref(&self) -> &str {
        self.code()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCurrency(pub String);

impl fmt::Display for UnknownCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unsupported currency `{}` (expected one of USD, ARS, EUR)",
            self.0
        )
    }
}

impl std::error::Error for UnknownCurrency {}

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "ARS" => Ok(Currency::Ars),
            "EUR" => Ok(Currency::Eur),
            _ => Err(UnknownCurrency(value.to_string())),
        }
    }
}

/// An immutable set of USD-relative rates plus the moment it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRateSnapshot {
    rates: BTreeMap<Currency, f64>,
    last_update: DateTime<Utc>,
}

impl ExchangeRateSnapshot {
    /// Builds a snapshot, pinning USD to 1.0 and discarding non-positive rates.
    pub fn new(
        rates: impl IntoIterator<Item = (Currency, f64)>,
        last_update: DateTime<Utc>,
    ) -> Self {
        let mut rates: BTreeMap<Currency, f64> = rates
            .into_iter()
            .filter(|(_, rate)| rate.is_finite() && *rate > 0.0)
            .collect();
        rates.insert(Currency::Usd, 1.0);
        Self { rates, last_update }
    }

    /// Snapshot built from the hardcoded fallback rates.
    pub fn backup(now: DateTime<Utc>) -> Self {
        Self::new(
            Currency::ALL
                .iter()
                .map(|currency| (*currency, currency.backup_rate())),
            now,
        )
    }

    pub fn rate(&self, currency: Currency) -> Option<f64> {
        self.rates.get(&currency).copied()
    }

    pub fn rates(&self) -> &BTreeMap<Currency, f64> {
        &self.rates
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    /// True when every supported currency has a rate.
    pub fn is_complete(&self) -> bool {
        Currency::ALL
            .iter()
            .all(|currency| self.rates.contains_key(currency))
    }
}
