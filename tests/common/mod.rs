#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use finance_tracker::{
    currency::{Currency, CurrencyConverter, ExchangeRateSnapshot, RateCache, RateError, RateProvider},
    time::FixedClock,
};
use tempfile::TempDir;

pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

/// Provider double that counts fetches and either answers with fixed rates or fails.
pub struct MockProvider {
    pub calls: Arc<AtomicUsize>,
    live: Option<(f64, f64)>,
}

impl MockProvider {
    pub fn online(ars: f64, eur: f64) -> (Self, Arc<AtomicUsize>) {
        Self::build(Some((ars, eur)))
    }

    pub fn offline() -> (Self, Arc<AtomicUsize>) {
        Self::build(None)
    }

    fn build(live: Option<(f64, f64)>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Self {
            calls: Arc::clone(&calls),
            live,
        };
        (provider, calls)
    }
}

impl RateProvider for MockProvider {
    fn fetch_live(&self, now: DateTime<Utc>) -> Result<ExchangeRateSnapshot, RateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.live {
            Some((ars, eur)) => Ok(ExchangeRateSnapshot::new(
                [(Currency::Usd, 1.0), (Currency::Ars, ars), (Currency::Eur, eur)],
                now,
            )),
            None => Err(RateError::Payload("service unreachable".into())),
        }
    }
}

pub fn converter_in(dir: &TempDir, provider: MockProvider, now: DateTime<Utc>) -> CurrencyConverter {
    CurrencyConverter::new(
        RateCache::new(dir.path().join("exchange_rates.json")),
        Box::new(provider),
        Arc::new(FixedClock(now)),
    )
}

/// Writes a complete cache stamped `age` before `now`.
pub fn seed_cache(dir: &TempDir, now: DateTime<Utc>, age: Duration, ars: f64, eur: f64) {
    let snapshot = ExchangeRateSnapshot::new(
        [(Currency::Usd, 1.0), (Currency::Ars, ars), (Currency::Eur, eur)],
        now - age,
    );
    RateCache::new(dir.path().join("exchange_rates.json"))
        .save(&snapshot)
        .expect("seed rate cache");
}
