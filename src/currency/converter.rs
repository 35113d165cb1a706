use std::{fmt, sync::Arc};

use chrono::Duration;
use tracing::{debug, info, warn};

use super::{
    cache::{default_max_age, is_stale, RateCache},
    provider::RateProvider,
    Currency, ExchangeRateSnapshot,
};
use crate::time::Clock;

/// Where the snapshot currently in use came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    Cache,
    Fetched,
    Backup,
}

impl fmt::Display for RateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RateSource::Cache => "cache",
            RateSource::Fetched => "live",
            RateSource::Backup => "backup",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Fetched,
    UsedBackup,
}

/// Result of a single conversion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// Source and target are the same currency.
    Identity(f64),
    Converted { amount: f64, rate: f64 },
    /// No rate was available; the input is passed through.
    Unchanged(f64),
}

impl Conversion {
    pub fn amount(&self) -> f64 {
        match self {
            Conversion::Identity(amount) | Conversion::Unchanged(amount) => *amount,
            Conversion::Converted { amount, .. } => *amount,
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, Conversion::Converted { .. })
    }
}

/// Single point of truth for currency conversion.
///
/// The converter owns the rate cache and the provider. Construction always
/// ends with a usable snapshot: cached rates when fresh, live rates when the
/// service answers, and the backup rates otherwise. No rate failure is ever
/// surfaced to callers.
pub struct CurrencyConverter {
    cache: RateCache,
    provider: Box<dyn RateProvider>,
    clock: Arc<dyn Clock>,
    max_age: Duration,
    snapshot: ExchangeRateSnapshot,
    source: RateSource,
}

impl CurrencyConverter {
    pub fn new(cache: RateCache, provider: Box<dyn RateProvider>, clock: Arc<dyn Clock>) -> Self {
        Self::with_max_age(cache, provider, clock, default_max_age())
    }

    pub fn with_max_age(
        cache: RateCache,
        provider: Box<dyn RateProvider>,
        clock: Arc<dyn Clock>,
        max_age: Duration,
    ) -> Self {
        let now = clock.now();
        let cached = cache.load();
        let (snapshot, source) = match cached {
            Some(snapshot) if !is_stale(&snapshot, now, max_age) => {
                debug!(last_update = %snapshot.last_update(), "using cached exchange rates");
                (snapshot, RateSource::Cache)
            }
            Some(snapshot) => {
                info!(last_update = %snapshot.last_update(), "cached exchange rates are stale");
                obtain_snapshot(&cache, provider.as_ref(), clock.as_ref())
            }
            None => obtain_snapshot(&cache, provider.as_ref(), clock.as_ref()),
        };

        Self {
            cache,
            provider,
            clock,
            max_age,
            snapshot,
            source,
        }
    }

    /// Replaces the snapshot with live rates, or the backup rates when the fetch fails.
    pub fn refresh(&mut self) -> RefreshOutcome {
        let (snapshot, source) =
            obtain_snapshot(&self.cache, self.provider.as_ref(), self.clock.as_ref());
        self.snapshot = snapshot;
        self.source = source;
        match source {
            RateSource::Backup => RefreshOutcome::UsedBackup,
            _ => RefreshOutcome::Fetched,
        }
    }

    /// Refreshes only when the snapshot has outlived the configured max age.
    pub fn refresh_if_stale(&mut self) -> Option<RefreshOutcome> {
        if is_stale(&self.snapshot, self.clock.now(), self.max_age) {
            Some(self.refresh())
        } else {
            None
        }
    }

    /// Converts `amount`, returning it unchanged when no rate applies.
    pub fn convert(&self, amount: f64, from: impl AsRef<str>, to: impl AsRef<str>) -> f64 {
        self.conversion(amount, from, to).amount()
    }

    pub fn conversion(&self, amount: f64, from: impl AsRef<str>, to: impl AsRef<str>) -> Conversion {
        let (from, to) = (from.as_ref(), to.as_ref());
        if from == to {
            return Conversion::Identity(amount);
        }
        let (Some(from), Some(to)) = (self.known(from), self.known(to)) else {
            debug!(from, to, "no rate for conversion, passing amount through");
            return Conversion::Unchanged(amount);
        };
        if from == to {
            return Conversion::Identity(amount);
        }

        let amount_in_usd = match from {
            Currency::Usd => amount,
            _ => amount / self.usd_rate(from),
        };
        let converted = match to {
            Currency::Usd => amount_in_usd,
            _ => amount_in_usd * self.usd_rate(to),
        };
        Conversion::Converted {
            amount: converted,
            rate: self.usd_rate(to) / self.usd_rate(from),
        }
    }

    /// Units of `to` per unit of `from`, if both currencies have rates.
    pub fn rate(&self, from: impl AsRef<str>, to: impl AsRef<str>) -> Option<f64> {
        let (from, to) = (self.known(from.as_ref())?, self.known(to.as_ref())?);
        if from == to {
            return Some(1.0);
        }
        Some(self.usd_rate(to) / self.usd_rate(from))
    }

    pub fn supported_currencies(&self) -> &'static [Currency] {
        &Currency::ALL
    }

    pub fn snapshot(&self) -> &ExchangeRateSnapshot {
        &self.snapshot
    }

    pub fn source(&self) -> RateSource {
        self.source
    }

    /// Parses `code` and checks the current snapshot carries a rate for it.
    fn known(&self, code: &str) -> Option<Currency> {
        let currency = code.parse::<Currency>().ok()?;
        self.snapshot.rate(currency).map(|_| currency)
    }

    fn usd_rate(&self, currency: Currency) -> f64 {
        self.snapshot.rate(currency).unwrap_or(1.0)
    }
}

fn obtain_snapshot(
    cache: &RateCache,
    provider: &dyn RateProvider,
    clock: &dyn Clock,
) -> (ExchangeRateSnapshot, RateSource) {
    let now = clock.now();
    match provider.fetch_live(now) {
        Ok(snapshot) => {
            info!("fetched live exchange rates");
            if let Err(err) = cache.save(&snapshot) {
                warn!(path = %cache.path().display(), error = %err, "could not persist exchange rates");
            }
            (snapshot, RateSource::Fetched)
        }
        Err(err) => {
            warn!(error = %err, "exchange rate fetch failed, using backup rates");
            (provider.backup_snapshot(now), RateSource::Backup)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::tempdir;

    use super::*;
    use crate::{currency::provider::RateError, time::FixedClock};

    struct ScriptedProvider {
        calls: Arc<AtomicUsize>,
        live: Option<(f64, f64)>,
    }

    impl RateProvider for ScriptedProvider {
        fn fetch_live(&self, now: DateTime<Utc>) -> Result<ExchangeRateSnapshot, RateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.live {
                Some((ars, eur)) => Ok(ExchangeRateSnapshot::new(
                    [(Currency::Ars, ars), (Currency::Eur, eur)],
                    now,
                )),
                None => Err(RateError::Payload("offline".into())),
            }
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 12, 0, 0).unwrap()
    }

    fn build(
        cache: RateCache,
        live: Option<(f64, f64)>,
        now: DateTime<Utc>,
    ) -> (CurrencyConverter, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ScriptedProvider {
            calls: Arc::clone(&calls),
            live,
        };
        let converter = CurrencyConverter::new(cache, Box::new(provider), Arc::new(FixedClock(now)));
        (converter, calls)
    }

    #[test]
    fn fresh_cache_skips_the_provider() {
        let dir = tempdir().expect("tempdir");
        let cache = RateCache::new(dir.path().join("rates.json"));
        cache
            .save(&ExchangeRateSnapshot::new(
                [(Currency::Ars, 1100.0), (Currency::Eur, 0.95)],
                noon() - Duration::hours(2),
            ))
            .expect("seed cache");

        let (converter, calls) = build(cache, Some((1.0, 1.0)), noon());

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(converter.source(), RateSource::Cache);
        assert_eq!(converter.rate("USD", "ARS"), Some(1100.0));
    }

    #[test]
    fn successful_fetch_is_persisted() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("rates.json");
        let (converter, calls) = build(RateCache::new(&path), Some((1200.0, 0.9)), noon());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(converter.source(), RateSource::Fetched);
        let persisted = RateCache::new(&path).load().expect("persisted snapshot");
        assert_eq!(persisted.rate(Currency::Ars), Some(1200.0));
        assert_eq!(persisted.last_update(), noon());
    }

    #[test]
    fn backup_rates_are_not_persisted() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("rates.json");
        let (converter, _) = build(RateCache::new(&path), None, noon());

        assert_eq!(converter.source(), RateSource::Backup);
        assert_eq!(converter.convert(100.0, "USD", "ARS"), 95_000.0);
        assert!(!path.exists());
    }

    #[test]
    fn refresh_if_stale_waits_for_max_age() {
        let dir = tempdir().expect("tempdir");
        let (mut converter, calls) =
            build(RateCache::new(dir.path().join("rates.json")), Some((1000.0, 0.9)), noon());

        assert_eq!(converter.refresh_if_stale(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        converter.clock = Arc::new(FixedClock(noon() + Duration::hours(25)));
        assert_eq!(converter.refresh_if_stale(), Some(RefreshOutcome::Fetched));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn conversion_outcomes_distinguish_passthrough() {
        let dir = tempdir().expect("tempdir");
        let (converter, _) = build(RateCache::new(dir.path().join("rates.json")), None, noon());

        assert_eq!(converter.conversion(5.0, "EUR", "EUR"), Conversion::Identity(5.0));
        assert_eq!(converter.conversion(5.0, "usd", "USD"), Conversion::Identity(5.0));
        assert_eq!(converter.conversion(5.0, "GBP", "USD"), Conversion::Unchanged(5.0));
        assert!(converter.conversion(5.0, Currency::Usd, Currency::Eur).is_converted());
    }

    #[test]
    fn unknown_currency_has_no_rate() {
        let dir = tempdir().expect("tempdir");
        let (converter, _) = build(RateCache::new(dir.path().join("rates.json")), None, noon());

        assert_eq!(converter.rate("USD", "BRL"), None);
        assert_eq!(converter.rate("EUR", "EUR"), Some(1.0));
    }
}
