mod common;

use std::sync::atomic::Ordering;

use chrono::Duration;
use common::{converter_in, noon, seed_cache, MockProvider};
use finance_tracker::currency::{Currency, RateSource, BACKUP_ARS_RATE};
use tempfile::tempdir;

const CODES: [&str; 3] = ["USD", "ARS", "EUR"];

#[test]
fn same_currency_conversion_is_exact() {
    let dir = tempdir().unwrap();
    let (provider, _) = MockProvider::online(1012.0, 0.9);
    let converter = converter_in(&dir, provider, noon());

    for code in CODES {
        for amount in [0.0, -17.25, 0.1 + 0.2, 1e12] {
            assert_eq!(converter.convert(amount, code, code), amount);
        }
        assert_eq!(converter.rate(code, code), Some(1.0));
    }
}

#[test]
fn conversion_ratio_matches_rate() {
    let dir = tempdir().unwrap();
    let (provider, _) = MockProvider::online(1012.0, 0.9);
    let converter = converter_in(&dir, provider, noon());

    for from in CODES {
        for to in CODES {
            let rate = converter.rate(from, to).expect("supported pair");
            for amount in [1.0, -250.0, 3333.33] {
                let ratio = converter.convert(amount, from, to) / amount;
                assert!((ratio - rate).abs() <= rate.abs() * 1e-12, "{from}->{to}");
            }
        }
    }
}

#[test]
fn missing_cache_still_yields_a_ready_converter() {
    let dir = tempdir().unwrap();
    let (provider, calls) = MockProvider::offline();
    let converter = converter_in(&dir, provider, noon());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(converter.source(), RateSource::Backup);
    assert_eq!(
        converter.supported_currencies(),
        &[Currency::Usd, Currency::Ars, Currency::Eur]
    );
    assert!(converter.snapshot().is_complete());
}

#[test]
fn unreachable_service_uses_backup_rates() {
    let dir = tempdir().unwrap();
    let (provider, _) = MockProvider::offline();
    let converter = converter_in(&dir, provider, noon());

    assert_eq!(converter.convert(100.0, "USD", "ARS"), 100.0 * BACKUP_ARS_RATE);
    assert_eq!(converter.convert(100.0, "USD", "ARS"), 95000.0);
    assert!(!dir.path().join("exchange_rates.json").exists());
}

#[test]
fn day_old_cache_triggers_fetch_at_construction() {
    let dir = tempdir().unwrap();
    seed_cache(&dir, noon(), Duration::hours(25), 900.0, 0.95);
    let (provider, calls) = MockProvider::online(1012.0, 0.9);
    let converter = converter_in(&dir, provider, noon());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(converter.source(), RateSource::Fetched);
    assert_eq!(converter.snapshot().rate(Currency::Ars), Some(1012.0));
}

#[test]
fn fresh_cache_is_used_without_fetching() {
    let dir = tempdir().unwrap();
    seed_cache(&dir, noon(), Duration::hours(2), 900.0, 0.95);
    let (provider, calls) = MockProvider::online(1012.0, 0.9);
    let converter = converter_in(&dir, provider, noon());

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(converter.source(), RateSource::Cache);
    assert_eq!(converter.convert(2.0, "USD", "ARS"), 1800.0);
}

#[test]
fn eur_round_trip_is_stable() {
    let dir = tempdir().unwrap();
    let (provider, _) = MockProvider::online(1012.0, 0.9);
    let converter = converter_in(&dir, provider, noon());

    let amount = 1234.56;
    let usd = converter.convert(amount, "EUR", "USD");
    let back = converter.convert(usd, "USD", "EUR");
    assert!((back - amount).abs() < 1e-9);
}

#[test]
fn unsupported_codes_pass_through_unchanged() {
    let dir = tempdir().unwrap();
    let (provider, _) = MockProvider::online(1012.0, 0.9);
    let converter = converter_in(&dir, provider, noon());

    assert_eq!(converter.convert(42.0, "USD", "GBP"), 42.0);
    assert_eq!(converter.convert(42.0, "JPY", "ARS"), 42.0);
    assert_eq!(converter.rate("USD", "GBP"), None);
}
