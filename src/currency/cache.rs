use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Currency, ExchangeRateSnapshot};
use crate::{errors::TrackerError, utils::persistence::write_atomic};

/// Cached rates older than this many hours are refreshed on startup.
pub const DEFAULT_MAX_AGE_HOURS: i64 = 24;

pub fn default_max_age() -> Duration {
    Duration::hours(DEFAULT_MAX_AGE_HOURS)
}

/// Returns true when `snapshot` was obtained more than `max_age` before `now`.
pub fn is_stale(snapshot: &ExchangeRateSnapshot, now: DateTime<Utc>, max_age: Duration) -> bool {
    now.signed_duration_since(snapshot.last_update()) > max_age
}

/// On-disk shape of the cache. Parsed loosely so older files stay readable.
#[derive(Debug, Deserialize)]
struct CacheFile {
    #[serde(default)]
    rates: BTreeMap<String, f64>,
    #[serde(default)]
    last_update: Option<String>,
}

/// JSON file holding the most recent fetched [`ExchangeRateSnapshot`].
#[derive(Debug, Clone)]
pub struct RateCache {
    path: PathBuf,
}

impl RateCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached snapshot. Absent or unusable files yield `None`.
    pub fn load(&self) -> Option<ExchangeRateSnapshot> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no rate cache on disk");
                return None;
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "rate cache unreadable");
                return None;
            }
        };

        let file: CacheFile = match serde_json::from_str(&data) {
            Ok(file) => file,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "rate cache malformed");
                return None;
            }
        };

        let rates = file
            .rates
            .iter()
            .filter_map(|(code, rate)| code.parse::<Currency>().ok().map(|c| (c, *rate)));
        let last_update = file
            .last_update
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let snapshot = ExchangeRateSnapshot::new(rates, last_update);

        if !snapshot.is_complete() {
            warn!(path = %self.path.display(), "rate cache is missing currencies");
            return None;
        }
        Some(snapshot)
    }

    /// Overwrites the cache with `snapshot`.
    pub fn save(&self, snapshot: &ExchangeRateSnapshot) -> Result<(), TrackerError> {
        let json = serde_json::to_string_pretty(snapshot)?;
        write_atomic(&self.path, &json)
    }
}

/// Accepts RFC 3339, naive ISO-8601 (local time) and bare dates.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .or_else(|| Some(Utc.from_utc_datetime(&naive)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn snapshot_at(last_update: DateTime<Utc>) -> ExchangeRateSnapshot {
        ExchangeRateSnapshot::new(
            [(Currency::Ars, 1000.0), (Currency::Eur, 0.9)],
            last_update,
        )
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempdir().expect("tempdir");
        let cache = RateCache::new(dir.path().join("exchange_rates.json"));
        assert!(cache.load().is_none());
    }

    #[test]
    fn malformed_file_loads_as_none() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("exchange_rates.json");
        fs::write(&path, "{ not json").expect("write");
        assert!(RateCache::new(path).load().is_none());
    }

    #[test]
    fn incomplete_rates_load_as_none() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("exchange_rates.json");
        fs::write(
            &path,
            r#"{"rates": {"USD": 1.0, "EUR": 0.9}, "last_update": "2025-01-01T00:00:00Z"}"#,
        )
        .expect("write");
        assert!(RateCache::new(path).load().is_none());
    }

    #[test]
    fn save_then_load_preserves_snapshot() {
        let dir = tempdir().expect("tempdir");
        let cache = RateCache::new(dir.path().join("nested").join("exchange_rates.json"));
        let stamp = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        let snapshot = snapshot_at(stamp);

        cache.save(&snapshot).expect("save");
        let loaded = cache.load().expect("load");

        assert_eq!(loaded, snapshot);
        assert!(!dir
            .path()
            .join("nested")
            .join("exchange_rates.json.tmp")
            .exists());
    }

    #[test]
    fn reads_naive_timestamps_and_ignores_unknown_codes() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("exchange_rates.json");
        fs::write(
            &path,
            r#"{
  "rates": {"USD": 1.0, "ARS": 1200.5, "EUR": 0.93, "GBP": 0.8},
  "last_update": "2024-06-01T10:30:00.123456"
}"#,
        )
        .expect("write");

        let snapshot = RateCache::new(path).load().expect("load");
        assert_eq!(snapshot.rate(Currency::Ars), Some(1200.5));
        assert_eq!(snapshot.rates().len(), 3);
        assert_eq!(
            snapshot.last_update().with_timezone(&Local).date_naive(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
    }

    #[test]
    fn missing_timestamp_is_always_stale() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("exchange_rates.json");
        fs::write(&path, r#"{"rates": {"USD": 1.0, "ARS": 900.0, "EUR": 0.9}}"#).expect("write");

        let snapshot = RateCache::new(path).load().expect("load");
        assert!(is_stale(&snapshot, Utc::now(), default_max_age()));
    }

    #[test]
    fn staleness_is_strictly_greater_than_max_age() {
        let stamp = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let snapshot = snapshot_at(stamp);

        assert!(!is_stale(&snapshot, stamp + Duration::hours(23), default_max_age()));
        assert!(!is_stale(&snapshot, stamp + default_max_age(), default_max_age()));
        assert!(is_stale(
            &snapshot,
            stamp + default_max_age() + Duration::seconds(1),
            default_max_age()
        ));
    }
}
