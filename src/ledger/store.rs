use std::{
    cmp::Ordering,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use tracing::{debug, info};
use uuid::Uuid;

use super::transaction::Transaction;
use crate::{
    currency::{Currency, CurrencyConverter},
    errors::TrackerError,
    utils::persistence::{load_json, save_json},
};

/// Column used to order the record listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Date,
    Amount,
    Currency,
    State,
}

impl FromStr for SortKey {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(SortKey::Date),
            "amount" => Ok(SortKey::Amount),
            "currency" => Ok(SortKey::Currency),
            "state" => Ok(SortKey::State),
            other => Err(TrackerError::InvalidRecord(format!(
                "unknown sort column `{}` (use date, amount, currency or state)",
                other
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SortKey::Date => "date",
            SortKey::Amount => "amount",
            SortKey::Currency => "currency",
            SortKey::State => "state",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl FromStr for SortOrder {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(TrackerError::InvalidRecord(format!(
                "unknown sort order `{}` (use asc or desc)",
                other
            ))),
        }
    }
}

/// Ordered list of transactions persisted to a JSON file.
///
/// Every mutation is written through immediately; the last write wins.
#[derive(Debug)]
pub struct TransactionStore {
    path: PathBuf,
    records: Vec<Transaction>,
}

impl TransactionStore {
    /// Opens the store at `path`. A missing file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TrackerError> {
        let path = path.into();
        let records: Vec<Transaction> = load_json(&path)?.unwrap_or_default();
        debug!(path = %path.display(), count = records.len(), "loaded transactions");
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[Transaction] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Transaction> {
        self.records.iter().find(|txn| txn.id == id)
    }

    /// Appends a record and persists the store.
    pub fn add(&mut self, transaction: Transaction) -> Result<Uuid, TrackerError> {
        if !transaction.amount.is_finite() {
            return Err(TrackerError::InvalidRecord(format!(
                "amount must be a finite number, got {}",
                transaction.amount
            )));
        }
        let id = transaction.id;
        self.records.push(transaction);
        self.save()?;
        info!(%id, "transaction added");
        Ok(id)
    }

    /// Removes the record with `id`, returning it when present.
    pub fn remove(&mut self, id: Uuid) -> Result<Option<Transaction>, TrackerError> {
        let Some(index) = self.records.iter().position(|txn| txn.id == id) else {
            return Ok(None);
        };
        let removed = self.records.remove(index);
        self.save()?;
        info!(%id, "transaction removed");
        Ok(Some(removed))
    }

    pub fn save(&self) -> Result<(), TrackerError> {
        save_json(&self.records, &self.path)
    }

    /// Returns the records ordered by `key`. Amounts compare in `principal`.
    pub fn sorted(
        &self,
        key: SortKey,
        order: SortOrder,
        converter: &CurrencyConverter,
        principal: Currency,
    ) -> Vec<&Transaction> {
        let mut view: Vec<&Transaction> = self.records.iter().collect();
        view.sort_by(|a, b| {
            let primary = match key {
                SortKey::Date => a.date.cmp(&b.date),
                SortKey::Amount => a
                    .converted_amount(converter, principal)
                    .partial_cmp(&b.converted_amount(converter, principal))
                    .unwrap_or(Ordering::Equal),
                SortKey::Currency => a.currency.cmp(&b.currency),
                SortKey::State => a.state().cmp(&b.state()),
            };
            let ordered = primary.then_with(|| a.date.cmp(&b.date));
            match order {
                SortOrder::Ascending => ordered,
                SortOrder::Descending => ordered.reverse(),
            }
        });
        view
    }
}
