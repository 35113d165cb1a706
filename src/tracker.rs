use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::{
    config::{Config, ConfigManager},
    currency::{Currency, CurrencyConverter, HttpRateProvider, RateCache, RateProvider},
    errors::TrackerError,
    ledger::{self, SortKey, SortOrder, Statistics, Transaction, TransactionStore},
    time::Clock,
    utils::paths,
};

/// The application state: configuration, records, and the single currency converter.
///
/// Built once per process and handed by reference to whatever needs conversions.
pub struct Tracker {
    base_dir: PathBuf,
    config_manager: ConfigManager,
    config: Config,
    store: TransactionStore,
    converter: CurrencyConverter,
    clock: Arc<dyn Clock>,
}

impl Tracker {
    /// Opens the data directory, fetching rates from the configured endpoint if needed.
    pub fn open(base_dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self, TrackerError> {
        let base_dir = base_dir.into();
        let config_manager = ConfigManager::new(paths::config_file_in(&base_dir));
        let config = config_manager.load()?;
        let provider = HttpRateProvider::new(config.rates.endpoint.clone(), config.rates.timeout());
        Self::assemble(base_dir, config_manager, config, Box::new(provider), clock)
    }

    pub fn open_with_provider(
        base_dir: impl Into<PathBuf>,
        provider: Box<dyn RateProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TrackerError> {
        let base_dir = base_dir.into();
        let config_manager = ConfigManager::new(paths::config_file_in(&base_dir));
        let config = config_manager.load()?;
        Self::assemble(base_dir, config_manager, config, provider, clock)
    }

    fn assemble(
        base_dir: PathBuf,
        config_manager: ConfigManager,
        config: Config,
        provider: Box<dyn RateProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TrackerError> {
        let store = TransactionStore::open(paths::transactions_file_in(&base_dir))?;
        let converter = CurrencyConverter::with_max_age(
            RateCache::new(paths::rates_file_in(&base_dir)),
            provider,
            Arc::clone(&clock),
            config.rates.max_age(),
        );
        info!(
            base_dir = %base_dir.display(),
            records = store.len(),
            rates = %converter.source(),
            "tracker opened"
        );
        Ok(Self {
            base_dir,
            config_manager,
            config,
            store,
            converter,
            clock,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config_path(&self) -> &Path {
        self.config_manager.path()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn principal(&self) -> Currency {
        self.config.principal_currency
    }

    pub fn converter(&self) -> &CurrencyConverter {
        &self.converter
    }

    pub fn converter_mut(&mut self) -> &mut CurrencyConverter {
        &mut self.converter
    }

    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn update_config(&mut self, key: &str, value: &str) -> Result<(), TrackerError> {
        let mut updated = self.config.clone();
        updated.set(key, value)?;
        self.config_manager.save(&updated)?;
        self.config = updated;
        Ok(())
    }

    pub fn add_transaction(
        &mut self,
        date: NaiveDate,
        amount: f64,
        currency: Currency,
    ) -> Result<Uuid, TrackerError> {
        self.store.add(Transaction::new(date, amount, currency))
    }

    pub fn remove_transaction(&mut self, id: Uuid) -> Result<Option<Transaction>, TrackerError> {
        self.store.remove(id)
    }

    pub fn sorted_transactions(&self, key: SortKey, order: SortOrder) -> Vec<&Transaction> {
        self.store
            .sorted(key, order, &self.converter, self.principal())
    }

    pub fn converted_amount(&self, transaction: &Transaction) -> f64 {
        transaction.converted_amount(&self.converter, self.principal())
    }

    pub fn statistics(&self) -> Statistics {
        ledger::statistics(
            self.store.records(),
            &self.converter,
            self.principal(),
            self.config.initial_balance,
        )
    }

    pub fn month_totals(&self, year: i32, month: u32) -> std::collections::BTreeMap<NaiveDate, f64> {
        ledger::month_totals(
            self.store.records(),
            &self.converter,
            self.principal(),
            year,
            month,
        )
    }
}
