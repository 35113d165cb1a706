use dirs::home_dir;
use std::{
    env,
    path::{Path, PathBuf},
};

const DEFAULT_DIR_NAME: &str = ".finance_tracker";
const TRANSACTIONS_FILE: &str = "transactions.json";
const RATES_FILE: &str = "exchange_rates.json";
const CONFIG_FILE: &str = "config.json";

/// Returns the application data directory, defaulting to `~/.finance_tracker`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os("FINANCE_TRACKER_HOME") {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub fn transactions_file_in(base: &Path) -> PathBuf {
    base.join(TRANSACTIONS_FILE)
}

pub fn rates_file_in(base: &Path) -> PathBuf {
    base.join(RATES_FILE)
}

pub fn config_file_in(base: &Path) -> PathBuf {
    base.join(CONFIG_FILE)
}
