#![doc(test(attr(deny(warnings))))]

//! Finance Tracker logs personal transactions in USD, ARS or EUR and reports
//! them in a single principal currency, using a cached exchange-rate snapshot
//! that falls back to fixed rates whenever the rate service is unavailable.

pub mod cli;
pub mod config;
pub mod currency;
pub mod errors;
pub mod ledger;
pub mod time;
pub mod tracker;
pub mod utils;

pub use tracker::Tracker;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup debug log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::debug!("Finance Tracker tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
