//! Aggregates over the transaction list, always expressed in the principal currency.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};

use super::transaction::Transaction;
use crate::currency::{Currency, CurrencyConverter};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub currency: Currency,
    pub total: f64,
    /// Mean converted amount per record.
    pub average: f64,
    pub days_recorded: usize,
    pub initial_balance: f64,
    pub balance: f64,
}

pub fn statistics(
    records: &[Transaction],
    converter: &CurrencyConverter,
    principal: Currency,
    initial_balance: f64,
) -> Statistics {
    let total: f64 = records
        .iter()
        .map(|txn| txn.converted_amount(converter, principal))
        .sum();
    let average = if records.is_empty() {
        0.0
    } else {
        total / records.len() as f64
    };
    let days_recorded = records
        .iter()
        .map(|txn| txn.date)
        .collect::<BTreeSet<_>>()
        .len();

    Statistics {
        currency: principal,
        total,
        average,
        days_recorded,
        initial_balance,
        balance: initial_balance + total,
    }
}

/// Sum of converted amounts per calendar day.
pub fn daily_totals(
    records: &[Transaction],
    converter: &CurrencyConverter,
    principal: Currency,
) -> BTreeMap<NaiveDate, f64> {
    let mut totals = BTreeMap::new();
    for txn in records {
        *totals.entry(txn.date).or_insert(0.0) += txn.converted_amount(converter, principal);
    }
    totals
}

pub fn month_totals(
    records: &[Transaction],
    converter: &CurrencyConverter,
    principal: Currency,
    year: i32,
    month: u32,
) -> BTreeMap<NaiveDate, f64> {
    records
        .iter()
        .filter(|txn| txn.date.year() == year && txn.date.month() == month)
        .fold(BTreeMap::new(), |mut totals, txn| {
            *totals.entry(txn.date).or_insert(0.0) += txn.converted_amount(converter, principal);
            totals
        })
}
