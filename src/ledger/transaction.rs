//! Transaction records as entered by the user.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::{Currency, CurrencyConverter};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(alias = "fecha")]
    pub date: NaiveDate,
    #[serde(alias = "monto")]
    pub amount: f64,
    #[serde(alias = "moneda")]
    pub currency: Currency,
}

impl Transaction {
    pub fn new(date: NaiveDate, amount: f64, currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            amount,
            currency,
        }
    }

    pub fn state(&self) -> TransactionState {
        TransactionState::from_amount(self.amount)
    }

    /// Value of this record in `principal`, using the converter's current rates.
    pub fn converted_amount(&self, converter: &CurrencyConverter, principal: Currency) -> f64 {
        converter.convert(self.amount, self.currency, principal)
    }
}

/// Sign classification of a transaction amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransactionState {
    Positive,
    Negative,
    Neutral,
}

impl TransactionState {
    pub fn from_amount(amount: f64) -> Self {
        if amount > 0.0 {
            TransactionState::Positive
        } else if amount < 0.0 {
            TransactionState::Negative
        } else {
            TransactionState::Neutral
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionState::Positive => "POSITIVE",
            TransactionState::Negative => "NEGATIVE",
            TransactionState::Neutral => "NEUTRAL",
        };
        f.write_str(label)
    }
}
