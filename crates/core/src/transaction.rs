use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::account::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Income => write!(f, "income"),
            TransactionType::Expense => write!(f, "expense"),
            TransactionType::Transfer => write!(f, "transfer"),
        }
    }
}

impl TransactionType {
    /// Negative is an expense; zero (including `-0`) and positive are income.
    pub fn from_signed(amount: Decimal) -> Self {
        if amount.is_sign_negative() && !amount.is_zero() {
            TransactionType::Expense
        } else {
            TransactionType::Income
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown transaction type: '{0}'")]
pub struct ParseTransactionTypeError(pub String);

impl std::str::FromStr for TransactionType {
    type Err = ParseTransactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            "transfer" => Ok(TransactionType::Transfer),
            other => Err(ParseTransactionTypeError(other.to_string())),
        }
    }
}

/// A parsed, not-yet-persisted transaction.
///
/// `amount` is always a nonnegative magnitude; whether money came in or went
/// out is carried by `transaction_type` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCandidate {
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub reference: Option<String>,
}

/// A transaction the caller already holds for the account being imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

impl KnownTransaction {
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: Decimal) -> Self {
        KnownTransaction {
            date,
            description: description.into(),
            amount,
        }
    }
}

/// Duplicate-detection key: exact date, exact description, numerically equal amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

impl Fingerprint {
    pub fn new(date: NaiveDate, description: &str, amount: Decimal) -> Self {
        // 4.5 and 4.50 must collide.
        Fingerprint {
            date,
            description: description.to_string(),
            amount: amount.normalize(),
        }
    }
}

/// Anything that exposes the three fields duplicate detection compares.
pub trait Fingerprinted {
    fn date(&self) -> NaiveDate;
    fn description(&self) -> &str;
    fn amount(&self) -> Decimal;

    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.date(), self.description(), self.amount())
    }
}

impl Fingerprinted for KnownTransaction {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn amount(&self) -> Decimal {
        self.amount
    }
}

impl Fingerprinted for TransactionCandidate {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn amount(&self) -> Decimal {
        self.amount
    }
}

impl From<&TransactionCandidate> for KnownTransaction {
    fn from(c: &TransactionCandidate) -> Self {
        KnownTransaction {
            date: c.date,
            description: c.description.clone(),
            amount: c.amount,
        }
    }
}
