//! Turns one raw table row into a candidate or into row-scoped errors.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tally_core::{AccountId, TransactionCandidate, TransactionType};

use crate::amount::{parse_amount, parse_optional_amount, AmountError};
use crate::columns::{ColumnMapping, ResolvedColumn};
use crate::date::{DateError, DateParser};

/// A data row as read from the table; `index` is 1-based and excludes the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub index: usize,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(index: usize, cells: Vec<String>) -> Self {
        Self { index, cells }
    }

    pub fn get(&self, column: &ResolvedColumn) -> &str {
        self.cells.get(column.index).map(String::as_str).unwrap_or_default()
    }
}

/// A problem confined to one input row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportError {
    pub row_index: usize,
    pub message: String,
}

impl ImportError {
    pub fn new(row_index: usize, message: impl Into<String>) -> Self {
        Self {
            row_index,
            message: message.into(),
        }
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row_index, self.message)
    }
}

impl std::error::Error for ImportError {}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Candidate(TransactionCandidate),
    Rejected(Vec<ImportError>),
    /// Every mapped cell was blank.
    Blank,
}

fn amount_message(err: &AmountError, raw: &str) -> String {
    match err {
        AmountError::Empty => "no amount present".to_string(),
        AmountError::Invalid(_) => format!("invalid amount '{raw}'"),
    }
}

/// Reads a DR/CR style indicator. `Ok(None)` means the cell was blank and
/// the amount's sign decides.
fn parse_direction(raw: &str) -> Result<Option<TransactionType>, String> {
    match raw.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "dr" | "d" | "debit" | "withdrawal" | "expense" => Ok(Some(TransactionType::Expense)),
        "cr" | "c" | "credit" | "deposit" | "income" => Ok(Some(TransactionType::Income)),
        _ => Err(format!("unrecognized direction '{raw}'")),
    }
}

fn resolve_amount(
    row: &RawRow,
    mapping: &ColumnMapping,
) -> Result<(Decimal, TransactionType), String> {
    if let Some(col) = &mapping.amount {
        let raw = row.get(col);
        let direction = match &mapping.direction {
            Some(dir) => parse_direction(row.get(dir))?,
            None => None,
        };
        let signed = parse_amount(raw).map_err(|e| amount_message(&e, raw))?;
        let transaction_type = direction.unwrap_or_else(|| TransactionType::from_signed(signed));
        return Ok((signed.abs(), transaction_type));
    }

    let debit_raw = mapping.debit.as_ref().map(|c| row.get(c)).unwrap_or_default();
    let credit_raw = mapping.credit.as_ref().map(|c| row.get(c)).unwrap_or_default();
    let debit = parse_optional_amount(debit_raw).map_err(|e| amount_message(&e, debit_raw))?;
    let credit = parse_optional_amount(credit_raw).map_err(|e| amount_message(&e, credit_raw))?;

    match (debit, credit) {
        (Some(d), None) => Ok((d.abs(), TransactionType::Expense)),
        (None, Some(c)) => Ok((c.abs(), TransactionType::Income)),
        (Some(_), Some(_)) => Err(format!(
            "both debit and credit present (debit '{debit_raw}', credit '{credit_raw}')"
        )),
        (None, None) => Err("no amount present".to_string()),
    }
}

/// Assembles a single row. Field errors are collected rather than
/// short-circuited so one pass reports everything wrong with the row.
pub fn assemble_row(
    row: &RawRow,
    mapping: &ColumnMapping,
    account_id: AccountId,
    dates: &DateParser,
) -> RowOutcome {
    if mapping.mapped_columns().all(|c| row.get(c).trim().is_empty()) {
        return RowOutcome::Blank;
    }

    let mut errors = Vec::new();

    let date_raw = row.get(&mapping.date);
    let date = match dates.parse(date_raw) {
        Ok(d) => Some(d),
        Err(DateError::Empty) => {
            errors.push(ImportError::new(row.index, "date is required"));
            None
        }
        Err(DateError::Unrecognized(raw)) => {
            errors.push(ImportError::new(row.index, format!("could not parse date '{raw}'")));
            None
        }
    };

    let description = row.get(&mapping.description).trim();
    if description.is_empty() {
        errors.push(ImportError::new(row.index, "description is required"));
    }

    let amount = match resolve_amount(row, mapping) {
        Ok(v) => Some(v),
        Err(message) => {
            errors.push(ImportError::new(row.index, message));
            None
        }
    };

    match (date, amount) {
        (Some(date), Some((amount, transaction_type))) if errors.is_empty() => {
            let reference = mapping
                .reference
                .as_ref()
                .map(|c| row.get(c))
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string);
            RowOutcome::Candidate(TransactionCandidate {
                account_id,
                date,
                description: description.to_string(),
                amount,
                transaction_type,
                reference,
            })
        }
        _ => RowOutcome::Rejected(errors),
    }
}
