//! Resolves logical column roles from an arbitrary header row.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Date,
    Description,
    Amount,
    Debit,
    Credit,
    /// DR/CR indicator next to an unsigned amount.
    Direction,
    Reference,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnRole::Date => "date",
            ColumnRole::Description => "description",
            ColumnRole::Amount => "amount",
            ColumnRole::Debit => "debit",
            ColumnRole::Credit => "credit",
            ColumnRole::Direction => "direction",
            ColumnRole::Reference => "reference",
        };
        f.write_str(name)
    }
}

/// Synonyms per role, already in normalized form. Order within a list does
/// not matter; the first *header* that matches claims the role.
pub const SYNONYMS: &[(ColumnRole, &[&str])] = &[
    (
        ColumnRole::Date,
        &[
            "date",
            "transaction date",
            "trans date",
            "posting date",
            "posted date",
            "value date",
        ],
    ),
    (
        ColumnRole::Description,
        &[
            "description",
            "details",
            "narration",
            "memo",
            "payee",
            "particulars",
        ],
    ),
    (ColumnRole::Amount, &["amount", "transaction amount"]),
    (
        ColumnRole::Debit,
        &["debit", "withdrawal", "withdrawals", "money out", "paid out"],
    ),
    (
        ColumnRole::Credit,
        &["credit", "deposit", "deposits", "money in", "paid in"],
    ),
    (
        ColumnRole::Direction,
        &["type", "dr/cr", "cr/dr", "debit/credit", "credit/debit", "direction"],
    ),
    (
        ColumnRole::Reference,
        &[
            "reference",
            "ref",
            "check number",
            "reference number",
            "transaction id",
        ],
    ),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColumnError {
    #[error("Could not find {role} column. Expected one of: {expected}")]
    MissingColumn { role: ColumnRole, expected: String },
    #[error("Could not find amount columns. Expected 'amount' or at least one of 'debit'/'credit'")]
    MissingAmountColumns,
}

/// A physical column claimed by a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub index: usize,
    pub header: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub date: ResolvedColumn,
    pub description: ResolvedColumn,
    pub amount: Option<ResolvedColumn>,
    pub debit: Option<ResolvedColumn>,
    pub credit: Option<ResolvedColumn>,
    pub direction: Option<ResolvedColumn>,
    pub reference: Option<ResolvedColumn>,
}

impl ColumnMapping {
    /// Every column the row assembler will read, in role order.
    pub fn mapped_columns(&self) -> impl Iterator<Item = &ResolvedColumn> {
        [
            Some(&self.date),
            Some(&self.description),
            self.amount.as_ref(),
            self.debit.as_ref(),
            self.credit.as_ref(),
            self.direction.as_ref(),
            self.reference.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Lowercase, treat `_`/`-` as spaces, collapse runs of whitespace.
pub fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn synonyms_for(role: ColumnRole) -> &'static [&'static str] {
    SYNONYMS
        .iter()
        .find(|(r, _)| *r == role)
        .map(|(_, names)| *names)
        .unwrap_or(&[])
}

fn resolve<S: AsRef<str>>(
    normalized: &[String],
    headers: &[S],
    role: ColumnRole,
) -> Option<ResolvedColumn> {
    let names = synonyms_for(role);
    normalized
        .iter()
        .position(|h| names.contains(&h.as_str()))
        .map(|index| ResolvedColumn {
            index,
            header: headers[index].as_ref().to_string(),
        })
}

pub fn map_columns<S: AsRef<str>>(headers: &[S]) -> Result<ColumnMapping, ColumnError> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h.as_ref())).collect();
    let required = |role| {
        resolve(&normalized, headers, role).ok_or_else(|| ColumnError::MissingColumn {
            role,
            expected: synonyms_for(role).join(", "),
        })
    };

    let date = required(ColumnRole::Date)?;
    let description = required(ColumnRole::Description)?;

    let amount = resolve(&normalized, headers, ColumnRole::Amount);
    let debit = resolve(&normalized, headers, ColumnRole::Debit);
    let credit = resolve(&normalized, headers, ColumnRole::Credit);
    if amount.is_none() && debit.is_none() && credit.is_none() {
        return Err(ColumnError::MissingAmountColumns);
    }

    Ok(ColumnMapping {
        date,
        description,
        amount,
        debit,
        credit,
        direction: resolve(&normalized, headers, ColumnRole::Direction),
        reference: resolve(&normalized, headers, ColumnRole::Reference),
    })
}
