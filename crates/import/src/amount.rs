//! Money-string normalization.
//!
//! Order of operations: trim, drop a currency symbol that touches a digit,
//! drop thousands separators, turn `(X)` into `-X`, then parse what is left
//! as a decimal. Anything left over that is not a plain decimal is rejected
//! and the error quotes the input as the caller supplied it.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount is empty")]
    Empty,
    #[error("Invalid amount '{0}'")]
    Invalid(String),
}

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '₦', '₵'];

static PLAIN_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("static regex"));

fn strip_currency_symbol(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    chars
        .iter()
        .enumerate()
        .filter(|&(i, c)| {
            if !CURRENCY_SYMBOLS.contains(c) {
                return true;
            }
            let before = i.checked_sub(1).and_then(|j| chars.get(j));
            // `$-4.50`: look past one sign character.
            let after = match chars.get(i + 1) {
                Some('-' | '+') => chars.get(i + 2),
                other => other,
            };
            let touches_digit = before.is_some_and(|c| c.is_ascii_digit())
                || after.is_some_and(|c| c.is_ascii_digit());
            !touches_digit
        })
        .map(|(_, c)| *c)
        .collect()
}

/// Parses a signed amount, e.g. `"$1,234.56"`, `"(10.00)"`, `"-4.50"`.
pub fn parse_amount(raw: &str) -> Result<Decimal, AmountError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }

    let s = strip_currency_symbol(s).replace(',', "");
    let (negative, body) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        // Parentheses win over an inner minus; the two never carry separate meaning.
        Some(inner) => (true, inner.trim().trim_start_matches('-').to_string()),
        None => (false, s),
    };

    if !PLAIN_DECIMAL.is_match(&body) {
        return Err(AmountError::Invalid(raw.to_string()));
    }
    let value = Decimal::from_str(&body).map_err(|_| AmountError::Invalid(raw.to_string()))?;
    Ok(if negative { -value.abs() } else { value })
}

/// Like [`parse_amount`] but returns `None` for a blank cell.
pub fn parse_optional_amount(raw: &str) -> Result<Option<Decimal>, AmountError> {
    match parse_amount(raw) {
        Ok(v) => Ok(Some(v)),
        Err(AmountError::Empty) => Ok(None),
        Err(e) => Err(e),
    }
}
