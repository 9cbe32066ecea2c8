//! Multi-format date parsing with a fixed fallback order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("Date is empty")]
    Empty,
    #[error("Could not parse date '{0}'")]
    Unrecognized(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldOrder {
    Ymd,
    Mdy,
    Dmy,
}

/// One supported layout: separator, field order and year width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormat {
    pub name: &'static str,
    separator: char,
    order: FieldOrder,
    year_digits: usize,
}

pub const ISO: DateFormat = DateFormat {
    name: "YYYY-MM-DD",
    separator: '-',
    order: FieldOrder::Ymd,
    year_digits: 4,
};
pub const US_SLASH: DateFormat = DateFormat {
    name: "MM/DD/YYYY",
    separator: '/',
    order: FieldOrder::Mdy,
    year_digits: 4,
};
pub const EU_SLASH: DateFormat = DateFormat {
    name: "DD/MM/YYYY",
    separator: '/',
    order: FieldOrder::Dmy,
    year_digits: 4,
};
pub const US_DASH: DateFormat = DateFormat {
    name: "MM-DD-YYYY",
    separator: '-',
    order: FieldOrder::Mdy,
    year_digits: 4,
};
pub const EU_DASH: DateFormat = DateFormat {
    name: "DD-MM-YYYY",
    separator: '-',
    order: FieldOrder::Dmy,
    year_digits: 4,
};
pub const ISO_SLASH: DateFormat = DateFormat {
    name: "YYYY/MM/DD",
    separator: '/',
    order: FieldOrder::Ymd,
    year_digits: 4,
};
pub const US_SLASH_SHORT: DateFormat = DateFormat {
    name: "MM/DD/YY",
    separator: '/',
    order: FieldOrder::Mdy,
    year_digits: 2,
};
pub const EU_SLASH_SHORT: DateFormat = DateFormat {
    name: "DD/MM/YY",
    separator: '/',
    order: FieldOrder::Dmy,
    year_digits: 2,
};

/// How to break ties between month-first and day-first layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePrecedence {
    /// `01/02/2024` is January 2nd.
    #[default]
    UsFirst,
    /// `01/02/2024` is February 1st.
    EuFirst,
}

impl DateFormat {
    fn parse(&self, s: &str) -> Option<NaiveDate> {
        let parts: Vec<&str> = s.split(self.separator).collect();
        let numeric = |p: &&str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
        if parts.len() != 3 || !parts.iter().all(numeric) {
            return None;
        }
        let (y, m, d) = match self.order {
            FieldOrder::Ymd => (parts[0], parts[1], parts[2]),
            FieldOrder::Mdy => (parts[2], parts[0], parts[1]),
            FieldOrder::Dmy => (parts[2], parts[1], parts[0]),
        };
        if y.len() != self.year_digits || m.len() > 2 || d.len() > 2 {
            return None;
        }
        let mut year: i32 = y.parse().ok()?;
        if self.year_digits == 2 {
            // POSIX pivot: 69-99 => 19xx, 00-68 => 20xx
            year += if year >= 69 { 1900 } else { 2000 };
        }
        NaiveDate::from_ymd_opt(year, m.parse().ok()?, d.parse().ok()?)
    }
}

#[derive(Debug, Clone)]
pub struct DateParser {
    formats: [DateFormat; 8],
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(DatePrecedence::UsFirst)
    }
}

impl DateParser {
    pub fn new(precedence: DatePrecedence) -> Self {
        let formats = match precedence {
            DatePrecedence::UsFirst => [
                ISO,
                US_SLASH,
                EU_SLASH,
                US_DASH,
                EU_DASH,
                ISO_SLASH,
                US_SLASH_SHORT,
                EU_SLASH_SHORT,
            ],
            DatePrecedence::EuFirst => [
                ISO,
                EU_SLASH,
                US_SLASH,
                EU_DASH,
                US_DASH,
                ISO_SLASH,
                EU_SLASH_SHORT,
                US_SLASH_SHORT,
            ],
        };
        Self { formats }
    }

    pub fn formats(&self) -> &[DateFormat] {
        &self.formats
    }

    pub fn parse(&self, raw: &str) -> Result<NaiveDate, DateError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(DateError::Empty);
        }
        self.formats
            .iter()
            .find_map(|f| f.parse(s))
            .ok_or_else(|| DateError::Unrecognized(raw.to_string()))
    }
}

/// Parses with the default US-before-EU precedence.
pub fn parse_date(raw: &str) -> Result<NaiveDate, DateError> {
    DateParser::default().parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn unambiguous_date_agrees_across_every_format() {
        let inputs = [
            "2024-01-15",
            "01/15/2024",
            "15/01/2024",
            "01-15-2024",
            "15-01-2024",
            "2024/01/15",
            "01/15/24",
            "15/01/24",
        ];
        for raw in inputs {
            assert_eq!(parse_date(raw).unwrap(), d(2024, 1, 15), "{raw}");
        }
    }

    #[test]
    fn default_order_is_fixed() {
        let names: Vec<&str> = DateParser::default().formats().iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            [
                "YYYY-MM-DD",
                "MM/DD/YYYY",
                "DD/MM/YYYY",
                "MM-DD-YYYY",
                "DD-MM-YYYY",
                "YYYY/MM/DD",
                "MM/DD/YY",
                "DD/MM/YY",
            ]
        );
    }

    #[test]
    fn ambiguous_slash_date_prefers_us() {
        assert_eq!(parse_date("01/02/2024").unwrap(), d(2024, 1, 2));
        assert_eq!(parse_date("03-04-2024").unwrap(), d(2024, 3, 4));
    }

    #[test]
    fn eu_precedence_flips_the_tie_break() {
        let parser = DateParser::new(DatePrecedence::EuFirst);
        assert_eq!(parser.parse("01/02/2024").unwrap(), d(2024, 2, 1));
        assert_eq!(parser.parse("01/15/2024").unwrap(), d(2024, 1, 15));
    }

    #[test]
    fn two_digit_year_does_not_leak_into_four_digit_formats() {
        assert_eq!(parse_date("12/31/99").unwrap(), d(1999, 12, 31));
        assert_eq!(parse_date("1/5/24").unwrap(), d(2024, 1, 5));
    }

    #[test]
    fn tolerates_surrounding_whitespace_and_single_digits() {
        assert_eq!(parse_date("  2024-1-5 ").unwrap(), d(2024, 1, 5));
    }

    #[test]
    fn empty_input_fails() {
        assert_eq!(parse_date("   "), Err(DateError::Empty));
    }

    #[test]
    fn failure_echoes_original_string() {
        let err = parse_date("invalid-date").unwrap_err();
        assert_eq!(err, DateError::Unrecognized("invalid-date".to_string()));
        assert!(err.to_string().contains("invalid-date"));
    }

    #[test]
    fn impossible_calendar_dates_fail() {
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("13/13/2024").is_err());
        assert!(parse_date("2024-01-15T10:00").is_err());
    }
}
