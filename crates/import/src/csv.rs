//! Import coordinator: decodes the payload, reads the table, and drives
//! column mapping, row assembly and duplicate detection.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tally_core::{AccountId, Fingerprinted, TransactionCandidate};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::columns::{map_columns, ColumnError};
use crate::config::{ConfigError, ImportConfig};
use crate::date::DateParser;
use crate::dedup::{DedupOutcome, DuplicateDetector};
use crate::row::{assemble_row, ImportError, RawRow, RowOutcome};

/// Failures that invalidate the whole import before any row is processed.
#[derive(Error, Debug)]
pub enum StructuralError {
    #[error("Document is empty")]
    EmptyDocument,
    #[error(transparent)]
    Columns(#[from] ColumnError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedImport {
    pub candidates: Vec<TransactionCandidate>,
    pub errors: Vec<ImportError>,
    /// Data rows read after the header, blank ones included.
    pub total_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported_count: usize,
    pub duplicate_count: usize,
    pub errors: Vec<ImportError>,
    pub total_rows_seen: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub candidates: Vec<TransactionCandidate>,
    pub summary: ImportSummary,
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// UTF-8 with or without BOM; anything else is read as Latin-1.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(e) => {
            warn!(valid_up_to = e.valid_up_to(), "Payload is not UTF-8, decoding as Latin-1");
            Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())
        }
    }
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct Importer {
    delimiter: u8,
    dates: DateParser,
    detector: DuplicateDetector,
}

impl Default for Importer {
    fn default() -> Self {
        Self {
            delimiter: b',',
            dates: DateParser::default(),
            detector: DuplicateDetector::default(),
        }
    }
}

impl Importer {
    pub fn new(config: &ImportConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            delimiter: config.delimiter_byte()?,
            dates: config.date_parser(),
            detector: DuplicateDetector::new(config.dedupe_within_batch),
        })
    }

    /// Reads every row into a candidate or row errors. Only an empty document
    /// or an unmappable header fails the call as a whole.
    pub fn parse_import(
        &self,
        bytes: &[u8],
        account_id: AccountId,
    ) -> Result<ParsedImport, StructuralError> {
        let text = decode(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(text.as_bytes());
        let mut records = reader.records();

        let header = loop {
            match records.next() {
                None => return Err(StructuralError::EmptyDocument),
                Some(record) => {
                    let record = record?;
                    if !is_blank(&record) {
                        break record;
                    }
                }
            }
        };
        let headers: Vec<&str> = header.iter().collect();
        let mapping = map_columns(&headers)?;
        debug!(?mapping, "Resolved column mapping");

        let mut candidates = Vec::new();
        let mut errors = Vec::new();
        let mut total_rows = 0;

        for (offset, result) in records.enumerate() {
            let index = offset + 1;
            total_rows += 1;

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    errors.push(ImportError::new(index, format!("unreadable row: {e}")));
                    continue;
                }
            };
            if is_blank(&record) {
                continue;
            }
            if record.len() != headers.len() {
                let separator = char::from(self.delimiter).to_string();
                let raw = record.iter().collect::<Vec<_>>().join(separator.as_str());
                errors.push(ImportError::new(
                    index,
                    format!(
                        "expected {} columns, found {} (row: '{raw}')",
                        headers.len(),
                        record.len()
                    ),
                ));
                continue;
            }

            let row = RawRow::new(index, record.iter().map(str::to_string).collect());
            match assemble_row(&row, &mapping, account_id, &self.dates) {
                RowOutcome::Candidate(c) => candidates.push(c),
                RowOutcome::Rejected(row_errors) => {
                    for e in &row_errors {
                        debug!(row = e.row_index, message = %e.message, "Rejected row");
                    }
                    errors.extend(row_errors);
                }
                RowOutcome::Blank => {}
            }
        }

        Ok(ParsedImport {
            candidates,
            errors,
            total_rows,
        })
    }

    pub fn deduplicate<K: Fingerprinted>(
        &self,
        candidates: Vec<TransactionCandidate>,
        known: &[K],
    ) -> DedupOutcome<TransactionCandidate> {
        self.detector.deduplicate(candidates, known)
    }

    /// Parse, drop duplicates of `known`, and summarize.
    pub fn run<K: Fingerprinted>(
        &self,
        bytes: &[u8],
        account_id: AccountId,
        known: &[K],
    ) -> Result<ImportOutcome, StructuralError> {
        let parsed = self.parse_import(bytes, account_id)?;
        let deduped = self.deduplicate(parsed.candidates, known);
        let summary = ImportSummary {
            imported_count: deduped.unique.len(),
            duplicate_count: deduped.duplicate_count,
            errors: parsed.errors,
            total_rows_seen: parsed.total_rows,
        };
        info!(
            account = %account_id,
            imported = summary.imported_count,
            duplicates = summary.duplicate_count,
            errors = summary.errors.len(),
            rows = summary.total_rows_seen,
            "Import finished"
        );
        Ok(ImportOutcome {
            candidates: deduped.unique,
            summary,
        })
    }
}

pub fn parse_import(bytes: &[u8], account_id: AccountId) -> Result<ParsedImport, StructuralError> {
    Importer::default().parse_import(bytes, account_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::DatePrecedence;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tally_core::{KnownTransaction, TransactionType};

    const ACCOUNT: AccountId = AccountId(7);

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parse(data: &str) -> ParsedImport {
        parse_import(data.as_bytes(), ACCOUNT).unwrap()
    }

    #[test]
    fn unified_amount_row() {
        let p = parse("Date,Description,Amount\n2024-01-15,Coffee Shop,-4.50\n");
        assert!(p.errors.is_empty());
        assert_eq!(p.candidates.len(), 1);
        let c = &p.candidates[0];
        assert_eq!(c.date, date(2024, 1, 15));
        assert_eq!(c.description, "Coffee Shop");
        assert_eq!(c.amount, dec("4.50"));
        assert_eq!(c.transaction_type, TransactionType::Expense);
        assert_eq!(c.account_id, ACCOUNT);
    }

    #[test]
    fn debit_credit_row() {
        let p = parse("Date,Description,Debit,Credit\n2024-01-16,Salary,,2500.00\n");
        assert_eq!(p.candidates.len(), 1);
        assert_eq!(p.candidates[0].transaction_type, TransactionType::Income);
        assert_eq!(p.candidates[0].amount, dec("2500.00"));
    }

    #[test]
    fn bad_row_is_isolated() {
        let p = parse("Date,Description,Amount\ninvalid-date,X,-10.00\n2024-01-15,Y,-20.00\n");
        assert_eq!(p.candidates.len(), 1);
        assert_eq!(p.candidates[0].description, "Y");
        assert_eq!(p.errors.len(), 1);
        assert_eq!(p.errors[0].row_index, 1);
        assert!(p.errors[0].message.contains("invalid-date"));
        assert!(p.errors[0].to_string().starts_with("Row 1:"));
    }

    #[test]
    fn one_malformed_row_among_many() {
        let mut data = String::from("Date,Description,Amount\n");
        for i in 1..=10 {
            if i == 6 {
                data.push_str("2024-01-06,Broken,abc\n");
            } else {
                data.push_str(&format!("2024-01-{i:02},Row {i},{i}.00\n"));
            }
        }
        let p = parse(&data);
        assert_eq!(p.candidates.len(), 9);
        assert_eq!(p.errors.len(), 1);
        assert_eq!(p.errors[0].row_index, 6);
        assert!(p.errors[0].message.contains("abc"));
        assert_eq!(p.total_rows, 10);
    }

    #[test]
    fn duplicate_against_known() {
        let known = vec![KnownTransaction::new(date(2024, 1, 15), "Coffee Shop", dec("4.50"))];
        let data = "Date,Description,Amount\n\
                    2024-01-15,Coffee Shop,-4.50\n\
                    2024-01-16,Salary,2500.00\n";
        let out = Importer::default().run(data.as_bytes(), ACCOUNT, &known).unwrap();
        assert_eq!(out.summary.duplicate_count, 1);
        assert_eq!(out.summary.imported_count, 1);
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].description, "Salary");
        assert_eq!(out.candidates[0].amount, dec("2500.00"));
    }

    #[test]
    fn rerun_against_first_run_is_all_duplicates() {
        let data = "\u{feff}Date,Description,Amount,Reference\n\
                    2024-01-15,Coffee Shop,-4.50,\n\
                    01/16/2024,Salary,\"$2,500.00\",PAY-1\n\
                    2024-01-17,Rent,(1200),\n\
                    bad,Nope,1\n";
        let importer = Importer::default();
        let first = importer.run::<KnownTransaction>(data.as_bytes(), ACCOUNT, &[]).unwrap();
        assert_eq!(first.summary.imported_count, 3);
        assert_eq!(first.summary.errors.len(), 1);

        let known: Vec<KnownTransaction> =
            first.candidates.iter().map(KnownTransaction::from).collect();
        let second = importer.run(data.as_bytes(), ACCOUNT, &known).unwrap();
        assert_eq!(second.summary.duplicate_count, first.summary.imported_count);
        assert_eq!(second.summary.imported_count, 0);
    }

    #[test]
    fn empty_document_is_structural() {
        for data in ["", "\n\n", "\u{feff}", " , ,\n"] {
            assert!(
                matches!(
                    parse_import(data.as_bytes(), ACCOUNT),
                    Err(StructuralError::EmptyDocument)
                ),
                "{data:?}"
            );
        }
    }

    #[test]
    fn header_only_is_a_successful_empty_import() {
        let out = Importer::default()
            .run::<KnownTransaction>(b"Date,Description,Amount\n", ACCOUNT, &[])
            .unwrap();
        assert!(out.candidates.is_empty());
        assert_eq!(out.summary.imported_count, 0);
        assert_eq!(out.summary.total_rows_seen, 0);
        assert!(out.summary.errors.is_empty());
    }

    #[test]
    fn unresolvable_columns_are_structural() {
        let err = parse_import(b"When,What,HowMuch\n2024-01-01,x,1\n", ACCOUNT).unwrap_err();
        assert!(matches!(err, StructuralError::Columns(ColumnError::MissingColumn { .. })));
        let err = parse_import(b"Date,Description,Balance\n2024-01-01,x,1\n", ACCOUNT).unwrap_err();
        assert!(matches!(err, StructuralError::Columns(ColumnError::MissingAmountColumns)));
    }

    #[test]
    fn bom_is_ignored() {
        let with = parse("\u{feff}Date,Description,Amount\n2024-01-15,A,1\n");
        let without = parse("Date,Description,Amount\n2024-01-15,A,1\n");
        assert_eq!(with, without);
    }

    #[test]
    fn latin1_payload_is_decoded() {
        let mut data = b"Date,Description,Amount\n2024-01-15,Caf".to_vec();
        data.push(0xE9);
        data.extend_from_slice(b",-3.00\n");
        let p = parse_import(&data, ACCOUNT).unwrap();
        assert_eq!(p.candidates[0].description, "Café");
    }

    #[test]
    fn bom_before_latin1_body_is_dropped() {
        let mut data = b"\xEF\xBB\xBFDate,Description,Amount\n2024-01-15,Caf".to_vec();
        data.push(0xE9);
        data.extend_from_slice(b",-3.00\n");
        let p = parse_import(&data, ACCOUNT).unwrap();
        assert_eq!(p.candidates.len(), 1);
        assert_eq!(p.candidates[0].description, "Café");
        assert_eq!(p.candidates[0].transaction_type, TransactionType::Expense);
    }

    #[test]
    fn type_column_with_dr_marks_unsigned_amount_as_expense() {
        let p = parse("Date,Details,Type,Amount\n2024-01-15,Rent,DR,1200.00\n");
        assert!(p.errors.is_empty());
        assert_eq!(p.candidates[0].transaction_type, TransactionType::Expense);
        assert_eq!(p.candidates[0].amount, dec("1200.00"));
    }

    #[test]
    fn leading_blank_lines_and_blank_rows() {
        let p = parse("\n , \nDate,Description,Amount\n2024-01-15,A,1\n,,\n2024-01-16,B,2\n");
        assert_eq!(p.candidates.len(), 2);
        assert!(p.errors.is_empty());
        assert_eq!(p.total_rows, 3);
    }

    #[test]
    fn wrong_column_count_is_a_row_error() {
        let p = parse(
            "Date,Description,Amount\n2024-01-15,A\n2024-01-16,B,2\n2024-01-17,C,3,extra\n",
        );
        assert_eq!(p.candidates.len(), 1);
        assert_eq!(p.errors.len(), 2);
        assert_eq!(p.errors[0].row_index, 1);
        assert_eq!(
            p.errors[0].message,
            "expected 3 columns, found 2 (row: '2024-01-15,A')"
        );
        assert_eq!(p.errors[1].row_index, 3);
        assert!(p.errors[1].message.ends_with("(row: '2024-01-17,C,3,extra')"));
    }

    #[test]
    fn config_controls_delimiter_precedence_and_batch_dedup() {
        let config = ImportConfig {
            delimiter: ";".to_string(),
            date_precedence: DatePrecedence::EuFirst,
            dedupe_within_batch: true,
        };
        let importer = Importer::new(&config).unwrap();
        let data = "Datum;Omschrijving;Bedrag\n";
        assert!(importer.parse_import(data.as_bytes(), ACCOUNT).is_err());

        let data = "Date;Details;Amount\n01/02/2024;Bakery;-1,50\n01/02/2024;Bakery;-1,50\n";
        let out = importer.run::<KnownTransaction>(data.as_bytes(), ACCOUNT, &[]).unwrap();
        // Comma is a thousands separator, never a decimal point.
        assert_eq!(out.candidates[0].amount, dec("150"));
        assert_eq!(out.candidates[0].date, date(2024, 2, 1));
        assert_eq!(out.summary.duplicate_count, 1);
    }

    #[test]
    fn quoted_fields_with_commas() {
        let p = parse("Date,Description,Amount\n2024-01-15,\"Smith, John\",\"$1,234.56\"\n");
        assert_eq!(p.candidates[0].description, "Smith, John");
        assert_eq!(p.candidates[0].amount, dec("1234.56"));
        assert_eq!(p.candidates[0].transaction_type, TransactionType::Income);
    }

    #[test]
    fn summary_serializes() {
        let summary = ImportSummary {
            imported_count: 1,
            duplicate_count: 2,
            errors: vec![ImportError::new(3, "date is required")],
            total_rows_seen: 6,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["errors"][0]["row_index"], 3);
        assert_eq!(json["duplicate_count"], 2);
    }
}
