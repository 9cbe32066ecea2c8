pub mod amount;
pub mod columns;
pub mod config;
pub mod csv;
pub mod date;
pub mod dedup;
pub mod defaults;
pub mod row;
pub mod rules;

pub use amount::{parse_amount, AmountError};
pub use columns::{map_columns, ColumnError, ColumnMapping, ColumnRole, ResolvedColumn};
pub use config::{ConfigError, ImportConfig};
pub use crate::csv::{ImportOutcome, ImportSummary, Importer, ParsedImport, StructuralError};
pub use date::{parse_date, DateError, DateParser, DatePrecedence};
pub use dedup::{DedupOutcome, DuplicateDetector};
pub use row::{assemble_row, ImportError, RawRow, RowOutcome};
pub use rules::{
    CategorizationResult, CategorizationRule, CategoryRuleEngine, CategoryScorer, RuleError,
};

/// The pipeline's entry points, one function per operation.
pub mod import {
    use crate::*;
    use rust_decimal::Decimal;
    use tally_core::{AccountId, Fingerprinted, TransactionCandidate, TransactionType};

    pub fn parse_import(
        bytes: &[u8],
        account_id: AccountId,
    ) -> Result<(Vec<TransactionCandidate>, Vec<ImportError>), StructuralError> {
        let parsed = crate::csv::parse_import(bytes, account_id)?;
        Ok((parsed.candidates, parsed.errors))
    }

    pub fn deduplicate<K: Fingerprinted>(
        candidates: Vec<TransactionCandidate>,
        known: &[K],
    ) -> (Vec<TransactionCandidate>, usize) {
        let out = crate::dedup::deduplicate(candidates, known);
        (out.unique, out.duplicate_count)
    }

    pub fn summarize(
        unique: &[TransactionCandidate],
        duplicate_count: usize,
        errors: Vec<ImportError>,
        total_rows_seen: usize,
    ) -> ImportSummary {
        ImportSummary {
            imported_count: unique.len(),
            duplicate_count,
            errors,
            total_rows_seen,
        }
    }

    pub fn categorize(
        engine: &CategoryRuleEngine,
        description: &str,
        amount: Decimal,
        transaction_type: TransactionType,
    ) -> Option<CategorizationResult> {
        engine.categorize(description, amount, transaction_type)
    }

    pub fn register_rule(
        engine: &CategoryRuleEngine,
        rule: CategorizationRule,
    ) -> Result<(), RuleError> {
        engine.register_rule(rule)
    }

}
