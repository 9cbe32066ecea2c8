use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tally_core::{AccountId, KnownTransaction, TransactionCandidate};
use tally_import::{
    CategorizationResult, CategoryRuleEngine, ImportConfig, ImportSummary, Importer,
};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct CategorizedTransaction {
    #[serde(flatten)]
    pub transaction: TransactionCandidate,
    pub category: Option<CategorizationResult>,
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub summary: ImportSummary,
    pub transactions: Vec<CategorizedTransaction>,
}

pub fn load_engine(rules_path: Option<&Path>, with_defaults: bool) -> Result<CategoryRuleEngine> {
    let engine = if with_defaults {
        CategoryRuleEngine::with_default_rules()
    } else {
        CategoryRuleEngine::default()
    };

    if let Some(path) = rules_path {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file {}", path.display()))?;
        let custom = CategoryRuleEngine::from_toml(&content)
            .with_context(|| format!("Invalid rules file {}", path.display()))?;
        for rule in custom.rules() {
            engine.register_rule(rule)?;
        }
        info!(count = custom.len(), "Loaded custom rules");
    }

    Ok(engine)
}

pub fn load_known(path: &Path) -> Result<Vec<KnownTransaction>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read known transactions {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid known transactions file {}", path.display()))
}

pub fn load_config(path: Option<&Path>) -> Result<ImportConfig> {
    let Some(path) = path else {
        return Ok(ImportConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    ImportConfig::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
}

pub fn build_report(
    bytes: &[u8],
    account_id: AccountId,
    known: &[KnownTransaction],
    config: &ImportConfig,
    engine: &CategoryRuleEngine,
) -> Result<ImportReport> {
    let importer = Importer::new(config)?;
    let outcome = importer.run(bytes, account_id, known)?;

    let mut categories: Vec<Option<CategorizationResult>> = vec![None; outcome.candidates.len()];
    for (idx, result) in engine.apply_rules(&outcome.candidates) {
        categories[idx] = Some(result);
    }

    let transactions = outcome
        .candidates
        .into_iter()
        .zip(categories)
        .map(|(transaction, category)| CategorizedTransaction {
            transaction,
            category,
        })
        .collect();

    Ok(ImportReport {
        summary: outcome.summary,
        transactions,
    })
}

pub fn run_import(
    file: &Path,
    account_id: AccountId,
    known_path: Option<&Path>,
    config_path: Option<&Path>,
    engine: &CategoryRuleEngine,
) -> Result<serde_json::Value> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let known = match known_path {
        Some(path) => load_known(path)?,
        None => Vec::new(),
    };
    let config = load_config(config_path)?;
    let report = build_report(&bytes, account_id, &known, &config, engine)?;
    Ok(serde_json::to_value(report)?)
}
