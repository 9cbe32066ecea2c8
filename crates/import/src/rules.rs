use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tally_core::{TransactionCandidate, TransactionType};
use thiserror::Error;
use tracing::info;

use crate::defaults::default_rules;

/// Priority given to rules created through [`CategorizationRule::custom`].
pub const CUSTOM_RULE_PRIORITY: i32 = 5;

fn default_priority() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorizationRule {
    pub name: String,
    pub category: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub amount_min: Option<Decimal>,
    #[serde(default)]
    pub amount_max: Option<Decimal>,
    #[serde(default)]
    pub transaction_type: Option<TransactionType>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Static confidence reported on a match. Derived from `priority` when unset.
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl CategorizationRule {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        category: impl Into<String>,
        keywords: impl IntoIterator<Item = S>,
        priority: i32,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            amount_min: None,
            amount_max: None,
            transaction_type: None,
            priority,
            confidence: None,
        }
    }

    /// A user-defined rule; outranks every built-in rule by default.
    pub fn custom<S: Into<String>>(
        name: impl Into<String>,
        category: impl Into<String>,
        keywords: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(name, category, keywords, CUSTOM_RULE_PRIORITY)
    }

    pub fn for_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    pub fn with_amount_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.amount_min = min;
        self.amount_max = max;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Explicit confidence, or `priority * 0.2` kept within `[0.2, 0.8]`.
    pub fn effective_confidence(&self) -> f32 {
        self.confidence
            .unwrap_or_else(|| self.priority.clamp(1, 4) as f32 * 0.2)
    }
}

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Rule '{0}' has no keywords")]
    NoKeywords(String),
    #[error("Rule '{0}' has no target category")]
    EmptyCategory(String),
    #[error("Rule '{name}' has amount_min {min} greater than amount_max {max}")]
    InvalidAmountRange { name: String, min: Decimal, max: Decimal },
    #[error("Rule '{name}' has confidence {confidence}, expected a value in (0, 1]")]
    InvalidConfidence { name: String, confidence: f32 },
    #[error("Failed to parse rules TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizationResult {
    pub category: String,
    pub confidence: f32,
    pub rule_name: String,
}

/// Consulted when no rule matches. The ML categorizer sits behind this.
pub trait CategoryScorer {
    fn score(
        &self,
        description: &str,
        amount: Decimal,
        transaction_type: TransactionType,
    ) -> Option<CategorizationResult>;
}

/// A validated rule with its keywords case-folded once up front.
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: CategorizationRule,
    keywords: Vec<String>,
    confidence: f32,
}

impl CompiledRule {
    fn compile(rule: CategorizationRule) -> Result<Self, RuleError> {
        if rule.category.trim().is_empty() {
            return Err(RuleError::EmptyCategory(rule.name));
        }
        let keywords: Vec<String> = rule
            .keywords
            .iter()
            .map(|k| k.to_lowercase())
            .filter(|k| !k.trim().is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(RuleError::NoKeywords(rule.name));
        }
        if let (Some(min), Some(max)) = (rule.amount_min, rule.amount_max) {
            if min > max {
                return Err(RuleError::InvalidAmountRange { name: rule.name, min, max });
            }
        }
        let confidence = rule.effective_confidence();
        if !(confidence > 0.0 && confidence <= 1.0) {
            return Err(RuleError::InvalidConfidence { name: rule.name, confidence });
        }
        Ok(Self { rule, keywords, confidence })
    }

    fn matches(
        &self,
        description: &str,
        amount: Decimal,
        transaction_type: TransactionType,
    ) -> bool {
        let rule = &self.rule;

        if rule.transaction_type.is_some_and(|t| t != transaction_type) {
            return false;
        }

        // Optional amount range filter, both ends inclusive.
        if rule.amount_min.is_some_and(|min| amount < min) {
            return false;
        }
        if rule.amount_max.is_some_and(|max| amount > max) {
            return false;
        }

        self.keywords.iter().any(|k| description.contains(k.as_str()))
    }

    fn result(&self) -> CategorizationResult {
        CategorizationResult {
            category: self.rule.category.clone(),
            confidence: self.confidence,
            rule_name: self.rule.name.clone(),
        }
    }
}

#[derive(Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<CategorizationRule>,
}

/// Priority-ordered rule set.
///
/// Readers take a cheap `Arc` clone of the current snapshot and match against
/// it without holding the lock; registration builds a new snapshot and swaps
/// it in under the write lock.
#[derive(Debug)]
pub struct CategoryRuleEngine {
    rules: RwLock<Arc<Vec<CompiledRule>>>,
}

impl Default for CategoryRuleEngine {
    fn default() -> Self {
        Self {
            rules: RwLock::new(Arc::new(Vec::new())),
        }
    }
}

impl CategoryRuleEngine {
    pub fn new(rules: Vec<CategorizationRule>) -> Result<Self, RuleError> {
        let mut compiled = rules
            .into_iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        // Highest priority first; the sort is stable so ties keep declaration order.
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Ok(Self {
            rules: RwLock::new(Arc::new(compiled)),
        })
    }

    pub fn with_default_rules() -> Self {
        // built-in table is validated by tests
        Self::new(default_rules()).expect("built-in rules are valid")
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(toml_content)?;
        Self::new(file.rules)
    }

    fn snapshot(&self) -> Arc<Vec<CompiledRule>> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Adds a rule after every existing rule of equal or higher priority.
    pub fn register_rule(&self, rule: CategorizationRule) -> Result<(), RuleError> {
        let compiled = CompiledRule::compile(rule)?;
        let mut guard = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let mut next: Vec<CompiledRule> = (**guard).clone();
        let at = next.partition_point(|r| r.rule.priority >= compiled.rule.priority);
        info!(
            rule = %compiled.rule.name,
            priority = compiled.rule.priority,
            position = at,
            "Registered categorization rule"
        );
        next.insert(at, compiled);
        *guard = Arc::new(next);
        Ok(())
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> Vec<CategorizationRule> {
        self.snapshot().iter().map(|r| r.rule.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// First rule in priority order that matches; no search for a better one.
    pub fn categorize(
        &self,
        description: &str,
        amount: Decimal,
        transaction_type: TransactionType,
    ) -> Option<CategorizationResult> {
        let folded = description.to_lowercase();
        let rules = self.snapshot();
        rules
            .iter()
            .find(|r| r.matches(&folded, amount, transaction_type))
            .map(CompiledRule::result)
    }

    pub fn categorize_or_else(
        &self,
        description: &str,
        amount: Decimal,
        transaction_type: TransactionType,
        fallback: &dyn CategoryScorer,
    ) -> Option<CategorizationResult> {
        self.categorize(description, amount, transaction_type)
            .or_else(|| fallback.score(description, amount, transaction_type))
    }

    /// Returns indices + results for every matched candidate, in order.
    pub fn apply_rules(
        &self,
        candidates: &[TransactionCandidate],
    ) -> Vec<(usize, CategorizationResult)> {
        let rules = self.snapshot();
        candidates
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| {
                let folded = c.description.to_lowercase();
                rules
                    .iter()
                    .find(|r| r.matches(&folded, c.amount, c.transaction_type))
                    .map(|r| (idx, r.result()))
            })
            .collect()
    }
}
