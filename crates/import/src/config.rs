use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::date::{DateParser, DatePrecedence};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse import config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Delimiter must be a single ASCII character, got '{0}'")]
    InvalidDelimiter(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub delimiter: String,
    pub date_precedence: DatePrecedence,
    /// Also treat repeats inside one upload as duplicates.
    pub dedupe_within_batch: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            date_precedence: DatePrecedence::UsFirst,
            dedupe_within_batch: false,
        }
    }
}

impl ImportConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: ImportConfig = toml::from_str(toml_content)?;
        config.delimiter_byte()?;
        Ok(config)
    }

    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(ConfigError::InvalidDelimiter(self.delimiter.clone())),
        }
    }

    pub fn date_parser(&self) -> DateParser {
        DateParser::new(self.date_precedence)
    }
}
