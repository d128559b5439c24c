//! Configuration for extraction, registry building and enrichment
//!
//! All settings are plain values handed to each component explicitly; nothing
//! here is cached process-wide.

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub extraction: ExtractionConfig,
    pub registry: RegistryConfig,
    pub enrichment: EnrichmentConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            RegistryError::Config(format!("Invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject settings that would make the pipeline produce nothing useful
    pub fn validate(&self) -> Result<()> {
        if self.registry.top_columns == 0 {
            return Err(RegistryError::Config(
                "registry.top_columns must be at least 1".to_string(),
            ));
        }
        if self.extraction.max_input_bytes == Some(0) {
            return Err(RegistryError::Config(
                "extraction.max_input_bytes must be positive when set".to_string(),
            ));
        }
        for (key, name) in [
            ("registry.schema_file", &self.registry.schema_file),
            ("registry.ndjson_file", &self.registry.ndjson_file),
            ("registry.database_file", &self.registry.database_file),
        ] {
            if name.trim().is_empty() {
                return Err(RegistryError::Config(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }
}

/// How repeated `CREATE TABLE` statements for one normalized name are resolved
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateTablePolicy {
    /// The later statement's columns replace the earlier ones
    #[default]
    LastWriteWins,
    /// The first statement is kept, later ones are ignored
    FirstWriteWins,
    /// Columns of later statements are appended, first occurrence wins
    Merge,
}

/// DDL extraction settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Reject inputs larger than this many bytes before scanning
    pub max_input_bytes: Option<usize>,

    /// Conflict policy for duplicate table names
    pub duplicate_policy: DuplicateTablePolicy,
}

/// Registry artifact settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Number of prioritized columns stored per table document
    pub top_columns: usize,

    /// File name of the extracted schema inside the output directory
    pub schema_file: String,

    /// File name of the line-delimited table documents
    pub ndjson_file: String,

    /// File name of the SQLite inverted index
    pub database_file: String,

    /// Sensitivity label written on new documents
    pub sensitivity: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            top_columns: 4,
            schema_file: "schema.json".to_string(),
            ndjson_file: "registry.ndjson".to_string(),
            database_file: "registry.db".to_string(),
            sensitivity: "low".to_string(),
        }
    }
}

/// Enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Directory receiving `registry.ndjson.bak`
    pub backup_dir: String,

    /// Subject used in the fixed detail-lookup template
    pub detail_subject: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            backup_dir: "backup".to_string(),
            detail_subject: "Hindustan Petroleum".to_string(),
        }
    }
}
