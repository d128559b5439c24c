//! TableRegistry - read-side access to registry artifacts
//!
//! Loads the NDJSON documents into memory and answers token lookups against
//! the SQLite inverted indexes. `TableSelector` turns a free-text query into a
//! short list of candidate tables for a downstream agent.

use crate::ddl::SchemaMapping;
use crate::error::{RegistryError, Result};
use crate::registry::document::{TableDocument, read_documents};
use crate::storage::Database;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Lowercase and replace spaces with underscores, matching stored tokens
pub fn normalize_query_token(token: &str) -> String {
    token.to_lowercase().replace(' ', "_")
}

/// In-memory view of a built registry
pub struct TableRegistry {
    tables: HashMap<String, TableDocument>,
    database: Database,
    schema: SchemaMapping,
    skipped_lines: usize,
}

impl TableRegistry {
    /// Open a registry; `schema_path` adds full column lists when given
    pub fn open<P1: AsRef<Path>, P2: AsRef<Path>>(
        ndjson_path: P1,
        db_path: P2,
        schema_path: Option<&Path>,
    ) -> Result<Self> {
        let ndjson_path = ndjson_path.as_ref();
        let db_path = db_path.as_ref();

        for path in [ndjson_path, db_path] {
            if !path.exists() {
                return Err(RegistryError::MissingFile(path.display().to_string()));
            }
        }

        let schema = match schema_path {
            Some(path) => SchemaMapping::from_json_file(path)?,
            None => SchemaMapping::new(),
        };

        let batch = read_documents(ndjson_path)?;
        let mut tables = HashMap::with_capacity(batch.documents.len());
        for doc in batch.documents {
            tables.insert(doc.table.clone(), doc);
        }

        let database = Database::open_read_only(db_path)?;

        log::info!(
            "TableRegistry loaded {} tables from {} ({} malformed lines skipped)",
            tables.len(),
            ndjson_path.display(),
            batch.skipped_lines
        );

        Ok(Self {
            tables,
            database,
            schema,
            skipped_lines: batch.skipped_lines,
        })
    }

    /// Number of loaded table documents
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get(&self, table: &str) -> Option<&TableDocument> {
        self.tables.get(table)
    }

    /// Loaded table names, sorted
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Full schema mapping, empty unless a schema file was given
    pub fn schema(&self) -> &SchemaMapping {
        &self.schema
    }

    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// Table documents whose aliases contain `token`
    pub fn find_tables_by_token(&self, token: &str, limit: usize) -> Result<Vec<&TableDocument>> {
        let normalized = normalize_query_token(token);
        let names = self.database.find_tables_by_token(&normalized, limit)?;
        Ok(names.iter().filter_map(|name| self.tables.get(name)).collect())
    }

    /// `(table, column)` pairs whose column tokens contain `token`
    pub fn find_columns_by_token(&self, token: &str, limit: usize) -> Result<Vec<(String, String)>> {
        let normalized = normalize_query_token(token);
        self.database.find_columns_by_token(&normalized, limit)
    }
}

/// Candidate table for a query
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableMatch {
    pub table: String,
    pub top_columns: Vec<String>,
    pub aliases: Vec<String>,
}

/// Candidate table with its full column list
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SchemaMatch {
    pub table: String,
    pub top_columns: Vec<String>,
    pub all_columns: Vec<String>,
    pub sample_queries: Vec<String>,
}

/// Picks candidate tables for a natural-language query
pub struct TableSelector<'a> {
    registry: &'a TableRegistry,
}

impl<'a> TableSelector<'a> {
    /// Tables looked up per query word
    pub const TABLES_PER_TOKEN: usize = 3;
    /// Maximum results of [`TableSelector::select`]
    pub const MAX_MATCHES: usize = 5;
    /// Maximum results of [`TableSelector::select_with_schema`]
    pub const MAX_SCHEMA_MATCHES: usize = 3;

    pub fn new(registry: &'a TableRegistry) -> Self {
        Self { registry }
    }

    /// Distinct tables matching any whitespace-separated word, first hit first
    fn matching_documents(&self, query: &str) -> Result<Vec<&'a TableDocument>> {
        let mut seen = HashSet::new();
        let mut documents = Vec::new();
        for token in query.to_lowercase().split_whitespace() {
            for doc in self
                .registry
                .find_tables_by_token(token, Self::TABLES_PER_TOKEN)?
            {
                if seen.insert(doc.table.as_str()) {
                    documents.push(doc);
                }
            }
        }
        Ok(documents)
    }

    pub fn select(&self, query: &str) -> Result<Vec<TableMatch>> {
        Ok(self
            .matching_documents(query)?
            .into_iter()
            .take(Self::MAX_MATCHES)
            .map(|doc| TableMatch {
                table: doc.table.clone(),
                top_columns: doc.top_columns.clone(),
                aliases: doc.aliases.clone(),
            })
            .collect())
    }

    pub fn select_with_schema(&self, query: &str) -> Result<Vec<SchemaMatch>> {
        let schema = self.registry.schema();
        Ok(self
            .matching_documents(query)?
            .into_iter()
            .take(Self::MAX_SCHEMA_MATCHES)
            .map(|doc| SchemaMatch {
                table: doc.table.clone(),
                top_columns: doc.top_columns.clone(),
                all_columns: schema.get(&doc.table).map(<[String]>::to_vec).unwrap_or_default(),
                sample_queries: doc.sample_queries.clone(),
            })
            .collect())
    }

    /// [`TableSelector::select`] rendered as pretty JSON
    pub fn select_json(&self, query: &str) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.select(query)?)?)
    }

    /// [`TableSelector::select_with_schema`] rendered as pretty JSON
    pub fn select_with_schema_json(&self, query: &str) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.select_with_schema(query)?)?)
    }
}
