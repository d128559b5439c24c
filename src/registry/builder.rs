//! RegistryBuilder - turns a schema mapping into registry artifacts
//!
//! For every table this derives a prioritized column subset, a short content
//! signature and alias tokens, writes one NDJSON document and fills the SQLite
//! alias and column indexes.

use crate::config::RegistryConfig;
use crate::ddl::SchemaMapping;
use crate::error::{RegistryError, Result};
use crate::registry::document::{TableDocument, write_documents};
use crate::storage::{AliasEntry, ColumnEntry, Database};
use serde_json::Map;
use sha2::{Digest, Sha256};
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Lowercase `s` and replace every character outside `[0-9a-z]` with `_`
pub fn normalize_token(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '_' })
        .collect()
}

fn is_id_like(column: &str) -> bool {
    column.to_lowercase().ends_with("id")
}

/// Priority key: id-like, date-like, name-like, status-like
fn column_priority(column: &str) -> (bool, bool, bool, bool) {
    let lower = column.to_lowercase();
    (
        is_id_like(column),
        lower.contains("date"),
        lower.contains("name"),
        lower.contains("status"),
    )
}

/// Pick up to `n` columns, id-like first, then date-, name- and status-like.
/// Ties keep declaration order.
pub fn pick_top_columns(columns: &[String], n: usize) -> Vec<String> {
    let mut sorted: Vec<&String> = columns.iter().collect();
    sorted.sort_by_key(|c| Reverse(column_priority(c)));
    sorted.into_iter().take(n).cloned().collect()
}

/// First 8 hex digits of SHA-256 over `table|col1,col2,...`
pub fn signature(table: &str, top_columns: &[String]) -> String {
    let base = format!("{}|{}", table, top_columns.join(","));
    let digest = Sha256::digest(base.as_bytes());
    digest.iter().take(4).map(|b| format!("{:02x}", b)).collect()
}

/// Alias tokens for a table: the whole normalized name plus each `_` part
pub fn derive_aliases(table: &str) -> Vec<String> {
    let mut aliases = BTreeSet::new();
    aliases.insert(normalize_token(table));
    for part in table.split('_') {
        aliases.insert(normalize_token(part));
    }
    aliases.retain(|a| !a.is_empty());
    aliases.into_iter().collect()
}

/// Distinct index tokens of a column name
pub fn column_tokens(column: &str) -> Vec<String> {
    normalize_token(column)
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Statistics of one build run
#[derive(Debug, Clone)]
pub struct BuildStats {
    /// Number of table documents written
    pub tables: usize,

    /// Alias index rows newly inserted
    pub alias_rows: usize,

    /// Column index rows newly inserted
    pub column_rows: usize,

    pub ndjson_path: PathBuf,
    pub database_path: PathBuf,

    /// Total processing time in seconds
    pub processing_time: f64,
}

/// Builds `registry.ndjson` and `registry.db` from a schema mapping
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    config: RegistryConfig,
}

impl RegistryBuilder {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Derive the document for one table
    pub fn document_for(&self, table: &str, columns: &[String]) -> TableDocument {
        let top_columns = pick_top_columns(columns, self.config.top_columns);
        let sig = signature(table, &top_columns);
        TableDocument {
            table: table.to_string(),
            sig: format!("tbl:{}|h:{}", table, sig),
            top_columns,
            aliases: derive_aliases(table),
            sample_queries: Vec::new(),
            neighbors: Vec::new(),
            sensitivity: self.config.sensitivity.clone(),
            extra: Map::new(),
        }
    }

    /// Documents for every table, in schema order
    pub fn build_documents(&self, schema: &SchemaMapping) -> Vec<TableDocument> {
        schema
            .iter()
            .map(|(table, columns)| self.document_for(table, columns))
            .collect()
    }

    /// Write both artifacts into `out_dir` using the configured file names
    pub fn build<P: AsRef<Path>>(&self, schema: &SchemaMapping, out_dir: P) -> Result<BuildStats> {
        let out_dir = out_dir.as_ref();
        crate::utils::ensure_directory(out_dir)?;
        self.build_into(
            schema,
            out_dir.join(&self.config.ndjson_file),
            out_dir.join(&self.config.database_file),
        )
    }

    /// Write the NDJSON documents to `ndjson_path` and index rows into `database_path`
    pub fn build_into<P1: AsRef<Path>, P2: AsRef<Path>>(
        &self,
        schema: &SchemaMapping,
        ndjson_path: P1,
        database_path: P2,
    ) -> Result<BuildStats> {
        let start_time = Instant::now();
        let ndjson_path = ndjson_path.as_ref();
        let database_path = database_path.as_ref();

        log::info!(
            "Building registry for {} tables into {}",
            schema.len(),
            ndjson_path.display()
        );

        let documents = self.build_documents(schema);
        write_documents(ndjson_path, &documents).map_err(|e| {
            RegistryError::Registry(format!("Failed to write {}: {}", ndjson_path.display(), e))
        })?;

        let mut aliases = Vec::new();
        for doc in &documents {
            aliases.extend(doc.aliases.iter().map(|token| AliasEntry {
                token: token.clone(),
                table: doc.table.clone(),
            }));
        }

        let mut column_entries = Vec::new();
        for (table, columns) in schema.iter() {
            for column in columns {
                column_entries.extend(column_tokens(column).into_iter().map(|token| ColumnEntry {
                    token,
                    table: table.to_string(),
                    column: column.clone(),
                }));
            }
        }

        let mut database = Database::new(database_path)?;
        let alias_rows = database.insert_aliases(&aliases)?;
        let column_rows = database.insert_column_tokens(&column_entries)?;
        database.set_metadata("built_at", &crate::utils::get_timestamp())?;
        database.set_metadata("table_count", &documents.len().to_string())?;

        let stats = BuildStats {
            tables: documents.len(),
            alias_rows,
            column_rows,
            ndjson_path: ndjson_path.to_path_buf(),
            database_path: database_path.to_path_buf(),
            processing_time: start_time.elapsed().as_secs_f64(),
        };

        log::info!(
            "Registry built: {} tables, {} alias rows, {} column rows in {:.2}s",
            stats.tables,
            stats.alias_rows,
            stats.column_rows,
            stats.processing_time
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::extract_schema;
    use crate::registry::document::read_documents;
    use tempfile::tempdir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token("Policy Docs"), "policy_docs");
        assert_eq!(normalize_token("pol-no.1"), "pol_no_1");
        assert_eq!(normalize_token("Größe"), "gr__e");
    }

    #[test]
    fn test_pick_top_columns_priority() {
        let cols = strings(&["remarks", "status", "cust_name", "start_date", "amount", "policy_id"]);
        assert_eq!(
            pick_top_columns(&cols, 4),
            strings(&["policy_id", "start_date", "cust_name", "status"])
        );
    }

    #[test]
    fn test_pick_top_columns_stable_ties() {
        let cols = strings(&["b", "a", "c_id", "d_id", "e"]);
        assert_eq!(pick_top_columns(&cols, 10), strings(&["c_id", "d_id", "b", "a", "e"]));
        assert_eq!(pick_top_columns(&cols, 1), strings(&["c_id"]));
        assert!(pick_top_columns(&[], 4).is_empty());
    }

    #[test]
    fn test_id_like_is_case_insensitive() {
        let cols = strings(&["Total", "OrderId"]);
        assert_eq!(pick_top_columns(&cols, 1), strings(&["OrderId"]));
    }

    #[test]
    fn test_signature_is_short_and_stable() {
        let top = strings(&["id", "name"]);
        let a = signature("users", &top);
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, signature("users", &top));
        assert_ne!(a, signature("users", &strings(&["id"])));
    }

    #[test]
    fn test_derive_aliases() {
        assert_eq!(
            derive_aliases("Policy_Claims"),
            strings(&["claims", "policy", "policy_claims"])
        );
        assert_eq!(derive_aliases("a__b"), strings(&["a", "a__b", "b"]));
    }

    #[test]
    fn test_column_tokens() {
        assert_eq!(column_tokens("pol_start_date"), strings(&["date", "pol", "start"]));
        assert_eq!(column_tokens("_x__y_"), strings(&["x", "y"]));
        assert_eq!(column_tokens("Order Id"), strings(&["id", "order"]));
    }

    #[test]
    fn test_document_for() {
        let builder = RegistryBuilder::default();
        let doc = builder.document_for("claims", &strings(&["clm_amount", "clm_id", "clm_date"]));
        assert_eq!(doc.top_columns, strings(&["clm_id", "clm_date", "clm_amount"]));
        assert!(doc.sig.starts_with("tbl:claims|h:"));
        assert!(doc.sample_queries.is_empty());
        assert_eq!(doc.sensitivity, "low");
    }

    #[test]
    fn test_build_writes_artifacts() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let schema = extract_schema(
            "CREATE TABLE policy_master (pol_id INT, pol_holder_name TEXT);
             CREATE TABLE claims (clm_id INT, pol_id INT, clm_date DATE);",
        );

        let stats = RegistryBuilder::default().build(&schema, &out).unwrap();
        assert_eq!(stats.tables, 2);
        assert!(stats.ndjson_path.exists());
        assert!(stats.database_path.exists());

        let docs = read_documents(&stats.ndjson_path).unwrap().documents;
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].table, "policy_master");

        let db = Database::new(&stats.database_path).unwrap();
        assert_eq!(db.find_tables_by_token("policy", 5).unwrap(), vec!["policy_master"]);
        let pol_hits = db.find_columns_by_token("pol", 10).unwrap();
        assert!(pol_hits.contains(&("claims".to_string(), "pol_id".to_string())));
        assert!(db.get_metadata("built_at").unwrap().is_some());

        // Rebuilding does not duplicate index rows
        let again = RegistryBuilder::default().build(&schema, &out).unwrap();
        assert_eq!(again.alias_rows, 0);
        assert_eq!(again.column_rows, 0);
    }
}
