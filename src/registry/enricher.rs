//! Enricher - adds sample queries and extra alias tokens to a built registry
//!
//! The NDJSON file is moved to a backup location, rewritten document by
//! document, and the SQLite indexes are extended with any new tokens. Running
//! it twice leaves the registry unchanged.

use crate::config::EnrichmentConfig;
use crate::ddl::SchemaMapping;
use crate::error::{RegistryError, Result};
use crate::registry::builder::normalize_token;
use crate::registry::document::{TableDocument, parse_document, write_document};
use crate::storage::{AliasEntry, ColumnEntry, Database};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Instant;

static KEY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(_id|_no|id|no)$").unwrap());

const BACKUP_FILE_NAME: &str = "registry.ndjson.bak";

fn alias_token(s: &str) -> String {
    normalize_token(s).trim_matches('_').to_string()
}

/// Sub-tokens of a column name with a trailing id/no suffix removed
pub fn split_column_tokens(column: &str) -> Vec<String> {
    KEY_SUFFIX
        .replace(column, "")
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(alias_token)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Natural-language query templates for a table
pub fn make_templates(table: &str, top_columns: &[String], detail_subject: &str) -> Vec<String> {
    let pk = top_columns.first().map(String::as_str).unwrap_or("id");
    let date = top_columns
        .iter()
        .find(|c| c.to_lowercase().contains("date"));

    let mut templates = vec![format!("Get {} by {}", table, pk)];
    match date {
        Some(date) => templates.push(format!(
            "List {} where {} between {{start_date}} and {{end_date}}",
            table, date
        )),
        None => templates.push(format!("List {} for insurer {{insurer_name}}", table)),
    }
    templates.push(format!("Show details for {} for {}", table, detail_subject));
    templates
}

/// Statistics of one enrichment run
#[derive(Debug, Clone)]
pub struct EnrichStats {
    /// Documents rewritten
    pub documents: usize,

    /// Documents that received generated sample queries
    pub templated: usize,

    /// Lines passed through unchanged because they could not be parsed
    pub malformed_lines: usize,

    pub new_alias_rows: usize,
    pub new_column_rows: usize,

    /// Where the previous NDJSON file was moved
    pub backup_path: PathBuf,

    /// Total processing time in seconds
    pub processing_time: f64,
}

/// Rewrites registry documents with templates and extra aliases
#[derive(Debug, Clone, Default)]
pub struct Enricher {
    config: EnrichmentConfig,
}

impl Enricher {
    pub fn new(config: EnrichmentConfig) -> Self {
        Self { config }
    }

    /// Apply the template and alias heuristics to one document in place.
    /// Returns whether sample queries were generated.
    pub fn enrich_document(&self, doc: &mut TableDocument) -> bool {
        let templated = doc.sample_queries.is_empty();
        if templated {
            doc.sample_queries =
                make_templates(&doc.table, &doc.top_columns, &self.config.detail_subject);
        }

        let mut aliases: BTreeSet<String> = doc.aliases.iter().cloned().collect();
        aliases.insert(alias_token(&doc.table));
        for part in doc.table.split('_') {
            aliases.insert(alias_token(part));
        }
        for column in &doc.top_columns {
            aliases.extend(split_column_tokens(column));
        }
        if doc
            .top_columns
            .iter()
            .any(|c| c.to_lowercase().contains("insur"))
        {
            aliases.insert("insurer".to_string());
            aliases.insert("insurance".to_string());
        }
        aliases.retain(|a| !a.is_empty());
        doc.aliases = aliases.into_iter().collect();

        templated
    }

    /// Location of the backup file; relative backup dirs resolve next to the NDJSON file
    pub fn backup_path(&self, ndjson_path: &Path) -> PathBuf {
        let backup_dir = Path::new(&self.config.backup_dir);
        let dir = if backup_dir.is_absolute() {
            backup_dir.to_path_buf()
        } else {
            ndjson_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(backup_dir)
        };
        dir.join(BACKUP_FILE_NAME)
    }

    /// Enrich the registry at `ndjson_path` / `sqlite_path`.
    ///
    /// `schema_path` is optional input: when it exists, full column lists are
    /// indexed; otherwise each document's top columns are used.
    pub fn enrich<P1, P2, P3>(
        &self,
        ndjson_path: P1,
        sqlite_path: P2,
        schema_path: P3,
    ) -> Result<EnrichStats>
    where
        P1: AsRef<Path>,
        P2: AsRef<Path>,
        P3: AsRef<Path>,
    {
        let start_time = Instant::now();
        let ndjson_path = ndjson_path.as_ref();
        let sqlite_path = sqlite_path.as_ref();
        let schema_path = schema_path.as_ref();

        let schema = if schema_path.exists() {
            SchemaMapping::from_json_file(schema_path)?
        } else {
            log::warn!(
                "Schema file {} not found, indexing top columns only",
                schema_path.display()
            );
            SchemaMapping::new()
        };

        if !ndjson_path.exists() {
            return Err(RegistryError::MissingFile(format!(
                "Registry file not found: {}",
                ndjson_path.display()
            )));
        }
        if !sqlite_path.exists() {
            return Err(RegistryError::MissingFile(format!(
                "Index database not found: {}",
                sqlite_path.display()
            )));
        }

        let backup_path = self.backup_path(ndjson_path);
        crate::utils::ensure_directory(backup_path.parent().unwrap_or_else(|| Path::new(".")))?;
        move_file(ndjson_path, &backup_path)?;
        log::info!("Backed up {} to {}", ndjson_path.display(), backup_path.display());

        let mut database = Database::new(sqlite_path)?;
        let reader = BufReader::new(File::open(&backup_path)?);
        let mut writer = BufWriter::new(File::create(ndjson_path)?);

        let mut stats = EnrichStats {
            documents: 0,
            templated: 0,
            malformed_lines: 0,
            new_alias_rows: 0,
            new_column_rows: 0,
            backup_path: backup_path.clone(),
            processing_time: 0.0,
        };

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let mut doc = match parse_document(&line) {
                Ok(doc) => doc,
                Err(e) => {
                    log::warn!("Keeping malformed registry line {} as-is: {}", line_no + 1, e);
                    writeln!(writer, "{}", line)?;
                    stats.malformed_lines += 1;
                    continue;
                }
            };

            if self.enrich_document(&mut doc) {
                stats.templated += 1;
            }
            write_document(&mut writer, &doc)?;
            stats.documents += 1;

            let aliases: Vec<AliasEntry> = doc
                .aliases
                .iter()
                .map(|token| AliasEntry {
                    token: token.clone(),
                    table: doc.table.clone(),
                })
                .collect();
            stats.new_alias_rows += database.insert_aliases(&aliases)?;

            let columns = schema.get(&doc.table).unwrap_or(&doc.top_columns);
            let mut column_entries = Vec::new();
            for column in columns {
                column_entries.extend(split_column_tokens(column).into_iter().map(|token| {
                    ColumnEntry {
                        token,
                        table: doc.table.clone(),
                        column: column.clone(),
                    }
                }));
            }
            stats.new_column_rows += database.insert_column_tokens(&column_entries)?;
        }

        writer.flush()?;
        database.set_metadata("enriched_at", &crate::utils::get_timestamp())?;
        stats.processing_time = start_time.elapsed().as_secs_f64();

        log::info!(
            "Enrichment complete: {} documents ({} templated), {} new alias rows, {} new column rows",
            stats.documents,
            stats.templated,
            stats.new_alias_rows,
            stats.new_column_rows
        );
        Ok(stats)
    }
}

/// Rename, falling back to copy + remove across filesystems
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to).map_err(|e| {
        RegistryError::Enrichment(format!(
            "Failed to back up {} to {}: {}",
            from.display(),
            to.display(),
            e
        ))
    })?;
    std::fs::remove_file(from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::extract_schema;
    use crate::registry::builder::RegistryBuilder;
    use crate::registry::document::read_documents;
    use tempfile::tempdir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_column_tokens() {
        assert_eq!(split_column_tokens("pol_policyid"), strings(&["pol", "policy"]));
        assert_eq!(split_column_tokens("user_id"), strings(&["user"]));
        assert_eq!(split_column_tokens("pol_policyno"), strings(&["pol", "policy"]));
        assert_eq!(split_column_tokens("CLM_DATE"), strings(&["clm", "date"]));
        assert_eq!(split_column_tokens("Order ID"), strings(&["order"]));
        assert!(split_column_tokens("id").is_empty());
    }

    #[test]
    fn test_templates_with_date() {
        let top = strings(&["clm_id", "clm_date"]);
        assert_eq!(
            make_templates("claims", &top, "ACME"),
            strings(&[
                "Get claims by clm_id",
                "List claims where clm_date between {start_date} and {end_date}",
                "Show details for claims for ACME",
            ])
        );
    }

    #[test]
    fn test_templates_without_columns() {
        let templates = make_templates("audit", &[], "ACME");
        assert_eq!(templates[0], "Get audit by id");
        assert_eq!(templates[1], "List audit for insurer {insurer_name}");
    }

    #[test]
    fn test_enrich_document_aliases() {
        let builder = RegistryBuilder::default();
        let mut doc = builder.document_for(
            "policy_master",
            &strings(&["pol_id", "pol_insurer_name", "pol_start_date"]),
        );
        let enricher = Enricher::default();

        assert!(enricher.enrich_document(&mut doc));
        assert_eq!(doc.sample_queries.len(), 3);
        for token in ["policy", "master", "policy_master", "pol", "insurer", "insurance", "start", "date"] {
            assert!(doc.aliases.contains(&token.to_string()), "missing {}", token);
        }
        let mut sorted = doc.aliases.clone();
        sorted.sort();
        assert_eq!(doc.aliases, sorted);

        // Existing sample queries are left alone
        let before = doc.clone();
        assert!(!enricher.enrich_document(&mut doc));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_enrich_missing_registry() {
        let dir = tempdir().unwrap();
        let result = Enricher::default().enrich(
            dir.path().join("registry.ndjson"),
            dir.path().join("registry.db"),
            dir.path().join("schema.json"),
        );
        assert!(matches!(result, Err(RegistryError::MissingFile(_))));
    }

    #[test]
    fn test_enrich_end_to_end_and_idempotent() {
        let dir = tempdir().unwrap();
        let schema = extract_schema(
            "CREATE TABLE claims (clm_id INT, clm_date DATE, clm_insurer_code TEXT, clm_remarks TEXT)",
        );
        let schema_path = dir.path().join("schema.json");
        schema.write_json_file(&schema_path).unwrap();
        let stats = RegistryBuilder::default().build(&schema, dir.path()).unwrap();

        // A malformed line must survive the rewrite
        let mut text = std::fs::read_to_string(&stats.ndjson_path).unwrap();
        text.push_str("{broken\n");
        std::fs::write(&stats.ndjson_path, text).unwrap();

        let enricher = Enricher::default();
        let first = enricher
            .enrich(&stats.ndjson_path, &stats.database_path, &schema_path)
            .unwrap();
        assert_eq!(first.documents, 1);
        assert_eq!(first.templated, 1);
        assert_eq!(first.malformed_lines, 1);
        assert!(first.backup_path.exists());
        assert!(first.new_alias_rows > 0);

        let batch = read_documents(&stats.ndjson_path).unwrap();
        assert_eq!(batch.skipped_lines, 1);
        let doc = &batch.documents[0];
        assert_eq!(doc.sample_queries[0], "Get claims by clm_id");
        assert!(doc.aliases.contains(&"insurer".to_string()));

        // Column tokens from the schema file are queryable
        let db = Database::new(&stats.database_path).unwrap();
        let hits = db.find_columns_by_token("remarks", 5).unwrap();
        assert_eq!(hits, vec![("claims".to_string(), "clm_remarks".to_string())]);
        drop(db);

        let second = enricher
            .enrich(&stats.ndjson_path, &stats.database_path, &schema_path)
            .unwrap();
        assert_eq!(second.templated, 0);
        assert_eq!(second.new_alias_rows, 0);
        assert_eq!(second.new_column_rows, 0);
        assert_eq!(read_documents(&stats.ndjson_path).unwrap().documents[0], *doc);
    }
}
