//! Table documents and their line-delimited JSON file format

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Registry entry for one table, stored as one NDJSON line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableDocument {
    /// Normalized table name
    pub table: String,

    /// `tbl:{table}|h:{hash}` signature over the table name and top columns
    #[serde(default)]
    pub sig: String,

    /// Prioritized subset of the table's columns
    #[serde(default)]
    pub top_columns: Vec<String>,

    /// Normalized lookup tokens
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Natural-language query templates
    #[serde(default)]
    pub sample_queries: Vec<String>,

    #[serde(default)]
    pub neighbors: Vec<Value>,

    #[serde(default = "default_sensitivity")]
    pub sensitivity: String,

    /// Fields written by other tools, kept on rewrite
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_sensitivity() -> String {
    "low".to_string()
}

/// Result of reading an NDJSON file
#[derive(Debug, Clone, Default)]
pub struct DocumentBatch {
    pub documents: Vec<TableDocument>,

    /// Non-blank lines that could not be parsed
    pub skipped_lines: usize,
}

/// Parse a single NDJSON line
pub fn parse_document(line: &str) -> Result<TableDocument> {
    Ok(serde_json::from_str(line)?)
}

/// Read all documents from `path`, skipping blank and malformed lines
pub fn read_documents<P: AsRef<Path>>(path: P) -> Result<DocumentBatch> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut batch = DocumentBatch::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_document(&line) {
            Ok(doc) => batch.documents.push(doc),
            Err(e) => {
                log::warn!(
                    "Skipping malformed registry line {} in {}: {}",
                    line_no + 1,
                    path.display(),
                    e
                );
                batch.skipped_lines += 1;
            }
        }
    }

    Ok(batch)
}

/// Write `documents` to `path`, one compact JSON object per line
pub fn write_documents<P: AsRef<Path>>(path: P, documents: &[TableDocument]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for doc in documents {
        write_document(&mut writer, doc)?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn write_document<W: Write>(writer: &mut W, doc: &TableDocument) -> Result<()> {
    serde_json::to_writer(&mut *writer, doc)?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_minimal_line_uses_defaults() {
        let doc = parse_document(r#"{"table": "claims"}"#).unwrap();
        assert_eq!(doc.table, "claims");
        assert!(doc.top_columns.is_empty());
        assert_eq!(doc.sensitivity, "low");
    }

    #[test]
    fn test_unknown_fields_survive_rewrite() {
        let line = r#"{"table":"claims","sig":"s","owner":"finance","tags":["x"]}"#;
        let doc = parse_document(line).unwrap();
        assert_eq!(doc.extra.get("owner"), Some(&Value::from("finance")));

        let rewritten = serde_json::to_string(&doc).unwrap();
        assert!(rewritten.contains(r#""owner":"finance""#));
        assert!(rewritten.contains(r#""tags":["x"]"#));
    }

    #[test]
    fn test_read_skips_malformed_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.ndjson");
        std::fs::write(
            &path,
            "{\"table\":\"a\"}\nnot json\n\n{\"table\":\"b\",\"aliases\":[\"b\"]}\n{\"no_table\":1}\n",
        )
        .unwrap();

        let batch = read_documents(&path).unwrap();
        let tables: Vec<_> = batch.documents.iter().map(|d| d.table.as_str()).collect();
        assert_eq!(tables, vec!["a", "b"]);
        assert_eq!(batch.skipped_lines, 2);
    }

    #[test]
    fn test_write_one_line_per_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.ndjson");
        let docs = vec![
            parse_document(r#"{"table":"übersicht"}"#).unwrap(),
            parse_document(r#"{"table":"b"}"#).unwrap(),
        ];
        write_documents(&path, &docs).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("übersicht"));
        assert_eq!(read_documents(&path).unwrap().documents, docs);
    }
}
