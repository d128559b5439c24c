//! Schema extraction
//!
//! Combines the block scanner, identifier normalizer, comma splitter and
//! column parser into a table -> ordered column list mapping. Extraction never
//! fails on malformed SQL; ill-formed blocks are skipped.

use super::column::parse_column_name;
use super::identifier::normalize_identifier;
use super::scanner::find_create_table_blocks;
use super::splitter::split_top_level_commas;
use crate::config::{DuplicateTablePolicy, ExtractionConfig};
use crate::error::{RegistryError, Result};
use rayon::prelude::*;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// Ordered mapping of table name to its de-duplicated, declaration-ordered columns.
///
/// Iteration order is insertion order. Replacing an existing table keeps its
/// original position. Serializes as a single JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMapping {
    entries: Vec<(String, Vec<String>)>,
    positions: HashMap<String, usize>,
}

impl SchemaMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Columns of `table`, if present
    pub fn get(&self, table: &str) -> Option<&[String]> {
        self.positions
            .get(table)
            .map(|&idx| self.entries[idx].1.as_slice())
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.positions.contains_key(table)
    }

    /// Table names in insertion order
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(table, _)| table.as_str())
    }

    /// `(table, columns)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(table, columns)| (table.as_str(), columns.as_slice()))
    }

    /// Total number of columns across all tables
    pub fn column_count(&self) -> usize {
        self.entries.iter().map(|(_, columns)| columns.len()).sum()
    }

    /// Insert or replace a table. Returns the previous column list, if any.
    pub fn insert(&mut self, table: String, columns: Vec<String>) -> Option<Vec<String>> {
        match self.positions.get(&table) {
            Some(&idx) => Some(std::mem::replace(&mut self.entries[idx].1, columns)),
            None => {
                self.positions.insert(table.clone(), self.entries.len());
                self.entries.push((table, columns));
                None
            }
        }
    }

    /// Add a table according to `policy`. Empty column lists are ignored.
    pub fn apply(&mut self, table: String, columns: Vec<String>, policy: DuplicateTablePolicy) {
        if columns.is_empty() {
            return;
        }

        let Some(&idx) = self.positions.get(&table) else {
            self.insert(table, columns);
            return;
        };

        match policy {
            DuplicateTablePolicy::LastWriteWins => {
                log::debug!("Table '{}' redefined, keeping the later definition", table);
                self.entries[idx].1 = columns;
            }
            DuplicateTablePolicy::FirstWriteWins => {
                log::debug!("Table '{}' redefined, keeping the first definition", table);
            }
            DuplicateTablePolicy::Merge => {
                let existing = &mut self.entries[idx].1;
                for column in columns {
                    if !existing.contains(&column) {
                        existing.push(column);
                    }
                }
            }
        }
    }

    /// Fold `other` into `self` table by table, in `other`'s order
    pub fn merge(&mut self, other: SchemaMapping, policy: DuplicateTablePolicy) {
        for (table, columns) in other.entries {
            self.apply(table, columns, policy);
        }
    }

    /// Load a mapping from a `{table: [columns...]}` JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the mapping as a pretty-printed JSON object
    pub fn write_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Serialize for SchemaMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (table, columns) in &self.entries {
            map.serialize_entry(table, columns)?;
        }
        map.end()
    }
}

struct SchemaMappingVisitor;

impl<'de> Visitor<'de> for SchemaMappingVisitor {
    type Value = SchemaMapping;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object mapping table names to column name arrays")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut mapping = SchemaMapping::new();
        while let Some((table, columns)) = access.next_entry::<String, Vec<String>>()? {
            mapping.insert(table, columns);
        }
        Ok(mapping)
    }
}

impl<'de> Deserialize<'de> for SchemaMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(SchemaMappingVisitor)
    }
}

/// Extract a schema mapping from SQL text with last-write-wins for duplicate tables.
///
/// ```
/// use ddl_registry::ddl::extract_schema;
///
/// let schema = extract_schema("CREATE TABLE [dbo].[Orders] ([OrderId] INT, [Total] MONEY)");
/// assert_eq!(schema.get("Orders").unwrap(), ["OrderId", "Total"]);
/// ```
pub fn extract_schema(sql: &str) -> SchemaMapping {
    extract_with_policy(sql, DuplicateTablePolicy::LastWriteWins)
}

fn extract_with_policy(sql: &str, policy: DuplicateTablePolicy) -> SchemaMapping {
    let mut mapping = SchemaMapping::new();

    for block in find_create_table_blocks(sql) {
        let table = normalize_identifier(block.raw_table);
        let mut seen = HashSet::new();
        let mut columns: Vec<String> = Vec::new();
        for segment in split_top_level_commas(block.body) {
            let column = parse_column_name(segment);
            if !column.is_empty() && seen.insert(column.clone()) {
                columns.push(column);
            }
        }

        if columns.is_empty() {
            log::debug!("Table '{}' yielded no columns, omitted", table);
            continue;
        }
        mapping.apply(table, columns, policy);
    }

    mapping
}

/// Configured extractor: applies the input budget and duplicate-table policy
#[derive(Debug, Clone, Default)]
pub struct SchemaExtractor {
    config: ExtractionConfig,
}

impl SchemaExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extract from in-memory SQL. Infallible; the input budget is not checked.
    pub fn extract(&self, sql: &str) -> SchemaMapping {
        extract_with_policy(sql, self.config.duplicate_policy)
    }

    /// Extract after checking the input budget
    pub fn extract_checked(&self, sql: &str) -> Result<SchemaMapping> {
        self.check_budget(sql.len())?;
        Ok(self.extract(sql))
    }

    /// Read a SQL dump (undecodable bytes replaced) and extract it
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<SchemaMapping> {
        let path = path.as_ref();
        let sql = crate::utils::read_text_lossy(path)?;
        let mapping = self.extract_checked(&sql).map_err(|e| match e {
            RegistryError::Extraction(msg) => {
                RegistryError::Extraction(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        log::info!(
            "Extracted {} tables ({} columns) from {}",
            mapping.len(),
            mapping.column_count(),
            path.display()
        );
        Ok(mapping)
    }

    /// Extract several dumps in parallel and merge them in argument order
    pub fn extract_files<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Result<SchemaMapping> {
        let mappings = paths
            .par_iter()
            .map(|path| self.extract_file(path))
            .collect::<Result<Vec<_>>>()?;

        let mut merged = SchemaMapping::new();
        for mapping in mappings {
            merged.merge(mapping, self.config.duplicate_policy);
        }
        Ok(merged)
    }

    fn check_budget(&self, len: usize) -> Result<()> {
        match self.config.max_input_bytes {
            Some(limit) if len > limit => Err(RegistryError::Extraction(format!(
                "input is {} bytes, exceeding the {} byte limit",
                len, limit
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::UNKNOWN_TABLE_SENTINEL;
    use tempfile::tempdir;

    fn cols(mapping: &SchemaMapping, table: &str) -> Vec<String> {
        mapping.get(table).map(|c| c.to_vec()).unwrap_or_default()
    }

    #[test]
    fn test_declaration_order_and_dedup() {
        let schema = extract_schema("CREATE TABLE t (c1 INT, c2 TEXT, c1 INT, c3 DATE)");
        assert_eq!(cols(&schema, "t"), vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn test_wide_table_with_repeated_columns() {
        let defs: Vec<String> = (0..20_000).map(|i| format!("c{} INT", i % 5_000)).collect();
        let sql = format!("CREATE TABLE wide ({})", defs.join(", "));

        let start = std::time::Instant::now();
        let schema = extract_schema(&sql);
        assert!(start.elapsed() < std::time::Duration::from_secs(2));

        let columns = cols(&schema, "wide");
        assert_eq!(columns.len(), 5_000);
        assert_eq!(columns[0], "c0");
        assert_eq!(columns[4_999], "c4999");
    }

    #[test]
    fn test_nested_check_excluded() {
        let schema = extract_schema("CREATE TABLE t (a INT, CHECK (a > 0 AND (b < 10)))");
        assert_eq!(cols(&schema, "t"), vec!["a"]);
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_quoted_comma() {
        let schema = extract_schema("CREATE TABLE t (a VARCHAR(10) DEFAULT 'x,y')");
        assert_eq!(cols(&schema, "t"), vec!["a"]);
    }

    #[test]
    fn test_qualified_and_plain_names_match() {
        let a = extract_schema("CREATE TABLE [dbo].[Orders] ([OrderId] INT)");
        let b = extract_schema("CREATE TABLE Orders (OrderId INT)");
        assert_eq!(a, b);
        assert_eq!(a.table_names().collect::<Vec<_>>(), vec!["Orders"]);
    }

    #[test]
    fn test_truncated_dump() {
        let sql = "CREATE TABLE a (x INT);\nCREATE TABLE b (y INT, z VARCHAR(";
        let schema = extract_schema(sql);
        assert_eq!(schema.len(), 1);
        assert_eq!(cols(&schema, "a"), vec!["x"]);
    }

    #[test]
    fn test_constraint_only_table_omitted() {
        let schema = extract_schema("CREATE TABLE t (PRIMARY KEY (a)); CREATE TABLE u (b INT)");
        assert!(!schema.contains_table("t"));
        assert!(schema.contains_table("u"));
    }

    #[test]
    fn test_last_write_wins_keeps_position() {
        let sql = "CREATE TABLE t (a INT); CREATE TABLE u (x INT); CREATE TABLE t (b INT, c INT)";
        let schema = extract_schema(sql);
        assert_eq!(cols(&schema, "t"), vec!["b", "c"]);
        assert_eq!(schema.table_names().collect::<Vec<_>>(), vec!["t", "u"]);
    }

    #[test]
    fn test_other_policies() {
        let sql = "CREATE TABLE t (a INT, b INT); CREATE TABLE t (b INT, c INT)";

        let first = SchemaExtractor::new(ExtractionConfig {
            duplicate_policy: DuplicateTablePolicy::FirstWriteWins,
            ..Default::default()
        });
        assert_eq!(cols(&first.extract(sql), "t"), vec!["a", "b"]);

        let merge = SchemaExtractor::new(ExtractionConfig {
            duplicate_policy: DuplicateTablePolicy::Merge,
            ..Default::default()
        });
        assert_eq!(cols(&merge.extract(sql), "t"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sentinel_table() {
        let schema = extract_schema("CREATE TABLE (a INT)");
        assert_eq!(cols(&schema, UNKNOWN_TABLE_SENTINEL), vec!["a"]);
    }

    #[test]
    fn test_mssql_dump() {
        let sql = r#"
SET ANSI_NULLS ON
GO
CREATE TABLE [dbo].[policies](
	[pol_policyid] [int] IDENTITY(1,1) NOT NULL,
	[pol_policyno] [varchar](50) NULL,
	[pol_startdate] [datetime] NULL,
	[pol_insurer_name] [nvarchar](200) NULL,
	[pol_status] [char](1) DEFAULT ('A'),
 CONSTRAINT [PK_policies] PRIMARY KEY CLUSTERED
(
	[pol_policyid] ASC
)WITH (PAD_INDEX = OFF, STATISTICS_NORECOMPUTE = OFF) ON [PRIMARY]
) ON [PRIMARY]
GO
"#;
        let schema = extract_schema(sql);
        assert_eq!(
            cols(&schema, "policies"),
            vec![
                "pol_policyid",
                "pol_policyno",
                "pol_startdate",
                "pol_insurer_name",
                "pol_status"
            ]
        );
    }

    #[test]
    fn test_budget() {
        let extractor = SchemaExtractor::new(ExtractionConfig {
            max_input_bytes: Some(10),
            ..Default::default()
        });
        let result = extractor.extract_checked("CREATE TABLE t (a INT)");
        assert!(matches!(result, Err(RegistryError::Extraction(_))));
        assert_eq!(extractor.extract("CREATE TABLE t (a INT)").len(), 1);
    }

    #[test]
    fn test_json_round_trip_preserves_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.json");

        let schema = extract_schema("CREATE TABLE zeta (b INT, a INT); CREATE TABLE alpha (c INT)");
        schema.write_json_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.find("zeta").unwrap() < text.find("alpha").unwrap());
        assert!(text.contains('\n'));

        let loaded = SchemaMapping::from_json_file(&path).unwrap();
        assert_eq!(loaded, schema);
    }

    #[test]
    fn test_extract_files_merges_in_order() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.sql");
        let second = dir.path().join("b.sql");
        std::fs::write(&first, "CREATE TABLE t (a INT); CREATE TABLE only_a (x INT)").unwrap();
        std::fs::write(&second, "CREATE TABLE t (b INT)").unwrap();

        let schema = SchemaExtractor::default()
            .extract_files(&[first, second])
            .unwrap();
        assert_eq!(cols(&schema, "t"), vec!["b"]);
        assert_eq!(schema.table_names().collect::<Vec<_>>(), vec!["t", "only_a"]);
    }

    #[test]
    fn test_extract_file_tolerates_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.sql");
        let mut bytes = b"-- \xff\xfe garbage\nCREATE TABLE t (a INT, b INT)".to_vec();
        bytes.extend_from_slice(b"\n\xc3");
        std::fs::write(&path, bytes).unwrap();

        let schema = SchemaExtractor::default().extract_file(&path).unwrap();
        assert_eq!(cols(&schema, "t"), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = SchemaExtractor::default().extract_file("/nonexistent/dump.sql");
        assert!(matches!(result, Err(RegistryError::Io(_))));
    }
}
