//! DDL extraction for ddl-registry
//!
//! A tolerant scanner that pulls `CREATE TABLE` column lists out of arbitrary,
//! possibly malformed SQL dumps. This is not a SQL parser: no expression is
//! evaluated and nothing but table and column names is kept.

pub mod column;
pub mod extractor;
pub mod identifier;
pub mod scanner;
pub mod splitter;

// Re-export main types and functions
pub use column::parse_column_name;
pub use extractor::{SchemaExtractor, SchemaMapping, extract_schema};
pub use identifier::normalize_identifier;
pub use scanner::{DdlBlock, UNKNOWN_TABLE_SENTINEL, find_create_table_blocks};
pub use splitter::{SplitMode, split_top_level_commas};
