//! Database schema definitions

/// Database schema version
pub const SCHEMA_VERSION: u32 = 1;

/// SQL for creating the alias inverted index (alias token -> table)
pub const CREATE_ALIAS_INDEX_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS alias_index (
    token TEXT NOT NULL,
    table_name TEXT NOT NULL
);
"#;

/// SQL for creating the column inverted index (column token -> table, column)
pub const CREATE_COLUMN_INDEX_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS column_index (
    token TEXT NOT NULL,
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL
);
"#;

/// SQL for creating the metadata table
pub const CREATE_METADATA_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Token lookups plus the unique keys that make repeated inserts no-ops
pub const CREATE_TOKEN_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_alias ON alias_index(token);
CREATE INDEX IF NOT EXISTS idx_col ON column_index(token);
CREATE UNIQUE INDEX IF NOT EXISTS uq_alias ON alias_index(token, table_name);
CREATE UNIQUE INDEX IF NOT EXISTS uq_col ON column_index(token, table_name, column_name);
"#;

pub const INSERT_ALIAS: &str =
    "INSERT OR IGNORE INTO alias_index (token, table_name) VALUES (?, ?)";

pub const INSERT_COLUMN_TOKEN: &str =
    "INSERT OR IGNORE INTO column_index (token, table_name, column_name) VALUES (?, ?, ?)";
