//! SQLite database operations for ddl-registry
//!
//! Holds the two inverted indexes used for table lookup: alias token -> table
//! and column token -> (table, column). Inserts are idempotent.

use crate::error::{RegistryError, Result};
use crate::storage::schema::*;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::path::Path;

/// One row of the alias index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AliasEntry {
    pub token: String,
    pub table: String,
}

/// One row of the column index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnEntry {
    pub token: String,
    pub table: String,
    pub column: String,
}

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the index database at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| RegistryError::Storage(format!("Failed to open database: {}", e)))?;

        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Open an existing index database for lookups only.
    ///
    /// No schema setup or metadata write happens, and any write through the
    /// returned handle fails.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
            |e| {
                RegistryError::Storage(format!(
                    "Failed to open {} read-only: {}",
                    path.display(),
                    e
                ))
            },
        )?;
        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing)
    pub fn memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            RegistryError::Storage(format!("Failed to create in-memory database: {}", e))
        })?;

        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize database schema
    fn initialize(&self) -> Result<()> {
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| RegistryError::Storage(format!("Failed to enable WAL mode: {}", e)))?;

        self.conn
            .execute(CREATE_ALIAS_INDEX_TABLE, [])
            .map_err(|e| RegistryError::Storage(format!("Failed to create alias_index: {}", e)))?;

        self.conn
            .execute(CREATE_COLUMN_INDEX_TABLE, [])
            .map_err(|e| RegistryError::Storage(format!("Failed to create column_index: {}", e)))?;

        self.conn
            .execute(CREATE_METADATA_TABLE, [])
            .map_err(|e| RegistryError::Storage(format!("Failed to create metadata table: {}", e)))?;

        self.conn
            .execute_batch(CREATE_TOKEN_INDEXES)
            .map_err(|e| RegistryError::Storage(format!("Failed to create indexes: {}", e)))?;

        self.set_metadata("schema_version", &SCHEMA_VERSION.to_string())?;

        log::debug!("Index database initialized with schema version {}", SCHEMA_VERSION);
        Ok(())
    }

    /// Insert alias rows in one transaction; returns how many were new
    pub fn insert_aliases(&mut self, entries: &[AliasEntry]) -> Result<usize> {
        let tx = self.conn.transaction().map_err(|e| {
            RegistryError::Storage(format!("Failed to start transaction: {}", e))
        })?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(INSERT_ALIAS).map_err(|e| {
                RegistryError::Storage(format!("Failed to prepare statement: {}", e))
            })?;

            for entry in entries {
                inserted += stmt.execute(params![entry.token, entry.table]).map_err(|e| {
                    RegistryError::Storage(format!(
                        "Failed to insert alias '{}' for {}: {}",
                        entry.token, entry.table, e
                    ))
                })?;
            }
        }

        tx.commit()
            .map_err(|e| RegistryError::Storage(format!("Failed to commit transaction: {}", e)))?;

        log::debug!("Inserted {} of {} alias rows", inserted, entries.len());
        Ok(inserted)
    }

    /// Insert column-token rows in one transaction; returns how many were new
    pub fn insert_column_tokens(&mut self, entries: &[ColumnEntry]) -> Result<usize> {
        let tx = self.conn.transaction().map_err(|e| {
            RegistryError::Storage(format!("Failed to start transaction: {}", e))
        })?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(INSERT_COLUMN_TOKEN).map_err(|e| {
                RegistryError::Storage(format!("Failed to prepare statement: {}", e))
            })?;

            for entry in entries {
                inserted += stmt
                    .execute(params![entry.token, entry.table, entry.column])
                    .map_err(|e| {
                        RegistryError::Storage(format!(
                            "Failed to insert column token '{}' for {}.{}: {}",
                            entry.token, entry.table, entry.column, e
                        ))
                    })?;
            }
        }

        tx.commit()
            .map_err(|e| RegistryError::Storage(format!("Failed to commit transaction: {}", e)))?;

        log::debug!("Inserted {} of {} column token rows", inserted, entries.len());
        Ok(inserted)
    }

    /// Distinct tables carrying `token` as an alias, in first-insertion order
    pub fn find_tables_by_token(&self, token: &str, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT table_name FROM alias_index WHERE token = ? \
                 GROUP BY table_name ORDER BY MIN(rowid) LIMIT ?",
            )
            .map_err(|e| RegistryError::Storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![token, limit as i64], |row| row.get::<_, String>(0))
            .map_err(|e| RegistryError::Storage(format!("Failed to query aliases: {}", e)))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(
                row.map_err(|e| RegistryError::Storage(format!("Failed to read alias row: {}", e)))?,
            );
        }
        Ok(result)
    }

    /// Distinct `(table, column)` pairs carrying `token`, in first-insertion order
    pub fn find_columns_by_token(&self, token: &str, limit: usize) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT table_name, column_name FROM column_index WHERE token = ? \
                 GROUP BY table_name, column_name ORDER BY MIN(rowid) LIMIT ?",
            )
            .map_err(|e| RegistryError::Storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![token, limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| RegistryError::Storage(format!("Failed to query columns: {}", e)))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(
                row.map_err(|e| RegistryError::Storage(format!("Failed to read column row: {}", e)))?,
            );
        }
        Ok(result)
    }

    /// Store a metadata value, replacing any previous one
    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)",
                params![key, value],
            )
            .map_err(|e| RegistryError::Storage(format!("Failed to set metadata {}: {}", key, e)))?;
        Ok(())
    }

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| RegistryError::Storage(format!("Failed to read metadata {}: {}", key, e)))?;
        Ok(value)
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(sql, [], |row| row.get(0))
                .map_err(|e| RegistryError::Storage(format!("Failed to count rows: {}", e)))?;
            Ok(n as usize)
        };

        Ok(DatabaseStats {
            alias_rows: count("SELECT COUNT(*) FROM alias_index")?,
            column_rows: count("SELECT COUNT(*) FROM column_index")?,
            indexed_tables: count(
                "SELECT COUNT(*) FROM (SELECT table_name FROM alias_index \
                 UNION SELECT table_name FROM column_index)",
            )?,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    pub alias_rows: usize,
    pub column_rows: usize,
    pub indexed_tables: usize,
}
