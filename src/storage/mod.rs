//! Storage functionality for ddl-registry
//!
//! This module provides the SQLite inverted token indexes behind the registry.

pub mod database;
pub mod schema;

// Re-export main types
pub use database::{AliasEntry, ColumnEntry, Database, DatabaseStats};
