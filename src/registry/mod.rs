//! Registry layer for ddl-registry
//!
//! Builds, enriches and reads the table registry: one NDJSON document per
//! table plus SQLite inverted indexes for alias and column tokens.

pub mod builder;
pub mod document;
pub mod enricher;
pub mod reader;

// Re-export main registry types
pub use builder::{BuildStats, RegistryBuilder};
pub use document::{DocumentBatch, TableDocument, read_documents, write_documents};
pub use enricher::{EnrichStats, Enricher};
pub use reader::{SchemaMatch, TableMatch, TableRegistry, TableSelector};
