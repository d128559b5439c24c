//! # ddl-registry
//!
//! Turns raw SQL DDL dumps into a searchable table registry: a table-to-columns
//! schema mapping, one NDJSON document per table, and SQLite inverted indexes
//! for alias and column token lookups.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ddl_registry::{Pipeline, PipelineOptions, TableRegistry, TableSelector};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Extract, build and enrich in one run
//!     let report = Pipeline::default().run("dump.sql", "out", &PipelineOptions::default())?;
//!     println!("Registered {} tables", report.table_count);
//!
//!     // Query the finished registry
//!     let registry = TableRegistry::open(
//!         "out/registry.ndjson",
//!         "out/registry.db",
//!         Some(Path::new("out/schema.json")),
//!     )?;
//!     for candidate in TableSelector::new(&registry).select("policy claims")? {
//!         println!("{} {:?}", candidate.table, candidate.top_columns);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod ddl;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod storage;
pub mod utils;

// Re-export main API types
pub use config::{Config, DuplicateTablePolicy};
pub use ddl::{SchemaExtractor, SchemaMapping, extract_schema};
pub use error::{RegistryError, Result};
pub use pipeline::{
    Pipeline, PipelineFailure, PipelineOptions, PipelineReport, PipelineStage, ValidationOutcome,
};
pub use registry::{
    BuildStats, EnrichStats, Enricher, RegistryBuilder, TableDocument, TableRegistry,
    TableSelector,
};
