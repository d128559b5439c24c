//! Pipeline - SQL dump to enriched registry in one run
//!
//! Stages run in-process and in order: extract the schema, build the registry,
//! check the artifacts, enrich. A failing stage stops the run; outputs of
//! earlier stages stay on disk.

use crate::config::Config;
use crate::ddl::SchemaExtractor;
use crate::error::RegistryError;
use crate::registry::{BuildStats, EnrichStats, Enricher, RegistryBuilder, TableRegistry};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Token looked up by the optional validation step
pub const VALIDATION_TOKEN: &str = "policy";

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Extract,
    Build,
    Verify,
    Enrich,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Extract => "extract",
            PipelineStage::Build => "build",
            PipelineStage::Verify => "verify",
            PipelineStage::Enrich => "enrich",
        };
        f.write_str(name)
    }
}

/// A stage failure and the exit code the CLI reports for it
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    #[source]
    pub source: RegistryError,
}

impl PipelineFailure {
    fn at(stage: PipelineStage) -> impl FnOnce(RegistryError) -> Self {
        move |source| Self { stage, source }
    }

    pub fn exit_code(&self) -> i32 {
        self.source.exit_code()
    }
}

/// Optional pipeline behavior
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Where to write the extracted schema instead of `<out_dir>/<schema_file>`
    pub schema_json: Option<PathBuf>,

    /// Load the finished registry and run a test lookup
    pub validate: bool,
}

/// Outcome of the optional validation step; never fails the pipeline
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    Passed { table_count: usize, token_hits: usize },
    Failed(String),
}

/// Summary of a successful run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub table_count: usize,
    pub column_count: usize,
    pub schema_path: PathBuf,
    pub build: BuildStats,
    pub enrich: EnrichStats,
    pub validation: Option<ValidationOutcome>,
    pub processing_time: f64,
}

/// Runs extraction, build and enrichment with one configuration
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run<P1: AsRef<Path>, P2: AsRef<Path>>(
        &self,
        sql_path: P1,
        out_dir: P2,
        options: &PipelineOptions,
    ) -> Result<PipelineReport, PipelineFailure> {
        let start_time = Instant::now();
        let sql_path = sql_path.as_ref();
        let out_dir = out_dir.as_ref();
        let registry_config = &self.config.registry;

        crate::utils::ensure_directory(out_dir)
            .map_err(PipelineFailure::at(PipelineStage::Extract))?;

        let schema_path = options
            .schema_json
            .clone()
            .unwrap_or_else(|| out_dir.join(&registry_config.schema_file));
        let ndjson_path = out_dir.join(&registry_config.ndjson_file);
        let database_path = out_dir.join(&registry_config.database_file);

        log::info!("Stage {}: {}", PipelineStage::Extract, sql_path.display());
        let extractor = SchemaExtractor::new(self.config.extraction.clone());
        let schema = extractor
            .extract_file(sql_path)
            .and_then(|schema| schema.write_json_file(&schema_path).map(|_| schema))
            .map_err(PipelineFailure::at(PipelineStage::Extract))?;

        log::info!("Stage {}: {}", PipelineStage::Build, out_dir.display());
        let build = RegistryBuilder::new(registry_config.clone())
            .build_into(&schema, &ndjson_path, &database_path)
            .map_err(PipelineFailure::at(PipelineStage::Build))?;

        log::info!("Stage {}: checking artifacts", PipelineStage::Verify);
        let missing: Vec<String> = [&schema_path, &ndjson_path, &database_path]
            .into_iter()
            .filter(|path| !path.exists())
            .map(|path| path.display().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineFailure {
                stage: PipelineStage::Verify,
                source: RegistryError::Pipeline(format!(
                    "missing artifacts: {}",
                    missing.join(", ")
                )),
            });
        }

        log::info!("Stage {}: {}", PipelineStage::Enrich, ndjson_path.display());
        let enrich = Enricher::new(self.config.enrichment.clone())
            .enrich(&ndjson_path, &database_path, &schema_path)
            .map_err(PipelineFailure::at(PipelineStage::Enrich))?;

        let validation = options
            .validate
            .then(|| validate(&ndjson_path, &database_path, &schema_path));

        Ok(PipelineReport {
            table_count: schema.len(),
            column_count: schema.column_count(),
            schema_path,
            build,
            enrich,
            validation,
            processing_time: start_time.elapsed().as_secs_f64(),
        })
    }
}

fn validate(ndjson_path: &Path, database_path: &Path, schema_path: &Path) -> ValidationOutcome {
    let outcome = TableRegistry::open(ndjson_path, database_path, Some(schema_path)).and_then(
        |registry| {
            let token_hits = registry.find_tables_by_token(VALIDATION_TOKEN, 1)?.len();
            Ok(ValidationOutcome::Passed {
                table_count: registry.len(),
                token_hits,
            })
        },
    );

    outcome.unwrap_or_else(|e| {
        log::warn!("Validation failed: {}", e);
        ValidationOutcome::Failed(e.to_string())
    })
}
