//! ddl-registry CLI application
//!
//! Command-line interface for the ddl-registry library.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ddl_registry::{
    Config, Enricher, Pipeline, PipelineOptions, RegistryBuilder, SchemaExtractor, SchemaMapping,
    TableRegistry, TableSelector, ValidationOutcome, storage::Database, utils,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ddl-registry")]
#[command(about = "Build a searchable table registry from SQL DDL dumps")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, build and enrich in one run
    Run {
        /// SQL dump to read
        sql: PathBuf,

        /// Directory receiving schema.json, registry.ndjson and registry.db
        #[arg(long)]
        out_dir: PathBuf,

        /// Write the extracted schema here instead of the output directory
        #[arg(long)]
        schema_json: Option<PathBuf>,

        /// Load the finished registry and run a test lookup
        #[arg(long)]
        validate: bool,
    },

    /// Extract a table-to-columns mapping from SQL dumps
    Extract {
        /// SQL dump(s), merged in argument order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output schema file
        #[arg(short, long, default_value = "schema.json")]
        output: PathBuf,
    },

    /// Build registry artifacts from a schema file
    Build {
        /// Schema JSON produced by `extract`
        schema: PathBuf,

        /// Output directory
        #[arg(long)]
        out_dir: PathBuf,
    },

    /// Add query templates and extra aliases to a built registry
    Enrich {
        #[arg(long)]
        ndjson_path: PathBuf,

        #[arg(long)]
        sqlite_path: PathBuf,

        #[arg(long)]
        schema_path: PathBuf,
    },

    /// Look up tables (or columns) by token
    Lookup {
        /// Registry directory
        #[arg(long)]
        out_dir: PathBuf,

        token: String,

        /// Search column tokens instead of table aliases
        #[arg(long)]
        columns: bool,

        /// Maximum number of results
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,
    },

    /// Pick candidate tables for a free-text query
    Select {
        /// Registry directory
        #[arg(long)]
        out_dir: PathBuf,

        query: String,

        /// Include full column lists and query templates
        #[arg(long)]
        full: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Run {
            sql,
            out_dir,
            schema_json,
            validate,
        } => {
            let options = PipelineOptions {
                schema_json,
                validate,
            };
            run_command(config, sql, out_dir, options);
        }
        Commands::Extract { inputs, output } => {
            extract_command(&config, &inputs, &output)?;
        }
        Commands::Build { schema, out_dir } => {
            build_command(&config, &schema, &out_dir)?;
        }
        Commands::Enrich {
            ndjson_path,
            sqlite_path,
            schema_path,
        } => {
            let stats = Enricher::new(config.enrichment)
                .enrich(&ndjson_path, &sqlite_path, &schema_path)
                .context("Enrichment failed")?;
            println!("✅ Enriched {} documents", stats.documents);
            println!("   📝 Templated: {}", stats.templated);
            println!("   🏷️  New alias rows: {}", stats.new_alias_rows);
            println!("   🔤 New column rows: {}", stats.new_column_rows);
            println!("   💾 Backup: {}", stats.backup_path.display());
        }
        Commands::Lookup {
            out_dir,
            token,
            columns,
            top_k,
        } => {
            let registry = open_registry(&config, &out_dir)?;
            lookup_command(&registry, &token, columns, top_k)?;
        }
        Commands::Select {
            out_dir,
            query,
            full,
        } => {
            let registry = open_registry(&config, &out_dir)?;
            let selector = TableSelector::new(&registry);
            let json = if full {
                selector.select_with_schema_json(&query)?
            } else {
                selector.select_json(&query)?
            };
            println!("{}", json);
        }
    }

    Ok(())
}

fn run_command(config: Config, sql: PathBuf, out_dir: PathBuf, options: PipelineOptions) {
    println!("🚀 Running pipeline on {}", sql.display());

    match Pipeline::new(config).run(&sql, &out_dir, &options) {
        Ok(report) => {
            println!("✅ Pipeline complete!");
            println!(
                "   📊 Tables: {} ({} columns)",
                report.table_count, report.column_count
            );
            println!("   📋 Schema: {}", report.schema_path.display());
            println!(
                "   📄 Registry: {} ({})",
                report.build.ndjson_path.display(),
                utils::format_file_size(utils::file_size(&report.build.ndjson_path))
            );
            println!(
                "   🗄️  Index: {} ({})",
                report.build.database_path.display(),
                utils::format_file_size(utils::file_size(&report.build.database_path))
            );
            println!("   📝 Templated: {}", report.enrich.templated);
            println!("   ⏱️  Time: {:.2}s", report.processing_time);
            match report.validation {
                Some(ValidationOutcome::Passed {
                    table_count,
                    token_hits,
                }) => println!(
                    "   🔍 Validation: {} tables loaded, {} lookup hit(s)",
                    table_count, token_hits
                ),
                Some(ValidationOutcome::Failed(reason)) => {
                    eprintln!("   ⚠️  Validation failed: {}", reason)
                }
                None => {}
            }
        }
        Err(failure) => {
            let code = failure.exit_code();
            eprintln!("❌ Stage '{}' failed with exit code {}", failure.stage, code);
            eprintln!("   {}", failure.source);
            std::process::exit(code);
        }
    }
}

fn extract_command(config: &Config, inputs: &[PathBuf], output: &Path) -> Result<()> {
    println!("🔎 Extracting schema from {} file(s)...", inputs.len());

    let mut paths = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !utils::is_sql_file(input) {
            log::warn!("{} does not look like a SQL dump", input.display());
        }
        paths.push(utils::normalize_path(input)?);
    }

    let extractor = SchemaExtractor::new(config.extraction.clone());
    let schema = extractor.extract_files(&paths)?;
    schema
        .write_json_file(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✅ Extraction complete!");
    println!("   📊 Tables: {}", schema.len());
    println!("   🔤 Columns: {}", schema.column_count());
    println!("   📋 Schema: {}", output.display());
    Ok(())
}

fn build_command(config: &Config, schema_path: &Path, out_dir: &Path) -> Result<()> {
    let schema = SchemaMapping::from_json_file(schema_path)
        .with_context(|| format!("Failed to read schema {}", schema_path.display()))?;

    let stats = RegistryBuilder::new(config.registry.clone()).build(&schema, out_dir)?;
    let index = Database::open_read_only(&stats.database_path)?.get_stats()?;

    println!("✅ Registry built!");
    println!("   📊 Tables: {}", stats.tables);
    println!(
        "   🏷️  Alias rows: {} new, {} total",
        stats.alias_rows, index.alias_rows
    );
    println!(
        "   🔤 Column rows: {} new, {} total",
        stats.column_rows, index.column_rows
    );
    println!("   🗂️  Indexed tables: {}", index.indexed_tables);
    println!("   ⏱️  Time: {:.2}s", stats.processing_time);
    Ok(())
}

fn open_registry(config: &Config, out_dir: &Path) -> Result<TableRegistry> {
    let registry_config = &config.registry;
    let schema_path = out_dir.join(&registry_config.schema_file);
    let registry = TableRegistry::open(
        out_dir.join(&registry_config.ndjson_file),
        out_dir.join(&registry_config.database_file),
        schema_path.exists().then_some(schema_path.as_path()),
    )
    .with_context(|| format!("Failed to open registry in {}", out_dir.display()))?;
    Ok(registry)
}

fn lookup_command(registry: &TableRegistry, token: &str, columns: bool, top_k: usize) -> Result<()> {
    if columns {
        let hits = registry.find_columns_by_token(token, top_k)?;
        if hits.is_empty() {
            println!("❌ No columns found for: \"{}\"", token);
            return Ok(());
        }
        for (i, (table, column)) in hits.iter().enumerate() {
            println!("{}. {}.{}", i + 1, table, column);
        }
        return Ok(());
    }

    let hits = registry.find_tables_by_token(token, top_k)?;
    if hits.is_empty() {
        println!("❌ No tables found for: \"{}\"", token);
        return Ok(());
    }
    for (i, doc) in hits.iter().enumerate() {
        println!("{}. {}", i + 1, doc.table);
        println!("   Top columns: {}", doc.top_columns.join(", "));
    }
    Ok(())
}
