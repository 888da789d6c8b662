use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use concordance::config::Config;
use concordance::output::{csv, json, terminal};
use concordance::pipeline::{batch, Aggregator};
use concordance::registry::ModelRegistry;
use concordance::scorer::subprocess::SubprocessScorer;
use concordance::scorer::ModelScorer;

/// Concordance: one risk score from many manipulation detectors.
///
/// Runs every registered detector against a post, weights their scores into
/// a composite, and classifies the result from MINIMAL to CRITICAL.
#[derive(Parser)]
#[command(name = "concordance", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// List registered detectors and whether each can be run
    Models,

    /// Run a single detector against one input
    RunModel {
        /// Detector identifier (see `concordance models`)
        model: String,
        /// Numeric post identifier
        input_id: String,
    },

    /// Analyze one input with every detector
    Analyze {
        /// Numeric post identifier
        input_id: String,

        /// Print the report as JSON instead of the terminal view
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to a file (timestamped name if no path given)
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        export: Option<String>,

        /// Don't store the result in the database
        #[arg(long)]
        no_save: bool,
    },

    /// Import input ids from a file (one per line) for later sampling
    Import {
        file: PathBuf,
    },

    /// Analyze many inputs and write a CSV
    Batch {
        /// Input ids to analyze
        ids: Vec<String>,

        /// Read input ids from a file (one per line, # comments allowed)
        #[arg(long)]
        ids_file: Option<PathBuf>,

        /// Analyze a random sample of N imported ids
        #[arg(long)]
        sample: Option<u32>,

        /// CSV output path (default: batch_ecs_analysis_<timestamp>.csv)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Don't store results in the database
        #[arg(long)]
        no_save: bool,
    },

    /// List stored analyses, highest composite first
    Report {
        /// Only include analyses at or above this composite score
        #[arg(long, default_value = "0.0")]
        min_score: f64,

        /// Max rows to show (default: 50)
        #[arg(long, default_value = "50")]
        limit: u32,
    },

    /// Show system status (DB stats, last analysis, detector availability)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("concordance=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Init => {
            info!("Initializing Concordance database...");
            let db = concordance::db::initialize_sqlite(&config.db_path)?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext: point CONCORDANCE_MODELS_DIR at your detectors, then run:");
            println!("  concordance models");
        }

        Commands::Models => {
            let registry = load_registry(&config)?;
            terminal::display_models(&registry);
        }

        Commands::RunModel { model, input_id } => {
            batch::validate_input_id(&input_id)?;
            let registry = load_registry(&config)?;
            let Some(spec) = registry.get(&model) else {
                anyhow::bail!(
                    "Unknown model '{}'. Registered models: {}",
                    model,
                    registry.ids().join(", ")
                );
            };
            if let Some(availability) = registry.availability(&model) {
                if availability.is_unavailable() {
                    warn!(model, "Model failed validation, running anyway");
                }
            }

            let scorer = SubprocessScorer::new(config.timeout);
            info!(
                model,
                input_id,
                timeout_secs = scorer.timeout().as_secs(),
                "Running single model"
            );
            let outcome = scorer.invoke(spec, &input_id).await;
            terminal::display_single_outcome(&outcome);
        }

        Commands::Analyze {
            input_id,
            json: as_json,
            export,
            no_save,
        } => {
            batch::validate_input_id(&input_id)?;
            let aggregator = build_aggregator(&config)?;
            let result = aggregator.analyze(&input_id).await?;

            if as_json {
                println!("{}", result.to_json_pretty()?);
            } else {
                terminal::display_report(&result);
            }

            if let Some(path) = export {
                let path = (!path.is_empty()).then(|| PathBuf::from(path));
                let written = json::save_results(&result, path.as_deref())?;
                eprintln!("Results saved to: {}", written.display());
            }

            if !no_save {
                let db = concordance::db::initialize_sqlite(&config.db_path)?;
                db.save_analysis(&result).await?;
            }
        }

        Commands::Import { file } => {
            let ids = batch::read_input_ids(&file)?;
            let (valid, invalid): (Vec<String>, Vec<String>) = ids
                .into_iter()
                .partition(|id| batch::validate_input_id(id).is_ok());
            for id in &invalid {
                warn!(input_id = id, "Skipping non-numeric input id");
            }

            let db = concordance::db::initialize_sqlite(&config.db_path)?;
            let added = db.add_inputs(&valid).await?;
            let total = db.input_count().await?;
            println!(
                "Imported {} new ids ({} already present, {} invalid). {} ids stored.",
                added,
                valid.len() - added,
                invalid.len(),
                total
            );
        }

        Commands::Batch {
            ids,
            ids_file,
            sample,
            output,
            no_save,
        } => {
            let needs_db = !no_save || sample.is_some();
            let db = if needs_db {
                Some(concordance::db::initialize_sqlite(&config.db_path)?)
            } else {
                None
            };

            let mut input_ids = ids;
            if let Some(path) = ids_file {
                input_ids.extend(batch::read_input_ids(&path)?);
            }
            if let (Some(n), Some(db)) = (sample, db.as_ref()) {
                let sampled = db.sample_inputs(n).await?;
                if sampled.is_empty() {
                    warn!("No imported ids to sample. Run `concordance import <file>` first.");
                }
                input_ids.extend(sampled);
            }
            if input_ids.is_empty() {
                anyhow::bail!(
                    "No input ids given. Pass ids as arguments, --ids-file, or --sample N."
                );
            }

            let aggregator = build_aggregator(&config)?;
            println!(
                "Analyzing {} inputs with {} models...",
                input_ids.len(),
                aggregator.registry().len()
            );

            let save_db = if no_save { None } else { db.as_ref() };
            let rows = batch::run(&aggregator, save_db, &input_ids, true).await?;

            let path = output.unwrap_or_else(|| {
                PathBuf::from(csv::default_filename(chrono::Utc::now()))
            });
            csv::write(&rows, &aggregator.registry().ids(), &path)?;

            if let Some(stats) = batch::summarize(&rows) {
                terminal::display_batch_summary(&stats);
            }
            println!("\n{} {}", "CSV written to:".green(), path.display());
        }

        Commands::Report { min_score, limit } => {
            let db = concordance::db::open_sqlite(&config.db_path)?;
            let analyses = db.get_ranked_analyses(min_score, limit).await?;
            terminal::display_stored_analyses(&analyses);
        }

        Commands::Status => {
            let db = if std::path::Path::new(&config.db_path).exists() {
                Some(concordance::db::open_sqlite(&config.db_path)?)
            } else {
                None
            };
            let registry = load_registry(&config)?;
            concordance::status::show(db.as_ref(), &config.db_path, &registry).await?;
        }
    }

    Ok(())
}

/// Build and validate the configured registry.
fn load_registry(config: &Config) -> Result<ModelRegistry> {
    config.require_registry_file()?;
    let mut registry = config.build_registry()?;
    registry.validate();
    Ok(registry)
}

/// Build the aggregator for analyze and batch runs.
///
/// Fails up front when the models directory is missing rather than letting
/// every detector report itself unavailable.
fn build_aggregator(config: &Config) -> Result<Aggregator> {
    config.require_models_dir()?;
    let registry = load_registry(config)?;

    if registry.active_specs().next().is_none() {
        warn!("No detector passed validation; every model will be reported as skipped");
    }

    let scorer: Arc<dyn ModelScorer> = Arc::new(SubprocessScorer::new(config.timeout));
    Ok(Aggregator::new(Arc::new(registry), scorer).with_concurrency(config.concurrency))
}
