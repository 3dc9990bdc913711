//! Paddock NDVI runner.
//!
//! Runs one analysis over a local scene catalog:
//! - Loads configuration from YAML, `NDVI_*` environment variables and flags
//! - Reads field boundaries from GeoJSON
//! - Selects imagery, computes per-field statistics and flags partial grazing
//! - Writes `ndvi_data.csv` and `partial.csv` to the output directory
//!
//! When no eligible imagery is found nothing is written.

use std::path::{Path, PathBuf};
use std::time::Duration;

use analysis::{
    load_fields, write_partial_file, write_records_file, AnalysisConfig, Orchestrator, RunOutcome,
};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use imagery::{LocalCatalog, RetryingCatalog};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const RECORDS_FILE: &str = "ndvi_data.csv";
const PARTIAL_FILE: &str = "partial.csv";

#[derive(Parser, Debug)]
#[command(name = "ndvi-runner")]
#[command(about = "Paddock NDVI analysis with grazing correction")]
struct Args {
    /// YAML configuration file (defaults apply when omitted)
    #[arg(short, long, env = "NDVI_CONFIG")]
    config: Option<PathBuf>,

    /// GeoJSON file with paddock boundaries
    #[arg(short, long, env = "NDVI_FIELDS")]
    fields: PathBuf,

    /// Root of the scene catalog (directories holding scene.json)
    #[arg(long, env = "NDVI_CATALOG_DIR", default_value = "scenes")]
    catalog_dir: PathBuf,

    /// Directory for the output CSVs
    #[arg(short, long, env = "NDVI_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Emit records for the N newest images instead of only the latest
    #[arg(long)]
    history: Option<usize>,

    /// Pin the window end to this date (YYYY-MM-DD)
    #[arg(long, value_parser = ndvi_common::time::parse_date)]
    end_date: Option<NaiveDate>,

    /// Restrict the run to these paddocks (repeatable)
    #[arg(long = "field-name")]
    field_names: Vec<String>,

    /// Abandon the run after this many seconds
    #[arg(long, env = "NDVI_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Log level
    #[arg(long, env = "NDVI_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn load_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_yaml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => AnalysisConfig::default(),
        };
        config.apply_env();

        if let Some(history) = self.history {
            config.history_count = history;
        }
        if let Some(end_date) = self.end_date {
            config.end_date = Some(end_date);
        }
        if !self.field_names.is_empty() {
            config.field_names = Some(self.field_names.clone());
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting paddock NDVI run");

    let config = args.load_config()?;
    let retry = config.retry.policy();

    let fields = load_fields(&args.fields)
        .await
        .with_context(|| format!("loading boundaries from {}", args.fields.display()))?;

    let catalog = LocalCatalog::open(&args.catalog_dir)
        .await
        .with_context(|| format!("opening scene catalog {}", args.catalog_dir.display()))?;
    info!(scenes = catalog.len(), root = %args.catalog_dir.display(), "Opened scene catalog");

    let orchestrator = Orchestrator::new(RetryingCatalog::new(catalog, retry), config)?;

    let run = orchestrator.run(&fields);
    let outcome = match args.timeout_secs {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), run).await {
            Ok(result) => result?,
            Err(_) => bail!("run abandoned after {}s timeout, nothing written", secs),
        },
        None => run.await?,
    };

    if !outcome.has_imagery() {
        warn!(
            run_id = %outcome.run_id,
            start = %outcome.window.start,
            end = %outcome.window.end,
            skipped = outcome.skipped_images.len(),
            "No eligible imagery in window, outputs left untouched"
        );
        return Ok(());
    }

    write_outputs(&args.output_dir, &outcome).await?;

    info!(
        run_id = %outcome.run_id,
        images = outcome.images.len(),
        records = outcome.records.len(),
        covered = outcome.covered().count(),
        partial = outcome.partial.len(),
        "Run finished"
    );

    Ok(())
}

async fn write_outputs(dir: &Path, outcome: &RunOutcome) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating output directory {}", dir.display()))?;

    for record in &outcome.records {
        debug!(
            field = %record.field_name,
            image = %record.image_id,
            last_update = %record.last_update(),
            pixels = record.pixel_count,
            "Record"
        );
    }

    write_records_file(dir.join(RECORDS_FILE), &outcome.records)?;
    write_partial_file(dir.join(PARTIAL_FILE), &outcome.partial)?;
    Ok(())
}
