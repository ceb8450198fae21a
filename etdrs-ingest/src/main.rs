//! etdrs-ingest - report directory ingestion
//!
//! Reads every report in an input directory, extracts the ETDRS sector
//! table selected by the profile and writes one aggregate table with a row
//! per subject.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use etdrs_common::config::ConfigResolver;
use etdrs_ingest::{ExtractionProfile, IngestSettings, ProfileKind, Quantity};
use tracing::info;

/// Command-line arguments for etdrs-ingest
#[derive(Parser, Debug)]
#[command(name = "etdrs-ingest")]
#[command(about = "Aggregate ETDRS sector tables from a directory of reports")]
#[command(version)]
struct Args {
    /// Directory containing the report files
    #[arg(short, long, env = "ETDRS_INPUT")]
    input: PathBuf,

    /// Aggregate table to write
    #[arg(short, long, env = "ETDRS_OUTPUT")]
    output: PathBuf,

    /// Which report table to extract
    #[arg(short, long, value_enum, default_value_t = ProfileKind::Thickness)]
    profile: ProfileKind,

    /// Density value column (density profile only)
    #[arg(short, long, value_enum, default_value_t = Quantity::Vd)]
    quantity: Quantity,

    /// Bootstrap config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a JSON run report (summary and identifier audit) here
    #[arg(short, long)]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) = ConfigResolver::new()
        .load_with_source(args.config.as_deref())
        .context("Failed to load configuration")?;
    etdrs_common::logging::init(&config.logging).context("Failed to initialize logging")?;

    info!("Starting etdrs-ingest {}", env!("CARGO_PKG_VERSION"));
    source.log();

    let profile = ExtractionProfile::select(args.profile, args.quantity);
    let settings =
        IngestSettings::from_config(&config, profile).context("Invalid configuration")?;

    let run = etdrs_ingest::ingest_directory(&args.input, settings)
        .with_context(|| format!("Failed to ingest {}", args.input.display()))?;
    run.audit.log();

    etdrs_ingest::write_outputs(&run, &args.output, args.report.as_deref())?;

    info!(
        "Done: {} processed, {} skipped, {} subject(s) in {} ms",
        run.summary.files_processed,
        run.summary.files_skipped,
        run.summary.subjects,
        run.summary.duration_ms
    );
    Ok(())
}
