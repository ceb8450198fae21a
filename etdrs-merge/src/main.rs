//! etdrs-merge - table-level stages for aggregated ETDRS tables
//!
//! Subcommands:
//! - `merge`: combine a priority table with a base table
//! - `mask`: clear sectors flagged in a noise annotation table
//! - `error-map`: expand coarse noise codes to fine-sector flags
//! - `proportions`: summarise a fine flag table

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use etdrs_common::config::{ConfigResolver, TomlConfig};
use etdrs_common::text::TextLoader;
use etdrs_merge::{DigitSet, NoiseMask};
use tracing::info;

/// Command-line arguments for etdrs-merge
#[derive(Parser, Debug)]
#[command(name = "etdrs-merge")]
#[command(about = "Merge, mask and summarise aggregated ETDRS tables")]
#[command(version)]
struct Args {
    /// Bootstrap config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge a priority table over a base table
    Merge {
        /// Priority table; its numbers win conflicts
        #[arg(long)]
        new: PathBuf,
        /// Base table; fills cells the priority table lacks
        #[arg(long)]
        old: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Clear target cells flagged in a noise annotation table
    Mask {
        #[arg(long)]
        target: PathBuf,
        #[arg(long)]
        noise: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Write the mask report as JSON here
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Expand a noise annotation table to a fine-sector flag table
    ErrorMap {
        #[arg(long)]
        noise: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Defect digits that count as an error (e.g. "1" or "29")
        #[arg(long, default_value = "1")]
        digits: String,
    },
    /// Count subjects with some or all sectors flagged
    Proportions {
        #[arg(long)]
        flags: PathBuf,
        /// Write the counts as JSON here
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) = ConfigResolver::new()
        .load_with_source(args.config.as_deref())
        .context("Failed to load configuration")?;
    etdrs_common::logging::init(&config.logging).context("Failed to initialize logging")?;

    info!("Starting etdrs-merge {}", env!("CARGO_PKG_VERSION"));
    source.log();
    run(args.command, &config)
}

fn run(command: Command, config: &TomlConfig) -> Result<()> {
    let loader = TextLoader::new(config.encodings.clone());
    let id_column = config.id_column.as_str();

    match command {
        Command::Merge { new, old, output } => {
            let priority = etdrs_merge::read_table(&new, &loader, id_column)?;
            let base = etdrs_merge::read_table(&old, &loader, id_column)?;
            let outcome = etdrs_merge::merge_tables(&priority, &base);
            etdrs_merge::write_table(&outcome.table, &output)?;
        }
        Command::Mask {
            target,
            noise,
            output,
            report,
        } => {
            let target_table = etdrs_merge::read_table(&target, &loader, id_column)?;
            let mask = NoiseMask::new(config.noise_flags.clone());
            let noise_table =
                etdrs_merge::read_table_with(&noise, &loader, id_column, |id, existing, incoming| {
                    mask.combine_rows(id, existing, incoming)
                })?;
            let outcome = mask.apply(&target_table, &noise_table);
            etdrs_merge::write_table(&outcome.table, &output)?;
            info!("Masked {} cell(s)", outcome.report.masked_cells);
            if let Some(path) = report {
                etdrs_merge::write_json(&outcome.report, &path)?;
            }
        }
        Command::ErrorMap {
            noise,
            output,
            digits,
        } => {
            let digit_set = DigitSet::parse(&digits)
                .ok_or_else(|| anyhow!("--digits {:?} contains no digit", digits))?;
            let style = config.column_style().context("Invalid configuration")?;
            let noise_table =
                etdrs_merge::read_table_with(&noise, &loader, id_column, etdrs_merge::combine_codes)?;
            let flags = etdrs_merge::expand_error_map(&noise_table, &digit_set, style);
            etdrs_merge::write_table(&flags, &output)?;
        }
        Command::Proportions { flags, report } => {
            let flag_table = etdrs_merge::read_table(&flags, &loader, id_column)?;
            let summary = etdrs_merge::error_proportions(&flag_table);
            summary.log();
            if let Some(path) = report {
                etdrs_merge::write_json(&summary, &path)?;
            }
        }
    }
    Ok(())
}
