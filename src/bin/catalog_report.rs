//! Report catalog statistics before serving recommendations from it:
//! duplicate names, feature ranges, constant columns, bad release dates.
//!
//! Usage: catalog-report <musicdata.csv> [--output report.json]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use song_recommender::progress::set_log_only;
use song_recommender::safety::validate_output_path;
use song_recommender::{EngineConfig, RecommendationEngine};

#[derive(Parser)]
#[command(name = "catalog-report")]
#[command(about = "Print statistics for a song catalog as JSON")]
struct Args {
    catalog: PathBuf,

    /// Write the report to a JSON file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    set_log_only(args.log_only);

    let engine = RecommendationEngine::load(&args.catalog, EngineConfig::default())
        .with_context(|| format!("Failed to load catalog: {:?}", args.catalog))?;
    let stats = engine.stats();

    if stats.duplicated_names > 0 {
        warn!(
            "{} names are shared by {} rows ({:.1}%), lookups use the first row",
            stats.duplicated_names,
            stats.rows_with_shared_name,
            stats.duplicate_rate()
        );
    }
    if stats.invalid_release_dates > 0 {
        warn!(
            "{} tracks have unparsable release dates, hybrid queries seeded on them will fail",
            stats.invalid_release_dates
        );
    }

    match &args.output {
        Some(output) => {
            validate_output_path(output, &[&args.catalog])?;
            stats.write_to_file(output)?;
            info!("Report written to {}", output.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&stats)?),
    }

    Ok(())
}
