use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use song_recommender::popularity::parse_release_date;
use song_recommender::progress::{format_duration, set_log_only};
use song_recommender::safety::validate_output_path;
use song_recommender::{
    EngineConfig, HybridMode, RecommendError, RecommendationEngine, RecommendationResult,
};

#[derive(Parser)]
#[command(name = "song-recommender")]
#[command(about = "Recommend songs similar to a seed track from a catalog snapshot")]
struct Args {
    /// Catalog file (.csv, or .sqlite/.sqlite3/.db with a `tracks` table)
    #[arg(long, env = "SONG_RECOMMENDER_CATALOG", default_value = "musicdata.csv")]
    catalog: PathBuf,

    /// Engine config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hide progress bars and log progress lines instead
    #[arg(long)]
    log_only: bool,

    #[arg(long, default_value = "0")]
    workers: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Tracks with the most similar audio features
    Content {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Similar tracks re-ranked by popularity
    Hybrid {
        #[command(flatten)]
        query: QueryArgs,

        /// Similarity weight, only used in blend mode
        #[arg(long)]
        alpha: Option<f64>,

        /// Reference date for release-date decay (defaults to today)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,

        /// Override the configured hybrid mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },
    /// Find track names close to a query
    Search {
        query: String,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// List distinct track names in catalog order
    List {
        #[arg(long, default_value = "50")]
        limit: usize,
    },
}

#[derive(ClapArgs)]
struct QueryArgs {
    /// Seed track name (exact, case-sensitive)
    name: String,

    /// Number of recommendations
    #[arg(short, long)]
    k: Option<usize>,

    /// Pick among tracks sharing the seed name by artist
    #[arg(long)]
    artist: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Also write results to a JSON file
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    PopularityRerank,
    Blend,
}

impl From<ModeArg> for HybridMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::PopularityRerank => HybridMode::PopularityRerank,
            ModeArg::Blend => HybridMode::Blend,
        }
    }
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, String> {
    parse_release_date(value).ok_or_else(|| format!("'{value}' is not a YYYY-MM-DD date"))
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config file: {:?}", path))?,
        None => EngineConfig::default(),
    };
    if let Command::Hybrid {
        mode: Some(mode), ..
    } = &args.command
    {
        config.hybrid_mode = (*mode).into();
    }
    Ok(config)
}

/// Print a recoverable query error with suggestions and exit non-zero.
fn report_query_error(engine: &RecommendationEngine, name: &str, err: &RecommendError) -> ! {
    eprintln!("{err}");
    if matches!(err, RecommendError::TrackNotFound(_)) {
        let suggestions = engine.suggest(name);
        if !suggestions.is_empty() {
            eprintln!("Did you mean:");
            for track in suggestions {
                eprintln!("  {} - {}", track.name, track.artists);
            }
        }
    }
    std::process::exit(1);
}

fn print_results(kind: &str, seed: &str, results: &[RecommendationResult]) {
    println!("\n{} recommendations for '{}':", kind, seed);
    println!("{:-<80}", "");

    if results.is_empty() {
        println!("No recommendations available.");
        return;
    }

    for (i, r) in results.iter().enumerate() {
        println!(
            "{:>2}. {} - {} ({}) [{}] popularity={:.0} similarity={:.3} score={:.3}",
            i + 1,
            r.artists,
            r.name,
            r.album,
            r.release_date,
            r.popularity,
            r.similarity,
            r.score
        );
    }
}

fn emit(
    kind: &str,
    query: &QueryArgs,
    catalog: &Path,
    results: &[RecommendationResult],
) -> Result<()> {
    if query.json {
        println!("{}", serde_json::to_string_pretty(results)?);
    } else {
        print_results(kind, &query.name, results);
    }

    if let Some(output) = &query.output {
        validate_output_path(output, &[catalog])?;
        std::fs::write(output, serde_json::to_string_pretty(results)?)
            .with_context(|| format!("Failed to write output file: {:?}", output))?;
        info!("Wrote {} results to {}", results.len(), output.display());
    }
    Ok(())
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

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let config = load_config(&args)?;
    let start = Instant::now();
    let engine = RecommendationEngine::load(&args.catalog, config)
        .with_context(|| format!("Failed to load catalog: {:?}", args.catalog))?;
    info!(
        "Engine ready: {} tracks in {}",
        engine.catalog().len(),
        format_duration(start.elapsed())
    );

    match &args.command {
        Command::Content { query } => {
            let k = query.k.unwrap_or(engine.config().default_k);
            let outcome = engine
                .catalog()
                .resolve(&query.name, query.artist.as_deref())
                .and_then(|seed| engine.content_based_by_index(seed, k));
            match outcome {
                Ok(results) => emit("Content-based", query, &args.catalog, &results)?,
                Err(err) if err.is_recoverable() => report_query_error(&engine, &query.name, &err),
                Err(err) => return Err(err.into()),
            }
        }
        Command::Hybrid {
            query,
            alpha,
            today,
            ..
        } => {
            let k = query.k.unwrap_or(engine.config().default_k);
            let alpha = alpha.unwrap_or(engine.config().default_alpha);
            let now = today.unwrap_or_else(|| Local::now().date_naive());
            if engine.config().hybrid_mode == HybridMode::PopularityRerank
                && alpha != engine.config().default_alpha
            {
                warn!("--alpha has no effect in popularity_rerank mode");
            }
            let outcome = engine
                .catalog()
                .resolve(&query.name, query.artist.as_deref())
                .and_then(|seed| engine.hybrid_by_index(seed, k, alpha, now));
            match outcome {
                Ok(results) => emit("Hybrid", query, &args.catalog, &results)?,
                Err(err) if err.is_recoverable() => report_query_error(&engine, &query.name, &err),
                Err(err) => return Err(err.into()),
            }
        }
        Command::Search { query, limit } => {
            let limit = limit.unwrap_or(engine.config().suggestion_limit);
            let matches = engine
                .catalog()
                .suggest(query, limit, engine.config().min_suggestion_score);
            if matches.is_empty() {
                println!("No tracks match '{}'.", query);
            }
            for (track, score) in matches {
                let count = engine.catalog().find_all(&track.name).len();
                println!(
                    "{:.3}  {} - {} ({} row{})",
                    score,
                    track.name,
                    track.artists,
                    count,
                    if count == 1 { "" } else { "s" }
                );
            }
        }
        Command::List { limit } => {
            for name in engine.catalog().unique_names().into_iter().take(*limit) {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
