//! SentiLab CLI: run the news/price pipeline and its analyses.
//!
//! Commands:
//! - `run`: ingest, enrich, merge, correlate and persist, from a TOML config and/or flags
//! - `correlate`: recompute the sentiment/return correlation from persisted merged tables
//! - `overview`: ratings overview for a single ratings file
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sentilab_core::data::{DataIngestor, IngestOptions};
use sentilab_core::merge::JoinMode;
use sentilab_core::sentiment::{score_ratings, SentimentThresholds, VaderScorer};
use sentilab_runner::correlation::{correlate_move, CorrelationScope, PriceMove};
use sentilab_runner::export::read_observation_dir;
use sentilab_runner::{run_pipeline, CorrelationOutcome, PipelineConfig, RatingsOverview, RunSummary};

#[derive(Parser)]
#[command(
    name = "sentilab",
    about = "SentiLab CLI: financial news sentiment vs. stock returns"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum JoinArg {
    Inner,
    Left,
}

impl From<JoinArg> for JoinMode {
    fn from(arg: JoinArg) -> Self {
        match arg {
            JoinArg::Inner => JoinMode::Inner,
            JoinArg::Left => JoinMode::Left,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MeasureArg {
    DailyReturn,
    IntradayChange,
}

impl From<MeasureArg> for PriceMove {
    fn from(arg: MeasureArg) -> Self {
        match arg {
            MeasureArg::DailyReturn => PriceMove::DailyReturn,
            MeasureArg::IntradayChange => PriceMove::IntradayChange,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline. Flags override values from --config.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory of per-symbol price files.
        #[arg(long)]
        prices: Option<PathBuf>,

        /// Analyst ratings file.
        #[arg(long)]
        ratings: Option<PathBuf>,

        /// Output directory for merged tables and summary.json.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Join mode for prices without a rating on the same day.
        #[arg(long, value_enum)]
        join: Option<JoinArg>,

        /// Restrict the correlation to one symbol.
        #[arg(long)]
        symbol: Option<String>,

        /// Read price files one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Print the run summary as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Recompute the correlation from persisted merged tables.
    Correlate {
        /// Directory holding `*_processed.csv` files.
        #[arg(long)]
        merged_dir: PathBuf,

        /// Restrict the correlation to one symbol.
        #[arg(long)]
        symbol: Option<String>,

        /// Price move compared against sentiment.
        #[arg(long, value_enum, default_value = "daily-return")]
        measure: MeasureArg,
    },
    /// Summarize a ratings file: publishers, timing, symbols, sentiment.
    Overview {
        /// Analyst ratings file.
        #[arg(long)]
        ratings: PathBuf,

        /// Polarity band treated as neutral, in [0, 1).
        #[arg(long, default_value_t = 0.0)]
        neutral_band: f64,

        /// Print the overview as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            prices,
            ratings,
            output,
            join,
            symbol,
            sequential,
            json,
        } => {
            let mut cfg = match config {
                Some(path) => {
                    info!("loading config from {}", path.display());
                    PipelineConfig::from_file(&path)?
                }
                None => PipelineConfig::default(),
            };
            if let Some(p) = prices {
                cfg.input.price_dir = p;
            }
            if let Some(r) = ratings {
                cfg.input.ratings_file = r;
            }
            if let Some(o) = output {
                cfg.output.dir = o;
            }
            if let Some(j) = join {
                cfg.merge.join = j.into();
            }
            if symbol.is_some() {
                cfg.analysis.correlation_symbol = symbol;
            }
            if sequential {
                cfg.ingest.parallel = false;
            }
            run_cmd(&cfg, json)
        }
        Commands::Correlate {
            merged_dir,
            symbol,
            measure,
        } => run_correlate(merged_dir, symbol, measure.into()),
        Commands::Overview {
            ratings,
            neutral_band,
            json,
        } => run_overview(ratings, neutral_band, json),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_cmd(config: &PipelineConfig, json: bool) -> Result<()> {
    let summary = run_pipeline(config).context("pipeline run failed")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn run_correlate(merged_dir: PathBuf, symbol: Option<String>, measure: PriceMove) -> Result<()> {
    let observations = read_observation_dir(&merged_dir)
        .with_context(|| format!("failed to read merged tables from {}", merged_dir.display()))?;
    let scope = CorrelationScope::from_option(symbol.as_deref());

    match correlate_move(&observations, scope, measure) {
        Ok(result) => {
            println!("Measure:        {}", measure.column());
            println!("Days:           {}", result.days);
            println!("Pearson r:      {:.4}", result.coefficient);
        }
        Err(e) => println!("Correlation undefined: {e}"),
    }
    Ok(())
}

fn run_overview(ratings: PathBuf, neutral_band: f64, json: bool) -> Result<()> {
    let loaded = DataIngestor::new(IngestOptions::default())
        .load_ratings(&ratings)
        .with_context(|| format!("failed to load {}", ratings.display()))?;
    let thresholds = SentimentThresholds::new(neutral_band).context("invalid --neutral-band")?;
    let scored = score_ratings(&loaded.ratings, &VaderScorer::new(), &thresholds);
    let overview = RatingsOverview::compute(&scored);

    if json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
    } else {
        print_overview(&overview);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("=== Run Summary ===");
    println!("Dataset:        {}", &summary.dataset_hash[..16.min(summary.dataset_hash.len())]);
    println!(
        "Price files:    {} loaded / {} seen",
        summary.ingest.files_loaded, summary.ingest.files_seen
    );
    println!(
        "Ratings:        {} ({} dropped, {} duplicates)",
        summary.ingest.ratings_loaded, summary.ingest.ratings_dropped, summary.ingest.duplicate_ratings
    );
    println!("Join:           {}", summary.join);
    println!("Symbols merged: {}", summary.merge.symbols_merged.len());
    println!("Merged rows:    {}", summary.merge.total_rows);
    println!();
    println!("--- Correlation ---");
    print_outcome("Daily return", &summary.correlation);
    print_outcome("Intraday", &summary.intraday_correlation);
    let missing: usize = summary.ingest.price_missing_cells.values().sum::<usize>()
        + summary.ingest.rating_missing_cells.values().sum::<usize>();
    if missing > 0 {
        println!();
        println!("--- Missing cells ---");
        for (column, n) in &summary.ingest.price_missing_cells {
            println!("{n:>8}  prices.{column}");
        }
        for (column, n) in &summary.ingest.rating_missing_cells {
            println!("{n:>8}  ratings.{column}");
        }
    }
    if let Some(len) = &summary.overview.headline_length {
        println!();
        println!("--- Headlines ---");
        println!("Mean length:    {:.1} chars", len.mean);
        println!("Median length:  {:.0} chars", len.median);
    }
    println!();
    for path in &summary.outputs {
        println!("Wrote {}", path.display());
    }
    for warn in &summary.warnings {
        println!("WARNING: {warn}");
    }
}

fn print_outcome(label: &str, outcome: &CorrelationOutcome) {
    match outcome {
        CorrelationOutcome::Computed {
            coefficient, days, ..
        } => println!("{label:<15} r = {coefficient:.4} over {days} days"),
        CorrelationOutcome::Undefined { reason, .. } => println!("{label:<15} undefined: {reason}"),
    }
}

fn print_overview(overview: &RatingsOverview) {
    println!();
    println!("=== Ratings Overview ===");
    println!("Ratings:        {}", overview.total);
    if let Some(len) = &overview.headline_length {
        println!(
            "Headline len:   mean {:.1}, std {:.1}, min {}, max {}",
            len.mean, len.std, len.min, len.max
        );
    }
    if let Some(hour) = overview.peak_hour {
        println!("Peak hour:      {hour:02}:00");
    }
    println!("Spike days:     {}", overview.spike_days.len());

    println!();
    println!("--- Top publishers ---");
    for entry in overview.top_publishers(10) {
        println!("{:>8}  {}", entry.count, entry.key);
    }
    if !overview.publisher_domains.is_empty() {
        println!();
        println!("--- Publisher domains ---");
        for entry in overview.publisher_domains.iter().take(10) {
            println!("{:>8}  {}", entry.count, entry.key);
        }
    }
    println!();
    println!("--- Sentiment ---");
    for (category, count) in &overview.sentiment {
        println!("{:>8}  {category}", count);
    }
}
