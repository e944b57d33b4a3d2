//! Pipeline runner: ingest → enrich → score → merge → analyse → persist.
//!
//! Configuration and input problems abort before any processing. Everything
//! after ingestion is collect-and-continue: per-symbol export failures and an
//! undefined correlation end up in the summary, not in an error.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use sentilab_core::data::{DataIngestor, IngestError, IngestReport, RatingReport};
use sentilab_core::domain::{PriceSeries, RatingSet};
use sentilab_core::enrich::{enrich_all, EnrichedPriceSeries, IndicatorConfigError};
use sentilab_core::merge::{merge, JoinMode, MergeOutput, MergeReport};
use sentilab_core::sentiment::{score_ratings, PolarityScorer, VaderScorer};

use crate::config::{ConfigError, PipelineConfig};
use crate::correlation::{
    correlate_move, observations_from_tables, CorrelationResult, CorrelationScope, Observation,
    PriceMove, RETURN_COLUMN,
};
use crate::eda::RatingsOverview;
use crate::export::{export_tables, write_summary};
use crate::stats::{describe, Summary};

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Errors that stop a run before it produces anything.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Ingest(#[from] IngestError),
    #[error("indicator error: {0}")]
    Indicators(#[from] IndicatorConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFileSummary {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub files_seen: usize,
    pub files_loaded: usize,
    pub skipped: Vec<SkippedFileSummary>,
    pub price_rows_dropped: usize,
    pub duplicate_dates: usize,
    pub ratings_read: usize,
    pub ratings_loaded: usize,
    pub ratings_dropped: usize,
    pub duplicate_ratings: usize,
    /// Blank cells per price column, summed over loaded files.
    pub price_missing_cells: BTreeMap<String, usize>,
    pub rating_missing_cells: BTreeMap<String, usize>,
}

impl IngestSummary {
    fn new(prices: &IngestReport, ratings: &RatingReport, ratings_loaded: usize) -> Self {
        Self {
            files_seen: prices.files_seen,
            files_loaded: prices.files_loaded,
            skipped: prices
                .skipped
                .iter()
                .map(|s| SkippedFileSummary {
                    path: s.path.clone(),
                    reason: s.reason.clone(),
                })
                .collect(),
            price_rows_dropped: prices.rows_dropped,
            duplicate_dates: prices.duplicate_dates,
            ratings_read: ratings.rows_read,
            ratings_loaded,
            ratings_dropped: ratings.rows_dropped,
            duplicate_ratings: ratings.duplicates_removed,
            price_missing_cells: prices.missing_cells.clone(),
            rating_missing_cells: ratings.missing_cells.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CorrelationOutcome {
    Computed {
        scope: CorrelationScope,
        #[serde(default)]
        measure: PriceMove,
        coefficient: f64,
        days: usize,
    },
    Undefined {
        scope: CorrelationScope,
        #[serde(default)]
        measure: PriceMove,
        reason: String,
    },
}

impl CorrelationOutcome {
    pub fn coefficient(&self) -> Option<f64> {
        match self {
            CorrelationOutcome::Computed { coefficient, .. } => Some(*coefficient),
            CorrelationOutcome::Undefined { .. } => None,
        }
    }
}

impl From<&CorrelationResult> for CorrelationOutcome {
    fn from(r: &CorrelationResult) -> Self {
        CorrelationOutcome::Computed {
            scope: r.scope.clone(),
            measure: r.measure,
            coefficient: r.coefficient,
            days: r.days,
        }
    }
}

/// Everything a run produced, as persisted to `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub dataset_hash: String,
    pub join: JoinMode,
    pub ingest: IngestSummary,
    pub merge: MergeReport,
    /// Sentiment against the close-to-close return.
    pub correlation: CorrelationOutcome,
    /// Sentiment against the open-to-close change.
    pub intraday_correlation: CorrelationOutcome,
    /// Daily-return statistics per loaded symbol.
    pub return_stats: BTreeMap<String, Summary>,
    pub overview: RatingsOverview,
    pub outputs: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Run with the VADER headline scorer.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunSummary, RunError> {
    run_pipeline_with_scorer(config, &VaderScorer::new())
}

pub fn run_pipeline_with_scorer(
    config: &PipelineConfig,
    scorer: &dyn PolarityScorer,
) -> Result<RunSummary, RunError> {
    config.validate()?;

    let ingestor = DataIngestor::new(config.ingest_options());
    let prices = ingestor.load_price_directory(&config.input.price_dir)?;
    let ratings = ingestor.load_ratings(&config.input.ratings_file)?;
    let dataset_hash = compute_dataset_hash(&prices.series, &ratings.ratings);
    let ingest = IngestSummary::new(&prices.report, &ratings.report, ratings.ratings.len());
    let mut warnings: Vec<String> = ingest
        .skipped
        .iter()
        .map(|s| format!("skipped {}: {}", s.path.display(), s.reason))
        .collect();

    let enriched = enrich_all(prices.series, &config.indicators)?;
    let return_stats = return_statistics(&enriched);

    info!("performing sentiment analysis on {} headlines", ratings.ratings.len());
    let scored = score_ratings(&ratings.ratings, scorer, &config.sentiment);
    let overview = RatingsOverview::compute(&scored);

    let MergeOutput { tables, report } = merge(&enriched, &scored, config.merge.join);
    if report.symbols_merged.is_empty() {
        warnings.push("no symbol produced merged rows".to_string());
    }

    let scope = CorrelationScope::from_option(config.analysis.correlation_symbol.as_deref());
    let observations = observations_from_tables(tables.values());
    let correlation =
        correlation_outcome(&observations, &scope, PriceMove::DailyReturn, &mut warnings);
    let intraday_correlation =
        correlation_outcome(&observations, &scope, PriceMove::IntradayChange, &mut warnings);

    let exported = export_tables(&tables, &config.output.dir, &config.output.file_suffix);
    warnings.extend(exported.failures);

    let summary = RunSummary {
        schema_version: SCHEMA_VERSION,
        dataset_hash,
        join: config.merge.join,
        ingest,
        merge: report,
        correlation,
        intraday_correlation,
        return_stats,
        overview,
        outputs: exported.written,
        warnings,
    };

    if config.output.write_summary {
        match write_summary(&summary, &config.output.dir) {
            Ok(path) => info!("wrote run summary to {}", path.display()),
            Err(e) => warn!("failed to write run summary: {e:#}"),
        }
    }
    Ok(summary)
}

fn correlation_outcome(
    observations: &[Observation],
    scope: &CorrelationScope,
    measure: PriceMove,
    warnings: &mut Vec<String>,
) -> CorrelationOutcome {
    match correlate_move(observations, scope.clone(), measure) {
        Ok(result) => {
            info!(
                days = result.days,
                measure = measure.column(),
                "Pearson correlation coefficient: {:.4}",
                result.coefficient
            );
            CorrelationOutcome::from(&result)
        }
        Err(e) => {
            warn!(measure = measure.column(), "correlation undefined: {e}");
            warnings.push(format!("{} correlation undefined: {e}", measure.column()));
            CorrelationOutcome::Undefined {
                scope: scope.clone(),
                measure,
                reason: e.to_string(),
            }
        }
    }
}

fn return_statistics(enriched: &BTreeMap<String, EnrichedPriceSeries>) -> BTreeMap<String, Summary> {
    enriched
        .iter()
        .filter_map(|(symbol, e)| {
            let returns = e.indicators.get_series(RETURN_COLUMN)?;
            describe(returns).map(|s| (symbol.clone(), s))
        })
        .collect()
}

/// BLAKE3 over every loaded price row and rating, in deterministic order.
pub fn compute_dataset_hash(series: &BTreeMap<String, PriceSeries>, ratings: &RatingSet) -> String {
    let mut hasher = blake3::Hasher::new();

    for (symbol, s) in series {
        hasher.update(symbol.as_bytes());
        for r in &s.records {
            hasher.update(r.date.to_string().as_bytes());
            hasher.update(&r.open.to_le_bytes());
            hasher.update(&r.high.to_le_bytes());
            hasher.update(&r.low.to_le_bytes());
            hasher.update(&r.close.to_le_bytes());
            hasher.update(&r.volume.to_le_bytes());
        }
    }
    for r in &ratings.records {
        hasher.update(r.published_at.to_string().as_bytes());
        hasher.update(r.symbol.as_bytes());
        hasher.update(r.publisher.as_bytes());
        hasher.update(r.headline.as_bytes());
    }

    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sentilab_core::domain::PriceRecord;

    fn series(close: f64) -> BTreeMap<String, PriceSeries> {
        let record = PriceRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 10.0,
            extra: vec![],
        };
        let mut map = BTreeMap::new();
        map.insert("AAA".to_string(), PriceSeries::new("AAA", vec![], vec![record]));
        map
    }

    #[test]
    fn dataset_hash_is_deterministic_and_sensitive() {
        let ratings = RatingSet::default();
        let a = compute_dataset_hash(&series(10.0), &ratings);
        let b = compute_dataset_hash(&series(10.0), &ratings);
        let c = compute_dataset_hash(&series(10.5), &ratings);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = CorrelationOutcome::Undefined {
            scope: CorrelationScope::AllSymbols,
            measure: PriceMove::IntradayChange,
            reason: "x".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"status\":\"undefined\""));
        assert!(json.contains("\"measure\":\"intraday_change\""));
        assert_eq!(outcome.coefficient(), None);
    }

    #[test]
    fn outcome_without_measure_defaults_to_daily_return() {
        let json = r#"{"status":"computed","scope":{"scope":"all_symbols"},"coefficient":0.5,"days":3}"#;
        let outcome: CorrelationOutcome = serde_json::from_str(json).unwrap();
        assert_eq!(
            outcome,
            CorrelationOutcome::Computed {
                scope: CorrelationScope::AllSymbols,
                measure: PriceMove::DailyReturn,
                coefficient: 0.5,
                days: 3,
            }
        );
    }
}
