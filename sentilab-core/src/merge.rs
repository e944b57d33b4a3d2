//! Alignment of enriched price series with scored ratings.
//!
//! Join key is (symbol, calendar date). Symbols match case-insensitively and
//! rating timestamps are truncated to their date before comparison. One price
//! row fans out to one merged row per rating published that day.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{symbol_key, PriceRecord};
use crate::enrich::EnrichedPriceSeries;
use crate::sentiment::{ScoredRating, ScoredRatingSet};

/// Suffix appended to rating-side columns that collide with an earlier column.
pub const COLLISION_SUFFIX: &str = "_rating";

/// Suffix appended to price-file extras that collide with a computed column.
pub const SOURCE_SUFFIX: &str = "_source";

pub const PROVENANCE_COLUMN: &str = "stock_name";

const PRICE_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];
const RATING_COLUMNS: [&str; 4] = ["date", "headline", "publisher", "symbol"];
const SENTIMENT_COLUMNS: [&str; 2] = ["sentiment_polarity", "sentiment_category"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinMode {
    /// Price days without a rating vanish.
    #[default]
    Inner,
    /// Every price day survives; unmatched days carry no rating.
    Left,
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinMode::Inner => f.write_str("inner"),
            JoinMode::Left => f.write_str("left"),
        }
    }
}

impl FromStr for JoinMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinMode::Inner),
            "left" => Ok(JoinMode::Left),
            other => Err(format!("unknown join mode '{other}' (expected inner or left)")),
        }
    }
}

/// One enriched price row joined with at most one scored rating.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub symbol: String,
    pub date: NaiveDate,
    pub price: PriceRecord,
    /// Indicator values in `MergedSchema::indicator_names` order.
    pub indicators: Vec<f64>,
    pub rating: Option<ScoredRating>,
}

impl MergedRecord {
    pub fn polarity(&self) -> Option<f64> {
        self.rating.as_ref().map(|r| r.score.polarity)
    }
}

/// Column layout of a persisted merged table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedSchema {
    columns: Vec<String>,
    indicator_names: Vec<String>,
    price_extra_count: usize,
    rating_extra_count: usize,
}

impl MergedSchema {
    /// Computed columns (provenance, indicators, sentiment) keep their names.
    /// Source columns that collide are suffixed until unique: price extras
    /// with `_source`, rating-side columns with `_rating`.
    pub fn new(price_extras: &[String], indicator_names: &[String], rating_extras: &[String]) -> Self {
        let computed: Vec<&str> = std::iter::once(PROVENANCE_COLUMN)
            .chain(indicator_names.iter().map(String::as_str))
            .chain(SENTIMENT_COLUMNS)
            .collect();

        let mut columns: Vec<String> = vec![PROVENANCE_COLUMN.to_string()];
        columns.extend(PRICE_COLUMNS.iter().map(|c| c.to_string()));
        for extra in price_extras {
            let resolved = resolve_column(extra, SOURCE_SUFFIX, &columns, &computed);
            columns.push(resolved);
        }
        columns.extend(indicator_names.iter().cloned());

        let rating_side = RATING_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(rating_extras.iter().cloned());
        for name in rating_side {
            let resolved = resolve_column(&name, COLLISION_SUFFIX, &columns, &computed);
            columns.push(resolved);
        }
        columns.extend(SENTIMENT_COLUMNS.iter().map(|c| c.to_string()));

        Self {
            columns,
            indicator_names: indicator_names.to_vec(),
            price_extra_count: price_extras.len(),
            rating_extra_count: rating_extras.len(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn indicator_names(&self) -> &[String] {
        &self.indicator_names
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    fn rating_width(&self) -> usize {
        6 + self.rating_extra_count
    }

    /// Render one record as text cells aligned with `columns()`.
    ///
    /// Undefined numbers and absent ratings render as empty cells.
    pub fn cells(&self, record: &MergedRecord) -> Vec<String> {
        let mut cells = Vec::with_capacity(self.columns.len());
        cells.push(record.symbol.clone());
        cells.push(record.date.format("%Y-%m-%d").to_string());
        let p = &record.price;
        for v in [p.open, p.high, p.low, p.close, p.volume] {
            cells.push(format_number(v));
        }
        for i in 0..self.price_extra_count {
            cells.push(p.extra.get(i).cloned().unwrap_or_default());
        }
        for i in 0..self.indicator_names.len() {
            cells.push(format_number(record.indicators.get(i).copied().unwrap_or(f64::NAN)));
        }

        match &record.rating {
            Some(scored) => {
                let r = &scored.rating;
                cells.push(r.published_at.format("%Y-%m-%d %H:%M:%S").to_string());
                cells.push(r.headline.clone());
                cells.push(r.publisher.clone());
                cells.push(r.symbol.clone());
                for i in 0..self.rating_extra_count {
                    cells.push(r.extra.get(i).cloned().unwrap_or_default());
                }
                cells.push(format_number(scored.score.polarity));
                cells.push(scored.score.category.as_str().to_string());
            }
            None => cells.extend(std::iter::repeat(String::new()).take(self.rating_width())),
        }
        cells
    }
}

fn resolve_column(name: &str, suffix: &str, taken: &[String], reserved: &[&str]) -> String {
    let mut resolved = name.to_string();
    while taken.contains(&resolved) || reserved.contains(&resolved.as_str()) {
        resolved.push_str(suffix);
    }
    resolved
}

fn format_number(v: f64) -> String {
    if v.is_finite() {
        v.to_string()
    } else {
        String::new()
    }
}

/// One symbol's merged rows and their persisted layout.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTable {
    pub symbol: String,
    pub schema: MergedSchema,
    pub rows: Vec<MergedRecord>,
}

impl MergedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of a named indicator on a row.
    pub fn indicator(&self, row: usize, name: &str) -> Option<f64> {
        let idx = self.schema.indicator_names.iter().position(|n| n == name)?;
        self.rows.get(row)?.indicators.get(idx).copied()
    }

    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub symbols_merged: Vec<String>,
    /// Price symbols with no rating for the symbol at all.
    pub symbols_without_ratings: Vec<String>,
    /// Price symbols whose ratings fall on no price date (inner join only).
    pub symbols_without_overlap: Vec<String>,
    pub unmatched_rating_symbols: Vec<String>,
    pub total_rows: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutput {
    pub tables: BTreeMap<String, MergedTable>,
    pub report: MergeReport,
}

pub fn merge(
    prices: &BTreeMap<String, EnrichedPriceSeries>,
    ratings: &ScoredRatingSet,
    mode: JoinMode,
) -> MergeOutput {
    let mut by_symbol: HashMap<String, Vec<&ScoredRating>> = HashMap::new();
    for scored in &ratings.records {
        by_symbol
            .entry(symbol_key(&scored.rating.symbol))
            .or_default()
            .push(scored);
    }

    let mut output = MergeOutput::default();
    let mut matched_keys: BTreeSet<String> = BTreeSet::new();

    for (symbol, enriched) in prices {
        let key = symbol_key(symbol);
        let symbol_ratings = by_symbol.get(&key);
        if symbol_ratings.is_some() {
            matched_keys.insert(key);
        }

        let symbol_ratings: &[&ScoredRating] = symbol_ratings.map(Vec::as_slice).unwrap_or(&[]);
        if symbol_ratings.is_empty() {
            output.report.symbols_without_ratings.push(symbol.clone());
            if mode == JoinMode::Inner {
                debug!(symbol = %symbol, "no ratings for symbol, dropped");
                continue;
            }
        }

        let table = merge_symbol(symbol, enriched, symbol_ratings, &ratings.extra_columns, mode);
        if table.is_empty() {
            if !symbol_ratings.is_empty() {
                output.report.symbols_without_overlap.push(symbol.clone());
            }
            continue;
        }

        output.report.total_rows += table.len();
        output.report.symbols_merged.push(symbol.clone());
        output.tables.insert(symbol.clone(), table);
    }

    let mut unmatched: Vec<String> = by_symbol
        .keys()
        .filter(|k| !matched_keys.contains(*k))
        .cloned()
        .collect();
    unmatched.sort();
    output.report.unmatched_rating_symbols = unmatched;

    if output.report.symbols_merged.is_empty() {
        warn!(
            price_symbols = prices.len(),
            ratings = ratings.len(),
            "no symbol produced merged rows; correlation will be undefined"
        );
    } else {
        info!(
            symbols = output.report.symbols_merged.len(),
            rows = output.report.total_rows,
            mode = %mode,
            "merged prices with ratings"
        );
    }

    output
}

fn merge_symbol(
    symbol: &str,
    enriched: &EnrichedPriceSeries,
    ratings: &[&ScoredRating],
    rating_extras: &[String],
    mode: JoinMode,
) -> MergedTable {
    let indicator_names: Vec<String> = enriched
        .indicator_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let schema = MergedSchema::new(&enriched.series.extra_columns, &indicator_names, rating_extras);

    let mut by_date: HashMap<NaiveDate, Vec<&ScoredRating>> = HashMap::new();
    for scored in ratings {
        by_date.entry(scored.rating.date()).or_default().push(scored);
    }

    let mut rows = Vec::new();
    for (i, price) in enriched.series.records.iter().enumerate() {
        let base = MergedRecord {
            symbol: symbol.to_string(),
            date: price.date,
            price: price.clone(),
            indicators: enriched.indicators.row(i),
            rating: None,
        };
        match by_date.get(&price.date) {
            Some(day) => {
                for scored in day {
                    let mut row = base.clone();
                    row.rating = Some((*scored).clone());
                    rows.push(row);
                }
            }
            None if mode == JoinMode::Left => rows.push(base),
            None => {}
        }
    }

    MergedTable {
        symbol: symbol.to_string(),
        schema,
        rows,
    }
}
