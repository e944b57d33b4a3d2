//! Daily sentiment vs. price move correlation.
//!
//! The price move is the close-to-close return or the open-to-close change.
//! Polarity is averaged over every headline published on a date. Moves are
//! averaged over distinct (symbol, date) price rows, so a price day that fans
//! out to several headlines counts once. The two daily series are inner-joined
//! on date before the Pearson coefficient is taken.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sentilab_core::domain::symbol_key;
use sentilab_core::merge::MergedTable;

use crate::stats::{pearson, std_dev};

pub const RETURN_COLUMN: &str = "daily_return";
pub const INTRADAY_COLUMN: &str = "price_change_pct";
pub const POLARITY_COLUMN: &str = "sentiment_polarity";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CorrelationError {
    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("need at least 2 days with both sentiment and price moves, found {0}")]
    InsufficientData(usize),

    #[error("{0} series is constant; correlation is undefined")]
    ZeroVariance(&'static str),

    #[error("failed to read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },
}

/// One merged row reduced to the fields the correlation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub symbol: String,
    pub date: NaiveDate,
    pub polarity: Option<f64>,
    pub daily_return: Option<f64>,
    /// Open-to-close change in percent.
    #[serde(default)]
    pub intraday_change: Option<f64>,
}

/// Price series the daily sentiment is compared against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceMove {
    #[default]
    DailyReturn,
    IntradayChange,
}

impl PriceMove {
    pub fn column(self) -> &'static str {
        match self {
            PriceMove::DailyReturn => RETURN_COLUMN,
            PriceMove::IntradayChange => INTRADAY_COLUMN,
        }
    }

    fn label(self) -> &'static str {
        match self {
            PriceMove::DailyReturn => "return",
            PriceMove::IntradayChange => "intraday change",
        }
    }

    fn of(self, obs: &Observation) -> Option<f64> {
        match self {
            PriceMove::DailyReturn => obs.daily_return,
            PriceMove::IntradayChange => obs.intraday_change,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "symbol", rename_all = "snake_case")]
pub enum CorrelationScope {
    #[default]
    AllSymbols,
    Symbol(String),
}

impl CorrelationScope {
    pub fn from_option(symbol: Option<&str>) -> Self {
        match symbol {
            Some(s) => CorrelationScope::Symbol(s.to_string()),
            None => CorrelationScope::AllSymbols,
        }
    }

    fn includes(&self, symbol: &str) -> bool {
        match self {
            CorrelationScope::AllSymbols => true,
            CorrelationScope::Symbol(s) => symbol_key(s) == symbol_key(symbol),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub mean_polarity: f64,
    /// Mean of the selected price move.
    pub mean_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub scope: CorrelationScope,
    pub measure: PriceMove,
    pub coefficient: f64,
    pub days: usize,
    pub points: Vec<DailyPoint>,
}

/// Rows of merged tables as observations. Undefined moves become `None`.
pub fn observations_from_tables<'a>(
    tables: impl IntoIterator<Item = &'a MergedTable>,
) -> Vec<Observation> {
    let mut out = Vec::new();
    for table in tables {
        let names = table.schema.indicator_names();
        let ret_idx = names.iter().position(|n| n == RETURN_COLUMN);
        let intraday_idx = names.iter().position(|n| n == INTRADAY_COLUMN);
        for row in &table.rows {
            let value = |idx: Option<usize>| {
                idx.and_then(|i| row.indicators.get(i).copied())
                    .filter(|v| v.is_finite())
            };
            out.push(Observation {
                symbol: row.symbol.clone(),
                date: row.date,
                polarity: row.polarity(),
                daily_return: value(ret_idx),
                intraday_change: value(intraday_idx),
            });
        }
    }
    out
}

/// The daily series that would feed the coefficient, joined on date.
pub fn daily_points(
    observations: &[Observation],
    scope: &CorrelationScope,
    measure: PriceMove,
) -> Vec<DailyPoint> {
    let mut polarity: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    let mut returns: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    let mut seen_price_rows: BTreeSet<(String, NaiveDate)> = BTreeSet::new();

    for obs in observations.iter().filter(|o| scope.includes(&o.symbol)) {
        if let Some(p) = obs.polarity.filter(|p| p.is_finite()) {
            let e = polarity.entry(obs.date).or_insert((0.0, 0));
            e.0 += p;
            e.1 += 1;
        }
        if let Some(r) = measure.of(obs) {
            if seen_price_rows.insert((symbol_key(&obs.symbol), obs.date)) {
                let e = returns.entry(obs.date).or_insert((0.0, 0));
                e.0 += r;
                e.1 += 1;
            }
        }
    }

    polarity
        .into_iter()
        .filter_map(|(date, (psum, pn))| {
            let (rsum, rn) = returns.get(&date)?;
            Some(DailyPoint {
                date,
                mean_polarity: psum / pn as f64,
                mean_return: rsum / *rn as f64,
            })
        })
        .collect()
}

/// Sentiment against the close-to-close return.
pub fn correlate(
    observations: &[Observation],
    scope: CorrelationScope,
) -> Result<CorrelationResult, CorrelationError> {
    correlate_move(observations, scope, PriceMove::DailyReturn)
}

pub fn correlate_move(
    observations: &[Observation],
    scope: CorrelationScope,
    measure: PriceMove,
) -> Result<CorrelationResult, CorrelationError> {
    let points = daily_points(observations, &scope, measure);
    if points.len() < 2 {
        return Err(CorrelationError::InsufficientData(points.len()));
    }

    let xs: Vec<f64> = points.iter().map(|p| p.mean_polarity).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.mean_return).collect();
    if std_dev(&xs) == 0.0 {
        return Err(CorrelationError::ZeroVariance("sentiment"));
    }
    if std_dev(&ys) == 0.0 {
        return Err(CorrelationError::ZeroVariance(measure.label()));
    }
    let coefficient = pearson(&xs, &ys).ok_or(CorrelationError::InsufficientData(points.len()))?;

    Ok(CorrelationResult {
        scope,
        measure,
        coefficient,
        days: points.len(),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn obs(symbol: &str, d: u32, polarity: Option<f64>, ret: Option<f64>) -> Observation {
        Observation {
            symbol: symbol.into(),
            date: day(d),
            polarity,
            daily_return: ret,
            intraday_change: None,
        }
    }

    #[test]
    fn fanned_out_price_row_counts_once() {
        let observations = vec![
            obs("AAA", 1, Some(0.2), Some(0.01)),
            obs("AAA", 1, Some(0.4), Some(0.01)),
            obs("BBB", 1, Some(0.0), Some(0.03)),
        ];
        let points = daily_points(&observations, &CorrelationScope::AllSymbols, PriceMove::DailyReturn);
        assert_eq!(points.len(), 1);
        assert!((points[0].mean_polarity - 0.2).abs() < 1e-12);
        assert!((points[0].mean_return - 0.02).abs() < 1e-12);
    }

    #[test]
    fn scope_restricts_symbol_case_insensitively() {
        let observations = vec![
            obs("AAA", 1, Some(0.2), Some(0.01)),
            obs("BBB", 1, Some(-0.8), Some(0.05)),
        ];
        let points = daily_points(
            &observations,
            &CorrelationScope::Symbol("aaa".into()),
            PriceMove::DailyReturn,
        );
        assert_eq!(points.len(), 1);
        assert!((points[0].mean_return - 0.01).abs() < 1e-12);
    }

    #[test]
    fn days_without_both_series_are_dropped() {
        let observations = vec![
            obs("AAA", 1, Some(0.2), None),
            obs("AAA", 2, None, Some(0.01)),
            obs("AAA", 3, Some(0.1), Some(0.02)),
        ];
        let points = daily_points(&observations, &CorrelationScope::AllSymbols, PriceMove::DailyReturn);
        assert_eq!(points.iter().map(|p| p.date).collect::<Vec<_>>(), vec![day(3)]);
    }

    #[test]
    fn perfect_and_inverse_relationships() {
        let up: Vec<Observation> = (1..=6)
            .map(|d| obs("AAA", d, Some(d as f64 / 10.0), Some(d as f64 / 100.0)))
            .collect();
        let r = correlate(&up, CorrelationScope::AllSymbols).unwrap();
        assert!((r.coefficient - 1.0).abs() < 0.01);
        assert_eq!(r.days, 6);

        let down: Vec<Observation> = (1..=6)
            .map(|d| obs("AAA", d, Some(d as f64 / 10.0), Some(-(d as f64) / 100.0)))
            .collect();
        let r = correlate(&down, CorrelationScope::AllSymbols).unwrap();
        assert!((r.coefficient + 1.0).abs() < 0.01);
    }

    #[test]
    fn too_few_days_is_reported() {
        let observations = vec![obs("AAA", 1, Some(0.2), Some(0.01))];
        assert_eq!(
            correlate(&observations, CorrelationScope::AllSymbols),
            Err(CorrelationError::InsufficientData(1))
        );
        assert_eq!(
            correlate(&[], CorrelationScope::AllSymbols),
            Err(CorrelationError::InsufficientData(0))
        );
    }

    #[test]
    fn constant_sentiment_is_reported() {
        let observations: Vec<Observation> = (1..=4)
            .map(|d| obs("AAA", d, Some(0.0), Some(d as f64 / 100.0)))
            .collect();
        assert_eq!(
            correlate(&observations, CorrelationScope::AllSymbols),
            Err(CorrelationError::ZeroVariance("sentiment"))
        );
    }

    #[test]
    fn intraday_change_is_an_alternative_measure() {
        let observations: Vec<Observation> = (1..=5)
            .map(|d| Observation {
                intraday_change: Some(-(d as f64)),
                ..obs("AAA", d, Some(d as f64 / 10.0), Some(0.0))
            })
            .collect();
        let r = correlate_move(&observations, CorrelationScope::AllSymbols, PriceMove::IntradayChange)
            .unwrap();
        assert_eq!(r.measure, PriceMove::IntradayChange);
        assert!((r.coefficient + 1.0).abs() < 1e-9);
        assert_eq!(
            correlate(&observations, CorrelationScope::AllSymbols),
            Err(CorrelationError::ZeroVariance("return"))
        );
    }

    #[test]
    fn missing_intraday_values_leave_no_days() {
        let observations: Vec<Observation> = (1..=3)
            .map(|d| obs("AAA", d, Some(d as f64), Some(d as f64)))
            .collect();
        assert_eq!(
            correlate_move(&observations, CorrelationScope::AllSymbols, PriceMove::IntradayChange),
            Err(CorrelationError::InsufficientData(0))
        );
    }
}
