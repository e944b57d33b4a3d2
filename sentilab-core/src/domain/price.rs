//! PriceRecord: one trading day for one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV row for a single symbol on a single calendar date.
///
/// `extra` holds the raw text of every non-required source column, aligned
/// with the owning series' `extra_columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub extra: Vec<String>,
}

impl PriceRecord {
    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }
}

/// Ordered price history for one symbol.
///
/// Records are sorted by date ascending and unique per date once they leave
/// ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub extra_columns: Vec<String>,
    pub records: Vec<PriceRecord>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, extra_columns: Vec<String>, records: Vec<PriceRecord>) -> Self {
        Self {
            symbol: symbol.into(),
            extra_columns,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// Dates strictly increasing after ingestion.
    pub fn is_canonical(&self) -> bool {
        self.records.windows(2).all(|w| w[0].date < w[1].date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: u32, close: f64) -> PriceRecord {
        PriceRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
            extra: Vec::new(),
        }
    }

    #[test]
    fn canonical_requires_strictly_increasing_dates() {
        let series = PriceSeries::new("SPY", vec![], vec![record(2, 1.0), record(3, 2.0)]);
        assert!(series.is_canonical());

        let dup = PriceSeries::new("SPY", vec![], vec![record(2, 1.0), record(2, 2.0)]);
        assert!(!dup.is_canonical());
    }

    #[test]
    fn date_bounds() {
        let series = PriceSeries::new("SPY", vec![], vec![record(2, 1.0), record(5, 2.0)]);
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2024, 1, 5));
        assert!(PriceSeries::default().first_date().is_none());
    }

    #[test]
    fn void_detection() {
        let mut r = record(2, 10.0);
        assert!(!r.is_void());
        r.close = f64::NAN;
        assert!(r.is_void());
    }
}
