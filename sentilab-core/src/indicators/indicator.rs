//! Indicator trait and the ordered container of computed indicator columns.
//!
//! Indicators are pure functions: price history in, numeric series out.
//! They are computed once per symbol before the merge.

use crate::domain::PriceRecord;

/// Trait for indicators.
///
/// Indicators take a full, date-sorted series and produce a numeric output
/// series of the same length. Undefined values (warm-up rows) are `f64::NAN`.
///
/// No indicator value at row t may depend on row t+1 or later.
pub trait Indicator: Send + Sync {
    /// Column name (e.g., "sma_20", "rsi_14").
    fn name(&self) -> &str;

    /// Number of leading rows that are always undefined.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire series.
    fn compute(&self, records: &[PriceRecord]) -> Vec<f64>;
}

/// Named indicator columns in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorValues {
    series: Vec<(String, Vec<f64>)>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a named column, replacing an existing column of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        let name = name.into();
        match self.series.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.series.push((name, values)),
        }
    }

    /// Value of a named column at a row.
    pub fn get(&self, name: &str, row: usize) -> Option<f64> {
        self.get_series(name).and_then(|v| v.get(row).copied())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn names(&self) -> Vec<&str> {
        self.series.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// All column values at one row, in column order.
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.series
            .iter()
            .map(|(_, v)| v.get(row).copied().unwrap_or(f64::NAN))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut iv = IndicatorValues::new();
        iv.insert(
            "sma_20",
            vec![f64::NAN; 19].into_iter().chain(vec![100.0, 101.0]).collect(),
        );
        assert!(iv.get("sma_20", 0).unwrap().is_nan());
        assert_eq!(iv.get("sma_20", 19), Some(100.0));
        assert_eq!(iv.get("sma_20", 20), Some(101.0));
        assert_eq!(iv.get("sma_20", 21), None);
        assert_eq!(iv.get("nonexistent", 0), None);
    }

    #[test]
    fn preserves_insertion_order_and_replaces_in_place() {
        let mut iv = IndicatorValues::new();
        iv.insert("rsi_14", vec![1.0]);
        iv.insert("macd", vec![2.0]);
        iv.insert("rsi_14", vec![3.0]);
        assert_eq!(iv.names(), vec!["rsi_14", "macd"]);
        assert_eq!(iv.row(0), vec![3.0, 2.0]);
        assert_eq!(iv.len(), 2);
    }

    #[test]
    fn row_out_of_range_is_nan() {
        let mut iv = IndicatorValues::new();
        iv.insert("a", vec![1.0]);
        assert!(iv.row(5)[0].is_nan());
    }
}
