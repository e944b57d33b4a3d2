//! Return series computed within a single symbol's history.

use super::Indicator;
use crate::domain::PriceRecord;

/// `(close[t] - close[t-1]) / close[t-1]`; NaN at t = 0.
#[derive(Debug, Clone, Default)]
pub struct DailyReturn;

impl Indicator for DailyReturn {
    fn name(&self) -> &str {
        "daily_return"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, records: &[PriceRecord]) -> Vec<f64> {
        if records.is_empty() {
            return Vec::new();
        }
        std::iter::once(f64::NAN)
            .chain(records.windows(2).map(|w| ratio_change(w[1].close, w[0].close)))
            .collect()
    }
}

/// Open-to-close move in percent: `(close - open) / open * 100`.
#[derive(Debug, Clone, Default)]
pub struct IntradayChange;

impl Indicator for IntradayChange {
    fn name(&self) -> &str {
        "price_change_pct"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, records: &[PriceRecord]) -> Vec<f64> {
        records
            .iter()
            .map(|r| ratio_change(r.close, r.open) * 100.0)
            .collect()
    }
}

/// Growth since the first row: `close[t] / close[0] - 1`.
#[derive(Debug, Clone, Default)]
pub struct CumulativeReturn;

impl Indicator for CumulativeReturn {
    fn name(&self) -> &str {
        "cumulative_return"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, records: &[PriceRecord]) -> Vec<f64> {
        let Some(first) = records.first() else {
            return Vec::new();
        };
        records
            .iter()
            .map(|r| ratio_change(r.close, first.close))
            .collect()
    }
}

/// Relative change from `base` to `value`; NaN when the base is zero or not finite.
fn ratio_change(value: f64, base: f64) -> f64 {
    if base == 0.0 || !base.is_finite() {
        return f64::NAN;
    }
    (value - base) / base
}
