//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1]
//! Seed: EMA[period-1] = SMA of first `period` close values.
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::PriceRecord;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, records: &[PriceRecord]) -> Vec<f64> {
        let closes: Vec<f64> = records.iter().map(|r| r.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// Raw EMA of a pre-extracted slice. A NaN in the seed window leaves the
/// whole output NaN; a NaN after the seed taints every later value.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }

    let (window, rest) = values.split_at(period);
    if window.iter().any(|v| v.is_nan()) {
        return result;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = window.iter().sum::<f64>() / period as f64;
    result[period - 1] = prev;

    for (slot, &v) in result[period..].iter_mut().zip(rest) {
        if v.is_nan() {
            break;
        }
        prev += alpha * (v - prev);
        *slot = prev;
    }
    result
}

/// EMA of a series whose leading values may be undefined (e.g. the MACD line).
///
/// The seed window starts at the first non-NaN value; output stays aligned
/// with the input.
pub fn ema_after_warmup(values: &[f64], period: usize) -> Vec<f64> {
    let start = values.iter().position(|v| !v.is_nan()).unwrap_or(values.len());
    let mut result = vec![f64::NAN; start];
    result.extend(ema_of_series(&values[start..], period));
    result
}
