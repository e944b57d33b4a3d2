//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period.
//! Edge cases: flat window → 50; avg_loss == 0 → 100; avg_gain == 0 → 0.

use super::Indicator;
use crate::domain::PriceRecord;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, records: &[PriceRecord]) -> Vec<f64> {
        let closes: Vec<f64> = records.iter().map(|r| r.close).collect();
        rsi_of_series(&closes, self.period)
    }
}

/// Wilder RSI of a close series. Index `period` holds the first value; a NaN
/// close stops the series there.
pub fn rsi_of_series(closes: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; closes.len()];
    if period == 0 || closes.len() <= period {
        return result;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let (seed, rest) = deltas.split_at(period);
    if seed.iter().any(|d| d.is_nan()) {
        return result;
    }

    let n = period as f64;
    let mut gain = seed.iter().map(|d| d.max(0.0)).sum::<f64>() / n;
    let mut loss = seed.iter().map(|d| (-d).max(0.0)).sum::<f64>() / n;
    result[period] = compute_rsi(gain, loss);

    for (slot, &d) in result[period + 1..].iter_mut().zip(rest) {
        if d.is_nan() {
            break;
        }
        gain += (d.max(0.0) - gain) / n;
        loss += ((-d).max(0.0) - loss) / n;
        *slot = compute_rsi(gain, loss);
    }
    result
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
