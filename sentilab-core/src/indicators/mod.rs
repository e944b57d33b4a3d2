//! Technical indicators over a symbol's close (and open) prices.
//!
//! All indicators implement `Indicator`. MACD exposes its three lines as
//! separate named instances, keeping the single-series trait unchanged.

pub mod ema;
pub mod indicator;
pub mod macd;
pub mod returns;
pub mod rsi;
pub mod sma;

pub use ema::Ema;
pub use indicator::{Indicator, IndicatorValues};
pub use macd::{Macd, MacdLine};
pub use returns::{CumulativeReturn, DailyReturn, IntradayChange};
pub use rsi::Rsi;
pub use sma::Sma;

/// Create synthetic records from close prices for testing.
///
/// open = previous close (or close for the first row), high/low ±1, volume 1000.
#[cfg(test)]
pub fn make_records(closes: &[f64]) -> Vec<crate::domain::PriceRecord> {
    use crate::domain::PriceRecord;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PriceRecord {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
                extra: Vec::new(),
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
