//! Moving Average Convergence Divergence (MACD).
//!
//! macd   = EMA(fast) - EMA(slow), defined from row slow-1
//! signal = EMA(signal) over the defined MACD values, defined from row slow+signal-2
//! hist   = macd - signal
//!
//! Each line is its own `Indicator` so every output stays a single named series.

use super::ema::{ema_after_warmup, ema_of_series};
use super::Indicator;
use crate::domain::PriceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Macd,
    Signal,
    Histogram,
}

impl MacdLine {
    pub fn column_name(self) -> &'static str {
        match self {
            MacdLine::Macd => "macd",
            MacdLine::Signal => "macd_signal",
            MacdLine::Histogram => "macd_hist",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    line: MacdLine,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, line: MacdLine) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(fast < slow, "MACD fast period must be shorter than slow period");
        Self {
            fast,
            slow,
            signal,
            line,
        }
    }

    /// The three MACD lines in output column order.
    pub fn lines(fast: usize, slow: usize, signal: usize) -> [Macd; 3] {
        [
            Macd::new(fast, slow, signal, MacdLine::Macd),
            Macd::new(fast, slow, signal, MacdLine::Signal),
            Macd::new(fast, slow, signal, MacdLine::Histogram),
        ]
    }

    fn macd_line(&self, closes: &[f64]) -> Vec<f64> {
        let fast = ema_of_series(closes, self.fast);
        let slow = ema_of_series(closes, self.slow);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        self.line.column_name()
    }

    fn lookback(&self) -> usize {
        match self.line {
            MacdLine::Macd => self.slow - 1,
            MacdLine::Signal | MacdLine::Histogram => self.slow + self.signal - 2,
        }
    }

    fn compute(&self, records: &[PriceRecord]) -> Vec<f64> {
        let closes: Vec<f64> = records.iter().map(|r| r.close).collect();
        let macd = self.macd_line(&closes);
        if self.line == MacdLine::Macd {
            return macd;
        }

        let signal = ema_after_warmup(&macd, self.signal);
        match self.line {
            MacdLine::Signal => signal,
            _ => macd.iter().zip(&signal).map(|(m, s)| m - s).collect(),
        }
    }
}
