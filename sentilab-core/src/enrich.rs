//! Per-symbol enrichment: runs the configured indicator set over each price series.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::PriceSeries;
use crate::indicators::{
    CumulativeReturn, DailyReturn, Ema, Indicator, IndicatorValues, IntradayChange, Macd, Rsi, Sma,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndicatorConfigError {
    #[error("{indicator} period must be >= 1")]
    ZeroPeriod { indicator: &'static str },

    #[error("MACD fast period ({fast}) must be shorter than slow period ({slow})")]
    MacdOrder { fast: usize, slow: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

/// Which indicator columns to derive and with which windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub sma_periods: Vec<usize>,
    pub ema_periods: Vec<usize>,
    pub rsi_period: usize,
    pub macd: MacdParams,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_periods: vec![20, 50],
            ema_periods: vec![50],
            rsi_period: 14,
            macd: MacdParams::default(),
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<(), IndicatorConfigError> {
        if self.sma_periods.contains(&0) {
            return Err(IndicatorConfigError::ZeroPeriod { indicator: "SMA" });
        }
        if self.ema_periods.contains(&0) {
            return Err(IndicatorConfigError::ZeroPeriod { indicator: "EMA" });
        }
        if self.rsi_period == 0 {
            return Err(IndicatorConfigError::ZeroPeriod { indicator: "RSI" });
        }
        let MacdParams { fast, slow, signal } = self.macd;
        if fast == 0 || signal == 0 {
            return Err(IndicatorConfigError::ZeroPeriod { indicator: "MACD" });
        }
        if fast >= slow {
            return Err(IndicatorConfigError::MacdOrder { fast, slow });
        }
        Ok(())
    }

    /// Indicator instances in output column order.
    pub fn build(&self) -> Result<Vec<Box<dyn Indicator>>, IndicatorConfigError> {
        self.validate()?;

        let mut set: Vec<Box<dyn Indicator>> = Vec::new();
        for &p in &self.sma_periods {
            set.push(Box::new(Sma::new(p)));
        }
        for &p in &self.ema_periods {
            set.push(Box::new(Ema::new(p)));
        }
        set.push(Box::new(Rsi::new(self.rsi_period)));
        for line in Macd::lines(self.macd.fast, self.macd.slow, self.macd.signal) {
            set.push(Box::new(line));
        }
        set.push(Box::new(DailyReturn));
        set.push(Box::new(IntradayChange));
        set.push(Box::new(CumulativeReturn));
        Ok(set)
    }
}

/// A price series with its derived indicator columns.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPriceSeries {
    pub series: PriceSeries,
    pub indicators: IndicatorValues,
}

impl EnrichedPriceSeries {
    pub fn symbol(&self) -> &str {
        &self.series.symbol
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn indicator_names(&self) -> Vec<&str> {
        self.indicators.names()
    }
}

pub fn enrich_series(series: PriceSeries, indicators: &[Box<dyn Indicator>]) -> EnrichedPriceSeries {
    let mut values = IndicatorValues::new();
    for ind in indicators {
        values.insert(ind.name(), ind.compute(&series.records));
    }
    EnrichedPriceSeries {
        series,
        indicators: values,
    }
}

/// Enrich every series independently.
pub fn enrich_all(
    series: BTreeMap<String, PriceSeries>,
    config: &IndicatorConfig,
) -> Result<BTreeMap<String, EnrichedPriceSeries>, IndicatorConfigError> {
    let indicators = config.build()?;
    let enriched: BTreeMap<String, EnrichedPriceSeries> = series
        .into_par_iter()
        .map(|(symbol, s)| (symbol, enrich_series(s, &indicators)))
        .collect();
    debug!(symbols = enriched.len(), columns = indicators.len(), "enriched price series");
    Ok(enriched)
}
