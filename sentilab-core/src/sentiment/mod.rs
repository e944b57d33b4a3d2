//! Headline sentiment: polarity scoring and category bucketing.
//!
//! Scoring is a pure function over the rating set; the input is never mutated.

mod vader;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{RatingRecord, RatingSet};

pub use vader::VaderScorer;

/// Text → polarity in [-1, 1].
pub trait PolarityScorer {
    fn polarity(&self, text: &str) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentCategory {
    Negative,
    Neutral,
    Positive,
}

impl SentimentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentCategory::Negative => "negative",
            SentimentCategory::Neutral => "neutral",
            SentimentCategory::Positive => "positive",
        }
    }
}

impl std::fmt::Display for SentimentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    #[error("neutral band must be in [0, 1), got {0}")]
    NeutralBand(f64),
}

/// Polarity cut points. Values in `[-neutral_band, neutral_band]` are neutral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentThresholds {
    pub neutral_band: f64,
}

impl Default for SentimentThresholds {
    fn default() -> Self {
        Self { neutral_band: 0.0 }
    }
}

impl SentimentThresholds {
    pub fn new(neutral_band: f64) -> Result<Self, ThresholdError> {
        let thresholds = Self { neutral_band };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// A negative band would flip the buckets; a band of 1 or more leaves
    /// nothing signed.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        if (0.0..1.0).contains(&self.neutral_band) {
            Ok(())
        } else {
            Err(ThresholdError::NeutralBand(self.neutral_band))
        }
    }

    pub fn categorize(&self, polarity: f64) -> SentimentCategory {
        if polarity < -self.neutral_band {
            SentimentCategory::Negative
        } else if polarity > self.neutral_band {
            SentimentCategory::Positive
        } else {
            SentimentCategory::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub polarity: f64,
    pub category: SentimentCategory,
}

impl SentimentScore {
    /// Clamp to [-1, 1] (NaN becomes 0) and bucket.
    pub fn from_polarity(raw: f64, thresholds: &SentimentThresholds) -> Self {
        let polarity = if raw.is_nan() { 0.0 } else { raw.clamp(-1.0, 1.0) };
        Self {
            polarity,
            category: thresholds.categorize(polarity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRating {
    pub rating: RatingRecord,
    pub score: SentimentScore,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredRatingSet {
    pub extra_columns: Vec<String>,
    pub records: Vec<ScoredRating>,
}

impl ScoredRatingSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count_by_category(&self, category: SentimentCategory) -> usize {
        self.records
            .iter()
            .filter(|r| r.score.category == category)
            .count()
    }
}

pub fn score_ratings(
    ratings: &RatingSet,
    scorer: &dyn PolarityScorer,
    thresholds: &SentimentThresholds,
) -> ScoredRatingSet {
    let records: Vec<ScoredRating> = ratings
        .records
        .iter()
        .map(|rating| ScoredRating {
            score: SentimentScore::from_polarity(scorer.polarity(&rating.headline), thresholds),
            rating: rating.clone(),
        })
        .collect();
    debug!(headlines = records.len(), "scored headlines");
    ScoredRatingSet {
        extra_columns: ratings.extra_columns.clone(),
        records,
    }
}
