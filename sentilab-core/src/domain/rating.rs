//! RatingRecord: one published analyst headline.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A single headline row. `published_at` is naive: any source offset has
/// already been stripped, keeping the wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RatingRecord {
    pub published_at: NaiveDateTime,
    pub headline: String,
    pub publisher: String,
    pub symbol: String,
    #[serde(default)]
    pub extra: Vec<String>,
}

impl RatingRecord {
    /// Calendar date used as the join key.
    pub fn date(&self) -> NaiveDate {
        self.published_at.date()
    }
}

/// All ratings across all symbols, deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSet {
    pub extra_columns: Vec<String>,
    pub records: Vec<RatingRecord>,
}

impl RatingSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
