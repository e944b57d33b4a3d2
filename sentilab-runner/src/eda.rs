//! Ratings overview: who publishes, when, about which symbols, and in what tone.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

use sentilab_core::domain::symbol_key;
use sentilab_core::sentiment::{ScoredRatingSet, SentimentCategory};

use crate::stats::{describe, mean_f64, std_dev, Summary};

/// Days whose publication count exceeds mean + SPIKE_SIGMA * std.
pub const SPIKE_SIGMA: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountEntry {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingsOverview {
    pub total: usize,
    /// Headline length in characters.
    pub headline_length: Option<Summary>,
    pub ratings_per_symbol: Vec<CountEntry>,
    pub articles_per_publisher: Vec<CountEntry>,
    /// Domains of publishers given as e-mail addresses.
    pub publisher_domains: Vec<CountEntry>,
    pub hour_histogram: [usize; 24],
    pub peak_hour: Option<u32>,
    pub daily_counts: BTreeMap<NaiveDate, usize>,
    pub spike_days: Vec<NaiveDate>,
    pub sentiment: BTreeMap<SentimentCategory, usize>,
}

impl RatingsOverview {
    pub fn compute(ratings: &ScoredRatingSet) -> Self {
        let mut per_symbol: HashMap<String, usize> = HashMap::new();
        let mut per_publisher: HashMap<String, usize> = HashMap::new();
        let mut per_domain: HashMap<String, usize> = HashMap::new();
        let mut hour_histogram = [0usize; 24];
        let mut daily_counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        let mut sentiment: BTreeMap<SentimentCategory, usize> = BTreeMap::new();
        let mut lengths = Vec::with_capacity(ratings.len());

        for scored in &ratings.records {
            let r = &scored.rating;
            lengths.push(r.headline.chars().count() as f64);
            *per_symbol.entry(symbol_key(&r.symbol)).or_default() += 1;
            *per_publisher.entry(r.publisher.clone()).or_default() += 1;
            if let Some(domain) = publisher_domain(&r.publisher) {
                *per_domain.entry(domain).or_default() += 1;
            }
            hour_histogram[r.published_at.hour() as usize] += 1;
            *daily_counts.entry(r.date()).or_default() += 1;
            *sentiment.entry(scored.score.category).or_default() += 1;
        }

        let peak_hour = hour_histogram
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0)
            .max_by(|(ha, a), (hb, b)| a.cmp(b).then(hb.cmp(ha)))
            .map(|(h, _)| h as u32);

        Self {
            total: ratings.len(),
            headline_length: describe(&lengths),
            ratings_per_symbol: ranked(per_symbol),
            articles_per_publisher: ranked(per_publisher),
            publisher_domains: ranked(per_domain),
            hour_histogram,
            peak_hour,
            spike_days: spike_days(&daily_counts),
            daily_counts,
            sentiment,
        }
    }

    pub fn top_publishers(&self, n: usize) -> &[CountEntry] {
        &self.articles_per_publisher[..n.min(self.articles_per_publisher.len())]
    }
}

/// Text after the last `@`, lower-cased. `None` for plain names.
pub fn publisher_domain(publisher: &str) -> Option<String> {
    let (_, domain) = publisher.trim().rsplit_once('@')?;
    if domain.is_empty() {
        return None;
    }
    Some(domain.to_ascii_lowercase())
}

/// Counts descending, ties broken by key.
fn ranked(counts: HashMap<String, usize>) -> Vec<CountEntry> {
    let mut entries: Vec<CountEntry> = counts
        .into_iter()
        .map(|(key, count)| CountEntry { key, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    entries
}

fn spike_days(daily_counts: &BTreeMap<NaiveDate, usize>) -> Vec<NaiveDate> {
    let counts: Vec<f64> = daily_counts.values().map(|&c| c as f64).collect();
    let threshold = mean_f64(&counts) + SPIKE_SIGMA * std_dev(&counts);
    daily_counts
        .iter()
        .filter(|&(_, &c)| c as f64 > threshold)
        .map(|(&d, _)| d)
        .collect()
}
