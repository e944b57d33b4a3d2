//! Canonical ordering and deduplication of ingested rows.

use std::collections::HashSet;

use crate::domain::{PriceRecord, RatingRecord};

pub struct Canonicalizer;

impl Canonicalizer {
    /// Sort by date (stable) and keep the first row of each date.
    ///
    /// Returns the canonical rows and the number of duplicate-date rows dropped.
    pub fn canonicalize_prices(mut records: Vec<PriceRecord>) -> (Vec<PriceRecord>, usize) {
        records.sort_by_key(|r| r.date);
        let before = records.len();
        records.dedup_by(|later, earlier| later.date == earlier.date);
        let dropped = before - records.len();
        (records, dropped)
    }

    /// Remove exact-duplicate rows, keeping first occurrences in input order.
    pub fn dedupe_ratings(records: Vec<RatingRecord>) -> (Vec<RatingRecord>, usize) {
        let before = records.len();
        let mut seen: HashSet<RatingRecord> = HashSet::with_capacity(before);
        let unique: Vec<RatingRecord> = records
            .into_iter()
            .filter(|r| seen.insert(r.clone()))
            .collect();
        let removed = before - unique.len();
        (unique, removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn price(day: u32, open: f64) -> PriceRecord {
        PriceRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open,
            high: open + 5.0,
            low: open - 1.0,
            close: open + 3.0,
            volume: 1000.0,
            extra: vec![],
        }
    }

    fn rating(headline: &str, hour: u32) -> RatingRecord {
        RatingRecord {
            published_at: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            headline: headline.into(),
            publisher: "Benzinga".into(),
            symbol: "SPY".into(),
            extra: vec![],
        }
    }

    #[test]
    fn sorts_prices_by_date() {
        let (rows, dropped) =
            Canonicalizer::canonicalize_prices(vec![price(3, 1.0), price(1, 2.0), price(2, 3.0)]);
        let days: Vec<u32> = rows.iter().map(|r| chrono::Datelike::day(&r.date)).collect();
        assert_eq!(days, vec![1, 2, 3]);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn duplicate_dates_keep_first_occurrence() {
        let (rows, dropped) =
            Canonicalizer::canonicalize_prices(vec![price(1, 100.0), price(1, 101.0), price(2, 102.0)]);
        assert_eq!(rows.len(), 2);
        assert_eq!(dropped, 1);
        assert_eq!(rows[0].open, 100.0);
    }

    #[test]
    fn exact_duplicate_ratings_removed() {
        let (rows, removed) = Canonicalizer::dedupe_ratings(vec![
            rating("Upgrade", 9),
            rating("Upgrade", 9),
            rating("Upgrade", 10),
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(removed, 1);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let (once, _) = Canonicalizer::dedupe_ratings(vec![rating("A", 1), rating("A", 1), rating("B", 1)]);
        let (twice, removed) = Canonicalizer::dedupe_ratings(once.clone());
        assert_eq!(once, twice);
        assert_eq!(removed, 0);
    }
}
