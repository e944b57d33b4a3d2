//! Criterion benchmarks for the data path.
//!
//! 1. Indicator enrichment over a long random-walk series
//! 2. Merge of many symbols against a large rating set

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sentilab_core::domain::{PriceRecord, PriceSeries, RatingRecord};
use sentilab_core::enrich::{enrich_series, IndicatorConfig};
use sentilab_core::merge::{merge, JoinMode};
use sentilab_core::sentiment::{ScoredRating, ScoredRatingSet, SentimentScore, SentimentThresholds};

// ── Helpers ──────────────────────────────────────────────────────────

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 2).unwrap()
}

fn random_walk(symbol: &str, n: usize, rng: &mut StdRng) -> PriceSeries {
    let mut close = 100.0;
    let records = (0..n)
        .map(|i| {
            let open = close;
            close *= 1.0 + rng.gen_range(-0.02..0.02);
            PriceRecord {
                date: base_date() + Duration::days(i as i64),
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume: rng.gen_range(1e5..1e6),
                extra: Vec::new(),
            }
        })
        .collect();
    PriceSeries::new(symbol, vec![], records)
}

fn random_ratings(symbols: &[String], days: usize, count: usize, rng: &mut StdRng) -> ScoredRatingSet {
    let thresholds = SentimentThresholds::default();
    let records = (0..count)
        .map(|i| {
            let symbol = &symbols[rng.gen_range(0..symbols.len())];
            let day = rng.gen_range(0..days) as i64;
            ScoredRating {
                rating: RatingRecord {
                    published_at: (base_date() + Duration::days(day))
                        .and_hms_opt(rng.gen_range(0..24), 0, 0)
                        .unwrap(),
                    headline: format!("headline {i}"),
                    publisher: "Benzinga Newsdesk".into(),
                    symbol: symbol.to_lowercase(),
                    extra: vec![],
                },
                score: SentimentScore::from_polarity(rng.gen_range(-1.0..1.0), &thresholds),
            }
        })
        .collect();
    ScoredRatingSet {
        extra_columns: vec![],
        records,
    }
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_enrich(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let indicators = IndicatorConfig::default().build().unwrap();
    let mut group = c.benchmark_group("enrich");
    for n in [1_000usize, 10_000] {
        let series = random_walk("AAA", n, &mut rng);
        group.bench_with_input(BenchmarkId::from_parameter(n), &series, |b, s| {
            b.iter(|| enrich_series(black_box(s.clone()), &indicators))
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let indicators = IndicatorConfig::default().build().unwrap();
    let days = 2_500;
    let symbols: Vec<String> = (0..8).map(|i| format!("S{i}")).collect();
    let prices: BTreeMap<_, _> = symbols
        .iter()
        .map(|s| (s.clone(), enrich_series(random_walk(s, days, &mut rng), &indicators)))
        .collect();
    let ratings = random_ratings(&symbols, days, 50_000, &mut rng);

    let mut group = c.benchmark_group("merge");
    for mode in [JoinMode::Inner, JoinMode::Left] {
        group.bench_function(mode.to_string(), |b| {
            b.iter(|| merge(black_box(&prices), black_box(&ratings), mode))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_enrich, bench_merge);
criterion_main!(benches);
