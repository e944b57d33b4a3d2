//! SentiLab Core: domain types, ingestion, indicators, sentiment, merge.
//!
//! This crate contains the data path of the analysis:
//! - Domain types (price rows, rating rows, symbols)
//! - Ingestion of per-symbol price files and the ratings file
//! - Technical indicators over each symbol's history
//! - Headline sentiment scoring
//! - Alignment of prices and ratings on (symbol, date)

pub mod data;
pub mod domain;
pub mod enrich;
pub mod indicators;
pub mod merge;
pub mod sentiment;
