//! SentiLab Runner: pipeline orchestration, configuration, analysis, export.
//!
//! This crate builds on `sentilab-core` to provide:
//! - TOML pipeline configuration with validated defaults
//! - The end-to-end batch run and its JSON summary
//! - Descriptive statistics and the ratings overview
//! - Sentiment/return correlation over merged or persisted tables
//! - CSV export and read-back of merged tables

pub mod config;
pub mod correlation;
pub mod eda;
pub mod export;
pub mod pipeline;
pub mod stats;

pub use config::{ConfigError, PipelineConfig};
pub use correlation::{correlate, CorrelationError, CorrelationResult, CorrelationScope, Observation};
pub use eda::RatingsOverview;
pub use pipeline::{run_pipeline, run_pipeline_with_scorer, CorrelationOutcome, RunError, RunSummary};
pub use stats::{describe, Summary};
