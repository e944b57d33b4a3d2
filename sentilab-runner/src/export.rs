//! Persistence: merged tables as CSV, the run summary as JSON, and read-back
//! of persisted tables for standalone correlation.
//!
//! The summary carries a `schema_version`; newer versions are rejected on load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use sentilab_core::data::parse_date;
use sentilab_core::merge::{MergedTable, PROVENANCE_COLUMN};

use crate::correlation::{
    CorrelationError, Observation, INTRADAY_COLUMN, POLARITY_COLUMN, RETURN_COLUMN,
};
use crate::pipeline::{RunSummary, SCHEMA_VERSION};

pub const SUMMARY_FILE: &str = "summary.json";

// ─── Merged tables ──────────────────────────────────────────────────

/// `{dir}/{symbol}{suffix}.csv`
pub fn output_path(dir: &Path, symbol: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{symbol}{suffix}.csv"))
}

/// Render a merged table as CSV text, header first.
pub fn merged_table_csv(table: &MergedTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(table.schema.columns())?;
    for row in &table.rows {
        wtr.write_record(table.schema.cells(row))?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

pub fn write_merged_table(table: &MergedTable, dir: &Path, suffix: &str) -> Result<PathBuf> {
    let path = output_path(dir, &table.symbol, suffix);
    let csv = merged_table_csv(table)
        .with_context(|| format!("failed to render merged table for {}", table.symbol))?;
    std::fs::write(&path, csv).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[derive(Debug, Clone, Default)]
pub struct ExportOutcome {
    pub written: Vec<PathBuf>,
    /// One message per symbol that could not be written.
    pub failures: Vec<String>,
}

/// Write every table. A failing symbol is recorded and the rest still written.
pub fn export_tables(
    tables: &BTreeMap<String, MergedTable>,
    dir: &Path,
    suffix: &str,
) -> ExportOutcome {
    let mut outcome = ExportOutcome::default();
    if let Err(e) = std::fs::create_dir_all(dir) {
        let reason = format!("cannot create output directory {}: {e}", dir.display());
        warn!("{reason}");
        outcome
            .failures
            .extend(tables.keys().map(|symbol| format!("{symbol}: {reason}")));
        return outcome;
    }

    for (symbol, table) in tables {
        match write_merged_table(table, dir, suffix) {
            Ok(path) => outcome.written.push(path),
            Err(e) => {
                warn!(symbol = %symbol, "export failed: {e:#}");
                outcome.failures.push(format!("{symbol}: {e:#}"));
            }
        }
    }
    info!(
        written = outcome.written.len(),
        failed = outcome.failures.len(),
        "saved merged tables to {}",
        dir.display()
    );
    outcome
}

// ─── Run summary ────────────────────────────────────────────────────

pub fn export_summary_json(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize RunSummary to JSON")
}

pub fn import_summary_json(json: &str) -> Result<RunSummary> {
    let summary: RunSummary =
        serde_json::from_str(json).context("failed to deserialize RunSummary from JSON")?;
    if summary.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            summary.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(summary)
}

pub fn write_summary(summary: &RunSummary, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(SUMMARY_FILE);
    std::fs::write(&path, export_summary_json(summary)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

// ─── Read-back ──────────────────────────────────────────────────────

/// Observations from one persisted merged table.
///
/// Requires `date`, `sentiment_polarity` and `daily_return` columns;
/// `price_change_pct` is read when present. The symbol comes from
/// `stock_name` when present, else from the file stem.
pub fn read_observations(path: &Path) -> Result<Vec<Observation>, CorrelationError> {
    let read_err = |reason: String| CorrelationError::Read {
        path: path.to_path_buf(),
        reason,
    };

    let mut rdr = csv::Reader::from_path(path).map_err(|e| read_err(e.to_string()))?;
    let headers = rdr.headers().map_err(|e| read_err(e.to_string()))?.clone();
    let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));

    let required = ["date", POLARITY_COLUMN, RETURN_COLUMN];
    let missing: Vec<String> = required
        .iter()
        .filter(|c| find(**c).is_none())
        .map(|c| c.to_string())
        .collect();
    let (Some(date_idx), Some(pol_idx), Some(ret_idx)) =
        (find("date"), find(POLARITY_COLUMN), find(RETURN_COLUMN))
    else {
        return Err(CorrelationError::MissingColumns(missing));
    };
    let intraday_idx = find(INTRADAY_COLUMN);
    let symbol_idx = find(PROVENANCE_COLUMN);
    let fallback_symbol = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| read_err(e.to_string()))?;
        let Some(date) = record.get(date_idx).and_then(parse_date) else {
            continue;
        };
        out.push(Observation {
            symbol: symbol_idx
                .and_then(|i| record.get(i))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| fallback_symbol.clone()),
            date,
            polarity: parse_cell(record.get(pol_idx)),
            daily_return: parse_cell(record.get(ret_idx)),
            intraday_change: intraday_idx.and_then(|i| parse_cell(record.get(i))),
        });
    }
    Ok(out)
}

/// Observations from every `*.csv` file of a directory, in file-name order.
pub fn read_observation_dir(dir: &Path) -> Result<Vec<Observation>, CorrelationError> {
    let read_err = |reason: String| CorrelationError::Read {
        path: dir.to_path_buf(),
        reason,
    };
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| read_err(e.to_string()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();

    let mut out = Vec::new();
    for file in &files {
        out.extend(read_observations(file)?);
    }
    Ok(out)
}

fn parse_cell(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
