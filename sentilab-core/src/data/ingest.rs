//! Price-directory and ratings-file ingestion.
//!
//! Files are read with polars as all-text frames so that parsing stays under
//! our control: headers are case-folded, the schema is checked explicitly,
//! dates go through the permissive parser and numeric fields are parsed per
//! row. A bad row is dropped; a bad price file is skipped; only a missing
//! input, an invalid ratings file or the wall-clock guard is fatal.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::canonicalize::Canonicalizer;
use super::dates::{parse_date, parse_timestamp};
use super::deadline::IngestDeadline;
use super::schema::{normalize_column_names, PriceSchema, RatingSchema, SchemaError};
use crate::domain::{symbol_from_file_name, symbol_key, PriceRecord, PriceSeries, RatingRecord, RatingSet};

/// Default suffix between the symbol and `.csv` in price file names.
pub const DEFAULT_FILE_SUFFIX: &str = "_historical_data";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("input directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("{}: {source}", path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },

    #[error("cannot derive a symbol from file name {}", .0.display())]
    InvalidFileName(PathBuf),

    #[error("symbol '{symbol}' already loaded; skipping {}", path.display())]
    DuplicateSymbol { symbol: String, path: PathBuf },

    #[error(
        "ingestion exceeded wall-clock limit of {limit:?} after {processed}/{total} files"
    )]
    ResourceLimit {
        limit: Duration,
        processed: usize,
        total: usize,
    },
}

/// Options for directory ingestion.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Stripped from the file stem to obtain the symbol.
    pub file_suffix: String,
    /// Read files on the rayon pool.
    pub parallel: bool,
    /// Wall-clock limit for the whole directory. `None` disables the guard.
    pub timeout: Option<Duration>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            parallel: true,
            timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// A price file that could not be used.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// One successfully read price file.
#[derive(Debug, Clone)]
pub struct LoadedPriceFile {
    pub series: PriceSeries,
    pub rows_read: usize,
    /// Rows dropped for an unparseable date or non-numeric OHLCV field.
    pub rows_dropped: usize,
    pub duplicate_dates: usize,
    /// Empty or null cells per column, before any row is dropped.
    pub missing_cells: BTreeMap<String, usize>,
}

/// Aggregate outcome of a directory load.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub files_seen: usize,
    pub files_loaded: usize,
    pub skipped: Vec<SkippedFile>,
    pub rows_dropped: usize,
    pub duplicate_dates: usize,
    /// Empty or null cells per column, summed over loaded files.
    pub missing_cells: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct PriceIngest {
    pub series: BTreeMap<String, PriceSeries>,
    pub report: IngestReport,
}

#[derive(Debug, Clone, Default)]
pub struct RatingReport {
    pub rows_read: usize,
    /// Rows without a parseable date or with an empty headline.
    pub rows_dropped: usize,
    pub duplicates_removed: usize,
    pub missing_cells: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct RatingIngest {
    pub ratings: RatingSet,
    pub report: RatingReport,
}

enum FileOutcome {
    Loaded(LoadedPriceFile),
    Skipped(SkippedFile),
}

/// Reader for price directories and ratings files.
#[derive(Debug, Clone, Default)]
pub struct DataIngestor {
    options: IngestOptions,
}

impl DataIngestor {
    pub fn new(options: IngestOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Load every `*.csv` file in `dir` into a symbol → series map.
    pub fn load_price_directory(&self, dir: &Path) -> Result<PriceIngest, IngestError> {
        if !dir.is_dir() {
            return Err(IngestError::DirectoryNotFound(dir.to_path_buf()));
        }

        let files = list_csv_files(dir)?;
        let total = files.len();
        let deadline = IngestDeadline::new(self.options.timeout);
        let processed = AtomicUsize::new(0);

        let outcomes: Vec<FileOutcome> = if self.options.parallel {
            files
                .par_iter()
                .map(|path| self.ingest_one(path, &deadline, &processed, total))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            files
                .iter()
                .map(|path| self.ingest_one(path, &deadline, &processed, total))
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut ingest = PriceIngest {
            report: IngestReport {
                files_seen: total,
                ..IngestReport::default()
            },
            ..PriceIngest::default()
        };

        // Outcomes are in sorted file order, so the first file wins a symbol clash.
        let mut seen_keys = HashSet::new();
        for (path, outcome) in files.iter().zip(outcomes) {
            match outcome {
                FileOutcome::Loaded(loaded) => {
                    let symbol = loaded.series.symbol.clone();
                    if !seen_keys.insert(symbol_key(&symbol)) {
                        let err = IngestError::DuplicateSymbol {
                            symbol,
                            path: path.clone(),
                        };
                        warn!("{err}");
                        ingest.report.skipped.push(SkippedFile {
                            path: path.clone(),
                            reason: err.to_string(),
                        });
                        continue;
                    }
                    if loaded.series.is_empty() {
                        warn!(symbol = %symbol, "{} has no usable rows", path.display());
                    }
                    ingest.report.files_loaded += 1;
                    ingest.report.rows_dropped += loaded.rows_dropped;
                    ingest.report.duplicate_dates += loaded.duplicate_dates;
                    for (column, n) in loaded.missing_cells {
                        *ingest.report.missing_cells.entry(column).or_default() += n;
                    }
                    ingest.series.insert(symbol, loaded.series);
                }
                FileOutcome::Skipped(skipped) => {
                    warn!("skipping {}: {}", skipped.path.display(), skipped.reason);
                    ingest.report.skipped.push(skipped);
                }
            }
        }

        info!(
            loaded = ingest.report.files_loaded,
            skipped = ingest.report.skipped.len(),
            "loaded price data for {} stocks",
            ingest.series.len()
        );
        Ok(ingest)
    }

    fn ingest_one(
        &self,
        path: &Path,
        deadline: &IngestDeadline,
        processed: &AtomicUsize,
        total: usize,
    ) -> Result<FileOutcome, IngestError> {
        deadline.check(processed.load(Ordering::Relaxed), total)?;
        let outcome = match self.load_price_file(path) {
            Ok(loaded) => FileOutcome::Loaded(loaded),
            Err(e) => FileOutcome::Skipped(SkippedFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        };
        processed.fetch_add(1, Ordering::Relaxed);
        Ok(outcome)
    }

    /// Load a single price file. Errors here are per-file and recoverable.
    pub fn load_price_file(&self, path: &Path) -> Result<LoadedPriceFile, IngestError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| IngestError::InvalidFileName(path.to_path_buf()))?;
        let symbol = symbol_from_file_name(file_name, &self.options.file_suffix)
            .ok_or_else(|| IngestError::InvalidFileName(path.to_path_buf()))?;

        let table = TextTable::read(path)?;
        PriceSchema::check(&table.columns)
            .into_result()
            .map_err(|source| IngestError::Schema {
                path: path.to_path_buf(),
                source,
            })?;

        let date = table.column("date")?;
        let open = table.column("open")?;
        let high = table.column("high")?;
        let low = table.column("low")?;
        let close = table.column("close")?;
        let volume = table.column("volume")?;
        let extra_columns = table.extra_columns(&PriceSchema::REQUIRED);
        let extras = extra_columns
            .iter()
            .map(|name| table.column(name))
            .collect::<Result<Vec<_>, _>>()?;

        let rows_read = table.height();
        let missing_cells = table.missing_cells()?;
        let mut records = Vec::with_capacity(rows_read);
        let mut rows_dropped = 0;

        for i in 0..rows_read {
            let Some(day) = date.get(i).and_then(parse_date) else {
                rows_dropped += 1;
                continue;
            };
            let (Some(o), Some(h), Some(l), Some(c), Some(v)) = (
                parse_number(open.get(i)),
                parse_number(high.get(i)),
                parse_number(low.get(i)),
                parse_number(close.get(i)),
                parse_number(volume.get(i)),
            ) else {
                rows_dropped += 1;
                continue;
            };
            records.push(PriceRecord {
                date: day,
                open: o,
                high: h,
                low: l,
                close: c,
                volume: v,
                extra: extras
                    .iter()
                    .map(|col| col.get(i).unwrap_or_default().to_string())
                    .collect(),
            });
        }

        let (records, duplicate_dates) = Canonicalizer::canonicalize_prices(records);
        if rows_dropped > 0 || duplicate_dates > 0 {
            debug!(
                symbol = %symbol,
                rows_dropped,
                duplicate_dates,
                "cleaned {}",
                path.display()
            );
        }

        Ok(LoadedPriceFile {
            series: PriceSeries::new(symbol, extra_columns, records),
            rows_read,
            rows_dropped,
            duplicate_dates,
            missing_cells,
        })
    }

    /// Load and clean the analyst-ratings file.
    ///
    /// Unlike price files, every failure here is fatal: there is only one
    /// ratings source.
    pub fn load_ratings(&self, path: &Path) -> Result<RatingIngest, IngestError> {
        if !path.is_file() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        let mut table = TextTable::read(path)?;
        RatingSchema::resolve_aliases(&mut table.columns);
        RatingSchema::check(&table.columns)
            .into_result()
            .map_err(|source| IngestError::Schema {
                path: path.to_path_buf(),
                source,
            })?;

        let date = table.column("date")?;
        let headline = table.column("headline")?;
        let publisher = table.column("publisher")?;
        let symbol = table.column("symbol")?;
        let extra_columns = table.extra_columns(&RatingSchema::REQUIRED);
        let extras = extra_columns
            .iter()
            .map(|name| table.column(name))
            .collect::<Result<Vec<_>, _>>()?;

        let rows_read = table.height();
        let missing_cells = table.missing_cells()?;
        let mut records = Vec::with_capacity(rows_read);
        let mut rows_dropped = 0;

        for i in 0..rows_read {
            let published_at = date.get(i).and_then(parse_timestamp);
            let text = headline.get(i).map(str::trim).filter(|h| !h.is_empty());
            let (Some(published_at), Some(text)) = (published_at, text) else {
                rows_dropped += 1;
                continue;
            };
            records.push(RatingRecord {
                published_at,
                headline: text.to_string(),
                publisher: publisher.get(i).unwrap_or_default().trim().to_string(),
                symbol: symbol.get(i).unwrap_or_default().trim().to_string(),
                extra: extras
                    .iter()
                    .map(|col| col.get(i).unwrap_or_default().to_string())
                    .collect(),
            });
        }

        let (records, duplicates_removed) = Canonicalizer::dedupe_ratings(records);
        info!(
            dropped = rows_dropped,
            duplicates = duplicates_removed,
            "loaded and cleaned analyst ratings: {} records",
            records.len()
        );

        Ok(RatingIngest {
            ratings: RatingSet {
                extra_columns,
                records,
            },
            report: RatingReport {
                rows_read,
                rows_dropped,
                duplicates_removed,
                missing_cells,
            },
        })
    }
}

/// `*.csv` entries of `dir`, sorted by path.
fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::Read {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Finite f64 from a text cell; anything else is treated as missing.
fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// A CSV file read with every column typed as text and names case-folded.
struct TextTable {
    path: PathBuf,
    frame: DataFrame,
    columns: Vec<String>,
}

impl TextTable {
    fn read(path: &Path) -> Result<Self, IngestError> {
        let read_err = |e: PolarsError| IngestError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(read_err)?
            .finish()
            .map_err(read_err)?;

        let raw_names: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let columns = normalize_column_names(&raw_names).map_err(|source| IngestError::Schema {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            frame,
            columns,
        })
    }

    fn height(&self) -> usize {
        self.frame.height()
    }

    /// Column by its normalized name.
    fn column(&self, name: &str) -> Result<&StringChunked, IngestError> {
        let read_err = |reason: String| IngestError::Read {
            path: self.path.clone(),
            reason,
        };
        let idx = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| read_err(format!("column '{name}' not present")))?;
        self.frame.get_columns()[idx]
            .str()
            .map_err(|e| read_err(format!("column '{name}': {e}")))
    }

    /// Null or blank cells per column; columns without any are omitted.
    fn missing_cells(&self) -> Result<BTreeMap<String, usize>, IngestError> {
        let mut counts = BTreeMap::new();
        for name in &self.columns {
            let column = self.column(name)?;
            let missing = (0..self.height())
                .filter(|&i| column.get(i).map_or(true, |cell| cell.trim().is_empty()))
                .count();
            if missing > 0 {
                counts.insert(name.clone(), missing);
            }
        }
        Ok(counts)
    }

    /// Normalized names of the columns outside `required`, in file order.
    fn extra_columns(&self, required: &[&str]) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !required.contains(&c.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn parse_number_rejects_non_finite() {
        assert_eq!(parse_number(Some(" 12.5 ")), Some(12.5));
        assert_eq!(parse_number(Some("NaN")), None);
        assert_eq!(parse_number(Some("abc")), None);
        assert_eq!(parse_number(None), None);
    }

    #[test]
    fn price_file_headers_are_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "AAPL_historical_data.csv",
            "Date,Open,High,Low,Close,Adj Close,Volume\n\
             2024-01-03,11,12,10,11.5,11.5,2000\n\
             2024-01-02,10,11,9,10.5,10.5,1000\n",
        );
        let loaded = DataIngestor::default().load_price_file(&path).unwrap();
        assert_eq!(loaded.series.symbol, "AAPL");
        assert_eq!(loaded.series.extra_columns, vec!["adj close".to_string()]);
        assert_eq!(loaded.series.len(), 2);
        assert!(loaded.series.is_canonical());
        assert_eq!(
            loaded.series.records[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert_eq!(loaded.series.records[0].extra, vec!["10.5".to_string()]);
    }

    #[test]
    fn unparseable_rows_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "MSFT_historical_data.csv",
            "date,open,high,low,close,volume\n\
             2024-01-02,10,11,9,10.5,1000\n\
             garbage,10,11,9,10.5,1000\n\
             2024-01-04,10,eleven,9,10.5,1000\n\
             2024-01-05,10,11,9,10.5,1000\n",
        );
        let loaded = DataIngestor::default().load_price_file(&path).unwrap();
        assert_eq!(loaded.rows_read, 4);
        assert_eq!(loaded.rows_dropped, 2);
        assert_eq!(loaded.series.len(), 2);
    }

    #[test]
    fn blank_cells_are_counted_per_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "NVDA_historical_data.csv",
            "Date,Open,High,Low,Close,Adj Close,Volume\n\
             2024-01-02,10,11,9,10.5,,1000\n\
             2024-01-03,,11,9,10.5,10.5,\n\
             2024-01-04,10,11,9,10.5, ,1000\n",
        );
        let loaded = DataIngestor::default().load_price_file(&path).unwrap();
        assert_eq!(
            loaded.missing_cells,
            BTreeMap::from([
                ("adj close".to_string(), 2),
                ("open".to_string(), 1),
                ("volume".to_string(), 1),
            ])
        );
        assert_eq!(loaded.rows_dropped, 1);

        let ingest = DataIngestor::new(IngestOptions {
            parallel: false,
            ..IngestOptions::default()
        })
        .load_price_directory(dir.path())
        .unwrap();
        assert_eq!(ingest.report.missing_cells, loaded.missing_cells);
    }

    #[test]
    fn missing_columns_reject_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "X_historical_data.csv", "Date,Close\n2024-01-02,1\n");
        match DataIngestor::default().load_price_file(&path) {
            Err(IngestError::Schema {
                source: SchemaError::MissingColumns(missing),
                ..
            }) => assert_eq!(missing, vec!["open", "high", "low", "volume"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn ratings_require_headline_and_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "ratings.csv",
            "headline,publisher,date,stock\n\
             Shares rally,Benzinga,2020-06-05 10:30:54-04:00,A\n\
             ,Benzinga,2020-06-05 10:30:54-04:00,A\n\
             Shares rally,Benzinga,not-a-date,A\n\
             Shares rally,Benzinga,2020-06-05 10:30:54-04:00,A\n",
        );
        let ingest = DataIngestor::default().load_ratings(&path).unwrap();
        assert_eq!(ingest.report.rows_read, 4);
        assert_eq!(ingest.report.rows_dropped, 2);
        assert_eq!(ingest.report.duplicates_removed, 1);
        assert_eq!(ingest.ratings.len(), 1);
        assert_eq!(
            ingest.report.missing_cells,
            BTreeMap::from([("headline".to_string(), 1)])
        );
        assert_eq!(ingest.ratings.records[0].symbol, "A");
    }

    #[test]
    fn missing_ratings_file_is_fatal() {
        let err = DataIngestor::default()
            .load_ratings(Path::new("/definitely/not/here.csv"))
            .unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound(_)));
    }

    #[test]
    fn symbol_clash_keeps_first_file_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let body = "Date,Open,High,Low,Close,Volume\n2024-01-02,10,11,9,10.5,1000\n";
        write(dir.path(), "AAA_historical_data.csv", body);
        write(dir.path(), "aaa_historical_data.csv", body);

        let ingest = DataIngestor::default()
            .load_price_directory(dir.path())
            .unwrap();
        assert_eq!(ingest.series.len(), 1);
        assert!(ingest.series.contains_key("AAA"));
        assert_eq!(ingest.report.files_loaded, 1);
        assert_eq!(ingest.report.skipped.len(), 1);
        assert!(ingest.report.skipped[0].path.ends_with("aaa_historical_data.csv"));
    }
}
