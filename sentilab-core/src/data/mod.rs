//! Data ingestion: price directories, the ratings file, schema checks and
//! date canonicalization.

pub mod canonicalize;
pub mod dates;
pub mod deadline;
pub mod ingest;
pub mod schema;

pub use canonicalize::Canonicalizer;
pub use dates::{parse_date, parse_timestamp};
pub use deadline::IngestDeadline;
pub use ingest::{
    DataIngestor, IngestError, IngestOptions, IngestReport, LoadedPriceFile, PriceIngest,
    RatingIngest, RatingReport, SkippedFile,
};
pub use schema::{PriceSchema, RatingSchema, SchemaCheck, SchemaError};
