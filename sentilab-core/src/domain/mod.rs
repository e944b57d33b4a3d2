//! Domain types: price rows, rating rows, and symbol identity.

pub mod price;
pub mod rating;
pub mod symbol;

pub use price::{PriceRecord, PriceSeries};
pub use rating::{RatingRecord, RatingSet};
pub use symbol::{symbol_from_file_name, symbol_key};
