//! Symbol identity.
//!
//! The file name is the only link between a price file and its symbol:
//! `{SYMBOL}{suffix}.csv`.

/// Derive a symbol from a price file name by removing `.csv` and `suffix`.
///
/// Returns `None` when nothing is left after stripping.
pub fn symbol_from_file_name(file_name: &str, suffix: &str) -> Option<String> {
    let stem = file_name
        .strip_suffix(".csv")
        .or_else(|| file_name.strip_suffix(".CSV"))
        .unwrap_or(file_name);
    let symbol = stem.strip_suffix(suffix).unwrap_or(stem).trim();
    if symbol.is_empty() {
        None
    } else {
        Some(symbol.to_string())
    }
}

/// Case-folded key used to match symbols coming from different sources.
pub fn symbol_key(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
