//! Required columns for the two input table kinds.
//!
//! Column names are compared after lower-casing; validation returns a typed
//! `SchemaCheck` listing every missing column instead of failing on the first.

use std::collections::HashSet;

/// Outcome of validating a header row against a required column set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaCheck {
    Valid,
    MissingColumns(Vec<String>),
}

impl SchemaCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, SchemaCheck::Valid)
    }

    pub fn into_result(self) -> Result<(), SchemaError> {
        match self {
            SchemaCheck::Valid => Ok(()),
            SchemaCheck::MissingColumns(missing) => Err(SchemaError::MissingColumns(missing)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("duplicate column after case folding: {0}")]
    DuplicateColumn(String),
}

/// Lower-case and trim every column name; reject names that collide.
pub fn normalize_column_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<String>, SchemaError> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(names.len());
    for name in names {
        let lowered = name.as_ref().trim().to_lowercase();
        if !seen.insert(lowered.clone()) {
            return Err(SchemaError::DuplicateColumn(lowered));
        }
        normalized.push(lowered);
    }
    Ok(normalized)
}

fn check_required(columns: &[String], required: &[&str]) -> SchemaCheck {
    let missing: Vec<String> = required
        .iter()
        .filter(|req| !columns.iter().any(|c| c == *req))
        .map(|req| req.to_string())
        .collect();
    if missing.is_empty() {
        SchemaCheck::Valid
    } else {
        SchemaCheck::MissingColumns(missing)
    }
}

/// Schema of a per-symbol price file.
pub struct PriceSchema;

impl PriceSchema {
    pub const REQUIRED: [&'static str; 6] = ["date", "open", "high", "low", "close", "volume"];

    pub fn check(columns: &[String]) -> SchemaCheck {
        check_required(columns, &Self::REQUIRED)
    }
}

/// Schema of the analyst-ratings file.
pub struct RatingSchema;

impl RatingSchema {
    pub const REQUIRED: [&'static str; 4] = ["date", "headline", "publisher", "symbol"];

    /// Accepted stand-ins for `symbol` in ratings exports.
    pub const SYMBOL_ALIASES: [&'static str; 2] = ["stock", "ticker"];

    /// Rename the first symbol alias to `symbol` when `symbol` itself is absent.
    pub fn resolve_aliases(columns: &mut [String]) {
        if columns.iter().any(|c| c == "symbol") {
            return;
        }
        if let Some(col) = columns
            .iter_mut()
            .find(|c| Self::SYMBOL_ALIASES.contains(&c.as_str()))
        {
            *col = "symbol".to_string();
        }
    }

    pub fn check(columns: &[String]) -> SchemaCheck {
        check_required(columns, &Self::REQUIRED)
    }
}
