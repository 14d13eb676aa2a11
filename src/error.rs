// ❗ Error taxonomy for the reconciliation engine
//
// Only structural problems are errors. Bad cells and exhausted searches
// degrade to "no match" and are counted in the report instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconciliationError {
    /// A required canonical column could not be resolved from the headers.
    /// Fatal for the whole ingestion of that table.
    #[error("Missing required columns in {table} table: {fields:?} (found headers: {found:?})")]
    MissingColumns {
        table: String,
        fields: Vec<String>,
        found: Vec<String>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReconciliationError {
    pub fn is_missing_columns(&self) -> bool {
        matches!(self, ReconciliationError::MissingColumns { .. })
    }
}

pub type Result<T> = std::result::Result<T, ReconciliationError>;
