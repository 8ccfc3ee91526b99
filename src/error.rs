//! Error type shared by every pipeline stage.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Input columns differ from the hard-coded column sets.
    #[error("schema mismatch: missing columns {missing:?}, unexpected columns {unexpected:?}")]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// A source file required for a season (or at all) does not exist.
    #[error("missing source artifact {}: {reason}", path.display())]
    MissingArtifact { path: PathBuf, reason: String },

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    #[error("invalid value in column '{column}': {message}")]
    InvalidValue { column: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),
}
