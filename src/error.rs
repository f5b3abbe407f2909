//! Error types for the report pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("workbook {} contains no worksheets", path.display())]
    EmptyWorkbook { path: PathBuf },

    #[error("failed to read workbook {}: {message}", path.display())]
    Workbook { path: PathBuf, message: String },

    #[error("unsupported report format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// The marker column (index 1) does not exist.
    #[error("sheet has {found} column(s); at least 2 are required")]
    TooFewColumns { found: usize },

    #[error("trade date marker (\"Дата торгов:\") not found in sheet")]
    MissingTradeDate,

    #[error("trade date {raw:?} is not in day.month.year form")]
    InvalidTradeDate { raw: String },

    #[error("row {row}: expected {expected} columns, found {found}")]
    SchemaMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}, column {column}: invalid value {value:?}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("invalid table name {0:?}")]
    InvalidTableName(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
