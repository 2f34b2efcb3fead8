//! Error types for the subsetting engine.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum SubsetError {
    #[error("Source directory not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Required file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Missing column '{column}' in '{table}'")]
    MissingColumn { table: String, column: String },

    #[error("Missing sheet '{0}' in workbook")]
    MissingSheet(String),

    #[error("Invalid flag value '{value}' in column '{column}' of '{table}'")]
    InvalidFlag {
        table: String,
        column: String,
        value: String,
    },

    #[error("Column '{column}' has unsupported key type {data_type}")]
    UnsupportedKeyType { column: String, data_type: String },

    #[error("Contrast '{0}' listed more than once in keep_contrasts")]
    DuplicateContrast(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Workbook read error: {0}")]
    WorkbookRead(#[from] calamine::Error),

    #[error("Workbook write error: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON configuration error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, SubsetError>;
