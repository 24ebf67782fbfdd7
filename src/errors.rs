use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Failures while reading the article table. Raised before any computation.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot open input '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed delimited data in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("cannot read parquet input '{}': {source}", path.display())]
    Parquet {
        path: PathBuf,
        #[source]
        source: ParquetError,
    },
    #[error("input '{}' is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("row {row}: column '{column}' holds invalid value '{value}'")]
    InvalidValue {
        row: u64,
        column: String,
        value: String,
    },
    #[error("unsupported input format '{0}' (expected .csv, .tsv, .txt, .gz, or .parquet)")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("category cap {cap} is outside 1..={max}")]
    CategoryCap { cap: i64, max: i64 },
}

/// Inconsistencies in the canonical table handed between stages.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("table has no column '{0}'")]
    MissingColumn(String),
    #[error("column '{column}' is not {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },
    #[error("category values {start}..={end} span more than {max} buckets")]
    ValueRange { start: i64, end: i64, max: i64 },
    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

/// Failures while writing a summary artifact.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot serialize summary for '{}': {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level error naming the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("load stage failed: {0}")]
    Load(#[from] InputError),
    #[error("transform stage failed: {0}")]
    Transform(#[from] TransformError),
    #[error("write stage failed: {0}")]
    Write(#[from] OutputError),
}
