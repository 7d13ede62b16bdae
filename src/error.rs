//! Error types for BOM ingestion and board persistence.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// No row within the scan window carries every required label.
    #[error("could not find a BOM header row (looked for {labels} in the first {limit} rows)")]
    HeaderNotFound { labels: String, limit: usize },

    #[error("failed to read {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("failed to write workbook: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("{} contains no worksheet data", path.display())]
    EmptySheet { path: PathBuf },

    #[error("unsupported file format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("unknown board version '{0}'")]
    UnknownVersion(String),

    #[error("unknown reference designator '{0}'")]
    UnknownRef(String),

    #[error("layout mismatch: {0}")]
    LayoutMismatch(String),

    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}
