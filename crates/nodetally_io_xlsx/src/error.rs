//! Writer error type.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for writer operations.
pub type Result<T> = std::result::Result<T, XlsxWriteError>;

/// Errors raised while planning or writing a workbook.
#[derive(Error, Debug)]
pub enum XlsxWriteError {
    /// Caller passed data the writer cannot lay out.
    #[error("invalid sheet input: {0}")]
    InvalidInput(String),

    /// Writer was used after `close()`.
    #[error("cannot write after close()")]
    Closed,

    /// Row or column index does not fit the worksheet coordinate type.
    #[error("{axis} index overflow: {value}")]
    IndexOverflow { axis: &'static str, value: usize },

    /// Failure reading a value out of the source frame.
    #[error("dataframe access failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Failure inside the workbook library.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Workbook could not be saved to its destination.
    #[error("failed to save workbook {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
}
