use std::io;
use std::path::PathBuf;

use nodetally_io_xlsx::XlsxWriteError;
use polars::prelude::PolarsError;

/// Errors raised while turning the two source tables into a workbook.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{table} table is missing required column {column:?}")]
    MissingColumn { table: &'static str, column: String },

    #[error("report for customer {customer:?} is inconsistent: {detail}")]
    Invariant { customer: String, detail: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Xlsx(#[from] XlsxWriteError),

    #[error("failed to read spreadsheet {path}: {source}")]
    XlsxRead {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },

    #[error("spreadsheet {path} has no worksheet")]
    EmptyWorkbook { path: PathBuf },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
