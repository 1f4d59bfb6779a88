//! Error types for warehouse fetches.

use thiserror::Error;

/// Result type for warehouse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching a table.
#[derive(Error, Debug)]
pub enum Error {
    /// A required setting is missing or unparsable.
    #[error("warehouse configuration error: {0}")]
    Config(String),

    /// Table, catalog or schema name contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid table identifier {0:?}")]
    InvalidIdentifier(String),

    /// Transport-level failure (DNS, connect, TLS, timeout).
    #[error("connection failed: {0}")]
    Connection(String),

    /// Warehouse answered with a non-success HTTP status.
    #[error("warehouse returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Statement was still queued or running after the poll budget.
    #[error("statement {statement_id} still {state} after {polls} polls")]
    PollTimeout {
        statement_id: String,
        state: String,
        polls: u32,
    },

    /// Statement reached a terminal state other than success.
    #[error("statement {statement_id} ended in state {state}: {message}")]
    Statement {
        statement_id: String,
        state: String,
        message: String,
    },

    /// Response body could not be decoded.
    #[error("malformed warehouse response: {0}")]
    Decode(String),

    /// Result rows could not be assembled into a table.
    #[error("failed to build result table: {0}")]
    Table(#[from] polars::error::PolarsError),

    /// Every attempt failed with a retryable error.
    #[error("failed to fetch {table} after {attempts} attempts: {last}")]
    RetriesExhausted {
        table: String,
        attempts: u32,
        #[source]
        last: Box<Error>,
    },
}

/// How the retry loop treats a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorRetryStrategy {
    /// Transient connection or request failure; try again after the fixed delay.
    Retry,
    /// Permanent failure; surface immediately.
    Fail,
}

impl Error {
    /// Retry strategy for this failure.
    ///
    /// Transport errors, poll timeouts, HTTP 429 and 5xx retry. Other HTTP statuses,
    /// statement failures, decode and configuration errors fail.
    pub fn to_retry_strategy(&self) -> ErrorRetryStrategy {
        match self {
            Error::Connection(_) | Error::PollTimeout { .. } => ErrorRetryStrategy::Retry,
            Error::Http { status, .. } if *status == 429 || *status >= 500 => {
                ErrorRetryStrategy::Retry
            }
            _ => ErrorRetryStrategy::Fail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> Error {
        Error::Http {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn test_retry_classification() {
        use ErrorRetryStrategy::{Fail, Retry};

        assert_eq!(Error::Connection("reset".to_string()).to_retry_strategy(), Retry);
        assert_eq!(http(503).to_retry_strategy(), Retry);
        assert_eq!(http(429).to_retry_strategy(), Retry);
        assert_eq!(http(401).to_retry_strategy(), Fail);
        assert_eq!(http(400).to_retry_strategy(), Fail);
        assert_eq!(Error::Decode("eof".to_string()).to_retry_strategy(), Fail);
        assert_eq!(
            Error::Statement {
                statement_id: "s".to_string(),
                state: "FAILED".to_string(),
                message: "syntax".to_string(),
            }
            .to_retry_strategy(),
            Fail
        );
    }

    #[test]
    fn test_exhausted_message_names_table_and_attempts() {
        let err = Error::RetriesExhausted {
            table: "node_details".to_string(),
            attempts: 3,
            last: Box::new(Error::Connection("refused".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "failed to fetch node_details after 3 attempts: connection failed: refused"
        );
    }
}
