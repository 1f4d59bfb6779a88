//! `nodetally_warehouse`:
//! Fetches whole tables from a Databricks SQL warehouse.
//!
//! - `config`    : environment-driven connection settings
//! - `client`    : statement executor trait and the HTTP client
//! - `retry`     : bounded fixed-delay retry loop
//! - `statement` : API wire models and result-to-frame conversion
//! - `error`     : error type and retry classification
pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod statement;

pub use client::{DatabricksClient, StatementExecutor, fetch_table};
pub use config::{WarehouseConfig, validate_identifier};
pub use error::{Error, ErrorRetryStrategy, Result};
pub use retry::{RetryPolicy, run_with_retry};
