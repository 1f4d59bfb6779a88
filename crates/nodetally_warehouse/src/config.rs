//! Warehouse connection settings loaded from the environment.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Validated connection settings for the Databricks SQL warehouse.
#[derive(Clone)]
pub struct WarehouseConfig {
    /// Workspace host, with or without scheme.
    pub server_hostname: String,
    /// Warehouse HTTP path, e.g. `/sql/1.0/warehouses/abc123`.
    pub http_path: String,
    /// Personal access token sent as a bearer credential.
    pub access_token: String,
    /// Catalog part of the fully-qualified table name.
    pub catalog: String,
    /// Schema part of the fully-qualified table name.
    pub schema: String,
    /// Attempts per table, including the first.
    pub retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Delay between status polls of a running statement.
    pub poll_interval: Duration,
    /// Maximum status polls per attempt.
    pub max_polls: u32,
    /// Per-request timeout.
    pub http_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    databricks_server_hostname: Option<String>,
    #[serde(default)]
    databricks_http_path: Option<String>,
    #[serde(default)]
    databricks_access_token: Option<String>,
    #[serde(default = "default_catalog")]
    warehouse_catalog: String,
    #[serde(default = "default_schema")]
    warehouse_schema: String,
    #[serde(default = "default_retries")]
    warehouse_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    warehouse_retry_delay_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    warehouse_poll_interval_ms: u64,
    #[serde(default = "default_max_polls")]
    warehouse_max_polls: u32,
    #[serde(default = "default_http_timeout_secs")]
    warehouse_http_timeout_secs: u64,
}

fn default_catalog() -> String {
    "vss-iot-customer-dev".to_string()
}

fn default_schema() -> String {
    "default".to_string()
}

const fn default_retries() -> u32 {
    3
}

const fn default_retry_delay_secs() -> u64 {
    5
}

const fn default_poll_interval_ms() -> u64 {
    1_000
}

const fn default_max_polls() -> u32 {
    120
}

const fn default_http_timeout_secs() -> u64 {
    60
}

impl WarehouseConfig {
    /// Load settings from `DATABRICKS_*` and `WAREHOUSE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig = envy::from_env().map_err(|e| Error::Config(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Load settings from explicit `(NAME, value)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw: RawConfig = envy::from_iter(pairs).map_err(|e| Error::Config(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let server_hostname = require(raw.databricks_server_hostname, "DATABRICKS_SERVER_HOSTNAME")?;
        let http_path = require(raw.databricks_http_path, "DATABRICKS_HTTP_PATH")?;
        let access_token = require(raw.databricks_access_token, "DATABRICKS_ACCESS_TOKEN")?;

        validate_identifier(&raw.warehouse_catalog)?;
        validate_identifier(&raw.warehouse_schema)?;

        let config = Self {
            server_hostname,
            http_path,
            access_token,
            catalog: raw.warehouse_catalog,
            schema: raw.warehouse_schema,
            retries: raw.warehouse_retries.max(1),
            retry_delay: Duration::from_secs(raw.warehouse_retry_delay_secs),
            poll_interval: Duration::from_millis(raw.warehouse_poll_interval_ms),
            max_polls: raw.warehouse_max_polls,
            http_timeout: Duration::from_secs(raw.warehouse_http_timeout_secs.max(1)),
        };
        config.warehouse_id()?;
        Ok(config)
    }

    /// Base URL of the workspace REST API, defaulting to `https://`.
    pub fn api_base(&self) -> String {
        let host = self.server_hostname.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        }
    }

    /// Warehouse id: the last segment of the HTTP path.
    pub fn warehouse_id(&self) -> Result<&str> {
        self.http_path
            .trim()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "DATABRICKS_HTTP_PATH {:?} does not end in a warehouse id",
                    self.http_path
                ))
            })
    }

    /// Fully-qualified, quoted name for `table`.
    pub fn qualify_table(&self, table: &str) -> Result<String> {
        validate_identifier(table)?;
        Ok(format!("`{}`.{}.{}", self.catalog, self.schema, table))
    }

    /// Retry policy configured for table fetches.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retries,
            delay: self.retry_delay,
        }
    }
}

impl fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("server_hostname", &self.server_hostname)
            .field("http_path", &self.http_path)
            .field("access_token", &"<redacted>")
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .field("poll_interval", &self.poll_interval)
            .field("max_polls", &self.max_polls)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

fn require(value: Option<String>, name: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("{name} must be set")))
}

/// Accept only `[A-Za-z0-9_-]+` so names can be interpolated into SQL.
pub fn validate_identifier(name: &str) -> Result<()> {
    let if_valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if if_valid {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}
