//! Databricks SQL warehouse client.

use std::io;
use std::thread;

use polars::prelude::DataFrame;
use serde::de::DeserializeOwned;

use crate::config::WarehouseConfig;
use crate::error::{Error, Result};
use crate::retry::{RetryPolicy, run_with_retry};
use crate::statement::{ResultData, StatementRequest, StatementResponse, StatementState, derive_table_from_rows};

/// Runs one SQL statement and materializes its full result.
///
/// Each call is one attempt; retrying is the caller's concern.
pub trait StatementExecutor {
    fn execute(&self, statement: &str) -> Result<DataFrame>;
}

/// Fetch every row of `qualified_table` through `executor`, retrying per `policy`.
pub fn fetch_table<E>(executor: &E, qualified_table: &str, policy: &RetryPolicy) -> Result<DataFrame>
where
    E: StatementExecutor + ?Sized,
{
    let statement = format!("SELECT * FROM {qualified_table}");
    run_with_retry(policy, qualified_table, |n_attempt| {
        tracing::debug!(table = qualified_table, attempt = n_attempt, "executing statement");
        executor.execute(&statement)
    })
}

/// Statement Execution API client. Builds a fresh agent (and connection) per attempt.
pub struct DatabricksClient {
    config: WarehouseConfig,
}

impl DatabricksClient {
    pub fn new(config: WarehouseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Fetch a table by its bare name using the configured catalog, schema and retry policy.
    pub fn fetch(&self, table: &str) -> Result<DataFrame> {
        let qualified = self.config.qualify_table(table)?;
        let df = fetch_table(self, &qualified, &self.config.retry_policy())?;
        tracing::info!(
            table = %qualified,
            rows = df.height(),
            cols = df.width(),
            "table fetched"
        );
        Ok(df)
    }

    fn send<T: DeserializeOwned>(
        &self,
        request: ureq::Request,
        body: Option<&StatementRequest<'_>>,
    ) -> Result<T> {
        let request = request
            .set(
                "Authorization",
                &format!("Bearer {}", self.config.access_token),
            )
            .set("Accept", "application/json");

        let outcome = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        let response = outcome.map_err(|e| match e {
            ureq::Error::Status(status, resp) => Error::Http {
                status,
                message: resp.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(t) => Error::Connection(t.to_string()),
        })?;

        response.into_json::<T>().map_err(|e| {
            if e.kind() == io::ErrorKind::InvalidData {
                Error::Decode(e.to_string())
            } else {
                Error::Connection(e.to_string())
            }
        })
    }
}

impl StatementExecutor for DatabricksClient {
    fn execute(&self, statement: &str) -> Result<DataFrame> {
        let agent = ureq::AgentBuilder::new()
            .timeout(self.config.http_timeout)
            .build();
        let api_base = self.config.api_base();
        let warehouse_id = self.config.warehouse_id()?;

        let mut response: StatementResponse = self.send(
            agent.post(&format!("{api_base}/api/2.0/sql/statements")),
            Some(&StatementRequest::inline(warehouse_id, statement)),
        )?;

        let mut n_polls = 0;
        while response.status.state.is_in_flight() {
            if n_polls >= self.config.max_polls {
                return Err(Error::PollTimeout {
                    statement_id: response.statement_id,
                    state: response.status.state.as_str().to_string(),
                    polls: n_polls,
                });
            }
            thread::sleep(self.config.poll_interval);
            n_polls += 1;
            tracing::debug!(statement_id = %response.statement_id, poll = n_polls, "polling statement");
            response = self.send(
                agent.get(&format!(
                    "{api_base}/api/2.0/sql/statements/{}",
                    response.statement_id
                )),
                None,
            )?;
        }

        if response.status.state != StatementState::Succeeded {
            return Err(Error::Statement {
                statement_id: response.statement_id.clone(),
                state: response.status.state.as_str().to_string(),
                message: response.status.message(),
            });
        }

        let manifest = response
            .manifest
            .ok_or_else(|| Error::Decode("succeeded statement without manifest".to_string()))?;

        let first_chunk = response.result.unwrap_or_default();
        let mut l_rows = first_chunk.data_array.unwrap_or_default();
        let mut next_link = first_chunk.next_chunk_internal_link;
        while let Some(link) = next_link {
            let chunk: ResultData = self.send(agent.get(&format!("{api_base}{link}")), None)?;
            l_rows.extend(chunk.data_array.unwrap_or_default());
            next_link = chunk.next_chunk_internal_link;
        }

        derive_table_from_rows(&manifest.schema.columns, &l_rows)
    }
}
