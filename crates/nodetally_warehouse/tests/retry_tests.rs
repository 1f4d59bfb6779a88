//! Retry behavior of `fetch_table` against a scripted executor.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use nodetally_warehouse::{Error, Result, RetryPolicy, StatementExecutor, fetch_table};
use polars::prelude::{Column, DataFrame};

struct ScriptedExecutor {
    script: RefCell<VecDeque<Result<DataFrame>>>,
    calls: Cell<u32>,
    statements: RefCell<Vec<String>>,
}

impl ScriptedExecutor {
    fn new(script: Vec<Result<DataFrame>>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            calls: Cell::new(0),
            statements: RefCell::new(Vec::new()),
        }
    }
}

impl StatementExecutor for ScriptedExecutor {
    fn execute(&self, statement: &str) -> Result<DataFrame> {
        self.calls.set(self.calls.get() + 1);
        self.statements.borrow_mut().push(statement.to_string());
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Connection("script exhausted".to_string())))
    }
}

fn no_delay(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        attempts,
        delay: Duration::ZERO,
    }
}

fn frame() -> DataFrame {
    DataFrame::new(vec![Column::new("facility_id".into(), vec!["F1", "F2"])]).unwrap()
}

fn connection_error() -> Error {
    Error::Connection("connection reset by peer".to_string())
}

#[test]
fn test_fails_twice_then_succeeds_on_third_attempt() {
    let executor = ScriptedExecutor::new(vec![
        Err(connection_error()),
        Err(Error::Http {
            status: 503,
            message: "warehouse starting".to_string(),
        }),
        Ok(frame()),
    ]);

    let df = fetch_table(&executor, "`cat`.default.customer_details", &no_delay(3)).unwrap();
    assert_eq!(df.height(), 2);
    assert_eq!(executor.calls.get(), 3);
    assert_eq!(
        executor.statements.borrow()[0],
        "SELECT * FROM `cat`.default.customer_details"
    );
}

#[test]
fn test_always_failing_source_stops_at_configured_attempts() {
    let executor = ScriptedExecutor::new(vec![
        Err(connection_error()),
        Err(connection_error()),
        Err(connection_error()),
        Err(connection_error()),
        Ok(frame()),
    ]);

    let err = fetch_table(&executor, "node_details", &no_delay(3)).unwrap_err();
    assert_eq!(executor.calls.get(), 3);
    match err {
        Error::RetriesExhausted {
            table,
            attempts,
            last,
        } => {
            assert_eq!(table, "node_details");
            assert_eq!(attempts, 3);
            assert!(matches!(*last, Error::Connection(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_non_retryable_error_surfaces_without_consuming_budget() {
    let executor = ScriptedExecutor::new(vec![
        Err(Error::Http {
            status: 403,
            message: "invalid access token".to_string(),
        }),
        Ok(frame()),
    ]);

    let err = fetch_table(&executor, "node_details", &no_delay(3)).unwrap_err();
    assert_eq!(executor.calls.get(), 1);
    assert!(matches!(err, Error::Http { status: 403, .. }));
}

#[test]
fn test_statement_failure_is_fatal() {
    let executor = ScriptedExecutor::new(vec![Err(Error::Statement {
        statement_id: "01ef".to_string(),
        state: "FAILED".to_string(),
        message: "[TABLE_OR_VIEW_NOT_FOUND]".to_string(),
    })]);

    let err = fetch_table(&executor, "missing", &no_delay(5)).unwrap_err();
    assert_eq!(executor.calls.get(), 1);
    assert!(err.to_string().contains("TABLE_OR_VIEW_NOT_FOUND"));
}

#[test]
fn test_configured_budget_is_respected() {
    let executor = ScriptedExecutor::new(Vec::new());
    let err = fetch_table(&executor, "t", &no_delay(5)).unwrap_err();
    assert_eq!(executor.calls.get(), 5);
    assert!(matches!(err, Error::RetriesExhausted { attempts: 5, .. }));
}
