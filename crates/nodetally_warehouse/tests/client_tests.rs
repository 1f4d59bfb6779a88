//! `DatabricksClient` against a mock Statement Execution API.

use std::time::Duration;

use mockito::{Matcher, Mock, ServerGuard};
use nodetally_warehouse::{
    DatabricksClient, Error, ErrorRetryStrategy, StatementExecutor, WarehouseConfig,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const C_STATEMENTS: &str = "/api/2.0/sql/statements";
const C_STATEMENT_S1: &str = "/api/2.0/sql/statements/s1";
const C_CHUNK_S1: &str = "/api/2.0/sql/statements/s1/result/chunks/1";

fn config(server: &ServerGuard, retries: u32, max_polls: u32) -> WarehouseConfig {
    WarehouseConfig {
        server_hostname: server.url(),
        http_path: "/sql/1.0/warehouses/wh42".to_string(),
        access_token: "dapi-test".to_string(),
        catalog: "vss-iot-customer-dev".to_string(),
        schema: "default".to_string(),
        retries,
        retry_delay: Duration::ZERO,
        poll_interval: Duration::ZERO,
        max_polls,
        http_timeout: Duration::from_secs(5),
    }
}

/// Mock one JSON endpoint answering `status` with `body`, hit exactly `expected_requests` times.
fn mock_json_endpoint(
    server: &mut ServerGuard,
    method: &str,
    url: &str,
    status: usize,
    body: serde_json::Value,
    expected_requests: usize,
) -> Mock {
    server
        .mock(method, url)
        .match_header("authorization", "Bearer dapi-test")
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(expected_requests)
        .create()
}

fn state_body(state: &str) -> serde_json::Value {
    json!({"statement_id": "s1", "status": {"state": state}})
}

#[test]
fn test_submit_poll_and_follow_chunks() {
    let mut server = mockito::Server::new();
    let submit = server
        .mock("POST", C_STATEMENTS)
        .match_header("authorization", "Bearer dapi-test")
        .match_body(Matcher::PartialJson(json!({
            "warehouse_id": "wh42",
            "statement": "SELECT * FROM `vss-iot-customer-dev`.default.node_details",
            "disposition": "INLINE",
            "format": "JSON_ARRAY",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(state_body("PENDING").to_string())
        .expect(1)
        .create();
    let poll = mock_json_endpoint(
        &mut server,
        "GET",
        C_STATEMENT_S1,
        200,
        json!({
            "statement_id": "s1",
            "status": {"state": "SUCCEEDED"},
            "manifest": {"schema": {"columns": [
                {"name": "FacilityId", "type_name": "INT", "position": 0},
                {"name": "oemModel", "type_name": "STRING", "position": 1}
            ]}},
            "result": {
                "data_array": [["1", "ST898ZB"]],
                "next_chunk_internal_link": C_CHUNK_S1
            }
        }),
        1,
    );
    let chunk = mock_json_endpoint(
        &mut server,
        "GET",
        C_CHUNK_S1,
        200,
        json!({"data_array": [["2", "linuxevb"], ["2", "3157100"]]}),
        1,
    );

    let client = DatabricksClient::new(config(&server, 3, 5));
    let df = client.fetch("node_details").unwrap();

    submit.assert();
    poll.assert();
    chunk.assert();
    assert_eq!(df.height(), 3);
    assert_eq!(df.get_column_names_str(), vec!["FacilityId", "oemModel"]);
}

#[test]
fn test_failed_statement_is_fatal() {
    let mut server = mockito::Server::new();
    let submit = mock_json_endpoint(
        &mut server,
        "POST",
        C_STATEMENTS,
        200,
        json!({
            "statement_id": "s1",
            "status": {"state": "FAILED", "error": {
                "error_code": "BAD_REQUEST",
                "message": "[TABLE_OR_VIEW_NOT_FOUND] node_details"
            }}
        }),
        1,
    );

    let client = DatabricksClient::new(config(&server, 3, 5));
    let err = client.fetch("node_details").unwrap_err();

    submit.assert();
    match err {
        Error::Statement { state, message, .. } => {
            assert_eq!(state, "FAILED");
            assert!(message.contains("TABLE_OR_VIEW_NOT_FOUND"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unauthorized_surfaces_after_one_attempt() {
    let mut server = mockito::Server::new();
    let submit = server
        .mock("POST", C_STATEMENTS)
        .with_status(401)
        .with_body("invalid access token")
        .expect(1)
        .create();

    let client = DatabricksClient::new(config(&server, 3, 5));
    let err = client.fetch("node_details").unwrap_err();

    submit.assert();
    match err {
        Error::Http { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid access token");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_server_error_is_retried_until_budget() {
    let mut server = mockito::Server::new();
    let submit = server
        .mock("POST", C_STATEMENTS)
        .with_status(503)
        .with_body("warehouse starting")
        .expect(2)
        .create();

    let client = DatabricksClient::new(config(&server, 2, 5));
    let err = client.fetch("node_details").unwrap_err();

    submit.assert();
    match err {
        Error::RetriesExhausted { attempts, last, .. } => {
            assert_eq!(attempts, 2);
            assert!(matches!(*last, Error::Http { status: 503, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_endless_running_hits_poll_bound() {
    let mut server = mockito::Server::new();
    let submit = mock_json_endpoint(&mut server, "POST", C_STATEMENTS, 200, state_body("RUNNING"), 1);
    let poll = mock_json_endpoint(&mut server, "GET", C_STATEMENT_S1, 200, state_body("RUNNING"), 2);

    let client = DatabricksClient::new(config(&server, 1, 2));
    let err = client.execute("SELECT 1").unwrap_err();

    submit.assert();
    poll.assert();
    assert_eq!(err.to_retry_strategy(), ErrorRetryStrategy::Retry);
    match err {
        Error::PollTimeout { state, polls, .. } => {
            assert_eq!(state, "RUNNING");
            assert_eq!(polls, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}
