//! Wire models for the SQL Statement Execution API and result-to-table conversion.

use polars::prelude::{Column, DataFrame};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Body of `POST /api/2.0/sql/statements`.
#[derive(Debug, Serialize)]
pub struct StatementRequest<'a> {
    pub warehouse_id: &'a str,
    pub statement: &'a str,
    pub wait_timeout: &'a str,
    pub on_wait_timeout: &'a str,
    pub disposition: &'a str,
    pub format: &'a str,
}

impl<'a> StatementRequest<'a> {
    /// Inline JSON-array request that waits up to 30s before falling back to polling.
    pub fn inline(warehouse_id: &'a str, statement: &'a str) -> Self {
        Self {
            warehouse_id,
            statement,
            wait_timeout: "30s",
            on_wait_timeout: "CONTINUE",
            disposition: "INLINE",
            format: "JSON_ARRAY",
        }
    }
}

/// Statement submission/status response.
#[derive(Debug, Deserialize)]
pub struct StatementResponse {
    pub statement_id: String,
    pub status: StatementStatus,
    #[serde(default)]
    pub manifest: Option<ResultManifest>,
    #[serde(default)]
    pub result: Option<ResultData>,
}

#[derive(Debug, Deserialize)]
pub struct StatementStatus {
    pub state: StatementState,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

impl StatementStatus {
    /// Best available failure text.
    pub fn message(&self) -> String {
        match &self.error {
            Some(ServiceError {
                message: Some(message),
                ..
            }) => message.clone(),
            Some(ServiceError {
                error_code: Some(code),
                ..
            }) => code.clone(),
            _ => "no error detail returned".to_string(),
        }
    }
}

/// Lifecycle state of a submitted statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Closed,
    #[serde(other)]
    Unknown,
}

impl StatementState {
    /// Still queued or executing.
    pub fn is_in_flight(self) -> bool {
        matches!(self, StatementState::Pending | StatementState::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatementState::Pending => "PENDING",
            StatementState::Running => "RUNNING",
            StatementState::Succeeded => "SUCCEEDED",
            StatementState::Failed => "FAILED",
            StatementState::Canceled => "CANCELED",
            StatementState::Closed => "CLOSED",
            StatementState::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResultManifest {
    pub schema: ResultSchema,
}

#[derive(Debug, Deserialize)]
pub struct ResultSchema {
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub position: usize,
}

/// One inline result chunk.
#[derive(Debug, Default, Deserialize)]
pub struct ResultData {
    #[serde(default)]
    pub data_array: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    pub next_chunk_internal_link: Option<String>,
}

/// Assemble materialized rows into a frame, columns in `position` order.
///
/// Integer, floating and boolean warehouse types become typed columns when every
/// non-null value parses; anything else stays text.
pub fn derive_table_from_rows(columns: &[ColumnInfo], rows: &[Vec<Value>]) -> Result<DataFrame> {
    let mut l_columns_sorted = columns.to_vec();
    l_columns_sorted.sort_by_key(|col| col.position);

    let n_width = l_columns_sorted.len();
    if let Some((n_idx_row, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != n_width) {
        return Err(Error::Decode(format!(
            "row {n_idx_row} has {} values, expected {n_width}",
            row.len()
        )));
    }

    let mut l_frame_columns = Vec::with_capacity(n_width);
    for (n_idx_col, col_info) in l_columns_sorted.iter().enumerate() {
        let l_values: Vec<Option<String>> = rows
            .iter()
            .map(|row| derive_text_from_json(&row[n_idx_col]))
            .collect();
        l_frame_columns.push(derive_typed_column(
            &col_info.name,
            col_info.type_name.as_deref(),
            l_values,
        ));
    }

    Ok(DataFrame::new(l_frame_columns)?)
}

fn derive_text_from_json(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn derive_typed_column(name: &str, type_name: Option<&str>, values: Vec<Option<String>>) -> Column {
    let c_type = type_name.unwrap_or("STRING").to_ascii_uppercase();
    match c_type.as_str() {
        "BYTE" | "SHORT" | "INT" | "LONG" => {
            if let Some(l_parsed) = parse_all(&values, |s| s.parse::<i64>().ok()) {
                return Column::new(name.into(), l_parsed);
            }
        }
        "FLOAT" | "DOUBLE" | "DECIMAL" => {
            if let Some(l_parsed) = parse_all(&values, |s| s.parse::<f64>().ok()) {
                return Column::new(name.into(), l_parsed);
            }
        }
        "BOOLEAN" => {
            if let Some(l_parsed) = parse_all(&values, |s| s.parse::<bool>().ok()) {
                return Column::new(name.into(), l_parsed);
            }
        }
        _ => {}
    }
    Column::new(name.into(), values)
}

fn parse_all<T>(values: &[Option<String>], parse: impl Fn(&str) -> Option<T>) -> Option<Vec<Option<T>>> {
    values
        .iter()
        .map(|value| match value {
            None => Some(None),
            Some(s) => parse(s.trim()).map(Some),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::DataType;
    use pretty_assertions::assert_eq;

    const SUCCEEDED_BODY: &str = r#"{
        "statement_id": "01ef-abc",
        "status": {"state": "SUCCEEDED"},
        "manifest": {
            "format": "JSON_ARRAY",
            "schema": {
                "column_count": 3,
                "columns": [
                    {"name": "oemModel", "type_name": "STRING", "position": 1},
                    {"name": "FacilityId", "type_name": "INT", "position": 0},
                    {"name": "Score", "type_name": "DOUBLE", "position": 2}
                ]
            },
            "total_chunk_count": 2
        },
        "result": {
            "chunk_index": 0,
            "data_array": [["7", "ST898ZB", "1.5"], [null, "linuxevb", null]],
            "next_chunk_internal_link": "/api/2.0/sql/statements/01ef-abc/result/chunks/1"
        }
    }"#;

    #[test]
    fn test_parse_succeeded_response() {
        let response: StatementResponse = serde_json::from_str(SUCCEEDED_BODY).unwrap();
        assert_eq!(response.status.state, StatementState::Succeeded);
        let result = response.result.unwrap();
        assert_eq!(
            result.next_chunk_internal_link.as_deref(),
            Some("/api/2.0/sql/statements/01ef-abc/result/chunks/1")
        );
        assert_eq!(result.data_array.unwrap().len(), 2);
    }

    #[test]
    fn test_table_columns_follow_position_and_types() {
        let response: StatementResponse = serde_json::from_str(SUCCEEDED_BODY).unwrap();
        let l_columns = response.manifest.unwrap().schema.columns;
        let l_rows = response.result.unwrap().data_array.unwrap();

        let df = derive_table_from_rows(&l_columns, &l_rows).unwrap();
        assert_eq!(
            df.get_column_names_str(),
            vec!["FacilityId", "oemModel", "Score"]
        );
        assert_eq!(df.column("FacilityId").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("oemModel").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("Score").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_unparsable_integer_falls_back_to_text() {
        let l_columns = vec![ColumnInfo {
            name: "FacilityId".to_string(),
            type_name: Some("INT".to_string()),
            position: 0,
        }];
        let l_rows = vec![vec![Value::String("F-1".to_string())]];
        let df = derive_table_from_rows(&l_columns, &l_rows).unwrap();
        assert_eq!(df.column("FacilityId").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_ragged_row_is_decode_error() {
        let l_columns = vec![ColumnInfo {
            name: "a".to_string(),
            type_name: None,
            position: 0,
        }];
        let l_rows = vec![vec![Value::Null, Value::Null]];
        assert!(matches!(
            derive_table_from_rows(&l_columns, &l_rows),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_failed_status_message_and_unknown_state() {
        let response: StatementResponse = serde_json::from_str(
            r#"{"statement_id": "s1", "status": {"state": "FAILED",
                "error": {"error_code": "BAD_REQUEST", "message": "Table not found"}}}"#,
        )
        .unwrap();
        assert_eq!(response.status.message(), "Table not found");

        let response: StatementResponse = serde_json::from_str(
            r#"{"statement_id": "s2", "status": {"state": "SOMETHING_NEW"}}"#,
        )
        .unwrap();
        assert_eq!(response.status.state, StatementState::Unknown);
        assert!(!response.status.state.is_in_flight());
    }
}
