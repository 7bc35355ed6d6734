//! Wire models for the CrateDB HTTP interface
//!
//! Requests are posted as JSON to the `/_sql` endpoint. Plain statements
//! return a [`SqlResponse`], statements carrying `bulk_args` return a
//! [`BulkResponse`], and failures are reported as [`SqlErrorResponse`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Rowcount reported for a failed row of a bulk operation
pub const BULK_ROW_FAILED: i64 = -2;

/// Body of a `POST /_sql` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlRequest {
    pub stmt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bulk_args: Option<Vec<Vec<Value>>>,
}

impl SqlRequest {
    /// A statement without parameters
    pub fn new(stmt: impl Into<String>) -> Self {
        Self {
            stmt: stmt.into(),
            args: None,
            bulk_args: None,
        }
    }

    /// A statement with positional parameters
    pub fn with_args(stmt: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            stmt: stmt.into(),
            args: Some(args),
            bulk_args: None,
        }
    }

    /// A statement executed once per parameter row
    pub fn bulk(stmt: impl Into<String>, bulk_args: Vec<Vec<Value>>) -> Self {
        Self {
            stmt: stmt.into(),
            args: None,
            bulk_args: Some(bulk_args),
        }
    }
}

/// Result of a regular statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlResponse {
    pub cols: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col_types: Option<Vec<Value>>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
    #[serde(default)]
    pub rowcount: i64,
    #[serde(default)]
    pub duration: f64,
}

impl SqlResponse {
    /// Rows as JSON objects keyed by column name.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.cols
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<Map<String, Value>>()
            })
            .collect()
    }

    /// First column of the first row.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// Per-row outcome of a bulk operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResult {
    pub rowcount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SqlError>,
}

impl BulkResult {
    pub fn is_failed(&self) -> bool {
        self.rowcount == BULK_ROW_FAILED
    }
}

/// Result of a bulk operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub cols: Vec<String>,
    #[serde(default)]
    pub duration: f64,
    pub results: Vec<BulkResult>,
}

impl BulkResponse {
    /// Number of rows written successfully.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| !r.is_failed()).count()
    }

    /// Number of rows which failed.
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_failed()).count()
    }
}

/// Error detail reported by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlError {
    pub message: String,
    pub code: i64,
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlErrorResponse {
    pub error: SqlError,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_trace: Option<String>,
}

/// Version block of [`ServerInfo`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerVersion {
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_hash: Option<String>,
}

/// Node information served at `GET /`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub ok: bool,
    #[serde(default)]
    pub status: u16,
    pub name: String,
    pub cluster_name: String,
    pub version: ServerVersion,
}

/// One column of a table, as listed by `information_schema.columns`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

/// Metadata printed by `ctk show table`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: String,
    pub table: String,
    pub record_count: i64,
    pub columns: Vec<ColumnInfo>,
}
