//! Test utilities for CLI testing
//!
//! Provides a mock CrateDB HTTP endpoint with just enough SQL understanding
//! for the statements issued by the toolkit.

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use ctk_core::api::SqlRequest;
use ctk_core::sql::unquote_ident;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// A table held by the mock server
#[derive(Debug, Clone, Default)]
pub struct MockTable {
    /// Column name and data type, in definition order
    pub columns: Vec<(String, String)>,
    /// Inserted rows, as submitted
    pub rows: Vec<Value>,
    /// Sub-columns of a strict `pk` object; `None` accepts any key
    pub pk_columns: Option<Vec<String>>,
}

/// Mock server state
#[derive(Debug, Clone, Default)]
pub struct MockCrateDbState {
    /// Tables by `schema.table`
    pub tables: Arc<Mutex<HashMap<String, MockTable>>>,
    /// Every statement received, in order
    pub statements: Arc<Mutex<Vec<String>>>,
    /// Canned responses by exact statement text
    pub canned: Arc<Mutex<HashMap<String, Value>>>,
    /// Primary keys whose inserts are rejected
    pub rejected: Arc<Mutex<Vec<Value>>>,
}

impl MockCrateDbState {
    pub fn queue_query(&self, stmt: &str, response: Value) {
        self.canned
            .lock()
            .unwrap()
            .insert(stmt.to_string(), response);
    }

    pub fn create_table(&self, name: &str, columns: Vec<(&str, &str)>) {
        let table = MockTable {
            columns: columns
                .into_iter()
                .map(|(n, t)| (n.to_string(), t.to_string()))
                .collect(),
            rows: Vec::new(),
            pk_columns: None,
        };
        self.tables
            .lock()
            .unwrap()
            .insert(normalize_table_name(name), table);
    }

    pub fn reject_pk(&self, pk: Value) {
        self.rejected.lock().unwrap().push(pk);
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn rows(&self, name: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(&normalize_table_name(name))
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }
}

/// Mock CrateDB implementation
#[derive(Debug)]
pub struct MockCrateDb {
    state: MockCrateDbState,
    port: u16,
}

impl Default for MockCrateDb {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCrateDb {
    pub fn new() -> Self {
        Self {
            state: MockCrateDbState::default(),
            port: 0, // Will be assigned when server starts
        }
    }

    /// Start the mock server and return its `http://` URL
    pub async fn start(mut self) -> Result<(Self, String)> {
        let app = Router::new()
            .route("/", get(root_handler))
            .route("/_sql", post(sql_handler))
            .with_state(self.state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        self.port = listener.local_addr()?.port();
        let server_url = format!("http://127.0.0.1:{}", self.port);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock server error: {}", e);
            }
        });

        for _ in 0..20 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Ok((self, server_url))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &MockCrateDbState {
        &self.state
    }
}

/// `doc` is implied for unqualified names; quotes are dropped.
fn normalize_table_name(name: &str) -> String {
    let parts: Vec<String> = name.split('.').map(unquote_ident).collect();
    match parts.as_slice() {
        [table] => format!("doc.{}", table),
        _ => parts.join("."),
    }
}

/// Sub-columns declared by `pk OBJECT(STRICT) AS (...)`.
///
/// A strict `pk` without a column list declares none, so every key is
/// rejected, like CrateDB does.
fn declared_pk_columns(stmt: &str) -> Option<Vec<String>> {
    const STRICT_PK: &str = "PK OBJECT(STRICT)";
    let upper = stmt.to_ascii_uppercase();
    let start = upper.find(STRICT_PK)? + STRICT_PK.len();
    let rest = stmt[start..].trim_start();
    if !rest.to_ascii_uppercase().starts_with("AS (") {
        return Some(Vec::new());
    }
    let list = &rest[4..];
    let list = &list[..list.find(')').unwrap_or(list.len())];
    Some(
        list.split(',')
            .filter_map(|column| column.split_whitespace().next())
            .map(unquote_ident)
            .collect(),
    )
}

/// Keys of `pk` that are not declared sub-columns.
fn undeclared_keys(pk: &Value, declared: &[String]) -> Vec<String> {
    pk.as_object()
        .map(|object| {
            object
                .keys()
                .filter(|key| !declared.contains(key))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Relation name following `prefix` in `stmt`, if the statement starts with it.
fn relation_after(stmt: &str, prefix: &str) -> Option<String> {
    if !stmt.to_ascii_uppercase().starts_with(prefix) {
        return None;
    }
    let rest = stmt[prefix.len()..].trim_start();
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(rest.len());
    Some(normalize_table_name(&rest[..end]))
}

fn ok(cols: &[&str], rows: Vec<Value>) -> (StatusCode, Json<Value>) {
    let rowcount = rows.len();
    (
        StatusCode::OK,
        Json(json!({"cols": cols, "rows": rows, "rowcount": rowcount, "duration": 0.5})),
    )
}

fn sql_error(status: StatusCode, code: i64, message: String) -> (StatusCode, Json<Value>) {
    (status, Json(json!({"error": {"message": message, "code": code}})))
}

fn unknown_relation(name: &str) -> (StatusCode, Json<Value>) {
    sql_error(
        StatusCode::NOT_FOUND,
        4041,
        format!("RelationUnknown[Relation '{}' unknown]", name),
    )
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "ok": true,
        "status": 200,
        "name": "mock-node",
        "cluster_name": "mock-cluster",
        "version": {"number": "5.8.0", "build_hash": "0000000"}
    }))
}

async fn sql_handler(
    State(state): State<MockCrateDbState>,
    Json(request): Json<SqlRequest>,
) -> (StatusCode, Json<Value>) {
    let stmt = request.stmt.trim().to_string();
    state.statements.lock().unwrap().push(stmt.clone());

    if let Some(response) = state.canned.lock().unwrap().get(&stmt) {
        return (StatusCode::OK, Json(response.clone()));
    }

    let upper = stmt.to_ascii_uppercase();
    let mut tables = state.tables.lock().unwrap();

    if let Some(name) = relation_after(&stmt, "CREATE TABLE IF NOT EXISTS ") {
        tables.entry(name).or_insert_with(|| MockTable {
            columns: vec![
                ("pk".to_string(), "object".to_string()),
                ("data".to_string(), "object".to_string()),
                ("aux".to_string(), "object".to_string()),
            ],
            rows: Vec::new(),
            pk_columns: declared_pk_columns(&stmt),
        });
        return ok(&[], vec![]);
    }

    if let Some(name) = relation_after(&stmt, "INSERT INTO ") {
        let Some(table) = tables.get_mut(&name) else {
            return unknown_relation(&name);
        };
        let rejected = state.rejected.lock().unwrap();
        let bulk_args = request.bulk_args.unwrap_or_default();
        let results: Vec<Value> = bulk_args
            .into_iter()
            .map(|row| {
                let row = Value::Array(row);
                let unknown = table
                    .pk_columns
                    .as_ref()
                    .map(|declared| undeclared_keys(&row[0], declared))
                    .unwrap_or_default();
                if let Some(column) = unknown.first() {
                    json!({"rowcount": -2, "error": {
                        "message": format!("ColumnUnknownException[Column pk['{}'] unknown]", column),
                        "code": 4043
                    }})
                } else if rejected.contains(&row[0]) {
                    json!({"rowcount": -2, "error": {
                        "message": "DuplicateKeyException[A document with the same primary key exists already]",
                        "code": 4091
                    }})
                } else {
                    table.rows.push(row);
                    json!({"rowcount": 1})
                }
            })
            .collect();
        return (
            StatusCode::OK,
            Json(json!({"cols": [], "duration": 1.0, "results": results})),
        );
    }

    if let Some(name) = relation_after(&stmt, "REFRESH TABLE ") {
        return match tables.get(&name) {
            Some(_) => ok(&[], vec![]),
            None => unknown_relation(&name),
        };
    }

    if upper.starts_with("SELECT COUNT(*)") {
        let name = upper
            .find(" FROM ")
            .map(|pos| normalize_table_name(stmt[pos + 6..].trim()))
            .unwrap_or_default();
        return match tables.get(&name) {
            Some(table) => ok(&["count"], vec![json!([table.rows.len()])]),
            None => unknown_relation(&name),
        };
    }

    if upper.contains("INFORMATION_SCHEMA.TABLES") || upper.contains("INFORMATION_SCHEMA.COLUMNS") {
        let args = request.args.unwrap_or_default();
        let name = format!(
            "{}.{}",
            args.first().and_then(Value::as_str).unwrap_or_default(),
            args.get(1).and_then(Value::as_str).unwrap_or_default()
        );
        let table = tables.get(&name);
        if upper.contains("INFORMATION_SCHEMA.TABLES") {
            let rows = table
                .map(|_| vec![json!([args.get(1)])])
                .unwrap_or_default();
            return ok(&["table_name"], rows);
        }
        let rows = table
            .map(|t| {
                t.columns
                    .iter()
                    .map(|(name, data_type)| json!([name, data_type, true]))
                    .collect()
            })
            .unwrap_or_default();
        return ok(&["column_name", "data_type", "is_nullable"], rows);
    }

    if let Some(name) = relation_after(&stmt, "SELECT * FROM ") {
        return match tables.get(&name) {
            Some(table) => ok(&["pk", "data", "aux"], table.rows.clone()),
            None => unknown_relation(&name),
        };
    }

    sql_error(
        StatusCode::BAD_REQUEST,
        4000,
        format!("SQLParseException[Unsupported statement: {}]", stmt),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_pk_columns() {
        assert_eq!(
            declared_pk_columns(
                "CREATE TABLE IF NOT EXISTS t (pk OBJECT(STRICT) AS (\"Id\" DOUBLE, sk TEXT), data OBJECT(DYNAMIC))"
            ),
            Some(vec!["Id".to_string(), "sk".to_string()])
        );
        assert_eq!(
            declared_pk_columns("CREATE TABLE IF NOT EXISTS t (pk OBJECT(STRICT), data OBJECT(DYNAMIC))"),
            Some(vec![])
        );
        assert_eq!(declared_pk_columns("CREATE TABLE IF NOT EXISTS t (x INT)"), None);
    }

    #[test]
    fn test_undeclared_keys() {
        let declared = vec!["Id".to_string()];
        assert!(undeclared_keys(&json!({"Id": 1}), &declared).is_empty());
        assert_eq!(undeclared_keys(&json!({"Id": 1, "sk": "a"}), &declared), vec!["sk"]);
        assert_eq!(undeclared_keys(&json!({"Id": 1}), &[]), vec!["Id"]);
    }
}
