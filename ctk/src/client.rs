//! HTTP client for communicating with CrateDB.

use ctk_core::api::{
    BulkResponse, ColumnInfo, ServerInfo, SqlErrorResponse, SqlRequest, SqlResponse, TableInfo,
};
use ctk_core::{sql, CtkError, DatabaseAddress, Result, TableAddress};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Header selecting the schema for unqualified relation names
const DEFAULT_SCHEMA_HEADER: &str = "Default-Schema";

/// HTTP client for CrateDB's `_sql` endpoint.
///
/// This client handles all HTTP communication with the database, including:
/// - Basic authentication from the database address
/// - Automatic retries on connection failures
/// - Timeout handling
/// - Decoding of CrateDB error responses
///
/// # Retry Logic
///
/// Requests which never reached the server (connection refused, DNS
/// failures) are retried with a delay growing on each attempt. Read-only
/// `GET` requests are also retried on timeouts. Error responses from the
/// server are never retried.
///
/// # Examples
///
/// ```no_run
/// use ctk::client::CrateDbClient;
/// use ctk_core::DatabaseAddress;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let address = DatabaseAddress::from_string("crate://crate@localhost:4200/")?;
/// let client = CrateDbClient::with_config(&address, 30, 3, Duration::from_millis(500))?;
///
/// let response = client.run_sql("SELECT mountain FROM sys.summits LIMIT 1", None).await?;
/// println!("{:?}", response.rows);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CrateDbClient {
    client: Client,
    base_url: String,
    sql_url: String,
    username: String,
    password: Option<String>,
    default_schema: Option<String>,
    max_retries: u32,
    retry_delay: Duration,
}

impl CrateDbClient {
    /// Create a new CrateDB client with custom configuration.
    ///
    /// # Arguments
    ///
    /// * `address` - Database address; a schema in its path becomes the default schema
    /// * `timeout_secs` - Request timeout in seconds
    /// * `max_retries` - Maximum number of retry attempts for failed requests
    /// * `retry_delay` - Initial delay between retries
    pub fn with_config(
        address: &DatabaseAddress,
        timeout_secs: u64,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("ctk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CtkError::Http(format!("Failed to create HTTP client: {}", e)))?;

        let (_, table) = address.decode()?;
        let (username, password) = address.credentials();

        Ok(Self {
            client,
            base_url: address.http_base()?.to_string(),
            sql_url: address.sql_endpoint()?,
            username,
            password,
            default_schema: table.schema,
            max_retries,
            retry_delay,
        })
    }

    /// The `_sql` endpoint this client talks to.
    pub fn sql_url(&self) -> &str {
        &self.sql_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.basic_auth(&self.username, self.password.as_deref());
        match &self.default_schema {
            Some(schema) => request.header(DEFAULT_SCHEMA_HEADER, schema),
            None => request,
        }
    }

    /// Process an HTTP response and decode its body.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP status code indicates failure; CrateDB error bodies become
    ///   [`CtkError::Database`]
    /// - The response body cannot be read
    /// - The JSON cannot be deserialized
    async fn handle_response<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CtkError::Http(format!("Failed to read response from {}: {}", endpoint, e)))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<SqlErrorResponse>(&text) {
                return Err(CtkError::Database {
                    code: error.error.code,
                    message: error.error.message,
                });
            }
            let error_msg = match status {
                StatusCode::UNAUTHORIZED => format!("Unauthorized access to {}", endpoint),
                StatusCode::FORBIDDEN => format!("Access forbidden to {}", endpoint),
                StatusCode::SERVICE_UNAVAILABLE => format!("Service unavailable at {}", endpoint),
                _ => format!("HTTP {} error at {}: {}", status, endpoint, text),
            };
            return Err(CtkError::Http(error_msg));
        }

        serde_json::from_str(&text).map_err(|e| {
            CtkError::Serialization(format!("Failed to parse response from {}: {}", endpoint, e))
        })
    }

    /// Execute an HTTP request with automatic retry logic.
    ///
    /// Uses a linearly growing delay: `delay * (attempt + 1)`.
    async fn execute_with_retry<F, Fut, T>(
        &self,
        endpoint: &str,
        idempotent: bool,
        request_fn: F,
    ) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<Response, reqwest::Error>>,
        T: DeserializeOwned,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match request_fn().await {
                Ok(response) => {
                    return Self::handle_response(response, endpoint).await;
                }
                Err(e) => {
                    let should_retry = e.is_connect() || (idempotent && e.is_timeout());
                    let is_timeout = e.is_timeout();
                    last_error = Some(e);

                    if attempt < self.max_retries && should_retry {
                        warn!(
                            "Request to {} failed (attempt {}/{}), retrying",
                            endpoint,
                            attempt + 1,
                            self.max_retries + 1
                        );
                        tokio::time::sleep(self.retry_delay * (attempt + 1)).await;
                        continue;
                    }
                    if is_timeout {
                        return Err(CtkError::Timeout(format!(
                            "Request to {} timed out",
                            endpoint
                        )));
                    }
                    break;
                }
            }
        }

        Err(CtkError::Http(format!(
            "Failed to reach {} after {} attempts: {}",
            endpoint,
            self.max_retries + 1,
            last_error.map_or_else(|| "unknown error".to_string(), |e| e.to_string())
        )))
    }

    async fn post_sql<T: DeserializeOwned>(&self, request: &SqlRequest) -> Result<T> {
        debug!("SQL: {}", request.stmt);
        self.execute_with_retry(&self.sql_url, false, || {
            self.authorize(self.client.post(&self.sql_url))
                .json(request)
                .send()
        })
        .await
    }

    /// Run a single SQL statement.
    pub async fn run_sql(&self, stmt: &str, args: Option<Vec<Value>>) -> Result<SqlResponse> {
        let request = match args {
            Some(args) => SqlRequest::with_args(stmt, args),
            None => SqlRequest::new(stmt),
        };
        self.post_sql(&request).await
    }

    /// Run a statement once per row of `bulk_args`, in a single request.
    pub async fn run_sql_bulk(&self, stmt: &str, bulk_args: Vec<Vec<Value>>) -> Result<BulkResponse> {
        self.post_sql(&SqlRequest::bulk(stmt, bulk_args)).await
    }

    /// Retrieve node and cluster information.
    pub async fn server_info(&self) -> Result<ServerInfo> {
        self.execute_with_retry(&self.base_url, true, || {
            self.authorize(self.client.get(&self.base_url)).send()
        })
        .await
    }

    /// Test basic connectivity to the database.
    ///
    /// Returns `false` instead of an error when the node cannot be reached.
    pub async fn ping(&self) -> bool {
        match self.authorize(self.client.get(&self.base_url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Return the number of records in a table.
    pub async fn count_records(&self, table_fullname: &str) -> Result<i64> {
        let response = self
            .run_sql(&sql::count_records(table_fullname), None)
            .await?;
        response
            .scalar()
            .and_then(Value::as_i64)
            .ok_or_else(|| CtkError::Serialization("COUNT(*) returned no number".to_string()))
    }

    /// Make recent writes visible to queries.
    pub async fn refresh_table(&self, table_fullname: &str) -> Result<()> {
        self.run_sql(&sql::refresh_table(table_fullname), None)
            .await
            .map(|_| ())
    }

    /// Fill a missing schema the way CrateDB resolves it: the connection's
    /// `Default-Schema` first, then `doc`.
    fn qualify(&self, table: &TableAddress) -> TableAddress {
        let mut qualified = table.clone();
        if qualified.schema.is_none() {
            qualified.schema = self.default_schema.clone();
        }
        qualified
    }

    fn relation_args(table: &TableAddress) -> Result<Vec<Value>> {
        let name = table
            .table
            .clone()
            .ok_or_else(|| CtkError::InvalidAddress("Table name is missing".to_string()))?;
        Ok(vec![
            Value::String(table.schema_or_default().to_string()),
            Value::String(name),
        ])
    }

    /// Check whether a table exists.
    pub async fn table_exists(&self, table: &TableAddress) -> Result<bool> {
        let table = self.qualify(table);
        let response = self
            .run_sql(sql::table_exists(), Some(Self::relation_args(&table)?))
            .await?;
        Ok(!response.rows.is_empty())
    }

    /// List the columns of a table, in definition order.
    pub async fn table_columns(&self, table: &TableAddress) -> Result<Vec<ColumnInfo>> {
        let table = self.qualify(table);
        let response = self
            .run_sql(sql::table_columns(), Some(Self::relation_args(&table)?))
            .await?;
        response
            .records()
            .into_iter()
            .map(|record| Ok(serde_json::from_value(Value::Object(record))?))
            .collect()
    }

    /// Collect the metadata shown by `ctk show table`.
    pub async fn table_info(&self, table: &TableAddress) -> Result<TableInfo> {
        let table = self.qualify(table);
        if !self.table_exists(&table).await? {
            return Err(CtkError::TableNotFound(table.to_string()));
        }
        let columns = self.table_columns(&table).await?;
        let record_count = self.count_records(&table.fullname()?).await?;

        Ok(TableInfo {
            schema: table.schema_or_default().to_string(),
            table: table.table.clone().unwrap_or_default(),
            record_count,
            columns,
        })
    }
}
