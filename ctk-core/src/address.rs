//! Database, table, and resource addresses
//!
//! CrateDB is addressed with a `crate://` URI in the form
//! `crate://<user>:<password>@<host>:<port>/<schema>/<table>[?ssl=true]`,
//! or with its plain `http(s)://` HTTP endpoint.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CtkError, Result};
use crate::sql::{quote_ident, unquote_ident};

/// Default HTTP port of a CrateDB node
pub const DEFAULT_HTTP_PORT: u16 = 4200;

/// Default CrateDB schema
pub const DEFAULT_SCHEMA: &str = "doc";

/// Default CrateDB superuser
pub const DEFAULT_USERNAME: &str = "crate";

/// Placeholder for passwords in printable addresses
const REDACTED: &str = "REDACTED";

/// Interpret a query parameter value as a boolean flag.
pub fn asbool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "y" | "t"
    )
}

/// Render a URL with a different scheme.
///
/// `url` refuses to switch between special (`http`) and non-special (`crate`)
/// schemes in place, so the address is reassembled from its parts.
fn with_scheme(url: &Url, scheme: &str) -> Result<Url> {
    let mut out = format!("{}://", scheme);
    if !url.username().is_empty() {
        out.push_str(url.username());
        if let Some(password) = url.password() {
            out.push(':');
            out.push_str(password);
        }
        out.push('@');
    }
    out.push_str(url.host_str().unwrap_or("localhost"));
    if let Some(port) = url.port() {
        out.push_str(&format!(":{}", port));
    }
    out.push_str(url.path());
    if let Some(query) = url.query() {
        if !query.is_empty() {
            out.push('?');
            out.push_str(query);
        }
    }
    Ok(Url::parse(&out)?)
}

/// Remove a query parameter, dropping the query string entirely when empty.
fn remove_query_param(url: &mut Url, name: &str) {
    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if remaining.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(remaining);
    }
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// A CrateDB database address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseAddress {
    uri: Url,
}

impl DatabaseAddress {
    /// Create an address from a `crate://` URI in string format.
    pub fn from_string(url: &str) -> Result<Self> {
        let uri = Url::parse(url.trim())
            .map_err(|e| CtkError::InvalidAddress(format!("{}: {}", url, e)))?;
        if uri.host_str().map_or(true, str::is_empty) {
            return Err(CtkError::InvalidAddress(format!(
                "Database address lacks a host: {}",
                url
            )));
        }
        Ok(Self { uri })
    }

    /// Create an address from an HTTP URL in string format.
    ///
    /// `https` URLs are marked with `ssl=true`.
    pub fn from_http_uri(url: &str) -> Result<Self> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| CtkError::InvalidAddress(format!("{}: {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(CtkError::InvalidAddress(format!(
                    "Expected http:// or https:// URL, got scheme '{}'",
                    other
                )))
            }
        }

        let ssl = parsed.scheme() == "https";
        let mut uri = with_scheme(&parsed, "crate")?;
        if parsed.port().is_none() && parsed.port_or_known_default().is_some() {
            // Keep the implicit port of the HTTP URL explicit on the crate:// side.
            let _ = uri.set_port(parsed.port_or_known_default());
        }
        if ssl {
            remove_query_param(&mut uri, "ssl");
            uri.query_pairs_mut().append_pair("ssl", "true");
        }
        Ok(Self { uri })
    }

    /// Parse either form, dispatching on the scheme.
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::from_http_uri(trimmed)
        } else {
            Self::from_string(trimmed)
        }
    }

    /// String representation of the database URI.
    pub fn dburi(&self) -> String {
        self.uri.to_string()
    }

    /// Whether the address requests a TLS connection.
    pub fn ssl(&self) -> bool {
        query_param(&self.uri, "ssl").map_or(false, |v| asbool(&v))
    }

    /// The `http(s)://` variant of the database URI.
    pub fn http_uri(&self) -> Result<String> {
        let scheme = if self.ssl() { "https" } else { "http" };
        let mut uri = self.uri.clone();
        remove_query_param(&mut uri, "ssl");
        if uri.port().is_none() {
            let _ = uri.set_port(Some(DEFAULT_HTTP_PORT));
        }
        Ok(with_scheme(&uri, scheme)?.to_string())
    }

    /// Base URL of the HTTP interface, without credentials, path, or query.
    pub fn http_base(&self) -> Result<Url> {
        let mut url = Url::parse(&self.http_uri()?)?;
        let _ = url.set_username("");
        let _ = url.set_password(None);
        url.set_path("/");
        url.set_query(None);
        Ok(url)
    }

    /// URL of the `_sql` endpoint.
    pub fn sql_endpoint(&self) -> Result<String> {
        let mut url = self.http_base()?;
        url.set_path("/_sql");
        Ok(url.to_string())
    }

    /// Username and password, with the username defaulting to `crate`.
    pub fn credentials(&self) -> (String, Option<String>) {
        let username = if self.uri.username().is_empty() {
            DEFAULT_USERNAME.to_string()
        } else {
            decode_component(self.uri.username())
        };
        let password = self.uri.password().map(decode_component);
        (username, password)
    }

    /// Replace the credentials of this address.
    pub fn with_credentials(mut self, username: &str, password: Option<&str>) -> Result<Self> {
        self.uri
            .set_username(username)
            .map_err(|_| CtkError::InvalidAddress("Cannot set username".to_string()))?;
        self.uri
            .set_password(password)
            .map_err(|_| CtkError::InvalidAddress("Cannot set password".to_string()))?;
        Ok(self)
    }

    /// String representation safe for printing, with the password redacted.
    pub fn safe(&self) -> String {
        let mut uri = self.uri.clone();
        if uri.password().is_some() {
            let _ = uri.set_password(Some(REDACTED));
        }
        uri.to_string()
    }

    /// Split off schema and table names from the URI path.
    ///
    /// Returns the address without its path, and the decoded table address.
    /// When the path carries no names, `schema` and `table` query parameters
    /// are consulted.
    pub fn decode(&self) -> Result<(DatabaseAddress, TableAddress)> {
        let segments: Vec<&str> = self
            .uri
            .path()
            .trim_matches('/')
            .split('/')
            .collect();

        let (schema, table) = match segments.as_slice() {
            [""] => (None, None),
            [schema] => (non_empty(schema), None),
            [schema, table] => (non_empty(schema), non_empty(table)),
            _ => {
                return Err(CtkError::InvalidAddress(format!(
                    "Path must be /<schema>/<table>, got '{}'",
                    self.uri.path()
                )))
            }
        };

        let schema = schema.or_else(|| query_param(&self.uri, "schema"));
        let table = table.or_else(|| query_param(&self.uri, "table"));

        let mut uri = self.uri.clone();
        uri.set_path("");
        remove_query_param(&mut uri, "schema");
        remove_query_param(&mut uri, "table");

        Ok((DatabaseAddress { uri }, TableAddress { schema, table }))
    }
}

impl std::fmt::Display for DatabaseAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.safe())
    }
}

fn non_empty(segment: &str) -> Option<String> {
    if segment.is_empty() {
        None
    } else {
        Some(decode_component(segment))
    }
}

fn decode_component(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// A table address, made of `<schema>.<table>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableAddress {
    pub schema: Option<String>,
    pub table: Option<String>,
}

impl TableAddress {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            table: Some(table.into()),
        }
    }

    /// Parse `schema.table` or `table`, accepting quoted parts.
    pub fn from_string(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CtkError::InvalidAddress(
                "Table name cannot be empty".to_string(),
            ));
        }

        let parts = split_relation_name(name);
        match parts.as_slice() {
            [table] => Ok(Self {
                schema: None,
                table: Some(unquote_ident(table)),
            }),
            [schema, table] => Ok(Self {
                schema: Some(unquote_ident(schema)),
                table: Some(unquote_ident(table)),
            }),
            _ => Err(CtkError::InvalidAddress(format!(
                "Invalid relation name: {}",
                name
            ))),
        }
    }

    /// Fill in a missing table name.
    pub fn with_default_table(mut self, table: impl Into<String>) -> Self {
        if self.table.is_none() {
            self.table = Some(table.into());
        }
        self
    }

    /// Schema name, defaulting to `doc`.
    pub fn schema_or_default(&self) -> &str {
        self.schema.as_deref().unwrap_or(DEFAULT_SCHEMA)
    }

    /// Fully-qualified, quoted table identifier.
    pub fn fullname(&self) -> Result<String> {
        let table = self
            .table
            .as_deref()
            .ok_or_else(|| CtkError::InvalidAddress("Table name is missing".to_string()))?;
        Ok(format!(
            "{}.{}",
            quote_ident(self.schema_or_default()),
            quote_ident(table)
        ))
    }
}

impl std::fmt::Display for TableAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}",
            self.schema_or_default(),
            self.table.as_deref().unwrap_or("<unknown>")
        )
    }
}

/// Split a relation name on dots which are not inside double quotes.
fn split_relation_name(name: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in name.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => {
                parts.push(&name[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&name[start..]);
    parts
}

/// Kind of data source, derived from the resource URL scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    DynamoDb,
    Unsupported(String),
}

/// An input or output resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputOutputResource {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
}

impl InputOutputResource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: None,
            compression: None,
        }
    }

    /// Classify the resource by its URL scheme.
    pub fn kind(&self) -> Result<SourceKind> {
        let scheme = match self.url.split_once("://") {
            Some((scheme, _)) if !scheme.is_empty() => scheme.to_ascii_lowercase(),
            _ => {
                return Err(CtkError::InvalidAddress(format!(
                    "Resource URL lacks a scheme: {}",
                    self.url
                )))
            }
        };
        Ok(match scheme.as_str() {
            "dynamodb" => SourceKind::DynamoDb,
            _ => SourceKind::Unsupported(scheme),
        })
    }
}
