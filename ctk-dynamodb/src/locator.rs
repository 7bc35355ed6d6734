//! `dynamodb://` source locators
//!
//! Format: `dynamodb://<ACCESS_KEY>:<SECRET_KEY>@<endpoint>/<TableName>?region=<region>`
//!
//! The endpoint `aws` selects the regular AWS service endpoint. Anything else
//! is treated as a custom endpoint, for example a LocalStack instance on
//! `localhost:4566`.

use ctk_core::address::asbool;
use ctk_core::{CtkError, Result};
use url::Url;

/// Host name selecting the regular AWS endpoint
pub const AWS_HOST: &str = "aws";

/// Region used when neither the locator nor the environment specify one
pub const DEFAULT_REGION: &str = "us-east-1";

/// A parsed DynamoDB source locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamoDbLocator {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: String,
    /// Custom endpoint, `None` for AWS
    pub endpoint_url: Option<String>,
    pub table_name: String,
}

const ENCODING_HINT: &str =
    "percent-encode special characters in the credentials, e.g. '/' as %2F";

fn decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

impl DynamoDbLocator {
    /// Parse a locator, taking the region fallback from `AWS_REGION`.
    pub fn parse(url: &str) -> Result<Self> {
        Self::parse_with_default_region(url, std::env::var("AWS_REGION").ok())
    }

    pub fn parse_with_default_region(url: &str, default_region: Option<String>) -> Result<Self> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| {
                CtkError::InvalidAddress(format!("Invalid DynamoDB URL: {}; {}", e, ENCODING_HINT))
            })?;

        if parsed.scheme() != "dynamodb" {
            return Err(CtkError::InvalidAddress(format!(
                "Expected dynamodb:// URL, got scheme '{}'",
                parsed.scheme()
            )));
        }

        let access_key_id = Some(parsed.username())
            .filter(|u| !u.is_empty())
            .map(decode);
        let secret_access_key = parsed.password().filter(|p| !p.is_empty()).map(decode);

        let mut region = None;
        let mut ssl = false;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "region" if !value.is_empty() => region = Some(value.into_owned()),
                "ssl" => ssl = asbool(&value),
                _ => {}
            }
        }
        let region = region
            .or(default_region)
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let endpoint_url = match parsed.host_str() {
            None | Some("") => None,
            Some(host) if host.eq_ignore_ascii_case(AWS_HOST) => None,
            Some(host) => {
                let scheme = if ssl { "https" } else { "http" };
                Some(match parsed.port() {
                    Some(port) => format!("{}://{}:{}", scheme, host, port),
                    None => format!("{}://{}", scheme, host),
                })
            }
        };

        let segments: Vec<&str> = parsed
            .path()
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let table_name = match segments.as_slice() {
            [table] => decode(table),
            [] => {
                return Err(CtkError::InvalidAddress(
                    "DynamoDB URL lacks a table name".to_string(),
                ))
            }
            // An unencoded '/' in the secret moves its tail into the path.
            _ if parsed.path().contains('@') => {
                return Err(CtkError::InvalidAddress(format!(
                    "DynamoDB URL path must be /<TableName>; {}",
                    ENCODING_HINT
                )))
            }
            _ => {
                return Err(CtkError::InvalidAddress(format!(
                    "DynamoDB URL path must be /<TableName>, got '{}'",
                    parsed.path()
                )))
            }
        };

        Ok(Self {
            access_key_id,
            secret_access_key,
            region,
            endpoint_url,
            table_name,
        })
    }

    /// Whether both static credentials are present.
    pub fn has_static_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }

    /// Description of the target environment, without secrets.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("DynamoDB at {} (region: {})", url, self.region),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }

    /// Printable locator with the secret key redacted.
    pub fn safe(&self) -> String {
        let endpoint = self
            .endpoint_url
            .as_deref()
            .and_then(|e| e.split_once("://").map(|(_, rest)| rest))
            .unwrap_or(AWS_HOST);
        let credentials = match (&self.access_key_id, &self.secret_access_key) {
            (Some(key), Some(_)) => format!("{}:REDACTED@", key),
            (Some(key), None) => format!("{}@", key),
            _ => String::new(),
        };
        format!(
            "dynamodb://{}{}/{}?region={}",
            credentials, endpoint, self.table_name, self.region
        )
    }
}
