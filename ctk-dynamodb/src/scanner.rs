//! Paged table reads
//!
//! [`TableScanner`] abstracts one full-table scan so the loader can be tested
//! without DynamoDB. [`DynamoDbScanner`] implements it on the AWS SDK.

use async_trait::async_trait;
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use ctk_core::{CtkError, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use tracing::{debug, info};

use crate::convert::sql_type_for;
use crate::locator::DynamoDbLocator;

/// A DynamoDB item
pub type Item = HashMap<String, AttributeValue>;

/// A key attribute and the CrateDB type it is stored as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub sql_type: String,
}

impl KeyAttribute {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// What the loader needs to know about the source table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    pub name: String,
    /// Partition key first, then the sort key if the table has one
    pub key_attributes: Vec<KeyAttribute>,
    /// Approximate number of items, refreshed by DynamoDB every few hours
    pub item_count: Option<i64>,
}

impl TableDescription {
    pub fn key_names(&self) -> Vec<String> {
        self.key_attributes.iter().map(|k| k.name.clone()).collect()
    }

    /// `(name, type)` pairs for the declared sub-columns of the `pk` column
    pub fn key_columns(&self) -> Vec<(&str, &str)> {
        self.key_attributes
            .iter()
            .map(|k| (k.name.as_str(), k.sql_type.as_str()))
            .collect()
    }
}

/// One page of a scan
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Start key for the next page, `None` when the scan is complete
    pub last_evaluated_key: Option<Item>,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.last_evaluated_key.is_none()
    }
}

/// Source table abstraction
///
/// This trait enables testing of the loader without a DynamoDB endpoint
/// by allowing mock implementations.
#[async_trait]
pub trait TableScanner: Send + Sync {
    /// Describe the table
    async fn describe(&self) -> Result<TableDescription>;

    /// Read one page of items, continuing after `start_key`
    async fn scan_page(&self, start_key: Option<Item>, limit: i32) -> Result<ScanPage>;
}

/// AWS SDK backed scanner
#[derive(Debug, Clone)]
pub struct DynamoDbScanner {
    client: Client,
    table_name: String,
}

impl DynamoDbScanner {
    /// Create a scanner for the table named by `locator`.
    pub async fn connect(locator: &DynamoDbLocator) -> Result<Self> {
        info!("Connecting to {}", locator.target_display());

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(locator.region.clone()));

        if let (Some(key), Some(secret)) = (&locator.access_key_id, &locator.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key.clone(),
                secret.clone(),
                None,
                None,
                "ctk-locator",
            ));
        }

        if let Some(endpoint) = &locator.endpoint_url {
            debug!("Using custom DynamoDB endpoint: {}", endpoint);
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        Ok(Self::with_client(
            Client::new(&sdk_config),
            locator.table_name.clone(),
        ))
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl TableScanner for DynamoDbScanner {
    async fn describe(&self) -> Result<TableDescription> {
        let response = self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|e| map_describe_table_error(e, &self.table_name))?;

        let table = response
            .table()
            .ok_or_else(|| CtkError::TableNotFound(self.table_name.clone()))?;

        let mut key_schema: Vec<_> = table.key_schema().iter().collect();
        // HASH sorts before RANGE
        key_schema.sort_by_key(|k| k.key_type().as_str().to_string());
        let definitions = table.attribute_definitions();
        let key_attributes = key_schema
            .into_iter()
            .map(|k| {
                let name = k.attribute_name();
                let sql_type = definitions
                    .iter()
                    .find(|d| d.attribute_name() == name)
                    .map(|d| sql_type_for(d.attribute_type()))
                    .unwrap_or("TEXT");
                KeyAttribute::new(name, sql_type)
            })
            .collect();

        Ok(TableDescription {
            name: table
                .table_name()
                .unwrap_or(self.table_name.as_str())
                .to_string(),
            key_attributes,
            item_count: table.item_count(),
        })
    }

    async fn scan_page(&self, start_key: Option<Item>, limit: i32) -> Result<ScanPage> {
        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .set_exclusive_start_key(start_key)
            .limit(limit)
            .send()
            .await
            .map_err(|e| map_scan_error(e, &self.table_name))?;

        let items = output.items.unwrap_or_default();
        debug!(
            "Scanned {} items from {} (more: {})",
            items.len(),
            self.table_name,
            output.last_evaluated_key.is_some()
        );

        Ok(ScanPage {
            items,
            last_evaluated_key: output.last_evaluated_key.filter(|k| !k.is_empty()),
        })
    }
}

/// Map a DescribeTable SDK error to CtkError.
fn map_describe_table_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DescribeTableError, R>,
    table: &str,
) -> CtkError {
    let context = DisplayErrorContext(&err).to_string();
    match err.into_service_error() {
        DescribeTableError::ResourceNotFoundException(_) => {
            CtkError::TableNotFound(table.to_string())
        }
        DescribeTableError::InternalServerError(_) => {
            CtkError::Source("DynamoDB internal server error".to_string())
        }
        _ => CtkError::Source(format!("DescribeTable failed: {}", context)),
    }
}

/// Map a Scan SDK error to CtkError.
fn map_scan_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<ScanError, R>,
    table: &str,
) -> CtkError {
    let context = DisplayErrorContext(&err).to_string();
    match err.into_service_error() {
        ScanError::ResourceNotFoundException(_) => CtkError::TableNotFound(table.to_string()),
        ScanError::ProvisionedThroughputExceededException(_) => {
            CtkError::Source("Throughput exceeded, please retry".to_string())
        }
        ScanError::RequestLimitExceeded(_) => {
            CtkError::Source("Request limit exceeded, please retry".to_string())
        }
        ScanError::InternalServerError(_) => {
            CtkError::Source("DynamoDB internal server error".to_string())
        }
        _ => CtkError::Source(format!("Scan failed: {}", context)),
    }
}
