//! Full-table loads into CrateDB.
//!
//! A load scans the source table page by page, translates every item into a
//! [`Document`](ctk_core::Document) and writes documents with bulk inserts.

use crate::client::CrateDbClient;
use crate::config::MAX_BATCH_SIZE;
use ctk_core::{
    sql, CtkError, DatabaseAddress, Document, InputOutputResource, Result, SourceKind,
    TableAddress,
};
use ctk_dynamodb::{item_to_document, DynamoDbLocator, DynamoDbScanner, TableScanner};
use serde::{Serialize, Serializer};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Items requested per scan page
const SCAN_PAGE_LIMIT: i32 = 1000;

/// What to do when a record cannot be loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnError {
    /// Count the failure and continue
    #[default]
    Ignore,
    /// Abort the load
    Raise,
}

impl FromStr for OnError {
    type Err = CtkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(OnError::Ignore),
            "raise" => Ok(OnError::Raise),
            other => Err(CtkError::InvalidInput(format!(
                "Unknown error strategy '{}', expected 'ignore' or 'raise'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub batch_size: usize,
    pub on_error: OnError,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            on_error: OnError::default(),
        }
    }
}

impl LoadOptions {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(CtkError::InvalidInput(format!(
                "Batch size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }
        Ok(())
    }
}

/// Outcome of a completed load
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub source_table: String,
    pub target_table: String,
    /// Item count reported by the source, which may be approximate
    pub source_count: Option<i64>,
    /// Items actually read from the source
    pub scanned: u64,
    pub pages: u64,
    pub loaded: u64,
    pub failed: u64,
    pub target_count: i64,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: Serializer>(
    value: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

/// Copies one source table into a CrateDB table
pub struct TableLoader<S: TableScanner> {
    scanner: S,
    client: CrateDbClient,
    target: TableAddress,
    options: LoadOptions,
}

impl<S: TableScanner> TableLoader<S> {
    /// `target` may leave the table name open; it then follows the source table.
    pub fn new(
        scanner: S,
        client: CrateDbClient,
        target: TableAddress,
        options: LoadOptions,
    ) -> Self {
        Self {
            scanner,
            client,
            target,
            options,
        }
    }

    pub async fn run(&self) -> Result<LoadSummary> {
        self.options.validate()?;
        let started = Instant::now();

        let description = self.scanner.describe().await?;
        info!(
            "Source table {} has approximately {} items",
            description.name,
            description
                .item_count
                .map_or_else(|| "an unknown number of".to_string(), |n| n.to_string())
        );

        let target = self
            .target
            .clone()
            .with_default_table(description.name.to_lowercase());
        let target_table = target.fullname()?;
        info!("Loading into {}", target_table);

        self.client
            .run_sql(
                &sql::create_table_for_documents(&target_table, &description.key_columns()),
                None,
            )
            .await?;
        let insert = sql::insert_documents(&target_table);
        let key_names = description.key_names();

        let mut progress = Progress::default();
        let mut buffer: Vec<Document> = Vec::with_capacity(self.options.batch_size);
        let mut start_key = None;

        loop {
            let page = self
                .scanner
                .scan_page(start_key.take(), SCAN_PAGE_LIMIT)
                .await?;
            progress.pages += 1;
            progress.scanned += page.items.len() as u64;

            for item in &page.items {
                match item_to_document(item, &key_names) {
                    Ok(document) => buffer.push(document),
                    Err(e) => self.record_failure(&mut progress, 1, &e.to_string())?,
                }
                if buffer.len() >= self.options.batch_size {
                    self.flush(&insert, &mut buffer, &mut progress).await?;
                }
            }

            match page.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }
        self.flush(&insert, &mut buffer, &mut progress).await?;

        self.client.refresh_table(&target_table).await?;
        let target_count = self.client.count_records(&target_table).await?;

        let summary = LoadSummary {
            source_table: description.name,
            target_table,
            source_count: description.item_count,
            scanned: progress.scanned,
            pages: progress.pages,
            loaded: progress.loaded,
            failed: progress.failed,
            target_count,
            elapsed: started.elapsed(),
        };
        info!(
            "Loaded {} of {} records into {} ({} failed)",
            summary.loaded, summary.scanned, summary.target_table, summary.failed
        );
        Ok(summary)
    }

    async fn flush(
        &self,
        insert: &str,
        buffer: &mut Vec<Document>,
        progress: &mut Progress,
    ) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        let rows: Vec<_> = buffer.drain(..).map(Document::into_bulk_args).collect();
        let submitted = rows.len();
        debug!("Writing batch of {} records", submitted);

        let response = self.client.run_sql_bulk(insert, rows).await?;
        progress.loaded += response.succeeded() as u64;

        let failed = response.failed();
        if failed > 0 {
            let reason = response
                .results
                .iter()
                .find_map(|r| r.error.as_ref().map(|e| e.message.clone()))
                .unwrap_or_else(|| "bulk row rejected".to_string());
            self.record_failure(progress, failed as u64, &reason)?;
        }
        Ok(())
    }

    fn record_failure(&self, progress: &mut Progress, count: u64, reason: &str) -> Result<()> {
        progress.failed += count;
        match self.options.on_error {
            OnError::Ignore => {
                warn!("Failed to load {} record(s): {}", count, reason);
                Ok(())
            }
            OnError::Raise => Err(CtkError::OperationFailed(format!(
                "Failed to load record: {}",
                reason
            ))),
        }
    }
}

#[derive(Debug, Default)]
struct Progress {
    pages: u64,
    scanned: u64,
    loaded: u64,
    failed: u64,
}

/// Load a whole source table, chosen by the resource URL scheme.
///
/// The target table comes from the path of `address`; see [`TableLoader::new`].
pub async fn load_table(
    resource: &InputOutputResource,
    address: &DatabaseAddress,
    client: CrateDbClient,
    options: LoadOptions,
) -> Result<LoadSummary> {
    let (_, target) = address.decode()?;

    let summary = match resource.kind()? {
        SourceKind::DynamoDb => {
            let locator = DynamoDbLocator::parse(&resource.url)?;
            info!("Loading from {}", locator.safe());
            let scanner = DynamoDbScanner::connect(&locator).await?;
            TableLoader::new(scanner, client, target, options).run().await?
        }
        SourceKind::Unsupported(scheme) => {
            return Err(CtkError::NotImplemented(format!(
                "Importing resource not implemented yet: {}://",
                scheme
            )))
        }
    };

    check_summary(&summary, options.on_error)?;
    Ok(summary)
}

fn check_summary(summary: &LoadSummary, on_error: OnError) -> Result<()> {
    // `source_count` is DynamoDB's periodic estimate and may be stale.
    let nothing_loaded = summary.loaded == 0 && summary.scanned > 0;
    if nothing_loaded || (on_error == OnError::Raise && summary.failed > 0) {
        return Err(CtkError::OperationFailed("Data loading failed".to_string()));
    }
    Ok(())
}
