//! ctk-dynamodb
//!
//! DynamoDB source crate. Reads a table page by page and translates its items
//! into documents for CrateDB. The loader in the `ctk` crate only talks to
//! the [`TableScanner`] trait, so it can be driven by a mock in tests.
//!
//! Public API:
//! - `locator::DynamoDbLocator` - parsed `dynamodb://` URL
//! - `scanner::TableScanner` - paging abstraction over a source table
//! - `scanner::DynamoDbScanner` - AWS SDK implementation of `TableScanner`
//! - `convert` - attribute value → JSON translation

pub mod convert;
pub mod locator;
pub mod scanner;

pub use convert::{attribute_to_json, item_to_document, sql_type_for};
pub use locator::DynamoDbLocator;
pub use scanner::{
    DynamoDbScanner, Item, KeyAttribute, ScanPage, TableDescription, TableScanner,
};

