//! CrateDB Toolkit Core Library
//!
//! Shared types, models, and utilities for the CrateDB toolkit.
//! This crate is used by both the DynamoDB source and the CLI components.

pub mod address;
pub mod api;
pub mod config;
pub mod error;
pub mod record;
pub mod sql;

// Re-export commonly used types
pub use address::{DatabaseAddress, InputOutputResource, SourceKind, TableAddress};
pub use config::default_config_path;
pub use error::*;
pub use record::Document;
