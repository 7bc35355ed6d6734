//! CLI configuration management
//!
//! Handles loading and saving CLI-specific configuration.

use anyhow::{Context, Result};
use ctk_core::DatabaseAddress;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Destination database, in `crate://` or `http(s)://` form
pub const ENV_CRATEDB_URL: &str = "CRATEDB_SQLALCHEMY_URL";
pub const ENV_FORMAT: &str = "CTK_FORMAT";
pub const ENV_VERBOSE: &str = "CTK_VERBOSE";
pub const ENV_TIMEOUT: &str = "CTK_TIMEOUT";
pub const ENV_BATCH_SIZE: &str = "CTK_BATCH_SIZE";
/// Alternative configuration file location
pub const ENV_CONFIG: &str = "CTK_CONFIG";

/// Largest accepted batch size for bulk inserts
pub const MAX_BATCH_SIZE: usize = 10_000;

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CliConfig {
    /// Default CrateDB address
    pub cratedb_url: String,

    /// Default output format
    pub output_format: String,

    /// Enable verbose logging by default
    pub verbose: bool,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Number of records per bulk insert
    pub batch_size: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            cratedb_url: "crate://crate@localhost:4200/".to_string(),
            output_format: "table".to_string(),
            verbose: false,
            timeout: 30,
            batch_size: 100,
        }
    }
}

impl CliConfig {
    /// Load configuration from `path`, or fall back to defaults when missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).context("Failed to read CLI config file")?;

            toml::from_str(&content).context("Failed to parse CLI config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize CLI config")?;

        std::fs::write(path, content).context("Failed to write CLI config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        std::env::var(ENV_CONFIG)
            .map(PathBuf::from)
            .unwrap_or_else(|_| ctk_core::default_config_path())
    }

    /// The configured database address.
    pub fn database_address(&self) -> Result<DatabaseAddress> {
        DatabaseAddress::parse(&self.cratedb_url)
            .with_context(|| format!("Invalid CrateDB address in {}", ENV_CRATEDB_URL))
    }

    /// Create a new builder for constructing configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for CLI configuration with validation and priority chain support
///
/// Priority chain (lowest to highest):
/// 1. Defaults
/// 2. Config file
/// 3. Environment variables
/// 4. CLI arguments
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    cratedb_url: Option<String>,
    output_format: Option<String>,
    verbose: Option<bool>,
    timeout: Option<u64>,
    batch_size: Option<usize>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set database URL (with validation)
    pub fn with_cratedb_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        Self::validate_url(&url)?;
        self.cratedb_url = Some(url);
        Ok(self)
    }

    /// Set output format (with validation)
    pub fn with_output_format(mut self, format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        Self::validate_output_format(&format)?;
        self.output_format = Some(format);
        Ok(self)
    }

    /// Set verbose flag
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Set timeout (with validation)
    pub fn with_timeout(mut self, timeout: u64) -> Result<Self> {
        Self::validate_timeout(timeout)?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// Set batch size (with validation)
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        Self::validate_batch_size(batch_size)?;
        self.batch_size = Some(batch_size);
        Ok(self)
    }

    /// Load configuration from file
    ///
    /// A missing or unreadable file leaves the builder unchanged.
    pub fn with_config_file(self, path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => CliConfig::config_path(),
        };

        match CliConfig::load_from(&path) {
            Ok(config) => {
                let builder = self;
                // Only use file values if they weren't already set (preserving priority)
                Ok(Self {
                    cratedb_url: builder.cratedb_url.or(Some(config.cratedb_url)),
                    output_format: builder.output_format.or(Some(config.output_format)),
                    verbose: builder.verbose.or(Some(config.verbose)),
                    timeout: builder.timeout.or(Some(config.timeout)),
                    batch_size: builder.batch_size.or(Some(config.batch_size)),
                })
            }
            Err(_) => Ok(self),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Environment values take precedence over anything loaded so far;
    /// CLI arguments applied afterwards override them in turn.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_CRATEDB_URL) {
            // Validate before applying
            if Self::validate_url(&url).is_ok() {
                self.cratedb_url = Some(url);
            }
        }

        if let Ok(format) = std::env::var(ENV_FORMAT) {
            if Self::validate_output_format(&format).is_ok() {
                self.output_format = Some(format);
            }
        }

        if let Ok(verbose) = std::env::var(ENV_VERBOSE) {
            self.verbose = Some(verbose.to_lowercase() == "true" || verbose == "1");
        }

        if let Ok(timeout) = std::env::var(ENV_TIMEOUT) {
            if let Ok(timeout) = timeout.parse() {
                if Self::validate_timeout(timeout).is_ok() {
                    self.timeout = Some(timeout);
                }
            }
        }

        if let Ok(batch_size) = std::env::var(ENV_BATCH_SIZE) {
            if let Ok(batch_size) = batch_size.parse() {
                if Self::validate_batch_size(batch_size).is_ok() {
                    self.batch_size = Some(batch_size);
                }
            }
        }

        self
    }

    /// Build the final configuration with validation
    pub fn build(self) -> Result<CliConfig> {
        let defaults = CliConfig::default();

        let cratedb_url = self.cratedb_url.unwrap_or(defaults.cratedb_url);
        let output_format = self.output_format.unwrap_or(defaults.output_format);
        let timeout = self.timeout.unwrap_or(defaults.timeout);
        let batch_size = self.batch_size.unwrap_or(defaults.batch_size);

        // Validate final values
        Self::validate_url(&cratedb_url)?;
        Self::validate_output_format(&output_format)?;
        Self::validate_timeout(timeout)?;
        Self::validate_batch_size(batch_size)?;

        Ok(CliConfig {
            cratedb_url,
            output_format,
            verbose: self.verbose.unwrap_or(defaults.verbose),
            timeout,
            batch_size,
        })
    }

    /// Validate database URL
    fn validate_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(anyhow::anyhow!("CrateDB URL cannot be empty"));
        }

        if !url.starts_with("crate://")
            && !url.starts_with("http://")
            && !url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "CrateDB URL must start with crate://, http:// or https://"
            ));
        }

        DatabaseAddress::parse(url)?;
        Ok(())
    }

    /// Validate output format
    fn validate_output_format(format: &str) -> Result<()> {
        match format {
            "table" | "json" => Ok(()),
            _ => Err(anyhow::anyhow!(
                "Invalid output format '{}'. Must be 'table' or 'json'",
                format
            )),
        }
    }

    /// Validate timeout value
    fn validate_timeout(timeout: u64) -> Result<()> {
        if timeout == 0 {
            return Err(anyhow::anyhow!("Timeout must be greater than 0"));
        }

        if timeout > 3600 {
            return Err(anyhow::anyhow!(
                "Timeout must be less than or equal to 3600 seconds"
            ));
        }

        Ok(())
    }

    /// Validate batch size
    fn validate_batch_size(batch_size: usize) -> Result<()> {
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            return Err(anyhow::anyhow!(
                "Batch size must be between 1 and {}",
                MAX_BATCH_SIZE
            ));
        }
        Ok(())
    }
}
