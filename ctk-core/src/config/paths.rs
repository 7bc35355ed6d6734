//! Default path resolution for configuration files
//!
//! Uses XDG Base Directory specification when available, with sensible fallbacks.

use std::path::PathBuf;

/// Returns the toolkit's configuration directory.
///
/// - Linux/macOS: `~/.config/cratedb-toolkit`
/// - Fallback: `/etc/cratedb-toolkit`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join("cratedb-toolkit")
}

/// Returns the default path for the CLI configuration file.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("cli.toml")
}
