//! Configuration helpers shared by toolkit components
//!
//! Only path resolution lives here. The CLI owns its own settings file,
//! see `ctk::config`.

mod paths;

pub use paths::{default_config_dir, default_config_path};
