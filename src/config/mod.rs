//! Configuration for Taskboard.
//!
//! ## config.kdl
//!
//! Located at (first match wins):
//! - `--config <path>` CLI flag
//! - `$TB_CONFIG`
//! - `~/.config/taskboard/config.kdl`
//!
//! Contains:
//! - `data-file` - Location of the task snapshot
//! - `output-format` - "json" or "human"
//! - `user` - Login table entries (`user "name" password="..." role="admin|viewer"`)
//!
//! A missing config file is not an error: it yields an empty config (no
//! users, so only guest sessions are possible).
//!
//! Use the [`resolver`] module for precedence resolution against CLI flags
//! and the environment.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, DATA_FILE_ENV, Resolved, ResolvedConfig, ValueSource, resolve_config,
    resolve_config_with_env,
};
pub use schema::{OutputFormat, TaskboardConfig, UserEntry};

use crate::{Error, Result};
use kdl::KdlDocument;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "TB_CONFIG";

/// Locate config.kdl.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|dir| dir.join("taskboard").join("config.kdl"))
}

/// Read and parse config.kdl; a missing file yields the empty config.
pub fn load_config(path: Option<&Path>) -> Result<TaskboardConfig> {
    let Some(path) = path else {
        return Ok(TaskboardConfig::new());
    };
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file");
        return Ok(TaskboardConfig::new());
    }

    let content = fs::read_to_string(path)?;
    let doc: KdlDocument = content
        .parse()
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    TaskboardConfig::from_kdl(&doc)
}

/// Write config.kdl, creating parent directories as needed.
pub fn save_config(path: &Path, config: &TaskboardConfig) -> Result<()> {
    config.validate()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, config.to_kdl_string())?;
    Ok(())
}
