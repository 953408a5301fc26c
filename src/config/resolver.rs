//! Precedence resolution for configuration.
//!
//! ## Data file (highest to lowest)
//!
//! 1. `--data-file` CLI flag
//! 2. `TB_DATA_FILE` environment variable
//! 3. `data-file` in config.kdl
//! 4. `$TB_DATA_DIR/tasks.json`, else `~/.local/share/taskboard/tasks.json`
//!
//! ## Output format (highest to lowest)
//!
//! 1. `-H` CLI flag
//! 2. `output-format` in config.kdl
//! 3. JSON

use crate::auth::UserTable;
use crate::config::{OutputFormat, TaskboardConfig};
use crate::storage::{DEFAULT_DATA_FILE, get_data_dir_with_env};
use crate::Result;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data file.
pub const DATA_FILE_ENV: &str = "TB_DATA_FILE";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    ConfigFile,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Snapshot file location
    pub data_file: Resolved<PathBuf>,
    /// Output format preference
    pub output_format: Resolved<OutputFormat>,
    /// Login table
    pub users: UserTable,
}

impl ResolvedConfig {
    /// Get the data file path.
    pub fn data_file(&self) -> &Path {
        &self.data_file.value
    }

    /// Get the output format value.
    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Data file override from CLI flag
    pub data_file: Option<PathBuf>,
    /// Output format override from CLI flag
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set data file override.
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    /// Set output format override.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Resolve configuration using the process environment.
pub fn resolve_config(
    config: &TaskboardConfig,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig> {
    resolve_config_with_env(config, overrides, |name| std::env::var(name).ok())
}

/// Resolve configuration with an explicit environment lookup.
pub fn resolve_config_with_env(
    config: &TaskboardConfig,
    overrides: &ConfigOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let data_file = if let Some(ref path) = overrides.data_file {
        Resolved::new(path.clone(), ValueSource::CliFlag)
    } else if let Some(path) = env(DATA_FILE_ENV).filter(|p| !p.is_empty()) {
        Resolved::new(
            PathBuf::from(path),
            ValueSource::EnvVar(DATA_FILE_ENV.to_string()),
        )
    } else if let Some(ref path) = config.data_file {
        Resolved::new(path.clone(), ValueSource::ConfigFile)
    } else {
        Resolved::new(
            get_data_dir_with_env(&env)?.join(DEFAULT_DATA_FILE),
            ValueSource::Default,
        )
    };

    let output_format = if let Some(ref format) = overrides.output_format {
        Resolved::new(format.clone(), ValueSource::CliFlag)
    } else if let Some(ref format) = config.output_format {
        Resolved::new(format.clone(), ValueSource::ConfigFile)
    } else {
        Resolved::new(OutputFormat::Json, ValueSource::Default)
    };

    Ok(ResolvedConfig {
        data_file,
        output_format,
        users: config.user_table(),
    })
}
