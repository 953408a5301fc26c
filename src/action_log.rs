//! Audit trail of `tb` invocations.
//!
//! Each command appends one JSON line to `action.log` next to the task
//! snapshot, recording who ran what, whether it worked and how long it took.
//! Logging problems are reported as warnings and never fail the command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Set to `0`, `false` or `off` to disable the action log.
pub const ACTION_LOG_ENV: &str = "TB_ACTION_LOG";

/// Overrides the action log location.
pub const ACTION_LOG_PATH_ENV: &str = "TB_ACTION_LOG_PATH";

const ACTION_LOG_FILE: &str = "action.log";

/// One line of the action log.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// When the command finished
    pub timestamp: DateTime<Utc>,

    /// Command name (e.g., "create", "checklist toggle")
    pub command: String,

    /// Command arguments as JSON, with secrets redacted
    pub args: serde_json::Value,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,

    /// Session user (`guest` for anonymous sessions)
    pub user: String,
}

/// Append an entry to the action log under `data_dir`.
pub fn log_action(
    data_dir: &Path,
    command: &str,
    args: serde_json::Value,
    user: &str,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    if !is_enabled(std::env::var(ACTION_LOG_ENV).ok().as_deref()) {
        return;
    }

    let entry = ActionLog {
        timestamp: Utc::now(),
        command: command.to_string(),
        args: sanitize_args(&args),
        success,
        error,
        duration_ms,
        user: user.to_string(),
    };

    let path = log_path(data_dir);
    if let Err(e) = write_log_entry(&path, &entry) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write action log");
    }
}

fn is_enabled(setting: Option<&str>) -> bool {
    !matches!(
        setting.map(|s| s.trim().to_lowercase()).as_deref(),
        Some("0" | "false" | "off" | "no")
    )
}

/// Location of the action log: `$TB_ACTION_LOG_PATH` or `<data_dir>/action.log`.
pub fn log_path(data_dir: &Path) -> PathBuf {
    match std::env::var(ACTION_LOG_PATH_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => data_dir.join(ACTION_LOG_FILE),
    }
}

fn write_log_entry(path: &Path, entry: &ActionLog) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)
}

/// Redact credentials and shorten long values.
fn sanitize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let lower = key.to_lowercase();
                    let value = if lower.contains("password") || lower.contains("secret") {
                        serde_json::Value::String("[REDACTED]".to_string())
                    } else {
                        sanitize_args(value)
                    };
                    (key.clone(), value)
                })
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(sanitize_args).collect())
        }
        serde_json::Value::String(s) if s.chars().count() > 100 => {
            let head: String = s.chars().take(97).collect();
            serde_json::Value::String(format!("{}... ({} chars)", head, s.chars().count()))
        }
        _ => args.clone(),
    }
}
