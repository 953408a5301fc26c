//! Taskboard - A session-based project tracker.
//!
//! This library provides the core functionality for the `tb` CLI tool:
//! tasks with start/end dates, status, category and a per-task checklist,
//! held in memory by [`store::TaskStore`] and persisted as a full JSON
//! snapshot after every mutation.

pub mod action_log;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod import;
pub mod models;
pub mod storage;
pub mod store;


/// Library-level error type for Taskboard operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing required field, end before start, blank checklist text.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// End date earlier than start date at creation.
    #[error("Invalid input: end date {finish} is before start date {start}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        finish: chrono::NaiveDate,
    },

    #[error("Task not found: {0}")]
    TaskNotFound(u64),

    #[error("Checklist index {index} out of range (checklist has {len} items)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Tabular import rejected; nothing was changed.
    #[error("Import failed: {0}")]
    Import(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid username or password")]
    AuthenticationFailed,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Taskboard operations.
pub type Result<T> = std::result::Result<T, Error>;
