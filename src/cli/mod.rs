//! CLI argument definitions for Taskboard.

use crate::auth::Role;
use crate::models::TaskStatus;
use crate::storage::dates::parse_loose_date;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Package version with build metadata, e.g. `0.1.0 (a1b2c3d 2024-01-01T00:00:00Z)`.
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TB_GIT_COMMIT"),
    " ",
    env!("TB_BUILD_TIMESTAMP"),
    ")"
);

/// Taskboard - track project tasks, their schedule and checklist progress.
///
/// Anyone may read the board. Changes require logging in as an admin
/// with `--user` and `--password`.
#[derive(Parser, Debug)]
#[command(name = "tb")]
#[command(author, version = VERSION, about = "Track project tasks and checklist progress", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Task snapshot file (overrides TB_DATA_FILE and config.kdl)
    #[arg(long, global = true)]
    pub data_file: Option<PathBuf>,

    /// Path to config.kdl
    #[arg(long, global = true, env = "TB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log in as this user (omit for a read-only guest session)
    #[arg(short = 'u', long, global = true, env = "TB_USER")]
    pub user: Option<String>,

    /// Password for --user
    #[arg(long, global = true, env = "TB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the current session's user and role
    Whoami,

    /// List tasks
    List {
        /// Filter by status (未開始/not-started, 進行中/in-progress, 已完成/completed)
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,

        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },

    /// Show one task with its checklist and progress
    Show {
        /// Task ID
        id: u64,
    },

    /// Dashboard counts and completion rate
    Summary,

    /// Create a new task
    Create {
        /// Task name
        name: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,

        /// Finish date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        finish: Option<NaiveDate>,

        /// Category
        #[arg(short, long, default_value = "")]
        category: String,

        /// Initial status
        #[arg(long, value_parser = parse_status, default_value = "未開始")]
        status: TaskStatus,

        /// Notes
        #[arg(short, long, default_value = "")]
        notes: String,

        /// Checklist as newline-separated text
        #[arg(long)]
        checklist: Option<String>,

        /// Checklist item (repeatable, appended after --checklist)
        #[arg(short, long = "item")]
        item: Vec<String>,
    },

    /// Edit a task's name, dates, category or notes
    Update {
        /// Task ID
        id: u64,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New start date
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,

        /// New finish date
        #[arg(long, value_parser = parse_date)]
        finish: Option<NaiveDate>,

        /// New category
        #[arg(short, long)]
        category: Option<String>,

        /// New notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: u64,
    },

    /// Set a task's status
    Status {
        /// Task ID
        id: u64,

        /// New status
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },

    /// Replace a task's notes
    Notes {
        /// Task ID
        id: u64,

        /// New notes text
        text: String,
    },

    /// Mark a task and its whole checklist as done
    Complete {
        /// Task ID
        id: u64,
    },

    /// Move a task back to in-progress
    Reopen {
        /// Task ID
        id: u64,
    },

    /// Checklist commands
    Checklist {
        #[command(subcommand)]
        command: ChecklistCommands,
    },

    /// Replace all tasks with the rows of a CSV file
    ///
    /// Expects a header row with Task, Start, Finish, Category, Status and
    /// optionally Notes. Any bad row aborts the import and leaves existing
    /// tasks untouched.
    Import {
        /// CSV file
        file: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Checklist subcommands
#[derive(Subcommand, Debug)]
pub enum ChecklistCommands {
    /// Append an item
    Add {
        /// Task ID
        id: u64,

        /// Item text
        text: String,
    },

    /// Flip an item between done and not done
    Toggle {
        /// Task ID
        id: u64,

        /// Zero-based item index
        index: usize,
    },

    /// Remove an item (later items shift down)
    Remove {
        /// Task ID
        id: u64,

        /// Zero-based item index
        index: usize,
    },

    /// Remove every item
    Clear {
        /// Task ID
        id: u64,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration and where each value came from
    Show,

    /// Add or replace a user in config.kdl
    SetUser {
        /// Username
        username: String,

        /// Password for the new user
        #[arg(long = "new-password")]
        new_password: String,

        /// Role (admin or viewer)
        #[arg(long, value_parser = parse_role, default_value = "viewer")]
        role: Role,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    parse_loose_date(s).ok_or_else(|| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(s).ok_or_else(|| {
        format!(
            "invalid status '{}', expected one of: {}",
            s,
            TaskStatus::ALL
                .iter()
                .map(|st| st.label())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })
}

fn parse_role(s: &str) -> Result<Role, String> {
    Role::parse(s).ok_or_else(|| format!("invalid role '{}', expected admin or viewer", s))
}
