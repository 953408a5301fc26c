//! Data models for Taskboard entities.
//!
//! This module defines the core data structures:
//! - `Task` - Tracked work with dates, status, notes and a checklist
//! - `ChecklistItem` - A positional sub-step of a task
//! - `Progress` - Checklist completion, always derived, never stored
//! - `NewTask` / `TaskPatch` / `ImportRow` - Inputs to `TaskStore` mutations
//! - `Summary` - Dashboard metrics over a whole collection
//!
//! The serde field names match the on-disk snapshot format (`"Task"`,
//! `"Start"`, `"Finish"`, ...) so existing data files round-trip unchanged.

use crate::storage::dates;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Task status in the workflow.
///
/// The intended lifecycle is `NotStarted -> InProgress -> Completed`, with
/// `Completed -> InProgress` on reopen. Transitions are not enforced: any
/// status may be set directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "未開始")]
    NotStarted,
    #[serde(rename = "進行中")]
    InProgress,
    #[serde(rename = "已完成")]
    Completed,
}

impl TaskStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    /// The label persisted in the snapshot file.
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "未開始",
            TaskStatus::InProgress => "進行中",
            TaskStatus::Completed => "已完成",
        }
    }

    /// Parse a status from its persisted label or an English alias.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s {
            "未開始" => return Some(TaskStatus::NotStarted),
            "進行中" => return Some(TaskStatus::InProgress),
            "已完成" => return Some(TaskStatus::Completed),
            _ => {}
        }
        match s.to_lowercase().as_str() {
            "not_started" | "not-started" | "notstarted" | "todo" => Some(TaskStatus::NotStarted),
            "in_progress" | "in-progress" | "inprogress" => Some(TaskStatus::InProgress),
            "completed" | "done" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::parse(s)
            .ok_or_else(|| crate::Error::Validation(format!("Invalid status: {}", s)))
    }
}

/// A sub-step of a task.
///
/// Items carry no identifier: they are addressed by their current index,
/// which is only valid until the next structural change to the checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Description of the step
    #[serde(rename = "item")]
    pub text: String,

    /// Whether the step is done
    pub completed: bool,
}

impl ChecklistItem {
    /// Create a new, not yet completed item.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
        }
    }

    /// Build a checklist from free text, one item per non-blank line.
    pub fn parse_lines(text: &str) -> Vec<ChecklistItem> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ChecklistItem::new)
            .collect()
    }
}

/// A unit of tracked work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier, unique within the collection
    pub id: u64,

    /// Task title
    #[serde(rename = "Task")]
    pub name: String,

    /// First day of the task
    #[serde(rename = "Start", with = "dates::iso_date")]
    pub start: NaiveDate,

    /// Last day of the task
    #[serde(rename = "Finish", with = "dates::iso_date")]
    pub finish: NaiveDate,

    /// Free-text grouping label
    #[serde(rename = "Category")]
    pub category: String,

    /// Current status
    #[serde(rename = "Status")]
    pub status: TaskStatus,

    #[serde(rename = "Notes", default)]
    pub notes: String,

    /// Ordered sub-steps
    #[serde(rename = "Checklist", default)]
    pub checklist: Vec<ChecklistItem>,

    /// Username of the creator (or importer)
    #[serde(rename = "Created_by", default)]
    pub created_by: String,

    /// Local time the task was created or imported
    #[serde(rename = "Created_at", with = "dates::local_timestamp")]
    pub created_at: NaiveDateTime,

    /// Local time of the last edit, if any
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "dates::optional_timestamp"
    )]
    pub last_modified: Option<NaiveDateTime>,
}

impl Task {
    /// Checklist completion for this task.
    pub fn progress(&self) -> Progress {
        let completed = self.checklist.iter().filter(|item| item.completed).count();
        Progress::new(self.checklist.len(), completed)
    }
}

/// Progress statistics for a task's checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Total number of checklist items
    pub total: usize,
    /// Number of completed items
    pub completed: usize,
    /// Completion percentage (0-100)
    pub percentage: f64,
}

impl Progress {
    /// Create new progress stats.
    pub fn new(total: usize, completed: usize) -> Self {
        let percentage = if total > 0 {
            (completed as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        Self {
            total,
            completed,
            percentage,
        }
    }

    /// Items still open.
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }
}

/// Input for `TaskStore::create_task`.
///
/// Dates are optional so that a missing value can be reported as a
/// validation error rather than being impossible to express.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub name: String,
    pub start: Option<NaiveDate>,
    pub finish: Option<NaiveDate>,
    pub category: String,
    pub status: TaskStatus,
    pub notes: String,
    /// One checklist item per non-blank line
    pub checklist_text: String,
    pub created_by: String,
}

/// Field edits for `TaskStore::update_task`. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub start: Option<NaiveDate>,
    pub finish: Option<NaiveDate>,
    pub category: Option<String>,
    pub notes: Option<String>,
}

impl TaskPatch {
    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.start.is_none()
            && self.finish.is_none()
            && self.category.is_none()
            && self.notes.is_none()
    }
}

/// One row of tabular import data, still in textual form.
///
/// Columns: `Task, Start, Finish, Category, Status[, Notes]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRow {
    pub task: Option<String>,
    pub start: Option<String>,
    pub finish: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Dashboard metrics over a task collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    /// Completed tasks as a percentage of all tasks (0 when empty)
    pub completion_rate: f64,
    /// Task count per category, ordered by category name
    pub by_category: BTreeMap<String, usize>,
}

impl Summary {
    /// Compute metrics for the given tasks.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();

        let mut by_category = BTreeMap::new();
        for task in tasks {
            *by_category.entry(task.category.clone()).or_insert(0) += 1;
        }

        let total = tasks.len();
        let completed = count(TaskStatus::Completed);
        let completion_rate = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total,
            not_started: count(TaskStatus::NotStarted),
            in_progress: count(TaskStatus::InProgress),
            completed,
            completion_rate,
            by_category,
        }
    }
}
