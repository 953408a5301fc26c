//! In-memory task collection and its mutation contract.
//!
//! `TaskStore` owns the collection for one session and mediates every
//! change. Each mutation is applied to a working copy, the whole copy is
//! handed to the [`Persistence`] backend, and only after a successful save
//! does the copy replace the in-memory collection. A failed validation or
//! a failed save therefore leaves both memory and disk as they were.
//!
//! Checklist items are addressed by index. An index is only meaningful
//! until the next structural change (remove, clear, import); callers must
//! re-read the task afterwards.

use crate::models::{ChecklistItem, ImportRow, NewTask, Summary, Task, TaskPatch, TaskStatus};
use crate::storage::Persistence;
use crate::storage::dates::parse_loose_date;
use crate::{Error, Result};
use chrono::{Local, NaiveDateTime, Timelike};
use std::collections::HashSet;

/// The session's task collection.
pub struct TaskStore<P: Persistence> {
    backend: P,
    tasks: Vec<Task>,
    next_id: u64,
}

impl<P: Persistence> TaskStore<P> {
    /// Open a store, loading whatever the backend holds.
    ///
    /// Never fails: a missing snapshot is an empty collection, and an
    /// unreadable one is logged and treated as empty.
    pub fn open(backend: P) -> Self {
        let mut store = Self {
            backend,
            tasks: Vec::new(),
            next_id: 0,
        };
        store.load_all();
        store
    }

    /// Reload the collection from the backend, discarding in-memory state.
    pub fn load_all(&mut self) -> &[Task] {
        let loaded = if self.backend.exists() {
            self.backend
                .load()
                .and_then(|tasks| next_id_after(&tasks).map(|next| (tasks, next)))
        } else {
            tracing::debug!(location = %self.backend.location(), "no snapshot yet");
            Ok((Vec::new(), 0))
        };

        (self.tasks, self.next_id) = loaded.unwrap_or_else(|e| {
            tracing::warn!(
                location = %self.backend.location(),
                error = %e,
                "could not load tasks, starting with an empty collection"
            );
            (Vec::new(), 0)
        });
        &self.tasks
    }

    /// All tasks in collection order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The persistence backend.
    pub fn backend(&self) -> &P {
        &self.backend
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: u64) -> Result<&Task> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or(Error::TaskNotFound(id))
    }

    /// Dashboard metrics for the current collection.
    pub fn summary(&self) -> Summary {
        Summary::from_tasks(&self.tasks)
    }

    // === Task Operations ===

    /// Create a task and append it to the collection.
    ///
    /// Requires a non-blank name and both dates, with `finish >= start`.
    /// The checklist is built from `checklist_text`, one item per
    /// non-blank line.
    pub fn create_task(&mut self, input: NewTask) -> Result<&Task> {
        let (start, finish) = match (input.start, input.finish) {
            (Some(start), Some(finish)) if !input.name.trim().is_empty() => (start, finish),
            _ => {
                return Err(Error::Validation(
                    "Task name, start date and end date are required".to_string(),
                ));
            }
        };
        if finish < start {
            return Err(Error::InvalidDateRange { start, finish });
        }

        let next_id = self.next_id.checked_add(1).ok_or_else(|| {
            Error::Validation("No task IDs left; the collection is exhausted".to_string())
        })?;

        let task = Task {
            id: self.next_id,
            name: input.name,
            start,
            finish,
            category: input.category,
            status: input.status,
            notes: input.notes,
            checklist: ChecklistItem::parse_lines(&input.checklist_text),
            created_by: input.created_by,
            created_at: local_now(),
            last_modified: None,
        };
        let id = task.id;

        let mut tasks = self.tasks.clone();
        tasks.push(task);
        self.commit(tasks)?;
        self.next_id = next_id;

        tracing::info!(id, "created task");
        self.get_task(id)
    }

    /// Edit name, category, dates or notes.
    ///
    /// Dates are not re-checked against each other here; only creation
    /// enforces `finish >= start`.
    pub fn update_task(&mut self, id: u64, patch: TaskPatch) -> Result<&Task> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(Error::Validation("Task name cannot be blank".to_string()));
            }
        }
        if patch.is_empty() {
            return self.get_task(id);
        }

        self.modify(id, |task| {
            if let Some(name) = patch.name {
                task.name = name;
            }
            if let Some(start) = patch.start {
                task.start = start;
            }
            if let Some(finish) = patch.finish {
                task.finish = finish;
            }
            if let Some(category) = patch.category {
                task.category = category;
            }
            if let Some(notes) = patch.notes {
                task.notes = notes;
            }
            Ok(())
        })?;

        tracing::info!(id, "updated task");
        self.get_task(id)
    }

    /// Set a task's status. Returns whether anything changed.
    ///
    /// Any status may be set from any other; nothing is persisted when the
    /// status is already `status`.
    pub fn update_status(&mut self, id: u64, status: TaskStatus) -> Result<bool> {
        if self.get_task(id)?.status == status {
            return Ok(false);
        }
        self.modify(id, |task| {
            task.status = status;
            Ok(())
        })?;
        tracing::info!(id, status = %status, "updated status");
        Ok(true)
    }

    /// Replace a task's notes. Returns whether anything changed.
    pub fn update_notes(&mut self, id: u64, notes: &str) -> Result<bool> {
        if self.get_task(id)?.notes == notes {
            return Ok(false);
        }
        self.modify(id, |task| {
            task.notes = notes.to_string();
            Ok(())
        })?;
        tracing::info!(id, "updated notes");
        Ok(true)
    }

    /// Mark a task completed, completing every checklist item with it.
    ///
    /// Reopening later does not un-complete the checklist.
    pub fn mark_completed(&mut self, id: u64) -> Result<&Task> {
        self.modify(id, |task| {
            task.status = TaskStatus::Completed;
            for item in &mut task.checklist {
                item.completed = true;
            }
            Ok(())
        })?;
        tracing::info!(id, "marked task completed");
        self.get_task(id)
    }

    /// Move a task back to in progress.
    pub fn reopen(&mut self, id: u64) -> Result<&Task> {
        self.modify(id, |task| {
            task.status = TaskStatus::InProgress;
            Ok(())
        })?;
        tracing::info!(id, "reopened task");
        self.get_task(id)
    }

    /// Delete a task by ID, returning it.
    pub fn delete_task(&mut self, id: u64) -> Result<Task> {
        let pos = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(Error::TaskNotFound(id))?;

        let mut tasks = self.tasks.clone();
        let removed = tasks.remove(pos);
        self.commit(tasks)?;

        tracing::info!(id, "deleted task");
        Ok(removed)
    }

    // === Checklist Operations ===

    /// Flip the item at `index`. Returns its new completion state.
    pub fn toggle_checklist_item(&mut self, id: u64, index: usize) -> Result<bool> {
        let completed = self.modify(id, |task| {
            let len = task.checklist.len();
            let item = task
                .checklist
                .get_mut(index)
                .ok_or(Error::IndexOutOfRange { index, len })?;
            item.completed = !item.completed;
            Ok(item.completed)
        })?;
        tracing::info!(id, index, completed, "toggled checklist item");
        Ok(completed)
    }

    /// Append a not-yet-completed item.
    pub fn append_checklist_item(&mut self, id: u64, text: &str) -> Result<&Task> {
        if text.trim().is_empty() {
            return Err(Error::Validation(
                "Checklist item text cannot be blank".to_string(),
            ));
        }
        self.modify(id, |task| {
            task.checklist.push(ChecklistItem::new(text));
            Ok(())
        })?;
        tracing::info!(id, "appended checklist item");
        self.get_task(id)
    }

    /// Remove the item at `index`; later items shift down by one.
    pub fn remove_checklist_item(&mut self, id: u64, index: usize) -> Result<ChecklistItem> {
        let removed = self.modify(id, |task| {
            let len = task.checklist.len();
            if index >= len {
                return Err(Error::IndexOutOfRange { index, len });
            }
            Ok(task.checklist.remove(index))
        })?;
        tracing::info!(id, index, "removed checklist item");
        Ok(removed)
    }

    /// Remove every checklist item.
    pub fn clear_checklist(&mut self, id: u64) -> Result<&Task> {
        self.modify(id, |task| {
            task.checklist.clear();
            Ok(())
        })?;
        tracing::info!(id, "cleared checklist");
        self.get_task(id)
    }

    // === Import ===

    /// Replace the whole collection with tasks built from `rows`.
    ///
    /// All-or-nothing: the first row that is missing a required column or
    /// has an unparseable date or status aborts the import and leaves the
    /// existing collection (in memory and on disk) untouched. Imported
    /// tasks get their row position as ID and an empty checklist.
    pub fn import_from_table(&mut self, rows: &[ImportRow], imported_by: &str) -> Result<&[Task]> {
        let imported_at = local_now();
        let tasks = rows
            .iter()
            .enumerate()
            .map(|(i, row)| build_imported_task(i, row, imported_by, imported_at))
            .collect::<Result<Vec<_>>>()?;

        let count = tasks.len();
        self.commit(tasks)?;
        self.next_id = count as u64;

        tracing::info!(count, "imported tasks");
        Ok(&self.tasks)
    }

    // === Internals ===

    /// Persist `tasks` and, on success, make them the current collection.
    fn commit(&mut self, tasks: Vec<Task>) -> Result<()> {
        self.backend.save(&tasks)?;
        self.tasks = tasks;
        Ok(())
    }

    /// Apply `f` to a copy of task `id`, stamp it, and commit.
    fn modify<T>(&mut self, id: u64, f: impl FnOnce(&mut Task) -> Result<T>) -> Result<T> {
        let mut tasks = self.tasks.clone();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::TaskNotFound(id))?;
        let out = f(&mut *task)?;
        task.last_modified = Some(local_now());
        self.commit(tasks)?;
        Ok(out)
    }
}

/// The ID after the largest one in `tasks` (0 when empty).
///
/// Fails when two tasks share an ID or the largest ID leaves no successor.
fn next_id_after(tasks: &[Task]) -> Result<u64> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.id) {
            return Err(Error::Persistence(format!(
                "duplicate task id {} in snapshot",
                task.id
            )));
        }
    }
    match tasks.iter().map(|t| t.id).max() {
        None => Ok(0),
        Some(max) => max.checked_add(1).ok_or_else(|| {
            Error::Persistence(format!("task id {} leaves no room for new tasks", max))
        }),
    }
}

/// Current local time at second precision, as stored in the snapshot.
fn local_now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

fn build_imported_task(
    index: usize,
    row: &ImportRow,
    imported_by: &str,
    imported_at: NaiveDateTime,
) -> Result<Task> {
    let line = index + 1;
    let required = |value: &Option<String>, column: &str| -> Result<String> {
        value
            .clone()
            .ok_or_else(|| Error::Import(format!("row {}: missing column '{}'", line, column)))
    };
    let date = |value: &Option<String>, column: &str| -> Result<chrono::NaiveDate> {
        let raw = required(value, column)?;
        parse_loose_date(&raw).ok_or_else(|| {
            Error::Import(format!("row {}: invalid date in '{}': {:?}", line, column, raw))
        })
    };

    let name = required(&row.task, "Task")?;
    if name.trim().is_empty() {
        return Err(Error::Import(format!("row {}: empty 'Task'", line)));
    }
    let start = date(&row.start, "Start")?;
    let finish = date(&row.finish, "Finish")?;
    let category = required(&row.category, "Category")?;
    let raw_status = required(&row.status, "Status")?;
    let status = TaskStatus::parse(&raw_status).ok_or_else(|| {
        Error::Import(format!("row {}: unknown status {:?}", line, raw_status))
    })?;

    Ok(Task {
        id: index as u64,
        name,
        start,
        finish,
        category,
        status,
        notes: row.notes.clone().unwrap_or_default(),
        checklist: Vec::new(),
        created_by: imported_by.to_string(),
        created_at: imported_at,
        last_modified: None,
    })
}
