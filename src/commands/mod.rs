//! Command implementations for the Taskboard CLI.
//!
//! Each command takes the store and the caller's [`Session`] explicitly
//! and returns a value implementing [`Output`], which `main` prints as JSON
//! or human-readable text. Role checks happen here: the store itself is
//! role-agnostic.

use crate::auth::{Role, Session, UserTable};
use crate::config::{self, ResolvedConfig, TaskboardConfig, UserEntry};
use crate::import::parse_csv;
use crate::models::{ChecklistItem, NewTask, Progress, Summary, Task, TaskPatch, TaskStatus};
use crate::storage::Persistence;
use crate::store::TaskStore;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

// === Sessions ===

/// Open a session from optional CLI credentials.
///
/// No username (or `guest` without a password) yields a guest session.
pub fn open_session(
    users: &UserTable,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<Session> {
    match (username, password) {
        (None, _) => Ok(Session::guest()),
        (Some(crate::auth::GUEST_USER), None) => Ok(Session::guest()),
        (Some(user), password) => users.login(user, password.unwrap_or_default()),
    }
}

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub username: String,
    pub role: Role,
}

impl Output for WhoAmI {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Logged in as {} ({})", self.username, self.role)
    }
}

pub fn whoami(session: &Session) -> WhoAmI {
    WhoAmI {
        username: session.username.clone(),
        role: session.role,
    }
}

// === Views ===

/// A task together with its derived progress.
#[derive(Debug, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    #[serde(rename = "Progress")]
    pub progress: Progress,
}

impl TaskView {
    fn new(task: &Task) -> Self {
        Self {
            task: task.clone(),
            progress: task.progress(),
        }
    }

    fn one_line(&self) -> String {
        format!(
            "[{}] {}  {} .. {}  {}  {}  {:.1}%",
            self.task.id,
            self.task.name,
            self.task.start,
            self.task.finish,
            self.task.category,
            self.task.status,
            self.progress.percentage
        )
    }
}

impl Output for TaskView {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let task = &self.task;
        let mut lines = vec![
            format!("Task {}: {}", task.id, task.name),
            format!("  Dates:    {} .. {}", task.start, task.finish),
            format!("  Category: {}", task.category),
            format!("  Status:   {}", task.status),
            format!(
                "  Created:  {} by {}",
                task.created_at.format(crate::storage::dates::TIMESTAMP_FORMAT),
                task.created_by
            ),
        ];
        if let Some(modified) = task.last_modified {
            lines.push(format!(
                "  Modified: {}",
                modified.format(crate::storage::dates::TIMESTAMP_FORMAT)
            ));
        }
        if !task.notes.is_empty() {
            lines.push(format!("  Notes:    {}", task.notes));
        }
        if task.checklist.is_empty() {
            lines.push("  Checklist: (empty)".to_string());
        } else {
            lines.push(format!(
                "  Checklist: {}/{} done ({:.1}%)",
                self.progress.completed, self.progress.total, self.progress.percentage
            ));
            for (i, item) in task.checklist.iter().enumerate() {
                let mark = if item.completed { "x" } else { " " };
                lines.push(format!("    {}. [{}] {}", i, mark, item.text));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct TaskList {
    pub tasks: Vec<TaskView>,
    pub count: usize,
}

impl Output for TaskList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return "No tasks.".to_string();
        }
        let mut lines = vec![format!("{} task(s):", self.count)];
        lines.extend(self.tasks.iter().map(TaskView::one_line));
        lines.join("\n")
    }
}

/// List tasks, optionally filtered by status and category.
pub fn task_list<P: Persistence>(
    store: &TaskStore<P>,
    status: Option<TaskStatus>,
    category: Option<&str>,
) -> TaskList {
    let tasks: Vec<TaskView> = store
        .tasks()
        .iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .filter(|t| category.is_none_or(|c| t.category == c))
        .map(TaskView::new)
        .collect();
    TaskList {
        count: tasks.len(),
        tasks,
    }
}

pub fn task_show<P: Persistence>(store: &TaskStore<P>, id: u64) -> Result<TaskView> {
    Ok(TaskView::new(store.get_task(id)?))
}

impl Output for Summary {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Total tasks:     {}", self.total),
            format!("Completed:       {}", self.completed),
            format!("In progress:     {}", self.in_progress),
            format!("Not started:     {}", self.not_started),
            format!("Completion rate: {:.1}%", self.completion_rate),
        ];
        if !self.by_category.is_empty() {
            lines.push("By category:".to_string());
            for (category, count) in &self.by_category {
                let label = if category.is_empty() { "(none)" } else { category };
                lines.push(format!("  {}: {}", label, count));
            }
        }
        lines.join("\n")
    }
}

pub fn summary<P: Persistence>(store: &TaskStore<P>) -> Summary {
    store.summary()
}

// === Task mutations ===

/// Arguments for `tb create`.
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
    pub name: String,
    pub start: Option<NaiveDate>,
    pub finish: Option<NaiveDate>,
    pub category: String,
    pub status: TaskStatus,
    pub notes: String,
    pub checklist: Option<String>,
    pub items: Vec<String>,
}

/// Result of a command that changed (or tried to change) one task.
#[derive(Debug, Serialize)]
pub struct TaskChanged {
    pub action: &'static str,
    pub changed: bool,
    pub task: TaskView,
}

impl Output for TaskChanged {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.changed {
            format!("{} task {}\n{}", self.action, self.task.task.id, self.task.one_line())
        } else {
            format!("Task {} unchanged", self.task.task.id)
        }
    }
}

fn changed<P: Persistence>(
    store: &TaskStore<P>,
    action: &'static str,
    id: u64,
    changed: bool,
) -> Result<TaskChanged> {
    Ok(TaskChanged {
        action,
        changed,
        task: TaskView::new(store.get_task(id)?),
    })
}

pub fn task_create<P: Persistence>(
    store: &mut TaskStore<P>,
    session: &Session,
    args: CreateArgs,
) -> Result<TaskChanged> {
    session.require_admin("create")?;

    let mut lines: Vec<String> = args.checklist.into_iter().collect();
    lines.extend(args.items);

    let task = store.create_task(NewTask {
        name: args.name,
        start: args.start,
        finish: args.finish,
        category: args.category,
        status: args.status,
        notes: args.notes,
        checklist_text: lines.join("\n"),
        created_by: session.username.clone(),
    })?;
    Ok(TaskChanged {
        action: "Created",
        changed: true,
        task: TaskView::new(task),
    })
}

pub fn task_update<P: Persistence>(
    store: &mut TaskStore<P>,
    session: &Session,
    id: u64,
    patch: TaskPatch,
) -> Result<TaskChanged> {
    session.require_admin("update")?;
    let is_change = !patch.is_empty();
    store.update_task(id, patch)?;
    changed(store, "Updated", id, is_change)
}

#[derive(Debug, Serialize)]
pub struct TaskDeleted {
    pub deleted: bool,
    pub id: u64,
    pub name: String,
}

impl Output for TaskDeleted {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted task {} \"{}\"", self.id, self.name)
    }
}

pub fn task_delete<P: Persistence>(
    store: &mut TaskStore<P>,
    session: &Session,
    id: u64,
) -> Result<TaskDeleted> {
    session.require_admin("delete")?;
    let task = store.delete_task(id)?;
    Ok(TaskDeleted {
        deleted: true,
        id: task.id,
        name: task.name,
    })
}

pub fn task_status<P: Persistence>(
    store: &mut TaskStore<P>,
    session: &Session,
    id: u64,
    status: TaskStatus,
) -> Result<TaskChanged> {
    session.require_admin("status")?;
    let did_change = store.update_status(id, status)?;
    changed(store, "Updated status of", id, did_change)
}

pub fn task_notes<P: Persistence>(
    store: &mut TaskStore<P>,
    session: &Session,
    id: u64,
    notes: &str,
) -> Result<TaskChanged> {
    session.require_admin("notes")?;
    let did_change = store.update_notes(id, notes)?;
    changed(store, "Updated notes of", id, did_change)
}

pub fn task_complete<P: Persistence>(
    store: &mut TaskStore<P>,
    session: &Session,
    id: u64,
) -> Result<TaskChanged> {
    session.require_admin("complete")?;
    store.mark_completed(id)?;
    changed(store, "Completed", id, true)
}

pub fn task_reopen<P: Persistence>(
    store: &mut TaskStore<P>,
    session: &Session,
    id: u64,
) -> Result<TaskChanged> {
    session.require_admin("reopen")?;
    store.reopen(id)?;
    changed(store, "Reopened", id, true)
}

// === Checklist ===

pub fn checklist_add<P: Persistence>(
    store: &mut TaskStore<P>,
    session: &Session,
    id: u64,
    text: &str,
) -> Result<TaskChanged> {
    session.require_admin("checklist add")?;
    store.append_checklist_item(id, text)?;
    changed(store, "Added checklist item to", id, true)
}

pub fn checklist_toggle<P: Persistence>(
    store: &mut TaskStore<P>,
    session: &Session,
    id: u64,
    index: usize,
) -> Result<TaskChanged> {
    session.require_admin("checklist toggle")?;
    store.toggle_checklist_item(id, index)?;
    changed(store, "Toggled checklist item on", id, true)
}

#[derive(Debug, Serialize)]
pub struct ChecklistItemRemoved {
    pub id: u64,
    pub index: usize,
    pub removed: ChecklistItem,
    pub remaining: usize,
}

impl Output for ChecklistItemRemoved {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Removed item {} (\"{}\") from task {}; {} item(s) left",
            self.index, self.removed.text, self.id, self.remaining
        )
    }
}

pub fn checklist_remove<P: Persistence>(
    store: &mut TaskStore<P>,
    session: &Session,
    id: u64,
    index: usize,
) -> Result<ChecklistItemRemoved> {
    session.require_admin("checklist remove")?;
    let removed = store.remove_checklist_item(id, index)?;
    Ok(ChecklistItemRemoved {
        id,
        index,
        removed,
        remaining: store.get_task(id)?.checklist.len(),
    })
}

pub fn checklist_clear<P: Persistence>(
    store: &mut TaskStore<P>,
    session: &Session,
    id: u64,
) -> Result<TaskChanged> {
    session.require_admin("checklist clear")?;
    store.clear_checklist(id)?;
    changed(store, "Cleared checklist of", id, true)
}

// === Import ===

#[derive(Debug, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub source: String,
}

impl Output for ImportResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Imported {} task(s) from {}", self.imported, self.source)
    }
}

/// Replace all tasks with the contents of a CSV file.
pub fn import_csv<P: Persistence>(
    store: &mut TaskStore<P>,
    session: &Session,
    path: &Path,
) -> Result<ImportResult> {
    session.require_admin("import")?;
    let text = fs::read_to_string(path)
        .map_err(|e| Error::Import(format!("Could not read {}: {}", path.display(), e)))?;
    let rows = parse_csv(&text)?;
    let tasks = store.import_from_table(&rows, &session.username)?;
    Ok(ImportResult {
        imported: tasks.len(),
        source: path.display().to_string(),
    })
}

// === Config ===

#[derive(Debug, Serialize)]
pub struct UserView {
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub config_file: Option<String>,
    pub data_file: String,
    pub data_file_source: String,
    pub output_format: String,
    pub output_format_source: String,
    pub users: Vec<UserView>,
}

impl Output for ConfigView {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!(
                "Config file:   {}",
                self.config_file.as_deref().unwrap_or("(none)")
            ),
            format!("Data file:     {} [{}]", self.data_file, self.data_file_source),
            format!(
                "Output format: {} [{}]",
                self.output_format, self.output_format_source
            ),
        ];
        if self.users.is_empty() {
            lines.push("Users:         (none, guest access only)".to_string());
        } else {
            lines.push("Users:".to_string());
            for user in &self.users {
                lines.push(format!("  {} ({})", user.username, user.role));
            }
        }
        lines.join("\n")
    }
}

/// Show the effective configuration. Passwords are never included.
pub fn config_show(
    config_path: Option<&Path>,
    file_config: &TaskboardConfig,
    resolved: &ResolvedConfig,
) -> ConfigView {
    ConfigView {
        config_file: config_path.map(|p| p.display().to_string()),
        data_file: resolved.data_file().display().to_string(),
        data_file_source: resolved.data_file.source.to_string(),
        output_format: resolved.output_format().to_string(),
        output_format_source: resolved.output_format.source.to_string(),
        users: file_config
            .users
            .iter()
            .map(|u| UserView {
                username: u.username.clone(),
                role: u.role,
            })
            .collect(),
    }
}

#[derive(Debug, Serialize)]
pub struct UserSaved {
    pub username: String,
    pub role: Role,
    pub config_file: String,
}

impl Output for UserSaved {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Saved user {} ({}) to {}",
            self.username, self.role, self.config_file
        )
    }
}

/// Add or replace a user in config.kdl.
///
/// While the user table is empty anyone may add the first user;
/// afterwards only admins may change it.
pub fn config_set_user(
    config_path: &Path,
    file_config: &TaskboardConfig,
    session: &Session,
    username: &str,
    password: &str,
    role: Role,
) -> Result<UserSaved> {
    if !file_config.users.is_empty() {
        session.require_admin("config set-user")?;
    }
    if username == crate::auth::GUEST_USER {
        return Err(Error::Validation(format!(
            "'{}' is reserved for anonymous sessions",
            username
        )));
    }

    let mut updated = file_config.clone();
    updated.upsert_user(UserEntry {
        username: username.to_string(),
        password: password.to_string(),
        role,
    });
    config::save_config(config_path, &updated)?;

    Ok(UserSaved {
        username: username.to_string(),
        role,
        config_file: config_path.display().to_string(),
    })
}

/// Directory holding the snapshot, used for the action log.
pub fn data_dir_of(data_file: &Path) -> PathBuf {
    match data_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_utils::date;
    use tempfile::TempDir;

    fn admin() -> Session {
        Session {
            username: "alice".to_string(),
            role: Role::Admin,
        }
    }

    fn create_args(name: &str) -> CreateArgs {
        CreateArgs {
            name: name.to_string(),
            start: Some(date(2024, 1, 1)),
            finish: Some(date(2024, 1, 10)),
            category: "Planning".to_string(),
            checklist: Some("Draft spec\nReview spec".to_string()),
            items: vec!["Sign off".to_string()],
            ..Default::default()
        }
    }

    fn store() -> TaskStore<MemoryStore> {
        TaskStore::open(MemoryStore::new())
    }

    #[test]
    fn test_open_session_guest_and_login() {
        let mut users = UserTable::new();
        users.insert("alice", "pw", Role::Admin);

        assert_eq!(open_session(&users, None, None).unwrap(), Session::guest());
        assert_eq!(
            open_session(&users, Some("guest"), None).unwrap(),
            Session::guest()
        );
        assert!(open_session(&users, Some("alice"), Some("pw")).unwrap().is_admin());
        assert!(matches!(
            open_session(&users, Some("alice"), None),
            Err(Error::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_create_records_session_user_and_items() {
        let mut store = store();
        let result = task_create(&mut store, &admin(), create_args("Design")).unwrap();

        assert_eq!(result.task.task.created_by, "alice");
        assert_eq!(result.task.task.checklist.len(), 3);
        assert_eq!(result.task.task.checklist[2].text, "Sign off");
        assert!(result.to_json().contains("\"Task\":\"Design\""));
        assert!(result.to_json().contains("\"Progress\":{"));
    }

    #[test]
    fn test_guest_cannot_mutate() {
        let mut store = store();
        task_create(&mut store, &admin(), create_args("Design")).unwrap();
        let guest = Session::guest();

        assert!(matches!(
            task_create(&mut store, &guest, create_args("x")),
            Err(Error::PermissionDenied(_))
        ));
        assert!(matches!(
            task_status(&mut store, &guest, 0, TaskStatus::Completed),
            Err(Error::PermissionDenied(_))
        ));
        assert!(matches!(
            checklist_toggle(&mut store, &guest, 0, 0),
            Err(Error::PermissionDenied(_))
        ));
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.get_task(0).unwrap().status, TaskStatus::NotStarted);

        // Reading is fine.
        assert_eq!(task_list(&store, None, None).count, 1);
    }

    #[test]
    fn test_list_filters() {
        let mut store = store();
        task_create(&mut store, &admin(), create_args("a")).unwrap();
        let mut other = create_args("b");
        other.category = "Build".to_string();
        task_create(&mut store, &admin(), other).unwrap();
        task_complete(&mut store, &admin(), 1).unwrap();

        assert_eq!(task_list(&store, Some(TaskStatus::Completed), None).count, 1);
        assert_eq!(task_list(&store, None, Some("Planning")).count, 1);
        assert_eq!(task_list(&store, Some(TaskStatus::Completed), Some("Planning")).count, 0);
    }

    #[test]
    fn test_status_reports_unchanged() {
        let mut store = store();
        task_create(&mut store, &admin(), create_args("a")).unwrap();
        let result = task_status(&mut store, &admin(), 0, TaskStatus::NotStarted).unwrap();
        assert!(!result.changed);
        assert_eq!(result.to_human(), "Task 0 unchanged");
    }

    #[test]
    fn test_checklist_remove_output() {
        let mut store = store();
        task_create(&mut store, &admin(), create_args("a")).unwrap();
        let result = checklist_remove(&mut store, &admin(), 0, 0).unwrap();
        assert_eq!(result.removed.text, "Draft spec");
        assert_eq!(result.remaining, 2);
    }

    #[test]
    fn test_import_csv_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.csv");
        fs::write(
            &path,
            "Task,Start,Finish,Category,Status\nA,2024-01-01,2024-01-02,X,已完成\nB,2024-01-03,2024-01-04,Y,進行中\n",
        )
        .unwrap();

        let mut store = store();
        let result = import_csv(&mut store, &admin(), &path).unwrap();
        assert_eq!(result.imported, 2);
        assert_eq!(store.tasks()[1].created_by, "alice");
    }

    #[test]
    fn test_import_missing_file() {
        let temp = TempDir::new().unwrap();
        let mut store = store();
        let err = import_csv(&mut store, &admin(), &temp.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, Error::Import(_)));
    }

    #[test]
    fn test_summary_human() {
        let mut store = store();
        task_create(&mut store, &admin(), create_args("a")).unwrap();
        let text = summary(&store).to_human();
        assert!(text.contains("Total tasks:     1"));
        assert!(text.contains("Planning: 1"));
    }

    #[test]
    fn test_show_human_lists_checklist() {
        let mut store = store();
        task_create(&mut store, &admin(), create_args("a")).unwrap();
        store.toggle_checklist_item(0, 1).unwrap();
        let text = task_show(&store, 0).unwrap().to_human();
        assert!(text.contains("0. [ ] Draft spec"));
        assert!(text.contains("1. [x] Review spec"));
        assert!(text.contains("1/3 done"));
    }

    #[test]
    fn test_config_set_user_bootstrap_then_admin_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.kdl");

        let empty = TaskboardConfig::new();
        config_set_user(&path, &empty, &Session::guest(), "alice", "pw", Role::Admin).unwrap();

        let loaded = config::load_config(Some(&path)).unwrap();
        assert_eq!(loaded.users.len(), 1);

        let err = config_set_user(&path, &loaded, &Session::guest(), "bob", "pw", Role::Viewer)
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        config_set_user(&path, &loaded, &admin(), "bob", "pw", Role::Viewer).unwrap();
        assert_eq!(config::load_config(Some(&path)).unwrap().users.len(), 2);
    }

    #[test]
    fn test_config_set_user_rejects_guest_name() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.kdl");
        let err = config_set_user(
            &path,
            &TaskboardConfig::new(),
            &admin(),
            "guest",
            "pw",
            Role::Admin,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
