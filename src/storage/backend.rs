//! Persistence trait and the in-memory backend.
//!
//! This module provides the seam between `TaskStore` and the place tasks live:
//! - `JsonFileStore` - Flat-file JSON snapshot (default, see `storage`)
//! - `MemoryStore` - Keeps the snapshot in memory (tests, dry runs)

use crate::models::Task;
use crate::{Error, Result};

/// Trait for backends that hold the full task snapshot.
///
/// There is no partial write path: `save` always receives the whole
/// collection and replaces whatever was stored before.
pub trait Persistence {
    /// Check whether a snapshot has been stored yet.
    fn exists(&self) -> bool;

    /// Read the full collection.
    ///
    /// Fails if the snapshot is absent, unreadable, or structurally invalid.
    fn load(&self) -> Result<Vec<Task>>;

    /// Replace the stored snapshot with `tasks`.
    fn save(&mut self, tasks: &[Task]) -> Result<()>;

    /// Get the storage location description (for display purposes).
    fn location(&self) -> String;
}

/// A backend that keeps the last saved snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Option<Vec<Task>>,
    saves: usize,
    fail_saves: bool,
}

impl MemoryStore {
    /// Create an empty store with no snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `tasks`.
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            snapshot: Some(tasks),
            ..Self::default()
        }
    }

    /// Make every subsequent `save` fail (or succeed again).
    pub fn set_fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    /// The last successfully saved snapshot.
    pub fn snapshot(&self) -> Option<&[Task]> {
        self.snapshot.as_deref()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl Persistence for MemoryStore {
    fn exists(&self) -> bool {
        self.snapshot.is_some()
    }

    fn load(&self) -> Result<Vec<Task>> {
        self.snapshot
            .clone()
            .ok_or_else(|| Error::Persistence("no snapshot stored in memory".to_string()))
    }

    fn save(&mut self, tasks: &[Task]) -> Result<()> {
        if self.fail_saves {
            return Err(Error::Persistence("memory store rejected write".to_string()));
        }
        self.snapshot = Some(tasks.to_vec());
        self.saves += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
