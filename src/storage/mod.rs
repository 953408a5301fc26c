//! Storage layer for Taskboard data.
//!
//! The whole task collection is persisted as one JSON document (UTF-8,
//! two-space indentation). Every save rewrites the document completely;
//! there is no append path, no versioning and no backup.
//!
//! ## Location
//!
//! Default: `<data dir>/tasks.json`, where the data dir is `$TB_DATA_DIR`
//! if set, else `~/.local/share/taskboard/`. The config file and the
//! `--data-file` flag can point elsewhere (see `config`).
//!
//! ## Crash safety
//!
//! Saves write to a temporary file in the target directory and rename it
//! over the snapshot, so an interrupted save leaves the previous snapshot
//! intact rather than a truncated file.

pub mod backend;
pub mod dates;

pub use backend::{MemoryStore, Persistence};

use crate::models::Task;
use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TB_DATA_DIR";

/// File name of the snapshot inside the data directory.
pub const DEFAULT_DATA_FILE: &str = "tasks.json";

/// Flat-file JSON snapshot of the task collection.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by the file at `path`.
    ///
    /// Nothing is created on disk until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make sure the directory holding the snapshot exists.
    fn ensure_parent_dir(&self) -> Result<PathBuf> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;
        Ok(parent)
    }
}

impl Persistence for JsonFileStore {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn load(&self) -> Result<Vec<Task>> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            Error::Persistence(format!("Could not read {}: {}", self.path.display(), e))
        })?;
        let tasks: Vec<Task> = serde_json::from_str(&content).map_err(|e| {
            Error::Persistence(format!("Malformed snapshot {}: {}", self.path.display(), e))
        })?;
        tracing::debug!(path = %self.path.display(), count = tasks.len(), "loaded snapshot");
        Ok(tasks)
    }

    fn save(&mut self, tasks: &[Task]) -> Result<()> {
        let parent = self.ensure_parent_dir()?;
        let json = serde_json::to_string_pretty(tasks)?;

        let mut tmp = NamedTempFile::new_in(&parent)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        // The temp file is created 0600; keep the mode of the file it replaces.
        if let Ok(meta) = fs::metadata(&self.path) {
            tmp.as_file().set_permissions(meta.permissions())?;
        }
        tmp.persist(&self.path).map_err(|e| {
            Error::Persistence(format!("Could not write {}: {}", self.path.display(), e.error))
        })?;

        tracing::debug!(path = %self.path.display(), count = tasks.len(), "saved snapshot");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Get the data directory.
///
/// `$TB_DATA_DIR` wins; otherwise `~/.local/share/taskboard/` (or the
/// platform equivalent).
pub fn get_data_dir() -> Result<PathBuf> {
    get_data_dir_with_env(|name| std::env::var(name).ok())
}

/// Like [`get_data_dir`], with an explicit environment lookup.
pub fn get_data_dir_with_env(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(dir) = env(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("taskboard"))
}

/// Default location of the snapshot file.
pub fn default_data_file() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DEFAULT_DATA_FILE))
}
