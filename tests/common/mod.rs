//! Common test utilities for taskboard integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's `~/.local/share/taskboard/` or `~/.config/taskboard/`.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

pub const ADMIN: (&str, &str) = ("alice", "wonderland");
pub const VIEWER: (&str, &str) = ("bob", "builder");

/// A test environment with isolated data and config.
///
/// The `tb()` method returns a `Command` that sets `TB_DATA_DIR` and
/// `TB_CONFIG` per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub work_dir: TempDir,
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with no config file.
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a test environment whose config.kdl has an admin and a viewer.
    pub fn with_users() -> Self {
        let env = Self::new();
        std::fs::write(
            env.config_path(),
            format!(
                "user \"{}\" password=\"{}\" role=\"admin\"\nuser \"{}\" password=\"{}\" role=\"viewer\"\n",
                ADMIN.0, ADMIN.1, VIEWER.0, VIEWER.1
            ),
        )
        .unwrap();
        env
    }

    /// Get a Command for the tb binary with isolated data and config.
    pub fn tb(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tb"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("TB_DATA_DIR", self.data_dir.path());
        cmd.env("TB_CONFIG", self.config_path());
        for var in ["TB_DATA_FILE", "TB_USER", "TB_PASSWORD", "TB_ACTION_LOG_PATH", "TB_LOG"] {
            cmd.env_remove(var);
        }
        cmd
    }

    /// A `tb` command logged in as the admin user.
    pub fn tb_admin(&self) -> Command {
        let mut cmd = self.tb();
        cmd.args(["-u", ADMIN.0, "--password", ADMIN.1]);
        cmd
    }

    /// A `tb` command logged in as the viewer user.
    pub fn tb_viewer(&self) -> Command {
        let mut cmd = self.tb();
        cmd.args(["-u", VIEWER.0, "--password", VIEWER.1]);
        cmd
    }

    pub fn config_path(&self) -> PathBuf {
        self.work_dir.path().join("config.kdl")
    }

    pub fn data_file(&self) -> PathBuf {
        self.data_dir.path().join("tasks.json")
    }

    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Create a task as admin with the given checklist items.
    pub fn create_task(&self, name: &str, items: &[&str]) {
        let mut cmd = self.tb_admin();
        cmd.args([
            "create",
            name,
            "--start",
            "2024-01-01",
            "--finish",
            "2024-01-10",
            "--category",
            "Planning",
        ]);
        for item in items {
            cmd.args(["--item", item]);
        }
        cmd.assert().success();
    }

    /// Read the snapshot file as JSON.
    pub fn snapshot(&self) -> serde_json::Value {
        let content = std::fs::read_to_string(self.data_file()).unwrap();
        serde_json::from_str(&content).unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}
