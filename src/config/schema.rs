//! KDL schema for config.kdl.
//!
//! This module provides:
//! - Rust structs representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation

use crate::auth::{Role, UserTable};
use crate::{Error, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One `user` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Settings stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// data-file "/srv/taskboard/tasks.json"
/// output-format "human"  // or "json"
/// user "alice" password="secret" role="admin"
/// user "bob" password="hunter2" role="viewer"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskboardConfig {
    /// Where the task snapshot lives
    pub data_file: Option<PathBuf>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Login table
    pub users: Vec<UserEntry>,
}

impl TaskboardConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    pub fn validate(&self) -> Result<()> {
        for (i, user) in self.users.iter().enumerate() {
            if user.username.trim().is_empty() {
                return Err(Error::Config("user name cannot be empty".to_string()));
            }
            if self.users[..i].iter().any(|u| u.username == user.username) {
                return Err(Error::Config(format!(
                    "user '{}' is defined more than once",
                    user.username
                )));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes are ignored. A `user` node with a missing name or an
    /// unknown role is an error rather than silently dropped.
    pub fn from_kdl(doc: &KdlDocument) -> Result<Self> {
        let mut config = Self::new();

        if let Some(s) = first_string_arg(doc.get("data-file")) {
            config.data_file = Some(PathBuf::from(s));
        }

        if let Some(s) = first_string_arg(doc.get("output-format")) {
            config.output_format = OutputFormat::parse(&s);
        }

        for node in doc.nodes() {
            if node.name().value() == "user" {
                config.users.push(parse_user_node(node)?);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref path) = self.data_file {
            let mut node = KdlNode::new("data-file");
            node.push(KdlEntry::new(KdlValue::String(path.display().to_string())));
            doc.nodes_mut().push(node);
        }

        if let Some(ref format) = self.output_format {
            let mut node = KdlNode::new("output-format");
            node.push(KdlEntry::new(KdlValue::String(format.as_str().to_string())));
            doc.nodes_mut().push(node);
        }

        for user in &self.users {
            let mut node = KdlNode::new("user");
            node.push(KdlEntry::new(KdlValue::String(user.username.clone())));
            node.push(KdlEntry::new_prop(
                "password",
                KdlValue::String(user.password.clone()),
            ));
            node.push(KdlEntry::new_prop(
                "role",
                KdlValue::String(user.role.as_str().to_string()),
            ));
            doc.nodes_mut().push(node);
        }

        doc
    }

    /// Render as formatted KDL text.
    pub fn to_kdl_string(&self) -> String {
        let mut doc = self.to_kdl();
        doc.autoformat();
        doc.to_string()
    }

    /// Add a user or replace the existing entry with the same name.
    pub fn upsert_user(&mut self, entry: UserEntry) {
        match self.users.iter_mut().find(|u| u.username == entry.username) {
            Some(existing) => *existing = entry,
            None => self.users.push(entry),
        }
    }

    /// Build the login table.
    pub fn user_table(&self) -> UserTable {
        let mut table = UserTable::new();
        for user in &self.users {
            table.insert(user.username.clone(), user.password.clone(), user.role);
        }
        table
    }
}

fn first_string_arg(node: Option<&KdlNode>) -> Option<String> {
    node?
        .entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(name))
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn parse_user_node(node: &KdlNode) -> Result<UserEntry> {
    let username = first_string_arg(Some(node))
        .ok_or_else(|| Error::Config("user node must have a name argument".to_string()))?;
    let password = string_prop(node, "password").unwrap_or_default();
    let role = match string_prop(node, "role") {
        Some(r) => Role::parse(&r).ok_or_else(|| {
            Error::Config(format!("user '{}': unknown role '{}'", username, r))
        })?,
        None => Role::Viewer,
    };
    Ok(UserEntry {
        username,
        password,
        role,
    })
}
