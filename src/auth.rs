//! Users, roles and sessions.
//!
//! The user table maps usernames to a plaintext password and a role.
//! Passwords are compared as-is; this is a convenience gate for a shared
//! dashboard, not a security boundary.
//!
//! `TaskStore` knows nothing about roles. The command layer asks the
//! [`Session`] for permission before calling any mutation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Username used for anonymous, read-only sessions.
pub const GUEST_USER: &str = "guest";

/// What a user may do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May create, edit, delete and import tasks
    Admin,
    /// Read-only access
    #[default]
    Viewer,
}

impl Role {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An entry in the user table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub password: String,
    pub role: Role,
}

/// Known users, keyed by username.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserTable {
    users: BTreeMap<String, User>,
}

impl UserTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user.
    pub fn insert(&mut self, username: impl Into<String>, password: impl Into<String>, role: Role) {
        self.users.insert(
            username.into(),
            User {
                password: password.into(),
                role,
            },
        );
    }

    pub fn get(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check credentials and open a session.
    pub fn login(&self, username: &str, password: &str) -> Result<Session> {
        match self.users.get(username) {
            Some(user) if user.password == password => {
                tracing::debug!(username, role = %user.role, "login succeeded");
                Ok(Session {
                    username: username.to_string(),
                    role: user.role,
                })
            }
            _ => {
                tracing::debug!(username, "login failed");
                Err(Error::AuthenticationFailed)
            }
        }
    }
}

/// The logged-in user for the current interaction.
///
/// Passed explicitly to whatever needs it rather than held as ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
}

impl Session {
    /// A read-only anonymous session.
    pub fn guest() -> Self {
        Self {
            username: GUEST_USER.to_string(),
            role: Role::Viewer,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail unless this session may perform `action`.
    pub fn require_admin(&self, action: &str) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::PermissionDenied(format!(
                "'{}' requires the admin role ({} is {})",
                action, self.username, self.role
            )))
        }
    }
}
