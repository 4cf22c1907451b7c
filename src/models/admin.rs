//! Admin model
//!
//! Back-office accounts. Passwords are stored as argon2 hashes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Admin account allowed to sign in to the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique, used as login)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name, copied onto authored posts
    pub name: String,
    /// Admin role
    pub role: AdminRole,
    /// Last successful login
    pub last_login_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Admin {
    /// Create a new Admin with an already hashed password.
    ///
    /// Use `services::password::hash_password()` to hash the password.
    pub fn new(email: String, password_hash: String, name: String, role: AdminRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            email,
            password_hash,
            name,
            role,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the admin has full access
    pub fn is_super_admin(&self) -> bool {
        self.role == AdminRole::SuperAdmin
    }

    /// Check if the admin may manage editorial content (posts, tags, categories)
    pub fn is_editor(&self) -> bool {
        matches!(self.role, AdminRole::SuperAdmin | AdminRole::Editor)
    }
}

/// Admin role for authorization.
///
/// - SuperAdmin: every management area
/// - Editor: posts, tags and categories only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminRole {
    SuperAdmin,
    #[default]
    Editor,
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminRole::SuperAdmin => write!(f, "SUPER_ADMIN"),
            AdminRole::Editor => write!(f, "EDITOR"),
        }
    }
}

impl FromStr for AdminRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SUPER_ADMIN" => Ok(AdminRole::SuperAdmin),
            "EDITOR" => Ok(AdminRole::Editor),
            _ => Err(anyhow::anyhow!("Invalid admin role: {}", s)),
        }
    }
}
