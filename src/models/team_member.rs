//! Team member model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Member of the team shown on the home page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamMember {
    pub id: i64,
    pub name: String,
    /// Position in the organization (e.g. "Président")
    pub role: String,
    pub description: String,
    /// LinkedIn profile URL
    pub linkedin: Option<String>,
    /// Photo URL or path under /static
    pub photo: Option<String>,
    pub sort_order: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or updating a team member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMemberInput {
    pub name: String,
    pub role: String,
    pub description: String,
    /// An empty string clears the link
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default = "super::service::default_active")]
    pub active: bool,
}
