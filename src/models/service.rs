//! Service model
//!
//! Offerings presented in the home page carousel (audits, awareness
//! training, and so on).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An offering of the organization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: i64,
    /// URL-friendly slug (unique)
    pub slug: String,
    pub title: String,
    pub description: String,
    /// Icon name understood by the front-end
    pub icon: String,
    /// Bullet points listed on the card
    pub features: Vec<String>,
    pub sort_order: i32,
    /// Inactive services are hidden from the public site
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or updating a service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInput {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    #[serde(default)]
    pub features: Vec<String>,
    /// Defaults to last position on create, unchanged on update
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default = "default_active")]
    pub active: bool,
}

pub(crate) fn default_active() -> bool {
    true
}
