//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag offered when writing posts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Tag name (unique)
    pub name: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Optional badge color classes
    pub color: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Create a new Tag. The ID will be set by the database.
    pub fn new(name: String, slug: String, color: Option<String>) -> Self {
        Self {
            id: 0,
            name,
            slug,
            color,
            created_at: Utc::now(),
        }
    }
}

/// Input for creating a tag. The slug is generated from the name when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTagInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Input for updating a tag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTagInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub color: Option<Option<String>>,
}
