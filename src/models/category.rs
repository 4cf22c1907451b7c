//! Article category model
//!
//! Categories classify journal posts. Posts reference them by slug.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Article category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Display label
    pub label: String,
    pub description: Option<String>,
    /// Badge color classes
    pub color: String,
    /// Icon name
    pub icon: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryInput {
    pub slug: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    pub color: String,
    #[serde(default)]
    pub icon: Option<String>,
    /// Defaults to last position
    #[serde(default)]
    pub sort_order: Option<i32>,
}

/// Input for a partial category update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategoryInput {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<Option<String>>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

/// A category every installation starts with
#[derive(Debug, Clone, Copy)]
pub struct DefaultCategory {
    pub slug: &'static str,
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

/// Defaults restored by the seed operation, in display order
pub const DEFAULT_CATEGORIES: &[DefaultCategory] = &[
    DefaultCategory { slug: "ctf", label: "CTF", color: "bg-cyan-500/20 text-cyan-400", icon: "Target" },
    DefaultCategory { slug: "writeup", label: "Writeup", color: "bg-purple-500/20 text-purple-400", icon: "FileText" },
    DefaultCategory { slug: "hardening", label: "Hardening", color: "bg-emerald-500/20 text-emerald-400", icon: "Shield" },
    DefaultCategory { slug: "tutorial", label: "Tutoriel", color: "bg-amber-500/20 text-amber-400", icon: "BookOpen" },
    DefaultCategory { slug: "event", label: "Événement", color: "bg-pink-500/20 text-pink-400", icon: "Calendar" },
];
