//! Contact message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message left through the public contact form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub id: i64,
    pub company: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    /// Set once an admin opened the message
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Contact form submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInput {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub consent: bool,
}
