//! Method step model

use serde::{Deserialize, Serialize};

/// One step of the engagement method shown on the home page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodStep {
    pub id: i64,
    /// Number displayed in the step badge
    pub step_number: i32,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub sort_order: i32,
    pub active: bool,
}

/// Input for creating or updating a method step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodStepInput {
    pub step_number: i32,
    pub title: String,
    pub description: String,
    pub icon: String,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default = "super::service::default_active")]
    pub active: bool,
}
