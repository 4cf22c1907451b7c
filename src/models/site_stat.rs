//! Site statistic model
//!
//! Counters shown in the home page stats band ("15+ missions réalisées").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public counter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteStat {
    pub id: i64,
    /// Stable key (unique), e.g. "missions"
    pub key: String,
    pub value: i32,
    /// Appended to the value, e.g. "+" or "%"
    pub suffix: Option<String>,
    pub label: String,
    pub sort_order: i32,
    pub updated_at: DateTime<Utc>,
}

impl SiteStat {
    /// Value with its suffix, as displayed
    pub fn display_value(&self) -> String {
        format!("{}{}", self.value, self.suffix.as_deref().unwrap_or(""))
    }
}

/// Input for creating or updating a statistic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteStatInput {
    pub key: String,
    pub value: i32,
    #[serde(default)]
    pub suffix: Option<String>,
    pub label: String,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

/// A statistic every installation starts with
#[derive(Debug, Clone, Copy)]
pub struct DefaultStat {
    pub key: &'static str,
    pub value: i32,
    pub suffix: &'static str,
    pub label: &'static str,
}

/// Defaults restored by the seed operation, in display order
pub const DEFAULT_STATS: &[DefaultStat] = &[
    DefaultStat { key: "missions", value: 15, suffix: "+", label: "Missions réalisées" },
    DefaultStat { key: "satisfaction", value: 98, suffix: "%", label: "Clients satisfaits" },
    DefaultStat { key: "members", value: 25, suffix: "+", label: "Membres actifs" },
    DefaultStat { key: "partners", value: 5, suffix: "+", label: "Partenaires" },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_value() {
        let mut stat = SiteStat {
            id: 1,
            key: "satisfaction".to_string(),
            value: 98,
            suffix: Some("%".to_string()),
            label: "Clients satisfaits".to_string(),
            sort_order: 0,
            updated_at: Utc::now(),
        };
        assert_eq!(stat.display_value(), "98%");

        stat.suffix = None;
        assert_eq!(stat.display_value(), "98");
    }
}
