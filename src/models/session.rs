//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Admin session, keyed by the token stored in the session cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (token)
    pub id: String,
    /// Associated admin ID
    pub admin_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let live = Session {
            id: "a".to_string(),
            admin_id: 1,
            expires_at: now + Duration::days(7),
            created_at: now,
        };
        let dead = Session {
            expires_at: now - Duration::seconds(1),
            ..live.clone()
        };

        assert!(!live.is_expired());
        assert!(dead.is_expired());
    }
}
