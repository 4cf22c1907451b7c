//! Rate limiter for admin login attempts
//!
//! Two sliding windows protect the login form:
//! - failed attempts per email (5 per 15 minutes)
//! - login requests per client IP (10 per minute)

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Failed attempts allowed per email within `EMAIL_WINDOW_MINUTES`
pub const MAX_FAILED_ATTEMPTS: usize = 5;
const EMAIL_WINDOW_MINUTES: i64 = 15;

/// Requests allowed per IP within one minute
pub const MAX_IP_REQUESTS: usize = 10;
const IP_WINDOW_MINUTES: i64 = 1;

type Attempts<K> = Arc<RwLock<HashMap<K, Vec<DateTime<Utc>>>>>;

/// Login rate limiter
#[derive(Clone, Default)]
pub struct LoginRateLimiter {
    /// Failed login attempts by lowercased email
    email_attempts: Attempts<String>,
    /// Login requests by client IP
    ip_attempts: Attempts<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the email has reached the failure limit
    pub async fn is_email_limited(&self, email: &str) -> bool {
        let key = normalize(email);
        count_recent(&self.email_attempts, &key, EMAIL_WINDOW_MINUTES).await >= MAX_FAILED_ATTEMPTS
    }

    /// Record a failed login for an email
    pub async fn record_failed_attempt(&self, email: &str) {
        record(&self.email_attempts, normalize(email)).await;
    }

    /// Forget the failures of an email (successful login)
    pub async fn clear_email_attempts(&self, email: &str) {
        self.email_attempts.write().await.remove(&normalize(email));
    }

    /// Whether the IP has reached the request limit
    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        count_recent(&self.ip_attempts, &ip, IP_WINDOW_MINUTES).await >= MAX_IP_REQUESTS
    }

    /// Record a login request from an IP
    pub async fn record_ip_request(&self, ip: IpAddr) {
        record(&self.ip_attempts, ip).await;
    }

    /// Drop timestamps outside their window and empty keys
    pub async fn cleanup(&self) {
        prune(&self.email_attempts, EMAIL_WINDOW_MINUTES).await;
        prune(&self.ip_attempts, IP_WINDOW_MINUTES).await;
    }

    #[cfg(test)]
    async fn tracked(&self) -> (usize, usize) {
        (
            self.email_attempts.read().await.len(),
            self.ip_attempts.read().await.len(),
        )
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn count_recent<K: Eq + Hash + Clone>(map: &Attempts<K>, key: &K, window_minutes: i64) -> usize {
    let cutoff = Utc::now() - Duration::minutes(window_minutes);
    let mut attempts = map.write().await;
    match attempts.get_mut(key) {
        Some(times) => {
            times.retain(|time| *time > cutoff);
            times.len()
        }
        None => 0,
    }
}

async fn record<K: Eq + Hash>(map: &Attempts<K>, key: K) {
    map.write().await.entry(key).or_default().push(Utc::now());
}

async fn prune<K: Eq + Hash>(map: &Attempts<K>, window_minutes: i64) {
    let cutoff = Utc::now() - Duration::minutes(window_minutes);
    map.write().await.retain(|_, times| {
        times.retain(|time| *time > cutoff);
        !times.is_empty()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_email_rate_limit() {
        let limiter = LoginRateLimiter::new();

        for _ in 0..4 {
            limiter.record_failed_attempt("admin@jcpc.fr").await;
            assert!(!limiter.is_email_limited("admin@jcpc.fr").await);
        }
        limiter.record_failed_attempt("admin@jcpc.fr").await;
        assert!(limiter.is_email_limited("admin@jcpc.fr").await);

        limiter.clear_email_attempts("admin@jcpc.fr").await;
        assert!(!limiter.is_email_limited("admin@jcpc.fr").await);
    }

    #[tokio::test]
    async fn test_email_key_is_case_insensitive() {
        let limiter = LoginRateLimiter::new();
        for email in ["Admin@JCPC.fr", "admin@jcpc.fr", " ADMIN@jcpc.FR ", "admin@jcpc.fr", "admin@Jcpc.fr"] {
            limiter.record_failed_attempt(email).await;
        }
        assert!(limiter.is_email_limited("admin@jcpc.fr").await);
        assert!(!limiter.is_email_limited("other@jcpc.fr").await);
    }

    #[tokio::test]
    async fn test_ip_rate_limit() {
        let limiter = LoginRateLimiter::new();
        let ip = IpAddr::from_str("127.0.0.1").unwrap();

        for _ in 0..9 {
            limiter.record_ip_request(ip).await;
        }
        assert!(!limiter.is_ip_limited(ip).await);
        limiter.record_ip_request(ip).await;
        assert!(limiter.is_ip_limited(ip).await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_stale_entries() {
        let limiter = LoginRateLimiter::new();
        let stale = Utc::now() - Duration::minutes(30);
        limiter
            .email_attempts
            .write()
            .await
            .insert("old@jcpc.fr".to_string(), vec![stale]);
        limiter.record_failed_attempt("new@jcpc.fr").await;

        limiter.cleanup().await;
        assert_eq!(limiter.tracked().await, (1, 0));
    }
}
