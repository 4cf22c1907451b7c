//! Authentication service
//!
//! Admin login, session tokens, logout and account creation. Sessions live in
//! the database; the token doubles as the session ID and is carried by the
//! session cookie (or a Bearer header).

use crate::db::repositories::{AdminRepository, SessionRepository};
use crate::models::{Admin, AdminRole, Session};
use crate::services::password::{hash_password, verify_password};
use crate::services::rate_limiter::LoginRateLimiter;
use crate::services::validation::is_valid_email;
use anyhow::Context;
use chrono::{Duration, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

/// Minimum password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Error types for authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    ValidationError(String),

    /// Unknown email or wrong password. The two cases are not told apart.
    #[error("Email ou mot de passe incorrect")]
    InvalidCredentials,

    #[error("Trop de tentatives de connexion. Réessayez plus tard.")]
    RateLimited,

    #[error("Un administrateur avec cet email existe déjà")]
    AdminExists,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: Session,
    pub admin: Admin,
}

/// Authentication service
pub struct AuthService {
    admin_repo: Arc<dyn AdminRepository>,
    session_repo: Arc<dyn SessionRepository>,
    rate_limiter: LoginRateLimiter,
    session_ttl_days: i64,
}

impl AuthService {
    pub fn new(
        admin_repo: Arc<dyn AdminRepository>,
        session_repo: Arc<dyn SessionRepository>,
        rate_limiter: LoginRateLimiter,
        session_ttl_days: i64,
    ) -> Self {
        Self {
            admin_repo,
            session_repo,
            rate_limiter,
            session_ttl_days,
        }
    }

    /// Shared limiter, also driven by the periodic cleanup task
    pub fn rate_limiter(&self) -> &LoginRateLimiter {
        &self.rate_limiter
    }

    /// Authenticate an admin and open a session.
    ///
    /// `client_ip` feeds the per-IP limiter when the caller knows it.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client_ip: Option<IpAddr>,
    ) -> Result<LoginOutcome, AuthError> {
        if let Some(ip) = client_ip {
            if self.rate_limiter.is_ip_limited(ip).await {
                tracing::warn!("Login rate limit reached for {}", ip);
                return Err(AuthError::RateLimited);
            }
            self.rate_limiter.record_ip_request(ip).await;
        }

        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AuthError::ValidationError("Email invalide".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::ValidationError(format!(
                "Le mot de passe doit contenir au moins {} caractères",
                MIN_PASSWORD_LENGTH
            )));
        }

        if self.rate_limiter.is_email_limited(&email).await {
            tracing::warn!("Too many failed logins for {}", email);
            return Err(AuthError::RateLimited);
        }

        let admin = match self
            .admin_repo
            .get_by_email(&email)
            .await
            .context("Failed to look up admin")?
        {
            Some(admin) => admin,
            None => {
                self.rate_limiter.record_failed_attempt(&email).await;
                return Err(AuthError::InvalidCredentials);
            }
        };

        let valid = verify_password(password, &admin.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            self.rate_limiter.record_failed_attempt(&email).await;
            return Err(AuthError::InvalidCredentials);
        }

        self.rate_limiter.clear_email_attempts(&email).await;

        let now = Utc::now();
        self.admin_repo
            .update_last_login(admin.id, now)
            .await
            .context("Failed to update last login")?;

        let session = Session {
            id: generate_token(),
            admin_id: admin.id,
            expires_at: now + Duration::days(self.session_ttl_days),
            created_at: now,
        };
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!("Admin {} signed in", admin.email);

        Ok(LoginOutcome {
            session,
            admin: Admin {
                last_login_at: Some(now),
                ..admin
            },
        })
    }

    /// Resolve a session token to its admin.
    ///
    /// Expired sessions are deleted on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<Admin>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }

        let session = match self
            .session_repo
            .get_by_token(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let admin = self
            .admin_repo
            .get_by_id(session.admin_id)
            .await
            .context("Failed to get session admin")?;

        if admin.is_none() {
            // Account removed while the session was live
            self.session_repo
                .delete(token)
                .await
                .context("Failed to delete orphan session")?;
        }

        Ok(admin)
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Create an admin account
    pub async fn create_admin(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: AdminRole,
    ) -> Result<Admin, AuthError> {
        let email = email.trim().to_lowercase();
        let name = name.trim();

        if !is_valid_email(&email) {
            return Err(AuthError::ValidationError("Email invalide".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::ValidationError(format!(
                "Le mot de passe doit contenir au moins {} caractères",
                MIN_PASSWORD_LENGTH
            )));
        }
        if name.is_empty() {
            return Err(AuthError::ValidationError("Le nom est requis".to_string()));
        }

        if self
            .admin_repo
            .get_by_email(&email)
            .await
            .context("Failed to check admin email")?
            .is_some()
        {
            return Err(AuthError::AdminExists);
        }

        let hash = hash_password(password)?;
        let admin = Admin::new(email, hash, name.to_string(), role);
        let created = self
            .admin_repo
            .create(&admin)
            .await
            .context("Failed to create admin")?;

        tracing::info!("Created admin {} ({})", created.email, created.role);
        Ok(created)
    }

    /// Remove every expired session, returning how many were deleted
    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        let removed = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to purge expired sessions")?;
        Ok(removed)
    }
}

/// New session token: two simple-format v4 UUIDs, 64 hex characters
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxAdminRepository, SqlxSessionRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::services::rate_limiter::MAX_FAILED_ATTEMPTS;

    async fn setup_test_service() -> (AuthService, Arc<dyn SessionRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let sessions = SqlxSessionRepository::boxed(pool.clone());
        let service = AuthService::new(
            SqlxAdminRepository::boxed(pool),
            sessions.clone(),
            LoginRateLimiter::new(),
            7,
        );
        (service, sessions)
    }

    async fn with_admin(service: &AuthService) -> Admin {
        service
            .create_admin("Bureau@JCPC.fr", "motdepasse", "Bureau", AdminRole::SuperAdmin)
            .await
            .expect("Failed to create admin")
    }

    #[test]
    fn test_generate_token() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_create_admin_normalizes_email() {
        let (service, _) = setup_test_service().await;
        let admin = with_admin(&service).await;
        assert!(admin.id > 0);
        assert_eq!(admin.email, "bureau@jcpc.fr");
        assert_ne!(admin.password_hash, "motdepasse");
    }

    #[tokio::test]
    async fn test_create_admin_duplicate() {
        let (service, _) = setup_test_service().await;
        with_admin(&service).await;
        let result = service
            .create_admin("bureau@jcpc.fr", "autremotdepasse", "Autre", AdminRole::Editor)
            .await;
        assert!(matches!(result, Err(AuthError::AdminExists)));
    }

    #[tokio::test]
    async fn test_create_admin_validation() {
        let (service, _) = setup_test_service().await;
        let result = service
            .create_admin("bureau@jcpc.fr", "court", "Bureau", AdminRole::Editor)
            .await;
        match result {
            Err(AuthError::ValidationError(msg)) => {
                assert_eq!(msg, "Le mot de passe doit contenir au moins 8 caractères")
            }
            other => panic!("unexpected result: {:?}", other.map(|a| a.email)),
        }
    }

    #[tokio::test]
    async fn test_login_success() {
        let (service, _) = setup_test_service().await;
        let admin = with_admin(&service).await;

        let outcome = service
            .login("bureau@jcpc.fr", "motdepasse", None)
            .await
            .expect("Login failed");

        assert_eq!(outcome.admin.id, admin.id);
        assert!(outcome.admin.last_login_at.is_some());
        assert_eq!(outcome.session.id.len(), 64);
        let remaining = outcome.session.expires_at - Utc::now();
        assert!(remaining > Duration::days(6));
        assert!(remaining <= Duration::days(7));

        let resolved = service
            .validate_session(&outcome.session.id)
            .await
            .unwrap()
            .expect("Session should resolve");
        assert_eq!(resolved.email, "bureau@jcpc.fr");
    }

    #[tokio::test]
    async fn test_login_wrong_password_and_unknown_email_look_alike() {
        let (service, _) = setup_test_service().await;
        with_admin(&service).await;

        let wrong = service.login("bureau@jcpc.fr", "mauvaismotdepasse", None).await;
        let unknown = service.login("personne@jcpc.fr", "motdepasse", None).await;

        let wrong = wrong.err().expect("should fail").to_string();
        let unknown = unknown.err().expect("should fail").to_string();
        assert_eq!(wrong, "Email ou mot de passe incorrect");
        assert_eq!(wrong, unknown);
    }

    #[tokio::test]
    async fn test_login_input_validation() {
        let (service, _) = setup_test_service().await;

        let result = service.login("pas-un-email", "motdepasse", None).await;
        assert!(matches!(result, Err(AuthError::ValidationError(ref m)) if m == "Email invalide"));

        let result = service.login("bureau@jcpc.fr", "court", None).await;
        assert!(matches!(result, Err(AuthError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_login_locked_after_failures() {
        let (service, _) = setup_test_service().await;
        with_admin(&service).await;

        for _ in 0..MAX_FAILED_ATTEMPTS {
            let _ = service.login("bureau@jcpc.fr", "mauvaismotdepasse", None).await;
        }

        // Even the right password is refused while locked
        let result = service.login("bureau@jcpc.fr", "motdepasse", None).await;
        assert!(matches!(result, Err(AuthError::RateLimited)));
    }

    #[tokio::test]
    async fn test_login_ip_limit() {
        let (service, _) = setup_test_service().await;
        with_admin(&service).await;
        let ip: IpAddr = "203.0.113.7".parse().unwrap();

        for _ in 0..crate::services::rate_limiter::MAX_IP_REQUESTS {
            let _ = service.login("bureau@jcpc.fr", "motdepasse", Some(ip)).await;
        }
        let result = service.login("bureau@jcpc.fr", "motdepasse", Some(ip)).await;
        assert!(matches!(result, Err(AuthError::RateLimited)));

        // Another client is unaffected
        let other: IpAddr = "203.0.113.8".parse().unwrap();
        assert!(service.login("bureau@jcpc.fr", "motdepasse", Some(other)).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let (service, sessions) = setup_test_service().await;
        let admin = with_admin(&service).await;

        let now = Utc::now();
        let expired = Session {
            id: generate_token(),
            admin_id: admin.id,
            expires_at: now - Duration::minutes(1),
            created_at: now - Duration::days(8),
        };
        sessions.create(&expired).await.unwrap();

        assert!(service.validate_session(&expired.id).await.unwrap().is_none());
        assert!(sessions.get_by_token(&expired.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout() {
        let (service, _) = setup_test_service().await;
        with_admin(&service).await;
        let outcome = service.login("bureau@jcpc.fr", "motdepasse", None).await.unwrap();

        service.logout(&outcome.session.id).await.unwrap();
        assert!(service.validate_session(&outcome.session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let (service, _) = setup_test_service().await;
        assert!(service.validate_session("inconnu").await.unwrap().is_none());
        assert!(service.validate_session("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_expired_sessions() {
        let (service, sessions) = setup_test_service().await;
        let admin = with_admin(&service).await;
        let now = Utc::now();
        for offset in [-2, -1, 3] {
            sessions
                .create(&Session {
                    id: generate_token(),
                    admin_id: admin.id,
                    expires_at: now + Duration::days(offset),
                    created_at: now,
                })
                .await
                .unwrap();
        }
        assert_eq!(service.purge_expired_sessions().await.unwrap(), 2);
    }
}
