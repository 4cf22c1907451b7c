//! Session repository
//!
//! Database operations for admin sessions. A session row is keyed by the
//! token handed out in the session cookie.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by token
    async fn get_by_token(&self, token: &str) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete(&self, token: &str) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_SESSION: &str =
    "INSERT INTO sessions (id, admin_id, expires_at, created_at) VALUES (?, ?, ?, ?)";
const SELECT_SESSION: &str =
    "SELECT id, admin_id, expires_at, created_at FROM sessions WHERE id = ?";

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(INSERT_SESSION)
                    .bind(&session.id)
                    .bind(session.admin_id)
                    .bind(session.expires_at)
                    .bind(session.created_at)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to create session")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(INSERT_SESSION)
                    .bind(&session.id)
                    .bind(session.admin_id)
                    .bind(session.expires_at)
                    .bind(session.created_at)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to create session")?;
            }
        }
        Ok(session.clone())
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(SELECT_SESSION)
                    .bind(token)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get session")?;
                Ok(row.map(|row| Session {
                    id: row.get("id"),
                    admin_id: row.get("admin_id"),
                    expires_at: row.get("expires_at"),
                    created_at: row.get("created_at"),
                }))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(SELECT_SESSION)
                    .bind(token)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get session")?;
                Ok(row.map(|row| Session {
                    id: row.get("id"),
                    admin_id: row.get("admin_id"),
                    expires_at: row.get("expires_at"),
                    created_at: row.get("created_at"),
                }))
            }
        }
    }

    async fn delete(&self, token: &str) -> Result<()> {
        let sql = "DELETE FROM sessions WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(token)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete session")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(token)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete session")?;
            }
        }
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64> {
        let sql = "DELETE FROM sessions WHERE expires_at < ?";
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(now)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(now)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected(),
        };
        Ok(affected)
    }
}
