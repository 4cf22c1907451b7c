//! Admin repository
//!
//! Database operations for back-office accounts.
//!
//! This module provides:
//! - `AdminRepository` trait defining the interface for admin data access
//! - `SqlxAdminRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Admin, AdminRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Admin repository trait
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Create a new admin
    async fn create(&self, admin: &Admin) -> Result<Admin>;

    /// Get admin by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Admin>>;

    /// Get admin by email (case-insensitive)
    async fn get_by_email(&self, email: &str) -> Result<Option<Admin>>;

    /// Record a successful login
    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()>;
}

/// SQLx-based admin repository implementation
pub struct SqlxAdminRepository {
    pool: DynDatabasePool,
}

impl SqlxAdminRepository {
    /// Create a new SQLx admin repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AdminRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AdminRepository for SqlxAdminRepository {
    async fn create(&self, admin: &Admin) -> Result<Admin> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_admin_sqlite(self.pool.as_sqlite().unwrap(), admin).await,
            DatabaseDriver::Mysql => create_admin_mysql(self.pool.as_mysql().unwrap(), admin).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Admin>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_admin_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_admin_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Admin>> {
        let email = email.trim().to_lowercase();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_admin_by_email_sqlite(self.pool.as_sqlite().unwrap(), &email).await
            }
            DatabaseDriver::Mysql => {
                get_admin_by_email_mysql(self.pool.as_mysql().unwrap(), &email).await
            }
        }
    }

    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let sql = "UPDATE admins SET last_login_at = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(at)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update last login")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(at)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update last login")?;
            }
        }
        Ok(())
    }

}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_admin_sqlite(pool: &SqlitePool, admin: &Admin) -> Result<Admin> {
    let email = admin.email.trim().to_lowercase();
    let result = sqlx::query(
        r#"
        INSERT INTO admins (email, password_hash, name, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&email)
    .bind(&admin.password_hash)
    .bind(&admin.name)
    .bind(admin.role.to_string())
    .bind(admin.created_at)
    .bind(admin.updated_at)
    .execute(pool)
    .await
    .context("Failed to create admin")?;

    Ok(Admin {
        id: result.last_insert_rowid(),
        email,
        ..admin.clone()
    })
}

async fn get_admin_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Admin>> {
    let row = sqlx::query(
        r#"
        SELECT id, email, password_hash, name, role, last_login_at, created_at, updated_at
        FROM admins
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get admin by ID")?;

    row.map(|row| row_to_admin_sqlite(&row)).transpose()
}

async fn get_admin_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<Admin>> {
    let row = sqlx::query(
        r#"
        SELECT id, email, password_hash, name, role, last_login_at, created_at, updated_at
        FROM admins
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get admin by email")?;

    row.map(|row| row_to_admin_sqlite(&row)).transpose()
}

fn row_to_admin_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Admin> {
    let role_str: String = row.get("role");
    let role = AdminRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(Admin {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        role,
        last_login_at: row.get("last_login_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_admin_mysql(pool: &MySqlPool, admin: &Admin) -> Result<Admin> {
    let email = admin.email.trim().to_lowercase();
    let result = sqlx::query(
        r#"
        INSERT INTO admins (email, password_hash, name, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&email)
    .bind(&admin.password_hash)
    .bind(&admin.name)
    .bind(admin.role.to_string())
    .bind(admin.created_at)
    .bind(admin.updated_at)
    .execute(pool)
    .await
    .context("Failed to create admin")?;

    Ok(Admin {
        id: result.last_insert_id() as i64,
        email,
        ..admin.clone()
    })
}

async fn get_admin_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Admin>> {
    let row = sqlx::query(
        r#"
        SELECT id, email, password_hash, name, role, last_login_at, created_at, updated_at
        FROM admins
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get admin by ID")?;

    row.map(|row| row_to_admin_mysql(&row)).transpose()
}

async fn get_admin_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<Admin>> {
    let row = sqlx::query(
        r#"
        SELECT id, email, password_hash, name, role, last_login_at, created_at, updated_at
        FROM admins
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get admin by email")?;

    row.map(|row| row_to_admin_mysql(&row)).transpose()
}

fn row_to_admin_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Admin> {
    let role_str: String = row.get("role");
    let role = AdminRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(Admin {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        role,
        last_login_at: row.get("last_login_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
