//! Tag repository
//!
//! Database operations for tags.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// Get tag by name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Update name, slug and color
    async fn update(&self, tag: &Tag) -> Result<Tag>;

    /// Delete a tag
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tag_sqlite(self.pool.as_sqlite().unwrap(), tag).await,
            DatabaseDriver::Mysql => create_tag_mysql(self.pool.as_mysql().unwrap(), tag).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&select_by("id"))
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get tag by ID")?;
                Ok(row.map(|r| row_to_tag_sqlite(&r)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&select_by("id"))
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get tag by ID")?;
                Ok(row.map(|r| row_to_tag_mysql(&r)))
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_sqlite(self.pool.as_sqlite().unwrap(), "slug", slug).await,
            DatabaseDriver::Mysql => get_tag_mysql(self.pool.as_mysql().unwrap(), "slug", slug).await,
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_sqlite(self.pool.as_sqlite().unwrap(), "name", name).await,
            DatabaseDriver::Mysql => get_tag_mysql(self.pool.as_mysql().unwrap(), "name", name).await,
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_tags_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_tags_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn update(&self, tag: &Tag) -> Result<Tag> {
        let sql = "UPDATE tags SET name = ?, slug = ?, color = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&tag.name)
                    .bind(&tag.slug)
                    .bind(&tag.color)
                    .bind(tag.id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update tag")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&tag.name)
                    .bind(&tag.slug)
                    .bind(&tag.color)
                    .bind(tag.id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update tag")?;
            }
        }
        Ok(tag.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM tags WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete tag")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete tag")?;
            }
        }
        Ok(())
    }
}

/// `column` is one of the fixed lookup columns, never user input
fn select_by(column: &str) -> String {
    format!(
        "SELECT id, name, slug, color, created_at FROM tags WHERE {} = ?",
        column
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    let result = sqlx::query("INSERT INTO tags (name, slug, color, created_at) VALUES (?, ?, ?, ?)")
        .bind(&tag.name)
        .bind(&tag.slug)
        .bind(&tag.color)
        .bind(tag.created_at)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        ..tag.clone()
    })
}

async fn get_tag_sqlite(pool: &SqlitePool, column: &str, value: &str) -> Result<Option<Tag>> {
    let row = sqlx::query(&select_by(column))
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get tag by {}", column))?;

    Ok(row.map(|r| row_to_tag_sqlite(&r)))
}

async fn list_tags_sqlite(pool: &SqlitePool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, name, slug, color, created_at FROM tags ORDER BY name ASC")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        color: row.get("color"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, tag: &Tag) -> Result<Tag> {
    let result = sqlx::query("INSERT INTO tags (name, slug, color, created_at) VALUES (?, ?, ?, ?)")
        .bind(&tag.name)
        .bind(&tag.slug)
        .bind(&tag.color)
        .bind(tag.created_at)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_id() as i64,
        ..tag.clone()
    })
}

async fn get_tag_mysql(pool: &MySqlPool, column: &str, value: &str) -> Result<Option<Tag>> {
    let row = sqlx::query(&select_by(column))
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get tag by {}", column))?;

    Ok(row.map(|r| row_to_tag_mysql(&r)))
}

async fn list_tags_mysql(pool: &MySqlPool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, name, slug, color, created_at FROM tags ORDER BY name ASC")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        color: row.get("color"),
        created_at: row.get("created_at"),
    }
}
