//! Article category repository
//!
//! Database operations for article categories.

use super::ordering;
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Category, DefaultCategory};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories by sort order
    async fn list(&self) -> Result<Vec<Category>>;

    /// Update a category
    async fn update(&self, category: &Category) -> Result<Category>;

    /// Delete a category
    async fn delete(&self, id: i64) -> Result<()>;

    /// Sort order placing a new category last
    async fn next_sort_order(&self) -> Result<i32>;

    /// Rewrite sort orders following `ids`
    async fn reorder(&self, ids: &[i64]) -> Result<()>;

    /// Insert a default category unless its slug exists. Returns true when inserted.
    async fn insert_default(&self, category: &DefaultCategory, sort_order: i32) -> Result<bool>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

const TABLE: &str = "article_categories";

const SELECT_CATEGORY: &str = "SELECT id, slug, label, description, color, icon, sort_order, \
    created_at, updated_at FROM article_categories";

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_category_sqlite(self.pool.as_sqlite().unwrap(), category).await
            }
            DatabaseDriver::Mysql => {
                create_category_mysql(self.pool.as_mysql().unwrap(), category).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("{} WHERE id = ?", SELECT_CATEGORY);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get category by ID")?;
                Ok(row.map(|r| row_to_category_sqlite(&r)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get category by ID")?;
                Ok(row.map(|r| row_to_category_mysql(&r)))
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let sql = format!("{} WHERE slug = ?", SELECT_CATEGORY);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get category by slug")?;
                Ok(row.map(|r| row_to_category_sqlite(&r)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get category by slug")?;
                Ok(row.map(|r| row_to_category_mysql(&r)))
            }
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let sql = format!("{} ORDER BY sort_order ASC, id ASC", SELECT_CATEGORY);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list categories")?;
                Ok(rows.iter().map(row_to_category_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list categories")?;
                Ok(rows.iter().map(row_to_category_mysql).collect())
            }
        }
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_category_sqlite(self.pool.as_sqlite().unwrap(), category).await
            }
            DatabaseDriver::Mysql => {
                update_category_mysql(self.pool.as_mysql().unwrap(), category).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM article_categories WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete category")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete category")?;
            }
        }
        Ok(())
    }

    async fn next_sort_order(&self) -> Result<i32> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                ordering::next_sort_order_sqlite(self.pool.as_sqlite().unwrap(), TABLE).await
            }
            DatabaseDriver::Mysql => {
                ordering::next_sort_order_mysql(self.pool.as_mysql().unwrap(), TABLE).await
            }
        }
    }

    async fn reorder(&self, ids: &[i64]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                ordering::reorder_sqlite(self.pool.as_sqlite().unwrap(), TABLE, ids).await
            }
            DatabaseDriver::Mysql => {
                ordering::reorder_mysql(self.pool.as_mysql().unwrap(), TABLE, ids).await
            }
        }
    }

    async fn insert_default(&self, category: &DefaultCategory, sort_order: i32) -> Result<bool> {
        let columns = "(slug, label, color, icon, sort_order) VALUES (?, ?, ?, ?, ?)";
        let inserted = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&format!(
                "INSERT OR IGNORE INTO article_categories {}",
                columns
            ))
            .bind(category.slug)
            .bind(category.label)
            .bind(category.color)
            .bind(category.icon)
            .bind(sort_order)
            .execute(self.pool.as_sqlite().unwrap())
            .await
            .context("Failed to seed category")?
            .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(&format!(
                "INSERT IGNORE INTO article_categories {}",
                columns
            ))
            .bind(category.slug)
            .bind(category.label)
            .bind(category.color)
            .bind(category.icon)
            .bind(sort_order)
            .execute(self.pool.as_mysql().unwrap())
            .await
            .context("Failed to seed category")?
            .rows_affected(),
        };
        Ok(inserted > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let result = sqlx::query(
        r#"
        INSERT INTO article_categories (slug, label, description, color, icon, sort_order, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.slug)
    .bind(&category.label)
    .bind(&category.description)
    .bind(&category.color)
    .bind(&category.icon)
    .bind(category.sort_order)
    .bind(category.created_at)
    .bind(category.updated_at)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        ..category.clone()
    })
}

async fn update_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    sqlx::query(
        r#"
        UPDATE article_categories
        SET slug = ?, label = ?, description = ?, color = ?, icon = ?, sort_order = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&category.slug)
    .bind(&category.label)
    .bind(&category.description)
    .bind(&category.color)
    .bind(&category.icon)
    .bind(category.sort_order)
    .bind(category.updated_at)
    .bind(category.id)
    .execute(pool)
    .await
    .context("Failed to update category")?;

    Ok(category.clone())
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        slug: row.get("slug"),
        label: row.get("label"),
        description: row.get("description"),
        color: row.get("color"),
        icon: row.get("icon"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    let result = sqlx::query(
        r#"
        INSERT INTO article_categories (slug, label, description, color, icon, sort_order, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.slug)
    .bind(&category.label)
    .bind(&category.description)
    .bind(&category.color)
    .bind(&category.icon)
    .bind(category.sort_order)
    .bind(category.created_at)
    .bind(category.updated_at)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        ..category.clone()
    })
}

async fn update_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    sqlx::query(
        r#"
        UPDATE article_categories
        SET slug = ?, label = ?, description = ?, color = ?, icon = ?, sort_order = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&category.slug)
    .bind(&category.label)
    .bind(&category.description)
    .bind(&category.color)
    .bind(&category.icon)
    .bind(category.sort_order)
    .bind(category.updated_at)
    .bind(category.id)
    .execute(pool)
    .await
    .context("Failed to update category")?;

    Ok(category.clone())
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        slug: row.get("slug"),
        label: row.get("label"),
        description: row.get("description"),
        color: row.get("color"),
        icon: row.get("icon"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::DEFAULT_CATEGORIES;
    use chrono::Utc;

    async fn setup_test_repo() -> SqlxCategoryRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxCategoryRepository::new(pool)
    }

    fn category(slug: &str, sort_order: i32) -> Category {
        let now = Utc::now();
        Category {
            id: 0,
            slug: slug.to_string(),
            label: slug.to_uppercase(),
            description: None,
            color: "bg-red-500/20 text-red-400".to_string(),
            icon: None,
            sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_seeded_categories() {
        let repo = setup_test_repo().await;
        let slugs: Vec<_> = repo.list().await.unwrap().into_iter().map(|c| c.slug).collect();
        assert_eq!(slugs, vec!["ctf", "writeup", "hardening", "tutorial", "event"]);
    }

    #[tokio::test]
    async fn test_create_and_get_category() {
        let repo = setup_test_repo().await;
        let created = repo.create(&category("news", 5)).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_slug("news").await.unwrap().expect("Category not found");
        assert_eq!(found.label, "NEWS");
        assert!(repo.create(&category("news", 6)).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete_category() {
        let repo = setup_test_repo().await;
        let mut created = repo.create(&category("news", 5)).await.unwrap();
        created.description = Some("Actualités".to_string());
        created.label = "Actus".to_string();
        repo.update(&created).await.unwrap();

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.label, "Actus");
        assert_eq!(found.description.as_deref(), Some("Actualités"));

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_default_skips_existing() {
        let repo = setup_test_repo().await;
        let ctf = repo.get_by_slug("ctf").await.unwrap().unwrap();
        repo.delete(ctf.id).await.unwrap();

        let mut inserted = 0;
        for (index, default) in DEFAULT_CATEGORIES.iter().enumerate() {
            if repo.insert_default(default, index as i32).await.unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(repo.list().await.unwrap().len(), 5);
    }
}
