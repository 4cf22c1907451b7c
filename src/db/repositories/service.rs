//! Service repository
//!
//! Database operations for the offerings shown on the home page.

use super::ordering;
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Service;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Service repository trait
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    /// Insert a service, returning it with its new ID
    async fn create(&self, service: &Service) -> Result<Service>;

    /// Persist an existing service
    async fn update(&self, service: &Service) -> Result<Service>;

    /// Delete a service
    async fn delete(&self, id: i64) -> Result<()>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Service>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Service>>;

    /// Services by sort order. Inactive ones only when `include_inactive`.
    async fn list(&self, include_inactive: bool) -> Result<Vec<Service>>;

    /// Flip the active flag
    async fn set_active(&self, id: i64, active: bool) -> Result<()>;

    /// Sort order placing a new service last
    async fn next_sort_order(&self) -> Result<i32>;

    /// Rewrite sort orders following `ids`
    async fn reorder(&self, ids: &[i64]) -> Result<()>;
}

/// SQLx-based service repository implementation
pub struct SqlxServiceRepository {
    pool: DynDatabasePool,
}

impl SqlxServiceRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ServiceRepository> {
        Arc::new(Self::new(pool))
    }
}

const TABLE: &str = "services";

const SELECT_SERVICE: &str = "SELECT id, slug, title, description, icon, features, sort_order, \
    active, created_at, updated_at FROM services";

#[async_trait]
impl ServiceRepository for SqlxServiceRepository {
    async fn create(&self, service: &Service) -> Result<Service> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_service_sqlite(self.pool.as_sqlite().unwrap(), service).await
            }
            DatabaseDriver::Mysql => {
                create_service_mysql(self.pool.as_mysql().unwrap(), service).await
            }
        }
    }

    async fn update(&self, service: &Service) -> Result<Service> {
        let sql = "UPDATE services SET slug = ?, title = ?, description = ?, icon = ?, \
            features = ?, sort_order = ?, active = ?, updated_at = ? WHERE id = ?";
        let features = encode_features(&service.features)?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&service.slug)
                    .bind(&service.title)
                    .bind(&service.description)
                    .bind(&service.icon)
                    .bind(&features)
                    .bind(service.sort_order)
                    .bind(service.active)
                    .bind(service.updated_at)
                    .bind(service.id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update service")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&service.slug)
                    .bind(&service.title)
                    .bind(&service.description)
                    .bind(&service.icon)
                    .bind(&features)
                    .bind(service.sort_order)
                    .bind(service.active)
                    .bind(service.updated_at)
                    .bind(service.id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update service")?;
            }
        }
        Ok(service.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM services WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete service")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete service")?;
            }
        }
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Service>> {
        let sql = format!("{} WHERE id = ?", SELECT_SERVICE);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get service by ID")?;
                row.map(|r| row_to_service_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get service by ID")?;
                row.map(|r| row_to_service_mysql(&r)).transpose()
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Service>> {
        let sql = format!("{} WHERE slug = ?", SELECT_SERVICE);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get service by slug")?;
                row.map(|r| row_to_service_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get service by slug")?;
                row.map(|r| row_to_service_mysql(&r)).transpose()
            }
        }
    }

    async fn list(&self, include_inactive: bool) -> Result<Vec<Service>> {
        let sql = if include_inactive {
            format!("{} ORDER BY sort_order ASC, id ASC", SELECT_SERVICE)
        } else {
            format!("{} WHERE active = TRUE ORDER BY sort_order ASC, id ASC", SELECT_SERVICE)
        };
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list services")?;
                rows.iter().map(row_to_service_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list services")?;
                rows.iter().map(row_to_service_mysql).collect()
            }
        }
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<()> {
        let sql = "UPDATE services SET active = ?, updated_at = ? WHERE id = ?";
        let now = chrono::Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(active)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to toggle service")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(active)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to toggle service")?;
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
}

fn encode_features(features: &[String]) -> Result<String> {
    serde_json::to_string(features).context("Failed to encode service features")
}

fn decode_features(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).with_context(|| format!("Invalid features in database: {}", raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_service_sqlite(pool: &SqlitePool, service: &Service) -> Result<Service> {
    let result = sqlx::query(
        r#"
        INSERT INTO services (slug, title, description, icon, features, sort_order, active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&service.slug)
    .bind(&service.title)
    .bind(&service.description)
    .bind(&service.icon)
    .bind(encode_features(&service.features)?)
    .bind(service.sort_order)
    .bind(service.active)
    .bind(service.created_at)
    .bind(service.updated_at)
    .execute(pool)
    .await
    .context("Failed to create service")?;

    Ok(Service {
        id: result.last_insert_rowid(),
        ..service.clone()
    })
}

fn row_to_service_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Service> {
    let features: String = row.get("features");
    Ok(Service {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        icon: row.get("icon"),
        features: decode_features(&features)?,
        sort_order: row.get("sort_order"),
        active: row.get("active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_service_mysql(pool: &MySqlPool, service: &Service) -> Result<Service> {
    let result = sqlx::query(
        r#"
        INSERT INTO services (slug, title, description, icon, features, sort_order, active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&service.slug)
    .bind(&service.title)
    .bind(&service.description)
    .bind(&service.icon)
    .bind(encode_features(&service.features)?)
    .bind(service.sort_order)
    .bind(service.active)
    .bind(service.created_at)
    .bind(service.updated_at)
    .execute(pool)
    .await
    .context("Failed to create service")?;

    Ok(Service {
        id: result.last_insert_id() as i64,
        ..service.clone()
    })
}

fn row_to_service_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Service> {
    let features: String = row.get("features");
    Ok(Service {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        icon: row.get("icon"),
        features: decode_features(&features)?,
        sort_order: row.get("sort_order"),
        active: row.get("active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    async fn setup_test_repo() -> SqlxServiceRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxServiceRepository::new(pool)
    }

    fn test_service(slug: &str, sort_order: i32, active: bool) -> Service {
        let now = Utc::now();
        Service {
            id: 0,
            slug: slug.to_string(),
            title: format!("Service {}", slug),
            description: "Description".to_string(),
            icon: "Shield".to_string(),
            features: vec!["Audit".to_string(), "Rapport".to_string()],
            sort_order,
            active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_service() {
        let repo = setup_test_repo().await;
        let created = repo.create(&test_service("audit", 0, true)).await.unwrap();

        let found = repo.get_by_slug("audit").await.unwrap().expect("Service not found");
        assert_eq!(found.id, created.id);
        assert_eq!(found.features, vec!["Audit", "Rapport"]);
        assert!(found.active);
    }

    #[tokio::test]
    async fn test_list_hides_inactive_and_sorts() {
        let repo = setup_test_repo().await;
        repo.create(&test_service("b", 1, true)).await.unwrap();
        repo.create(&test_service("a", 0, true)).await.unwrap();
        repo.create(&test_service("hidden", 2, false)).await.unwrap();

        let public: Vec<_> = repo.list(false).await.unwrap().into_iter().map(|s| s.slug).collect();
        assert_eq!(public, vec!["a", "b"]);
        assert_eq!(repo.list(true).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_toggle_and_delete() {
        let repo = setup_test_repo().await;
        let mut service = repo.create(&test_service("pentest", 0, true)).await.unwrap();

        service.features = vec![];
        service.title = "Pentest".to_string();
        repo.update(&service).await.unwrap();
        let found = repo.get_by_id(service.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Pentest");
        assert!(found.features.is_empty());

        repo.set_active(service.id, false).await.unwrap();
        assert!(!repo.get_by_id(service.id).await.unwrap().unwrap().active);

        repo.delete(service.id).await.unwrap();
        assert!(repo.get_by_id(service.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sort_order_helpers() {
        let repo = setup_test_repo().await;
        assert_eq!(repo.next_sort_order().await.unwrap(), 0);
        let first = repo.create(&test_service("one", 0, true)).await.unwrap();
        let second = repo.create(&test_service("two", 1, true)).await.unwrap();
        assert_eq!(repo.next_sort_order().await.unwrap(), 2);

        repo.reorder(&[second.id, first.id]).await.unwrap();
        let slugs: Vec<_> = repo.list(true).await.unwrap().into_iter().map(|s| s.slug).collect();
        assert_eq!(slugs, vec!["two", "one"]);
    }
}
