//! Site statistic repository
//!
//! The `key` field is stored in the `stat_key` column.

use super::ordering;
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{DefaultStat, SiteStat};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Site statistic repository trait
#[async_trait]
pub trait SiteStatRepository: Send + Sync {
    async fn create(&self, stat: &SiteStat) -> Result<SiteStat>;

    async fn update(&self, stat: &SiteStat) -> Result<SiteStat>;

    /// Set the value of the stat with `key`. Returns false when no such stat exists.
    async fn update_value(&self, key: &str, value: i32) -> Result<bool>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn get_by_id(&self, id: i64) -> Result<Option<SiteStat>>;

    async fn get_by_key(&self, key: &str) -> Result<Option<SiteStat>>;

    /// All stats by sort order
    async fn list(&self) -> Result<Vec<SiteStat>>;

    async fn next_sort_order(&self) -> Result<i32>;

    async fn reorder(&self, ids: &[i64]) -> Result<()>;

    /// Insert a default stat, or reset only its value when the key exists
    async fn upsert_default(&self, stat: &DefaultStat, sort_order: i32) -> Result<()>;
}

/// SQLx-based site statistic repository implementation
pub struct SqlxSiteStatRepository {
    pool: DynDatabasePool,
}

impl SqlxSiteStatRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SiteStatRepository> {
        Arc::new(Self::new(pool))
    }
}

const TABLE: &str = "site_stats";

const SELECT_STAT: &str =
    "SELECT id, stat_key, value, suffix, label, sort_order, updated_at FROM site_stats";

const INSERT_STAT: &str = "INSERT INTO site_stats (stat_key, value, suffix, label, sort_order, \
    updated_at) VALUES (?, ?, ?, ?, ?, ?)";

const UPDATE_STAT: &str = "UPDATE site_stats SET stat_key = ?, value = ?, suffix = ?, label = ?, \
    sort_order = ?, updated_at = ? WHERE id = ?";

const UPSERT_STAT_SQLITE: &str = "INSERT INTO site_stats (stat_key, value, suffix, label, \
    sort_order, updated_at) VALUES (?, ?, ?, ?, ?, ?) \
    ON CONFLICT(stat_key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

const UPSERT_STAT_MYSQL: &str = "INSERT INTO site_stats (stat_key, value, suffix, label, \
    sort_order, updated_at) VALUES (?, ?, ?, ?, ?, ?) \
    ON DUPLICATE KEY UPDATE value = VALUES(value), updated_at = VALUES(updated_at)";

macro_rules! row_to_stat {
    ($row:expr) => {
        SiteStat {
            id: $row.get("id"),
            key: $row.get("stat_key"),
            value: $row.get("value"),
            suffix: $row.get("suffix"),
            label: $row.get("label"),
            sort_order: $row.get("sort_order"),
            updated_at: $row.get("updated_at"),
        }
    };
}

#[async_trait]
impl SiteStatRepository for SqlxSiteStatRepository {
    async fn create(&self, stat: &SiteStat) -> Result<SiteStat> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT_STAT)
                .bind(&stat.key)
                .bind(stat.value)
                .bind(&stat.suffix)
                .bind(&stat.label)
                .bind(stat.sort_order)
                .bind(stat.updated_at)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to create stat")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(INSERT_STAT)
                .bind(&stat.key)
                .bind(stat.value)
                .bind(&stat.suffix)
                .bind(&stat.label)
                .bind(stat.sort_order)
                .bind(stat.updated_at)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to create stat")?
                .last_insert_id() as i64,
        };
        Ok(SiteStat { id, ..stat.clone() })
    }

    async fn update(&self, stat: &SiteStat) -> Result<SiteStat> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(UPDATE_STAT)
                    .bind(&stat.key)
                    .bind(stat.value)
                    .bind(&stat.suffix)
                    .bind(&stat.label)
                    .bind(stat.sort_order)
                    .bind(stat.updated_at)
                    .bind(stat.id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update stat")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(UPDATE_STAT)
                    .bind(&stat.key)
                    .bind(stat.value)
                    .bind(&stat.suffix)
                    .bind(&stat.label)
                    .bind(stat.sort_order)
                    .bind(stat.updated_at)
                    .bind(stat.id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update stat")?;
            }
        }
        Ok(stat.clone())
    }

    async fn update_value(&self, key: &str, value: i32) -> Result<bool> {
        let sql = "UPDATE site_stats SET value = ?, updated_at = ? WHERE stat_key = ?";
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(value)
                .bind(now)
                .bind(key)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to update stat value")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(value)
                .bind(now)
                .bind(key)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to update stat value")?
                .rows_affected(),
        };
        // MySQL reports 0 affected rows when nothing changed, so confirm by key
        if affected == 0 {
            return Ok(self.get_by_key(key).await?.is_some());
        }
        Ok(true)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM site_stats WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete stat")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete stat")?;
            }
        }
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<SiteStat>> {
        let sql = format!("{} WHERE id = ?", SELECT_STAT);
        let stat = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get stat by ID")?
                .map(|row| row_to_stat!(row)),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get stat by ID")?
                .map(|row| row_to_stat!(row)),
        };
        Ok(stat)
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<SiteStat>> {
        let sql = format!("{} WHERE stat_key = ?", SELECT_STAT);
        let stat = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(key)
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get stat by key")?
                .map(|row| row_to_stat!(row)),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(key)
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get stat by key")?
                .map(|row| row_to_stat!(row)),
        };
        Ok(stat)
    }

    async fn list(&self) -> Result<Vec<SiteStat>> {
        let sql = format!("{} ORDER BY sort_order ASC, id ASC", SELECT_STAT);
        let stats: Vec<SiteStat> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .fetch_all(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to list stats")?
                .iter()
                .map(|row| row_to_stat!(row))
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .fetch_all(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to list stats")?
                .iter()
                .map(|row| row_to_stat!(row))
                .collect(),
        };
        Ok(stats)
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

    async fn upsert_default(&self, stat: &DefaultStat, sort_order: i32) -> Result<()> {
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(UPSERT_STAT_SQLITE)
                    .bind(stat.key)
                    .bind(stat.value)
                    .bind(stat.suffix)
                    .bind(stat.label)
                    .bind(sort_order)
                    .bind(now)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to seed stat")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(UPSERT_STAT_MYSQL)
                    .bind(stat.key)
                    .bind(stat.value)
                    .bind(stat.suffix)
                    .bind(stat.label)
                    .bind(sort_order)
                    .bind(now)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to seed stat")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::DEFAULT_STATS;

    async fn setup_test_repo() -> SqlxSiteStatRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSiteStatRepository::new(pool)
    }

    #[tokio::test]
    async fn test_seeded_stats() {
        let repo = setup_test_repo().await;
        let stats = repo.list().await.unwrap();
        let keys: Vec<_> = stats.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["missions", "satisfaction", "members", "partners"]);
        assert_eq!(stats[1].display_value(), "98%");
    }

    #[tokio::test]
    async fn test_update_value_by_key() {
        let repo = setup_test_repo().await;
        assert!(repo.update_value("missions", 42).await.unwrap());
        assert_eq!(repo.get_by_key("missions").await.unwrap().unwrap().value, 42);
        assert!(!repo.update_value("unknown", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected() {
        let repo = setup_test_repo().await;
        let stat = SiteStat {
            id: 0,
            key: "missions".to_string(),
            value: 1,
            suffix: None,
            label: "Doublon".to_string(),
            sort_order: 9,
            updated_at: Utc::now(),
        };
        assert!(repo.create(&stat).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_default_resets_value_only() {
        let repo = setup_test_repo().await;
        let mut missions = repo.get_by_key("missions").await.unwrap().unwrap();
        missions.value = 99;
        missions.label = "Missions".to_string();
        repo.update(&missions).await.unwrap();
        let partners = repo.get_by_key("partners").await.unwrap().unwrap();
        repo.delete(partners.id).await.unwrap();

        for (index, default) in DEFAULT_STATS.iter().enumerate() {
            repo.upsert_default(default, index as i32).await.unwrap();
        }

        let missions = repo.get_by_key("missions").await.unwrap().unwrap();
        assert_eq!(missions.value, 15);
        assert_eq!(missions.label, "Missions");
        assert!(repo.get_by_key("partners").await.unwrap().is_some());
    }
}
