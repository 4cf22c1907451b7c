//! Method step repository

use super::ordering;
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::MethodStep;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Method step repository trait
#[async_trait]
pub trait MethodStepRepository: Send + Sync {
    async fn create(&self, step: &MethodStep) -> Result<MethodStep>;

    async fn update(&self, step: &MethodStep) -> Result<MethodStep>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn get_by_id(&self, id: i64) -> Result<Option<MethodStep>>;

    /// Steps by sort order. Inactive ones only when `include_inactive`.
    async fn list(&self, include_inactive: bool) -> Result<Vec<MethodStep>>;

    async fn next_sort_order(&self) -> Result<i32>;
}

/// SQLx-based method step repository implementation
pub struct SqlxMethodStepRepository {
    pool: DynDatabasePool,
}

impl SqlxMethodStepRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MethodStepRepository> {
        Arc::new(Self::new(pool))
    }
}

const TABLE: &str = "method_steps";

const SELECT_STEP: &str =
    "SELECT id, step_number, title, description, icon, sort_order, active FROM method_steps";

const INSERT_STEP: &str = "INSERT INTO method_steps (step_number, title, description, icon, \
    sort_order, active) VALUES (?, ?, ?, ?, ?, ?)";

const UPDATE_STEP: &str = "UPDATE method_steps SET step_number = ?, title = ?, description = ?, \
    icon = ?, sort_order = ?, active = ? WHERE id = ?";

macro_rules! row_to_step {
    ($row:expr) => {
        MethodStep {
            id: $row.get("id"),
            step_number: $row.get("step_number"),
            title: $row.get("title"),
            description: $row.get("description"),
            icon: $row.get("icon"),
            sort_order: $row.get("sort_order"),
            active: $row.get("active"),
        }
    };
}

#[async_trait]
impl MethodStepRepository for SqlxMethodStepRepository {
    async fn create(&self, step: &MethodStep) -> Result<MethodStep> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT_STEP)
                .bind(step.step_number)
                .bind(&step.title)
                .bind(&step.description)
                .bind(&step.icon)
                .bind(step.sort_order)
                .bind(step.active)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to create method step")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(INSERT_STEP)
                .bind(step.step_number)
                .bind(&step.title)
                .bind(&step.description)
                .bind(&step.icon)
                .bind(step.sort_order)
                .bind(step.active)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to create method step")?
                .last_insert_id() as i64,
        };
        Ok(MethodStep { id, ..step.clone() })
    }

    async fn update(&self, step: &MethodStep) -> Result<MethodStep> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(UPDATE_STEP)
                    .bind(step.step_number)
                    .bind(&step.title)
                    .bind(&step.description)
                    .bind(&step.icon)
                    .bind(step.sort_order)
                    .bind(step.active)
                    .bind(step.id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update method step")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(UPDATE_STEP)
                    .bind(step.step_number)
                    .bind(&step.title)
                    .bind(&step.description)
                    .bind(&step.icon)
                    .bind(step.sort_order)
                    .bind(step.active)
                    .bind(step.id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update method step")?;
            }
        }
        Ok(step.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM method_steps WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete method step")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete method step")?;
            }
        }
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MethodStep>> {
        let sql = format!("{} WHERE id = ?", SELECT_STEP);
        let step = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get method step")?
                .map(|row| row_to_step!(row)),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get method step")?
                .map(|row| row_to_step!(row)),
        };
        Ok(step)
    }

    async fn list(&self, include_inactive: bool) -> Result<Vec<MethodStep>> {
        let filter = if include_inactive { "" } else { "WHERE active = TRUE" };
        let sql = format!("{} {} ORDER BY sort_order ASC, step_number ASC", SELECT_STEP, filter);
        let steps: Vec<MethodStep> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .fetch_all(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to list method steps")?
                .iter()
                .map(|row| row_to_step!(row))
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .fetch_all(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to list method steps")?
                .iter()
                .map(|row| row_to_step!(row))
                .collect(),
        };
        Ok(steps)
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxMethodStepRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxMethodStepRepository::new(pool)
    }

    #[tokio::test]
    async fn test_seeded_steps() {
        let repo = setup_test_repo().await;
        let steps = repo.list(false).await.unwrap();
        let titles: Vec<_> = steps.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Analyse", "Audit", "Rapport", "Accompagnement"]);
        assert_eq!(repo.next_sort_order().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_create_update_delete_step() {
        let repo = setup_test_repo().await;
        let step = MethodStep {
            id: 0,
            step_number: 5,
            title: "Suivi".to_string(),
            description: "Suivi des corrections".to_string(),
            icon: "Repeat".to_string(),
            sort_order: 4,
            active: false,
        };
        let mut created = repo.create(&step).await.unwrap();
        assert_eq!(repo.list(false).await.unwrap().len(), 4);
        assert_eq!(repo.list(true).await.unwrap().len(), 5);

        created.active = true;
        created.title = "Suivi long terme".to_string();
        repo.update(&created).await.unwrap();
        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Suivi long terme");
        assert!(found.active);

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }
}
