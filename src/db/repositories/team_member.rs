//! Team member repository

use super::ordering;
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::TeamMember;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Team member repository trait
#[async_trait]
pub trait TeamMemberRepository: Send + Sync {
    async fn create(&self, member: &TeamMember) -> Result<TeamMember>;

    async fn update(&self, member: &TeamMember) -> Result<TeamMember>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn get_by_id(&self, id: i64) -> Result<Option<TeamMember>>;

    /// Members by sort order. Inactive ones only when `include_inactive`.
    async fn list(&self, include_inactive: bool) -> Result<Vec<TeamMember>>;

    async fn set_active(&self, id: i64, active: bool) -> Result<()>;

    async fn next_sort_order(&self) -> Result<i32>;

    async fn reorder(&self, ids: &[i64]) -> Result<()>;
}

/// SQLx-based team member repository implementation
pub struct SqlxTeamMemberRepository {
    pool: DynDatabasePool,
}

impl SqlxTeamMemberRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TeamMemberRepository> {
        Arc::new(Self::new(pool))
    }
}

const TABLE: &str = "team_members";

const SELECT_MEMBER: &str = "SELECT id, name, role, description, linkedin, photo, sort_order, \
    active, created_at, updated_at FROM team_members";

const INSERT_MEMBER: &str = "INSERT INTO team_members (name, role, description, linkedin, photo, \
    sort_order, active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";

const UPDATE_MEMBER: &str = "UPDATE team_members SET name = ?, role = ?, description = ?, \
    linkedin = ?, photo = ?, sort_order = ?, active = ?, updated_at = ? WHERE id = ?";

/// Both row types expose the same column accessors
macro_rules! row_to_member {
    ($row:expr) => {
        TeamMember {
            id: $row.get("id"),
            name: $row.get("name"),
            role: $row.get("role"),
            description: $row.get("description"),
            linkedin: $row.get("linkedin"),
            photo: $row.get("photo"),
            sort_order: $row.get("sort_order"),
            active: $row.get("active"),
            created_at: $row.get("created_at"),
            updated_at: $row.get("updated_at"),
        }
    };
}

#[async_trait]
impl TeamMemberRepository for SqlxTeamMemberRepository {
    async fn create(&self, member: &TeamMember) -> Result<TeamMember> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT_MEMBER)
                .bind(&member.name)
                .bind(&member.role)
                .bind(&member.description)
                .bind(&member.linkedin)
                .bind(&member.photo)
                .bind(member.sort_order)
                .bind(member.active)
                .bind(member.created_at)
                .bind(member.updated_at)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to create team member")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(INSERT_MEMBER)
                .bind(&member.name)
                .bind(&member.role)
                .bind(&member.description)
                .bind(&member.linkedin)
                .bind(&member.photo)
                .bind(member.sort_order)
                .bind(member.active)
                .bind(member.created_at)
                .bind(member.updated_at)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to create team member")?
                .last_insert_id() as i64,
        };

        Ok(TeamMember {
            id,
            ..member.clone()
        })
    }

    async fn update(&self, member: &TeamMember) -> Result<TeamMember> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(UPDATE_MEMBER)
                    .bind(&member.name)
                    .bind(&member.role)
                    .bind(&member.description)
                    .bind(&member.linkedin)
                    .bind(&member.photo)
                    .bind(member.sort_order)
                    .bind(member.active)
                    .bind(member.updated_at)
                    .bind(member.id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update team member")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(UPDATE_MEMBER)
                    .bind(&member.name)
                    .bind(&member.role)
                    .bind(&member.description)
                    .bind(&member.linkedin)
                    .bind(&member.photo)
                    .bind(member.sort_order)
                    .bind(member.active)
                    .bind(member.updated_at)
                    .bind(member.id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update team member")?;
            }
        }
        Ok(member.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM team_members WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete team member")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete team member")?;
            }
        }
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<TeamMember>> {
        let sql = format!("{} WHERE id = ?", SELECT_MEMBER);
        let member = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get team member")?
                .map(|row| row_to_member!(row)),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get team member")?
                .map(|row| row_to_member!(row)),
        };
        Ok(member)
    }

    async fn list(&self, include_inactive: bool) -> Result<Vec<TeamMember>> {
        let filter = if include_inactive { "" } else { "WHERE active = TRUE" };
        let sql = format!("{} {} ORDER BY sort_order ASC, id ASC", SELECT_MEMBER, filter);
        let members: Vec<TeamMember> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .fetch_all(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to list team members")?
                .iter()
                .map(|row| row_to_member!(row))
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .fetch_all(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to list team members")?
                .iter()
                .map(|row| row_to_member!(row))
                .collect(),
        };
        Ok(members)
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<()> {
        let sql = "UPDATE team_members SET active = ?, updated_at = ? WHERE id = ?";
        let now = chrono::Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(active)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to toggle team member")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(active)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to toggle team member")?;
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
