//! Contact repository
//!
//! Messages received through the public contact form. The `read` field is
//! stored in the `is_read` column.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Contact;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Contact repository trait
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Store a new message
    async fn create(&self, contact: &Contact) -> Result<Contact>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Contact>>;

    /// All messages, newest first
    async fn list(&self) -> Result<Vec<Contact>>;

    /// The `limit` newest messages
    async fn list_recent(&self, limit: i64) -> Result<Vec<Contact>>;

    /// Returns false when the message does not exist
    async fn mark_as_read(&self, id: i64) -> Result<bool>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn count(&self) -> Result<i64>;

    async fn count_unread(&self) -> Result<i64>;
}

/// SQLx-based contact repository implementation
pub struct SqlxContactRepository {
    pool: DynDatabasePool,
}

const SELECT_CONTACT: &str = "SELECT id, company, name, email, phone, subject, message, is_read, \
    created_at FROM contacts";

const INSERT_CONTACT: &str = "INSERT INTO contacts (company, name, email, phone, subject, message, \
    is_read, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

macro_rules! row_to_contact {
    ($row:expr) => {
        Contact {
            id: $row.get("id"),
            company: $row.get("company"),
            name: $row.get("name"),
            email: $row.get("email"),
            phone: $row.get("phone"),
            subject: $row.get("subject"),
            message: $row.get("message"),
            read: $row.get("is_read"),
            created_at: $row.get("created_at"),
        }
    };
}

impl SqlxContactRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContactRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_list(&self, limit: Option<i64>) -> Result<Vec<Contact>> {
        let mut sql = format!("{} ORDER BY created_at DESC, id DESC", SELECT_CONTACT);
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }
        let contacts: Vec<Contact> = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(&sql);
                if let Some(limit) = limit {
                    query = query.bind(limit);
                }
                query
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list contacts")?
                    .iter()
                    .map(|row| row_to_contact!(row))
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(&sql);
                if let Some(limit) = limit {
                    query = query.bind(limit);
                }
                query
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list contacts")?
                    .iter()
                    .map(|row| row_to_contact!(row))
                    .collect()
            }
        };
        Ok(contacts)
    }

    async fn count_where(&self, clause: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) AS count FROM contacts {}", clause);
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to count contacts")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to count contacts")?
                .get("count"),
        };
        Ok(count)
    }
}

#[async_trait]
impl ContactRepository for SqlxContactRepository {
    async fn create(&self, contact: &Contact) -> Result<Contact> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT_CONTACT)
                .bind(&contact.company)
                .bind(&contact.name)
                .bind(&contact.email)
                .bind(&contact.phone)
                .bind(&contact.subject)
                .bind(&contact.message)
                .bind(contact.read)
                .bind(contact.created_at)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to create contact")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(INSERT_CONTACT)
                .bind(&contact.company)
                .bind(&contact.name)
                .bind(&contact.email)
                .bind(&contact.phone)
                .bind(&contact.subject)
                .bind(&contact.message)
                .bind(contact.read)
                .bind(contact.created_at)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to create contact")?
                .last_insert_id() as i64,
        };
        Ok(Contact {
            id,
            ..contact.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Contact>> {
        let sql = format!("{} WHERE id = ?", SELECT_CONTACT);
        let contact = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get contact")?
                .map(|row| row_to_contact!(row)),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get contact")?
                .map(|row| row_to_contact!(row)),
        };
        Ok(contact)
    }

    async fn list(&self) -> Result<Vec<Contact>> {
        self.fetch_list(None).await
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Contact>> {
        self.fetch_list(Some(limit)).await
    }

    async fn mark_as_read(&self, id: i64) -> Result<bool> {
        let sql = "UPDATE contacts SET is_read = TRUE WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to mark contact as read")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to mark contact as read")?;
            }
        }
        // Affected rows are unreliable on MySQL for already-read rows
        Ok(self.get_by_id(id).await?.is_some())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM contacts WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete contact")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete contact")?;
            }
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        self.count_where("").await
    }

    async fn count_unread(&self) -> Result<i64> {
        self.count_where("WHERE is_read = FALSE").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::{Duration, Utc};

    async fn setup_test_repo() -> SqlxContactRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxContactRepository::new(pool)
    }

    fn contact(name: &str, minutes_ago: i64) -> Contact {
        Contact {
            id: 0,
            company: None,
            name: name.to_string(),
            email: "someone@example.com".to_string(),
            phone: Some("0612345678".to_string()),
            subject: "Audit de sécurité".to_string(),
            message: "Bonjour, nous souhaitons un audit de notre site.".to_string(),
            read: false,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_newest_first() {
        let repo = setup_test_repo().await;
        repo.create(&contact("Old", 30)).await.unwrap();
        repo.create(&contact("New", 1)).await.unwrap();
        repo.create(&contact("Mid", 10)).await.unwrap();

        let names: Vec<_> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["New", "Mid", "Old"]);
        assert_eq!(repo.list_recent(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mark_as_read_and_counts() {
        let repo = setup_test_repo().await;
        let first = repo.create(&contact("A", 2)).await.unwrap();
        repo.create(&contact("B", 1)).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.count_unread().await.unwrap(), 2);

        assert!(repo.mark_as_read(first.id).await.unwrap());
        assert!(repo.get_by_id(first.id).await.unwrap().unwrap().read);
        assert_eq!(repo.count_unread().await.unwrap(), 1);
        assert!(!repo.mark_as_read(9999).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_contact() {
        let repo = setup_test_repo().await;
        let created = repo.create(&contact("A", 0)).await.unwrap();
        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
