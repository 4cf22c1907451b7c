//! Database connection pools
//!
//! SQLite is the default: one file next to the binary, WAL enabled so public
//! reads are not blocked while an admin edits. MySQL is available for hosted
//! deployments. Both sit behind [`DatabasePool`] so repositories pick their
//! SQL dialect from [`DatabasePool::driver`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DatabaseConfig, DatabaseDriver};

const SQLITE_MAX_CONNECTIONS: u32 = 8;
const MYSQL_MAX_CONNECTIONS: u32 = 20;
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Execute raw SQL, returning the number of affected rows
    async fn execute(&self, query: &str) -> Result<u64>;

    async fn ping(&self) -> Result<()>;

    async fn close(&self);

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool>;

    fn as_mysql(&self) -> Option<&MySqlPool>;
}

pub type DynDatabasePool = Arc<dyn DatabasePool>;

fn is_memory_url(url: &str) -> bool {
    matches!(url, ":memory:" | "sqlite::memory:" | "sqlite://:memory:")
}

/// Connection options for a SQLite URL or bare file path
fn sqlite_options(url: &str) -> Result<SqliteConnectOptions> {
    if is_memory_url(url) {
        return SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Invalid in-memory SQLite URL");
    }

    let options = if url.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid SQLite URL: {}", url))?
    } else {
        if let Some(parent) = Path::new(url).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }
        SqliteConnectOptions::new().filename(url)
    };

    Ok(options
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(SQLITE_BUSY_TIMEOUT))
}

pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = sqlite_options(&config.url)?;
        // Each connection to an in-memory database gets its own empty
        // database, so the pool must never open a second one.
        let max_connections = if is_memory_url(&config.url) {
            1
        } else {
            config.max_connections.unwrap_or(SQLITE_MAX_CONNECTIONS)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database: {}", config.url))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("SQLite ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = if config.url.starts_with("mysql://") {
            config.url.clone()
        } else {
            format!("mysql://{}", config.url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections.unwrap_or(MYSQL_MAX_CONNECTIONS))
            .connect(&url)
            .await
            .context("Failed to connect to MySQL")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("MySQL ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// Open the pool selected by `config.driver`
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    Ok(match config.driver {
        DatabaseDriver::Sqlite => Arc::new(SqliteDatabase::connect(config).await?),
        DatabaseDriver::Mysql => Arc::new(MysqlDatabase::connect(config).await?),
    })
}

/// Empty in-memory SQLite database. Migrations are not applied.
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
        max_connections: None,
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_config(url: String) -> DatabaseConfig {
        DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url,
            max_connections: Some(2),
        }
    }

    #[test]
    fn test_memory_urls() {
        assert!(is_memory_url(":memory:"));
        assert!(is_memory_url("sqlite::memory:"));
        assert!(!is_memory_url("data/jcpc.db"));
    }

    #[tokio::test]
    async fn test_memory_pool_keeps_one_database() {
        let pool = create_test_pool().await.unwrap();
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_mysql().is_none());

        pool.execute("CREATE TABLE shared (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        // Would fail if the insert landed on a fresh connection
        let affected = pool.execute("INSERT INTO shared (id) VALUES (1)").await.unwrap();
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_file_pool_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("jcpc.db");

        let pool = create_pool(&sqlite_config(path.to_string_lossy().to_string()))
            .await
            .unwrap();
        pool.ping().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_file_pool_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("wal.db").display());

        let pool = create_pool(&sqlite_config(url)).await.unwrap();
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_closed_pool_fails_ping() {
        let pool = create_test_pool().await.unwrap();
        pool.close().await;
        assert!(pool.ping().await.is_err());
    }

    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/jcpc_test".to_string());
        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
            max_connections: None,
        })
        .await
        .unwrap();
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        pool.ping().await.unwrap();
    }
}
