//! Database migrations module
//!
//! Code-based migrations for the JCPC site. All migrations are embedded
//! directly in Rust code as SQL strings, for both SQLite and MySQL, so the
//! server ships as a single binary.
//!
//! # Usage
//!
//! ```ignore
//! use jcpc::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```
//!
//! Each migration is defined as a `Migration` struct containing:
//! - `version`: Unique version number for ordering
//! - `name`: Human-readable migration name
//! - `up_sqlite`: SQL for SQLite database
//! - `up_mysql`: SQL for MySQL database
//!
//! Statements are split on `;`, so seed values must not contain one.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All migrations, embedded in the binary.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_admins",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS admins (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                name VARCHAR(200) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'EDITOR',
                last_login_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS admins (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                name VARCHAR(200) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'EDITOR',
                last_login_at DATETIME NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    // Sessions reference admins by id only: the data model has no foreign keys
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                admin_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_admin_id ON sessions(admin_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                admin_id BIGINT NOT NULL,
                expires_at DATETIME NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_sessions_admin_id ON sessions(admin_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_article_categories",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS article_categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug VARCHAR(100) NOT NULL UNIQUE,
                label VARCHAR(200) NOT NULL,
                description TEXT,
                color VARCHAR(100) NOT NULL,
                icon VARCHAR(50),
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT OR IGNORE INTO article_categories (slug, label, color, icon, sort_order)
            VALUES ('ctf', 'CTF', 'bg-cyan-500/20 text-cyan-400', 'Target', 0);
            INSERT OR IGNORE INTO article_categories (slug, label, color, icon, sort_order)
            VALUES ('writeup', 'Writeup', 'bg-purple-500/20 text-purple-400', 'FileText', 1);
            INSERT OR IGNORE INTO article_categories (slug, label, color, icon, sort_order)
            VALUES ('hardening', 'Hardening', 'bg-emerald-500/20 text-emerald-400', 'Shield', 2);
            INSERT OR IGNORE INTO article_categories (slug, label, color, icon, sort_order)
            VALUES ('tutorial', 'Tutoriel', 'bg-amber-500/20 text-amber-400', 'BookOpen', 3);
            INSERT OR IGNORE INTO article_categories (slug, label, color, icon, sort_order)
            VALUES ('event', 'Événement', 'bg-pink-500/20 text-pink-400', 'Calendar', 4);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS article_categories (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                slug VARCHAR(100) NOT NULL UNIQUE,
                label VARCHAR(200) NOT NULL,
                description TEXT,
                color VARCHAR(100) NOT NULL,
                icon VARCHAR(50),
                sort_order INT NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT IGNORE INTO article_categories (slug, label, color, icon, sort_order)
            VALUES ('ctf', 'CTF', 'bg-cyan-500/20 text-cyan-400', 'Target', 0);
            INSERT IGNORE INTO article_categories (slug, label, color, icon, sort_order)
            VALUES ('writeup', 'Writeup', 'bg-purple-500/20 text-purple-400', 'FileText', 1);
            INSERT IGNORE INTO article_categories (slug, label, color, icon, sort_order)
            VALUES ('hardening', 'Hardening', 'bg-emerald-500/20 text-emerald-400', 'Shield', 2);
            INSERT IGNORE INTO article_categories (slug, label, color, icon, sort_order)
            VALUES ('tutorial', 'Tutoriel', 'bg-amber-500/20 text-amber-400', 'BookOpen', 3);
            INSERT IGNORE INTO article_categories (slug, label, color, icon, sort_order)
            VALUES ('event', 'Événement', 'bg-pink-500/20 text-pink-400', 'Calendar', 4);
        "#,
    },
    // Tags are stored as a JSON array of names and the category as a slug
    Migration {
        version: 4,
        name: "create_posts",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug VARCHAR(255) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                excerpt TEXT NOT NULL,
                content TEXT NOT NULL,
                category VARCHAR(100) NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                reading_time INTEGER NOT NULL DEFAULT 5,
                featured INTEGER NOT NULL DEFAULT 0,
                published INTEGER NOT NULL DEFAULT 0,
                author_id INTEGER,
                author_name VARCHAR(200),
                published_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                ctf_name VARCHAR(255),
                ctf_date TIMESTAMP,
                ranking VARCHAR(100),
                difficulty VARCHAR(20),
                event_date TIMESTAMP,
                event_location VARCHAR(255),
                event_url VARCHAR(500),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_posts_category ON posts(category);
            CREATE INDEX IF NOT EXISTS idx_posts_published ON posts(published, published_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS posts (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                slug VARCHAR(255) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                excerpt TEXT NOT NULL,
                content MEDIUMTEXT NOT NULL,
                category VARCHAR(100) NOT NULL,
                tags TEXT NOT NULL,
                reading_time INT NOT NULL DEFAULT 5,
                featured BOOLEAN NOT NULL DEFAULT FALSE,
                published BOOLEAN NOT NULL DEFAULT FALSE,
                author_id BIGINT NULL,
                author_name VARCHAR(200) NULL,
                published_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                ctf_name VARCHAR(255) NULL,
                ctf_date DATETIME NULL,
                ranking VARCHAR(100) NULL,
                difficulty VARCHAR(20) NULL,
                event_date DATETIME NULL,
                event_location VARCHAR(255) NULL,
                event_url VARCHAR(500) NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_posts_category ON posts(category);
            CREATE INDEX idx_posts_published ON posts(published, published_at);
        "#,
    },
    Migration {
        version: 5,
        name: "create_tags",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                slug VARCHAR(100) NOT NULL UNIQUE,
                color VARCHAR(100),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                slug VARCHAR(100) NOT NULL UNIQUE,
                color VARCHAR(100) NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 6,
        name: "create_services",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS services (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug VARCHAR(100) NOT NULL UNIQUE,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL,
                icon VARCHAR(50) NOT NULL,
                features TEXT NOT NULL DEFAULT '[]',
                sort_order INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_services_sort_order ON services(sort_order);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS services (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                slug VARCHAR(100) NOT NULL UNIQUE,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL,
                icon VARCHAR(50) NOT NULL,
                features TEXT NOT NULL,
                sort_order INT NOT NULL DEFAULT 0,
                active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_services_sort_order ON services(sort_order);
        "#,
    },
    Migration {
        version: 7,
        name: "create_team_members",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS team_members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(200) NOT NULL,
                role VARCHAR(200) NOT NULL,
                description TEXT NOT NULL,
                linkedin VARCHAR(500),
                photo VARCHAR(500),
                sort_order INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_team_members_sort_order ON team_members(sort_order);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS team_members (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(200) NOT NULL,
                role VARCHAR(200) NOT NULL,
                description TEXT NOT NULL,
                linkedin VARCHAR(500) NULL,
                photo VARCHAR(500) NULL,
                sort_order INT NOT NULL DEFAULT 0,
                active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_team_members_sort_order ON team_members(sort_order);
        "#,
    },
    // `key` is reserved in MySQL, hence stat_key
    Migration {
        version: 8,
        name: "create_site_stats",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS site_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                stat_key VARCHAR(100) NOT NULL UNIQUE,
                value INTEGER NOT NULL,
                suffix VARCHAR(10),
                label VARCHAR(200) NOT NULL,
                sort_order INTEGER NOT NULL DEFAULT 0,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT OR IGNORE INTO site_stats (stat_key, value, suffix, label, sort_order)
            VALUES ('missions', 15, '+', 'Missions réalisées', 0);
            INSERT OR IGNORE INTO site_stats (stat_key, value, suffix, label, sort_order)
            VALUES ('satisfaction', 98, '%', 'Clients satisfaits', 1);
            INSERT OR IGNORE INTO site_stats (stat_key, value, suffix, label, sort_order)
            VALUES ('members', 25, '+', 'Membres actifs', 2);
            INSERT OR IGNORE INTO site_stats (stat_key, value, suffix, label, sort_order)
            VALUES ('partners', 5, '+', 'Partenaires', 3);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS site_stats (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                stat_key VARCHAR(100) NOT NULL UNIQUE,
                value INT NOT NULL,
                suffix VARCHAR(10) NULL,
                label VARCHAR(200) NOT NULL,
                sort_order INT NOT NULL DEFAULT 0,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT IGNORE INTO site_stats (stat_key, value, suffix, label, sort_order)
            VALUES ('missions', 15, '+', 'Missions réalisées', 0);
            INSERT IGNORE INTO site_stats (stat_key, value, suffix, label, sort_order)
            VALUES ('satisfaction', 98, '%', 'Clients satisfaits', 1);
            INSERT IGNORE INTO site_stats (stat_key, value, suffix, label, sort_order)
            VALUES ('members', 25, '+', 'Membres actifs', 2);
            INSERT IGNORE INTO site_stats (stat_key, value, suffix, label, sort_order)
            VALUES ('partners', 5, '+', 'Partenaires', 3);
        "#,
    },
    Migration {
        version: 9,
        name: "create_method_steps",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS method_steps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                step_number INTEGER NOT NULL,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL,
                icon VARCHAR(50) NOT NULL,
                sort_order INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1
            );
            INSERT INTO method_steps (step_number, title, description, icon, sort_order)
            VALUES (1, 'Analyse', 'Nous étudions votre contexte, vos enjeux et le périmètre à couvrir pour définir une mission adaptée.', 'Search', 0);
            INSERT INTO method_steps (step_number, title, description, icon, sort_order)
            VALUES (2, 'Audit', 'Nos consultants réalisent les tests convenus, encadrés par des professionnels du secteur.', 'ShieldCheck', 1);
            INSERT INTO method_steps (step_number, title, description, icon, sort_order)
            VALUES (3, 'Rapport', 'Vous recevez un rapport clair et priorisé, avec des recommandations concrètes.', 'FileText', 2);
            INSERT INTO method_steps (step_number, title, description, icon, sort_order)
            VALUES (4, 'Accompagnement', 'Nous vous aidons à corriger les vulnérabilités et à sensibiliser vos équipes.', 'Users', 3);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS method_steps (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                step_number INT NOT NULL,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL,
                icon VARCHAR(50) NOT NULL,
                sort_order INT NOT NULL DEFAULT 0,
                active BOOLEAN NOT NULL DEFAULT TRUE
            );
            INSERT INTO method_steps (step_number, title, description, icon, sort_order)
            VALUES (1, 'Analyse', 'Nous étudions votre contexte, vos enjeux et le périmètre à couvrir pour définir une mission adaptée.', 'Search', 0);
            INSERT INTO method_steps (step_number, title, description, icon, sort_order)
            VALUES (2, 'Audit', 'Nos consultants réalisent les tests convenus, encadrés par des professionnels du secteur.', 'ShieldCheck', 1);
            INSERT INTO method_steps (step_number, title, description, icon, sort_order)
            VALUES (3, 'Rapport', 'Vous recevez un rapport clair et priorisé, avec des recommandations concrètes.', 'FileText', 2);
            INSERT INTO method_steps (step_number, title, description, icon, sort_order)
            VALUES (4, 'Accompagnement', 'Nous vous aidons à corriger les vulnérabilités et à sensibiliser vos équipes.', 'Users', 3);
        "#,
    },
    // `read` is reserved in MySQL, hence is_read
    Migration {
        version: 10,
        name: "create_contacts",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company VARCHAR(100),
                name VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL,
                phone VARCHAR(30),
                subject VARCHAR(200) NOT NULL,
                message TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_contacts_created_at ON contacts(created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                company VARCHAR(100) NULL,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL,
                phone VARCHAR(30) NULL,
                subject VARCHAR(200) NOT NULL,
                message TEXT NOT NULL,
                is_read BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_contacts_created_at ON contacts(created_at);
        "#,
    },
];

/// Run all pending migrations
///
/// This function:
/// 1. Creates the migrations tracking table if it doesn't exist
/// 2. Checks which migrations have already been applied
/// 3. Runs any pending migrations in order
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => get_applied_migrations_sqlite(pool.as_sqlite().unwrap()).await,
        DatabaseDriver::Mysql => get_applied_migrations_mysql(pool.as_mysql().unwrap()).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        });
    }

    Ok(records)
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    let mut records = Vec::new();
    for row in rows {
        let version: i32 = row.get("version");
        records.push(MigrationRecord {
            version: version as i64,
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        });
    }

    Ok(records)
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => {
            apply_migration_sqlite(pool.as_sqlite().unwrap(), migration).await
        }
        DatabaseDriver::Mysql => apply_migration_mysql(pool.as_mysql().unwrap(), migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only chunks
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}
