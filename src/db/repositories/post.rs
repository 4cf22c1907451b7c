//! Post repository
//!
//! Database operations for journal posts.
//!
//! Tags are persisted as a JSON array in the `tags` column and the category
//! as its slug, so a post is always a single row.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Difficulty, Post};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post, returning it with its new ID
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Persist every editable field of an existing post
    async fn update(&self, post: &Post) -> Result<Post>;

    /// Delete a post
    async fn delete(&self, id: i64) -> Result<()>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get post by slug, published or not
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// All posts, newest first
    async fn list_all(&self) -> Result<Vec<Post>>;

    /// The `limit` most recently created posts
    async fn list_recent(&self, limit: i64) -> Result<Vec<Post>>;

    /// Published posts, featured first then most recently published.
    /// `category` restricts to one category slug.
    async fn list_published(&self, category: Option<&str>) -> Result<Vec<Post>>;

    /// The `limit` most recently published posts
    async fn latest_published(&self, limit: i64) -> Result<Vec<Post>>;

    /// Set the published flag
    async fn set_published(&self, id: i64, published: bool) -> Result<()>;

    /// Count all posts
    async fn count(&self) -> Result<i64>;

    /// Count published posts
    async fn count_published(&self) -> Result<i64>;

    /// Count posts filed under a category slug
    async fn count_by_category(&self, category: &str) -> Result<i64>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }

    async fn count_where(&self, clause: &str, bind: Option<&str>) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) AS count FROM posts {}", clause);
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(&sql);
                if let Some(value) = bind {
                    query = query.bind(value);
                }
                let row = query
                    .fetch_one(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to count posts")?;
                row.get("count")
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(&sql);
                if let Some(value) = bind {
                    query = query.bind(value);
                }
                let row = query
                    .fetch_one(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to count posts")?;
                row.get("count")
            }
        };
        Ok(count)
    }
}

const POST_COLUMNS: &str = "id, slug, title, excerpt, content, category, tags, reading_time, \
    featured, published, author_id, author_name, published_at, ctf_name, ctf_date, ranking, \
    difficulty, event_date, event_location, event_url, created_at, updated_at";

const ORDER_PUBLISHED: &str = "ORDER BY featured DESC, published_at DESC, id DESC";

fn select_sql(tail: &str) -> String {
    format!("SELECT {} FROM posts {}", POST_COLUMNS, tail)
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => create_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_post_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => update_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM posts WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete post")?;
            }
        }
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = select_sql("WHERE id = ?");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get post by ID")?;
                row.map(|row| row_to_post_sqlite(&row)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get post by ID")?;
                row.map(|row| row_to_post_mysql(&row)).transpose()
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let sql = select_sql("WHERE slug = ?");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get post by slug")?;
                row.map(|row| row_to_post_sqlite(&row)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get post by slug")?;
                row.map(|row| row_to_post_mysql(&row)).transpose()
            }
        }
    }

    async fn list_all(&self) -> Result<Vec<Post>> {
        let sql = select_sql("ORDER BY created_at DESC, id DESC");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_sqlite(self.pool.as_sqlite().unwrap(), &sql, &[]).await
            }
            DatabaseDriver::Mysql => list_posts_mysql(self.pool.as_mysql().unwrap(), &sql, &[]).await,
        }
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Post>> {
        let sql = select_sql("ORDER BY created_at DESC, id DESC LIMIT ?");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_sqlite(self.pool.as_sqlite().unwrap(), &sql, &[Bind::Int(limit)]).await
            }
            DatabaseDriver::Mysql => {
                list_posts_mysql(self.pool.as_mysql().unwrap(), &sql, &[Bind::Int(limit)]).await
            }
        }
    }

    async fn list_published(&self, category: Option<&str>) -> Result<Vec<Post>> {
        let (sql, binds) = match category {
            Some(category) => (
                select_sql(&format!("WHERE published = ? AND category = ? {}", ORDER_PUBLISHED)),
                vec![Bind::Bool(true), Bind::Text(category.to_string())],
            ),
            None => (
                select_sql(&format!("WHERE published = ? {}", ORDER_PUBLISHED)),
                vec![Bind::Bool(true)],
            ),
        };
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_sqlite(self.pool.as_sqlite().unwrap(), &sql, &binds).await
            }
            DatabaseDriver::Mysql => {
                list_posts_mysql(self.pool.as_mysql().unwrap(), &sql, &binds).await
            }
        }
    }

    async fn latest_published(&self, limit: i64) -> Result<Vec<Post>> {
        let sql = select_sql("WHERE published = ? ORDER BY published_at DESC, id DESC LIMIT ?");
        let binds = [Bind::Bool(true), Bind::Int(limit)];
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_sqlite(self.pool.as_sqlite().unwrap(), &sql, &binds).await
            }
            DatabaseDriver::Mysql => {
                list_posts_mysql(self.pool.as_mysql().unwrap(), &sql, &binds).await
            }
        }
    }

    async fn set_published(&self, id: i64, published: bool) -> Result<()> {
        let sql = "UPDATE posts SET published = ?, updated_at = ? WHERE id = ?";
        let now = chrono::Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(published)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to toggle post publication")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(published)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to toggle post publication")?;
            }
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        self.count_where("", None).await
    }

    async fn count_published(&self) -> Result<i64> {
        // Literal TRUE is understood by both SQLite (3.23+) and MySQL
        self.count_where("WHERE published = TRUE", None).await
    }

    async fn count_by_category(&self, category: &str) -> Result<i64> {
        self.count_where("WHERE category = ?", Some(category)).await
    }
}

/// Positional parameter for the list queries
enum Bind {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn encode_tags(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags).context("Failed to encode post tags")
}

fn decode_tags(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).with_context(|| format!("Invalid tags in database: {}", raw))
}

fn decode_difficulty(raw: Option<String>) -> Result<Option<Difficulty>> {
    raw.filter(|s| !s.is_empty())
        .map(|s| Difficulty::from_str(&s))
        .transpose()
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (slug, title, excerpt, content, category, tags, reading_time,
            featured, published, author_id, author_name, published_at, ctf_name, ctf_date,
            ranking, difficulty, event_date, event_location, event_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.category)
    .bind(encode_tags(&post.tags)?)
    .bind(post.reading_time)
    .bind(post.featured)
    .bind(post.published)
    .bind(post.author_id)
    .bind(&post.author_name)
    .bind(post.published_at)
    .bind(&post.ctf_name)
    .bind(post.ctf_date)
    .bind(&post.ranking)
    .bind(post.difficulty.map(|d| d.to_string()))
    .bind(post.event_date)
    .bind(&post.event_location)
    .bind(&post.event_url)
    .bind(post.created_at)
    .bind(post.updated_at)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        ..post.clone()
    })
}

async fn update_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    sqlx::query(
        r#"
        UPDATE posts SET slug = ?, title = ?, excerpt = ?, content = ?, category = ?, tags = ?,
            reading_time = ?, featured = ?, published = ?, ctf_name = ?, ctf_date = ?,
            ranking = ?, difficulty = ?, event_date = ?, event_location = ?, event_url = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.category)
    .bind(encode_tags(&post.tags)?)
    .bind(post.reading_time)
    .bind(post.featured)
    .bind(post.published)
    .bind(&post.ctf_name)
    .bind(post.ctf_date)
    .bind(&post.ranking)
    .bind(post.difficulty.map(|d| d.to_string()))
    .bind(post.event_date)
    .bind(&post.event_location)
    .bind(&post.event_url)
    .bind(post.updated_at)
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(post.clone())
}

async fn list_posts_sqlite(pool: &SqlitePool, sql: &str, binds: &[Bind]) -> Result<Vec<Post>> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = match bind {
            Bind::Bool(v) => query.bind(*v),
            Bind::Int(v) => query.bind(*v),
            Bind::Text(v) => query.bind(v.as_str()),
        };
    }

    let rows = query.fetch_all(pool).await.context("Failed to list posts")?;
    rows.iter().map(row_to_post_sqlite).collect()
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let tags: String = row.get("tags");
    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        category: row.get("category"),
        tags: decode_tags(&tags)?,
        reading_time: row.get("reading_time"),
        featured: row.get("featured"),
        published: row.get("published"),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        published_at: row.get("published_at"),
        ctf_name: row.get("ctf_name"),
        ctf_date: row.get("ctf_date"),
        ranking: row.get("ranking"),
        difficulty: decode_difficulty(row.get("difficulty"))?,
        event_date: row.get("event_date"),
        event_location: row.get("event_location"),
        event_url: row.get("event_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (slug, title, excerpt, content, category, tags, reading_time,
            featured, published, author_id, author_name, published_at, ctf_name, ctf_date,
            ranking, difficulty, event_date, event_location, event_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.category)
    .bind(encode_tags(&post.tags)?)
    .bind(post.reading_time)
    .bind(post.featured)
    .bind(post.published)
    .bind(post.author_id)
    .bind(&post.author_name)
    .bind(post.published_at)
    .bind(&post.ctf_name)
    .bind(post.ctf_date)
    .bind(&post.ranking)
    .bind(post.difficulty.map(|d| d.to_string()))
    .bind(post.event_date)
    .bind(&post.event_location)
    .bind(&post.event_url)
    .bind(post.created_at)
    .bind(post.updated_at)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        ..post.clone()
    })
}

async fn update_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    sqlx::query(
        r#"
        UPDATE posts SET slug = ?, title = ?, excerpt = ?, content = ?, category = ?, tags = ?,
            reading_time = ?, featured = ?, published = ?, ctf_name = ?, ctf_date = ?,
            ranking = ?, difficulty = ?, event_date = ?, event_location = ?, event_url = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.category)
    .bind(encode_tags(&post.tags)?)
    .bind(post.reading_time)
    .bind(post.featured)
    .bind(post.published)
    .bind(&post.ctf_name)
    .bind(post.ctf_date)
    .bind(&post.ranking)
    .bind(post.difficulty.map(|d| d.to_string()))
    .bind(post.event_date)
    .bind(&post.event_location)
    .bind(&post.event_url)
    .bind(post.updated_at)
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(post.clone())
}

async fn list_posts_mysql(pool: &MySqlPool, sql: &str, binds: &[Bind]) -> Result<Vec<Post>> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = match bind {
            Bind::Bool(v) => query.bind(*v),
            Bind::Int(v) => query.bind(*v),
            Bind::Text(v) => query.bind(v.as_str()),
        };
    }

    let rows = query.fetch_all(pool).await.context("Failed to list posts")?;
    rows.iter().map(row_to_post_mysql).collect()
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    let tags: String = row.get("tags");
    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        category: row.get("category"),
        tags: decode_tags(&tags)?,
        reading_time: row.get("reading_time"),
        featured: row.get("featured"),
        published: row.get("published"),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        published_at: row.get("published_at"),
        ctf_name: row.get("ctf_name"),
        ctf_date: row.get("ctf_date"),
        ranking: row.get("ranking"),
        difficulty: decode_difficulty(row.get("difficulty"))?,
        event_date: row.get("event_date"),
        event_location: row.get("event_location"),
        event_url: row.get("event_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::PostInput;
    use chrono::{Duration, Utc};

    async fn setup_test_repo() -> SqlxPostRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxPostRepository::new(pool)
    }

    fn test_post(slug: &str, category: &str, published: bool, featured: bool) -> Post {
        let input = PostInput {
            slug: slug.to_string(),
            title: format!("Title {}", slug),
            excerpt: "Excerpt".to_string(),
            content: "Content".to_string(),
            category: category.to_string(),
            tags: vec!["web".to_string(), "pwn".to_string()],
            reading_time: 4,
            featured,
            published,
            ctf_name: None,
            ctf_date: None,
            ranking: None,
            difficulty: Some(Difficulty::Medium),
            event_date: None,
            event_location: None,
            event_url: None,
        };
        Post::from_input(input, Some(1), Some("Alice".to_string()))
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let repo = setup_test_repo().await;
        let created = repo
            .create(&test_post("first", "ctf", true, false))
            .await
            .expect("Failed to create post");
        assert!(created.id > 0);

        let found = repo
            .get_by_slug("first")
            .await
            .expect("Failed to get post")
            .expect("Post not found");
        assert_eq!(found.id, created.id);
        assert_eq!(found.tags, vec!["web", "pwn"]);
        assert_eq!(found.difficulty, Some(Difficulty::Medium));
        assert_eq!(found.author_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let repo = setup_test_repo().await;
        repo.create(&test_post("same", "ctf", true, false)).await.unwrap();
        assert!(repo.create(&test_post("same", "event", false, false)).await.is_err());
    }

    #[tokio::test]
    async fn test_update_post() {
        let repo = setup_test_repo().await;
        let mut post = repo.create(&test_post("edit-me", "ctf", false, false)).await.unwrap();

        post.title = "Edited".to_string();
        post.tags = vec![];
        post.difficulty = None;
        repo.update(&post).await.expect("Failed to update post");

        let found = repo.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Edited");
        assert!(found.tags.is_empty());
        assert!(found.difficulty.is_none());
    }

    #[tokio::test]
    async fn test_list_published_ordering_and_filter() {
        let repo = setup_test_repo().await;

        let mut older = test_post("older", "ctf", true, false);
        older.published_at = Utc::now() - Duration::days(2);
        repo.create(&older).await.unwrap();
        repo.create(&test_post("newer", "writeup", true, false)).await.unwrap();
        let mut featured = test_post("featured", "ctf", true, true);
        featured.published_at = Utc::now() - Duration::days(10);
        repo.create(&featured).await.unwrap();
        repo.create(&test_post("draft", "ctf", false, true)).await.unwrap();

        let all = repo.list_published(None).await.unwrap();
        let slugs: Vec<_> = all.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["featured", "newer", "older"]);

        let ctf = repo.list_published(Some("ctf")).await.unwrap();
        let slugs: Vec<_> = ctf.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["featured", "older"]);
    }

    #[tokio::test]
    async fn test_set_published_and_counts() {
        let repo = setup_test_repo().await;
        let post = repo.create(&test_post("p", "ctf", false, false)).await.unwrap();
        repo.create(&test_post("q", "event", true, false)).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.count_published().await.unwrap(), 1);

        repo.set_published(post.id, true).await.unwrap();
        assert_eq!(repo.count_published().await.unwrap(), 2);
        assert_eq!(repo.count_by_category("event").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_latest_and_recent_limits() {
        let repo = setup_test_repo().await;
        for i in 0..5 {
            repo.create(&test_post(&format!("post-{}", i), "ctf", i % 2 == 0, false))
                .await
                .unwrap();
        }

        assert_eq!(repo.latest_published(2).await.unwrap().len(), 2);
        assert_eq!(repo.list_recent(4).await.unwrap().len(), 4);
        assert_eq!(repo.list_all().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_delete_post() {
        let repo = setup_test_repo().await;
        let post = repo.create(&test_post("gone", "ctf", true, false)).await.unwrap();
        repo.delete(post.id).await.unwrap();
        assert!(repo.get_by_id(post.id).await.unwrap().is_none());
    }
}
