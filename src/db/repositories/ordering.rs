//! Shared helpers for tables carrying a `sort_order` column.
//!
//! Table names are always compile-time constants, never user input.

use anyhow::{Context, Result};
use sqlx::{MySqlPool, Row, SqlitePool};

/// Sort order that places a new row after every existing one
pub(crate) async fn next_sort_order_sqlite(pool: &SqlitePool, table: &'static str) -> Result<i32> {
    let sql = format!(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 AS next_order FROM {}",
        table
    );
    let row = sqlx::query(&sql)
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to compute next sort order for {}", table))?;
    let next: i64 = row.get("next_order");
    Ok(next as i32)
}

/// Assign each id its position in `ids` as sort order, in one transaction
pub(crate) async fn reorder_sqlite(pool: &SqlitePool, table: &'static str, ids: &[i64]) -> Result<()> {
    let sql = format!("UPDATE {} SET sort_order = ? WHERE id = ?", table);
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    for (index, id) in ids.iter().enumerate() {
        sqlx::query(&sql)
            .bind(index as i32)
            .bind(*id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to reorder {}", table))?;
    }

    tx.commit().await.context("Failed to commit reorder")?;
    Ok(())
}

pub(crate) async fn next_sort_order_mysql(pool: &MySqlPool, table: &'static str) -> Result<i32> {
    let sql = format!(
        "SELECT CAST(COALESCE(MAX(sort_order), -1) + 1 AS SIGNED) AS next_order FROM {}",
        table
    );
    let row = sqlx::query(&sql)
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to compute next sort order for {}", table))?;
    let next: i64 = row.get("next_order");
    Ok(next as i32)
}

pub(crate) async fn reorder_mysql(pool: &MySqlPool, table: &'static str, ids: &[i64]) -> Result<()> {
    let sql = format!("UPDATE {} SET sort_order = ? WHERE id = ?", table);
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    for (index, id) in ids.iter().enumerate() {
        sqlx::query(&sql)
            .bind(index as i32)
            .bind(*id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to reorder {}", table))?;
    }

    tx.commit().await.context("Failed to commit reorder")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_next_sort_order_and_reorder() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite_pool = pool.as_sqlite().unwrap();

        // Seeded categories occupy 0..=4
        let next = next_sort_order_sqlite(sqlite_pool, "article_categories")
            .await
            .expect("Failed to compute next order");
        assert_eq!(next, 5);

        // Empty table starts at 0
        let next = next_sort_order_sqlite(sqlite_pool, "services")
            .await
            .expect("Failed to compute next order");
        assert_eq!(next, 0);

        let rows = sqlx::query("SELECT id FROM article_categories ORDER BY sort_order")
            .fetch_all(sqlite_pool)
            .await
            .unwrap();
        let mut ids: Vec<i64> = rows.iter().map(|r| r.get("id")).collect();
        ids.reverse();

        reorder_sqlite(sqlite_pool, "article_categories", &ids)
            .await
            .expect("Failed to reorder");

        let first = sqlx::query("SELECT id FROM article_categories ORDER BY sort_order LIMIT 1")
            .fetch_one(sqlite_pool)
            .await
            .unwrap();
        let first_id: i64 = first.get("id");
        assert_eq!(first_id, ids[0]);
    }
}
