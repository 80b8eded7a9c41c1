//! SQLite-backed key-value store.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use crate::infrastructure::ports::{ClockPort, KvStore, RepoError};

/// SQLite implementation of the durable key-value store.
pub struct SqliteKvStore {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteKvStore {
    pub async fn new(db_path: &str, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| RepoError::database("kv_store", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("kv_store", e))?;

        Ok(Self { pool, clock })
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, RepoError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("kv_get", e))?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RepoError> {
        let now = self.clock.now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("kv_set", e))?;

        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("kv_del", e))?;
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, RepoError> {
        // substr() instead of LIKE so `_` and `%` in the prefix match literally.
        let rows = sqlx::query(
            "SELECT key FROM kv_store WHERE substr(key, 1, ?) = ? ORDER BY key",
        )
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("kv_keys", e))?;

        Ok(rows.into_iter().map(|row| row.get("key")).collect())
    }
}
