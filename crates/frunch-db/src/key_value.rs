//! Key-value repository implementation.

use async_trait::async_trait;
use sqlx::SqlitePool;

use frunch_core::{Error, KeyValueRepository, Result};

/// SQLite implementation of KeyValueRepository.
#[derive(Clone)]
pub struct SqliteKeyValueRepository {
    pool: SqlitePool,
}

impl SqliteKeyValueRepository {
    /// Create a new SqliteKeyValueRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueRepository for SqliteKeyValueRepository {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT value FROM key_value WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(value.flatten())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO key_value (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}
