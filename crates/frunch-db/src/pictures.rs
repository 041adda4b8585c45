//! Picture catalog repository implementation.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::trace;

use frunch_core::{CatalogRepository, Error, PictureRecord, Result};

const COLUMNS: &str = "id, ext, author, added, taken, location";

/// SQLite implementation of CatalogRepository.
#[derive(Clone)]
pub struct SqlitePictureRepository {
    pool: SqlitePool,
}

impl SqlitePictureRepository {
    /// Create a new SqlitePictureRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_picture_row(row: SqliteRow) -> PictureRecord {
    PictureRecord {
        id: row.get("id"),
        extension: row.get("ext"),
        author: row.get("author"),
        added_at: row.get("added"),
        taken_at: row.get("taken"),
        location: row.get("location"),
    }
}

/// Exclusion lists are bound as one JSON array and expanded with `json_each`.
fn exclusion_json(exclude: &[String]) -> Result<String> {
    Ok(serde_json::to_string(exclude)?)
}

#[async_trait]
impl CatalogRepository for SqlitePictureRepository {
    async fn insert_if_absent(&self, record: &PictureRecord) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO pictures (id, ext, author, added, taken, location)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&record.id)
        .bind(&record.extension)
        .bind(&record.author)
        .bind(record.added_at)
        .bind(record.taken_at)
        .bind(&record.location)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        let inserted = result.rows_affected() == 1;
        trace!(picture_id = %record.id, inserted, "insert_if_absent");
        Ok(inserted)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pictures WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn get(&self, id: &str) -> Result<Option<PictureRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM pictures WHERE id = ?1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(map_picture_row))
    }

    async fn find_pending_geocode(&self) -> Result<Option<PictureRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM pictures WHERE location LIKE '{{%' LIMIT 1",
            COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.map(map_picture_row))
    }

    async fn update_location(&self, id: &str, location: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE pictures SET location = ?1 WHERE id = ?2")
            .bind(location)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn query_recent(&self, limit: i64, exclude: &[String]) -> Result<Vec<PictureRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {cols} FROM (
                SELECT {cols} FROM pictures ORDER BY added DESC, id LIMIT ?1
            )
            WHERE id NOT IN (SELECT value FROM json_each(?2))
            ORDER BY added DESC, id
            "#,
            cols = COLUMNS
        ))
        .bind(limit)
        .bind(exclusion_json(exclude)?)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_picture_row).collect())
    }

    async fn random_older_than(
        &self,
        offset: i64,
        exclude: &[String],
    ) -> Result<Option<PictureRecord>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {cols} FROM (
                SELECT {cols} FROM pictures ORDER BY added DESC, id LIMIT -1 OFFSET ?1
            )
            WHERE id NOT IN (SELECT value FROM json_each(?2))
            ORDER BY RANDOM()
            LIMIT 1
            "#,
            cols = COLUMNS
        ))
        .bind(offset)
        .bind(exclusion_json(exclude)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(map_picture_row))
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM pictures")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }
}
