//! Schema bootstrap.
//!
//! Tables are created idempotently at startup; there is no migration history.

use sqlx::SqlitePool;
use tracing::info;

use frunch_core::{Error, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pictures (
  id TEXT PRIMARY KEY,
  ext TEXT NULL,
  author TEXT NULL,
  added INTEGER NOT NULL,
  taken INTEGER NULL,
  location TEXT NULL
);
CREATE INDEX IF NOT EXISTS pictures_added_idx ON pictures(added DESC);

CREATE TABLE IF NOT EXISTS key_value (
  key TEXT PRIMARY KEY,
  value TEXT NULL
);
"#;

/// Create all tables and indexes if they do not exist yet.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA)
        .execute(pool)
        .await
        .map_err(Error::Database)?;
    info!(subsystem = "db", op = "ensure_schema", "Database schema ready");
    Ok(())
}
