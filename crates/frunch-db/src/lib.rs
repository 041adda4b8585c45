//! # frunch-db
//!
//! SQLite database layer for frunch-room.
//!
//! This crate provides:
//! - Connection pool management
//! - Idempotent schema bootstrap
//! - The picture catalog (insert-if-absent, weighted-selection queries)
//! - The key-value store holding the sync cursor
//!
//! ## Example
//!
//! ```rust,ignore
//! use frunch_db::{Database, CatalogRepository};
//!
//! let db = Database::connect("sqlite://frunch-room.sqlite").await?;
//! db.migrate().await?;
//! let total = db.pictures.count().await?;
//! ```

pub mod key_value;
pub mod pictures;
pub mod pool;
pub mod schema;

use std::sync::Arc;

use sqlx::SqlitePool;

// Re-export core types
pub use frunch_core::*;

pub use key_value::SqliteKeyValueRepository;
pub use pictures::SqlitePictureRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use schema::ensure_schema;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: SqlitePool,
    /// Picture catalog.
    pub pictures: SqlitePictureRepository,
    /// Key-value store (sync cursor).
    pub key_value: SqliteKeyValueRepository,
}

impl Database {
    /// Create a new database context from a connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pictures: SqlitePictureRepository::new(pool.clone()),
            key_value: SqliteKeyValueRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the database with default pool settings.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Fresh private in-memory database with the schema applied.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = create_pool_with_config("sqlite::memory:", PoolConfig::in_memory()).await?;
        let db = Self::new(pool);
        db.migrate().await?;
        Ok(db)
    }

    /// Create tables if they do not exist.
    pub async fn migrate(&self) -> Result<()> {
        ensure_schema(&self.pool).await
    }

    /// The catalog as a shareable trait object.
    pub fn catalog(&self) -> Arc<dyn CatalogRepository> {
        Arc::new(self.pictures.clone())
    }

    /// The key-value store as a shareable trait object.
    pub fn key_values(&self) -> Arc<dyn KeyValueRepository> {
        Arc::new(self.key_value.clone())
    }
}
