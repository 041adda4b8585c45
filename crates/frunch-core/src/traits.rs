//! Collaborator traits for frunch-room.
//!
//! The engine in `frunch-jobs` only talks to these interfaces; `frunch-db`
//! and `frunch-remote` provide the production implementations and
//! [`crate::mock`] provides in-memory ones for tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::models::*;

/// Binary content of a remote file, streamed in chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

// =============================================================================
// FILE SOURCE
// =============================================================================

/// Remote file store: paginated listing, change feed, and content download.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Fetch one page of the full file listing.
    async fn list_page(&self, page_token: Option<&str>, page_size: u32) -> Result<FileListPage>;

    /// Fetch one page of the change feed starting at `cursor`, including removals.
    async fn changes_page(&self, cursor: &str, page_size: u32) -> Result<ChangePage>;

    /// Cursor marking "now" in the change feed.
    async fn start_cursor(&self) -> Result<String>;

    /// Stream the binary content of a file.
    async fn download_content(&self, id: &str) -> Result<ByteStream>;
}

// =============================================================================
// STORES
// =============================================================================

/// Durable picture catalog keyed by remote file id.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Insert the record unless its id already exists. Returns `true` if inserted.
    ///
    /// Existing rows are never overwritten: first write wins.
    async fn insert_if_absent(&self, record: &PictureRecord) -> Result<bool>;

    /// Delete by id. Returns `true` if a row was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Fetch a record by id.
    async fn get(&self, id: &str) -> Result<Option<PictureRecord>>;

    /// Any one record whose location still holds a pending-geocode marker.
    async fn find_pending_geocode(&self) -> Result<Option<PictureRecord>>;

    /// Replace the location value (resolved place or `None`).
    async fn update_location(&self, id: &str, location: Option<&str>) -> Result<()>;

    /// The `limit` most-recently-added records, minus any id in `exclude`.
    ///
    /// The window is taken first and the exclusion applied afterwards, so the
    /// result may hold fewer than `limit` records.
    async fn query_recent(&self, limit: i64, exclude: &[String]) -> Result<Vec<PictureRecord>>;

    /// One random record older than the `offset` most-recently-added, minus
    /// any id in `exclude`.
    async fn random_older_than(
        &self,
        offset: i64,
        exclude: &[String],
    ) -> Result<Option<PictureRecord>>;

    /// Number of records in the catalog.
    async fn count(&self) -> Result<i64>;
}

/// Durable single-value-per-key storage.
#[async_trait]
pub trait KeyValueRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

// =============================================================================
// GEOCODING
// =============================================================================

/// Reverse geocoding service.
#[async_trait]
pub trait GeocodeClient: Send + Sync {
    /// Resolve coordinates to address parts.
    ///
    /// `Ok(None)` means the service answered but had no usable address (or
    /// the answer was malformed). `Err` means the request itself failed.
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<Option<Address>>;
}

// =============================================================================
// DISPLAY
// =============================================================================

/// Fan-out of the current picture to connected viewers.
pub trait PictureSink: Send + Sync {
    fn publish(&self, picture: &DisplayPicture);
}

/// Resolves a record to a locally served image path, fetching it if needed.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Public URL path (e.g. `/images/<id>.jpg`) of the cached file.
    async fn resolve(&self, record: &PictureRecord) -> Result<String>;
}
