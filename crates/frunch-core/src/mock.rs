//! In-memory collaborators for deterministic testing.
//!
//! Enabled with the `mock` feature. Every mock records what it was asked to do
//! so tests can assert on call counts and ordering.
//!
//! ```rust,ignore
//! use frunch_core::mock::{MemoryCatalog, ScriptedFileSource};
//!
//! let source = ScriptedFileSource::new()
//!     .with_listing(vec![vec![image("a"), image("b")]])
//!     .with_start_cursor("c-1");
//! let catalog = MemoryCatalog::new();
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use crate::error::{Error, Result};
use crate::models::*;
use crate::traits::*;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// CATALOG
// =============================================================================

/// In-memory catalog with insert-if-absent semantics.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    rows: Arc<Mutex<Vec<PictureRecord>>>,
    failing_ids: Arc<Mutex<HashSet<String>>>,
    location_updates: Arc<Mutex<Vec<(String, Option<String>)>>>,
    delay: Option<Duration>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the catalog with records.
    pub fn with_records(self, records: impl IntoIterator<Item = PictureRecord>) -> Self {
        lock(&self.rows).extend(records);
        self
    }

    /// Make every write for `id` fail with a database-style error.
    pub fn fail_writes_for(self, id: impl Into<String>) -> Self {
        lock(&self.failing_ids).insert(id.into());
        self
    }

    /// Delay every query, simulating a slow store.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Snapshot of all rows, in insertion order.
    pub fn records(&self) -> Vec<PictureRecord> {
        lock(&self.rows).clone()
    }

    /// Every `update_location` call so far.
    pub fn location_updates(&self) -> Vec<(String, Option<String>)> {
        lock(&self.location_updates).clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_writable(&self, id: &str) -> Result<()> {
        if lock(&self.failing_ids).contains(id) {
            return Err(Error::Internal(format!("injected write failure for {}", id)));
        }
        Ok(())
    }

    fn newest_first(&self) -> Vec<PictureRecord> {
        let mut rows = lock(&self.rows).clone();
        rows.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        rows
    }
}

#[async_trait]
impl CatalogRepository for MemoryCatalog {
    async fn insert_if_absent(&self, record: &PictureRecord) -> Result<bool> {
        self.pause().await;
        self.check_writable(&record.id)?;
        let mut rows = lock(&self.rows);
        if rows.iter().any(|r| r.id == record.id) {
            return Ok(false);
        }
        rows.push(record.clone());
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.pause().await;
        self.check_writable(id)?;
        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|r| r.id != id);
        Ok(rows.len() != before)
    }

    async fn get(&self, id: &str) -> Result<Option<PictureRecord>> {
        self.pause().await;
        Ok(lock(&self.rows).iter().find(|r| r.id == id).cloned())
    }

    async fn find_pending_geocode(&self) -> Result<Option<PictureRecord>> {
        self.pause().await;
        Ok(lock(&self.rows)
            .iter()
            .find(|r| r.has_pending_geocode())
            .cloned())
    }

    async fn update_location(&self, id: &str, location: Option<&str>) -> Result<()> {
        self.pause().await;
        self.check_writable(id)?;
        lock(&self.location_updates).push((id.to_string(), location.map(String::from)));
        if let Some(row) = lock(&self.rows).iter_mut().find(|r| r.id == id) {
            row.location = location.map(String::from);
        }
        Ok(())
    }

    async fn query_recent(&self, limit: i64, exclude: &[String]) -> Result<Vec<PictureRecord>> {
        self.pause().await;
        Ok(self
            .newest_first()
            .into_iter()
            .take(limit.max(0) as usize)
            .filter(|r| !exclude.contains(&r.id))
            .collect())
    }

    async fn random_older_than(
        &self,
        offset: i64,
        exclude: &[String],
    ) -> Result<Option<PictureRecord>> {
        use rand::seq::SliceRandom;

        self.pause().await;
        let older: Vec<PictureRecord> = self
            .newest_first()
            .into_iter()
            .skip(offset.max(0) as usize)
            .filter(|r| !exclude.contains(&r.id))
            .collect();
        let picked = {
            let mut rng = rand::thread_rng();
            older.choose(&mut rng).cloned()
        };
        Ok(picked)
    }

    async fn count(&self) -> Result<i64> {
        Ok(lock(&self.rows).len() as i64)
    }
}

// =============================================================================
// KEY-VALUE
// =============================================================================

/// In-memory key-value store that keeps a history of writes.
#[derive(Clone, Default)]
pub struct MemoryKeyValue {
    values: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<Mutex<Vec<(String, String)>>>,
}

impl MemoryKeyValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: &str, value: &str) -> Self {
        lock(&self.values).insert(key.to_string(), value.to_string());
        self
    }

    /// Every `set` call so far, in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        lock(&self.writes).clone()
    }
}

#[async_trait]
impl KeyValueRepository for MemoryKeyValue {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.values).get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.writes).push((key.to_string(), value.to_string()));
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// FILE SOURCE
// =============================================================================

/// File source that replays scripted listing and change pages.
///
/// Listing pages are chained with generated tokens (`list-1`, `list-2`, ...).
/// Change pages are looked up by the cursor they were requested with.
#[derive(Clone, Default)]
pub struct ScriptedFileSource {
    listing: Arc<Mutex<Vec<Vec<RemoteFile>>>>,
    changes: Arc<Mutex<HashMap<String, ChangePage>>>,
    failing_cursors: Arc<Mutex<HashSet<String>>>,
    start_cursor: Arc<Mutex<Option<String>>>,
    contents: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    requested_cursors: Arc<Mutex<Vec<String>>>,
    list_calls: Arc<Mutex<usize>>,
}

impl ScriptedFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full-listing pages, in order.
    pub fn with_listing(self, pages: Vec<Vec<RemoteFile>>) -> Self {
        *lock(&self.listing) = pages;
        self
    }

    /// The page returned when the change feed is read at `cursor`.
    pub fn with_changes(self, cursor: &str, page: ChangePage) -> Self {
        lock(&self.changes).insert(cursor.to_string(), page);
        self
    }

    /// Make the change feed fail when read at `cursor`.
    pub fn fail_changes_at(self, cursor: &str) -> Self {
        lock(&self.failing_cursors).insert(cursor.to_string());
        self
    }

    pub fn with_start_cursor(self, cursor: &str) -> Self {
        *lock(&self.start_cursor) = Some(cursor.to_string());
        self
    }

    pub fn with_content(self, id: &str, bytes: &[u8]) -> Self {
        lock(&self.contents).insert(id.to_string(), bytes.to_vec());
        self
    }

    /// Cursors the change feed was read at, in order.
    pub fn requested_cursors(&self) -> Vec<String> {
        lock(&self.requested_cursors).clone()
    }

    /// Number of listing pages requested.
    pub fn list_calls(&self) -> usize {
        *lock(&self.list_calls)
    }
}

#[async_trait]
impl FileSource for ScriptedFileSource {
    async fn list_page(&self, page_token: Option<&str>, _page_size: u32) -> Result<FileListPage> {
        *lock(&self.list_calls) += 1;
        let index = match page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("list-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| Error::Request(format!("unknown page token {}", token)))?,
        };
        let listing = lock(&self.listing);
        let files = listing.get(index).cloned().unwrap_or_default();
        let next_page_token = (index + 1 < listing.len()).then(|| format!("list-{}", index + 1));
        Ok(FileListPage {
            files,
            next_page_token,
        })
    }

    async fn changes_page(&self, cursor: &str, _page_size: u32) -> Result<ChangePage> {
        lock(&self.requested_cursors).push(cursor.to_string());
        if lock(&self.failing_cursors).contains(cursor) {
            return Err(Error::Request(format!("change feed unavailable at {}", cursor)));
        }
        Ok(lock(&self.changes)
            .get(cursor)
            .cloned()
            .unwrap_or_else(|| ChangePage {
                new_start_page_token: Some(cursor.to_string()),
                ..Default::default()
            }))
    }

    async fn start_cursor(&self) -> Result<String> {
        lock(&self.start_cursor)
            .clone()
            .ok_or_else(|| Error::Request("no start cursor scripted".to_string()))
    }

    async fn download_content(&self, id: &str) -> Result<ByteStream> {
        let bytes = lock(&self.contents)
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("file {}", id)))?;
        let chunks: Vec<Result<Bytes>> = bytes
            .chunks(4)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

// =============================================================================
// GEOCODER
// =============================================================================

/// Scripted outcome for one geocode request.
#[derive(Debug, Clone)]
pub enum GeocodeOutcome {
    Found(Address),
    NoData,
    RequestFailed,
}

/// Geocoder that replays scripted outcomes, then repeats a default.
#[derive(Clone)]
pub struct ScriptedGeocoder {
    queue: Arc<Mutex<VecDeque<GeocodeOutcome>>>,
    fallback: GeocodeOutcome,
    calls: Arc<Mutex<Vec<GeoPoint>>>,
}

impl ScriptedGeocoder {
    /// Answer every request with `fallback` once the script runs out.
    pub fn new(fallback: GeocodeOutcome) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn then(self, outcome: GeocodeOutcome) -> Self {
        lock(&self.queue).push_back(outcome);
        self
    }

    /// Points requested so far.
    pub fn calls(&self) -> Vec<GeoPoint> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl GeocodeClient for ScriptedGeocoder {
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<Option<Address>> {
        lock(&self.calls).push(point);
        let outcome = lock(&self.queue)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match outcome {
            GeocodeOutcome::Found(address) => Ok(Some(address)),
            GeocodeOutcome::NoData => Ok(None),
            GeocodeOutcome::RequestFailed => Err(Error::Geocode("scripted failure".to_string())),
        }
    }
}

// =============================================================================
// DISPLAY
// =============================================================================

/// Sink that remembers every published picture.
#[derive(Clone, Default)]
pub struct RecordingSink {
    published: Arc<Mutex<Vec<DisplayPicture>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<DisplayPicture> {
        lock(&self.published).clone()
    }
}

impl PictureSink for RecordingSink {
    fn publish(&self, picture: &DisplayPicture) {
        lock(&self.published).push(picture.clone());
    }
}

/// Resolver that maps ids to `/images/<id>.<ext>` without touching disk.
#[derive(Clone, Default)]
pub struct StaticImageResolver {
    delay: Option<Duration>,
    failing: bool,
}

impl StaticImageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every resolution, simulating a slow download.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every resolution as a broken download would.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

#[async_trait]
impl ImageResolver for StaticImageResolver {
    async fn resolve(&self, record: &PictureRecord) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(Error::Request(format!("download of {} failed", record.id)));
        }
        let ext = record
            .extension
            .as_deref()
            .unwrap_or(crate::defaults::DEFAULT_IMAGE_EXTENSION);
        Ok(format!("/images/{}.{}", record.id, ext))
    }
}
