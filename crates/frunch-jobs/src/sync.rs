//! Catalog synchronization against the remote file source.
//!
//! A pass is either a full listing (no cursor persisted yet) or an
//! incremental walk of the change feed from the persisted cursor. The
//! cursor is written after every fully applied change page, so a pass that
//! dies halfway resumes from the last committed page.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, instrument, trace, warn};

use frunch_core::defaults::{SYNC_CURSOR_KEY, SYNC_INTERVAL_SECS, SYNC_PAGE_SIZE};
use frunch_core::{
    normalize_remote_file, CatalogRepository, FileSource, KeyValueRepository, RemoteChange,
    RemoteFile, Result,
};

use crate::geocode::GeocodeTrigger;
use crate::handle::LoopHandle;

/// Configuration for catalog synchronization.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Delay between two scheduled passes.
    pub interval: Duration,
    /// Page size requested from the file source.
    pub page_size: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(SYNC_INTERVAL_SECS),
            page_size: SYNC_PAGE_SIZE,
        }
    }
}

impl SyncConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `SYNC_INTERVAL_SECS` | `60` | Delay between sync passes |
    /// | `SYNC_PAGE_SIZE` | `100` | Entries requested per page |
    pub fn from_env() -> Self {
        let interval = std::env::var("SYNC_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(SYNC_INTERVAL_SECS);

        let page_size = std::env::var("SYNC_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(SYNC_PAGE_SIZE)
            .max(1);

        Self {
            interval: Duration::from_secs(interval),
            page_size,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// Which protocol a pass ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    #[default]
    FullListing,
    Incremental,
}

/// Summary of one sync pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub mode: SyncMode,
    /// Pages fetched from the source.
    pub pages: usize,
    /// Records newly inserted.
    pub added: usize,
    /// Records deleted.
    pub removed: usize,
    /// Entries ignored: non-images, trashed listings, non-file changes, known ids.
    pub skipped: usize,
    /// Cursor persisted at the end of the pass.
    pub cursor: Option<String>,
    /// Row-level failures. A non-empty list means the pass stopped early.
    pub errors: Vec<String>,
}

impl SyncReport {
    /// Whether every entry of every fetched page was applied.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Keeps the local catalog consistent with the remote file source.
pub struct CatalogSynchronizer {
    source: Arc<dyn FileSource>,
    catalog: Arc<dyn CatalogRepository>,
    state: Arc<dyn KeyValueRepository>,
    geocoder: GeocodeTrigger,
    config: SyncConfig,
}

impl CatalogSynchronizer {
    pub fn new(
        source: Arc<dyn FileSource>,
        catalog: Arc<dyn CatalogRepository>,
        state: Arc<dyn KeyValueRepository>,
        geocoder: GeocodeTrigger,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            catalog,
            state,
            geocoder,
            config,
        }
    }

    /// Run one sync pass.
    ///
    /// Safe to run repeatedly: inserts never overwrite and deletes of
    /// unknown ids are no-ops. A page fetch failure returns `Err`; whatever
    /// cursor was committed before it stays in place.
    #[instrument(skip(self), fields(subsystem = "sync", component = "synchronizer"))]
    pub async fn sync(&self) -> Result<SyncReport> {
        let start = Instant::now();
        let report = match self.state.get(SYNC_CURSOR_KEY).await? {
            None => self.full_listing().await?,
            Some(cursor) => self.incremental(cursor).await?,
        };

        info!(
            mode = ?report.mode,
            page_count = report.pages,
            added = report.added,
            removed = report.removed,
            skipped = report.skipped,
            cursor = report.cursor.as_deref().unwrap_or(""),
            failures = report.errors.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Sync pass complete"
        );
        Ok(report)
    }

    /// Normalize a remote file and insert it unless already known.
    ///
    /// Returns `Ok(false)` for non-images and ids already in the catalog.
    pub async fn add_file(&self, file: &RemoteFile) -> Result<bool> {
        let Some(record) = normalize_remote_file(file, Utc::now().timestamp()) else {
            trace!(picture_id = %file.id, mime_type = ?file.mime_type, "Skipping non-image");
            return Ok(false);
        };

        let inserted = self.catalog.insert_if_absent(&record).await?;
        if self.geocoder.resume() {
            debug!(picture_id = %record.id, "Geocode worker resumed");
        }
        trace!(picture_id = %record.id, inserted, "File applied");
        Ok(inserted)
    }

    #[instrument(skip(self), fields(op = "full_listing"))]
    async fn full_listing(&self) -> Result<SyncReport> {
        let mut report = SyncReport {
            mode: SyncMode::FullListing,
            ..Default::default()
        };
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .source
                .list_page(page_token.as_deref(), self.config.page_size)
                .await?;
            report.pages += 1;

            for file in &page.files {
                if file.trashed {
                    report.skipped += 1;
                    continue;
                }
                let result = self.add_file(file).await.map(Applied::Added);
                self.apply(&mut report, &file.id, result);
            }

            if !report.is_complete() {
                warn!(
                    page_count = report.pages,
                    failures = report.errors.len(),
                    "Full listing stopped on failed entries, cursor not set"
                );
                return Ok(report);
            }

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        let cursor = self.source.start_cursor().await?;
        self.state.set(SYNC_CURSOR_KEY, &cursor).await?;
        report.cursor = Some(cursor);
        Ok(report)
    }

    #[instrument(skip(self), fields(op = "changes"))]
    async fn incremental(&self, cursor: String) -> Result<SyncReport> {
        let mut report = SyncReport {
            mode: SyncMode::Incremental,
            ..Default::default()
        };
        let mut committed = cursor.clone();
        let mut request = cursor;

        loop {
            let page = self
                .source
                .changes_page(&request, self.config.page_size)
                .await?;
            report.pages += 1;

            for change in &page.changes {
                self.apply_change(&mut report, change).await;
            }

            if !report.is_complete() {
                warn!(
                    cursor = %committed,
                    failures = report.errors.len(),
                    "Change page had failed entries, cursor held back"
                );
                break;
            }

            if let Some(resume) = page.resume_cursor() {
                if resume != committed {
                    self.state.set(SYNC_CURSOR_KEY, resume).await?;
                    committed = resume.to_string();
                    debug!(cursor = %committed, "Cursor advanced");
                }
            }

            match page.next_page_token {
                Some(next) if next != request => request = next,
                Some(_) => {
                    warn!(cursor = %request, "Change feed repeated its page token");
                    break;
                }
                None => break,
            }
        }

        report.cursor = Some(committed);
        Ok(report)
    }

    async fn apply_change(&self, report: &mut SyncReport, change: &RemoteChange) {
        if !change.is_file_change() {
            report.skipped += 1;
            return;
        }
        let Some(id) = change.target_id() else {
            report.skipped += 1;
            return;
        };

        if change.is_removal() {
            let result = self.catalog.delete(id).await.map(Applied::Removed);
            self.apply(report, id, result);
        } else if let Some(file) = &change.file {
            let result = self.add_file(file).await.map(Applied::Added);
            self.apply(report, id, result);
        } else {
            report.skipped += 1;
        }
    }

    fn apply(&self, report: &mut SyncReport, id: &str, result: Result<Applied>) {
        match result {
            Ok(Applied::Added(true)) => report.added += 1,
            Ok(Applied::Removed(true)) => {
                trace!(picture_id = %id, "Record removed");
                report.removed += 1;
            }
            Ok(_) => report.skipped += 1,
            Err(e) => {
                warn!(picture_id = %id, error = %e, "Failed to apply entry");
                report.errors.push(format!("{}: {}", id, e));
            }
        }
    }

    /// Start the fixed-interval sync loop. The first pass runs one interval from now.
    pub fn start(self) -> LoopHandle {
        let synchronizer = Arc::new(self);
        LoopHandle::spawn("sync", move |mut shutdown_rx| async move {
            synchronizer.run(&mut shutdown_rx).await;
        })
    }

    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            page_size = self.config.page_size,
            "Sync loop started"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = sleep(self.config.interval) => {}
            }

            tokio::select! {
                _ = shutdown_rx.recv() => break,
                result = self.sync() => {
                    if let Err(e) = result {
                        warn!(error = %e, transient = e.is_transient(), "Sync pass failed");
                    }
                }
            }
        }

        info!("Sync loop stopped");
    }
}

enum Applied {
    Added(bool),
    Removed(bool),
}
