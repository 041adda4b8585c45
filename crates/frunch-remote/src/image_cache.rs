//! Local image cache.
//!
//! Pictures are served from `<dir>/<id>.<ext>`. A file missing from the
//! cache is downloaded from the file source on first use. Downloads land in a
//! `.part` file that is renamed into place only once complete, so a reader
//! never sees a truncated image. Concurrent requests for the same picture
//! share one download.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use frunch_core::defaults::{DEFAULT_IMAGE_EXTENSION, IMAGE_URL_PREFIX};
use frunch_core::{FileSource, ImageResolver, PictureRecord, Result};

/// Resolves pictures to cached files, fetching them from a [`FileSource`].
pub struct ImageCache {
    dir: PathBuf,
    url_prefix: String,
    source: Arc<dyn FileSource>,
    in_flight: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ImageCache {
    pub fn new(dir: impl Into<PathBuf>, source: Arc<dyn FileSource>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: IMAGE_URL_PREFIX.to_string(),
            source,
            in_flight: StdMutex::new(HashMap::new()),
        }
    }

    /// Public URL prefix the cache directory is mounted under.
    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(record: &PictureRecord) -> String {
        let ext = record
            .extension
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_IMAGE_EXTENSION);
        format!("{}.{}", record.id, ext)
    }

    /// Per-file download lock, shared by every caller resolving the same name.
    fn download_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(in_flight.entry(name.to_string()).or_default())
    }

    fn release_lock(&self, name: &str, lock: Arc<Mutex<()>>) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        drop(lock);
        // Only the map still holds it: nobody is waiting.
        if in_flight.get(name).is_some_and(|l| Arc::strong_count(l) == 1) {
            in_flight.remove(name);
        }
    }

    /// Download unless another caller finished the same file while we waited.
    async fn fetch_once(&self, record: &PictureRecord, name: &str, target: &Path) -> Result<()> {
        let lock = self.download_lock(name);
        let result = {
            let _guard = lock.lock().await;
            if fs::try_exists(target).await? {
                debug!(picture_id = %record.id, "Image cached by a concurrent download");
                Ok(())
            } else {
                self.download(record, target).await
            }
        };
        self.release_lock(name, lock);
        result
    }

    async fn download(&self, record: &PictureRecord, target: &Path) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let mut partial = target.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        let result = self.write_stream(&record.id, &partial).await;
        if let Err(e) = result {
            warn!(picture_id = %record.id, error = %e, "Image download failed");
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&partial, target).await {
            let _ = fs::remove_file(&partial).await;
            if fs::try_exists(target).await.unwrap_or(false) {
                debug!(picture_id = %record.id, "Image already in place");
                return Ok(());
            }
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_stream(&self, id: &str, partial: &Path) -> Result<()> {
        let mut stream = self.source.download_content(id).await?;
        let mut file = fs::File::create(partial).await?;
        let mut size = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            size += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.sync_all().await?;
        info!(picture_id = %id, size, "Image cached");
        Ok(())
    }
}

#[async_trait]
impl ImageResolver for ImageCache {
    async fn resolve(&self, record: &PictureRecord) -> Result<String> {
        let name = Self::file_name(record);
        let target = self.dir.join(&name);

        if fs::try_exists(&target).await? {
            debug!(picture_id = %record.id, "Image cache hit");
        } else {
            self.fetch_once(record, &name, &target).await?;
        }

        Ok(format!("{}/{}", self.url_prefix, name))
    }
}
