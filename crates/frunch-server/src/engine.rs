//! Startup wiring for the background loops.

use std::sync::Arc;

use tracing::{info, warn};

use frunch_core::defaults::IMAGE_URL_PREFIX;
use frunch_core::{FileSource, GeocodeClient, PictureBus, Result};
use frunch_db::Database;
use frunch_jobs::{
    start_rotation, CatalogSynchronizer, GeocodeWorker, LoopHandle, PictureScheduler,
};
use frunch_remote::ImageCache;

use crate::config::AppConfig;
use crate::routes::AppState;

/// The running sync, geocode, and rotation loops.
pub struct Engine {
    state: AppState,
    handles: Vec<LoopHandle>,
}

impl Engine {
    /// Run one sync pass, then start every loop.
    ///
    /// A failed initial sync is logged and startup continues; the sync loop
    /// retries on its next tick.
    pub async fn start(
        config: &AppConfig,
        db: &Database,
        source: Arc<dyn FileSource>,
        geocoder: Arc<dyn GeocodeClient>,
    ) -> Result<Self> {
        let worker = GeocodeWorker::new(db.catalog(), geocoder, config.geocode.clone());
        let trigger = worker.trigger();

        let synchronizer = CatalogSynchronizer::new(
            Arc::clone(&source),
            db.catalog(),
            db.key_values(),
            trigger.clone(),
            config.sync.clone(),
        );
        if let Err(e) = synchronizer.sync().await {
            warn!(error = %e, "Initial sync failed, continuing with the stored catalog");
        }

        let bus = PictureBus::default();
        let resolver = ImageCache::new(&config.image_cache_dir, source)
            .with_url_prefix(IMAGE_URL_PREFIX);
        let scheduler = Arc::new(PictureScheduler::new(
            db.catalog(),
            Arc::new(resolver),
            Arc::new(bus.clone()),
            trigger.clone(),
            config.rotation.clone(),
        )?);

        let mut handles = vec![synchronizer.start(), worker.start()];
        // Drain anything a previous run left pending.
        trigger.resume();
        handles.push(start_rotation(Arc::clone(&scheduler)));

        info!(loops = handles.len(), "Engine started");
        Ok(Self {
            state: AppState::new(scheduler, bus),
            handles,
        })
    }

    /// State for the HTTP router.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Signal every loop and wait for each to exit.
    pub async fn stop(self) {
        for handle in self.handles {
            let name = handle.name();
            if let Err(e) = handle.stop().await {
                warn!(loop_name = name, error = %e, "Loop did not stop cleanly");
            }
        }
        info!("Engine stopped");
    }
}
