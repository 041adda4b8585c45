//! Rate-limited reverse geocoding of pending picture locations.
//!
//! The worker is one long-lived task. It sleeps until [`GeocodeTrigger::resume`]
//! is called, then resolves pending markers one at a time, waiting
//! `interval` between outbound requests, until none are left.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::time::sleep;
use tracing::{debug, info, instrument, trace, warn};

use frunch_core::defaults::{
    GEOCODE_FAILURE_BACKOFF_SECS, GEOCODE_HOME_COUNTRY, GEOCODE_INTERVAL_MS,
};
use frunch_core::{CatalogRepository, GeocodeClient, Result};

use crate::handle::LoopHandle;

/// Configuration for the geocode worker.
#[derive(Debug, Clone)]
pub struct GeocodeConfig {
    /// Delay between two outbound requests.
    pub interval: Duration,
    /// Delay before retrying after a failed request.
    pub failure_backoff: Duration,
    /// Country code for which places read "city, region".
    pub home_country: String,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(GEOCODE_INTERVAL_MS),
            failure_backoff: Duration::from_secs(GEOCODE_FAILURE_BACKOFF_SECS),
            home_country: GEOCODE_HOME_COUNTRY.to_string(),
        }
    }
}

impl GeocodeConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `GEOCODE_INTERVAL_MS` | `1100` | Delay between requests |
    /// | `GEOCODE_FAILURE_BACKOFF_SECS` | `60` | Retry delay after a failed request |
    /// | `GEOCODE_HOME_COUNTRY` | `us` | Country shown as "city, region" |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let interval = std::env::var("GEOCODE_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.interval);

        let failure_backoff = std::env::var("GEOCODE_FAILURE_BACKOFF_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.failure_backoff);

        let home_country = std::env::var("GEOCODE_HOME_COUNTRY")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.home_country);

        Self {
            interval,
            failure_backoff,
            home_country,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    pub fn with_home_country(mut self, country: impl Into<String>) -> Self {
        self.home_country = country.into();
        self
    }
}

const IDLE: u8 = 0;
const ACTIVE: u8 = 1;

struct TriggerState {
    state: AtomicU8,
    wake: Notify,
}

/// Cloneable handle used to nudge the geocode worker.
///
/// Triggers coalesce: any number of `resume` calls while the worker is
/// draining result in at most one extra pass.
#[derive(Clone)]
pub struct GeocodeTrigger {
    inner: Arc<TriggerState>,
}

impl Default for GeocodeTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl GeocodeTrigger {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TriggerState {
                state: AtomicU8::new(IDLE),
                wake: Notify::new(),
            }),
        }
    }

    /// Ask the worker to run. Returns `true` if this call activated an idle worker.
    ///
    /// The wake-up is always registered, so a trigger that lands while the
    /// worker is finishing its last pass is not lost.
    pub fn resume(&self) -> bool {
        let activated = self
            .inner
            .state
            .compare_exchange(IDLE, ACTIVE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.inner.wake.notify_one();
        activated
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == ACTIVE
    }

    fn set_active(&self) {
        self.inner.state.store(ACTIVE, Ordering::Release);
    }

    fn set_idle(&self) {
        self.inner.state.store(IDLE, Ordering::Release);
    }

    async fn woken(&self) {
        self.inner.wake.notified().await;
    }
}

/// Result of one resolve attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub picture_id: String,
    /// Place written back, or `None` when the service had no usable address.
    pub location: Option<String>,
}

/// Singleton worker resolving pending-geocode markers.
pub struct GeocodeWorker {
    catalog: Arc<dyn CatalogRepository>,
    client: Arc<dyn GeocodeClient>,
    trigger: GeocodeTrigger,
    config: GeocodeConfig,
}

impl GeocodeWorker {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        client: Arc<dyn GeocodeClient>,
        config: GeocodeConfig,
    ) -> Self {
        Self {
            catalog,
            client,
            trigger: GeocodeTrigger::new(),
            config,
        }
    }

    /// Trigger to hand to the synchronizer and the scheduler.
    pub fn trigger(&self) -> GeocodeTrigger {
        self.trigger.clone()
    }

    /// Resolve one pending record, if any.
    ///
    /// Writes the place (or `None`) back in a single update, which always
    /// clears the marker. A request failure returns `Err` and leaves the
    /// marker in place.
    #[instrument(skip(self), fields(subsystem = "geocode", component = "worker", op = "resolve"))]
    pub async fn resolve_next(&self) -> Result<Option<Resolved>> {
        let Some(record) = self.catalog.find_pending_geocode().await? else {
            return Ok(None);
        };

        let location = match record.pending_geocode() {
            Some(point) => self
                .client
                .reverse_geocode(point)
                .await?
                .and_then(|address| address.place_name(&self.config.home_country)),
            None => {
                warn!(picture_id = %record.id, "Unreadable coordinates, clearing location");
                None
            }
        };

        self.catalog
            .update_location(&record.id, location.as_deref())
            .await?;
        trace!(picture_id = %record.id, location = ?location, "Location resolved");

        Ok(Some(Resolved {
            picture_id: record.id,
            location,
        }))
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> LoopHandle {
        let worker = Arc::new(self);
        LoopHandle::spawn("geocode", move |mut shutdown_rx| async move {
            worker.run(&mut shutdown_rx).await;
        })
    }

    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            home_country = %self.config.home_country,
            "Geocode worker started"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = self.trigger.woken() => {}
            }
            self.trigger.set_active();

            if !self.drain(shutdown_rx).await {
                break;
            }

            self.trigger.set_idle();
            debug!("Geocode worker idle");
        }

        self.trigger.set_idle();
        info!("Geocode worker stopped");
    }

    /// Resolve until nothing is pending. Returns `false` on shutdown.
    async fn drain(&self, shutdown_rx: &mut mpsc::Receiver<()>) -> bool {
        loop {
            let pause = tokio::select! {
                _ = shutdown_rx.recv() => return false,
                result = self.resolve_next() => match result {
                    Ok(Some(_)) => self.config.interval,
                    Ok(None) => return true,
                    Err(e) => {
                        warn!(
                            error = %e,
                            retry_in_secs = self.config.failure_backoff.as_secs(),
                            "Geocode attempt failed, marker kept"
                        );
                        self.config.failure_backoff
                    }
                },
            };

            tokio::select! {
                _ = shutdown_rx.recv() => return false,
                _ = sleep(pause) => {}
            }
        }
    }
}
