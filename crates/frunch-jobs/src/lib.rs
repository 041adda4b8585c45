//! # frunch-jobs
//!
//! The three long-lived loops of frunch-room.
//!
//! This crate provides:
//! - [`CatalogSynchronizer`]: full listing or incremental change feed, with a persisted cursor
//! - [`GeocodeWorker`]: rate-limited reverse geocoding behind a coalescing [`GeocodeTrigger`]
//! - [`PictureScheduler`]: weighted selection with throwbacks and anti-repeat history
//! - [`start_rotation`]: the timeout-bounded rotation loop
//!
//! Every loop returns a [`LoopHandle`] for shutdown.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use frunch_jobs::*;
//!
//! let worker = GeocodeWorker::new(catalog.clone(), geocoder, GeocodeConfig::from_env());
//! let trigger = worker.trigger();
//!
//! let sync = CatalogSynchronizer::new(source, catalog.clone(), state, trigger.clone(), SyncConfig::from_env());
//! sync.sync().await?;
//!
//! let scheduler = Arc::new(PictureScheduler::new(catalog, resolver, sink, trigger.clone(), RotationConfig::from_env())?);
//! let handles = vec![sync.start(), worker.start(), start_rotation(scheduler)];
//! trigger.resume();
//! ```

pub mod geocode;
pub mod handle;
pub mod rotation;
pub mod scheduler;
pub mod sync;

// Re-export core types
pub use frunch_core::*;

pub use geocode::{GeocodeConfig, GeocodeTrigger, GeocodeWorker, Resolved};
pub use handle::LoopHandle;
pub use rotation::{start_rotation, tick, TickOutcome};
pub use scheduler::{
    pick_weighted, recency_weight, should_throwback, PictureScheduler, RotationConfig,
};
pub use sync::{CatalogSynchronizer, SyncConfig, SyncMode, SyncReport};
