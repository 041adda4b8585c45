//! # frunch-remote
//!
//! HTTP collaborators for frunch-room.
//!
//! This crate provides:
//! - [`DriveClient`]: the file source, over the Google Drive v3 REST API
//! - [`NominatimClient`]: reverse geocoding, over OpenStreetMap Nominatim
//! - [`ImageCache`]: resolves a picture to a local file, downloading it once
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use frunch_remote::{DriveClient, ImageCache, NominatimClient};
//!
//! let drive = Arc::new(DriveClient::from_env()?);
//! let geocoder = NominatimClient::from_env()?;
//! let cache = ImageCache::new("public/images", drive.clone());
//! ```

pub mod drive;
pub mod image_cache;
pub mod nominatim;

pub use drive::{DriveClient, DriveConfig};
pub use image_cache::ImageCache;
pub use nominatim::{NominatimClient, NominatimConfig};
