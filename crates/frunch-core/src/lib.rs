//! # frunch-core
//!
//! Core types, traits, and abstractions for the frunch-room picture rotation
//! engine.
//!
//! This crate provides the foundational data structures and the collaborator
//! interfaces (file source, catalog, key-value store, geocoder, broadcast sink)
//! that the other frunch-room crates implement or consume.

pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod metadata;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod models;
pub mod temporal;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{PictureBus, ViewerEvent};
pub use metadata::{is_image_mime, normalize_remote_file, parse_capture_time};
pub use models::*;
pub use temporal::{describe_when, relative_time};
pub use traits::*;
