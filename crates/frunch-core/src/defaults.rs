//! Centralized default constants for frunch-room.
//!
//! **This module is the single source of truth** for shared default values.
//! Config structs read environment overrides and fall back to these.

// =============================================================================
// SYNC
// =============================================================================

/// Interval between catalog sync passes, in seconds.
pub const SYNC_INTERVAL_SECS: u64 = 60;

/// Page size requested from the file source (listing and change feed).
pub const SYNC_PAGE_SIZE: u32 = 100;

/// Key-value store key holding the change-feed cursor.
pub const SYNC_CURSOR_KEY: &str = "changesPageToken";

// =============================================================================
// GEOCODING
// =============================================================================

/// Delay between two outbound geocode requests, in milliseconds.
///
/// Nominatim's usage policy allows at most one request per second.
pub const GEOCODE_INTERVAL_MS: u64 = 1100;

/// Delay before retrying after a request-level geocode failure, in seconds.
pub const GEOCODE_FAILURE_BACKOFF_SECS: u64 = 60;

/// Country code for which places are shown as "city, region".
pub const GEOCODE_HOME_COUNTRY: &str = "us";

/// Default Nominatim reverse endpoint.
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// User agent sent to Nominatim.
pub const NOMINATIM_USER_AGENT: &str = "Frunch Room";

/// Zoom level requested from Nominatim (10 = city).
pub const NOMINATIM_ZOOM: u8 = 10;

/// Timeout for a single geocode request, in seconds.
pub const GEOCODE_TIMEOUT_SECS: u64 = 15;

// =============================================================================
// ROTATION
// =============================================================================

/// How often a new picture is shown, in seconds.
pub const PICTURE_INTERVAL_SECS: u64 = 20;

/// Maximum time a rotation tick waits for a selection, in seconds.
pub const PICTURE_TIMEOUT_SECS: u64 = 60;

/// Minimum number of pictures shown before one may repeat.
pub const MIN_REPEAT: usize = 10;

/// A throwback is attempted about once every this many selections.
pub const THROWBACK_FREQUENCY: u32 = 15;

/// Number of most-recently-added pictures in the weighted pool.
pub const RECENT_WINDOW: i64 = 50;

/// Age in days at which a picture reaches the minimum weight.
pub const WEIGHT_WINDOW_DAYS: f64 = 5.0;

// =============================================================================
// FILE SOURCE
// =============================================================================

/// Default Google Drive REST base URL.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com";

/// Timeout for file-source metadata requests, in seconds.
pub const DRIVE_TIMEOUT_SECS: u64 = 30;

/// Extension used when the remote file carries none.
pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default viewer broadcast channel capacity.
pub const PICTURE_BUS_CAPACITY: usize = 16;

/// Public URL prefix under which cached images are served.
pub const IMAGE_URL_PREFIX: &str = "/images";

/// Default SQLite database URL.
pub const DATABASE_URL: &str = "sqlite://frunch-room.sqlite";
