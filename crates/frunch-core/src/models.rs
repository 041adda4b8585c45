//! Domain models for frunch-room.
//!
//! `PictureRecord` is the catalog row; `RemoteFile`/`RemoteChange` and the page
//! types mirror what the file source returns; `DisplayPicture` is what viewers
//! receive.

use serde::{Deserialize, Serialize};

// =============================================================================
// CATALOG
// =============================================================================

/// One catalog entry per remote image file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PictureRecord {
    /// Stable remote file id (primary key, immutable).
    pub id: String,
    /// File extension used to resolve the local cache path.
    pub extension: Option<String>,
    /// Display name of the contributor.
    pub author: Option<String>,
    /// Unix timestamp when the file was created upstream. Set once.
    pub added_at: i64,
    /// Unix timestamp from capture metadata, if any.
    pub taken_at: Option<i64>,
    /// Resolved place, or a pending-geocode marker (see [`GeoPoint::to_marker`]).
    pub location: Option<String>,
}

impl PictureRecord {
    /// Coordinates awaiting reverse geocoding, if the location is still a marker.
    pub fn pending_geocode(&self) -> Option<GeoPoint> {
        self.location.as_deref().and_then(GeoPoint::from_marker)
    }

    /// Whether the location still holds a marker (parseable or not).
    pub fn has_pending_geocode(&self) -> bool {
        self.location.as_deref().is_some_and(GeoPoint::is_marker)
    }

    /// Timestamp shown to viewers: capture time, else the time it was added.
    pub fn display_timestamp(&self) -> i64 {
        self.taken_at.unwrap_or(self.added_at)
    }
}

/// Raw coordinates, serialized into the location column while pending.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Serialize as the pending-geocode marker, e.g. `{"lat":1.5,"lon":2.0}`.
    pub fn to_marker(&self) -> String {
        format!("{{\"lat\":{},\"lon\":{}}}", self.lat, self.lon)
    }

    /// Parse a marker back into coordinates. `None` for resolved places and
    /// for malformed markers.
    pub fn from_marker(value: &str) -> Option<Self> {
        if !Self::is_marker(value) {
            return None;
        }
        serde_json::from_str::<GeoPoint>(value)
            .ok()
            .filter(|p| p.lat.is_finite() && p.lon.is_finite())
    }

    /// Markers are JSON objects; resolved place names never start with `{`.
    pub fn is_marker(value: &str) -> bool {
        value.starts_with('{')
    }
}

// =============================================================================
// FILE SOURCE
// =============================================================================

/// A file as listed by the remote file source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteFile {
    pub id: String,
    pub mime_type: Option<String>,
    pub file_extension: Option<String>,
    pub owners: Vec<RemoteOwner>,
    /// RFC 3339 creation time.
    pub created_time: Option<String>,
    pub trashed: bool,
    pub image_media_metadata: Option<ImageMediaMetadata>,
}

impl RemoteFile {
    /// Display name of the first owner.
    pub fn author(&self) -> Option<&str> {
        self.owners.first().and_then(|o| o.display_name.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteOwner {
    pub display_name: Option<String>,
}

/// Image metadata attached to a remote file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageMediaMetadata {
    pub location: Option<MediaLocation>,
    /// Capture time: either a loosely formatted date string or a unix timestamp.
    pub time: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One entry of the change feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteChange {
    /// `"file"` for file changes; other kinds are ignored.
    #[serde(rename = "type")]
    pub change_type: Option<String>,
    pub file_id: Option<String>,
    pub removed: bool,
    pub file: Option<RemoteFile>,
}

impl RemoteChange {
    /// Changes without a type are treated as file changes.
    pub fn is_file_change(&self) -> bool {
        self.change_type.as_deref().map_or(true, |t| t == "file")
    }

    /// Removed outright, or moved to the trash.
    pub fn is_removal(&self) -> bool {
        self.removed || self.file.as_ref().is_some_and(|f| f.trashed)
    }

    /// Id of the affected file.
    pub fn target_id(&self) -> Option<&str> {
        self.file_id
            .as_deref()
            .or_else(|| self.file.as_ref().map(|f| f.id.as_str()))
            .filter(|id| !id.is_empty())
    }
}

/// One page of the full listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileListPage {
    pub files: Vec<RemoteFile>,
    pub next_page_token: Option<String>,
}

/// One page of the change feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangePage {
    pub changes: Vec<RemoteChange>,
    pub next_page_token: Option<String>,
    /// Present on the last page: the cursor to resume from next pass.
    pub new_start_page_token: Option<String>,
}

impl ChangePage {
    /// Position to persist once this page has been applied.
    pub fn resume_cursor(&self) -> Option<&str> {
        self.new_start_page_token
            .as_deref()
            .or(self.next_page_token.as_deref())
    }
}

// =============================================================================
// GEOCODING
// =============================================================================

/// Address components returned by reverse geocoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
}

impl Address {
    /// "city, region" at home, "city, country" abroad.
    ///
    /// Falls back to whichever half exists; `None` when neither does.
    pub fn place_name(&self, home_country: &str) -> Option<String> {
        let at_home = self
            .country_code
            .as_deref()
            .is_some_and(|cc| cc.eq_ignore_ascii_case(home_country));
        let wider = if at_home { &self.region } else { &self.country };

        match (non_blank(&self.city), non_blank(wider)) {
            (Some(city), Some(wider)) => Some(format!("{}, {}", city, wider)),
            (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
            (None, None) => None,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// =============================================================================
// DISPLAY
// =============================================================================

/// A picture decorated for viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayPicture {
    pub id: String,
    pub author: Option<String>,
    /// Resolved place; blank while geocoding is still pending.
    pub location: Option<String>,
    /// Public URL path of the cached image file.
    pub path: String,
    /// Human-readable relative time, e.g. "added 3 days ago".
    pub when: String,
    pub added_at: i64,
    pub taken_at: Option<i64>,
}
