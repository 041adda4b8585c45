//! Normalisation of remote file metadata into catalog records.
//!
//! Malformed fields (capture time, coordinates, creation time) are dropped
//! and treated as absent; they never reject the record itself.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::{GeoPoint, ImageMediaMetadata, PictureRecord, RemoteFile};

/// `2019:06:15 ...` and similar date separators become `2019-06-15 ...`.
static DATE_SEPARATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})\D(\d{2})\D(\d{2})").expect("static regex is valid")
});

/// Only `image/*` files belong in the catalog.
pub fn is_image_mime(mime_type: Option<&str>) -> bool {
    mime_type.is_some_and(|m| m.starts_with("image/"))
}

/// Parse a capture time given either as a loosely formatted date string or
/// as a numeric unix timestamp. Zone-less times are read as UTC.
pub fn parse_capture_time(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => parse_loose_datetime(s),
        _ => None,
    }
}

fn parse_loose_datetime(raw: &str) -> Option<i64> {
    let normalized = DATE_SEPARATORS.replace(raw.trim(), "$1-$2-$3");
    let s = normalized.as_ref();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).timestamp());
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc().timestamp());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc().timestamp())
}

/// Coordinates from image metadata, if both are present and in range.
pub fn extract_coordinates(meta: &ImageMediaMetadata) -> Option<GeoPoint> {
    let location = meta.location.as_ref()?;
    let (lat, lon) = (location.latitude?, location.longitude?);
    let valid = lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon);
    valid.then(|| GeoPoint::new(lat, lon))
}

/// Build the catalog record for a remote file.
///
/// Returns `None` for non-image files. `now` stands in for a missing or
/// unparseable creation time.
pub fn normalize_remote_file(file: &RemoteFile, now: i64) -> Option<PictureRecord> {
    if !is_image_mime(file.mime_type.as_deref()) || file.id.is_empty() {
        return None;
    }

    let added_at = file
        .created_time
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|dt| dt.timestamp())
        .unwrap_or(now);

    let (taken_at, coordinates) = match &file.image_media_metadata {
        Some(meta) => (
            meta.time.as_ref().and_then(parse_capture_time),
            extract_coordinates(meta),
        ),
        None => (None, None),
    };

    Some(PictureRecord {
        id: file.id.clone(),
        extension: file.file_extension.clone().filter(|e| !e.is_empty()),
        author: file.author().map(String::from),
        added_at,
        taken_at,
        location: coordinates.map(|p| p.to_marker()),
    })
}
