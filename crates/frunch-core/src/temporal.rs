//! Human-readable relative times for viewer display.
//!
//! Wording and thresholds follow the conventional "from now" style used by
//! web clients ("a few seconds ago", "3 days ago", "a year ago").

use crate::models::PictureRecord;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;

/// Describe the distance between `timestamp` and `now` (both unix seconds).
pub fn relative_time(timestamp: i64, now: i64) -> String {
    let delta = now - timestamp;
    let phrase = humanize_seconds(delta.unsigned_abs() as f64);
    if delta >= 0 {
        format!("{} ago", phrase)
    } else {
        format!("in {}", phrase)
    }
}

fn humanize_seconds(secs: f64) -> String {
    let minutes = (secs / MINUTE).round();
    let hours = (secs / HOUR).round();
    let days = (secs / DAY).round();
    let months = (secs / DAY / 30.4).round();
    let years = (secs / DAY / 365.0).round();

    if secs < 45.0 {
        "a few seconds".to_string()
    } else if secs < 90.0 {
        "a minute".to_string()
    } else if minutes < 45.0 {
        format!("{} minutes", minutes)
    } else if minutes < 90.0 {
        "an hour".to_string()
    } else if hours < 22.0 {
        format!("{} hours", hours)
    } else if hours < 36.0 {
        "a day".to_string()
    } else if days < 26.0 {
        format!("{} days", days)
    } else if days < 46.0 {
        "a month".to_string()
    } else if days < 320.0 {
        format!("{} months", months.max(2.0))
    } else if days < 548.0 {
        "a year".to_string()
    } else {
        format!("{} years", years.max(2.0))
    }
}

/// The `when` line shown under a picture.
///
/// Prefixed with "added" when the capture time is unknown.
pub fn describe_when(record: &PictureRecord, now: i64) -> String {
    let relative = relative_time(record.display_timestamp(), now);
    match record.taken_at {
        Some(_) => relative,
        None => format!("added {}", relative),
    }
}
