//! Error types for frunch-room.

use thiserror::Error;

/// Result type alias using frunch-room's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for frunch-room operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found (also: no eligible picture to show)
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reverse geocoding failed at the request level
    #[error("Geocode error: {0}")]
    Geocode(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure is a network/store hiccup that the next loop tick retries.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Request(_) | Error::Io(_) | Error::Geocode(_)
        )
    }

    /// Whether the failure only means "nothing to select right now".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("no eligible picture".to_string());
        assert_eq!(err.to_string(), "Not found: no eligible picture");
    }

    #[test]
    fn test_error_display_geocode() {
        let err = Error::Geocode("HTTP 503".to_string());
        assert_eq!(err.to_string(), "Geocode error: HTTP 503");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("timeout too short".to_string());
        assert_eq!(err.to_string(), "Configuration error: timeout too short");
    }

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.to_string().contains("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(ref msg) if !msg.is_empty()));
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Request("timeout".into()).is_transient());
        assert!(Error::Geocode("503".into()).is_transient());
        assert!(Error::Io(std::io::Error::other("disk")).is_transient());
        assert!(!Error::NotFound("empty".into()).is_transient());
        assert!(!Error::Config("bad".into()).is_transient());
    }

    #[test]
    fn test_every_variant_is_classified() {
        let all = vec![
            Error::Database(sqlx::Error::RowNotFound),
            Error::NotFound("none".into()),
            Error::Request("reset".into()),
            Error::Serialization("bad json".into()),
            Error::Config("bad".into()),
            Error::Geocode("429".into()),
            Error::Internal("boom".into()),
            Error::Io(std::io::Error::other("disk")),
        ];
        for err in all {
            let transient = match &err {
                Error::Database(_) | Error::Request(_) | Error::Geocode(_) | Error::Io(_) => true,
                Error::NotFound(_)
                | Error::Serialization(_)
                | Error::Config(_)
                | Error::Internal(_) => false,
            };
            assert_eq!(err.is_transient(), transient, "{}", err);
        }
    }

    #[test]
    fn test_not_found_classification() {
        assert!(Error::NotFound("empty catalog".into()).is_not_found());
        assert!(!Error::Internal("boom".into()).is_not_found());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
