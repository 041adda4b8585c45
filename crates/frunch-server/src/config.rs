//! Server configuration read from the environment.

use std::path::PathBuf;

use frunch_core::defaults;
use frunch_jobs::{GeocodeConfig, RotationConfig, SyncConfig};

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Static viewer assets, served at `/`.
    pub public_dir: PathBuf,
    /// Downloaded pictures, served at `/images`.
    pub image_cache_dir: PathBuf,
    pub sync: SyncConfig,
    pub geocode: GeocodeConfig,
    pub rotation: RotationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::DATABASE_URL.to_string(),
            host: "0.0.0.0".to_string(),
            port: defaults::SERVER_PORT,
            public_dir: PathBuf::from("public"),
            image_cache_dir: PathBuf::from("public/images"),
            sync: SyncConfig::default(),
            geocode: GeocodeConfig::default(),
            rotation: RotationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DATABASE_URL` | `sqlite://frunch-room.sqlite` |
    /// | `HOST` | `0.0.0.0` |
    /// | `PORT` | `3000` |
    /// | `PUBLIC_DIR` | `public` |
    /// | `IMAGE_CACHE_DIR` | `public/images` |
    ///
    /// Loop settings come from [`SyncConfig::from_env`],
    /// [`GeocodeConfig::from_env`] and [`RotationConfig::from_env`].
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(base.database_url),
            host: std::env::var("HOST").unwrap_or(base.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.port),
            public_dir: std::env::var("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(base.public_dir),
            image_cache_dir: std::env::var("IMAGE_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(base.image_cache_dir),
            sync: SyncConfig::from_env(),
            geocode: GeocodeConfig::from_env(),
            rotation: RotationConfig::from_env(),
        }
    }

    pub fn with_public_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.public_dir = dir.into();
        self
    }

    pub fn with_image_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_cache_dir = dir.into();
        self
    }

    pub fn with_rotation(mut self, rotation: RotationConfig) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
