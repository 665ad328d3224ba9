//! Configuration management for postlink.
//!
//! Configuration is read from `~/.config/postlink/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use crate::feed::FeedConfig;
use crate::media::MediaConfig;
use crate::ocr::OcrConfig;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub feed: FeedConfig,
    pub media: MediaConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file (default: `<data_dir>/postlink/postlink.db`)
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, creating a commented default there
    /// when it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::create_default_config(path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/postlink/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("postlink").join("config.toml"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# postlink configuration

[store]
# SQLite database file. Defaults to <data dir>/postlink/postlink.db
# path = "/var/lib/postlink/postlink.db"

[feed]
# Profile whose grid is watched
profile_url = "https://www.instagram.com/nibsnetwork/"

# Persistent browser profile (holds the logged-in session).
# Defaults to <data dir>/postlink/browser_session
# session_dir = "/var/lib/postlink/browser_session"

# Run browser without a window. Forced on when POSTLINK_ENV=production.
headless = true

# Thumbnails narrower than this (pixels) are ignored
min_thumbnail_width = 150

# Seconds between feed samples
poll_interval_secs = 8

# Waiting for the grid to appear: seconds per check, number of checks
content_wait_interval_secs = 5
content_wait_attempts = 120

window_width = 1280
window_height = 900

[media]
bucket = "postlink-media"
region = "us-east-1"

# Public URL prefix for mirrored images (CDN). Defaults to the
# virtual-hosted S3 URL of the bucket.
# public_base_url = "https://cdn.example.com"

# S3-compatible endpoint (MinIO, R2, ...)
# endpoint_url = "http://localhost:9000"

[ocr]
command = "tesseract"
language = "eng"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
