use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the feed session and poller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Profile page whose grid is watched
    pub profile_url: String,

    /// Persistent browser profile directory (default: `<data_dir>/postlink/browser_session`)
    pub session_dir: Option<PathBuf>,

    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Thumbnails narrower than this are not posts (default: 150)
    pub min_thumbnail_width: u32,

    /// Pause between two feed samples in seconds (default: 8)
    pub poll_interval_secs: u64,

    /// Pause between checks while waiting for the grid to render (default: 5)
    pub content_wait_interval_secs: u64,

    /// How many checks before giving up on the grid (default: 120)
    pub content_wait_attempts: u32,

    pub window_width: u32,
    pub window_height: u32,

    /// User agent string to use
    pub user_agent: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            profile_url: "https://www.instagram.com/nibsnetwork/".to_string(),
            session_dir: None,
            headless: true,
            min_thumbnail_width: 150,
            poll_interval_secs: 8,
            content_wait_interval_secs: 5,
            content_wait_attempts: 120,
            window_width: 1280,
            window_height: 900,
            user_agent: None,
        }
    }
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn content_wait_interval(&self) -> Duration {
        Duration::from_secs(self.content_wait_interval_secs)
    }

    /// Resolve the browser profile directory, falling back to the data dir.
    pub fn resolved_session_dir(&self) -> Option<PathBuf> {
        self.session_dir.clone().or_else(|| {
            dirs::data_dir().map(|d| d.join("postlink").join("browser_session"))
        })
    }
}
