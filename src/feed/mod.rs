//! Watching the profile grid for new posts.
//!
//! # Architecture
//!
//! ```text
//! ChromeSession (FeedSession) → VisibleItem list → FeedPoller → candidate Posts
//! ```
//!
//! The session keeps one page open on the profile and answers snapshot
//! queries by evaluating a script in it. The poller owns the derivation
//! rules (width threshold, shortcode, post type, caption) and never retries.
//!
//! # Usage
//!
//! ```rust,ignore
//! use postlink::feed::{ChromeSession, FeedConfig, FeedPoller, FeedSession, SessionMode};
//!
//! let mut session = ChromeSession::launch(&config, SessionMode::detect()).await?;
//! let poller = FeedPoller::new(&session, config.min_thumbnail_width);
//! let candidates = poller.poll().await;
//! session.close().await?;
//! ```

mod config;
mod poller;
mod script;
mod session;

pub use config::FeedConfig;
pub use poller::{candidate_from, FeedPoller};
pub use script::FeedScripts;
pub use session::{ChromeSession, SessionMode};

use async_trait::async_trait;
use serde::Deserialize;

use crate::app::Result;

/// One thumbnail as rendered in the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleItem {
    pub href: Option<String>,
    pub img_src: Option<String>,
    pub img_alt: Option<String>,
    #[serde(default)]
    pub img_width: u32,
}

/// Read access to the feed's current rendering.
#[async_trait]
pub trait FeedSnapshot {
    /// Every post thumbnail currently rendered, in document order.
    async fn current_visible_items(&self) -> Result<Vec<VisibleItem>>;

    /// How many post thumbnails are rendered.
    async fn visible_post_count(&self) -> Result<usize>;
}

/// A snapshot source holding an external resource that must be released.
#[async_trait]
pub trait FeedSession: FeedSnapshot + Send + Sync {
    async fn close(&mut self) -> Result<()>;
}
