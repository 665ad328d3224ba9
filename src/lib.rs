//! # Postlink
//!
//! Mirrors posts from an Instagram profile feed and links them to blog
//! articles.
//!
//! ## Architecture
//!
//! Two independent jobs share one SQLite store:
//!
//! ```text
//! ingest:  ChromeSession → FeedPoller → DedupStore → MediaIngestor → Store
//! map:     Store → MatchEngine (title, then OCR) → Store
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Watch the feed until Ctrl-C
//! postlink ingest
//!
//! # Link captured posts to articles
//! postlink map
//!
//! # Show posts still waiting for a link
//! postlink posts --unmapped
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// the image fetcher and the loaded configuration.
pub mod app;

/// Command-line interface using clap.
///
/// - `ingest` - Run the capture loop
/// - `map` - Run one matching pass
/// - `posts [--unmapped]` - List captured posts
pub mod cli;

/// Configuration loaded from `~/.config/postlink/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Post`](domain::Post): A captured feed post
/// - [`Article`](domain::Article): A blog article posts are linked to
pub mod domain;

/// Browser-backed feed sampling.
///
/// - [`ChromeSession`](feed::ChromeSession): Persistent chromiumoxide session on the profile page
/// - [`FeedPoller`](feed::FeedPoller): Turns visible thumbnails into candidate posts
pub mod feed;

/// The capture loop and its cancellation handle.
pub mod ingest;

/// Two-stage post to article matching.
pub mod matcher;

/// Image download and S3 mirroring.
pub mod media;

/// Text recognition for post images.
pub mod ocr;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
