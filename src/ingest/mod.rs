//! The discovery → dedup → capture loop.
//!
//! Each cycle samples the feed, skips ids already captured, and for every
//! new candidate mirrors the image and inserts the post. An id is only
//! remembered after both steps succeed, so a failure is retried on the next
//! cycle.

mod context;
mod dedup;

pub use context::RunContext;
pub use dedup::DedupStore;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::app::Result;
use crate::domain::Post;
use crate::feed::{FeedConfig, FeedPoller, FeedSession, FeedSnapshot};
use crate::media::MediaIngestor;
use crate::store::Store;

/// What happened to one new candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Saved,
    /// Uploaded, but the row already existed.
    AlreadyStored,
    /// The blob store produced no URL.
    NoUrl,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub visible: usize,
    pub new: usize,
    pub captured: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub cycles: usize,
    pub captured: usize,
    pub failed: usize,
}

pub struct Ingestor<'a, S: Store> {
    poller: FeedPoller<'a>,
    media: MediaIngestor,
    store: Arc<S>,
    dedup: DedupStore,
    poll_interval: Duration,
    wait_interval: Duration,
    wait_attempts: u32,
}

impl<'a, S: Store> Ingestor<'a, S> {
    /// Build the loop and seed the dedup set from every stored post.
    pub fn new(
        poller: FeedPoller<'a>,
        media: MediaIngestor,
        store: Arc<S>,
        config: &FeedConfig,
    ) -> Result<Self> {
        let mut dedup = DedupStore::new();
        dedup.seed(store.load_all_posts()?.into_iter().map(|p| p.id));
        info!("Loaded {} existing posts from the store", dedup.len());

        Ok(Self {
            poller,
            media,
            store,
            dedup,
            poll_interval: config.poll_interval(),
            wait_interval: config.content_wait_interval(),
            wait_attempts: config.content_wait_attempts,
        })
    }

    pub fn known(&self) -> usize {
        self.dedup.len()
    }

    /// Wait until the feed renders at least one post.
    ///
    /// Gives up after the configured number of attempts or on cancellation.
    pub async fn wait_for_content(&self, ctx: &RunContext) -> bool {
        for attempt in 1..=self.wait_attempts {
            if !ctx.is_running() {
                return false;
            }
            ctx.sleep(self.wait_interval).await;

            let count = self.poller.visible_count().await;
            if count > 0 {
                info!("Found {} posts", count);
                return true;
            }
            debug!(
                attempt,
                waited_secs = attempt as u64 * self.wait_interval.as_secs(),
                "Waiting for posts"
            );
        }
        false
    }

    /// Run until cancelled. Returns early if the feed never shows content.
    pub async fn run(&mut self, ctx: &RunContext) -> IngestStats {
        let mut stats = IngestStats::default();

        if !self.wait_for_content(ctx).await {
            info!(
                "No posts appeared after {} checks, ending run",
                self.wait_attempts
            );
            return stats;
        }

        while ctx.is_running() {
            let report = self.run_cycle().await;
            stats.cycles += 1;
            stats.captured += report.captured;
            stats.failed += report.failed;

            if report.new > 0 {
                info!(
                    visible = report.visible,
                    captured = report.captured,
                    failed = report.failed,
                    known = self.dedup.len(),
                    "Cycle complete"
                );
            } else {
                debug!(visible = report.visible, known = self.dedup.len(), "Scanning");
            }

            ctx.sleep(self.poll_interval).await;
        }

        info!(
            "Ingestion stopped after {} cycles: {} captured, {} failed",
            stats.cycles, stats.captured, stats.failed
        );
        stats
    }

    /// Sample the feed once and capture every unseen post.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let candidates = self.poller.poll().await;
        let mut report = CycleReport {
            visible: candidates.len(),
            ..Default::default()
        };

        for post in candidates {
            if self.dedup.contains(&post.id) {
                continue;
            }
            report.new += 1;
            info!(post_id = %post.id, "New post detected");

            let id = post.id.clone();
            match self.capture(post).await {
                Ok(Capture::Saved) => {
                    self.dedup.add(&id);
                    report.captured += 1;
                    info!(post_id = %id, "Saved to store and blob storage");
                }
                Ok(Capture::AlreadyStored) => {
                    self.dedup.add(&id);
                    debug!(post_id = %id, "Already stored, upload repeated");
                }
                Ok(Capture::NoUrl) => {
                    report.failed += 1;
                    warn!(post_id = %id, "Upload yielded no URL, will retry next cycle");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(post_id = %id, "Error capturing post: {}", e);
                }
            }
        }

        report
    }

    async fn capture(&self, mut post: Post) -> Result<Capture> {
        let Some(public_url) = self.media.ingest(&post.id, &post.image).await? else {
            return Ok(Capture::NoUrl);
        };
        post.image = public_url;

        if self.store.insert_post_if_absent(&post)? {
            Ok(Capture::Saved)
        } else {
            Ok(Capture::AlreadyStored)
        }
    }
}

/// Ingest from `session` until cancelled, then close it.
///
/// The session is closed whether the run ends normally or with an error; a
/// failed close is logged and never replaces the run's outcome.
pub async fn run_session<F, S>(
    mut session: F,
    media: MediaIngestor,
    store: Arc<S>,
    config: &FeedConfig,
    ctx: &RunContext,
) -> Result<IngestStats>
where
    F: FeedSession,
    S: Store,
{
    let outcome = ingest_from(&session, media, store, config, ctx).await;

    if let Err(e) = session.close().await {
        error!("{}", e);
    }
    outcome
}

async fn ingest_from<S: Store>(
    snapshot: &(dyn FeedSnapshot + Send + Sync),
    media: MediaIngestor,
    store: Arc<S>,
    config: &FeedConfig,
    ctx: &RunContext,
) -> Result<IngestStats> {
    let poller = FeedPoller::new(snapshot, config.min_thumbnail_width);
    let mut ingestor = Ingestor::new(poller, media, store, config)?;
    Ok(ingestor.run(ctx).await)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::app::PostlinkError;
    use crate::domain::{Article, PostType};
    use crate::feed::VisibleItem;
    use crate::media::testing::{FakeBlobStore, FakeFetcher};
    use crate::store::SqliteStore;

    /// Serves a fixed grid; cancels `ctx` after `stop_after` samples.
    /// The first `empty_checks` count queries report an empty grid.
    #[derive(Default)]
    struct ScriptedFeed {
        items: Mutex<Vec<VisibleItem>>,
        count: Mutex<usize>,
        empty_checks: usize,
        count_checks: AtomicUsize,
        samples: AtomicUsize,
        stop_after: Option<(usize, RunContext)>,
    }

    #[async_trait]
    impl FeedSnapshot for ScriptedFeed {
        async fn current_visible_items(&self) -> Result<Vec<VisibleItem>> {
            let n = self.samples.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((limit, ctx)) = &self.stop_after {
                if n >= *limit {
                    ctx.cancel();
                }
            }
            Ok(self.items.lock().unwrap().clone())
        }

        async fn visible_post_count(&self) -> Result<usize> {
            let n = self.count_checks.fetch_add(1, Ordering::SeqCst);
            if n < self.empty_checks {
                return Ok(0);
            }
            Ok(*self.count.lock().unwrap())
        }
    }

    /// Wraps a scripted feed and counts `close` calls.
    struct FakeSession {
        feed: ScriptedFeed,
        closes: Arc<AtomicUsize>,
        fail_close: bool,
    }

    impl FakeSession {
        fn new(feed: ScriptedFeed) -> (Self, Arc<AtomicUsize>) {
            let closes = Arc::new(AtomicUsize::new(0));
            let session = Self {
                feed,
                closes: closes.clone(),
                fail_close: false,
            };
            (session, closes)
        }
    }

    #[async_trait]
    impl FeedSnapshot for FakeSession {
        async fn current_visible_items(&self) -> Result<Vec<VisibleItem>> {
            self.feed.current_visible_items().await
        }

        async fn visible_post_count(&self) -> Result<usize> {
            self.feed.visible_post_count().await
        }
    }

    #[async_trait]
    impl FeedSession for FakeSession {
        async fn close(&mut self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err(PostlinkError::Session("browser already gone".into()));
            }
            Ok(())
        }
    }

    /// Every call fails, as with a corrupt database file.
    struct BrokenStore;

    impl Store for BrokenStore {
        fn load_all_posts(&self) -> Result<Vec<Post>> {
            Err(PostlinkError::Other("database unavailable".into()))
        }

        fn load_unmapped_posts(&self) -> Result<Vec<Post>> {
            Err(PostlinkError::Other("database unavailable".into()))
        }

        fn get_post(&self, _id: &str) -> Result<Option<Post>> {
            Err(PostlinkError::Other("database unavailable".into()))
        }

        fn insert_post_if_absent(&self, _post: &Post) -> Result<bool> {
            Err(PostlinkError::Other("database unavailable".into()))
        }

        fn set_blog_url(&self, _id: &str, _blog_url: &str) -> Result<()> {
            Err(PostlinkError::Other("database unavailable".into()))
        }

        fn load_articles(&self) -> Result<Vec<Article>> {
            Err(PostlinkError::Other("database unavailable".into()))
        }

        fn add_article(&self, _article: &Article) -> Result<i64> {
            Err(PostlinkError::Other("database unavailable".into()))
        }
    }

    fn thumb(shortcode: &str) -> VisibleItem {
        VisibleItem {
            href: Some(format!("https://www.instagram.com/p/{}/", shortcode)),
            img_src: Some(format!("https://cdn.example.com/{}.jpg", shortcode)),
            img_alt: Some(format!("Caption for {}", shortcode)),
            img_width: 309,
        }
    }

    fn instant_config() -> FeedConfig {
        FeedConfig {
            poll_interval_secs: 0,
            content_wait_interval_secs: 0,
            content_wait_attempts: 3,
            ..Default::default()
        }
    }

    fn media(blobs: &Arc<FakeBlobStore>) -> MediaIngestor {
        MediaIngestor::new(Arc::new(FakeFetcher::default()), blobs.clone())
    }

    #[tokio::test]
    async fn test_cycle_captures_new_posts() {
        let feed = ScriptedFeed::default();
        *feed.items.lock().unwrap() = vec![thumb("a"), thumb("b")];
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let blobs = Arc::new(FakeBlobStore::default());

        let mut ingestor = Ingestor::new(
            FeedPoller::new(&feed, 150),
            media(&blobs),
            store.clone(),
            &instant_config(),
        )
        .unwrap();

        let report = ingestor.run_cycle().await;
        assert_eq!(report.visible, 2);
        assert_eq!(report.new, 2);
        assert_eq!(report.captured, 2);
        assert_eq!(ingestor.known(), 2);

        let stored = store.get_post("ig-a").unwrap().unwrap();
        assert_eq!(stored.image, "https://blobs.example.com/posts/ig-a.jpg");
        assert_eq!(stored.post_type, PostType::Image);
        assert_eq!(stored.title, "Caption for a");
    }

    #[tokio::test]
    async fn test_known_ids_are_not_reingested() {
        let feed = ScriptedFeed::default();
        *feed.items.lock().unwrap() = vec![thumb("a")];
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let blobs = Arc::new(FakeBlobStore::default());

        let mut ingestor = Ingestor::new(
            FeedPoller::new(&feed, 150),
            media(&blobs),
            store.clone(),
            &instant_config(),
        )
        .unwrap();

        ingestor.run_cycle().await;
        let second = ingestor.run_cycle().await;
        let third = ingestor.run_cycle().await;

        assert_eq!(second.new, 0);
        assert_eq!(third.new, 0);
        assert_eq!(blobs.uploads.lock().unwrap().len(), 1);
        assert_eq!(store.load_all_posts().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dedup_seeded_from_store() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let existing = Post::new("a", PostType::Image, "https://x/p/a/", "https://blobs/a.jpg");
        store.insert_post_if_absent(&existing).unwrap();

        let feed = ScriptedFeed::default();
        *feed.items.lock().unwrap() = vec![thumb("a"), thumb("b")];
        let blobs = Arc::new(FakeBlobStore::default());

        let mut ingestor = Ingestor::new(
            FeedPoller::new(&feed, 150),
            media(&blobs),
            store.clone(),
            &instant_config(),
        )
        .unwrap();
        assert_eq!(ingestor.known(), 1);

        let report = ingestor.run_cycle().await;
        assert_eq!(report.new, 1);
        let uploads = blobs.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, "posts/ig-b.jpg");
    }

    #[tokio::test]
    async fn test_failed_upload_is_retried_next_cycle() {
        let feed = ScriptedFeed::default();
        *feed.items.lock().unwrap() = vec![thumb("a")];
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let blobs = Arc::new(FakeBlobStore::default());
        *blobs.fail_next.lock().unwrap() = 1;

        let mut ingestor = Ingestor::new(
            FeedPoller::new(&feed, 150),
            media(&blobs),
            store.clone(),
            &instant_config(),
        )
        .unwrap();

        let first = ingestor.run_cycle().await;
        assert_eq!(first.failed, 1);
        assert_eq!(ingestor.known(), 0);
        assert!(store.get_post("ig-a").unwrap().is_none());

        let second = ingestor.run_cycle().await;
        assert_eq!(second.captured, 1);
        assert_eq!(ingestor.known(), 1);
        assert!(store.get_post("ig-a").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_url_leaves_post_unstored() {
        let feed = ScriptedFeed::default();
        *feed.items.lock().unwrap() = vec![thumb("a")];
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let blobs = Arc::new(FakeBlobStore::default());
        *blobs.no_url.lock().unwrap() = true;

        let mut ingestor = Ingestor::new(
            FeedPoller::new(&feed, 150),
            media(&blobs),
            store.clone(),
            &instant_config(),
        )
        .unwrap();

        let report = ingestor.run_cycle().await;
        assert_eq!(report.failed, 1);
        assert_eq!(ingestor.known(), 0);
        assert!(store.load_all_posts().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_gives_up_without_content() {
        let feed = ScriptedFeed::default();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let blobs = Arc::new(FakeBlobStore::default());

        let mut ingestor = Ingestor::new(
            FeedPoller::new(&feed, 150),
            media(&blobs),
            store,
            &instant_config(),
        )
        .unwrap();

        let stats = ingestor.run(&RunContext::new()).await;
        assert_eq!(stats, IngestStats::default());
        assert_eq!(feed.samples.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_loops_until_cancelled() {
        let ctx = RunContext::new();
        let feed = ScriptedFeed {
            stop_after: Some((3, ctx.clone())),
            ..Default::default()
        };
        *feed.items.lock().unwrap() = vec![thumb("a"), thumb("b")];
        *feed.count.lock().unwrap() = 2;
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let blobs = Arc::new(FakeBlobStore::default());

        let mut ingestor = Ingestor::new(
            FeedPoller::new(&feed, 150),
            media(&blobs),
            store.clone(),
            &instant_config(),
        )
        .unwrap();

        let stats = ingestor.run(&ctx).await;
        assert_eq!(stats.cycles, 3);
        assert_eq!(stats.captured, 2);
        assert_eq!(store.load_all_posts().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_wait_succeeds_once_grid_renders() {
        let feed = ScriptedFeed {
            empty_checks: 2,
            ..Default::default()
        };
        *feed.count.lock().unwrap() = 4;
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let blobs = Arc::new(FakeBlobStore::default());

        let ingestor = Ingestor::new(
            FeedPoller::new(&feed, 150),
            media(&blobs),
            store,
            &instant_config(),
        )
        .unwrap();

        assert!(ingestor.wait_for_content(&RunContext::new()).await);
        assert_eq!(feed.count_checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_content_wait() {
        let feed = ScriptedFeed::default();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let blobs = Arc::new(FakeBlobStore::default());
        let config = FeedConfig {
            content_wait_interval_secs: 3600,
            content_wait_attempts: 120,
            ..Default::default()
        };

        let ingestor =
            Ingestor::new(FeedPoller::new(&feed, 150), media(&blobs), store, &config).unwrap();
        let ctx = RunContext::new();

        let (found, _) = tokio::time::timeout(
            Duration::from_secs(5),
            async {
                tokio::join!(ingestor.wait_for_content(&ctx), async {
                    tokio::task::yield_now().await;
                    ctx.cancel();
                })
            },
        )
        .await
        .expect("cancel should end the wait");

        assert!(!found);
        assert!(feed.count_checks.load(Ordering::SeqCst) <= 1);
    }

    #[tokio::test]
    async fn test_session_closed_when_seeding_fails() {
        let (session, closes) = FakeSession::new(ScriptedFeed::default());
        let blobs = Arc::new(FakeBlobStore::default());

        let result = run_session(
            session,
            media(&blobs),
            Arc::new(BrokenStore),
            &instant_config(),
            &RunContext::new(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_closed_after_normal_run() {
        let (session, closes) = FakeSession::new(ScriptedFeed::default());
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let blobs = Arc::new(FakeBlobStore::default());

        let stats = run_session(
            session,
            media(&blobs),
            store,
            &instant_config(),
            &RunContext::new(),
        )
        .await
        .unwrap();

        assert_eq!(stats, IngestStats::default());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_failure_keeps_run_outcome() {
        let (mut session, closes) = FakeSession::new(ScriptedFeed::default());
        session.fail_close = true;
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let blobs = Arc::new(FakeBlobStore::default());

        let result = run_session(
            session,
            media(&blobs),
            store,
            &instant_config(),
            &RunContext::new(),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
