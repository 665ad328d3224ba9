use std::sync::Arc;

use crate::app::{AppContext, Result};
use crate::feed::{ChromeSession, SessionMode};
use crate::ingest::{run_session, RunContext};
use crate::matcher::run_matching;
use crate::media::{MediaIngestor, S3BlobStore};
use crate::ocr::TesseractOcr;
use crate::store::Store;

/// Run the capture loop until SIGINT/SIGTERM.
///
/// The browser is closed on every exit path so the profile directory is
/// released for the next run.
pub async fn ingest(ctx: &AppContext) -> Result<()> {
    let feed_config = &ctx.config.feed;
    let blobs = S3BlobStore::new(ctx.config.media.clone()).await;
    let media = MediaIngestor::new(ctx.fetcher.clone(), Arc::new(blobs));

    let session = ChromeSession::launch(feed_config, SessionMode::detect()).await?;
    let run = RunContext::new();
    let signals = run.cancel_on_signal();

    let outcome = run_session(session, media, ctx.store.clone(), feed_config, &run).await;
    signals.abort();

    let stats = outcome?;
    println!(
        "Stopped after {} cycles: {} posts captured, {} failed",
        stats.cycles, stats.captured, stats.failed
    );
    Ok(())
}

/// One matching pass over every unmapped post.
pub async fn map(ctx: &AppContext) -> Result<()> {
    let ocr = TesseractOcr::new(&ctx.config.ocr, ctx.fetcher.clone());
    let report = run_matching(ctx.store.as_ref(), &ocr, &ctx.config.ocr.language).await?;

    println!(
        "Scanned {} posts: {} linked by title, {} by OCR, {} OCR failures, {} unmatched",
        report.scanned,
        report.title_matches,
        report.ocr_matches,
        report.ocr_failures,
        report.unmatched
    );
    Ok(())
}

pub fn list_posts(ctx: &AppContext, unmapped_only: bool) -> Result<()> {
    let posts = if unmapped_only {
        ctx.store.load_unmapped_posts()?
    } else {
        ctx.store.load_all_posts()?
    };

    if posts.is_empty() {
        println!("No posts");
        return Ok(());
    }

    for post in posts {
        let link = post.blog_url.as_deref().unwrap_or("-");
        println!(
            "{} {:<5} {} {}\n  {}",
            post.captured_at.format("%Y-%m-%d"),
            post.post_type.as_str(),
            post.id,
            post.title,
            link
        );
    }

    Ok(())
}
