use tracing::{info, warn};

use crate::app::Result;
use crate::matcher::{MatchEngine, MatchOutcome};
use crate::ocr::Ocr;
use crate::store::Store;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    pub scanned: usize,
    pub title_matches: usize,
    pub ocr_matches: usize,
    pub ocr_failures: usize,
    pub unmatched: usize,
}

impl MatchReport {
    pub fn linked(&self) -> usize {
        self.title_matches + self.ocr_matches
    }
}

/// Single pass over every unmapped post.
///
/// The catalog is loaded once and held for the whole run. OCR failures are
/// counted and the post stays unmapped; a failed `set_blog_url` aborts.
pub async fn run_matching<S: Store + ?Sized>(
    store: &S,
    ocr: &(dyn Ocr + Send + Sync),
    language: &str,
) -> Result<MatchReport> {
    let articles = store.load_articles()?;
    info!("Loaded {} articles", articles.len());
    let engine = MatchEngine::new(articles);

    let posts = store.load_unmapped_posts()?;
    info!("Analyzing {} unmapped posts", posts.len());

    let mut report = MatchReport::default();

    for post in &posts {
        report.scanned += 1;

        let outcome = engine.match_post(post, ocr, language).await;
        match outcome {
            MatchOutcome::Title(article) => {
                info!(post_id = %post.id, "Title match: linked to \"{}\"", article.title);
                store.set_blog_url(&post.id, &article.url)?;
                report.title_matches += 1;
            }
            MatchOutcome::Ocr(article) => {
                info!(post_id = %post.id, "OCR match: linked to \"{}\"", article.title);
                store.set_blog_url(&post.id, &article.url)?;
                report.ocr_matches += 1;
            }
            MatchOutcome::OcrFailed => {
                warn!(post_id = %post.id, "Left unmapped after OCR failure");
                report.ocr_failures += 1;
            }
            MatchOutcome::NoMatch => {
                info!(post_id = %post.id, "No match found");
                report.unmatched += 1;
            }
        }
    }

    Ok(report)
}
