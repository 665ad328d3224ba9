use tracing::{debug, warn};

use crate::domain::{Article, Post};
use crate::matcher::{normalize, MIN_TITLE_LEN};
use crate::ocr::Ocr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome<'a> {
    /// The caption contains the article title.
    Title(&'a Article),
    /// Text recognized in the image contains the article title.
    Ocr(&'a Article),
    /// No caption hit and the OCR engine failed on the image.
    OcrFailed,
    NoMatch,
}

impl<'a> MatchOutcome<'a> {
    pub fn article(&self) -> Option<&'a Article> {
        match self {
            MatchOutcome::Title(a) | MatchOutcome::Ocr(a) => Some(a),
            MatchOutcome::OcrFailed | MatchOutcome::NoMatch => None,
        }
    }
}

/// Read-only matcher over an article catalog.
///
/// Titles are normalized once up front and articles at or below
/// [`MIN_TITLE_LEN`] are left out; catalog order is preserved.
pub struct MatchEngine {
    catalog: Vec<(String, Article)>,
}

impl MatchEngine {
    pub fn new(articles: Vec<Article>) -> Self {
        let catalog = articles
            .into_iter()
            .filter_map(|article| {
                let title = normalize(&article.title);
                (title.len() > MIN_TITLE_LEN).then_some((title, article))
            })
            .collect();

        Self { catalog }
    }

    /// Number of articles eligible as match targets.
    pub fn eligible(&self) -> usize {
        self.catalog.len()
    }

    /// First eligible article whose normalized title occurs in `text`.
    pub fn find(&self, text: &str) -> Option<&Article> {
        let text = normalize(text);
        self.catalog
            .iter()
            .find(|(title, _)| text.contains(title.as_str()))
            .map(|(_, article)| article)
    }

    pub async fn match_post(
        &self,
        post: &Post,
        ocr: &(dyn Ocr + Send + Sync),
        language: &str,
    ) -> MatchOutcome<'_> {
        if let Some(article) = self.find(&post.title) {
            return MatchOutcome::Title(article);
        }

        if !post.has_fetchable_image() || self.catalog.is_empty() {
            return MatchOutcome::NoMatch;
        }

        debug!(post_id = %post.id, "Running OCR");
        match ocr.recognize(&post.image, language).await {
            Ok(text) => match self.find(&text) {
                Some(article) => MatchOutcome::Ocr(article),
                None => MatchOutcome::NoMatch,
            },
            Err(e) => {
                warn!(post_id = %post.id, "OCR failed: {}", e);
                MatchOutcome::OcrFailed
            }
        }
    }
}
