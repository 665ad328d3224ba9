//! Linking captured posts to catalog articles.
//!
//! Two stages per post, stopping at the first hit:
//!
//! ```text
//! post title ──contains──▶ article title      (Title match)
//!      │ no hit
//!      ▼
//! OCR(post image) ──contains──▶ article title (OCR match)
//! ```
//!
//! Containment is plain substring search over [`normalize`]d text. The first
//! eligible article in catalog order wins; there is no scoring, so two
//! unrelated articles whose titles overlap a caption resolve by order alone.

mod engine;
mod job;

pub use engine::{MatchEngine, MatchOutcome};
pub use job::{run_matching, MatchReport};

/// Normalized article titles must be longer than this to be matchable.
pub const MIN_TITLE_LEN: usize = 10;

/// Lowercase `text` and keep only `[a-z0-9 ]`.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | ' '))
        .collect()
}
