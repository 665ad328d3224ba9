use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Namespace prepended to every feed shortcode.
pub const POST_ID_PREFIX: &str = "ig-";

/// Captions longer than this many characters are cut.
pub const MAX_TITLE_CHARS: usize = 100;

/// Title used when the feed item carries no caption.
pub const PLACEHOLDER_TITLE: &str = "Instagram Post";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Image,
    Video,
}

impl PostType {
    /// Map the path segment preceding the shortcode (`p` or `reel`).
    pub fn from_path_kind(kind: &str) -> Self {
        if kind == "reel" {
            PostType::Video
        } else {
            PostType::Image
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Image => "image",
            PostType::Video => "video",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for PostType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PostType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "image" => Ok(PostType::Image),
            "video" => Ok(PostType::Video),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub url: String,
    pub image: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub timestamp: Option<DateTime<Utc>>,
    pub blog_url: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl Post {
    pub fn new(shortcode: &str, post_type: PostType, url: &str, image: &str) -> Self {
        Self {
            id: Self::id_for(shortcode),
            title: PLACEHOLDER_TITLE.to_string(),
            url: url.to_string(),
            image: image.to_string(),
            post_type,
            timestamp: None,
            blog_url: None,
            captured_at: Utc::now(),
        }
    }

    /// Build the stored identifier for a feed shortcode.
    pub fn id_for(shortcode: &str) -> String {
        format!("{}{}", POST_ID_PREFIX, shortcode)
    }

    /// Turn a raw caption into a stored title.
    ///
    /// Missing or blank captions fall back to [`PLACEHOLDER_TITLE`]; anything
    /// else is cut to [`MAX_TITLE_CHARS`] characters.
    pub fn title_from_caption(caption: Option<&str>) -> String {
        match caption {
            Some(c) if !c.is_empty() => c.chars().take(MAX_TITLE_CHARS).collect(),
            _ => PLACEHOLDER_TITLE.to_string(),
        }
    }

    pub fn with_caption(mut self, caption: Option<&str>) -> Self {
        self.title = Self::title_from_caption(caption);
        self
    }

    pub fn is_mapped(&self) -> bool {
        self.blog_url.is_some()
    }

    /// Whether `image` points at something the OCR engine can download.
    pub fn has_fetchable_image(&self) -> bool {
        self.image.starts_with("http")
    }
}
