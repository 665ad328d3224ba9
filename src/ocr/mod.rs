//! Text extraction from post images.

mod tesseract;

pub use tesseract::TesseractOcr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::Result;

pub const DEFAULT_LANGUAGE: &str = "eng";

#[async_trait]
pub trait Ocr {
    /// Recognize the text in the image at `image_url`.
    async fn recognize(&self, image_url: &str, language: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract executable, looked up in PATH when not absolute
    pub command: String,
    /// Tesseract language pack
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: "tesseract".to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}
