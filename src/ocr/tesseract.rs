use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::app::{PostlinkError, Result};
use crate::media::ImageFetcher;
use crate::ocr::{Ocr, OcrConfig};

/// Runs the `tesseract` CLI on downloaded image bytes.
///
/// The image is piped through stdin and the text read back from stdout, so
/// nothing touches the filesystem.
pub struct TesseractOcr {
    fetcher: Arc<dyn ImageFetcher + Send + Sync>,
    command: String,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig, fetcher: Arc<dyn ImageFetcher + Send + Sync>) -> Self {
        Self {
            fetcher,
            command: config.command.clone(),
        }
    }

    async fn run(&self, image: Vec<u8>, language: &str) -> Result<String> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PostlinkError::Ocr(format!("Failed to start {}: {}", self.command, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&image).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(PostlinkError::Ocr(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Ocr for TesseractOcr {
    async fn recognize(&self, image_url: &str, language: &str) -> Result<String> {
        let image = self.fetcher.fetch(image_url).await?;
        self.run(image, language).await
    }
}
