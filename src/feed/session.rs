use std::env;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::app::{PostlinkError, Result};
use crate::feed::config::FeedConfig;
use crate::feed::script::FeedScripts;
use crate::feed::{FeedSession, FeedSnapshot, VisibleItem};

/// Resource profile for the browser, chosen from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Interactive,
    /// Small servers: always headless, single process, no zygote.
    Constrained,
}

impl SessionMode {
    /// `POSTLINK_ENV=production` or running as the `ubuntu` user selects
    /// [`SessionMode::Constrained`].
    pub fn detect() -> Self {
        Self::from_vars(
            env::var("POSTLINK_ENV").ok().as_deref(),
            env::var("USER").ok().as_deref(),
        )
    }

    pub fn from_vars(postlink_env: Option<&str>, user: Option<&str>) -> Self {
        if postlink_env == Some("production") || user == Some("ubuntu") {
            SessionMode::Constrained
        } else {
            SessionMode::Interactive
        }
    }

    fn extra_args(&self) -> &'static [&'static str] {
        match self {
            SessionMode::Interactive => &[],
            SessionMode::Constrained => &[
                "--disable-accelerated-2d-canvas",
                "--no-first-run",
                "--no-zygote",
                "--single-process",
            ],
        }
    }
}

/// Headless Chrome with a persistent profile, parked on the feed page.
///
/// The profile directory holds the logged-in session and is locked by Chrome
/// while the browser runs; call [`FeedSession::close`] on every exit path.
/// A launch that fails after the browser started tears it down itself.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    scripts: FeedScripts,
}

impl ChromeSession {
    pub async fn launch(config: &FeedConfig, mode: SessionMode) -> Result<Self> {
        let session_dir = config
            .resolved_session_dir()
            .ok_or_else(|| PostlinkError::Config("Could not determine session directory".into()))?;
        std::fs::create_dir_all(&session_dir)?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&session_dir)
            .window_size(config.window_width, config.window_height)
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");

        for arg in mode.extra_args() {
            builder = builder.arg(*arg);
        }

        if !config.headless && mode == SessionMode::Interactive {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| PostlinkError::Session(format!("Failed to build browser config: {}", e)))?;

        info!(?mode, dir = %session_dir.display(), "Launching browser");
        let (mut browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            PostlinkError::Session(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {
                // Drive the CDP connection
            }
        });

        match open_feed_page(&browser, config).await {
            Ok(page) => Ok(Self {
                browser,
                page,
                handler,
                scripts: FeedScripts::new(),
            }),
            Err(e) => {
                if let Err(close_err) = teardown(&mut browser, &handler).await {
                    warn!("{}", close_err);
                }
                Err(e)
            }
        }
    }
}

async fn open_feed_page(browser: &Browser, config: &FeedConfig) -> Result<Page> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| PostlinkError::Session(format!("Failed to create page: {}", e)))?;

    if let Some(ref ua) = config.user_agent {
        page.set_user_agent(ua)
            .await
            .map_err(|e| PostlinkError::Session(format!("Failed to set user agent: {}", e)))?;
    }

    info!(url = %config.profile_url, "Navigating to feed");
    page.goto(config.profile_url.as_str())
        .await
        .map_err(|e| PostlinkError::Session(format!("Navigation failed: {}", e)))?;

    Ok(page)
}

/// Close the browser, reap the process and stop the CDP handler task.
async fn teardown(browser: &mut Browser, handler: &JoinHandle<()>) -> Result<()> {
    let closed = browser
        .close()
        .await
        .map(|_| ())
        .map_err(|e| PostlinkError::Session(format!("Failed to close browser: {}", e)));

    if let Err(e) = browser.wait().await {
        warn!("Waiting for browser exit failed: {}", e);
    }
    handler.abort();

    info!("Browser session closed");
    closed
}

#[async_trait]
impl FeedSession for ChromeSession {
    /// Shut the browser down and release the profile directory.
    async fn close(&mut self) -> Result<()> {
        teardown(&mut self.browser, &self.handler).await
    }
}

#[async_trait]
impl FeedSnapshot for ChromeSession {
    async fn current_visible_items(&self) -> Result<Vec<VisibleItem>> {
        let items: Vec<VisibleItem> = self
            .page
            .evaluate(self.scripts.visible_items_script())
            .await
            .map_err(|e| PostlinkError::Session(format!("Script execution failed: {}", e)))?
            .into_value()
            .map_err(|e| PostlinkError::Session(format!("Failed to parse result: {:?}", e)))?;

        Ok(items)
    }

    async fn visible_post_count(&self) -> Result<usize> {
        let count: usize = self
            .page
            .evaluate(self.scripts.post_count_script())
            .await
            .map_err(|e| PostlinkError::Session(format!("Script execution failed: {}", e)))?
            .into_value()
            .map_err(|e| PostlinkError::Session(format!("Failed to parse result: {:?}", e)))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_environment() {
        assert_eq!(
            SessionMode::from_vars(Some("production"), None),
            SessionMode::Constrained
        );
        assert_eq!(
            SessionMode::from_vars(None, Some("ubuntu")),
            SessionMode::Constrained
        );
        assert_eq!(
            SessionMode::from_vars(Some("development"), Some("alice")),
            SessionMode::Interactive
        );
        assert_eq!(SessionMode::from_vars(None, None), SessionMode::Interactive);
    }

    #[test]
    fn test_constrained_mode_adds_low_resource_flags() {
        assert!(SessionMode::Interactive.extra_args().is_empty());
        assert!(SessionMode::Constrained
            .extra_args()
            .contains(&"--single-process"));
    }
}
