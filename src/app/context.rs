use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{PostlinkError, Result};
use crate::config::Config;
use crate::media::{HttpFetcher, ImageFetcher};
use crate::store::sqlite::SqliteStore;

/// Shared handles for every command: the post store, one HTTP client for
/// image downloads, and the loaded configuration.
pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn ImageFetcher + Send + Sync>,
    pub config: Config,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match config.store.path.clone() {
            Some(p) => {
                if let Some(parent) = p.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                p
            }
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let fetcher: Arc<dyn ImageFetcher + Send + Sync> = Arc::new(HttpFetcher::new());

        Ok(Self {
            store,
            fetcher,
            config,
        })
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        let fetcher: Arc<dyn ImageFetcher + Send + Sync> = Arc::new(HttpFetcher::new());

        Ok(Self {
            store,
            fetcher,
            config,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| PostlinkError::Config("Could not find data directory".into()))?;
        let postlink_dir = data_dir.join("postlink");
        std::fs::create_dir_all(&postlink_dir)?;
        Ok(postlink_dir.join("postlink.db"))
    }
}
