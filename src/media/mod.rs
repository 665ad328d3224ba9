//! Mirroring of post images into object storage.
//!
//! ```text
//! image URL → ImageFetcher → bytes → BlobStore → public URL
//! ```

mod config;
mod fetch;
mod s3;

pub use config::MediaConfig;
pub use fetch::{HttpFetcher, ImageFetcher};
pub use s3::S3BlobStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;

/// Key namespace for mirrored post images.
pub const KEY_PREFIX: &str = "posts";

/// Every mirrored image is stored as JPEG.
pub const IMAGE_EXTENSION: &str = "jpg";
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

#[async_trait]
pub trait BlobStore {
    /// Store `bytes` under `key`.
    ///
    /// `Ok(None)` means the store accepted the call but produced no public URL.
    async fn store(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<Option<String>>;
}

/// Fetches a post's image and uploads it under a key derived from the post id.
#[derive(Clone)]
pub struct MediaIngestor {
    fetcher: Arc<dyn ImageFetcher + Send + Sync>,
    blobs: Arc<dyn BlobStore + Send + Sync>,
}

impl MediaIngestor {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher + Send + Sync>,
        blobs: Arc<dyn BlobStore + Send + Sync>,
    ) -> Self {
        Self { fetcher, blobs }
    }

    pub fn object_key(post_id: &str) -> String {
        format!("{}/{}.{}", KEY_PREFIX, post_id, IMAGE_EXTENSION)
    }

    /// Mirror the image for `post_id` and return its public URL.
    pub async fn ingest(&self, post_id: &str, image_url: &str) -> Result<Option<String>> {
        let bytes = self.fetcher.fetch(image_url).await?;
        let key = Self::object_key(post_id);

        tracing::info!(post_id, key = %key, bytes = bytes.len(), "Uploading image");
        let public_url = self.blobs.store(&key, bytes, IMAGE_CONTENT_TYPE).await?;

        if public_url.is_none() {
            tracing::warn!(post_id, key = %key, "Blob store returned no URL");
        }

        Ok(public_url)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;
    use crate::app::PostlinkError;

    /// Serves a fixed payload for every URL not listed in `broken`.
    #[derive(Default)]
    pub struct FakeFetcher {
        pub broken: Mutex<HashSet<String>>,
        pub calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(url.to_string());
            if self.broken.lock().unwrap().contains(url) {
                return Err(PostlinkError::Other(format!("unreachable: {}", url)));
            }
            Ok(vec![0xFF, 0xD8, 0xFF])
        }
    }

    /// Records uploads; `fail_next` rejects the given number of calls first.
    #[derive(Default)]
    pub struct FakeBlobStore {
        pub uploads: Mutex<Vec<(String, String)>>,
        pub fail_next: Mutex<usize>,
        pub no_url: Mutex<bool>,
    }

    #[async_trait]
    impl BlobStore for FakeBlobStore {
        async fn store(
            &self,
            key: &str,
            _bytes: Vec<u8>,
            content_type: &str,
        ) -> Result<Option<String>> {
            {
                let mut fail = self.fail_next.lock().unwrap();
                if *fail > 0 {
                    *fail -= 1;
                    return Err(PostlinkError::BlobStore("injected failure".into()));
                }
            }
            self.uploads
                .lock()
                .unwrap()
                .push((key.to_string(), content_type.to_string()));
            if *self.no_url.lock().unwrap() {
                return Ok(None);
            }
            Ok(Some(format!("https://blobs.example.com/{}", key)))
        }
    }
}
