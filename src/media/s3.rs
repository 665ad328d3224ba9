use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::app::{PostlinkError, Result};
use crate::media::{BlobStore, MediaConfig};

/// S3-backed blob store for mirrored images
pub struct S3BlobStore {
    client: Client,
    config: MediaConfig,
}

impl S3BlobStore {
    /// Build the client from the default AWS credential chain.
    pub async fn new(config: MediaConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint_url.is_some())
            .build();

        Self {
            client: Client::from_conf(s3_config),
            config,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn store(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<Option<String>> {
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| PostlinkError::BlobStore(format!("put_object {}: {}", key, e)))?;

        Ok(Some(self.config.public_url(key)))
    }
}
