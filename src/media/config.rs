//! Object storage configuration for mirrored post images.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Base URL for public access (CDN domain); virtual-hosted S3 URL when unset
    pub public_base_url: Option<String>,
    /// Custom endpoint for S3-compatible storage (MinIO, R2, ...)
    pub endpoint_url: Option<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            bucket: "postlink-media".to_string(),
            region: "us-east-1".to_string(),
            public_base_url: None,
            endpoint_url: None,
        }
    }
}

impl MediaConfig {
    /// Public URL under which an uploaded object is served.
    pub fn public_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }
}
