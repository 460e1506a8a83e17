//! 对象存储客户端
//!
//! `PUT {endpoint}/{bucket}/{key}.png`，成功后返回 `{public_base_url}/{key}.png`。

use super::ObjectStorage;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use tracing::debug;

pub struct HttpObjectStorage {
    http: reqwest::Client,
    endpoint: String,
    bucket: String,
    public_base_url: String,
    token: String,
}

impl HttpObjectStorage {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.storage_endpoint.trim_end_matches('/').to_string(),
            bucket: config.storage_bucket.clone(),
            public_base_url: config.storage_public_base_url.trim_end_matches('/').to_string(),
            token: config.storage_token.clone(),
        }
    }

    fn object_name(key: &str) -> String {
        format!("{}.png", key)
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, Self::object_name(key))
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(&self, image: Vec<u8>, key: &str) -> Result<String> {
        let upload_error = |reason: String| PipelineError::UploadFailure {
            key: key.to_string(),
            reason,
        };

        let url = format!("{}/{}/{}", self.endpoint, self.bucket, Self::object_name(key));
        let mut request = self
            .http
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(image);
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| upload_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(upload_error(format!("HTTP {}", response.status())));
        }

        let public_url = self.public_url(key);
        debug!("配图已上传: {}", public_url);
        Ok(public_url)
    }
}
