//! CDN invalidation clients.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::backend::{CacheInvalidator, InvalidationError};

#[derive(Serialize)]
struct InvalidationBatch<'a> {
    paths: [&'a str; 1],
}

/// Posts `{"paths": [path]}` to a webhook.
pub struct WebhookInvalidator {
    client: reqwest::Client,
    url: String,
}

impl WebhookInvalidator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, InvalidationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InvalidationError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CacheInvalidator for WebhookInvalidator {
    async fn invalidate(&self, path: &str) -> Result<(), InvalidationError> {
        let response = self
            .client
            .post(&self.url)
            .json(&InvalidationBatch { paths: [path] })
            .send()
            .await
            .map_err(|e| InvalidationError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(InvalidationError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Logs the invalidation and does nothing else.
#[derive(Debug, Default)]
pub struct NoopInvalidator;

#[async_trait]
impl CacheInvalidator for NoopInvalidator {
    async fn invalidate(&self, path: &str) -> Result<(), InvalidationError> {
        tracing::info!(path, "Invalidation requested (no invalidation endpoint configured)");
        Ok(())
    }
}
