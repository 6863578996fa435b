//! HTTP render engine.
//!
//! Delegates rendering to an upstream service:
//!
//! ```text
//! POST {upstream}/render         {page, status, request} → RenderedPage
//! POST {upstream}/render-static  {page, request}         → StaticRender
//! ```
//!
//! Transient failures are retried with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::backend::{RenderEngine, RenderError, RenderedPage, StaticRender};
use crate::config::RenderConfig;
use crate::edge::EdgeRequest;
use crate::resilience::{is_retryable, RetryPolicy};

#[derive(Serialize)]
struct RenderCall<'a> {
    page: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    request: &'a EdgeRequest,
}

pub struct HttpRenderEngine {
    client: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl HttpRenderEngine {
    pub fn new(config: &RenderConfig) -> Result<Self, RenderError> {
        let mut base_url = Url::parse(&config.upstream_url)
            .map_err(|e| RenderError::Upstream(format!("invalid upstream url: {e}")))?;
        // Endpoints join relative to the base, which must end in `/` to keep its path
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RenderError::Upstream(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            retry: RetryPolicy::from(config),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RenderError> {
        self.base_url
            .join(path)
            .map_err(|e| RenderError::Upstream(format!("invalid endpoint {path}: {e}")))
    }

    async fn call<T: DeserializeOwned>(&self, path: &str, body: &RenderCall<'_>) -> Result<T, RenderError> {
        let url = self.endpoint(path)?;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let (error, retryable) = match self.client.post(url.clone()).json(body).send().await {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json::<T>()
                        .await
                        .map_err(|e| RenderError::InvalidResponse(e.to_string()));
                }
                Ok(response) => {
                    let status = response.status();
                    (RenderError::Status(status.as_u16()), is_retryable(Some(status), false))
                }
                Err(e) => {
                    let connection_error = e.is_connect() || e.is_timeout();
                    let status = e.status().and_then(|s| StatusCode::from_u16(s.as_u16()).ok());
                    (RenderError::Upstream(e.to_string()), is_retryable(status, connection_error))
                }
            };

            if !(retryable && self.retry.should_retry(attempt)) {
                return Err(error);
            }

            let delay = self.retry.delay(attempt);
            tracing::info!(page = body.page, attempt, delay = ?delay, error = %error, "Retrying render");
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RenderEngine for HttpRenderEngine {
    async fn render(
        &self,
        page: &str,
        request: &EdgeRequest,
        status: u16,
    ) -> Result<RenderedPage, RenderError> {
        self.call(
            "render",
            &RenderCall {
                page,
                status: Some(status),
                request,
            },
        )
        .await
    }

    async fn render_static(&self, page: &str, request: &EdgeRequest) -> Result<StaticRender, RenderError> {
        self.call(
            "render-static",
            &RenderCall {
                page,
                status: None,
                request,
            },
        )
        .await
    }
}
