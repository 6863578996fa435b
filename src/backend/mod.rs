//! External collaborators.
//!
//! # Data Flow
//! ```text
//! edge handlers
//!     → ObjectStore      (static pages, regenerated output, invalidation counters)
//!     → RegenerationQueue (deduplicated regeneration jobs)
//!     → RenderEngine     (server-side rendering of a page identifier)
//!     → CacheInvalidator (CDN path invalidation)
//! ```
//!
//! # Design Decisions
//! - Each collaborator is an object-safe async trait shared as `Arc<dyn _>`
//! - The core never inspects how a page identifier is rendered
//! - Throttling is a tagged error variant, classified by provider code

pub mod invalidator;
pub mod queue;
pub mod render;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::edge::{EdgeRequest, Headers};

pub use invalidator::{NoopInvalidator, WebhookInvalidator};
pub use queue::MemoryQueue;
pub use render::HttpRenderEngine;
pub use store::MemoryObjectStore;

// --- Object store ---

/// An object as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub last_modified: DateTime<Utc>,
    /// Quoted content fingerprint, as object stores report it.
    pub etag: String,
}

/// An object to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: Option<String>,
    pub expires: Option<DateTime<Utc>>,
}

impl PutObject {
    pub fn new(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
            cache_control: None,
            expires: None,
        }
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    pub fn with_expires(mut self, expires: Option<DateTime<Utc>>) -> Self {
        self.expires = expires;
        self
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError>;
    async fn put(&self, key: &str, object: PutObject) -> Result<(), StoreError>;
}

// --- Regeneration queue ---

/// A message addressed to a FIFO queue with deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub queue_url: String,
    pub body: String,
    pub deduplication_id: String,
    pub group_id: String,
}

/// Provider error codes that mean "slow down", not "broken".
const THROTTLE_CODES: &[&str] = &["RequestThrottled", "ThrottlingException", "Throttling"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The provider rate-limited the send.
    #[error("queue send throttled ({code})")]
    Throttled { code: String },

    #[error("queue send failed: {0}")]
    Other(String),
}

impl QueueError {
    /// Classify a provider error by its code.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        if THROTTLE_CODES.contains(&code) {
            QueueError::Throttled {
                code: code.to_string(),
            }
        } else {
            QueueError::Other(message.into())
        }
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, QueueError::Throttled { .. })
    }
}

#[async_trait]
pub trait RegenerationQueue: Send + Sync {
    async fn send(&self, message: QueueMessage) -> Result<(), QueueError>;
}

// --- Render engine ---

/// A server-rendered response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPage {
    pub status: u16,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: String,
}

/// Output of rendering a page for storage rather than for a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticRender {
    pub html: String,
    #[serde(default)]
    pub page_data: serde_json::Value,
    /// Revalidation window reported by the page, if it regenerates.
    #[serde(default)]
    pub revalidate: Option<u64>,
    /// Whether the page is statically generated (and so worth persisting).
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render upstream request failed: {0}")]
    Upstream(String),

    #[error("render upstream returned status {0}")]
    Status(u16),

    #[error("invalid render response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Render `page` for a client; `status` is the status the page should carry.
    async fn render(
        &self,
        page: &str,
        request: &EdgeRequest,
        status: u16,
    ) -> Result<RenderedPage, RenderError>;

    /// Render `page` to HTML plus its data payload.
    async fn render_static(&self, page: &str, request: &EdgeRequest)
        -> Result<StaticRender, RenderError>;
}

// --- Cache invalidation ---

#[derive(Debug, Error)]
pub enum InvalidationError {
    #[error("invalidation request failed: {0}")]
    Request(String),

    #[error("invalidation endpoint returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, path: &str) -> Result<(), InvalidationError>;
}

/// The collaborator set handed to the edge handler.
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn ObjectStore>,
    pub queue: Arc<dyn RegenerationQueue>,
    pub render: Arc<dyn RenderEngine>,
    pub invalidator: Arc<dyn CacheInvalidator>,
}
