//! Regeneration job dispatch.
//!
//! # Responsibilities
//! - Build the queue message from the served request and response headers
//! - Derive the deduplication id from the freshness fingerprint
//! - Report throttling as a soft outcome
//!
//! # Design Decisions
//! - Dedup id: ETag, else last-modified epoch milliseconds, else page path.
//!   Identical across invocations that observe the same stored object
//! - Group id: MD5 of the origin uri, so jobs for one page serialize

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{QueueError, QueueMessage, RegenerationQueue};
use crate::edge::headers::parse_http_date;
use crate::edge::origin::bucket_and_region;
use crate::edge::EdgeRequest;
use crate::regeneration::{md5_hex, RegenerationError};

/// Queue message body consumed by the regeneration worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerationMessage {
    pub region: String,
    pub bucket_name: String,
    pub cloud_front_event_request: EdgeRequest,
    pub base_path: String,
    /// Page identifier to render (`pages/isr.js`).
    pub page_path: String,
}

/// What the origin-response handler knows when a page goes stale.
#[derive(Debug, Clone, Copy)]
pub struct RegenerationContext<'a> {
    pub request: &'a EdgeRequest,
    pub etag: Option<&'a str>,
    pub last_modified: Option<&'a str>,
    pub base_path: &'a str,
    pub page_path: &'a str,
}

/// A fully addressed regeneration job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerationJob {
    pub message: RegenerationMessage,
    pub deduplication_key: String,
    pub grouping_key: String,
}

impl RegenerationJob {
    /// Fails only when the origin does not identify a bucket and region.
    pub fn new(ctx: &RegenerationContext<'_>) -> Result<Self, RegenerationError> {
        let (bucket_name, region) = bucket_and_region(ctx.request)?;

        Ok(Self {
            message: RegenerationMessage {
                region,
                bucket_name,
                cloud_front_event_request: ctx.request.clone(),
                base_path: ctx.base_path.to_string(),
                page_path: ctx.page_path.to_string(),
            },
            deduplication_key: deduplication_key(ctx),
            grouping_key: md5_hex(&ctx.request.uri),
        })
    }
}

fn deduplication_key(ctx: &RegenerationContext<'_>) -> String {
    if let Some(etag) = ctx.etag.filter(|e| !e.is_empty()) {
        return etag.to_string();
    }

    match ctx.last_modified.and_then(parse_http_date) {
        Some(at) => at.timestamp_millis().to_string(),
        None => ctx.page_path.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegenerationOutcome {
    pub throttled: bool,
}

/// Sends regeneration jobs to the queue.
#[derive(Clone)]
pub struct RegenerationDispatcher {
    queue: Arc<dyn RegenerationQueue>,
    queue_name: Option<String>,
}

impl RegenerationDispatcher {
    pub fn new(queue: Arc<dyn RegenerationQueue>) -> Self {
        Self {
            queue,
            queue_name: None,
        }
    }

    /// Override the default `<bucket>.fifo` queue name.
    pub fn with_queue_name(mut self, queue_name: Option<String>) -> Self {
        self.queue_name = queue_name.filter(|name| !name.is_empty());
        self
    }

    pub fn queue_url(&self, job: &RegenerationJob) -> String {
        let queue_name = match &self.queue_name {
            Some(name) => name.clone(),
            None => format!("{}.fifo", job.message.bucket_name),
        };
        format!("https://sqs.{}.amazonaws.com/{queue_name}", job.message.region)
    }

    /// Enqueue a regeneration job.
    ///
    /// Throttling yields `Ok(throttled: true)`; any other queue error is
    /// returned unchanged.
    pub async fn trigger(
        &self,
        ctx: &RegenerationContext<'_>,
    ) -> Result<RegenerationOutcome, RegenerationError> {
        let job = RegenerationJob::new(ctx)?;
        let body = serde_json::to_string(&job.message).map_err(RegenerationError::Encode)?;

        let message = QueueMessage {
            queue_url: self.queue_url(&job),
            body,
            deduplication_id: job.deduplication_key.clone(),
            group_id: job.grouping_key.clone(),
        };

        match self.queue.send(message).await {
            Ok(()) => {
                tracing::info!(
                    page = %job.message.page_path,
                    dedup_id = %job.deduplication_key,
                    group_id = %job.grouping_key,
                    "Regeneration enqueued"
                );
                Ok(RegenerationOutcome { throttled: false })
            }
            Err(QueueError::Throttled { code }) => {
                tracing::warn!(page = %job.message.page_path, code = %code, "Regeneration enqueue throttled");
                Ok(RegenerationOutcome { throttled: true })
            }
            Err(err) => Err(err.into()),
        }
    }
}
