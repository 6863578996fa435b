//! Edge hook subsystem.
//!
//! # Data Flow
//! ```text
//! origin-request:
//!     NormalizedUri → RedirectPolicy (308 / locale 307)
//!     → static page | fallback page | public file   → forward to object store
//!     → data request                                → forward, 404 page, or render
//!     → RouteMatcher → .html page                   → forward to object store
//!                    → otherwise                    → RenderEngine → response
//!
//! origin-response:
//!     403 (object missing) → render data payload + persist | fallback page | pass
//!     other                → 404 remap
//!     200                  → RegenerationGate → RegenerationDispatcher
//!                          → InvalidationGroupTracker
//! ```
//!
//! # Design Decisions
//! - Manifests are an explicit `Arc<ManifestSet>`, never global state
//! - Regeneration and invalidation failures are logged, never surfaced
//! - The origin-request hook is infallible: render failures end in an error page

pub mod event;
pub mod headers;
pub mod origin;
mod origin_request;
mod origin_response;

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::backend::{Backends, InvalidationError, RenderError, StoreError};
use crate::invalidation::InvalidationGroupTracker;
use crate::manifest::ManifestSet;
use crate::regeneration::{RegenerationDispatcher, RegenerationError};
use crate::routing::RedirectPolicy;

pub use event::{
    CfRecord, CloudFrontEvent, EdgeRequest, EdgeResponse, EventConfig, EventRecord, EventType,
    HookOutcome, Origin, S3Origin,
};
pub use headers::{HeaderEntry, Headers};

#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("event contains no records")]
    EmptyEvent,

    #[error("origin-response event carries no response")]
    MissingResponse,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Regeneration(#[from] RegenerationError),

    #[error(transparent)]
    Invalidation(#[from] InvalidationError),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Origin-request and origin-response hooks over one manifest set.
pub struct EdgeHandler {
    manifests: Arc<ManifestSet>,
    backends: Backends,
    dispatcher: RegenerationDispatcher,
    invalidation: InvalidationGroupTracker,
    redirects: RedirectPolicy,
}

impl EdgeHandler {
    pub fn new(manifests: Arc<ManifestSet>, backends: Backends) -> Self {
        let redirects = RedirectPolicy::new(manifests.build.trailing_slash);
        let dispatcher = RegenerationDispatcher::new(backends.queue.clone());

        Self {
            manifests,
            backends,
            dispatcher,
            invalidation: InvalidationGroupTracker::default(),
            redirects,
        }
    }

    /// Regeneration queue name; defaults to `<bucket>.fifo`.
    pub fn with_queue_name(mut self, queue_name: Option<String>) -> Self {
        self.dispatcher = self.dispatcher.with_queue_name(queue_name);
        self
    }

    pub fn with_invalidation_groups(mut self, tracker: InvalidationGroupTracker) -> Self {
        self.invalidation = tracker;
        self
    }

    pub fn manifests(&self) -> &ManifestSet {
        &self.manifests
    }

    /// Run the hook named by the event's type.
    pub async fn handle_event(&self, event: CloudFrontEvent) -> Result<HookOutcome, EdgeError> {
        let record = event.into_record()?;

        match record.config.event_type {
            EventType::OriginRequest => Ok(self.handle_origin_request(record.request).await),
            EventType::OriginResponse => {
                let response = record.response.ok_or(EdgeError::MissingResponse)?;
                self.handle_origin_response(record.request, response)
                    .await
                    .map(HookOutcome::Response)
            }
        }
    }

    fn log_timing(&self, description: &str, started: Instant) {
        if self.manifests.build.log_lambda_execution_times {
            tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "{description}"
            );
        }
    }
}
