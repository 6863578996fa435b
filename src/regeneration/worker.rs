//! Regeneration worker.
//!
//! # Responsibilities
//! - Consume queued regeneration messages
//! - Render the page statically and write HTML + JSON back to the store
//! - Stamp regenerated objects with `Expires` so the gate sees their window
//!
//! # Design Decisions
//! - One message at a time; ordering within a page comes from the group id
//! - A failed message is logged and dropped; the next stale hit re-enqueues it

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{broadcast, mpsc};

use crate::backend::{ObjectStore, PutObject, QueueMessage, RenderEngine, StaticRender};
use crate::edge::origin::{object_key, STATIC_PAGES_PREFIX};
use crate::manifest::ManifestSet;
use crate::observability::metrics;
use crate::regeneration::{RegenerationError, RegenerationMessage};
use crate::routing::normalize::{page_path_for_object, DATA_REQUEST_PREFIX};

/// Cache control of pages written back to the store.
pub const STORED_PAGE_CACHE_CONTROL: &str = "public, max-age=0, s-maxage=2678400, must-revalidate";

/// Store keys of one page's HTML and data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageKeys {
    pub html: String,
    pub json: String,
}

impl PageKeys {
    /// Keys for a page path (`/` maps to `/index`).
    pub fn new(base_path: &str, build_id: &str, page_uri: &str) -> Self {
        let page = if page_uri == "/" { "/index" } else { page_uri };
        Self {
            html: object_key(base_path, STATIC_PAGES_PREFIX, &format!("{page}.html")),
            json: format!("{base_path}{DATA_REQUEST_PREFIX}/{build_id}{page}.json")
                .trim_start_matches('/')
                .to_string(),
        }
    }
}

/// Write a statically rendered page and its data payload.
pub(crate) async fn persist_page(
    store: &dyn ObjectStore,
    keys: &PageKeys,
    render: &StaticRender,
    expires: Option<DateTime<Utc>>,
) -> Result<(), RegenerationError> {
    let page_data = serde_json::to_vec(&render.page_data).map_err(RegenerationError::Encode)?;

    store
        .put(
            &keys.json,
            PutObject::new(page_data, "application/json").with_expires(expires),
        )
        .await?;
    store
        .put(
            &keys.html,
            PutObject::new(render.html.clone(), "text/html")
                .with_cache_control(STORED_PAGE_CACHE_CONTROL)
                .with_expires(expires),
        )
        .await?;

    Ok(())
}

pub struct RegenerationWorker {
    manifests: Arc<ManifestSet>,
    store: Arc<dyn ObjectStore>,
    render: Arc<dyn RenderEngine>,
}

impl RegenerationWorker {
    pub fn new(
        manifests: Arc<ManifestSet>,
        store: Arc<dyn ObjectStore>,
        render: Arc<dyn RenderEngine>,
    ) -> Self {
        Self {
            manifests,
            store,
            render,
        }
    }

    /// Regenerate the page named by `message`.
    ///
    /// Returns the written keys, or `None` when the page turned out not to be
    /// statically generated.
    pub async fn process(
        &self,
        message: &QueueMessage,
        now: DateTime<Utc>,
    ) -> Result<Option<PageKeys>, RegenerationError> {
        let job: RegenerationMessage =
            serde_json::from_str(&message.body).map_err(RegenerationError::Decode)?;
        let build_id = &self.manifests.build.build_id;
        let page_uri = page_path_for_object(&job.cloud_front_event_request.uri, &job.base_path, build_id);

        let render = self
            .render
            .render_static(&job.page_path, &job.cloud_front_event_request)
            .await?;

        if !render.is_static {
            tracing::warn!(page = %job.page_path, "Page is no longer statically generated, skipping");
            return Ok(None);
        }

        let revalidate = render
            .revalidate
            .or_else(|| self.manifests.revalidate_seconds(&page_uri));
        let expires = revalidate
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| now.checked_add_signed(Duration::seconds(secs)));

        let keys = PageKeys::new(&job.base_path, build_id, &page_uri);
        persist_page(self.store.as_ref(), &keys, &render, expires).await?;

        tracing::info!(
            page = %job.page_path,
            html_key = %keys.html,
            revalidate = ?revalidate,
            "Page regenerated"
        );
        Ok(Some(keys))
    }

    /// Process messages until the channel closes or shutdown is signalled.
    pub async fn run(
        self,
        mut messages: mpsc::Receiver<QueueMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!("Regeneration worker started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Regeneration worker shutting down");
                    break;
                }
                message = messages.recv() => {
                    let Some(message) = message else {
                        tracing::info!("Regeneration queue closed");
                        break;
                    };
                    match self.process(&message, Utc::now()).await {
                        Ok(Some(_)) => metrics::record_regeneration("completed"),
                        Ok(None) => metrics::record_regeneration("skipped"),
                        Err(e) => {
                            tracing::error!(
                                dedup_id = %message.deduplication_id,
                                error = %e,
                                "Regeneration failed"
                            );
                            metrics::record_regeneration("failed");
                        }
                    }
                }
            }
        }
    }
}
