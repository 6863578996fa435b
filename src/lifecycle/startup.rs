//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the build manifests named by the configuration
//! - Initialize the collaborators in dependency order
//! - Hand back the edge handler plus the worker that drains the queue
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Binding listeners is left to the caller (traffic only when ready)

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::backend::{
    Backends, CacheInvalidator, HttpRenderEngine, InvalidationError, MemoryObjectStore,
    MemoryQueue, NoopInvalidator, QueueMessage, RenderError, StoreError, WebhookInvalidator,
};
use crate::config::{load_manifests, ConfigError, EdgeConfig};
use crate::edge::EdgeHandler;
use crate::invalidation::{InvalidationGroupError, InvalidationGroupTracker};
use crate::manifest::ManifestSet;
use crate::regeneration::RegenerationWorker;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to seed object store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to build render client: {0}")]
    Render(#[from] RenderError),

    #[error("failed to build invalidation client: {0}")]
    Invalidation(#[from] InvalidationError),

    #[error(transparent)]
    InvalidationGroups(#[from] InvalidationGroupError),
}

/// Everything the server and the regeneration worker need.
pub struct EdgeRuntime {
    pub handler: Arc<EdgeHandler>,
    pub store: Arc<MemoryObjectStore>,
    /// Present when the in-process worker is enabled.
    pub worker: Option<(RegenerationWorker, mpsc::Receiver<QueueMessage>)>,
}

/// Load manifests from disk and assemble the runtime.
pub async fn assemble(config: &EdgeConfig) -> Result<EdgeRuntime, StartupError> {
    let manifests = load_manifests(Path::new(&config.manifests.dir))?;
    assemble_with_manifests(config, Arc::new(manifests)).await
}

/// Assemble the runtime around already-loaded manifests.
pub async fn assemble_with_manifests(
    config: &EdgeConfig,
    manifests: Arc<ManifestSet>,
) -> Result<EdgeRuntime, StartupError> {
    let store = Arc::new(MemoryObjectStore::new());
    if let Some(seed_dir) = &config.origin.seed_dir {
        store.load_dir(Path::new(seed_dir)).await?;
    }

    let (queue, messages) = MemoryQueue::new(&config.regeneration);
    let render = Arc::new(HttpRenderEngine::new(&config.render)?);

    let invalidator: Arc<dyn CacheInvalidator> = match &config.invalidation.webhook_url {
        Some(url) => Arc::new(WebhookInvalidator::new(
            url.clone(),
            Duration::from_secs(config.timeouts.request_secs),
        )?),
        None => Arc::new(NoopInvalidator),
    };

    let tracker = InvalidationGroupTracker::new(&config.invalidation.groups)?;

    let backends = Backends {
        store: store.clone(),
        queue: Arc::new(queue),
        render: render.clone(),
        invalidator,
    };

    let handler = EdgeHandler::new(manifests.clone(), backends)
        .with_queue_name(config.regeneration.queue_name.clone())
        .with_invalidation_groups(tracker);

    let worker = if config.regeneration.worker_enabled {
        Some((
            RegenerationWorker::new(manifests, store.clone(), render),
            messages,
        ))
    } else {
        tracing::warn!("Regeneration worker disabled, regeneration sends will be rejected");
        None
    };

    tracing::info!(
        render_upstream = %config.render.upstream_url,
        invalidation_groups = config.invalidation.groups.len(),
        worker_enabled = config.regeneration.worker_enabled,
        "Edge runtime assembled"
    );

    Ok(EdgeRuntime {
        handler: Arc::new(handler),
        store,
        worker,
    })
}
