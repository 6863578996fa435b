//! Incremental static regeneration subsystem.
//!
//! # Data Flow
//! ```text
//! origin-response (200)
//!     → gate.rs       (stale? remaining freshness, Cache-Control)
//!     → dispatcher.rs (dedup + group ids, queue send, throttle detection)
//!     → RegenerationQueue
//!     → worker.rs     (render statically, write HTML + JSON back to the store)
//! ```
//!
//! # Design Decisions
//! - Regeneration never blocks or fails the response being served
//! - One job per (page, freshness fingerprint): the queue's dedup id does
//!   the suppression, there is no in-process locking
//! - Throttling is a soft outcome, not an error

pub mod dispatcher;
pub mod gate;
pub mod worker;

use md5::{Digest, Md5};
use thiserror::Error;

use crate::backend::{QueueError, RenderError, StoreError};
use crate::edge::origin::OriginError;

pub use dispatcher::{
    RegenerationContext, RegenerationDispatcher, RegenerationJob, RegenerationMessage,
    RegenerationOutcome,
};
pub use gate::{RegenerationDecision, StaticRegenerationRequest};
pub use worker::RegenerationWorker;

#[derive(Debug, Error)]
pub enum RegenerationError {
    /// The job cannot be addressed: bucket or region unknown.
    #[error(transparent)]
    Origin(#[from] OriginError),

    #[error("failed to encode regeneration message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode regeneration message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Lowercase hex MD5 of `input`.
pub(crate) fn md5_hex(input: impl AsRef<[u8]>) -> String {
    hex::encode(Md5::digest(input.as_ref()))
}
