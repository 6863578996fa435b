//! Invalidation group subsystem.
//!
//! # Data Flow
//! ```text
//! origin-response (200) for a url
//!     → tracker.rs find_group (first configured pattern that matches)
//!     → ObjectStore get  <basePath>/_invalidation/<md5(pattern)>.json
//!     → advance (increment, or reset + invalidate when the threshold is hit)
//!     → ObjectStore put, CacheInvalidator::invalidate(invalidationPath)
//! ```
//!
//! # Design Decisions
//! - The tracker computes transitions only; persistence is the caller's
//! - Read-increment-write is not atomic; concurrent hits may undercount
//! - Patterns are unanchored, so `blog` matches `/en/blog/post`

pub mod tracker;

pub use tracker::{Advance, InvalidationGroup, InvalidationGroupConfig, InvalidationGroupTracker};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvalidationGroupError {
    #[error("invalid invalidation group pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
