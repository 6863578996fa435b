//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to the render upstream:
//!     → per-attempt timeout (reqwest client)
//!     → On failure: retries.rs (check if retryable)
//!     → backoff.rs (exponential delay with jitter before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Only transient failures are retried; 4xx answers are final
//! - Jittered backoff prevents thundering herd

pub mod backoff;
pub mod retries;

pub use backoff::calculate_backoff;
pub use retries::{is_retryable, RetryPolicy};
