//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Edge hooks, regeneration worker, HTTP simulator produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout (pretty for development, JSON for aggregation)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - Metric helpers are free functions so hooks stay recorder-agnostic
//! - Without an installed recorder every metric call is a no-op

pub mod logging;
pub mod metrics;
