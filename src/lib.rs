//! Edge request router and incremental static regeneration coordinator.

// Core subsystems
pub mod config;
pub mod edge;
pub mod http;
pub mod manifest;
pub mod routing;

// Regeneration and cache management
pub mod invalidation;
pub mod regeneration;

// External collaborators
pub mod backend;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::EdgeConfig;
pub use edge::{EdgeHandler, HookOutcome};
pub use http::EdgeServer;
pub use lifecycle::Shutdown;
pub use manifest::ManifestSet;
