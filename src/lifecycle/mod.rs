//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load manifests → Seed store → Build collaborators → EdgeHandler + worker
//!
//! Shutdown (shutdown.rs):
//!     Trigger → server stops accepting, worker leaves its loop → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: manifests first, then collaborators, then listeners
//! - One broadcast channel reaches every long-running task

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{spawn_signal_listener, termination_signal};
pub use startup::{assemble, assemble_with_manifests, EdgeRuntime, StartupError};
