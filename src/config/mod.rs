//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EdgeConfig (validated, immutable)
//!
//! manifest directory (JSON)
//!     → loader.rs load_manifests
//!     → ManifestSet (patterns compiled, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Config and manifests are immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_manifests, ConfigError};
pub use schema::{
    EdgeConfig, InvalidationConfig, ListenerConfig, LogFormat, ManifestConfig, ObservabilityConfig,
    OriginConfig, RegenerationConfig, RenderConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
