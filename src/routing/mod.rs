//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Raw request URI
//!     → normalize.rs (strip base path, trailing slash, classify data requests)
//!     → redirect.rs  (canonical trailing slash; may short-circuit with 308)
//!     → locale.rs    (default-locale prefix for page lookups)
//!     → matcher.rs   (exact table, then ordered patterns, then 404/_error)
//!     → Return: RouteMatch (never "no match")
//!
//! Route Compilation (at startup):
//!     Pages { ssr, html }
//!     → Merge dynamic tables in declaration order
//!     → Compile patterns (case-insensitive)
//!     → Freeze as immutable RouteMatcher
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Linear pattern scan: order is a correctness invariant, so no trie
//! - Deterministic: same input always matches same route
//! - First match wins (manifest order)

pub mod locale;
pub mod matcher;
pub mod normalize;
pub mod redirect;

pub use matcher::{RouteMatch, RouteMatcher, ERROR_PAGE, NOT_FOUND_PAGE};
pub use normalize::NormalizedUri;
pub use redirect::{Redirect, RedirectPolicy};
