//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → POST /__edge/origin-request | /__edge/origin-response
//!           → EdgeHandler::handle_event → JSON outcome
//!     → any other path (CDN simulation)
//!           → origin-request hook
//!           → object store lookup (200 or 403)
//!           → origin-response hook
//!     → response.rs (EdgeResponse → HTTP)
//!     → Send to client
//! ```

pub mod response;
pub mod server;

pub use response::{into_http_response, origin_response_for};
pub use server::{AppState, EdgeServer};
