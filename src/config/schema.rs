//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge
//! simulator. Every section is defaulted, so an empty file is a valid config.

use serde::{Deserialize, Serialize};

use crate::invalidation::InvalidationGroupConfig;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Where the build manifests live.
    pub manifests: ManifestConfig,

    /// Simulated object-store origin.
    pub origin: OriginConfig,

    /// Render upstream settings.
    pub render: RenderConfig,

    /// Regeneration queue and worker settings.
    pub regeneration: RegenerationConfig,

    /// Invalidation groups and the CDN invalidation endpoint.
    pub invalidation: InvalidationConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Build manifest location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Directory holding `manifest.json`, and optionally
    /// `prerender-manifest.json` and `routes-manifest.json`.
    pub dir: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            dir: "build".to_string(),
        }
    }
}

/// The object-store origin requests are forwarded to.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    pub region: String,

    /// Bucket domain, e.g. "assets.s3.amazonaws.com".
    pub domain_name: String,

    /// Default origin path.
    pub path: String,

    /// Directory copied into the in-memory store at startup.
    pub seed_dir: Option<String>,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            domain_name: "assets.s3.us-east-1.amazonaws.com".to_string(),
            path: String::new(),
            seed_dir: None,
        }
    }
}

/// Render upstream settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Base URL of the render service.
    pub upstream_url: String,

    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,

    /// Attempts per render, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            upstream_url: "http://127.0.0.1:3000".to_string(),
            timeout_secs: 10,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Regeneration queue and worker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegenerationConfig {
    /// Queue name; `<bucket>.fifo` when unset.
    pub queue_name: Option<String>,

    /// Window in which a repeated deduplication id is dropped.
    pub dedup_window_secs: u64,

    /// Sustained sends per second before the queue throttles.
    pub send_rate_per_sec: u32,

    /// Burst capacity above the sustained rate.
    pub burst: u32,

    /// Messages buffered between the queue and the worker.
    pub channel_capacity: usize,

    /// Run the in-process regeneration worker.
    pub worker_enabled: bool,
}

impl Default for RegenerationConfig {
    fn default() -> Self {
        Self {
            queue_name: None,
            dedup_window_secs: 300,
            send_rate_per_sec: 10,
            burst: 20,
            channel_capacity: 1024,
            worker_enabled: true,
        }
    }
}

/// Invalidation group settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct InvalidationConfig {
    /// Checked in order; first match wins.
    pub groups: Vec<InvalidationGroupConfig>,

    /// Endpoint receiving `{"paths": [...]}`; invalidations are only logged when unset.
    pub webhook_url: Option<String>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
