//! `manifest.json`: page tables, public files and build settings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ordered;

/// Root of the build manifest emitted next to the edge handler.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildManifest {
    /// Build identifier, part of every data-request path.
    pub build_id: String,

    pub pages: Pages,

    /// Files served verbatim from the public directory (`/favicon.ico` → `favicon.ico`).
    pub public_files: HashMap<String, String>,

    /// Whether page URLs canonically end with `/`.
    pub trailing_slash: bool,

    /// Log handler and render durations.
    #[serde(alias = "logExecutionTimes")]
    pub log_lambda_execution_times: bool,
}

/// Server-rendered and statically exported page tables.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Pages {
    pub ssr: RouteTable,
    pub html: RouteTable,
}

/// Exact-path and pattern-based routes to page identifiers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteTable {
    pub non_dynamic: HashMap<String, String>,

    /// Pattern routes in manifest order.
    #[serde(with = "ordered")]
    pub dynamic: Vec<(String, DynamicRoute)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DynamicRoute {
    /// Page identifier (`pages/blog/[slug].js`).
    pub file: String,
    /// Match pattern, tested case-insensitively.
    pub regex: String,
}
