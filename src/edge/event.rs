//! CDN event model.
//!
//! Mirrors the JSON shape of CloudFront origin-request and origin-response
//! events so payloads can be fed in and returned unchanged.

use serde::{Deserialize, Serialize};

use crate::edge::headers::Headers;
use crate::edge::EdgeError;
use crate::routing::Redirect;

fn default_method() -> String {
    "GET".to_string()
}

/// The request as the CDN hands it to a hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRequest {
    #[serde(default)]
    pub client_ip: String,
    #[serde(default = "default_method")]
    pub method: String,
    pub uri: String,
    #[serde(default)]
    pub querystring: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

impl EdgeRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            client_ip: String::new(),
            method: default_method(),
            uri: uri.into(),
            querystring: String::new(),
            headers: Headers::new(),
            origin: None,
        }
    }

    pub fn with_s3_origin(mut self, origin: S3Origin) -> Self {
        self.origin = Some(Origin { s3: Some(origin) });
        self
    }

    pub fn s3_origin(&self) -> Option<&S3Origin> {
        self.origin.as_ref().and_then(|origin| origin.s3.as_ref())
    }

    pub fn s3_origin_mut(&mut self) -> Option<&mut S3Origin> {
        self.origin.as_mut().and_then(|origin| origin.s3.as_mut())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Origin>,
}

/// Object-store origin a request is forwarded to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Origin {
    #[serde(default)]
    pub auth_method: String,
    #[serde(default)]
    pub custom_headers: Headers,
    pub domain_name: String,
    /// Key prefix inside the bucket (`/static-pages`).
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub region: String,
}

/// A response, either generated by a hook or returned by the origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeResponse {
    /// Status code as a decimal string.
    pub status: String,
    #[serde(default)]
    pub status_description: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl EdgeResponse {
    pub fn new(status: u16, status_description: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            status_description: status_description.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// A redirect carrying both `Location` and a `Refresh` fallback.
    pub fn redirect(redirect: &Redirect) -> Self {
        let mut response = Self::new(redirect.status, redirect.status_description);
        response.headers.set("Location", redirect.location.clone());
        response
            .headers
            .set("Refresh", format!("0;url={}", redirect.location));
        response
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Numeric status, or 0 when the status string is malformed.
    pub fn status_code(&self) -> u16 {
        self.status.trim().parse().unwrap_or(0)
    }

    pub fn set_status(&mut self, status: u16, description: impl Into<String>) {
        self.status = status.to_string();
        self.status_description = description.into();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    OriginRequest,
    OriginResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventConfig {
    #[serde(default)]
    pub distribution_domain_name: String,
    #[serde(default)]
    pub request_id: String,
    pub event_type: EventType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfRecord {
    pub config: EventConfig,
    pub request: EdgeRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<EdgeResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub cf: CfRecord,
}

/// Top-level CDN event envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudFrontEvent {
    #[serde(rename = "Records")]
    pub records: Vec<EventRecord>,
}

impl CloudFrontEvent {
    pub fn origin_request(request: EdgeRequest) -> Self {
        Self::single(EventType::OriginRequest, request, None)
    }

    pub fn origin_response(request: EdgeRequest, response: EdgeResponse) -> Self {
        Self::single(EventType::OriginResponse, request, Some(response))
    }

    fn single(event_type: EventType, request: EdgeRequest, response: Option<EdgeResponse>) -> Self {
        Self {
            records: vec![EventRecord {
                cf: CfRecord {
                    config: EventConfig {
                        distribution_domain_name: String::new(),
                        request_id: String::new(),
                        event_type,
                    },
                    request,
                    response,
                },
            }],
        }
    }

    /// The first record; the CDN delivers exactly one per invocation.
    pub fn into_record(self) -> Result<CfRecord, EdgeError> {
        self.records
            .into_iter()
            .next()
            .map(|record| record.cf)
            .ok_or(EdgeError::EmptyEvent)
    }
}

/// What an origin-request hook hands back to the CDN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HookOutcome {
    /// Forward the (possibly rewritten) request to the origin.
    Request(EdgeRequest),
    /// Answer directly without reaching the origin.
    Response(EdgeResponse),
}

impl HookOutcome {
    pub fn as_request(&self) -> Option<&EdgeRequest> {
        match self {
            HookOutcome::Request(request) => Some(request),
            HookOutcome::Response(_) => None,
        }
    }

    pub fn as_response(&self) -> Option<&EdgeResponse> {
        match self {
            HookOutcome::Response(response) => Some(response),
            HookOutcome::Request(_) => None,
        }
    }
}
