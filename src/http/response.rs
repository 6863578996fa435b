//! Response handling and transformation.
//!
//! # Responsibilities
//! - Turn an `EdgeResponse` into an HTTP response for the client
//! - Turn a stored object into the origin response the CDN would see
//! - Map edge errors to HTTP status codes
//!
//! # Design Decisions
//! - Headers that are not valid HTTP are dropped with a warning
//! - A hook that leaves the body untouched serves the origin object's bytes
//! - A malformed hook status becomes 502 Bad Gateway

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::backend::StoredObject;
use crate::edge::headers::format_http_date;
use crate::edge::{EdgeError, EdgeResponse};

/// Convert a hook response. `origin_body` is used when the hook set no body.
pub fn into_http_response(edge: EdgeResponse, origin_body: Option<Vec<u8>>) -> Response {
    let status = StatusCode::from_u16(edge.status_code()).unwrap_or_else(|_| {
        tracing::warn!(status = %edge.status, "Hook produced a malformed status");
        StatusCode::BAD_GATEWAY
    });

    let body = match edge.body {
        Some(body) => body.into_bytes(),
        None => origin_body.unwrap_or_default(),
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    for (key, value) in edge.headers.iter() {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().append(name, value);
            }
            _ => tracing::warn!(header = key, "Dropping invalid response header"),
        }
    }

    response
}

/// The response an object store gives the CDN: 200 with object metadata, or
/// 403 when the key is missing.
pub fn origin_response_for(object: Option<&StoredObject>) -> EdgeResponse {
    let Some(object) = object else {
        return EdgeResponse::new(403, "Forbidden");
    };

    let mut response = EdgeResponse::new(200, "OK");
    if let Some(content_type) = &object.content_type {
        response.headers.set("Content-Type", content_type.clone());
    }
    if let Some(cache_control) = &object.cache_control {
        response.headers.set("Cache-Control", cache_control.clone());
    }
    if let Some(expires) = object.expires {
        response.headers.set("Expires", format_http_date(expires));
    }
    response
        .headers
        .set("Last-Modified", format_http_date(object.last_modified));
    response.headers.set("ETag", object.etag.clone());
    response
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        let status = match &self {
            EdgeError::EmptyEvent | EdgeError::MissingResponse => StatusCode::BAD_REQUEST,
            EdgeError::Render(_) | EdgeError::Store(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Edge hook failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_hook_body_wins_over_origin_body() {
        let edge = EdgeResponse::new(200, "OK").with_body("hook");
        let response = into_http_response(edge, Some(b"origin".to_vec()));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_headers_are_copied() {
        let mut edge = EdgeResponse::new(308, "Permanent Redirect");
        edge.headers.set("Location", "/about");
        edge.headers.set("Bad Header", "x");

        let response = into_http_response(edge, None);
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()["location"], "/about");
        assert_eq!(response.headers().len(), 1);
    }

    #[test]
    fn test_malformed_status_is_bad_gateway() {
        let mut edge = EdgeResponse::new(200, "OK");
        edge.status = "two hundred".into();
        assert_eq!(into_http_response(edge, None).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_origin_response_for_object() {
        let object = StoredObject {
            body: b"<p>hi</p>".to_vec(),
            content_type: Some("text/html".into()),
            cache_control: None,
            expires: Some(Utc.with_ymd_and_hms(2021, 5, 5, 17, 15, 4).unwrap()),
            last_modified: Utc.with_ymd_and_hms(2021, 5, 5, 17, 15, 0).unwrap(),
            etag: "\"abc\"".into(),
        };

        let response = origin_response_for(Some(&object));
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.headers.get("content-type"), Some("text/html"));
        assert_eq!(response.headers.get("expires"), Some("Wed, 05 May 2021 17:15:04 GMT"));
        assert_eq!(response.headers.get("etag"), Some("\"abc\""));
        assert!(!response.headers.contains("cache-control"));
    }

    #[test]
    fn test_missing_object_is_forbidden() {
        let response = origin_response_for(None);
        assert_eq!(response.status_code(), 403);
        assert_eq!(response.status_description, "Forbidden");
    }
}
