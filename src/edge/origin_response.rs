//! Origin-response hook.
//!
//! # Responsibilities
//! - Remap the exported 404 page to a 404 status
//! - Fill store misses (403) for data payloads and fallback pages
//! - Drive regeneration and invalidation-group accounting on 200s
//!
//! # Design Decisions
//! - The served response always wins: regeneration and invalidation
//!   errors are logged and counted, then dropped
//! - Store misses that cannot be filled pass through unchanged

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

use crate::backend::PutObject;
use crate::edge::event::{EdgeRequest, EdgeResponse};
use crate::edge::origin::{object_key, STATIC_PAGES_PREFIX};
use crate::edge::{EdgeError, EdgeHandler};
use crate::invalidation::tracker::state_key;
use crate::invalidation::{InvalidationGroup, InvalidationGroupConfig};
use crate::observability::metrics;
use crate::regeneration::gate::{self, StaticRegenerationRequest, THROTTLED_CACHE_CONTROL};
use crate::regeneration::worker::{persist_page, PageKeys};
use crate::regeneration::RegenerationContext;
use crate::routing::locale::drop_locale;
use crate::routing::normalize::{
    data_request_page_path, is_data_request, page_path_from_origin_uri, strip_base_path,
    NOT_FOUND_PATH,
};
use crate::routing::RouteMatch;

impl EdgeHandler {
    /// Post-process what the object store returned.
    pub async fn handle_origin_response(
        &self,
        request: EdgeRequest,
        response: EdgeResponse,
    ) -> Result<EdgeResponse, EdgeError> {
        self.handle_origin_response_at(request, response, Utc::now())
            .await
    }

    /// [`EdgeHandler::handle_origin_response`] with an explicit clock.
    pub async fn handle_origin_response_at(
        &self,
        request: EdgeRequest,
        response: EdgeResponse,
        now: DateTime<Utc>,
    ) -> Result<EdgeResponse, EdgeError> {
        let started = Instant::now();
        let result = self.process_origin_response(request, response, now).await;

        metrics::record_handler_duration("origin-response", started.elapsed());
        self.log_timing("origin-response handler execution time", started);
        result
    }

    async fn process_origin_response(
        &self,
        request: EdgeRequest,
        mut response: EdgeResponse,
        now: DateTime<Utc>,
    ) -> Result<EdgeResponse, EdgeError> {
        let page_uri = self.origin_page_path(&request.uri);

        match response.status_code() {
            403 => return self.fill_store_miss(&request, response, &page_uri, now).await,
            _ if self.is_not_found(&page_uri) => {
                response.set_status(404, "Not Found");
                return Ok(response);
            }
            200 => {}
            _ => return Ok(response),
        }

        self.apply_static_regeneration(&request, &mut response, &page_uri, now)
            .await;
        self.record_invalidation_access(&page_uri).await;

        Ok(response)
    }

    /// Application path of a forwarded origin uri, base path removed.
    fn origin_page_path(&self, origin_uri: &str) -> String {
        let base_path = self.manifests.base_path();
        let path = if base_path.is_empty() {
            origin_uri
        } else {
            match strip_base_path(origin_uri, base_path) {
                Some("") => "/",
                Some(rest) => rest,
                None => origin_uri,
            }
        };

        if is_data_request(path) {
            path.to_string()
        } else {
            page_path_from_origin_uri(path)
        }
    }

    /// Whether the served object stands for an unmatched route.
    fn is_not_found(&self, page_uri: &str) -> bool {
        let manifests = &*self.manifests;

        if drop_locale(page_uri, &manifests.routes) == NOT_FOUND_PATH {
            return true;
        }

        let known = manifests.is_html_page(page_uri)
            || manifests.is_public_file(page_uri)
            || manifests.fallback_for(page_uri).is_some();

        !known && manifests.matcher().resolve_request(page_uri) == RouteMatch::NotFound
    }

    async fn fill_store_miss(
        &self,
        request: &EdgeRequest,
        response: EdgeResponse,
        page_uri: &str,
        now: DateTime<Utc>,
    ) -> Result<EdgeResponse, EdgeError> {
        if is_data_request(page_uri) {
            let route = self.manifests.matcher().resolve_request(page_uri);
            if !route.is_html() {
                return self
                    .render_data_payload(request, response, page_uri, route.page(), now)
                    .await;
            }
        }

        let Some(Some(fallback)) = self.manifests.fallback_for(page_uri) else {
            return Ok(response);
        };

        let key = object_key(self.manifests.base_path(), STATIC_PAGES_PREFIX, fallback);
        let Some(object) = self.backends.store.get(&key).await? else {
            tracing::warn!(key = %key, "Fallback page missing from store");
            return Ok(response);
        };

        metrics::record_request("fallback_page");
        let mut filled = EdgeResponse::new(200, "OK")
            .with_body(String::from_utf8_lossy(&object.body).into_owned());
        filled.headers = response.headers;
        filled.headers.set("Content-Type", "text/html");
        Ok(filled)
    }

    /// Render a missing data payload, persisting it when the page is static.
    async fn render_data_payload(
        &self,
        request: &EdgeRequest,
        response: EdgeResponse,
        data_uri: &str,
        page: &str,
        now: DateTime<Utc>,
    ) -> Result<EdgeResponse, EdgeError> {
        let render = self.backends.render.render_static(page, request).await?;

        if render.is_static {
            let build_id = &self.manifests.build.build_id;
            let page_uri = data_request_page_path(data_uri, build_id);
            let keys = PageKeys::new(self.manifests.base_path(), build_id, &page_uri);
            let expires = render
                .revalidate
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| now.checked_add_signed(Duration::seconds(secs)));

            persist_page(self.backends.store.as_ref(), &keys, &render, expires).await?;
            tracing::info!(page, html_key = %keys.html, json_key = %keys.json, "Persisted generated page");
        }

        metrics::record_request("data_request");
        let mut rendered = EdgeResponse::new(200, "OK").with_body(serde_json::to_string(&render.page_data)?);
        rendered.headers = response.headers;
        rendered.headers.set("Content-Type", "application/json");
        Ok(rendered)
    }

    async fn apply_static_regeneration(
        &self,
        request: &EdgeRequest,
        response: &mut EdgeResponse,
        page_uri: &str,
        now: DateTime<Utc>,
    ) {
        let decision = gate::evaluate(
            &StaticRegenerationRequest {
                requested_uri: &request.uri,
                expires: response.headers.get_non_empty("expires"),
                last_modified: response.headers.get_non_empty("last-modified"),
                manifests: &self.manifests,
            },
            now,
        );
        let Some(decision) = decision else {
            return;
        };

        response.headers.set("Cache-Control", decision.cache_control.clone());
        response.headers.remove("expires");

        if !decision.is_due() {
            return;
        }

        let page = self.manifests.matcher().resolve_request(page_uri).page();
        let etag = response.headers.get_non_empty("etag").map(str::to_string);
        let last_modified = response.headers.get_non_empty("last-modified").map(str::to_string);

        let ctx = RegenerationContext {
            request,
            etag: etag.as_deref(),
            last_modified: last_modified.as_deref(),
            base_path: self.manifests.base_path(),
            page_path: page,
        };

        match self.dispatcher.trigger(&ctx).await {
            Ok(outcome) if outcome.throttled => {
                response.headers.set("Cache-Control", THROTTLED_CACHE_CONTROL);
                metrics::record_regeneration("throttled");
            }
            Ok(_) => metrics::record_regeneration("enqueued"),
            Err(e) => {
                tracing::error!(page, error = %e, "Failed to trigger static regeneration");
                metrics::record_regeneration("error");
            }
        }
    }

    async fn record_invalidation_access(&self, url: &str) {
        let Some(config) = self.invalidation.find_group(url) else {
            return;
        };

        if let Err(e) = self.advance_invalidation_group(config).await {
            tracing::warn!(group = %config.regex, url, error = %e, "Invalidation group update failed");
        }
    }

    async fn advance_invalidation_group(&self, config: &InvalidationGroupConfig) -> Result<(), EdgeError> {
        let store = &self.backends.store;
        let key = state_key(self.manifests.base_path(), config);

        let current_number = match store.get(&key).await? {
            Some(object) => match serde_json::from_slice::<InvalidationGroup>(&object.body) {
                Ok(stored) => stored.current_number,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Corrupt invalidation group state, resetting");
                    0
                }
            },
            None => 0,
        };

        let advance = InvalidationGroup {
            config: config.clone(),
            current_number,
        }
        .advance();

        let body = serde_json::to_vec(&advance.group)?;
        store.put(&key, PutObject::new(body, "application/json")).await?;

        if advance.invalidate {
            self.backends
                .invalidator
                .invalidate(&config.invalidation_path)
                .await?;
            metrics::record_invalidation();
            tracing::info!(group = %config.regex, path = %config.invalidation_path, "Invalidation issued");
        }

        Ok(())
    }
}
