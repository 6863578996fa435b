//! Origin-request hook.
//!
//! # Responsibilities
//! - Redirect non-canonical URIs before anything else
//! - Forward pre-built pages, fallbacks, public files and data payloads to
//!   the object store
//! - Render everything else through the render engine

use std::time::Instant;

use axum::http::StatusCode;

use crate::backend::RenderedPage;
use crate::edge::event::{EdgeRequest, EdgeResponse, HookOutcome};
use crate::edge::headers::Headers;
use crate::edge::origin::{forward_to_store, origin_path, PUBLIC_PREFIX, STATIC_PAGES_PREFIX};
use crate::edge::EdgeHandler;
use crate::observability::metrics;
use crate::routing::locale::{accept_language_locale, add_default_locale, locale_root_path};
use crate::routing::normalize::{is_data_request, strip_base_path, NormalizedUri};
use crate::routing::{Redirect, RouteMatch, ERROR_PAGE};

impl EdgeHandler {
    /// Decide what the CDN does with an incoming request.
    pub async fn handle_origin_request(&self, request: EdgeRequest) -> HookOutcome {
        let started = Instant::now();
        let outcome = self.route_origin_request(request).await;

        metrics::record_handler_duration("origin-request", started.elapsed());
        self.log_timing("origin-request handler execution time", started);
        outcome
    }

    async fn route_origin_request(&self, mut request: EdgeRequest) -> HookOutcome {
        let manifests = &*self.manifests;
        let base_path = manifests.base_path();

        let normalized = NormalizedUri::new(&request.uri, base_path);
        let uri = normalized.as_str().to_string();
        let is_data = is_data_request(&uri);
        let is_public_file = manifests.is_public_file(&uri);

        if let Some(redirect) = self.redirects.decide(
            &request.uri,
            &normalized,
            is_data,
            is_public_file,
            &request.querystring,
        ) {
            tracing::debug!(uri = %request.uri, location = %redirect.location, "Canonical redirect");
            metrics::record_redirect("trailing_slash");
            return HookOutcome::Response(EdgeResponse::redirect(&redirect));
        }

        if let Some(redirect) = self.locale_redirect(&request, &uri) {
            tracing::debug!(location = %redirect.location, "Locale redirect");
            metrics::record_redirect("locale");
            return HookOutcome::Response(EdgeResponse::redirect(&redirect));
        }

        let page_uri = add_default_locale(&uri, &manifests.routes);
        let is_html_page = manifests.is_html_page(&page_uri);
        let has_fallback = manifests.fallback_for(&uri).is_some();

        if is_html_page || has_fallback {
            let page = if page_uri == "/" { "/index" } else { page_uri.as_str() };
            request.uri = format!("{page}.html");
            forward_to_store(&mut request, Some(origin_path(base_path, STATIC_PAGES_PREFIX)));
            metrics::record_request(if is_html_page { "static_page" } else { "fallback_page" });
            return HookOutcome::Request(request);
        }

        if is_public_file {
            if let Some(rest) = strip_base_path(&request.uri, base_path).filter(|_| !base_path.is_empty()) {
                request.uri = rest.to_string();
            }
            forward_to_store(&mut request, Some(origin_path(base_path, PUBLIC_PREFIX)));
            metrics::record_request("public_file");
            return HookOutcome::Request(request);
        }

        let route = manifests.matcher().resolve_request(&uri);

        if is_data {
            match route {
                RouteMatch::NotFound => {
                    request.uri = static_page_uri(route.page());
                    forward_to_store(&mut request, Some(origin_path(base_path, STATIC_PAGES_PREFIX)));
                    metrics::record_request("not_found");
                    return HookOutcome::Request(request);
                }
                // No 404 page: render the error page below
                RouteMatch::Error => {}
                RouteMatch::Static(_) | RouteMatch::Dynamic(_) => {
                    forward_to_store(&mut request, None);
                    metrics::record_request("data_request");
                    return HookOutcome::Request(request);
                }
            }
        } else if route.is_html() {
            request.uri = static_page_uri(route.page());
            forward_to_store(&mut request, Some(origin_path(base_path, STATIC_PAGES_PREFIX)));
            let disposition = if route == RouteMatch::NotFound { "not_found" } else { "static_page" };
            metrics::record_request(disposition);
            return HookOutcome::Request(request);
        }

        metrics::record_request("render");
        HookOutcome::Response(self.render_page(&request, route.page()).await)
    }

    /// Root requests whose `Accept-Language` prefers a non-default locale.
    fn locale_redirect(&self, request: &EdgeRequest, uri: &str) -> Option<Redirect> {
        if uri != "/" {
            return None;
        }

        let routes = &self.manifests.routes;
        let header = request.headers.get_non_empty("accept-language")?;
        let locale = accept_language_locale(header, routes)?;
        let target = locale_root_path(locale, routes, self.manifests.build.trailing_slash);

        Some(Redirect::temporary(&target, &request.querystring))
    }

    /// Render `page`; a failure re-renders the error page with status 500.
    async fn render_page(&self, request: &EdgeRequest, page: &str) -> EdgeResponse {
        let started = Instant::now();
        let render = &self.backends.render;
        let status = if page == ERROR_PAGE { 404 } else { 200 };

        let rendered = match render.render(page, request, status).await {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::error!(page, error = %e, "Error rendering page, rendering error page");
                metrics::record_render_failure();

                match render.render(ERROR_PAGE, request, 500).await {
                    Ok(rendered) => RenderedPage {
                        status: 500,
                        ..rendered
                    },
                    Err(e) => {
                        tracing::error!(error = %e, "Error page failed to render");
                        RenderedPage {
                            status: 500,
                            headers: Headers::new(),
                            body: "Internal Server Error".to_string(),
                        }
                    }
                }
            }
        };

        self.log_timing("SSR execution time", started);
        rendered_into_response(rendered)
    }
}

/// `pages/404.html` → `/404.html`.
fn static_page_uri(page: &str) -> String {
    page.strip_prefix("pages").unwrap_or(page).to_string()
}

fn rendered_into_response(rendered: RenderedPage) -> EdgeResponse {
    let description = match rendered.status {
        404 => "Not Found",
        500 => "Internal Server Error",
        status => StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default(),
    };

    let mut response = EdgeResponse::new(rendered.status, description).with_body(rendered.body);
    response.headers = rendered.headers;
    response
}
