//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the hook endpoints and the CDN fallback
//! - Wire up middleware (tracing, timeout, request ID)
//! - Simulate the CDN round trip: origin-request → object store → origin-response
//! - Serve until the shutdown coordinator fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::backend::ObjectStore;
use crate::config::{EdgeConfig, OriginConfig};
use crate::edge::origin::forwarded_key;
use crate::edge::{CloudFrontEvent, EdgeHandler, EdgeRequest, EventType, HookOutcome, S3Origin};
use crate::http::response::{into_http_response, origin_response_for};
use crate::lifecycle::Shutdown;

pub const ORIGIN_REQUEST_PATH: &str = "/__edge/origin-request";
pub const ORIGIN_RESPONSE_PATH: &str = "/__edge/origin-response";
pub const HEALTH_PATH: &str = "/__edge/health";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<EdgeHandler>,
    pub store: Arc<dyn ObjectStore>,
    pub origin: OriginConfig,
}

/// HTTP front of the edge simulator.
pub struct EdgeServer {
    router: Router,
    config: EdgeConfig,
}

impl EdgeServer {
    pub fn new(config: EdgeConfig, handler: Arc<EdgeHandler>, store: Arc<dyn ObjectStore>) -> Self {
        let state = AppState {
            handler,
            store,
            origin: config.origin.clone(),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &EdgeConfig, state: AppState) -> Router {
        Router::new()
            .route(HEALTH_PATH, get(health))
            .route(ORIGIN_REQUEST_PATH, post(origin_request_event))
            .route(ORIGIN_RESPONSE_PATH, post(origin_response_event))
            .fallback(cdn_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            base_path = %self.config.origin.path,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let manifests = state.handler.manifests();
    Json(json!({
        "status": "ok",
        "buildId": manifests.build.build_id,
        "basePath": manifests.base_path(),
    }))
}

async fn origin_request_event(
    State(state): State<AppState>,
    Json(event): Json<CloudFrontEvent>,
) -> Response {
    replay_event(&state, event, EventType::OriginRequest).await
}

async fn origin_response_event(
    State(state): State<AppState>,
    Json(event): Json<CloudFrontEvent>,
) -> Response {
    replay_event(&state, event, EventType::OriginResponse).await
}

/// Run a recorded CDN event through the hook its endpoint names.
async fn replay_event(state: &AppState, event: CloudFrontEvent, expected: EventType) -> Response {
    let actual = event.records.first().map(|record| record.cf.config.event_type);
    if let Some(actual) = actual.filter(|actual| *actual != expected) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!("expected a {expected:?} event, got {actual:?}"),
            })),
        )
            .into_response();
    }

    match state.handler.handle_event(event).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Serve a plain HTTP request the way the CDN would.
async fn cdn_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let edge_request = edge_request_from_http(&request, &state.origin);
    let uri = edge_request.uri.clone();

    let forwarded = match state.handler.handle_origin_request(edge_request).await {
        HookOutcome::Response(response) => {
            tracing::debug!(uri = %uri, status = %response.status, "Answered at the edge");
            return into_http_response(response, None);
        }
        HookOutcome::Request(forwarded) => forwarded,
    };

    let key = forwarded_key(&forwarded);
    let object = match state.store.get(&key).await {
        Ok(object) => object,
        Err(e) => return crate::edge::EdgeError::from(e).into_response(),
    };

    tracing::debug!(
        uri = %uri,
        key = %key,
        found = object.is_some(),
        "Fetched from object store"
    );

    let origin_response = origin_response_for(object.as_ref());
    let response = match state
        .handler
        .handle_origin_response(forwarded, origin_response)
        .await
    {
        Ok(response) => into_http_response(response, object.map(|object| object.body)),
        Err(e) => e.into_response(),
    };

    tracing::debug!(
        uri = %uri,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "CDN round trip complete"
    );
    response
}

/// Build the CDN view of an incoming HTTP request.
pub fn edge_request_from_http(request: &Request<Body>, origin: &OriginConfig) -> EdgeRequest {
    let mut edge_request = EdgeRequest::new(request.uri().path()).with_s3_origin(S3Origin {
        auth_method: "none".to_string(),
        domain_name: origin.domain_name.clone(),
        path: origin.path.clone(),
        region: origin.region.clone(),
        ..S3Origin::default()
    });

    edge_request.method = request.method().to_string();
    edge_request.querystring = request.uri().query().unwrap_or_default().to_string();
    edge_request.client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default();

    for (name, value) in request.headers() {
        if let Ok(value) = value.to_str() {
            edge_request.headers.append(name.as_str(), value);
        }
    }

    edge_request
}
