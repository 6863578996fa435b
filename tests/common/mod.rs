//! Shared fixtures and in-memory collaborators for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use edge_router::backend::{
    Backends, CacheInvalidator, InvalidationError, MemoryObjectStore, ObjectStore, PutObject,
    QueueError, QueueMessage, RegenerationQueue, RenderEngine, RenderError, RenderedPage,
    StaticRender,
};
use edge_router::edge::{EdgeHandler, EdgeRequest, Headers, S3Origin};
use edge_router::invalidation::{InvalidationGroupConfig, InvalidationGroupTracker};
use edge_router::manifest::{BuildManifest, ManifestSet, PrerenderManifest, RoutesManifest};

pub const BUCKET_DOMAIN: &str = "my-bucket.s3.amazonaws.com";

pub const BUILD_MANIFEST: &str = r#"{
    "buildId": "build-id",
    "pages": {
        "ssr": {
            "nonDynamic": {
                "/": "pages/index.js",
                "/api/hello": "pages/api/hello.js",
                "/isr": "pages/isr.js"
            },
            "dynamic": {
                "/blog/[slug]": { "file": "pages/blog/[slug].js", "regex": "^\\/blog\\/([^\\/]+?)(?:\\/)?$" },
                "/fallback/[slug]": { "file": "pages/fallback/[slug].js", "regex": "^\\/fallback\\/([^\\/]+?)(?:\\/)?$" }
            }
        },
        "html": {
            "nonDynamic": {
                "/terms": "pages/terms.html",
                "/404": "pages/404.html",
                "/en/terms": "pages/en/terms.html"
            },
            "dynamic": {}
        }
    },
    "publicFiles": { "/favicon.ico": "favicon.ico" },
    "trailingSlash": false
}"#;

pub const PRERENDER_MANIFEST: &str = r#"{
    "routes": { "/isr": { "initialRevalidateSeconds": 10 } },
    "dynamicRoutes": {
        "/fallback/[slug]": {
            "routeRegex": "^\\/fallback\\/([^\\/]+?)(?:\\/)?$",
            "fallback": "/fallback/[slug].html"
        }
    }
}"#;

pub fn manifests_with_routes(routes: RoutesManifest) -> ManifestSet {
    let build: BuildManifest = serde_json::from_str(BUILD_MANIFEST).unwrap();
    let prerender: PrerenderManifest = serde_json::from_str(PRERENDER_MANIFEST).unwrap();
    ManifestSet::new(build, prerender, routes).unwrap()
}

pub fn manifests() -> ManifestSet {
    manifests_with_routes(RoutesManifest::default())
}

pub fn i18n_routes(base_path: &str) -> RoutesManifest {
    serde_json::from_value(json!({
        "basePath": base_path,
        "i18n": { "defaultLocale": "en", "locales": ["en", "nl"] }
    }))
    .unwrap()
}

pub fn base_path_routes(base_path: &str) -> RoutesManifest {
    serde_json::from_value(json!({ "basePath": base_path })).unwrap()
}

/// A request as the CDN delivers it, addressed to the test bucket.
pub fn cdn_request(uri: &str) -> EdgeRequest {
    cdn_request_in(uri, "us-east-1")
}

pub fn cdn_request_in(uri: &str, region: &str) -> EdgeRequest {
    EdgeRequest::new(uri).with_s3_origin(S3Origin {
        auth_method: "origin-access-identity".into(),
        domain_name: BUCKET_DOMAIN.into(),
        path: String::new(),
        region: region.into(),
        ..S3Origin::default()
    })
}

// --- Collaborators ---

#[derive(Default)]
pub struct RecordingQueue {
    pub sent: Mutex<Vec<QueueMessage>>,
    pub fail_with: Mutex<Option<QueueError>>,
}

impl RecordingQueue {
    pub fn sent(&self) -> Vec<QueueMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_with(&self, error: QueueError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl RegenerationQueue for RecordingQueue {
    async fn send(&self, message: QueueMessage) -> Result<(), QueueError> {
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Renders `"<page>:<status>"`; pages in `failing` error out.
pub struct RecordingRender {
    pub calls: Mutex<Vec<(String, u16)>>,
    pub static_calls: Mutex<Vec<String>>,
    pub failing: Mutex<HashSet<String>>,
    pub static_render: Mutex<StaticRender>,
}

impl Default for RecordingRender {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            static_calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            static_render: Mutex::new(StaticRender {
                html: "<p>generated</p>".into(),
                page_data: json!({ "pageProps": { "generated": true } }),
                revalidate: Some(60),
                is_static: true,
            }),
        }
    }
}

impl RecordingRender {
    pub fn fail(&self, page: &str) {
        self.failing.lock().unwrap().insert(page.to_string());
    }

    pub fn calls(&self) -> Vec<(String, u16)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_static_render(&self, render: StaticRender) {
        *self.static_render.lock().unwrap() = render;
    }
}

#[async_trait]
impl RenderEngine for RecordingRender {
    async fn render(
        &self,
        page: &str,
        _request: &EdgeRequest,
        status: u16,
    ) -> Result<RenderedPage, RenderError> {
        self.calls.lock().unwrap().push((page.to_string(), status));
        if self.failing.lock().unwrap().contains(page) {
            return Err(RenderError::Status(500));
        }

        let mut headers = Headers::new();
        headers.set("Content-Type", "text/html");
        Ok(RenderedPage {
            status,
            headers,
            body: format!("{page}:{status}"),
        })
    }

    async fn render_static(
        &self,
        page: &str,
        _request: &EdgeRequest,
    ) -> Result<StaticRender, RenderError> {
        self.static_calls.lock().unwrap().push(page.to_string());
        if self.failing.lock().unwrap().contains(page) {
            return Err(RenderError::Status(500));
        }
        Ok(self.static_render.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct RecordingInvalidator {
    pub paths: Mutex<Vec<String>>,
}

impl RecordingInvalidator {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheInvalidator for RecordingInvalidator {
    async fn invalidate(&self, path: &str) -> Result<(), InvalidationError> {
        self.paths.lock().unwrap().push(path.to_string());
        Ok(())
    }
}

/// An edge handler wired to in-memory collaborators the test can inspect.
pub struct Harness {
    pub handler: EdgeHandler,
    pub manifests: Arc<ManifestSet>,
    pub store: Arc<MemoryObjectStore>,
    pub queue: Arc<RecordingQueue>,
    pub render: Arc<RecordingRender>,
    pub invalidator: Arc<RecordingInvalidator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_manifests(manifests(), &[])
    }

    pub fn with_manifests(manifests: ManifestSet, groups: &[InvalidationGroupConfig]) -> Self {
        let manifests = Arc::new(manifests);
        let store = Arc::new(MemoryObjectStore::new());
        let queue = Arc::new(RecordingQueue::default());
        let render = Arc::new(RecordingRender::default());
        let invalidator = Arc::new(RecordingInvalidator::default());

        let backends = Backends {
            store: store.clone(),
            queue: queue.clone(),
            render: render.clone(),
            invalidator: invalidator.clone(),
        };
        let handler = EdgeHandler::new(manifests.clone(), backends)
            .with_invalidation_groups(InvalidationGroupTracker::new(groups).unwrap());

        Self {
            handler,
            manifests,
            store,
            queue,
            render,
            invalidator,
        }
    }

    pub async fn put(&self, key: &str, body: &str, content_type: &str) {
        self.store
            .put(key, PutObject::new(body, content_type))
            .await
            .unwrap();
    }

    pub async fn get_body(&self, key: &str) -> Option<String> {
        self.store
            .get(key)
            .await
            .unwrap()
            .map(|object| String::from_utf8(object.body).unwrap())
    }
}

// --- Mock render upstream ---

/// Handle on a mock render service bound to a local port.
pub struct MockRenderUpstream {
    pub addr: SocketAddr,
    pub calls: Arc<AtomicU32>,
}

impl MockRenderUpstream {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Start a render service that answers 503 for the first `failures` calls.
pub async fn start_render_upstream(failures: u32) -> MockRenderUpstream {
    let calls = Arc::new(AtomicU32::new(0));

    let render_calls = calls.clone();
    let static_calls = calls.clone();
    let app = Router::new()
        .route(
            "/render",
            post(move |Json(body): Json<Value>| {
                let calls = render_calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < failures {
                        return Err(axum::http::StatusCode::SERVICE_UNAVAILABLE);
                    }
                    Ok(Json(json!({
                        "status": body["status"],
                        "headers": { "content-type": [{ "key": "Content-Type", "value": "text/html" }] },
                        "body": format!("<h1>{}</h1>", body["page"].as_str().unwrap_or_default()),
                    })))
                }
            }),
        )
        .route(
            "/render-static",
            post(move |Json(body): Json<Value>| {
                let calls = static_calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < failures {
                        return Err(axum::http::StatusCode::SERVICE_UNAVAILABLE);
                    }
                    Ok(Json(json!({
                        "html": format!("<h1>{}</h1>", body["page"].as_str().unwrap_or_default()),
                        "pageData": { "uri": body["request"]["uri"] },
                        "revalidate": 30,
                        "isStatic": true,
                    })))
                }
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockRenderUpstream { addr, calls }
}
