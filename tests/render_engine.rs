//! HTTP render engine against a mock render service.

use edge_router::backend::{HttpRenderEngine, RenderEngine, RenderError};
use edge_router::config::RenderConfig;
use edge_router::edge::EdgeRequest;

mod common;

use common::start_render_upstream;

fn config(upstream_url: String, max_attempts: u32) -> RenderConfig {
    RenderConfig {
        upstream_url,
        timeout_secs: 2,
        max_attempts,
        base_delay_ms: 1,
        max_delay_ms: 5,
    }
}

#[tokio::test]
async fn test_render_passes_page_and_status() {
    let upstream = start_render_upstream(0).await;
    let engine = HttpRenderEngine::new(&config(upstream.url(), 3)).unwrap();

    let page = engine
        .render("pages/blog/[slug].js", &EdgeRequest::new("/blog/a"), 404)
        .await
        .unwrap();

    assert_eq!(page.status, 404);
    assert_eq!(page.body, "<h1>pages/blog/[slug].js</h1>");
    assert_eq!(page.headers.get("content-type"), Some("text/html"));
    assert_eq!(upstream.call_count(), 1);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let upstream = start_render_upstream(2).await;
    let engine = HttpRenderEngine::new(&config(upstream.url(), 3)).unwrap();

    let page = engine
        .render("pages/index.js", &EdgeRequest::new("/"), 200)
        .await
        .unwrap();

    assert_eq!(page.status, 200);
    assert_eq!(upstream.call_count(), 3);
}

#[tokio::test]
async fn test_retries_exhausted_reports_last_status() {
    let upstream = start_render_upstream(5).await;
    let engine = HttpRenderEngine::new(&config(upstream.url(), 2)).unwrap();

    let err = engine
        .render("pages/index.js", &EdgeRequest::new("/"), 200)
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::Status(503)));
    assert_eq!(upstream.call_count(), 2);
}

#[tokio::test]
async fn test_render_static_parses_payload() {
    let upstream = start_render_upstream(0).await;
    let engine = HttpRenderEngine::new(&config(upstream.url(), 1)).unwrap();

    let render = engine
        .render_static("pages/isr.js", &EdgeRequest::new("/isr.html"))
        .await
        .unwrap();

    assert_eq!(render.html, "<h1>pages/isr.js</h1>");
    assert_eq!(render.page_data["uri"], "/isr.html");
    assert_eq!(render.revalidate, Some(30));
    assert!(render.is_static);
}

#[tokio::test]
async fn test_unreachable_upstream_is_an_error() {
    // Nothing listens on port 1
    let engine = HttpRenderEngine::new(&config("http://127.0.0.1:1".into(), 2)).unwrap();

    let err = engine
        .render("pages/index.js", &EdgeRequest::new("/"), 200)
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::Upstream(_)), "unexpected error: {err}");
}

#[test]
fn test_invalid_upstream_url_is_rejected() {
    let result = HttpRenderEngine::new(&config("not a url".into(), 1));
    assert!(matches!(result, Err(RenderError::Upstream(_))));
}
