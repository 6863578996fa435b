//! Regeneration round trip: stale hit → queue → worker → store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use edge_router::backend::{Backends, MemoryObjectStore, MemoryQueue, ObjectStore, StaticRender};
use edge_router::config::RegenerationConfig;
use edge_router::edge::{EdgeHandler, EdgeResponse, HookOutcome};
use edge_router::lifecycle::Shutdown;
use edge_router::regeneration::RegenerationWorker;

mod common;

use common::{cdn_request, manifests, RecordingInvalidator, RecordingRender};

struct Pipeline {
    handler: EdgeHandler,
    worker: RegenerationWorker,
    messages: tokio::sync::mpsc::Receiver<edge_router::backend::QueueMessage>,
    store: Arc<MemoryObjectStore>,
    render: Arc<RecordingRender>,
}

fn pipeline() -> Pipeline {
    let manifests = Arc::new(manifests());
    let store = Arc::new(MemoryObjectStore::new());
    let render = Arc::new(RecordingRender::default());
    let (queue, messages) = MemoryQueue::new(&RegenerationConfig::default());

    let backends = Backends {
        store: store.clone(),
        queue: Arc::new(queue),
        render: render.clone(),
        invalidator: Arc::new(RecordingInvalidator::default()),
    };

    Pipeline {
        handler: EdgeHandler::new(manifests.clone(), backends),
        worker: RegenerationWorker::new(manifests, store.clone(), render.clone()),
        messages,
        store,
        render,
    }
}

/// Forward `uri` to the store, then answer it with `response` at 17:15:00.
async fn serve_from_store(pipeline: &Pipeline, uri: &str, response: EdgeResponse) -> EdgeResponse {
    let HookOutcome::Request(request) = pipeline.handler.handle_origin_request(cdn_request(uri)).await
    else {
        panic!("{uri} should be served from the store");
    };

    pipeline
        .handler
        .handle_origin_response_at(
            request,
            response,
            Utc.with_ymd_and_hms(2021, 5, 5, 17, 15, 0).unwrap(),
        )
        .await
        .unwrap()
}

fn expired_response(etag: &str) -> EdgeResponse {
    let mut response = EdgeResponse::new(200, "OK");
    response.headers.set("Expires", "Wed, 05 May 2021 17:14:00 GMT");
    response.headers.set("ETag", etag);
    response
}

async fn serve_stale_isr_page(pipeline: &Pipeline, etag: &str) {
    serve_from_store(pipeline, "/isr", expired_response(etag)).await;
}

#[tokio::test]
async fn test_stale_page_is_regenerated_into_store() {
    let mut pipeline = pipeline();
    serve_stale_isr_page(&pipeline, "\"v1\"").await;

    let message = pipeline.messages.try_recv().expect("regeneration enqueued");
    let now = Utc.with_ymd_and_hms(2021, 5, 5, 17, 16, 0).unwrap();
    let keys = pipeline.worker.process(&message, now).await.unwrap().unwrap();

    assert_eq!(keys.html, "static-pages/isr.html");
    assert_eq!(keys.json, "_next/data/build-id/isr.json");

    let html = pipeline.store.get(&keys.html).await.unwrap().unwrap();
    assert_eq!(html.body, b"<p>generated</p>");
    assert_eq!(html.expires, Some(now + chrono::Duration::seconds(60)));
    assert!(pipeline.store.get(&keys.json).await.unwrap().is_some());

    assert_eq!(
        pipeline.render.static_calls.lock().unwrap().clone(),
        vec!["pages/isr.js".to_string()]
    );
}

#[tokio::test]
async fn test_stale_data_payload_regenerates_page_keys() {
    let mut pipeline = pipeline();
    serve_from_store(&pipeline, "/_next/data/build-id/isr.json", expired_response("\"d1\"")).await;

    let message = pipeline.messages.try_recv().expect("regeneration enqueued");
    let now = Utc.with_ymd_and_hms(2021, 5, 5, 17, 16, 0).unwrap();
    let keys = pipeline.worker.process(&message, now).await.unwrap().unwrap();

    assert_eq!(keys.html, "static-pages/isr.html");
    assert_eq!(keys.json, "_next/data/build-id/isr.json");
    assert!(pipeline.store.get("_next/data/build-id/isr.json").await.unwrap().is_some());
    assert_eq!(
        pipeline.render.static_calls.lock().unwrap().clone(),
        vec!["pages/isr.js".to_string()]
    );
}

#[tokio::test]
async fn test_build_time_data_payload_is_eligible_by_last_modified() {
    let mut pipeline = pipeline();
    let mut response = EdgeResponse::new(200, "OK");
    response.headers.set("Last-Modified", "Wed, 05 May 2021 17:00:00 GMT");

    let served = serve_from_store(&pipeline, "/_next/data/build-id/isr.json", response).await;

    assert_eq!(
        served.headers.get("cache-control"),
        Some("public, max-age=0, s-maxage=0, must-revalidate")
    );
    let message = pipeline.messages.try_recv().expect("regeneration enqueued");
    assert_eq!(message.deduplication_id, "1620234000000");
}

#[tokio::test]
async fn test_repeated_stale_hits_enqueue_once() {
    let mut pipeline = pipeline();
    serve_stale_isr_page(&pipeline, "\"v1\"").await;
    serve_stale_isr_page(&pipeline, "\"v1\"").await;
    serve_stale_isr_page(&pipeline, "\"v2\"").await;

    assert_eq!(pipeline.messages.try_recv().unwrap().deduplication_id, "\"v1\"");
    assert_eq!(pipeline.messages.try_recv().unwrap().deduplication_id, "\"v2\"");
    assert!(pipeline.messages.try_recv().is_err());
}

#[tokio::test]
async fn test_manifest_window_used_when_render_reports_none() {
    let mut pipeline = pipeline();
    pipeline.render.set_static_render(StaticRender {
        html: "<p>fresh</p>".into(),
        page_data: serde_json::json!({}),
        revalidate: None,
        is_static: true,
    });
    serve_stale_isr_page(&pipeline, "\"v1\"").await;

    let message = pipeline.messages.try_recv().unwrap();
    let now = Utc.with_ymd_and_hms(2021, 5, 5, 17, 16, 0).unwrap();
    let keys = pipeline.worker.process(&message, now).await.unwrap().unwrap();

    let html = pipeline.store.get(&keys.html).await.unwrap().unwrap();
    assert_eq!(html.expires, Some(now + chrono::Duration::seconds(10)));
}

#[tokio::test]
async fn test_page_no_longer_static_is_skipped() {
    let mut pipeline = pipeline();
    pipeline.render.set_static_render(StaticRender {
        html: String::new(),
        page_data: serde_json::json!({}),
        revalidate: None,
        is_static: false,
    });
    serve_stale_isr_page(&pipeline, "\"v1\"").await;

    let message = pipeline.messages.try_recv().unwrap();
    let written = pipeline.worker.process(&message, Utc::now()).await.unwrap();

    assert!(written.is_none());
    assert!(pipeline.store.is_empty());
}

#[tokio::test]
async fn test_malformed_message_is_an_error() {
    let pipeline = pipeline();
    let message = edge_router::backend::QueueMessage {
        queue_url: "https://sqs.us-east-1.amazonaws.com/my-bucket.fifo".into(),
        body: "{not json".into(),
        deduplication_id: "x".into(),
        group_id: "y".into(),
    };

    assert!(pipeline.worker.process(&message, Utc::now()).await.is_err());
}

#[tokio::test]
async fn test_worker_loop_drains_queue_and_stops_on_shutdown() {
    let pipeline = pipeline();
    serve_stale_isr_page(&pipeline, "\"v1\"").await;

    let Pipeline {
        worker,
        messages,
        store,
        ..
    } = pipeline;
    let shutdown = Shutdown::new();
    let task = tokio::spawn(worker.run(messages, shutdown.subscribe()));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while store.get("static-pages/isr.html").await.unwrap().is_none() {
        assert!(tokio::time::Instant::now() < deadline, "worker did not regenerate the page");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("worker should stop")
        .unwrap();
}
