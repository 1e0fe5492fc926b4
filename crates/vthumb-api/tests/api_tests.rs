//! API integration tests against an in-memory engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use vthumb_api::{create_router, ApiConfig, AppState};
use vthumb_engine::{
    DiagnosticRecorder, EngineConfig, GenerationCoordinator, StaticSourceResolver,
    ThumbnailService,
};
use vthumb_media::{FrameSampler, MediaError, MediaResult, RgbaFrame, SamplerFactory, VideoSource};
use vthumb_models::VideoId;
use vthumb_oracle::DisabledOracle;
use vthumb_storage::MemoryThumbnailCache;

/// Decoder that returns the same well lit frame everywhere, or cannot
/// decode anything at all.
struct FixedFactory {
    broken: bool,
    opens: Arc<AtomicUsize>,
}

struct FixedSampler {
    broken: bool,
}

#[async_trait]
impl SamplerFactory for FixedFactory {
    async fn open(&self, _source: &VideoSource) -> MediaResult<Box<dyn FrameSampler>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixedSampler {
            broken: self.broken,
        }))
    }
}

#[async_trait]
impl FrameSampler for FixedSampler {
    fn duration(&self) -> Option<f64> {
        Some(60.0)
    }

    async fn sample(&mut self, _timestamp_secs: f64) -> MediaResult<RgbaFrame> {
        if self.broken {
            return Err(MediaError::decode_failed("truncated stream"));
        }
        let (width, height) = (48u32, 27u32);
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = if ((x / 3) + (y / 3)) % 2 == 0 { 60 } else { 200 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        RgbaFrame::new(width, height, data)
    }
}

struct TestApp {
    router: Router,
    opens: Arc<AtomicUsize>,
}

impl TestApp {
    fn new(broken: bool) -> Self {
        let opens = Arc::new(AtomicUsize::new(0));
        let config = EngineConfig {
            max_attempts: 3,
            early_stop_score: 101.0,
            thumbnail_width: 64,
            ..Default::default()
        };
        let cache = Arc::new(MemoryThumbnailCache::new());
        let recorder = DiagnosticRecorder::spawn(config.diagnostic_retention);
        let resolver = ["rec-1", "rec-2", "rec-broken"]
            .iter()
            .fold(StaticSourceResolver::new(), |r, v| {
                r.with_source(
                    VideoId::parse(*v).unwrap(),
                    VideoSource::Url(format!("https://media.test/{}.mp4", v)),
                )
            });
        let coordinator = GenerationCoordinator::new(
            config,
            Arc::new(FixedFactory {
                broken,
                opens: Arc::clone(&opens),
            }),
            Arc::new(DisabledOracle),
            cache.clone(),
            recorder.clone(),
        );
        let service = ThumbnailService::new(cache, Arc::new(resolver), coordinator, recorder);
        let state = AppState::new(ApiConfig::default(), service).unwrap();

        Self {
            router: create_router(state, None),
            opens,
        }
    }

    async fn send(&self, method: Method, uri: &str) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Method::GET, uri).await
    }

    fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new(false);

    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_ready_with_memory_cache() {
    let app = TestApp::new(false);

    let response = app.get("/ready").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["cache"]["status"], "ok");
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let app = TestApp::new(false);

    let response = app.get("/metrics").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_thumbnail_generated_then_served_from_cache() {
    let app = TestApp::new(false);

    let first = app.get("/api/thumbnails/rec-1").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header(&first, "content-type"), Some("image/jpeg"));
    assert_eq!(header(&first, "x-thumbnail-cache"), Some("miss"));
    assert_eq!(header(&first, "x-thumbnail-selection"), Some("ranked"));
    assert!(header(&first, "x-thumbnail-offset").is_some());
    assert!(header(&first, "x-thumbnail-score").is_some());
    assert!(header(&first, "x-thumbnail-placeholder").is_none());
    let first_body = body_bytes(first).await;
    assert_eq!(&first_body[..2], &[0xFF, 0xD8]);

    let second = app.get("/api/thumbnails/rec-1").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header(&second, "x-thumbnail-cache"), Some("hit"));
    assert_eq!(body_bytes(second).await, first_body);

    assert_eq!(app.open_count(), 1);
}

#[tokio::test]
async fn test_invalid_video_id_is_rejected() {
    let app = TestApp::new(false);

    let response = app.get("/api/thumbnails/bad%20id").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("invalid character"));
    assert_eq!(app.open_count(), 0);
}

#[tokio::test]
async fn test_unknown_video_gets_placeholder() {
    let app = TestApp::new(false);

    let response = app.get("/api/thumbnails/rec-unknown").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-thumbnail-placeholder"), Some("true"));
    assert_eq!(header(&response, "cache-control"), Some("no-store"));
    assert_eq!(&body_bytes(response).await[..2], &[0xFF, 0xD8]);
    assert_eq!(app.open_count(), 0);
}

#[tokio::test]
async fn test_failed_generation_gets_placeholder_and_is_retried() {
    let app = TestApp::new(true);

    let first = app.get("/api/thumbnails/rec-broken").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header(&first, "x-thumbnail-placeholder"), Some("true"));

    let meta = app.get("/api/thumbnails/rec-broken/meta").await;
    assert_eq!(meta.status(), StatusCode::NOT_FOUND);

    let second = app.get("/api/thumbnails/rec-broken").await;
    assert_eq!(header(&second, "x-thumbnail-placeholder"), Some("true"));
    assert_eq!(app.open_count(), 2);
}

#[tokio::test]
async fn test_meta_never_generates() {
    let app = TestApp::new(false);

    let missing = app.get("/api/thumbnails/rec-2/meta").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert!(body_json(missing).await["detail"].is_string());
    assert_eq!(app.open_count(), 0);

    app.get("/api/thumbnails/rec-2").await;

    let meta = app.get("/api/thumbnails/rec-2/meta").await;
    assert_eq!(meta.status(), StatusCode::OK);
    let body = body_json(meta).await;
    assert_eq!(body["video_id"], "rec-2");
    assert_eq!(body["attempts_used"], 3);
    assert_eq!(body["selection"], "ranked");
    assert!(body["byte_len"].as_u64().unwrap() > 0);
    assert!(body.get("vision_score").is_none());
}

#[tokio::test]
async fn test_delete_invalidates() {
    let app = TestApp::new(false);

    app.get("/api/thumbnails/rec-1").await;

    let deleted = app.send(Method::DELETE, "/api/thumbnails/rec-1").await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let meta = app.get("/api/thumbnails/rec-1/meta").await;
    assert_eq!(meta.status(), StatusCode::NOT_FOUND);

    let regenerated = app.get("/api/thumbnails/rec-1").await;
    assert_eq!(header(&regenerated, "x-thumbnail-cache"), Some("miss"));
    assert_eq!(app.open_count(), 2);

    // Deleting a missing entry is not an error
    let again = app.send(Method::DELETE, "/api/thumbnails/rec-never").await;
    assert_eq!(again.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_clients_revalidate_and_see_invalidation() {
    let app = TestApp::new(false);

    let first = app.get("/api/thumbnails/rec-1").await;
    assert_eq!(header(&first, "cache-control"), Some("public, no-cache"));
    let etag = header(&first, "etag").unwrap().to_string();

    let revalidated = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/thumbnails/rec-1")
                .header("If-None-Match", &etag)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(revalidated.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(header(&revalidated, "etag"), Some(etag.as_str()));
    assert!(body_bytes(revalidated).await.is_empty());

    app.send(Method::DELETE, "/api/thumbnails/rec-1").await;

    let after_delete = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/thumbnails/rec-1")
                .header("If-None-Match", &etag)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(after_delete.status(), StatusCode::OK);
    assert_ne!(header(&after_delete, "etag"), Some(etag.as_str()));
    assert_eq!(header(&after_delete, "x-thumbnail-cache"), Some("miss"));
}

#[tokio::test]
async fn test_diagnostics_endpoints() {
    let app = TestApp::new(false);

    app.get("/api/thumbnails/rec-1").await;

    let list = app.get("/api/diagnostics").await;
    assert_eq!(list.status(), StatusCode::OK);
    let body = body_json(list).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["videos"][0]["video_id"], "rec-1");

    let single = app.get("/api/diagnostics/rec-1").await;
    let body = body_json(single).await;
    assert_eq!(body["attempts"], 3);
    assert_eq!(body["successes"], 3);
    assert_eq!(body["recent"].as_array().unwrap().len(), 3);

    let empty = app.get("/api/diagnostics/rec-2").await;
    assert_eq!(body_json(empty).await["attempts"], 0);
}

#[tokio::test]
async fn test_response_carries_request_id_and_security_headers() {
    let app = TestApp::new(false);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("X-Request-ID", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(header(&response, "x-request-id"), Some("req-123"));
    assert_eq!(header(&response, "x-content-type-options"), Some("nosniff"));

    let generated = app.get("/health").await;
    assert!(header(&generated, "x-request-id").is_some());
}
