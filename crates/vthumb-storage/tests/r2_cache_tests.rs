//! R2 cache writes against a mocked S3 endpoint.

use chrono::Utc;
use vthumb_models::{SelectionKind, ThumbnailArtifact, VideoId};
use vthumb_storage::{PutOutcome, R2Client, R2Config, R2ThumbnailCache, ThumbnailCache};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BUCKET: &str = "thumbs";

async fn cache_for(server: &MockServer) -> R2ThumbnailCache {
    let client = R2Client::new(R2Config {
        endpoint_url: server.uri(),
        access_key_id: "test-key".to_string(),
        secret_access_key: "test-secret".to_string(),
        bucket_name: BUCKET.to_string(),
        region: "auto".to_string(),
    })
    .await
    .unwrap();
    R2ThumbnailCache::new(client, "thumbnails")
}

fn artifact(id: &str) -> ThumbnailArtifact {
    ThumbnailArtifact {
        video_id: VideoId::parse(id).unwrap(),
        image_bytes: vec![0xFF, 0xD8, 0xFF, 0xD9],
        selected_timestamp_secs: 12.0,
        combined_score: 71.5,
        pixel_score: 64.0,
        vision_score: Some(76.5),
        attempts_used: 4,
        selection: SelectionKind::Ranked,
        generated_at: Utc::now(),
    }
}

#[tokio::test]
async fn put_is_a_conditional_write() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/thumbs/thumbnails/rec-1.jpg"))
        .and(header("if-none-match", "*"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"abc\""))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = cache_for(&server).await.put(&artifact("rec-1")).await.unwrap();

    assert_eq!(outcome, PutOutcome::Stored);
}

#[tokio::test]
async fn put_keeps_entry_written_by_another_instance() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/thumbs/thumbnails/rec-2.jpg"))
        .and(header("if-none-match", "*"))
        .respond_with(ResponseTemplate::new(412).set_body_string(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Error><Code>PreconditionFailed</Code>\
             <Message>At least one of the pre-conditions you specified did not hold</Message></Error>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = cache_for(&server).await.put(&artifact("rec-2")).await.unwrap();

    assert_eq!(outcome, PutOutcome::AlreadyPresent);
}

#[tokio::test]
async fn put_surfaces_other_write_errors() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/thumbs/thumbnails/rec-3.jpg"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
        ))
        .mount(&server)
        .await;

    let err = cache_for(&server)
        .await
        .put(&artifact("rec-3"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("thumbnails/rec-3.jpg"));
}
