//! Thumbnail delivery, metadata and invalidation.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};
use vthumb_engine::{EngineError, ThumbnailLookup};
use vthumb_models::{ThumbnailArtifact, VideoId, THUMBNAIL_CONTENT_TYPE};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

pub const CACHE_HEADER: &str = "x-thumbnail-cache";
pub const OFFSET_HEADER: &str = "x-thumbnail-offset";
pub const SCORE_HEADER: &str = "x-thumbnail-score";
pub const SELECTION_HEADER: &str = "x-thumbnail-selection";
pub const PLACEHOLDER_HEADER: &str = "x-thumbnail-placeholder";

/// Clients may store the image but must revalidate it, so an invalidation
/// is visible on the next request.
const STORED_CACHE_CONTROL: &str = "public, no-cache";

/// Serve a video's thumbnail, generating it on first request.
///
/// When no thumbnail can be produced a placeholder image is served with
/// `X-Thumbnail-Placeholder: true` instead of an error. A matching
/// `If-None-Match` gets `304 Not Modified`.
pub async fn get_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let video_id = VideoId::parse(video_id)?;

    match state.service.get_or_generate(&video_id).await {
        Ok(lookup) => {
            let etag = entity_tag(&lookup.artifact);
            if if_none_match(&headers, &etag) {
                return Ok(not_modified(etag));
            }
            Ok(thumbnail_response(lookup, etag))
        }
        Err(e) if e.wants_placeholder() => {
            warn!(video_id = %video_id, error = %e, "Serving placeholder thumbnail");
            metrics::record_placeholder_served(placeholder_reason(&e));
            Ok(placeholder_response(&state))
        }
        Err(e) => Err(e.into()),
    }
}

/// Cached thumbnail metadata.
#[derive(Serialize)]
pub struct ThumbnailMetaResponse {
    #[serde(flatten)]
    pub artifact: ThumbnailArtifact,
    pub byte_len: usize,
}

/// Metadata of the cached thumbnail. Never triggers generation.
pub async fn get_thumbnail_meta(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<ThumbnailMetaResponse>> {
    let video_id = VideoId::parse(video_id)?;

    let artifact = state
        .service
        .cached(&video_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no thumbnail cached for {}", video_id)))?;

    Ok(Json(ThumbnailMetaResponse {
        byte_len: artifact.byte_len(),
        artifact,
    }))
}

/// Drop the cached thumbnail so the next request regenerates it.
pub async fn delete_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<StatusCode> {
    let video_id = VideoId::parse(video_id)?;
    let removed = state.service.invalidate(&video_id).await?;
    info!(video_id = %video_id, removed = removed, "Thumbnail invalidated via API");
    Ok(StatusCode::NO_CONTENT)
}

/// Strong validator for a stored artifact. A regenerated thumbnail always
/// carries a new `generated_at`, so its tag changes after invalidation.
fn entity_tag(artifact: &ThumbnailArtifact) -> String {
    let stamp = artifact
        .generated_at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| artifact.generated_at.timestamp_millis());
    format!("\"{}-{:x}\"", artifact.video_id, stamp)
}

fn if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|tag| tag.trim().trim_start_matches("W/"))
        .any(|tag| tag == etag || tag == "*")
}

fn not_modified(etag: String) -> Response {
    (
        StatusCode::NOT_MODIFIED,
        [
            (header::ETAG, etag),
            (header::CACHE_CONTROL, STORED_CACHE_CONTROL.to_string()),
        ],
    )
        .into_response()
}

fn thumbnail_response(lookup: ThumbnailLookup, etag: String) -> Response {
    let artifact = lookup.artifact;
    let headers = [
        (header::CONTENT_TYPE, THUMBNAIL_CONTENT_TYPE.to_string()),
        (header::CACHE_CONTROL, STORED_CACHE_CONTROL.to_string()),
        (header::ETAG, etag),
        (
            HeaderName::from_static(CACHE_HEADER),
            lookup.source.as_str().to_string(),
        ),
        (
            HeaderName::from_static(OFFSET_HEADER),
            format!("{:.3}", artifact.selected_timestamp_secs),
        ),
        (
            HeaderName::from_static(SCORE_HEADER),
            format!("{:.2}", artifact.combined_score),
        ),
        (
            HeaderName::from_static(SELECTION_HEADER),
            artifact.selection.as_str().to_string(),
        ),
    ];

    (StatusCode::OK, headers, Body::from(artifact.image_bytes)).into_response()
}

fn placeholder_response(state: &AppState) -> Response {
    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, THUMBNAIL_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        Body::from(state.placeholder.clone()),
    )
        .into_response();
    response
        .headers_mut()
        .insert(PLACEHOLDER_HEADER, HeaderValue::from_static("true"));
    response
}

fn placeholder_reason(e: &EngineError) -> &'static str {
    match e {
        EngineError::SourceUnavailable(_) => "source_unavailable",
        _ => "generation_failed",
    }
}
