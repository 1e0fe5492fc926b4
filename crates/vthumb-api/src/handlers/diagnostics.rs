//! Diagnostic summaries for operator tooling.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use vthumb_models::{VideoDiagnosticSummary, VideoId};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct DiagnosticsListResponse {
    pub videos: Vec<VideoDiagnosticSummary>,
    pub count: usize,
}

/// Summaries for every video with recorded attempts.
pub async fn list_diagnostics(State(state): State<AppState>) -> Json<DiagnosticsListResponse> {
    let videos = state.service.recorder().summary_all().await;
    Json(DiagnosticsListResponse {
        count: videos.len(),
        videos,
    })
}

/// Summary for one video. Empty when nothing was recorded.
pub async fn get_video_diagnostics(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoDiagnosticSummary>> {
    let video_id = VideoId::parse(video_id)?;
    Ok(Json(state.service.recorder().summary_for(&video_id).await))
}
