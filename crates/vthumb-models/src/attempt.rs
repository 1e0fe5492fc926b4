//! Per-attempt diagnostic records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::video::VideoId;

/// Outcome of one sampling attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Frame decoded and passed the brightness gate
    Success,
    /// Frame decoded but was below the brightness threshold
    RejectedDark,
    /// Decode failed or timed out
    Error,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::RejectedDark => "rejected_dark",
            AttemptOutcome::Error => "error",
        }
    }
}

/// Append-only record of a single attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AttemptRecord {
    pub video_id: VideoId,
    /// Zero-based index within the run
    pub attempt_index: u32,
    pub timestamp_secs: f64,
    /// Mean luma (0-255), absent when no frame was decoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_score: Option<f64>,
    pub outcome: AttemptOutcome,
    /// Error description for `error` outcomes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Record for a decoded frame.
    pub fn scored(
        video_id: VideoId,
        attempt_index: u32,
        timestamp_secs: f64,
        brightness: f64,
        pixel_score: f64,
        outcome: AttemptOutcome,
    ) -> Self {
        Self {
            video_id,
            attempt_index,
            timestamp_secs,
            brightness: Some(brightness),
            pixel_score: Some(pixel_score),
            outcome,
            detail: None,
            observed_at: Utc::now(),
        }
    }

    /// Record for a failed decode.
    pub fn errored(
        video_id: VideoId,
        attempt_index: u32,
        timestamp_secs: f64,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            video_id,
            attempt_index,
            timestamp_secs,
            brightness: None,
            pixel_score: None,
            outcome: AttemptOutcome::Error,
            detail: Some(detail.into()),
            observed_at: Utc::now(),
        }
    }
}
