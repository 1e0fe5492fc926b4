//! Operator-facing diagnostic summaries.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::attempt::{AttemptOutcome, AttemptRecord};
use crate::video::VideoId;

/// Live summary of the attempts recorded for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoDiagnosticSummary {
    pub video_id: VideoId,
    /// Total attempts ever recorded (including pruned ones)
    pub attempts: u64,
    /// Successful attempts ever recorded
    pub successes: u64,
    /// `successes / attempts`, 0 when nothing was recorded
    pub success_rate: f64,
    pub last_outcome: Option<AttemptOutcome>,
    /// Brightest frame among retained records
    pub best_brightness: Option<f64>,
    pub last_observed_at: Option<DateTime<Utc>>,
    /// Retained records, oldest first
    pub recent: Vec<AttemptRecord>,
}

impl VideoDiagnosticSummary {
    /// Empty summary for a video with no recorded attempts.
    pub fn empty(video_id: VideoId) -> Self {
        Self {
            video_id,
            attempts: 0,
            successes: 0,
            success_rate: 0.0,
            last_outcome: None,
            best_brightness: None,
            last_observed_at: None,
            recent: Vec::new(),
        }
    }
}
