//! Vision oracle verdicts.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lowest score the oracle may return.
pub const VISION_SCORE_MIN: f64 = 0.0;
/// Highest score the oracle may return.
pub const VISION_SCORE_MAX: f64 = 100.0;

/// Result of asking the vision oracle to judge a frame.
///
/// The oracle is an unreliable collaborator: anything other than a finite
/// score inside `[0, 100]` is represented as `Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", content = "score", rename_all = "snake_case")]
pub enum VisionVerdict {
    /// The oracle returned a valid score.
    Scored(f64),
    /// Oracle unreachable, timed out, skipped, or returned an invalid value.
    Unavailable,
}

impl VisionVerdict {
    /// Validate a raw numeric response.
    pub fn from_raw(value: f64) -> Self {
        if value.is_finite() && (VISION_SCORE_MIN..=VISION_SCORE_MAX).contains(&value) {
            Self::Scored(value)
        } else {
            Self::Unavailable
        }
    }

    /// The score, if one was produced.
    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Scored(v) => Some(*v),
            Self::Unavailable => None,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, Self::Scored(_))
    }

    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scored(_) => "scored",
            Self::Unavailable => "unavailable",
        }
    }
}
