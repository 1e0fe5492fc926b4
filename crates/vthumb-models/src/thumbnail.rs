//! Thumbnail artifact model.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::video::VideoId;

/// Default output width of stored thumbnails
pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 640;
/// Default JPEG quality of stored thumbnails
pub const DEFAULT_JPEG_QUALITY: u8 = 85;
/// Content type of stored thumbnails
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

/// How the stored frame was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    /// Highest combined score among accepted candidates
    #[default]
    Ranked,
    /// No candidate passed the brightness gate; brightest rejected frame kept
    DarkFallback,
}

impl SelectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionKind::Ranked => "ranked",
            SelectionKind::DarkFallback => "dark_fallback",
        }
    }

    /// Parse the `as_str` form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ranked" => Some(SelectionKind::Ranked),
            "dark_fallback" => Some(SelectionKind::DarkFallback),
            _ => None,
        }
    }
}

/// The durable, cached thumbnail for one video.
///
/// At most one exists per [`VideoId`]; it is only replaced after an explicit
/// invalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThumbnailArtifact {
    pub video_id: VideoId,

    /// Encoded still image (JPEG). Not part of the JSON metadata.
    #[serde(skip)]
    pub image_bytes: Vec<u8>,

    /// Offset of the selected frame, in seconds from the start
    pub selected_timestamp_secs: f64,

    /// Fused score used for ranking (0-100)
    pub combined_score: f64,

    /// Local heuristic score (0-100)
    pub pixel_score: f64,

    /// Oracle score (0-100), absent when the oracle was skipped or unavailable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_score: Option<f64>,

    /// Number of sampling attempts made in the run that produced this artifact
    pub attempts_used: u32,

    #[serde(default)]
    pub selection: SelectionKind,

    pub generated_at: DateTime<Utc>,
}

impl ThumbnailArtifact {
    /// Size of the encoded image.
    pub fn byte_len(&self) -> usize {
        self.image_bytes.len()
    }

    /// Whether the artifact is a degraded fallback frame.
    pub fn is_fallback(&self) -> bool {
        self.selection == SelectionKind::DarkFallback
    }
}
