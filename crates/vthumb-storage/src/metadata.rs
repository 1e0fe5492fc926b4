//! Artifact metadata stored as object metadata tags.
//!
//! Tags are flat string pairs, so every field is formatted as text. Parsing
//! is lenient: a stored object is a valid cache entry as long as it has a
//! body. Missing or unreadable tags fall back to neutral defaults.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use vthumb_models::{SelectionKind, ThumbnailArtifact, VideoId};

/// Version of the tag layout below.
pub const METADATA_SCHEMA_VERSION: &str = "1";

pub const KEY_VIDEO_ID: &str = "video-id";
pub const KEY_SELECTED_OFFSET: &str = "selected-offset";
pub const KEY_COMBINED_SCORE: &str = "combined-score";
pub const KEY_PIXEL_SCORE: &str = "pixel-score";
pub const KEY_VISION_SCORE: &str = "vision-score";
pub const KEY_ATTEMPTS_USED: &str = "attempts-used";
pub const KEY_SELECTION: &str = "selection";
pub const KEY_GENERATED_AT: &str = "generated-at";
pub const KEY_SCHEMA_VERSION: &str = "schema-version";

/// Format an artifact's fields as object metadata.
pub fn to_metadata(artifact: &ThumbnailArtifact) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    tags.insert(KEY_VIDEO_ID.to_string(), artifact.video_id.to_string());
    tags.insert(
        KEY_SELECTED_OFFSET.to_string(),
        format!("{:.3}", artifact.selected_timestamp_secs),
    );
    tags.insert(
        KEY_COMBINED_SCORE.to_string(),
        format!("{:.2}", artifact.combined_score),
    );
    tags.insert(
        KEY_PIXEL_SCORE.to_string(),
        format!("{:.2}", artifact.pixel_score),
    );
    if let Some(vision) = artifact.vision_score {
        tags.insert(KEY_VISION_SCORE.to_string(), format!("{:.2}", vision));
    }
    tags.insert(
        KEY_ATTEMPTS_USED.to_string(),
        artifact.attempts_used.to_string(),
    );
    tags.insert(
        KEY_SELECTION.to_string(),
        artifact.selection.as_str().to_string(),
    );
    tags.insert(
        KEY_GENERATED_AT.to_string(),
        artifact.generated_at.to_rfc3339(),
    );
    tags.insert(
        KEY_SCHEMA_VERSION.to_string(),
        METADATA_SCHEMA_VERSION.to_string(),
    );
    tags
}

/// Rebuild an artifact from a stored body and its tags.
///
/// `video_id` comes from the lookup key, not from the tags. `fallback_time`
/// is used when `generated-at` is missing (usually the object's
/// last-modified time).
pub fn from_metadata(
    video_id: &VideoId,
    image_bytes: Vec<u8>,
    tags: &HashMap<String, String>,
    fallback_time: Option<DateTime<Utc>>,
) -> ThumbnailArtifact {
    let generated_at = tags
        .get(KEY_GENERATED_AT)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .or(fallback_time)
        .unwrap_or_else(Utc::now);

    let selection = match tags.get(KEY_SELECTION) {
        Some(s) => SelectionKind::parse(s).unwrap_or_else(|| {
            warn!(video_id = %video_id, selection = %s, "Unknown selection tag on cached thumbnail");
            SelectionKind::default()
        }),
        None => SelectionKind::default(),
    };

    ThumbnailArtifact {
        video_id: video_id.clone(),
        image_bytes,
        selected_timestamp_secs: parse_f64(video_id, tags, KEY_SELECTED_OFFSET).unwrap_or(0.0),
        combined_score: parse_f64(video_id, tags, KEY_COMBINED_SCORE).unwrap_or(0.0),
        pixel_score: parse_f64(video_id, tags, KEY_PIXEL_SCORE).unwrap_or(0.0),
        vision_score: parse_f64(video_id, tags, KEY_VISION_SCORE),
        attempts_used: tags
            .get(KEY_ATTEMPTS_USED)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        selection,
        generated_at,
    }
}

fn parse_f64(video_id: &VideoId, tags: &HashMap<String, String>, key: &str) -> Option<f64> {
    let raw = tags.get(key)?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            warn!(video_id = %video_id, tag = key, value = %raw, "Unreadable metadata tag");
            None
        }
    }
}
