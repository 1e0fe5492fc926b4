//! Shared data models for the video thumbnail engine.
//!
//! This crate provides Serde-serializable types for:
//! - Video identifiers (cache keys, single-flight keys, diagnostic grouping)
//! - Thumbnail artifacts and their selection metadata
//! - Per-attempt diagnostic records and summaries
//! - Vision oracle verdicts

pub mod attempt;
pub mod diagnostics;
pub mod thumbnail;
pub mod video;
pub mod vision;

// Re-export common types
pub use attempt::{AttemptOutcome, AttemptRecord};
pub use diagnostics::VideoDiagnosticSummary;
pub use thumbnail::{
    SelectionKind, ThumbnailArtifact, DEFAULT_JPEG_QUALITY, DEFAULT_THUMBNAIL_WIDTH,
    THUMBNAIL_CONTENT_TYPE,
};
pub use video::{VideoId, VideoIdError};
pub use vision::{VisionVerdict, VISION_SCORE_MAX, VISION_SCORE_MIN};
