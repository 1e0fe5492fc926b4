//! Engine error types.

use std::time::Duration;

use thiserror::Error;
use vthumb_media::MediaError;
use vthumb_models::VideoId;
use vthumb_storage::StorageError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors visible to callers of the engine.
///
/// `Clone` so that one run's failure can be handed to every caller waiting
/// on it.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// No decodable frame was found; nothing was cached.
    #[error("Thumbnail generation failed for {video_id} after {attempts} attempts")]
    GenerationFailed { video_id: VideoId, attempts: u32 },

    #[error("Video source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Engine shutting down")]
    ShuttingDown,
}

impl EngineError {
    pub fn generation_failed(video_id: &VideoId, attempts: u32) -> Self {
        Self::GenerationFailed {
            video_id: video_id.clone(),
            attempts,
        }
    }

    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether callers should fall back to a placeholder image.
    pub fn wants_placeholder(&self) -> bool {
        matches!(
            self,
            EngineError::GenerationFailed { .. } | EngineError::SourceUnavailable(_)
        )
    }
}

impl From<StorageError> for EngineError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Why a single sampling attempt produced no frame.
///
/// Absorbed by the coordinator and recorded as an `error` attempt.
#[derive(Debug, Clone, Error)]
pub enum AttemptError {
    #[error("decode error: {0}")]
    Decode(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl AttemptError {
    /// Metric/log label.
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::Decode(_) => "decode_error",
            AttemptError::Timeout(_) => "timeout",
        }
    }
}

impl From<MediaError> for AttemptError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::Timeout(d) => AttemptError::Timeout(d),
            other => AttemptError::Decode(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_error_classification() {
        let timeout: AttemptError = MediaError::Timeout(Duration::from_secs(8)).into();
        assert_eq!(timeout.kind(), "timeout");

        let decode: AttemptError = MediaError::decode_failed("corrupt packet").into();
        assert_eq!(decode.kind(), "decode_error");
        assert!(decode.to_string().contains("corrupt packet"));
    }

    #[test]
    fn test_placeholder_errors() {
        let id = VideoId::parse("v1").unwrap();
        assert!(EngineError::generation_failed(&id, 20).wants_placeholder());
        assert!(EngineError::source_unavailable("missing").wants_placeholder());
        assert!(!EngineError::Storage("down".into()).wants_placeholder());
    }
}
