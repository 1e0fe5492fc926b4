//! Structured run logging.

use tracing::{info, warn, Span};
use vthumb_models::VideoId;

/// Logger for one generation run.
///
/// Every line carries the video id so a run can be followed across the
/// interleaved output of concurrent runs.
#[derive(Debug, Clone)]
pub struct RunLogger {
    video_id: String,
}

impl RunLogger {
    pub fn new(video_id: &VideoId) -> Self {
        Self {
            video_id: video_id.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(video_id = %self.video_id, "Run started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(video_id = %self.video_id, "Run progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(video_id = %self.video_id, "Run warning: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(video_id = %self.video_id, "Run completed: {}", message);
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Span wrapping the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("thumbnail_run", video_id = %self.video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_logger_creation() {
        let logger = RunLogger::new(&VideoId::parse("rec-9").unwrap());
        assert_eq!(logger.video_id(), "rec-9");
    }
}
