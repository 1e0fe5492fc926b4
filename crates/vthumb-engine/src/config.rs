//! Engine configuration.

use std::str::FromStr;
use std::time::Duration;

use vthumb_media::{QualityConfig, SamplerConfig};
use vthumb_models::{DEFAULT_JPEG_QUALITY, DEFAULT_THUMBNAIL_WIDTH};

use crate::ranker::RankWeights;

/// Thumbnail engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sampling attempts per generation run
    pub max_attempts: usize,
    /// Mean luma below which a frame is rejected as dark (0-255)
    pub dark_threshold: f64,
    /// Weight of the pixel score in the combined score
    pub pixel_weight: f64,
    /// Weight of the oracle score in the combined score
    pub vision_weight: f64,
    /// A candidate scoring above this ends the run early
    pub early_stop_score: f64,
    /// Once the best combined score reaches this, the oracle is no longer consulted
    pub oracle_skip_score: f64,
    /// Oracle calls allowed per run
    pub max_oracle_calls: u32,
    /// Bound on one seek+decode
    pub decode_timeout: Duration,
    /// Bound on one oracle call
    pub oracle_timeout: Duration,
    /// Generation runs allowed to execute at once across all videos
    pub max_concurrent_runs: usize,
    /// Attempt records kept per video
    pub diagnostic_retention: usize,
    /// Output width of stored thumbnails
    pub thumbnail_width: u32,
    pub jpeg_quality: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            dark_threshold: 10.0,
            pixel_weight: 0.4,
            vision_weight: 0.6,
            early_stop_score: 90.0,
            oracle_skip_score: 80.0,
            max_oracle_calls: 6,
            decode_timeout: Duration::from_secs(8),
            oracle_timeout: Duration::from_secs(20),
            max_concurrent_runs: 2,
            diagnostic_retention: 200,
            thumbnail_width: DEFAULT_THUMBNAIL_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_or("THUMB_MAX_ATTEMPTS", defaults.max_attempts),
            dark_threshold: env_or("THUMB_DARK_THRESHOLD", defaults.dark_threshold),
            pixel_weight: env_or("THUMB_PIXEL_WEIGHT", defaults.pixel_weight),
            vision_weight: env_or("THUMB_VISION_WEIGHT", defaults.vision_weight),
            early_stop_score: env_or("THUMB_EARLY_STOP_SCORE", defaults.early_stop_score),
            oracle_skip_score: env_or("THUMB_ORACLE_SKIP_SCORE", defaults.oracle_skip_score),
            max_oracle_calls: env_or("THUMB_MAX_ORACLE_CALLS", defaults.max_oracle_calls),
            decode_timeout: Duration::from_secs(env_or(
                "THUMB_DECODE_TIMEOUT_SECS",
                defaults.decode_timeout.as_secs(),
            )),
            oracle_timeout: Duration::from_secs(env_or(
                "THUMB_ORACLE_TIMEOUT_SECS",
                defaults.oracle_timeout.as_secs(),
            )),
            max_concurrent_runs: env_or("THUMB_MAX_CONCURRENT_RUNS", defaults.max_concurrent_runs)
                .max(1),
            diagnostic_retention: env_or("THUMB_DIAGNOSTIC_RETENTION", defaults.diagnostic_retention),
            thumbnail_width: env_or("THUMB_WIDTH", defaults.thumbnail_width),
            jpeg_quality: env_or("THUMB_JPEG_QUALITY", defaults.jpeg_quality).clamp(1, 100),
        }
    }

    /// Normalised combined-score weights.
    pub fn rank_weights(&self) -> RankWeights {
        RankWeights::new(self.pixel_weight, self.vision_weight)
    }

    pub fn quality_config(&self) -> QualityConfig {
        QualityConfig {
            dark_threshold: self.dark_threshold,
            ..Default::default()
        }
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            width: self.thumbnail_width,
            decode_timeout: self.decode_timeout,
            ..Default::default()
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
