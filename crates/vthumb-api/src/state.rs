//! Application state.

use std::sync::Arc;

use axum::body::Bytes;
use tracing::{info, warn};
use vthumb_engine::{
    DiagnosticRecorder, EngineConfig, GenerationCoordinator, R2SourceResolver, SourceConfig,
    ThumbnailService, UrlTemplateResolver, VideoSourceResolver,
};
use vthumb_media::{check_ffmpeg, placeholder_jpeg, FfmpegSamplerFactory};
use vthumb_oracle::{DisabledOracle, GeminiVisionOracle, OracleConfig, VisionOracle};
use vthumb_storage::{R2ThumbnailCache, ThumbnailCache};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub service: Arc<ThumbnailService>,
    /// JPEG served when no thumbnail can be produced
    pub placeholder: Bytes,
}

impl AppState {
    /// Wrap an already-assembled service.
    pub fn new(config: ApiConfig, service: ThumbnailService) -> ApiResult<Self> {
        let width = service.config().thumbnail_width.max(16);
        let placeholder = placeholder_jpeg(width, width * 9 / 16)
            .map_err(|e| ApiError::internal(format!("placeholder encoding failed: {}", e)))?;

        Ok(Self {
            config,
            service: Arc::new(service),
            placeholder: Bytes::from(placeholder),
        })
    }

    /// Assemble the engine from environment variables.
    pub async fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let engine_config = EngineConfig::from_env();

        let cache = R2ThumbnailCache::from_env().await?;
        info!(prefix = %cache.prefix(), "Thumbnail cache configured");

        let resolver: Arc<dyn VideoSourceResolver> = match SourceConfig::from_env()? {
            SourceConfig::R2Key { template, ttl } => {
                info!(template = %template, "Resolving video sources from R2 keys");
                Arc::new(R2SourceResolver::new(cache.client().clone(), template, ttl))
            }
            SourceConfig::UrlTemplate(template) => {
                info!(template = %template, "Resolving video sources from URL template");
                Arc::new(UrlTemplateResolver::new(template))
            }
        };

        let oracle: Arc<dyn VisionOracle> = match OracleConfig::from_env() {
            Some(oracle_config) => {
                info!(model = %oracle_config.model, "Vision oracle enabled");
                Arc::new(GeminiVisionOracle::new(oracle_config)?)
            }
            None => {
                warn!("GEMINI_API_KEY not set, ranking thumbnails on pixel quality only");
                Arc::new(DisabledOracle)
            }
        };

        if let Err(e) = check_ffmpeg() {
            warn!(error = %e, "FFmpeg not found, thumbnail generation will fail");
        }
        let samplers = Arc::new(FfmpegSamplerFactory::new(engine_config.sampler_config()));

        let cache: Arc<dyn ThumbnailCache> = Arc::new(cache);
        let recorder = DiagnosticRecorder::spawn(engine_config.diagnostic_retention);
        let coordinator = GenerationCoordinator::new(
            engine_config,
            samplers,
            oracle,
            Arc::clone(&cache),
            recorder.clone(),
        );
        let service = ThumbnailService::new(cache, resolver, coordinator, recorder);

        Ok(Self::new(config, service)?)
    }
}
