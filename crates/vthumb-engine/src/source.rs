//! Video source resolution.
//!
//! Maps a video id to something the decoder can open. Only consulted on a
//! cache miss.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use vthumb_media::VideoSource;
use vthumb_models::VideoId;
use vthumb_storage::R2Client;

use crate::error::{EngineError, EngineResult};

/// Placeholder replaced by the video id in source templates.
pub const VIDEO_ID_PLACEHOLDER: &str = "{video_id}";

const DEFAULT_KEY_TEMPLATE: &str = "recordings/{video_id}.mp4";
const DEFAULT_URL_TTL_SECS: u64 = 3600;

/// Resolves video ids to decodable sources.
#[async_trait]
pub trait VideoSourceResolver: Send + Sync {
    async fn resolve(&self, video_id: &VideoId) -> EngineResult<VideoSource>;
}

/// How sources are located.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    /// Presigned GET on an object key in the bucket
    R2Key { template: String, ttl: Duration },
    /// Plain URL
    UrlTemplate(String),
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::R2Key {
            template: DEFAULT_KEY_TEMPLATE.to_string(),
            ttl: Duration::from_secs(DEFAULT_URL_TTL_SECS),
        }
    }
}

impl SourceConfig {
    /// Create config from environment variables.
    ///
    /// `VIDEO_SOURCE_URL_TEMPLATE` takes precedence over
    /// `VIDEO_SOURCE_KEY_TEMPLATE`.
    pub fn from_env() -> EngineResult<Self> {
        let config = if let Ok(template) = std::env::var("VIDEO_SOURCE_URL_TEMPLATE") {
            Self::UrlTemplate(template)
        } else {
            Self::R2Key {
                template: std::env::var("VIDEO_SOURCE_KEY_TEMPLATE")
                    .unwrap_or_else(|_| DEFAULT_KEY_TEMPLATE.to_string()),
                ttl: Duration::from_secs(
                    std::env::var("VIDEO_SOURCE_URL_TTL_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(DEFAULT_URL_TTL_SECS),
                ),
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> EngineResult<()> {
        let template = match self {
            Self::R2Key { template, .. } | Self::UrlTemplate(template) => template,
        };
        if !template.contains(VIDEO_ID_PLACEHOLDER) {
            return Err(EngineError::config_error(format!(
                "source template {:?} has no {} placeholder",
                template, VIDEO_ID_PLACEHOLDER
            )));
        }
        Ok(())
    }
}

/// Substitute the video id into a template.
pub fn render_template(template: &str, video_id: &VideoId) -> String {
    template.replace(VIDEO_ID_PLACEHOLDER, video_id.as_str())
}

/// Presigned R2 URLs for a key template.
pub struct R2SourceResolver {
    client: R2Client,
    key_template: String,
    ttl: Duration,
}

impl R2SourceResolver {
    pub fn new(client: R2Client, key_template: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            key_template: key_template.into(),
            ttl,
        }
    }
}

#[async_trait]
impl VideoSourceResolver for R2SourceResolver {
    async fn resolve(&self, video_id: &VideoId) -> EngineResult<VideoSource> {
        let key = render_template(&self.key_template, video_id);

        if !self.client.exists(&key).await? {
            return Err(EngineError::source_unavailable(format!(
                "no source object at {}",
                key
            )));
        }

        let url = self
            .client
            .presign_get(&key, self.ttl)
            .await
            .map_err(|e| EngineError::source_unavailable(e.to_string()))?;
        debug!(video_id = %video_id, key = %key, "Presigned video source");
        Ok(VideoSource::Url(url))
    }
}

/// Plain URL template, e.g. `https://media.example.com/{video_id}.mp4`.
#[derive(Debug, Clone)]
pub struct UrlTemplateResolver {
    template: String,
}

impl UrlTemplateResolver {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

#[async_trait]
impl VideoSourceResolver for UrlTemplateResolver {
    async fn resolve(&self, video_id: &VideoId) -> EngineResult<VideoSource> {
        Ok(VideoSource::Url(render_template(&self.template, video_id)))
    }
}

/// Fixed id-to-source map.
#[derive(Debug, Clone, Default)]
pub struct StaticSourceResolver {
    sources: HashMap<VideoId, VideoSource>,
}

impl StaticSourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, video_id: VideoId, source: VideoSource) -> Self {
        self.sources.insert(video_id, source);
        self
    }
}

#[async_trait]
impl VideoSourceResolver for StaticSourceResolver {
    async fn resolve(&self, video_id: &VideoId) -> EngineResult<VideoSource> {
        self.sources
            .get(video_id)
            .cloned()
            .ok_or_else(|| EngineError::source_unavailable(format!("unknown video {}", video_id)))
    }
}
