//! Permanent thumbnail cache.
//!
//! One artifact per video, stored under `{prefix}/{video_id}.jpg`. Entries
//! have no expiry. A stored entry is never overwritten by `put`; it only
//! changes after an explicit `invalidate`.

use async_trait::async_trait;
use tracing::{debug, info, warn};
use vthumb_models::{ThumbnailArtifact, VideoId, THUMBNAIL_CONTENT_TYPE};

use crate::client::R2Client;
use crate::error::StorageResult;
use crate::metadata::{from_metadata, to_metadata};

/// Default key prefix for stored thumbnails.
pub const DEFAULT_CACHE_PREFIX: &str = "thumbnails";

/// Object key of a video's thumbnail.
pub fn thumbnail_key(prefix: &str, video_id: &VideoId) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("{}.jpg", video_id)
    } else {
        format!("{}/{}.jpg", prefix, video_id)
    }
}

/// Result of a `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The artifact was written.
    Stored,
    /// An entry already existed and was left untouched.
    AlreadyPresent,
}

/// Durable key-addressed thumbnail store.
#[async_trait]
pub trait ThumbnailCache: Send + Sync {
    /// Fetch the stored artifact for a video.
    async fn get(&self, video_id: &VideoId) -> StorageResult<Option<ThumbnailArtifact>>;

    /// Store an artifact unless one already exists for the video.
    async fn put(&self, artifact: &ThumbnailArtifact) -> StorageResult<PutOutcome>;

    /// Remove the stored artifact. Returns whether one existed.
    async fn invalidate(&self, video_id: &VideoId) -> StorageResult<bool>;

    /// Backend reachability.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// R2-backed cache.
#[derive(Clone)]
pub struct R2ThumbnailCache {
    client: R2Client,
    prefix: String,
}

impl R2ThumbnailCache {
    pub fn new(client: R2Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    /// Connect using `R2_*` variables; the key prefix comes from
    /// `THUMB_CACHE_PREFIX`.
    pub async fn from_env() -> StorageResult<Self> {
        let client = R2Client::from_env().await?;
        let prefix = std::env::var("THUMB_CACHE_PREFIX")
            .unwrap_or_else(|_| DEFAULT_CACHE_PREFIX.to_string());
        Ok(Self::new(client, prefix))
    }

    pub fn client(&self) -> &R2Client {
        &self.client
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key(&self, video_id: &VideoId) -> String {
        thumbnail_key(&self.prefix, video_id)
    }
}

#[async_trait]
impl ThumbnailCache for R2ThumbnailCache {
    async fn get(&self, video_id: &VideoId) -> StorageResult<Option<ThumbnailArtifact>> {
        let key = self.key(video_id);
        let Some(object) = self.client.get_object(&key).await? else {
            debug!(video_id = %video_id, key = %key, "Thumbnail cache miss");
            return Ok(None);
        };

        if object.bytes.is_empty() {
            warn!(video_id = %video_id, key = %key, "Cached thumbnail has an empty body, treating as miss");
            return Ok(None);
        }

        debug!(video_id = %video_id, key = %key, bytes = object.bytes.len(), "Thumbnail cache hit");
        Ok(Some(from_metadata(
            video_id,
            object.bytes,
            &object.metadata,
            object.last_modified,
        )))
    }

    async fn put(&self, artifact: &ThumbnailArtifact) -> StorageResult<PutOutcome> {
        let key = self.key(&artifact.video_id);

        let written = self
            .client
            .put_if_absent(
                artifact.image_bytes.clone(),
                &key,
                THUMBNAIL_CONTENT_TYPE,
                to_metadata(artifact),
            )
            .await?;
        if !written {
            info!(video_id = %artifact.video_id, key = %key, "Thumbnail already stored, keeping existing entry");
            return Ok(PutOutcome::AlreadyPresent);
        }

        info!(
            video_id = %artifact.video_id,
            key = %key,
            offset = artifact.selected_timestamp_secs,
            score = artifact.combined_score,
            "Stored thumbnail"
        );
        Ok(PutOutcome::Stored)
    }

    async fn invalidate(&self, video_id: &VideoId) -> StorageResult<bool> {
        let key = self.key(video_id);
        if !self.client.exists(&key).await? {
            return Ok(false);
        }
        self.client.delete_object(&key).await?;
        info!(video_id = %video_id, key = %key, "Invalidated thumbnail");
        Ok(true)
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.client.check_connectivity().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_key() {
        let id = VideoId::parse("abc_123").unwrap();
        assert_eq!(thumbnail_key("thumbnails", &id), "thumbnails/abc_123.jpg");
        assert_eq!(thumbnail_key("thumbnails/", &id), "thumbnails/abc_123.jpg");
        assert_eq!(thumbnail_key("", &id), "abc_123.jpg");
    }
}
