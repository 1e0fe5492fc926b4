//! In-process thumbnail cache for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use vthumb_models::{ThumbnailArtifact, VideoId};

use crate::cache::{PutOutcome, ThumbnailCache};
use crate::error::StorageResult;

/// Thumbnail cache held in memory.
#[derive(Debug, Default)]
pub struct MemoryThumbnailCache {
    entries: RwLock<HashMap<VideoId, ThumbnailArtifact>>,
    puts: AtomicUsize,
}

impl MemoryThumbnailCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Number of `put` calls that wrote an entry.
    pub fn stored_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ThumbnailCache for MemoryThumbnailCache {
    async fn get(&self, video_id: &VideoId) -> StorageResult<Option<ThumbnailArtifact>> {
        Ok(self.entries.read().await.get(video_id).cloned())
    }

    async fn put(&self, artifact: &ThumbnailArtifact) -> StorageResult<PutOutcome> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&artifact.video_id) {
            return Ok(PutOutcome::AlreadyPresent);
        }
        entries.insert(artifact.video_id.clone(), artifact.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(PutOutcome::Stored)
    }

    async fn invalidate(&self, video_id: &VideoId) -> StorageResult<bool> {
        Ok(self.entries.write().await.remove(video_id).is_some())
    }
}
