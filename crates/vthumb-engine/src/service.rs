//! Cache-first thumbnail service.
//!
//! ```text
//! get_or_generate(V):
//!   cache hit            -> return (no decoding, no oracle)
//!   miss                 -> single-flight on V
//!     leader:  permit -> re-check cache -> resolve source -> generate
//!     waiters: share the leader's result
//! ```

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use vthumb_models::{ThumbnailArtifact, VideoId};
use vthumb_storage::ThumbnailCache;

use crate::config::EngineConfig;
use crate::coordinator::{GenerationCoordinator, RunReport};
use crate::diagnostics::DiagnosticRecorder;
use crate::error::{EngineError, EngineResult};
use crate::metrics;
use crate::single_flight::{Flight, SingleFlight};
use crate::source::VideoSourceResolver;

/// Where a served thumbnail came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    /// Already in the cache
    Cache,
    /// Generated by this request
    Generated,
    /// Generated by a concurrent request for the same video
    Shared,
}

impl LookupSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupSource::Cache => "hit",
            LookupSource::Generated => "miss",
            LookupSource::Shared => "shared",
        }
    }
}

/// A served thumbnail.
#[derive(Debug, Clone)]
pub struct ThumbnailLookup {
    pub artifact: ThumbnailArtifact,
    pub source: LookupSource,
    /// Present when a generation run produced the artifact
    pub report: Option<RunReport>,
}

/// Entry point for thumbnail requests.
pub struct ThumbnailService {
    cache: Arc<dyn ThumbnailCache>,
    resolver: Arc<dyn VideoSourceResolver>,
    coordinator: GenerationCoordinator,
    recorder: DiagnosticRecorder,
    flights: SingleFlight<VideoId, EngineResult<ThumbnailLookup>>,
    run_permits: Semaphore,
}

impl ThumbnailService {
    pub fn new(
        cache: Arc<dyn ThumbnailCache>,
        resolver: Arc<dyn VideoSourceResolver>,
        coordinator: GenerationCoordinator,
        recorder: DiagnosticRecorder,
    ) -> Self {
        let permits = coordinator.config().max_concurrent_runs.max(1);
        Self {
            cache,
            resolver,
            coordinator,
            recorder,
            flights: SingleFlight::new(),
            run_permits: Semaphore::new(permits),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.coordinator.config()
    }

    pub fn recorder(&self) -> &DiagnosticRecorder {
        &self.recorder
    }

    pub fn cache(&self) -> &Arc<dyn ThumbnailCache> {
        &self.cache
    }

    /// Serve the cached thumbnail, generating it first if needed.
    pub async fn get_or_generate(&self, video_id: &VideoId) -> EngineResult<ThumbnailLookup> {
        if let Some(artifact) = self.lookup_cache(video_id).await {
            metrics::record_cache_hit();
            return Ok(ThumbnailLookup {
                artifact,
                source: LookupSource::Cache,
                report: None,
            });
        }
        metrics::record_cache_miss();

        let flight = self
            .flights
            .run(video_id.clone(), || self.generate_once(video_id))
            .await;

        match flight {
            Flight::Led(result) => result,
            Flight::Shared(result) => {
                metrics::record_single_flight_join();
                debug!(video_id = %video_id, "Joined in-flight generation");
                result.map(|lookup| ThumbnailLookup {
                    source: LookupSource::Shared,
                    ..lookup
                })
            }
        }
    }

    /// Cached thumbnail only; never generates.
    pub async fn cached(&self, video_id: &VideoId) -> EngineResult<Option<ThumbnailArtifact>> {
        Ok(self.cache.get(video_id).await?)
    }

    /// Drop the cached thumbnail so the next request regenerates it.
    pub async fn invalidate(&self, video_id: &VideoId) -> EngineResult<bool> {
        let removed = self.cache.invalidate(video_id).await?;
        info!(video_id = %video_id, removed = removed, "Thumbnail invalidation requested");
        Ok(removed)
    }

    /// Whether a generation run is in progress for the video.
    pub fn is_generating(&self, video_id: &VideoId) -> bool {
        self.flights.is_in_flight(video_id)
    }

    /// Cache read that treats backend errors as a miss.
    async fn lookup_cache(&self, video_id: &VideoId) -> Option<ThumbnailArtifact> {
        match self.cache.get(video_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(video_id = %video_id, error = %e, "Thumbnail cache read failed, treating as miss");
                None
            }
        }
    }

    async fn generate_once(&self, video_id: &VideoId) -> EngineResult<ThumbnailLookup> {
        let _permit = self
            .run_permits
            .acquire()
            .await
            .map_err(|_| EngineError::ShuttingDown)?;

        // A previous leader may have finished while this one was queued
        if let Some(artifact) = self.lookup_cache(video_id).await {
            return Ok(ThumbnailLookup {
                artifact,
                source: LookupSource::Cache,
                report: None,
            });
        }

        let source = self.resolver.resolve(video_id).await.map_err(|e| {
            warn!(video_id = %video_id, error = %e, "Could not resolve video source");
            e
        })?;

        let result = self.coordinator.generate(video_id, &source).await?;
        Ok(ThumbnailLookup {
            artifact: result.artifact,
            source: LookupSource::Generated,
            report: Some(result.report),
        })
    }
}
