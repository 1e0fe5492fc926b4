//! Generation coordinator.
//!
//! Drives one generation run for one video:
//!
//! ```text
//! open decoder -> plan offsets -> for each offset:
//!     sample -> estimate -> record -> [oracle] -> rank -> early stop?
//! -> finalize (ranked | dark fallback | failed) -> persist
//! ```
//!
//! Per-attempt failures are recorded and skipped. The decoder session is
//! owned by the run and dropped on every exit path, which also kills any
//! FFmpeg child still running when the run is cancelled.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, Instrument};
use vthumb_media::{
    encode_jpeg, FrameSampler, PixelQualityEstimator, RgbaFrame, SamplerFactory, SeekPlanner,
    VideoSource,
};
use vthumb_models::{
    AttemptOutcome, AttemptRecord, SelectionKind, ThumbnailArtifact, VideoId, VisionVerdict,
};
use vthumb_oracle::VisionOracle;
use vthumb_storage::{PutOutcome, ThumbnailCache};

use crate::config::EngineConfig;
use crate::diagnostics::DiagnosticRecorder;
use crate::error::{AttemptError, EngineError, EngineResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::ranker::CandidateRanker;

/// Summary of one generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub video_id: VideoId,
    /// Offsets in the seek plan
    pub planned: usize,
    pub attempts_used: u32,
    pub accepted: u32,
    pub rejected_dark: u32,
    pub errored: u32,
    pub oracle_calls: u32,
    /// Oracle calls that produced no usable score
    pub oracle_unavailable: u32,
    pub early_stopped: bool,
    pub selection: Option<SelectionKind>,
    /// Whether this run wrote the cache entry
    pub persisted: bool,
    pub elapsed: Duration,
}

impl RunReport {
    fn new(video_id: &VideoId) -> Self {
        Self {
            video_id: video_id.clone(),
            planned: 0,
            attempts_used: 0,
            accepted: 0,
            rejected_dark: 0,
            errored: 0,
            oracle_calls: 0,
            oracle_unavailable: 0,
            early_stopped: false,
            selection: None,
            persisted: false,
            elapsed: Duration::ZERO,
        }
    }

    fn outcome_label(&self) -> &'static str {
        self.selection.map_or("failed", |s| s.as_str())
    }
}

/// A finished run: the artifact to serve and how it was produced.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub artifact: ThumbnailArtifact,
    pub report: RunReport,
}

/// Runs the sample/score/rank loop for one video at a time.
pub struct GenerationCoordinator {
    samplers: Arc<dyn SamplerFactory>,
    oracle: Arc<dyn VisionOracle>,
    cache: Arc<dyn ThumbnailCache>,
    recorder: DiagnosticRecorder,
    planner: SeekPlanner,
    estimator: PixelQualityEstimator,
    config: EngineConfig,
}

impl GenerationCoordinator {
    pub fn new(
        config: EngineConfig,
        samplers: Arc<dyn SamplerFactory>,
        oracle: Arc<dyn VisionOracle>,
        cache: Arc<dyn ThumbnailCache>,
        recorder: DiagnosticRecorder,
    ) -> Self {
        Self {
            planner: SeekPlanner::new(config.max_attempts),
            estimator: PixelQualityEstimator::new(config.quality_config()),
            samplers,
            oracle,
            cache,
            recorder,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate and persist a thumbnail for `video_id`.
    ///
    /// Does not consult the cache first and does not deduplicate concurrent
    /// runs; [`crate::ThumbnailService`] does both.
    pub async fn generate(
        &self,
        video_id: &VideoId,
        source: &VideoSource,
    ) -> EngineResult<GenerationResult> {
        let logger = RunLogger::new(video_id);
        let span = logger.create_span();
        self.run(video_id, source, &logger).instrument(span).await
    }

    async fn run(
        &self,
        video_id: &VideoId,
        source: &VideoSource,
        logger: &RunLogger,
    ) -> EngineResult<GenerationResult> {
        let started = Instant::now();
        let mut report = RunReport::new(video_id);
        logger.log_start(&format!("source {}", source));

        let mut sampler = match self.samplers.open(source).await {
            Ok(sampler) => sampler,
            Err(e) => {
                logger.log_warning(&format!("could not open source: {}", e));
                self.recorder.record(AttemptRecord::errored(
                    video_id.clone(),
                    0,
                    0.0,
                    format!("open failed: {}", e),
                ));
                return Err(self.fail(video_id, report, started, logger));
            }
        };

        let plan = self.planner.plan(sampler.duration());
        report.planned = plan.len();
        logger.log_progress(&format!(
            "planned {} offsets (duration {:?})",
            plan.len(),
            sampler.duration()
        ));

        let mut ranker = CandidateRanker::new(self.config.rank_weights());

        for (index, &timestamp_secs) in plan.iter().enumerate() {
            let index = index as u32;
            report.attempts_used += 1;

            let frame = match self.sample(sampler.as_mut(), timestamp_secs).await {
                Ok(frame) => frame,
                Err(e) => {
                    self.record_error(video_id, index, timestamp_secs, &e, &mut report);
                    continue;
                }
            };

            let quality = self.estimator.estimate(&frame);

            if !quality.passes_gate {
                report.rejected_dark += 1;
                metrics::record_attempt(AttemptOutcome::RejectedDark, None);
                self.recorder.record(AttemptRecord::scored(
                    video_id.clone(),
                    index,
                    timestamp_secs,
                    quality.brightness,
                    quality.pixel_score,
                    AttemptOutcome::RejectedDark,
                ));
                debug!(
                    attempt = index,
                    timestamp_secs = timestamp_secs,
                    brightness = quality.brightness,
                    "Frame rejected as dark"
                );

                if ranker.improves_fallback(quality.brightness) {
                    match encode_jpeg(&frame, self.config.jpeg_quality) {
                        Ok(jpeg) => ranker.offer_dark(
                            timestamp_secs,
                            quality.brightness,
                            quality.pixel_score,
                            jpeg,
                        ),
                        Err(e) => logger.log_warning(&format!("could not encode fallback frame: {}", e)),
                    }
                }
                continue;
            }

            let jpeg = match encode_jpeg(&frame, self.config.jpeg_quality) {
                Ok(jpeg) => jpeg,
                Err(e) => {
                    let e = AttemptError::from(e);
                    self.record_error(video_id, index, timestamp_secs, &e, &mut report);
                    continue;
                }
            };
            drop(frame);

            report.accepted += 1;
            metrics::record_attempt(AttemptOutcome::Success, None);
            self.recorder.record(AttemptRecord::scored(
                video_id.clone(),
                index,
                timestamp_secs,
                quality.brightness,
                quality.pixel_score,
                AttemptOutcome::Success,
            ));

            let verdict = if self.should_consult_oracle(&ranker, &report, quality.pixel_score) {
                report.oracle_calls += 1;
                let verdict = self.consult_oracle(video_id, timestamp_secs, &jpeg).await;
                if !verdict.is_scored() {
                    report.oracle_unavailable += 1;
                }
                verdict
            } else {
                VisionVerdict::Unavailable
            };

            let (combined, improved) = ranker.offer(
                timestamp_secs,
                quality.brightness,
                quality.pixel_score,
                verdict,
                jpeg,
            );
            debug!(
                attempt = index,
                timestamp_secs = timestamp_secs,
                brightness = quality.brightness,
                pixel_score = quality.pixel_score,
                vision = ?verdict.score(),
                combined = combined,
                improved = improved,
                "Scored candidate"
            );

            if combined > self.config.early_stop_score {
                report.early_stopped = true;
                logger.log_progress(&format!(
                    "early stop at {:.3}s with score {:.1}",
                    timestamp_secs, combined
                ));
                break;
            }
        }

        // Release the decoder before touching storage
        drop(sampler);

        let Some(selection) = ranker.finish() else {
            return Err(self.fail(video_id, report, started, logger));
        };

        let candidate = selection.candidate;
        report.selection = Some(selection.kind);
        let artifact = ThumbnailArtifact {
            video_id: video_id.clone(),
            image_bytes: candidate.jpeg,
            selected_timestamp_secs: candidate.timestamp_secs,
            combined_score: candidate.combined_score,
            pixel_score: candidate.pixel_score,
            vision_score: candidate.vision.score(),
            attempts_used: report.attempts_used,
            selection: selection.kind,
            generated_at: Utc::now(),
        };

        if artifact.is_fallback() {
            logger.log_warning("no frame passed the brightness gate, keeping brightest dark frame");
        }

        let artifact = self.persist(artifact, &mut report, logger).await;

        report.elapsed = started.elapsed();
        metrics::record_run(report.outcome_label(), report.elapsed.as_secs_f64());
        logger.log_completion(&format!(
            "{} frame at {:.3}s (score {:.1}) after {} attempts: {} accepted, {} dark, {} errors, {} oracle calls in {:?}",
            report.outcome_label(),
            artifact.selected_timestamp_secs,
            artifact.combined_score,
            report.attempts_used,
            report.accepted,
            report.rejected_dark,
            report.errored,
            report.oracle_calls,
            report.elapsed
        ));

        Ok(GenerationResult { artifact, report })
    }

    async fn sample(
        &self,
        sampler: &mut dyn FrameSampler,
        timestamp_secs: f64,
    ) -> Result<RgbaFrame, AttemptError> {
        match tokio::time::timeout(self.config.decode_timeout, sampler.sample(timestamp_secs)).await {
            Ok(result) => result.map_err(AttemptError::from),
            Err(_) => Err(AttemptError::Timeout(self.config.decode_timeout)),
        }
    }

    fn record_error(
        &self,
        video_id: &VideoId,
        index: u32,
        timestamp_secs: f64,
        error: &AttemptError,
        report: &mut RunReport,
    ) {
        report.errored += 1;
        metrics::record_attempt(AttemptOutcome::Error, Some(error.kind()));
        debug!(
            attempt = index,
            timestamp_secs = timestamp_secs,
            error = %error,
            "Attempt failed"
        );
        self.recorder.record(AttemptRecord::errored(
            video_id.clone(),
            index,
            timestamp_secs,
            error.to_string(),
        ));
    }

    fn should_consult_oracle(
        &self,
        ranker: &CandidateRanker,
        report: &RunReport,
        pixel_score: f64,
    ) -> bool {
        if report.oracle_calls >= self.config.max_oracle_calls {
            return false;
        }
        if ranker
            .best_score()
            .is_some_and(|best| best >= self.config.oracle_skip_score)
        {
            return false;
        }
        ranker.oracle_could_help(pixel_score)
    }

    async fn consult_oracle(
        &self,
        video_id: &VideoId,
        timestamp_secs: f64,
        jpeg: &[u8],
    ) -> VisionVerdict {
        let hint = format!(
            "Frame at {:.1}s of recorded video {}",
            timestamp_secs, video_id
        );
        let verdict = match tokio::time::timeout(
            self.config.oracle_timeout,
            self.oracle.judge(jpeg, &hint),
        )
        .await
        {
            Ok(verdict) => verdict,
            Err(_) => {
                debug!(timestamp_secs = timestamp_secs, "Vision oracle timed out");
                VisionVerdict::Unavailable
            }
        };
        metrics::record_oracle_call(&verdict);
        verdict
    }

    /// Store the artifact. A failed write is logged and the artifact is
    /// still returned; if another writer stored one first, theirs is
    /// returned instead.
    async fn persist(
        &self,
        artifact: ThumbnailArtifact,
        report: &mut RunReport,
        logger: &RunLogger,
    ) -> ThumbnailArtifact {
        match self.cache.put(&artifact).await {
            Ok(PutOutcome::Stored) => {
                report.persisted = true;
                artifact
            }
            Ok(PutOutcome::AlreadyPresent) => {
                logger.log_warning("thumbnail already cached by another writer, serving stored entry");
                match self.cache.get(&artifact.video_id).await {
                    Ok(Some(existing)) => existing,
                    _ => artifact,
                }
            }
            Err(e) => {
                logger.log_warning(&format!("failed to persist thumbnail: {}", e));
                artifact
            }
        }
    }

    fn fail(
        &self,
        video_id: &VideoId,
        mut report: RunReport,
        started: Instant,
        logger: &RunLogger,
    ) -> EngineError {
        report.elapsed = started.elapsed();
        metrics::record_run(report.outcome_label(), report.elapsed.as_secs_f64());
        logger.log_warning(&format!(
            "generation failed: no decodable frame in {} attempts ({} errors)",
            report.attempts_used, report.errored
        ));
        EngineError::generation_failed(video_id, report.attempts_used)
    }
}
