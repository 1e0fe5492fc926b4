//! Scripted collaborators for engine tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vthumb_engine::{
    DiagnosticRecorder, EngineConfig, GenerationCoordinator, StaticSourceResolver,
    ThumbnailService,
};
use vthumb_media::{FrameSampler, MediaError, MediaResult, RgbaFrame, SamplerFactory, VideoSource};
use vthumb_models::{VideoId, VisionVerdict};
use vthumb_oracle::VisionOracle;
use vthumb_storage::{MemoryThumbnailCache, ThumbnailCache};

pub const DURATION_SECS: f64 = 120.0;

/// What the fake decoder does for one sample call.
#[derive(Debug, Clone)]
pub enum Step {
    Frame(RgbaFrame),
    Fail,
    Hang,
}

pub fn dark() -> Step {
    solid(2)
}

pub fn solid(luma: u8) -> Step {
    Step::Frame(RgbaFrame::solid(64, 36, [luma, luma, luma]).unwrap())
}

/// Well lit, high contrast frame.
pub fn bright() -> Step {
    let (width, height) = (64u32, 36u32);
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let v = if ((x / 4) + (y / 4)) % 2 == 0 { 40 } else { 210 };
            data.extend_from_slice(&[v, v, v, 255]);
        }
    }
    Step::Frame(RgbaFrame::new(width, height, data).unwrap())
}

pub fn id(s: &str) -> VideoId {
    VideoId::parse(s).unwrap()
}

/// Sampler factory that replays a script. Each session starts the script
/// from the beginning; calls past its end repeat `fallback`.
pub struct ScriptedFactory {
    steps: Vec<Step>,
    fallback: Step,
    duration: Option<f64>,
    sample_delay: Duration,
    fail_open: bool,
    hang_first_open: AtomicBool,
    pub opens: AtomicUsize,
    pub samples: Arc<AtomicUsize>,
    pub sampled_at: Arc<Mutex<Vec<f64>>>,
}

impl ScriptedFactory {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            fallback: Step::Fail,
            duration: Some(DURATION_SECS),
            sample_delay: Duration::ZERO,
            fail_open: false,
            hang_first_open: AtomicBool::new(false),
            opens: AtomicUsize::new(0),
            samples: Arc::new(AtomicUsize::new(0)),
            sampled_at: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_fallback(mut self, step: Step) -> Self {
        self.fallback = step;
        self
    }

    pub fn with_sample_delay(mut self, delay: Duration) -> Self {
        self.sample_delay = delay;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn hanging_first_open(self) -> Self {
        self.hang_first_open.store(true, Ordering::SeqCst);
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn sample_count(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }

    pub fn sampled_offsets(&self) -> Vec<f64> {
        self.sampled_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl SamplerFactory for ScriptedFactory {
    async fn open(&self, _source: &VideoSource) -> MediaResult<Box<dyn FrameSampler>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.hang_first_open.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_open {
            return Err(MediaError::InvalidVideo("no streams".into()));
        }
        Ok(Box::new(ScriptedSampler {
            steps: self.steps.clone(),
            fallback: self.fallback.clone(),
            duration: self.duration,
            delay: self.sample_delay,
            calls: 0,
            samples: Arc::clone(&self.samples),
            sampled_at: Arc::clone(&self.sampled_at),
        }))
    }
}

struct ScriptedSampler {
    steps: Vec<Step>,
    fallback: Step,
    duration: Option<f64>,
    delay: Duration,
    calls: usize,
    samples: Arc<AtomicUsize>,
    sampled_at: Arc<Mutex<Vec<f64>>>,
}

#[async_trait]
impl FrameSampler for ScriptedSampler {
    fn duration(&self) -> Option<f64> {
        self.duration
    }

    async fn sample(&mut self, timestamp_secs: f64) -> MediaResult<RgbaFrame> {
        let step = self.steps.get(self.calls).unwrap_or(&self.fallback).clone();
        self.calls += 1;
        self.samples.fetch_add(1, Ordering::SeqCst);
        self.sampled_at.lock().unwrap().push(timestamp_secs);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match step {
            Step::Frame(frame) => Ok(frame),
            Step::Fail => Err(MediaError::decode_failed("corrupt packet")),
            Step::Hang => std::future::pending().await,
        }
    }
}

/// Oracle that returns a fixed verdict, or never answers.
pub struct ScriptedOracle {
    verdict: VisionVerdict,
    hang: bool,
    pub calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn scoring(score: f64) -> Self {
        Self {
            verdict: VisionVerdict::from_raw(score),
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            verdict: VisionVerdict::Unavailable,
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn hanging() -> Self {
        Self {
            verdict: VisionVerdict::Unavailable,
            hang: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionOracle for ScriptedOracle {
    async fn judge(&self, _jpeg: &[u8], _hint: &str) -> VisionVerdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.verdict
    }
}

/// Config for tests: small budget, fast timeouts, no early stop.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        max_attempts: 6,
        early_stop_score: 101.0,
        oracle_skip_score: 101.0,
        decode_timeout: Duration::from_millis(200),
        oracle_timeout: Duration::from_millis(200),
        ..Default::default()
    }
}

/// Everything a test needs to drive and inspect the engine.
pub struct Harness {
    pub factory: Arc<ScriptedFactory>,
    pub oracle: Arc<ScriptedOracle>,
    pub cache: Arc<MemoryThumbnailCache>,
    pub recorder: DiagnosticRecorder,
    pub config: EngineConfig,
}

impl Harness {
    pub fn new(factory: ScriptedFactory, oracle: ScriptedOracle, config: EngineConfig) -> Self {
        Self {
            factory: Arc::new(factory),
            oracle: Arc::new(oracle),
            cache: Arc::new(MemoryThumbnailCache::new()),
            recorder: DiagnosticRecorder::spawn(config.diagnostic_retention),
            config,
        }
    }

    pub fn coordinator(&self) -> GenerationCoordinator {
        self.coordinator_with_cache(self.cache.clone())
    }

    pub fn coordinator_with_cache(&self, cache: Arc<dyn ThumbnailCache>) -> GenerationCoordinator {
        GenerationCoordinator::new(
            self.config.clone(),
            self.factory.clone(),
            self.oracle.clone(),
            cache,
            self.recorder.clone(),
        )
    }

    /// Service that knows sources for the given ids.
    pub fn service(&self, known: &[&str]) -> ThumbnailService {
        self.service_with_cache(known, self.cache.clone())
    }

    pub fn service_with_cache(&self, known: &[&str], cache: Arc<dyn ThumbnailCache>) -> ThumbnailService {
        let resolver = known.iter().fold(StaticSourceResolver::new(), |r, v| {
            r.with_source(id(v), VideoSource::Url(format!("https://media.test/{}.mp4", v)))
        });
        ThumbnailService::new(
            cache.clone(),
            Arc::new(resolver),
            self.coordinator_with_cache(cache),
            self.recorder.clone(),
        )
    }
}

pub fn source() -> VideoSource {
    VideoSource::Url("https://media.test/video.mp4".into())
}
