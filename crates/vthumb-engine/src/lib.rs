//! Thumbnail selection engine.
//!
//! This crate provides:
//! - Candidate ranking (pixel score fused with the vision oracle's verdict)
//! - The per-video generation run with early stop and dark-frame fallback
//! - Single-flight deduplication of concurrent runs per video
//! - The fire-and-forget diagnostic recorder
//! - The cache-first [`ThumbnailService`] facade
//! - Video source resolution, configuration and metrics

pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod ranker;
pub mod service;
pub mod single_flight;
pub mod source;

pub use config::EngineConfig;
pub use coordinator::{GenerationCoordinator, GenerationResult, RunReport};
pub use diagnostics::DiagnosticRecorder;
pub use error::{AttemptError, EngineError, EngineResult};
pub use logging::RunLogger;
pub use ranker::{CandidateRanker, RankWeights};
pub use service::{LookupSource, ThumbnailLookup, ThumbnailService};
pub use single_flight::{Flight, SingleFlight};
pub use source::{
    R2SourceResolver, SourceConfig, StaticSourceResolver, UrlTemplateResolver,
    VideoSourceResolver,
};
