//! Frame-level media primitives for thumbnail selection.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with timeout and kill-on-drop
//! - FFprobe source inspection (duration, dimensions)
//! - Per-run decoder sessions that seek and decode one RGBA frame at a time
//! - Cheap pixel quality metrics and the brightness gate
//! - Seek strategy planning across a video's timeline
//! - JPEG encoding of selected frames

pub mod command;
pub mod encode;
pub mod error;
pub mod frame;
pub mod probe;
pub mod quality;
pub mod sampler;
pub mod seek_plan;
pub mod source;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use encode::{encode_jpeg, placeholder_jpeg};
pub use error::{MediaError, MediaResult};
pub use frame::RgbaFrame;
pub use probe::{probe_source, VideoInfo};
pub use quality::{PixelQuality, PixelQualityEstimator, QualityConfig};
pub use sampler::{FfmpegFrameSampler, FfmpegSamplerFactory, FrameSampler, SamplerConfig, SamplerFactory};
pub use seek_plan::SeekPlanner;
pub use source::VideoSource;
