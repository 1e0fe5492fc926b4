//! Frame sampling.
//!
//! A [`SamplerFactory`] opens one decoder session per generation run. The
//! session ([`FrameSampler`]) is exclusively owned by that run and samples
//! through `&mut self`, so only one seek+decode can be outstanding for a
//! video at a time. Dropping the session releases the decoder.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::frame::RgbaFrame;
use crate::probe::{probe_source, VideoInfo};
use crate::source::VideoSource;

/// Aspect ratio assumed when the probe reports no dimensions.
const FALLBACK_ASPECT: f64 = 16.0 / 9.0;

/// A stateful decoder session for one video.
#[async_trait]
pub trait FrameSampler: Send {
    /// Duration of the source in seconds, if known.
    fn duration(&self) -> Option<f64>;

    /// Seek to `timestamp_secs` (or the nearest seekable position) and
    /// return the fully decoded frame there.
    async fn sample(&mut self, timestamp_secs: f64) -> MediaResult<RgbaFrame>;
}

/// Opens decoder sessions.
#[async_trait]
pub trait SamplerFactory: Send + Sync {
    async fn open(&self, source: &VideoSource) -> MediaResult<Box<dyn FrameSampler>>;
}

/// Sampler configuration.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Output frame width; frames are never upscaled
    pub width: u32,
    /// Bound on a single seek+decode
    pub decode_timeout: Duration,
    /// Bound on the initial probe
    pub probe_timeout: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            width: 640,
            decode_timeout: Duration::from_secs(8),
            probe_timeout: Duration::from_secs(15),
        }
    }
}

/// Opens FFmpeg-backed sessions.
#[derive(Debug, Clone, Default)]
pub struct FfmpegSamplerFactory {
    config: SamplerConfig,
}

impl FfmpegSamplerFactory {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SamplerFactory for FfmpegSamplerFactory {
    async fn open(&self, source: &VideoSource) -> MediaResult<Box<dyn FrameSampler>> {
        check_ffmpeg()?;
        let info = probe_source(source, self.config.probe_timeout).await?;
        let (width, height) = output_dimensions(&info, self.config.width);

        info!(
            source = %source,
            duration = ?info.duration,
            width = width,
            height = height,
            "Opened decoder session"
        );

        Ok(Box::new(FfmpegFrameSampler {
            source: source.clone(),
            info,
            width,
            height,
            decode_timeout: self.config.decode_timeout,
        }))
    }
}

/// Decoder session that runs one FFmpeg process per sample.
#[derive(Debug)]
pub struct FfmpegFrameSampler {
    source: VideoSource,
    info: VideoInfo,
    width: u32,
    height: u32,
    decode_timeout: Duration,
}

impl FfmpegFrameSampler {
    fn command(&self, timestamp_secs: f64) -> FfmpegCommand {
        FfmpegCommand::to_stdout(self.source.as_input())
            .seek(timestamp_secs.max(0.0))
            .single_frame()
            .video_filter(format!("scale={}:{}", self.width, self.height))
            .raw_rgba()
    }
}

#[async_trait]
impl FrameSampler for FfmpegFrameSampler {
    fn duration(&self) -> Option<f64> {
        self.info.duration
    }

    async fn sample(&mut self, timestamp_secs: f64) -> MediaResult<RgbaFrame> {
        let cmd = self.command(timestamp_secs);
        let runner = FfmpegRunner::new().with_timeout(self.decode_timeout);

        let bytes = runner.capture(&cmd).await?;
        if bytes.is_empty() {
            return Err(MediaError::decode_failed(format!(
                "no frame decoded at {:.3}s",
                timestamp_secs
            )));
        }

        let frame = RgbaFrame::new(self.width, self.height, bytes)
            .map_err(|e| MediaError::decode_failed(format!("truncated frame: {}", e)))?;

        debug!(timestamp_secs = timestamp_secs, "Decoded frame");
        Ok(frame)
    }
}

/// Scaled output size: at most `max_width` wide, even height, display aspect.
///
/// FFmpeg auto-rotates on decode, so rotated sources are sized by their
/// display dimensions rather than the coded ones.
fn output_dimensions(info: &VideoInfo, max_width: u32) -> (u32, u32) {
    let max_width = even(max_width.max(2));
    let (display_width, display_height) = info.display_dimensions();
    let (width, aspect) = if display_width > 0 && display_height > 0 {
        (
            even(display_width.min(max_width).max(2)),
            display_width as f64 / display_height as f64,
        )
    } else {
        (max_width, FALLBACK_ASPECT)
    };
    let height = even(((width as f64 / aspect).round() as u32).max(2));
    (width, height)
}

fn even(v: u32) -> u32 {
    v - (v % 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(width: u32, height: u32) -> VideoInfo {
        rotated(width, height, 0)
    }

    fn rotated(width: u32, height: u32, rotation: u32) -> VideoInfo {
        VideoInfo {
            duration: Some(60.0),
            width,
            height,
            rotation,
        }
    }

    #[test]
    fn test_output_dimensions_preserve_aspect() {
        assert_eq!(output_dimensions(&info(1920, 1080), 640), (640, 360));
        assert_eq!(output_dimensions(&info(1080, 1920), 640), (640, 1138));
    }

    #[test]
    fn test_output_dimensions_never_upscale() {
        assert_eq!(output_dimensions(&info(320, 240), 640), (320, 240));
    }

    #[test]
    fn test_output_dimensions_follow_display_rotation() {
        // Phone recording stored landscape with a quarter-turn display matrix
        assert_eq!(output_dimensions(&rotated(1920, 1080, 90), 640), (640, 1138));
        assert_eq!(output_dimensions(&rotated(1920, 1080, 270), 640), (640, 1138));
        assert_eq!(output_dimensions(&rotated(1920, 1080, 180), 640), (640, 360));
    }

    #[test]
    fn test_output_dimensions_unknown_size() {
        assert_eq!(output_dimensions(&info(0, 0), 640), (640, 360));
    }

    #[test]
    fn test_sample_command_targets_stdout() {
        let sampler = FfmpegFrameSampler {
            source: VideoSource::Url("https://media.example/a.mp4".into()),
            info: info(1920, 1080),
            width: 640,
            height: 360,
            decode_timeout: Duration::from_secs(5),
        };

        let args = sampler.command(42.0).build_args();
        assert!(args.contains(&"42.000".to_string()));
        assert!(args.contains(&"scale=640:360".to_string()));
        assert_eq!(args.last().unwrap(), "pipe:1");
    }
}
