//! Pixel quality estimation.
//!
//! Computes cheap local metrics from a regular subsample of the frame:
//! - brightness: mean luma (0-255), also used as the quality gate
//! - contrast: luma standard deviation
//! - sharpness: variance of the local gradient magnitude between
//!   neighbouring grid samples
//!
//! The three metrics are mapped to 0-100 and fused into `pixel_score`. The
//! weights are tunable; only the gate and the 0-100 scale are contractual.

use crate::frame::RgbaFrame;

/// Default brightness gate on the 0-255 luma scale.
pub const DEFAULT_DARK_THRESHOLD: f64 = 10.0;

/// Default number of grid samples along each axis.
pub const DEFAULT_GRID_SIZE: u32 = 96;

/// Luma band treated as well exposed.
const WELL_EXPOSED_MIN: f64 = 60.0;
const WELL_EXPOSED_MAX: f64 = 190.0;

/// Standard deviation that maps to a full contrast score.
const FULL_CONTRAST_STDDEV: f64 = 64.0;

/// Gradient standard deviation that maps to a full sharpness score.
const FULL_SHARPNESS_STDDEV: f64 = 24.0;

/// Estimator configuration.
#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// Frames with mean luma below this are rejected as dark
    pub dark_threshold: f64,
    /// Samples per axis (clamped to the frame size)
    pub grid_size: u32,
    pub brightness_weight: f64,
    pub contrast_weight: f64,
    pub sharpness_weight: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            dark_threshold: DEFAULT_DARK_THRESHOLD,
            grid_size: DEFAULT_GRID_SIZE,
            brightness_weight: 0.3,
            contrast_weight: 0.4,
            sharpness_weight: 0.3,
        }
    }
}

/// Metrics for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelQuality {
    /// Mean luma, 0-255
    pub brightness: f64,
    /// Luma standard deviation, 0-~128
    pub contrast: f64,
    /// Gradient magnitude standard deviation
    pub sharpness: f64,
    /// Fused score, 0-100
    pub pixel_score: f64,
    /// False when the frame is below the brightness gate
    pub passes_gate: bool,
}

/// Local, deterministic frame scorer.
#[derive(Debug, Clone, Default)]
pub struct PixelQualityEstimator {
    config: QualityConfig,
}

impl PixelQualityEstimator {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Score a frame.
    pub fn estimate(&self, frame: &RgbaFrame) -> PixelQuality {
        let (grid, cols, rows) = self.sample_grid(frame);

        let n = grid.len() as f64;
        let brightness = grid.iter().map(|&l| l as f64).sum::<f64>() / n;
        let variance = grid
            .iter()
            .map(|&l| {
                let d = l as f64 - brightness;
                d * d
            })
            .sum::<f64>()
            / n;
        let contrast = variance.sqrt();
        let sharpness = gradient_stddev(&grid, cols, rows);

        let pixel_score = self.fuse(
            brightness_score(brightness),
            (contrast / FULL_CONTRAST_STDDEV).min(1.0) * 100.0,
            (sharpness / FULL_SHARPNESS_STDDEV).min(1.0) * 100.0,
        );

        PixelQuality {
            brightness,
            contrast,
            sharpness,
            pixel_score,
            passes_gate: brightness >= self.config.dark_threshold,
        }
    }

    /// Regular subsample of luma values, row-major.
    fn sample_grid(&self, frame: &RgbaFrame) -> (Vec<f32>, usize, usize) {
        let grid = self.config.grid_size.max(2);
        let cols = grid.min(frame.width());
        let rows = grid.min(frame.height());

        let mut values = Vec::with_capacity(cols as usize * rows as usize);
        for gy in 0..rows {
            let y = grid_coord(gy, rows, frame.height());
            for gx in 0..cols {
                let x = grid_coord(gx, cols, frame.width());
                values.push(frame.luma_at(x, y));
            }
        }
        (values, cols as usize, rows as usize)
    }

    fn fuse(&self, brightness: f64, contrast: f64, sharpness: f64) -> f64 {
        let c = &self.config;
        let total = c.brightness_weight + c.contrast_weight + c.sharpness_weight;
        if total <= 0.0 {
            return 0.0;
        }
        let score = (brightness * c.brightness_weight
            + contrast * c.contrast_weight
            + sharpness * c.sharpness_weight)
            / total;
        score.clamp(0.0, 100.0)
    }
}

/// Map grid index `i` of `count` evenly across `0..extent`.
fn grid_coord(i: u32, count: u32, extent: u32) -> u32 {
    if count <= 1 {
        return extent / 2;
    }
    ((i as u64 * (extent as u64 - 1)) / (count as u64 - 1)) as u32
}

/// Brightness mapped to 0-100, full marks inside the well-exposed band.
fn brightness_score(brightness: f64) -> f64 {
    let score = if brightness < WELL_EXPOSED_MIN {
        brightness / WELL_EXPOSED_MIN
    } else if brightness > WELL_EXPOSED_MAX {
        (255.0 - brightness) / (255.0 - WELL_EXPOSED_MAX)
    } else {
        1.0
    };
    (score * 100.0).clamp(0.0, 100.0)
}

/// Standard deviation of |dx| + |dy| across the grid.
fn gradient_stddev(grid: &[f32], cols: usize, rows: usize) -> f64 {
    if cols < 2 || rows < 2 {
        return 0.0;
    }

    let mut magnitudes = Vec::with_capacity((cols - 1) * (rows - 1));
    for y in 0..rows - 1 {
        for x in 0..cols - 1 {
            let here = grid[y * cols + x];
            let dx = (grid[y * cols + x + 1] - here).abs();
            let dy = (grid[(y + 1) * cols + x] - here).abs();
            magnitudes.push((dx + dy) as f64);
        }
    }

    let n = magnitudes.len() as f64;
    let mean = magnitudes.iter().sum::<f64>() / n;
    let variance = magnitudes.iter().map(|m| (m - mean) * (m - mean)).sum::<f64>() / n;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frame with alternating black/white blocks.
    fn checkerboard(width: u32, height: u32, block: u32) -> RgbaFrame {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = if ((x / block) + (y / block)) % 2 == 0 { 30 } else { 220 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        RgbaFrame::new(width, height, data).unwrap()
    }

    #[test]
    fn test_black_frame_is_rejected() {
        let estimator = PixelQualityEstimator::default();
        let frame = RgbaFrame::solid(64, 36, [2, 2, 2]).unwrap();

        let quality = estimator.estimate(&frame);
        assert!(!quality.passes_gate);
        assert!(quality.brightness < DEFAULT_DARK_THRESHOLD);
        assert!(quality.pixel_score < 10.0);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let frame = RgbaFrame::solid(16, 16, [20, 20, 20]).unwrap();

        let default = PixelQualityEstimator::default().estimate(&frame);
        assert!(default.passes_gate);

        let strict = PixelQualityEstimator::new(QualityConfig {
            dark_threshold: 40.0,
            ..Default::default()
        })
        .estimate(&frame);
        assert!(!strict.passes_gate);
    }

    #[test]
    fn test_flat_gray_scores_below_textured() {
        let estimator = PixelQualityEstimator::default();
        let flat = estimator.estimate(&RgbaFrame::solid(128, 72, [128, 128, 128]).unwrap());
        let textured = estimator.estimate(&checkerboard(128, 72, 4));

        assert!(flat.passes_gate && textured.passes_gate);
        assert!(flat.contrast < 0.01);
        assert!(textured.contrast > 50.0);
        assert!(textured.sharpness > 0.0);
        assert!(textured.pixel_score > flat.pixel_score);
    }

    #[test]
    fn test_scores_stay_in_range() {
        let estimator = PixelQualityEstimator::default();
        for frame in [
            RgbaFrame::solid(8, 8, [255, 255, 255]).unwrap(),
            RgbaFrame::solid(1, 1, [0, 0, 0]).unwrap(),
            checkerboard(300, 200, 1),
        ] {
            let q = estimator.estimate(&frame);
            assert!((0.0..=100.0).contains(&q.pixel_score), "{:?}", q);
            assert!((0.0..=255.0).contains(&q.brightness));
        }
    }

    #[test]
    fn test_grid_coord_spans_extent() {
        assert_eq!(grid_coord(0, 4, 100), 0);
        assert_eq!(grid_coord(3, 4, 100), 99);
        assert_eq!(grid_coord(0, 1, 100), 50);
    }
}
