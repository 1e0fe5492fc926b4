//! Decoded frame buffers.

use crate::error::{MediaError, MediaResult};

/// Bytes per RGBA pixel.
pub const RGBA_CHANNELS: usize = 4;

/// A fully decoded RGBA frame.
///
/// Owned by the sampling call that produced it; scoring borrows it and the
/// coordinator drops it once the attempt is finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbaFrame {
    /// Wrap a raw buffer, checking it holds exactly `width * height` pixels.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> MediaResult<Self> {
        if width == 0 || height == 0 {
            return Err(MediaError::invalid_frame(format!(
                "zero-sized frame {}x{}",
                width, height
            )));
        }
        let expected = Self::expected_len(width, height);
        if data.len() != expected {
            return Err(MediaError::invalid_frame(format!(
                "expected {} bytes for {}x{} RGBA, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Frame filled with a single color.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> MediaResult<Self> {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * RGBA_CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Self::new(width, height, data)
    }

    /// Byte length of a `width` x `height` RGBA buffer.
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * RGBA_CHANNELS
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Rec. 601 luma of the pixel at `(x, y)` on a 0-255 scale.
    ///
    /// Callers must keep `x < width` and `y < height`.
    pub fn luma_at(&self, x: u32, y: u32) -> f32 {
        let i = (y as usize * self.width as usize + x as usize) * RGBA_CHANNELS;
        let r = self.data[i] as f32;
        let g = self.data[i + 1] as f32;
        let b = self.data[i + 2] as f32;
        0.299 * r + 0.587 * g + 0.114 * b
    }
}
