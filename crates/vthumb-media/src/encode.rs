//! Still image encoding.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, RgbaImage};

use crate::error::{MediaError, MediaResult};
use crate::frame::RgbaFrame;

/// Fill color of the placeholder image.
const PLACEHOLDER_RGB: [u8; 3] = [38, 41, 48];

/// Encode a frame as JPEG. Alpha is dropped.
pub fn encode_jpeg(frame: &RgbaFrame, quality: u8) -> MediaResult<Vec<u8>> {
    let rgba = RgbaImage::from_raw(frame.width(), frame.height(), frame.as_bytes().to_vec())
        .ok_or_else(|| MediaError::invalid_frame("buffer does not match dimensions"))?;
    let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ColorType::Rgb8,
    )?;
    Ok(out.into_inner())
}

/// Neutral image served when no thumbnail could be generated.
pub fn placeholder_jpeg(width: u32, height: u32) -> MediaResult<Vec<u8>> {
    let frame = RgbaFrame::solid(width.max(1), height.max(1), PLACEHOLDER_RGB)?;
    encode_jpeg(&frame, 70)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_jpeg_produces_jpeg() {
        let frame = RgbaFrame::solid(32, 18, [200, 120, 40]).unwrap();
        let bytes = encode_jpeg(&frame, 85).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 18));
    }

    #[test]
    fn test_placeholder() {
        let bytes = placeholder_jpeg(64, 36).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
