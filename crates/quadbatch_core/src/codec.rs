//! Image codec seam
//!
//! Texture bytes are decoded to RGBA8 and captures are written as PNG
//! through [`ImageCodec`]. [`PngCodec`] is the `image`-crate implementation.

use std::path::Path;

use crate::error::{CanvasError, Result};

/// Decoded RGBA8 image
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows, top row first
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Copy into a larger transparent canvas, anchored top-left.
    pub fn padded(&self, width: u32, height: u32) -> DecodedImage {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let src_stride = self.width as usize * 4;
        let dst_stride = width as usize * 4;
        let mut pixels = vec![0u8; dst_stride * height as usize];
        for (row, src) in self
            .pixels
            .chunks_exact(src_stride.max(1))
            .take(self.height.min(height) as usize)
            .enumerate()
        {
            let len = src_stride.min(dst_stride);
            pixels[row * dst_stride..row * dst_stride + len].copy_from_slice(&src[..len]);
        }
        DecodedImage {
            width,
            height,
            pixels,
        }
    }
}

/// Smallest power of two that is at least `n` and at least 2
pub fn power_of_two_at_least(n: u32) -> u32 {
    n.max(2).next_power_of_two()
}

/// Decode and encode images
pub trait ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage>;

    /// Write tightly packed RGBA8 `pixels` to `path` as a PNG.
    fn encode_png(&self, path: &Path, pixels: &[u8], width: u32, height: u32) -> Result<()>;
}

/// [`ImageCodec`] backed by the `image` crate
#[derive(Clone, Copy, Debug, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        let img = image::load_from_memory(bytes).map_err(|e| CanvasError::Decode(e.to_string()))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(DecodedImage {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    fn encode_png(&self, path: &Path, pixels: &[u8], width: u32, height: u32) -> Result<()> {
        image::save_buffer_with_format(
            path,
            pixels,
            width,
            height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .map_err(|e| CanvasError::Encode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_of_two_sizes() {
        assert_eq!(power_of_two_at_least(0), 2);
        assert_eq!(power_of_two_at_least(1), 2);
        assert_eq!(power_of_two_at_least(2), 2);
        assert_eq!(power_of_two_at_least(3), 4);
        assert_eq!(power_of_two_at_least(64), 64);
        assert_eq!(power_of_two_at_least(65), 128);
    }

    #[test]
    fn padding_anchors_top_left() {
        let image = DecodedImage {
            width: 1,
            height: 2,
            pixels: vec![1, 2, 3, 4, 5, 6, 7, 8],
        };
        let padded = image.padded(2, 2);
        assert_eq!(
            padded.pixels,
            vec![1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8, 0, 0, 0, 0]
        );
    }

    #[test]
    fn png_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        let pixels: Vec<u8> = (0..2 * 3 * 4).map(|i| i as u8).collect();

        PngCodec.encode_png(&path, &pixels, 2, 3).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let decoded = PngCodec.decode(&bytes).unwrap();

        assert_eq!((decoded.width, decoded.height), (2, 3));
        assert_eq!(decoded.pixels, pixels);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = PngCodec.decode(b"not an image").unwrap_err();
        assert!(matches!(err, CanvasError::Decode(_)));
    }

    #[test]
    fn unwritable_path_fails_to_encode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.png");
        let err = PngCodec.encode_png(&path, &[0; 4], 1, 1).unwrap_err();
        assert!(matches!(err, CanvasError::Encode { .. }));
    }
}
