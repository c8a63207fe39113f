//! Raster image to model input tensor.
//!
//! RGB conversion, bilinear resize to a fixed square, scaling of 0–255
//! intensities to `[0.0, 1.0]`, and a leading batch dimension of one.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use scenery_core::InputTensor;
use tracing::debug;

use crate::InferenceError;

/// Side length of the square input the scene network expects.
pub const INPUT_SIZE: u32 = 228;

const CHANNELS: usize = 3;

/// Decode an encoded image (PNG, JPEG, ...) from memory.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, InferenceError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Converts decoded images into `[1, 3, size, size]` tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessor {
    size: u32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(INPUT_SIZE)
    }
}

impl Preprocessor {
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Shape of every tensor this preprocessor produces.
    pub fn output_shape(&self) -> [usize; 4] {
        let side = self.size as usize;
        [1, CHANNELS, side, side]
    }

    pub fn normalize(&self, image: &DynamicImage) -> Result<InputTensor, InferenceError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 || self.size == 0 {
            return Err(InferenceError::EmptyImage { width, height });
        }

        let resized = {
            let rgb = image.to_rgb8();
            imageops::resize(&rgb, self.size, self.size, FilterType::Triangle)
        };
        debug!(width, height, size = self.size, "resized input image");

        Ok(InputTensor::new(self.output_shape(), to_planar(&resized))?)
    }
}

/// Interleaved RGB bytes to channel-first floats in `[0, 1]`.
fn to_planar(rgb: &RgbImage) -> Vec<f32> {
    let plane = (rgb.width() * rgb.height()) as usize;
    let mut data = Vec::with_capacity(CHANNELS * plane);
    for channel in 0..CHANNELS {
        data.extend(rgb.pixels().map(|p| f32::from(p[channel]) / 255.0));
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbaImage};
    use std::io::Cursor;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 255])
        }))
    }

    #[test]
    fn resizes_landscape_to_fixed_square() {
        let tensor = Preprocessor::default()
            .normalize(&gradient(400, 300))
            .unwrap();
        assert_eq!(tensor.shape(), [1, 3, 228, 228]);
        assert_eq!(tensor.data().len(), 3 * 228 * 228);

        let (lo, hi) = tensor.value_range().unwrap();
        assert!(lo >= 0.0, "min {lo} below 0");
        assert!(hi <= 1.0, "max {hi} above 1");
    }

    #[test]
    fn scales_intensities_by_255() {
        let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 0, 51])));
        let tensor = Preprocessor::new(4).normalize(&white).unwrap();
        let plane = 4 * 4;
        let data = tensor.data();

        assert!(data[..plane].iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(data[plane..2 * plane].iter().all(|&v| v.abs() < 1e-6));
        assert!(data[2 * plane..].iter().all(|&v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn drops_alpha_channel() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            8,
            8,
            image::Rgba([0, 255, 0, 10]),
        ));
        let tensor = Preprocessor::new(8).normalize(&rgba).unwrap();
        assert_eq!(tensor.channels(), 3);
    }

    #[test]
    fn grayscale_expands_to_three_channels() {
        let gray = DynamicImage::new_luma8(30, 20);
        let tensor = Preprocessor::default().normalize(&gray).unwrap();
        assert_eq!(tensor.shape(), [1, 3, 228, 228]);
    }

    #[test]
    fn rejects_empty_image() {
        let empty = DynamicImage::new_rgb8(0, 0);
        let err = Preprocessor::default().normalize(&empty).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::EmptyImage {
                width: 0,
                height: 0
            }
        ));
    }

    #[test]
    fn decodes_png_bytes() {
        let mut bytes = Vec::new();
        gradient(16, 12)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let decoded = decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 12));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, InferenceError::Decode(_)));
    }
}
