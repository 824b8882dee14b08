//! Normalized float image buffers as handed over by the host

use image::{ColorType, DynamicImage, GenericImageView};
use imgcap_core::{CaptionError, CaptionResult};

/// Height x width x channel samples in [0,1], optionally with a leading batch
/// dimension of 1. Row-major, channels interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

/// Raster geometry once the batch dimension is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorLayout {
    pub height: u32,
    pub width: u32,
    pub channels: u8,
}

impl ImageTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> CaptionResult<Self> {
        let expected = shape.iter().product::<usize>();
        if shape.is_empty() || expected != data.len() {
            return Err(CaptionError::ImageEncoding(format!(
                "shape {:?} requires {} samples, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn zeros(shape: Vec<usize>) -> CaptionResult<Self> {
        let len = shape.iter().product();
        Self::new(shape, vec![0.0; len])
    }

    /// Normalize a decoded picture into a `[1, H, W, C]` tensor.
    ///
    /// Grayscale stays single-channel, anything with alpha becomes RGBA and
    /// everything else RGB.
    pub fn from_image(img: &DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        let (channels, raw): (usize, Vec<u8>) = match img.color() {
            ColorType::L8 | ColorType::L16 => (1, img.to_luma8().into_raw()),
            color if color.has_alpha() => (4, img.to_rgba8().into_raw()),
            _ => (3, img.to_rgb8().into_raw()),
        };

        Self {
            shape: vec![1, height as usize, width as usize, channels],
            data: raw.into_iter().map(|v| f32::from(v) / 255.0).collect(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Resolve height, width and channels, dropping a singleton batch dimension.
    pub fn layout(&self) -> CaptionResult<TensorLayout> {
        let (height, width, channels) = match *self.shape.as_slice() {
            [1, h, w, c] | [h, w, c] => (h, w, c),
            [h, w] => (h, w, 1),
            [batch, _, _, _] => {
                return Err(CaptionError::ImageEncoding(format!(
                    "expected a single image, got a batch of {}",
                    batch
                )))
            }
            _ => {
                return Err(CaptionError::ImageEncoding(format!(
                    "unsupported tensor shape {:?}",
                    self.shape
                )))
            }
        };

        if height == 0 || width == 0 {
            return Err(CaptionError::ImageEncoding(format!(
                "image has no pixels: {}x{}",
                width, height
            )));
        }
        if !matches!(channels, 1 | 3 | 4) {
            return Err(CaptionError::ImageEncoding(format!(
                "unsupported channel count {}",
                channels
            )));
        }

        let to_u32 = |v: usize| {
            u32::try_from(v)
                .map_err(|_| CaptionError::ImageEncoding(format!("dimension {} too large", v)))
        };

        Ok(TensorLayout {
            height: to_u32(height)?,
            width: to_u32(width)?,
            channels: channels as u8,
        })
    }

    /// Scale to [0,255], clamp and truncate to 8-bit samples.
    pub fn to_u8_samples(&self) -> Vec<u8> {
        self.data.iter().map(|&v| quantize(v)).collect()
    }
}

fn quantize(v: f32) -> u8 {
    // NaN casts to 0.
    (v * 255.0).clamp(0.0, 255.0) as u8
}
