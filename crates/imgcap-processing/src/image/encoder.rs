//! Tensor to PNG / base64 / data URL encoding

use base64::Engine;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use imgcap_core::{CaptionError, CaptionResult};
use std::io::Cursor;

use crate::image::tensor::ImageTensor;

pub const PNG_MEDIA_TYPE: &str = "image/png";

/// PNG bytes of one image together with their base64 text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    png: Vec<u8>,
    base64: String,
}

impl EncodedImage {
    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    /// `data:image/png;base64,<payload>`
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", PNG_MEDIA_TYPE, self.base64)
    }
}

/// Encode a tensor as PNG. No resizing or colour conversion is applied, so
/// identical tensors always produce identical output.
pub fn encode_png(tensor: &ImageTensor) -> CaptionResult<EncodedImage> {
    let layout = tensor.layout()?;
    let samples = tensor.to_u8_samples();
    let (width, height) = (layout.width, layout.height);

    let raster = match layout.channels {
        1 => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(width, height, samples).map(DynamicImage::ImageRgba8),
        n => {
            return Err(CaptionError::ImageEncoding(format!(
                "unsupported channel count {}",
                n
            )))
        }
    }
    .ok_or_else(|| {
        CaptionError::ImageEncoding(format!(
            "sample buffer does not fit {}x{}x{}",
            width, height, layout.channels
        ))
    })?;

    let mut png = Vec::new();
    raster
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| CaptionError::ImageEncoding(format!("PNG serialization failed: {}", e)))?;

    let base64 = base64::engine::general_purpose::STANDARD.encode(&png);

    tracing::debug!(
        width,
        height,
        channels = layout.channels,
        png_size = png.len(),
        "Encoded image tensor"
    );

    Ok(EncodedImage { png, base64 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_all_zero_tensor_encodes_black_png() {
        let tensor = ImageTensor::zeros(vec![1, 4, 6, 3]).unwrap();
        let encoded = encode_png(&tensor).unwrap();

        assert_eq!(&encoded.png_bytes()[..4], &[0x89, 0x50, 0x4E, 0x47]);

        let decoded = image::load_from_memory_with_format(encoded.png_bytes(), ImageFormat::Png)
            .unwrap();
        assert_eq!(decoded.dimensions(), (6, 4));
        assert!(decoded.to_rgb8().pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let data = (0..2 * 3 * 3).map(|i| i as f32 / 17.0).collect();
        let tensor = ImageTensor::new(vec![1, 2, 3, 3], data).unwrap();

        let first = encode_png(&tensor).unwrap();
        let second = encode_png(&tensor).unwrap();
        assert_eq!(first.base64(), second.base64());
    }

    #[test]
    fn test_base64_matches_png_bytes() {
        let tensor = ImageTensor::zeros(vec![2, 2]).unwrap();
        let encoded = encode_png(&tensor).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.base64())
            .unwrap();
        assert_eq!(decoded, encoded.png_bytes());
    }

    #[test]
    fn test_data_url_prefix() {
        let tensor = ImageTensor::zeros(vec![1, 1, 1, 4]).unwrap();
        let encoded = encode_png(&tensor).unwrap();
        let url = encoded.data_url();
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
        assert!(url.ends_with(encoded.base64()));
    }

    #[test]
    fn test_grayscale_and_rgba_keep_their_color_type() {
        let gray = encode_png(&ImageTensor::zeros(vec![1, 2, 2, 1]).unwrap()).unwrap();
        let decoded = image::load_from_memory(gray.png_bytes()).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);

        let rgba = ImageTensor::new(vec![1, 1, 1, 4], vec![1.0, 0.0, 0.0, 0.5]).unwrap();
        let decoded = image::load_from_memory(encode_png(&rgba).unwrap().png_bytes()).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgba8);
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0, [255, 0, 0, 127]);
    }

    #[test]
    fn test_batch_is_rejected() {
        let tensor = ImageTensor::zeros(vec![3, 2, 2, 3]).unwrap();
        assert!(matches!(
            encode_png(&tensor),
            Err(CaptionError::ImageEncoding(_))
        ));
    }
}
