//! Still-image encoding shared by frame sampling, thumbnails and memes.

use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat, RgbImage};
use serde::{Deserialize, Serialize};

use reelcut_models::encoding::FRAME_JPEG_QUALITY;

use crate::error::MediaResult;

/// Compressed still format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StillFormat {
    Jpeg { quality: u8 },
    Png,
}

impl StillFormat {
    /// Lossy format used for sampled frames.
    pub const FRAME: StillFormat = StillFormat::Jpeg {
        quality: FRAME_JPEG_QUALITY,
    };

    /// Lossless format used for thumbnails and memes.
    pub const LOSSLESS: StillFormat = StillFormat::Png;

    pub fn extension(&self) -> &'static str {
        match self {
            StillFormat::Jpeg { .. } => "jpg",
            StillFormat::Png => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            StillFormat::Jpeg { .. } => "image/jpeg",
            StillFormat::Png => "image/png",
        }
    }
}

/// Encode an RGB buffer.
pub fn encode_still(image: &RgbImage, format: StillFormat) -> MediaResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let output = match format {
        StillFormat::Jpeg { quality } => ImageOutputFormat::Jpeg(quality.clamp(1, 100)),
        StillFormat::Png => ImageOutputFormat::Png,
    };
    DynamicImage::ImageRgb8(image.clone()).write_to(&mut buf, output)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_png_is_lossless() {
        let img = RgbImage::from_fn(7, 5, |x, y| Rgb([x as u8 * 30, y as u8 * 40, 200]));
        let bytes = encode_still(&img, StillFormat::LOSSLESS).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_jpeg_keeps_dimensions() {
        let img = RgbImage::from_pixel(32, 18, Rgb([90, 120, 30]));
        let bytes = encode_still(&img, StillFormat::FRAME).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 18));
    }
}
