//! Aspect-fit cropping.

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Centered crop window `(x, y, width, height)` of a `src_w`x`src_h` image
/// that has the aspect ratio of `dst_w`x`dst_h`.
pub fn crop_window(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> (u32, u32, u32, u32) {
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return (0, 0, src_w, src_h);
    }

    let src_ratio = src_w as f64 / src_h as f64;
    let dst_ratio = dst_w as f64 / dst_h as f64;

    if src_ratio > dst_ratio {
        let width = ((src_h as f64 * dst_ratio) as u32).clamp(1, src_w);
        ((src_w - width) / 2, 0, width, src_h)
    } else if src_ratio < dst_ratio {
        let height = ((src_w as f64 / dst_ratio) as u32).clamp(1, src_h);
        (0, (src_h - height) / 2, src_w, height)
    } else {
        (0, 0, src_w, src_h)
    }
}

/// Crop equal margins to the target aspect, then resample to exactly
/// `width`x`height`. Nothing is letterboxed.
pub fn aspect_fit(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (x, y, w, h) = crop_window(image.width(), image.height(), width, height);
    let cropped = imageops::crop_imm(image, x, y, w, h).to_image();
    if cropped.dimensions() == (width, height) {
        return cropped;
    }
    imageops::resize(&cropped, width, height, FilterType::Lanczos3)
}
