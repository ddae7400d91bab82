//! The three caption layouts.
//!
//! Every template receives the raw frame and the preset size and returns a
//! canvas of exactly that size.

use image::imageops;
use image::{Rgb, RgbImage};

use reelcut_models::Caption;

use super::fit::aspect_fit;
use super::text::{blend_pixel, wrap_text, Typeface};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Peak alpha of the quote gradient, out of 255.
const QUOTE_GRADIENT_MAX_ALPHA: f32 = 180.0;

/// Signature shared by all templates.
pub type TemplateFn = fn(&RgbImage, &Caption, u32, u32, &dyn Typeface) -> RgbImage;

/// Top and bottom text from a caption. Body text of other variants is not
/// used by the classic layout.
fn classic_texts(caption: &Caption) -> (Option<&str>, Option<&str>) {
    match caption {
        Caption::Classic {
            top_text,
            bottom_text,
        } => (top_text.as_deref(), bottom_text.as_deref()),
        _ => (None, None),
    }
}

fn body_text(caption: &Caption) -> &str {
    match caption {
        Caption::Modern { body_text } | Caption::Quote { body_text } => body_text,
        Caption::Classic { bottom_text, .. } => bottom_text.as_deref().unwrap_or(""),
    }
}

fn centered_x(canvas_width: u32, text_width: u32) -> i32 {
    (canvas_width as i32 - text_width as i32) / 2
}

/// Draw `text` with an outline by stamping it at every offset of the
/// `stroke` square, then the fill on top.
fn draw_outlined(canvas: &mut RgbImage, face: &dyn Typeface, text: &str, x: i32, y: i32, size: f32, stroke: i32) {
    for dy in -stroke..=stroke {
        for dx in -stroke..=stroke {
            if dx == 0 && dy == 0 {
                continue;
            }
            face.draw(canvas, text, x + dx, y + dy, size, BLACK);
        }
    }
    face.draw(canvas, text, x, y, size, WHITE);
}

/// Uppercase outlined text near the top and bottom edges.
pub fn classic(frame: &RgbImage, caption: &Caption, width: u32, height: u32, face: &dyn Typeface) -> RgbImage {
    let mut canvas = aspect_fit(frame, width, height);

    let size = ((width as f32 * 0.08).floor()).max(1.0);
    let stroke = ((size as i32) / 15).max(2);
    let margin = width / 20 + stroke as u32;
    let max_width = width.saturating_sub(2 * margin);
    let line_height = face.line_height(size) as i32;

    let (top, bottom) = classic_texts(caption);

    if let Some(top) = top {
        let mut y = (height as f32 * 0.08).floor() as i32;
        for line in wrap_text(&top.to_uppercase(), face, size, max_width) {
            let x = centered_x(width, face.measure(&line, size));
            draw_outlined(&mut canvas, face, &line, x, y, size, stroke);
            y += line_height;
        }
    }

    if let Some(bottom) = bottom {
        let lines = wrap_text(&bottom.to_uppercase(), face, size, max_width);
        let mut y = (height as f32 * 0.92).floor() as i32 - lines.len() as i32 * line_height;
        for line in lines {
            let x = centered_x(width, face.measure(&line, size));
            draw_outlined(&mut canvas, face, &line, x, y, size, stroke);
            y += line_height;
        }
    }

    canvas
}

/// White caption bar above the frame with dark wrapped text.
pub fn modern(frame: &RgbImage, caption: &Caption, width: u32, height: u32, face: &dyn Typeface) -> RgbImage {
    let bar = ((height as f32 * 0.12).floor() as u32).min(height.saturating_sub(1));
    let mut canvas = RgbImage::from_pixel(width, height, WHITE);
    let body = aspect_fit(frame, width, height - bar);
    imageops::replace(&mut canvas, &body, 0, bar as i64);

    let size = ((bar as f32 * 0.5).floor()).max(1.0);
    let lines = wrap_text(body_text(caption), face, size, width.saturating_sub(40));
    let step = size as i32 + 5;

    let mut y = bar as i32 / 2 - (lines.len() as i32 * size as i32) / 2;
    for line in lines {
        let x = centered_x(width, face.measure(&line, size));
        face.draw(&mut canvas, &line, x, y, size, BLACK);
        y += step;
    }

    canvas
}

/// Dark gradient over the lower part with light wrapped text.
pub fn quote(frame: &RgbImage, caption: &Caption, width: u32, height: u32, face: &dyn Typeface) -> RgbImage {
    let mut canvas = aspect_fit(frame, width, height);

    let overlay = (height as f32 * 0.3).floor() as u32;
    for i in 0..overlay {
        let alpha = (QUOTE_GRADIENT_MAX_ALPHA * i as f32 / overlay as f32).floor() / 255.0;
        let y = (height - overlay + i) as i32;
        for x in 0..width as i32 {
            blend_pixel(&mut canvas, x, y, BLACK, alpha);
        }
    }

    let size = ((width as f32 * 0.05).floor()).max(1.0);
    let lines = wrap_text(body_text(caption), face, size, width.saturating_sub(60));
    let step = size as i32 + 5;

    let mut y = height as i32 - (overlay as f32 * 0.8).floor() as i32;
    for line in lines {
        let x = centered_x(width, face.measure(&line, size));
        face.draw(&mut canvas, &line, x, y, size, WHITE);
        y += step;
    }

    canvas
}
