//! Typefaces and line layout.
//!
//! A vector face is used when a TrueType/OpenType file is available; the
//! built-in 8x8 bitmap face keeps rendering working on hosts without fonts.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Fonts tried, in order, when no explicit font is configured.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Impact.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/Impact.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "C:\\Windows\\Fonts\\Impact.ttf",
];

/// Something that can measure and rasterize a single line of text.
pub trait Typeface: Send + Sync + fmt::Debug {
    /// Advance width of `text` in pixels.
    fn measure(&self, text: &str, size: f32) -> u32;

    /// Height of one line box in pixels.
    fn line_height(&self, size: f32) -> u32;

    /// Draw `text` with its line box's top-left corner at `(x, y)`.
    fn draw(&self, canvas: &mut RgbImage, text: &str, x: i32, y: i32, size: f32, color: Rgb<u8>);
}

/// Blend `color` into one pixel with the given coverage. Out-of-bounds
/// coordinates are ignored.
pub(crate) fn blend_pixel(canvas: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= canvas.width() || y as u32 >= canvas.height() {
        return;
    }
    let a = coverage.clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    let px = canvas.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let blended = px.0[c] as f32 * (1.0 - a) + color.0[c] as f32 * a;
        px.0[c] = blended.round().clamp(0.0, 255.0) as u8;
    }
}

/// Outline font loaded from disk.
pub struct VectorTypeface {
    font: FontVec,
    source: PathBuf,
}

impl fmt::Debug for VectorTypeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorTypeface").field("source", &self.source).finish()
    }
}

impl VectorTypeface {
    pub fn load(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| MediaError::source_unreadable(path, e.to_string()))?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| MediaError::source_unreadable(path, e.to_string()))?;
        Ok(Self {
            font,
            source: path.to_path_buf(),
        })
    }
}

impl Typeface for VectorTypeface {
    fn measure(&self, text: &str, size: f32) -> u32 {
        let scaled = self.font.as_scaled(PxScale::from(size));
        let mut width = 0.0f32;
        let mut prev: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width.ceil().max(0.0) as u32
    }

    fn line_height(&self, size: f32) -> u32 {
        let scaled = self.font.as_scaled(PxScale::from(size));
        scaled.height().ceil().max(1.0) as u32
    }

    fn draw(&self, canvas: &mut RgbImage, text: &str, x: i32, y: i32, size: f32, color: Rgb<u8>) {
        let scale = PxScale::from(size);
        let scaled = self.font.as_scaled(scale);
        let baseline = y as f32 + scaled.ascent();
        let mut caret = x as f32;
        let mut prev: Option<GlyphId> = None;

        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(p) = prev {
                caret += scaled.kern(p, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, baseline));
            caret += scaled.h_advance(id);
            prev = Some(id);

            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    blend_pixel(
                        canvas,
                        bounds.min.x as i32 + gx as i32,
                        bounds.min.y as i32 + gy as i32,
                        color,
                        coverage,
                    );
                });
            }
        }
    }
}

/// Built-in 8x8 bitmap face, scaled by whole pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapTypeface;

impl BitmapTypeface {
    const GLYPH: u32 = 8;

    fn cell(size: f32) -> u32 {
        ((size / Self::GLYPH as f32).round() as u32).max(1)
    }

    fn glyph(ch: char) -> [u8; 8] {
        BASIC_FONTS
            .get(ch)
            .or_else(|| LATIN_FONTS.get(ch))
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8])
    }
}

impl Typeface for BitmapTypeface {
    fn measure(&self, text: &str, size: f32) -> u32 {
        text.chars().count() as u32 * Self::GLYPH * Self::cell(size)
    }

    fn line_height(&self, size: f32) -> u32 {
        Self::GLYPH * Self::cell(size)
    }

    fn draw(&self, canvas: &mut RgbImage, text: &str, x: i32, y: i32, size: f32, color: Rgb<u8>) {
        let cell = Self::cell(size) as i32;
        let advance = Self::GLYPH as i32 * cell;

        for (i, ch) in text.chars().enumerate() {
            let origin_x = x + i as i32 * advance;
            for (row, bits) in Self::glyph(ch).iter().enumerate() {
                for col in 0..8 {
                    // bit 0 is the leftmost pixel
                    if bits & (1 << col) == 0 {
                        continue;
                    }
                    let px = origin_x + col * cell;
                    let py = y + row as i32 * cell;
                    for dy in 0..cell {
                        for dx in 0..cell {
                            blend_pixel(canvas, px + dx, py + dy, color, 1.0);
                        }
                    }
                }
            }
        }
    }
}

/// Pick a typeface: `preferred` first, then the system candidates, then the
/// bitmap face.
pub fn load_typeface(preferred: Option<&Path>) -> Arc<dyn Typeface> {
    let candidates = preferred
        .into_iter()
        .map(Path::to_path_buf)
        .chain(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));

    for path in candidates {
        if !path.exists() {
            continue;
        }
        match VectorTypeface::load(&path) {
            Ok(face) => {
                debug!(font = %path.display(), "Loaded caption font");
                return Arc::new(face);
            }
            Err(e) => warn!(font = %path.display(), error = %e, "Skipping unusable font"),
        }
    }

    debug!("No font file found, using built-in bitmap face");
    Arc::new(BitmapTypeface)
}

/// Greedy word wrap.
///
/// Words are appended while the line still measures within `max_width`.
/// A single word wider than `max_width` is emitted alone, unbroken.
pub fn wrap_text(text: &str, face: &dyn Typeface, size: f32, max_width: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        current.push(word);
        if face.measure(&current.join(" "), size) > max_width {
            current.pop();
            if !current.is_empty() {
                lines.push(current.join(" "));
            }
            current = vec![word];
        }
    }
    if !current.is_empty() {
        lines.push(current.join(" "));
    }
    lines
}
