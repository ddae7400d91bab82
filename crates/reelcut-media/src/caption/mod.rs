//! Caption rendering onto still frames.
//!
//! The renderer aspect-fits a frame to one of the [`MemeFormat`] presets and
//! hands it to the template selected by the caption's variant. Templates are
//! looked up in a table keyed by [`TemplateKind`], so every caption maps to
//! exactly one layout.

pub mod fit;
pub mod templates;
pub mod text;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use tracing::info;

use reelcut_models::{Caption, MemeFormat, TemplateKind};

use crate::error::MediaResult;
use crate::fs_utils::write_atomically;
use crate::still::{encode_still, StillFormat};

pub use fit::aspect_fit;
pub use templates::TemplateFn;
pub use text::{load_typeface, wrap_text, BitmapTypeface, Typeface, VectorTypeface};

/// Composites captions onto frames.
#[derive(Clone)]
pub struct CaptionRenderer {
    face: Arc<dyn Typeface>,
    templates: HashMap<TemplateKind, TemplateFn>,
}

impl fmt::Debug for CaptionRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptionRenderer")
            .field("face", &self.face)
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CaptionRenderer {
    pub fn new(face: Arc<dyn Typeface>) -> Self {
        let mut table: HashMap<TemplateKind, TemplateFn> = HashMap::new();
        table.insert(TemplateKind::Classic, templates::classic);
        table.insert(TemplateKind::Modern, templates::modern);
        table.insert(TemplateKind::Quote, templates::quote);
        Self {
            face,
            templates: table,
        }
    }

    /// Renderer using the font at `font_path`, a system font, or the
    /// built-in bitmap face, whichever loads first.
    pub fn with_font(font_path: Option<&Path>) -> Self {
        Self::new(load_typeface(font_path))
    }

    fn template(&self, kind: TemplateKind) -> TemplateFn {
        self.templates
            .get(&kind)
            .or_else(|| self.templates.get(&TemplateKind::Classic))
            .copied()
            .unwrap_or(templates::classic)
    }

    /// Render `caption` over `frame` at the exact size of `format`.
    pub fn render(&self, frame: &RgbImage, caption: &Caption, format: MemeFormat) -> RgbImage {
        let (width, height) = format.dimensions();
        let render = self.template(caption.kind());
        render(frame, caption, width, height, self.face.as_ref())
    }

    /// Render and encode losslessly.
    pub fn render_png(&self, frame: &RgbImage, caption: &Caption, format: MemeFormat) -> MediaResult<Vec<u8>> {
        encode_still(&self.render(frame, caption, format), StillFormat::LOSSLESS)
    }

    /// Render, encode and write to `destination`.
    pub fn render_to_file(
        &self,
        frame: &RgbImage,
        caption: &Caption,
        format: MemeFormat,
        destination: impl AsRef<Path>,
    ) -> MediaResult<PathBuf> {
        let bytes = self.render_png(frame, caption, format)?;
        let path = write_atomically(destination, &bytes)?;
        info!(
            output = %path.display(),
            template = %caption.kind(),
            format = %format,
            "Rendered caption"
        );
        Ok(path)
    }
}

impl Default for CaptionRenderer {
    fn default() -> Self {
        Self::new(Arc::new(BitmapTypeface))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    fn frame(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]))
    }

    #[test]
    fn test_every_template_registered() {
        let renderer = CaptionRenderer::default();
        for kind in TemplateKind::ALL {
            assert!(renderer.templates.contains_key(kind));
        }
    }

    #[test]
    fn test_output_matches_preset_for_any_input() {
        let renderer = CaptionRenderer::default();
        let captions = [
            Caption::classic("top", "bottom"),
            Caption::modern("a caption long enough to wrap over more than a single line of text"),
            Caption::quote("short"),
        ];
        let formats = [MemeFormat::Square, MemeFormat::Wide, MemeFormat::Tall];
        for (i, format) in formats.into_iter().enumerate() {
            for (j, (w, h)) in [(192, 108), (108, 192)].into_iter().enumerate() {
                let caption = &captions[(i + j) % captions.len()];
                let out = renderer.render(&frame(w, h), caption, format);
                assert_eq!(out.dimensions(), format.dimensions(), "{:?} {:?}", format, caption.kind());
            }
        }
    }

    #[test]
    fn test_landscape_to_tall() {
        let out = CaptionRenderer::default().render(&frame(1920, 1080), &Caption::quote("x"), MemeFormat::Tall);
        assert_eq!(out.dimensions(), (1080, 1920));
    }

    #[test]
    fn test_render_to_file_writes_png() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("meme.png");
        CaptionRenderer::default()
            .render_to_file(&frame(64, 64), &Caption::modern("hello"), MemeFormat::Wide, &dest)
            .unwrap();
        let img = image::open(&dest).unwrap();
        assert_eq!((img.width(), img.height()), (1200, 675));
    }
}
