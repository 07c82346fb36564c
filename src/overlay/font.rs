use anyhow::{Context, Result, anyhow};
use rusttype::{Font, Scale, point};
use std::path::Path;

/// A resolved overlay font: glyph source for rasterization plus text
/// measurement.
///
/// The `fallback` variant has no glyph data — it measures with a per-char
/// width estimate and rasterizes nothing. It exists so layout geometry
/// stays exercisable in fontless environments; interactive use resolves a
/// real face at startup and fails loudly if none is found.
pub struct OverlayFont {
    face: FontFace,
}

enum FontFace {
    Loaded(Font<'static>),
    Estimate,
}

impl OverlayFont {
    /// Resolve a font: explicit file, then named family, then the system
    /// sans-serif.
    pub fn resolve(font_path: Option<&Path>, font_family: Option<&str>) -> Result<Self> {
        if let Some(path) = font_path {
            return Self::from_path(path);
        }

        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        if let Some(family) = font_family {
            if let Ok(font) = Self::from_db(&db, &[fontdb::Family::Name(family)]) {
                return Ok(font);
            }
            log::warn!("Font family '{family}' not found, falling back to sans-serif");
        }

        Self::from_db(&db, &[fontdb::Family::SansSerif])
            .map_err(|_| anyhow!("No usable font found. Set render.font_path in the config."))
    }

    /// Load a font file directly.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read font: {}", path.display()))?;
        let font = Font::try_from_vec(data)
            .ok_or_else(|| anyhow!("Failed to parse font: {}", path.display()))?;
        Ok(Self { face: FontFace::Loaded(font) })
    }

    fn from_db(db: &fontdb::Database, families: &[fontdb::Family]) -> Result<Self> {
        let query = fontdb::Query { families, ..Default::default() };
        let id = db.query(&query).ok_or_else(|| anyhow!("no matching font face"))?;
        let (data, index) = db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or_else(|| anyhow!("failed to load font data"))?;
        let font = Font::try_from_vec_and_index(data, index)
            .ok_or_else(|| anyhow!("failed to parse font data"))?;
        Ok(Self { face: FontFace::Loaded(font) })
    }

    /// Measurement-only fallback: per-char width estimate, no glyphs.
    pub fn fallback() -> Self {
        Self { face: FontFace::Estimate }
    }

    /// Whether this font can rasterize glyphs.
    pub fn is_rasterizing(&self) -> bool {
        matches!(self.face, FontFace::Loaded(_))
    }

    /// Width of `text` in pixels at the given font size.
    pub fn measure(&self, text: &str, px: f32) -> f32 {
        match &self.face {
            FontFace::Loaded(font) => {
                let scale = Scale::uniform(px);
                let mut width = 0.0;
                for glyph in font.layout(text, scale, point(0.0, 0.0)) {
                    width = glyph.position().x + glyph.unpositioned().h_metrics().advance_width;
                }
                width
            }
            FontFace::Estimate => estimate_text_width_units(text) * px,
        }
    }

    /// Ascent and descent (descent is negative) at the given font size.
    pub fn v_metrics(&self, px: f32) -> (f32, f32) {
        match &self.face {
            FontFace::Loaded(font) => {
                let vm = font.v_metrics(Scale::uniform(px));
                (vm.ascent, vm.descent)
            }
            FontFace::Estimate => (px * 0.8, -px * 0.2),
        }
    }

    /// Rasterize `text` with its baseline at `origin`, reporting per-pixel
    /// coverage in `[0, 1]` to the callback. No-op without glyph data.
    pub(crate) fn for_each_coverage(
        &self,
        text: &str,
        px: f32,
        origin: (f32, f32),
        mut f: impl FnMut(i32, i32, f32),
    ) {
        let FontFace::Loaded(font) = &self.face else {
            return;
        };
        let scale = Scale::uniform(px);
        for glyph in font.layout(text, scale, point(origin.0, origin.1)) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, coverage| {
                    f(gx as i32 + bb.min.x, gy as i32 + bb.min.y, coverage);
                });
            }
        }
    }
}

fn estimate_char_units(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else {
        0.9
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars().map(estimate_char_units).sum()
}
