use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::font::OverlayFont;
use super::format::StyledLine;
use super::layout::draw_overlay;
use crate::config::RenderConfig;
use crate::session::StyleParams;

/// Where the source image lands on the output raster.
///
/// Selected by the calling context, never auto-detected: single-image
/// export uses full-bleed, galleries use a uniform letterbox tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Output matches the source dimensions; image drawn at (0,0) unscaled.
    FullBleed,
    /// Fixed output size; image scaled uniformly, centered, padded with the
    /// background fill.
    Letterbox { width: u32, height: u32 },
}

/// Composite the source image and caption onto a fresh output raster.
///
/// The output buffer is allocated anew on every call — the result is a pure
/// function of the inputs, and stale content from a previous render can
/// never bleed through.
pub fn composite(
    source: &RgbaImage,
    placement: Placement,
    lines: &[StyledLine],
    style: StyleParams,
    cfg: &RenderConfig,
    font: &OverlayFont,
) -> RgbaImage {
    let mut canvas = match placement {
        Placement::FullBleed => source.clone(),
        Placement::Letterbox { width, height } => {
            let bg = Rgba([cfg.background[0], cfg.background[1], cfg.background[2], 255]);
            let mut canvas = RgbaImage::from_pixel(width.max(1), height.max(1), bg);
            let (src_w, src_h) = source.dimensions();
            if src_w > 0 && src_h > 0 && width > 0 && height > 0 {
                let ratio =
                    (width as f64 / src_w as f64).min(height as f64 / src_h as f64);
                let new_w = ((src_w as f64 * ratio).round() as u32).clamp(1, width);
                let new_h = ((src_h as f64 * ratio).round() as u32).clamp(1, height);
                let scaled = imageops::resize(source, new_w, new_h, FilterType::Triangle);
                let x = (width - new_w) / 2;
                let y = (height - new_h) / 2;
                imageops::overlay(&mut canvas, &scaled, x as i64, y as i64);
            }
            canvas
        }
    };

    draw_overlay(&mut canvas, lines, style, cfg, font);
    canvas
}
