use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::font::OverlayFont;
use super::format::{LineColor, StyledLine};
use crate::config::RenderConfig;
use crate::session::StyleParams;

/// Legibility strategy for the caption. Shadow and scrim are alternatives;
/// the enum makes combining them unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Legibility {
    /// Soft blurred shadow behind each row, proportional to font size.
    Shadow,
    /// Solid translucent band behind the text block.
    Scrim,
    /// Bare text.
    None,
}

/// Metrics derived from canvas width and the user style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayMetrics {
    pub font_size: f32,
    pub padding: f32,
    pub line_height: f32,
}

/// Derive font size, padding, and line height for a canvas width.
///
/// The slider range (roughly 10–100) maps through the configured divisor to
/// a font size relative to image width; padding and line height follow as
/// fixed multiples.
pub fn overlay_metrics(canvas_width: u32, style: StyleParams, cfg: &RenderConfig) -> OverlayMetrics {
    let font_size = canvas_width as f32 * (style.font_scale / cfg.font_scale_divisor);
    OverlayMetrics {
        font_size,
        padding: font_size * cfg.padding_factor,
        line_height: font_size * cfg.line_height_factor,
    }
}

/// One visual row of the caption, positioned by its bottom edge.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRow {
    pub text: String,
    pub color: LineColor,
    pub x: f32,
    pub bottom: f32,
}

/// Greedy word wrap against a pixel measure.
///
/// A single word wider than `max_width` is placed alone on its own row, so
/// the pass always terminates and never drops text.
pub fn wrap_line(text: &str, max_width: f32, measure: &impl Fn(&str) -> f32) -> Vec<String> {
    if measure(text) <= max_width {
        return vec![text.to_string()];
    }

    let mut rows = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else {
            let candidate = format!("{current} {word}");
            if measure(&candidate) <= max_width {
                current = candidate;
            } else {
                rows.push(current);
                current = word.to_string();
            }
        }
    }
    if !current.is_empty() {
        rows.push(current);
    }
    if rows.is_empty() {
        rows.push(text.to_string());
    }
    rows
}

/// Compute the placed rows for a caption, bottom-anchored.
///
/// Styled lines are processed in reverse so the semantically first line
/// lands nearest the bottom edge. Wrapping is a forward pass per line; its
/// rows are emitted in reverse so the upward-moving cursor leaves them in
/// reading order.
pub fn layout_rows(
    lines: &[StyledLine],
    canvas_width: u32,
    canvas_height: u32,
    style: StyleParams,
    cfg: &RenderConfig,
    measure: impl Fn(&str) -> f32,
) -> Vec<PlacedRow> {
    let metrics = overlay_metrics(canvas_width, style, cfg);
    let max_width = (canvas_width as f32 - 2.0 * metrics.padding).max(1.0);
    let mut y = canvas_height as f32 - metrics.padding;
    let mut rows = Vec::new();

    for line in lines.iter().rev() {
        let wrapped = wrap_line(&line.text, max_width, &measure);
        for text in wrapped.into_iter().rev() {
            rows.push(PlacedRow { text, color: line.color, x: metrics.padding, bottom: y });
            y -= metrics.line_height;
        }
    }

    rows
}

/// Draw the caption onto the canvas.
///
/// Recomputes everything from its inputs on every call — there is no
/// retained layout state between redraws.
pub fn draw_overlay(
    canvas: &mut RgbaImage,
    lines: &[StyledLine],
    style: StyleParams,
    cfg: &RenderConfig,
    font: &OverlayFont,
) {
    if lines.is_empty() {
        return;
    }
    let metrics = overlay_metrics(canvas.width(), style, cfg);
    if metrics.font_size < 1.0 {
        return;
    }

    let rows = layout_rows(lines, canvas.width(), canvas.height(), style, cfg, |s| {
        font.measure(s, metrics.font_size)
    });

    match cfg.legibility {
        Legibility::Scrim => draw_scrim(canvas, &rows, &metrics, cfg),
        Legibility::Shadow => {
            for row in &rows {
                draw_row_shadow(canvas, row, &metrics, cfg, font);
            }
        }
        Legibility::None => {}
    }

    for row in &rows {
        let rgb = match row.color {
            LineColor::Accent => cfg.accent_color,
            LineColor::Primary => cfg.primary_color,
        };
        draw_row(canvas, font, metrics.font_size, row, rgb, style.opacity);
    }
}

fn draw_row(
    canvas: &mut RgbaImage,
    font: &OverlayFont,
    px: f32,
    row: &PlacedRow,
    rgb: [u8; 3],
    alpha: f32,
) {
    let (_, descent) = font.v_metrics(px);
    // descent is negative: the baseline sits above the row's bottom edge
    let baseline = row.bottom + descent;
    font.for_each_coverage(&row.text, px, (row.x, baseline), |x, y, coverage| {
        blend(canvas, x, y, rgb, coverage * alpha);
    });
}

/// Translucent band behind the whole text block. Its opacity is a fixed
/// config value — the user opacity slider affects only the text fill.
fn draw_scrim(canvas: &mut RgbaImage, rows: &[PlacedRow], metrics: &OverlayMetrics, cfg: &RenderConfig) {
    let Some(highest) = rows.iter().map(|r| r.bottom).reduce(f32::min) else {
        return;
    };
    let top = (highest - metrics.line_height).max(0.0) as u32;
    for y in top..canvas.height() {
        for x in 0..canvas.width() {
            blend(canvas, x as i32, y as i32, [0, 0, 0], cfg.scrim_opacity);
        }
    }
}

/// Soft shadow for one row: rasterize its coverage into a mask, box-blur,
/// composite in black slightly offset toward bottom-right.
fn draw_row_shadow(
    canvas: &mut RgbaImage,
    row: &PlacedRow,
    metrics: &OverlayMetrics,
    cfg: &RenderConfig,
    font: &OverlayFont,
) {
    if !font.is_rasterizing() {
        return;
    }
    let px = metrics.font_size;
    let blur = ((px * 0.06).round() as i32).max(1);
    let offset = ((px * 0.03).round() as i32).max(1);
    let (ascent, descent) = font.v_metrics(px);

    let width = font.measure(&row.text, px).ceil() as i32;
    let height = (ascent - descent).ceil() as i32;
    if width <= 0 || height <= 0 {
        return;
    }

    let margin = blur * 2;
    let mask_w = width + margin * 2;
    let mask_h = height + margin * 2;
    let mut mask = vec![0f32; (mask_w * mask_h) as usize];

    font.for_each_coverage(
        &row.text,
        px,
        (margin as f32, margin as f32 + ascent),
        |x, y, coverage| {
            if x >= 0 && y >= 0 && x < mask_w && y < mask_h {
                let i = (y * mask_w + x) as usize;
                mask[i] = mask[i].max(coverage);
            }
        },
    );

    box_blur(&mut mask, mask_w as usize, mask_h as usize, blur as usize);

    let baseline = row.bottom + descent;
    let top = (baseline - ascent) as i32;
    let left = row.x as i32;
    for my in 0..mask_h {
        for mx in 0..mask_w {
            let coverage = mask[(my * mask_w + mx) as usize];
            if coverage < 0.004 {
                continue;
            }
            blend(
                canvas,
                left - margin + offset + mx,
                top - margin + offset + my,
                [0, 0, 0],
                coverage * cfg.shadow_opacity,
            );
        }
    }
}

/// Separable box blur, one horizontal and one vertical pass.
fn box_blur(mask: &mut [f32], width: usize, height: usize, radius: usize) {
    if radius == 0 {
        return;
    }
    let norm = (2 * radius + 1) as f32;
    let mut tmp = vec![0f32; mask.len()];

    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0;
            for dx in -(radius as i64)..=(radius as i64) {
                let sx = x as i64 + dx;
                if sx >= 0 && (sx as usize) < width {
                    sum += mask[y * width + sx as usize];
                }
            }
            tmp[y * width + x] = sum / norm;
        }
    }

    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0;
            for dy in -(radius as i64)..=(radius as i64) {
                let sy = y as i64 + dy;
                if sy >= 0 && (sy as usize) < height {
                    sum += tmp[sy as usize * width + x];
                }
            }
            mask[y * width + x] = sum / norm;
        }
    }
}

fn blend(canvas: &mut RgbaImage, x: i32, y: i32, rgb: [u8; 3], alpha: f32) {
    if alpha <= 0.0 || x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= canvas.width() || y >= canvas.height() {
        return;
    }
    let alpha = alpha.min(1.0);
    let inv = 1.0 - alpha;
    let dst = canvas.get_pixel_mut(x, y);
    for c in 0..3 {
        dst.0[c] = (rgb[c] as f32 * alpha + dst.0[c] as f32 * inv).round() as u8;
    }
    dst.0[3] = 255;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::format::{LineColor, StyledLine};

    /// Fixed-width fake measure: 10px per char.
    fn char_measure(s: &str) -> f32 {
        s.chars().count() as f32 * 10.0
    }

    fn style() -> StyleParams {
        StyleParams { font_scale: 55.0, opacity: 0.95 }
    }

    fn line(text: &str, color: LineColor) -> StyledLine {
        StyledLine { text: text.into(), color }
    }

    #[test]
    fn metrics_follow_canvas_width() {
        let cfg = RenderConfig::default();
        let m = overlay_metrics(1000, style(), &cfg);
        assert!((m.font_size - 1000.0 * 55.0 / cfg.font_scale_divisor).abs() < 1e-3);
        assert!((m.padding - m.font_size * cfg.padding_factor).abs() < 1e-3);
        assert!((m.line_height - m.font_size * cfg.line_height_factor).abs() < 1e-3);
    }

    #[test]
    fn wrap_reassembles_original_text() {
        let text = "one two three four five six seven";
        let rows = wrap_line(text, 100.0, &char_measure);
        assert!(rows.len() >= 2);
        assert_eq!(rows.join(" "), text);
        for row in &rows {
            assert!(char_measure(row) <= 100.0);
        }
    }

    #[test]
    fn overlong_word_gets_its_own_row() {
        let text = "ok incomprehensibilities ok";
        let rows = wrap_line(text, 100.0, &char_measure);
        assert!(rows.contains(&"incomprehensibilities".to_string()));
        assert_eq!(rows.join(" "), text);
    }

    #[test]
    fn short_line_is_untouched() {
        let rows = wrap_line("short", 100.0, &char_measure);
        assert_eq!(rows, vec!["short".to_string()]);
    }

    #[test]
    fn first_line_lands_nearest_the_bottom() {
        let cfg = RenderConfig::default();
        let lines = vec![
            line("identity", LineColor::Accent),
            line("settings", LineColor::Primary),
        ];
        let rows = layout_rows(&lines, 1000, 800, style(), &cfg, char_measure);
        assert_eq!(rows.len(), 2);
        // settings is emitted first (bottom-most), identity stacks above it
        assert_eq!(rows[0].text, "settings");
        assert_eq!(rows[1].text, "identity");
        assert!(rows[0].bottom > rows[1].bottom);
    }

    #[test]
    fn wrapped_rows_keep_reading_order() {
        let cfg = RenderConfig::default();
        let lines = vec![line("alpha beta gamma delta epsilon zeta eta theta", LineColor::Primary)];
        // narrow canvas so the line wraps
        let rows = layout_rows(&lines, 300, 800, style(), &cfg, char_measure);
        assert!(rows.len() >= 2);
        // rows are emitted bottom-up; visually (by descending bottom) they
        // must read in original order
        let mut visual: Vec<&PlacedRow> = rows.iter().collect();
        visual.sort_by(|a, b| a.bottom.partial_cmp(&b.bottom).unwrap());
        let joined = visual.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join(" ");
        assert_eq!(joined, "alpha beta gamma delta epsilon zeta eta theta");
    }

    #[test]
    fn rows_step_by_one_line_height() {
        let cfg = RenderConfig::default();
        let m = overlay_metrics(1000, style(), &cfg);
        let lines = vec![
            line("a", LineColor::Accent),
            line("b", LineColor::Primary),
            line("c", LineColor::Primary),
        ];
        let rows = layout_rows(&lines, 1000, 800, style(), &cfg, char_measure);
        assert_eq!(rows.len(), 3);
        assert!((rows[0].bottom - (800.0 - m.padding)).abs() < 1e-3);
        assert!((rows[0].bottom - rows[1].bottom - m.line_height).abs() < 1e-3);
        assert!((rows[1].bottom - rows[2].bottom - m.line_height).abs() < 1e-3);
    }

    #[test]
    fn draw_overlay_without_lines_is_a_noop() {
        let cfg = RenderConfig::default();
        let mut canvas = RgbaImage::from_pixel(64, 64, image::Rgba([10, 20, 30, 255]));
        let before = canvas.clone();
        draw_overlay(&mut canvas, &[], style(), &cfg, &OverlayFont::fallback());
        assert_eq!(canvas.as_raw(), before.as_raw());
    }

    #[test]
    fn scrim_darkens_the_bottom_band() {
        let mut cfg = RenderConfig::default();
        cfg.legibility = Legibility::Scrim;
        let mut canvas = RgbaImage::from_pixel(200, 200, image::Rgba([200, 200, 200, 255]));
        let lines = vec![line("identity", LineColor::Accent)];
        draw_overlay(&mut canvas, &lines, style(), &cfg, &OverlayFont::fallback());
        // bottom edge darkened, top edge untouched
        assert!(canvas.get_pixel(100, 199).0[0] < 200);
        assert_eq!(canvas.get_pixel(100, 0).0[0], 200);
    }
}
