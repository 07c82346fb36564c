//! Metadata-to-overlay rendering.
//!
//! Three stages, leaves first:
//!
//! - [`format_lines`] — normalize a raw tag map into ordered, styled text
//!   lines (pure, no I/O)
//! - [`layout_rows`]/[`draw_overlay`] — wrap and stack the lines bottom-up
//!   against the canvas, then rasterize them
//! - [`composite`] — place the source image (full-bleed or letterboxed)
//!   and draw the caption on top
//!
//! Every stage recomputes from its inputs; identical inputs always produce
//! identical pixels.

mod compose;
mod font;
mod format;
mod layout;

pub use compose::{Placement, composite};
pub use font::OverlayFont;
pub use format::{FormatError, LineColor, StyledLine, format_json, format_lines};
pub use layout::{
    Legibility, OverlayMetrics, PlacedRow, draw_overlay, layout_rows, overlay_metrics, wrap_line,
};
