//! # exif-label
//!
//! Overlay camera EXIF metadata onto JPEG photos — model, lens, exposure
//! settings, capture date, and GPS rendered as a styled caption anchored to
//! the bottom of the image.
//!
//! ## Quick Start
//!
//! The simplest way to use the library is through the pipeline and session
//! modules, which handle the full decode → extract → format → render →
//! export flow:
//!
//! ```rust,no_run
//! use exif_label::config::Config;
//! use exif_label::overlay::{OverlayFont, Placement};
//! use exif_label::pipeline::{collect_images, export_sessions, process_into_store};
//! use exif_label::session::{RenderContext, SessionStore, StyleParams};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     let font = OverlayFont::resolve(
//!         config.render.font_path.as_deref(),
//!         config.render.font_family.as_deref(),
//!     )?;
//!     let ctx = RenderContext {
//!         render: &config.render,
//!         limits: &config.style,
//!         font: &font,
//!         placement: Placement::FullBleed,
//!     };
//!
//!     let images = collect_images(&[PathBuf::from("./photos")]);
//!     let mut store = SessionStore::new(StyleParams::from_defaults(&config.style));
//!
//!     for path in &images {
//!         let id = store.create(path);
//!         process_into_store(&mut store, id, path, &ctx).await;
//!     }
//!
//!     export_sessions(&store, &config.export).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The rendering stages are plain functions and can be called individually:
//!
//! ```rust,no_run
//! use exif_label::exif::read_tags;
//! use exif_label::overlay::{OverlayFont, Placement, composite, format_lines};
//! use exif_label::session::StyleParams;
//! use exif_label::config::Config;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let path = Path::new("photo.jpg");
//!     let config = Config::default();
//!
//!     // 1. Extract and format the caption
//!     let tags = read_tags(path);
//!     let lines = format_lines(&tags);
//!     println!("Caption: {:?}", lines);
//!
//!     // 2. Render onto a letterboxed tile
//!     let source = image::open(path)?.to_rgba8();
//!     let font = OverlayFont::resolve(None, None)?;
//!     let style = StyleParams { font_scale: 55.0, opacity: 0.95 };
//!     let tile = composite(
//!         &source,
//!         Placement::Letterbox { width: 1080, height: 1080 },
//!         &lines,
//!         style,
//!         &config.render,
//!         &font,
//!     );
//!     tile.save("tile.png")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Caption Rules
//!
//! | Line | Color | Content |
//! |------|-------|---------|
//! | 1 | Accent | Camera model, or `Unknown camera`; superseded by the lens name when it repeats the model |
//! | 2 | Primary | Lens model (only when not merged into line 1) |
//! | 3 | Primary | Present settings: `50mm · f/2.8 · 1/250s · ISO 100` |
//! | 4 | Primary | Capture date and/or GPS: `2023-04-01 · 48.1375°N · 11.5755°E` |
//!
//! Lines render bottom-to-top, so the identity line sits nearest the bottom
//! edge. Absent categories contribute no line at all.
//!
//! ## Modules
//!
//! - [`exif`] — tag extraction boundary (EXIF directory → raw tag map)
//! - [`overlay`] — formatting, layout, and compositing
//! - [`session`] — per-image state and style copy/paste/bulk-apply
//! - [`pipeline`] — collection, async decode/extract, staggered export
//! - [`config`] — configuration types and loading/saving

pub mod config;
pub mod exif;
pub mod overlay;
pub mod pipeline;
pub mod session;
