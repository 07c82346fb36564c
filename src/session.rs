//! Per-image session state and style propagation.
//!
//! Each loaded image owns one [`ImageSession`]: decoded source raster,
//! extracted caption lines, current style, and the last rendered output.
//! Sessions never share mutable state — style copy/paste moves values,
//! not references, so bulk-apply can never couple two images together.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{RenderConfig, StyleDefaults};
use crate::overlay::{OverlayFont, Placement, StyledLine, composite};

pub type SessionId = u64;

/// User-adjustable style: caption scale and fill opacity.
///
/// `Copy` on purpose — every propagation (copy style, apply to all) is a
/// value snapshot, never a live reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleParams {
    /// Slider-range scale, mapped to a font size relative to image width.
    pub font_scale: f32,
    /// Fill opacity in `[0, 1]`.
    pub opacity: f32,
}

impl StyleParams {
    pub fn from_defaults(defaults: &StyleDefaults) -> Self {
        Self { font_scale: defaults.font_scale, opacity: defaults.opacity }
    }

    /// Clamp into the configured slider range.
    pub fn clamped(self, limits: &StyleDefaults) -> Self {
        Self {
            font_scale: self.font_scale.clamp(limits.min_font_scale, limits.max_font_scale),
            opacity: self.opacity.clamp(0.0, 1.0),
        }
    }
}

/// A partial style edit, as produced by one slider tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleDelta {
    pub font_scale: Option<f32>,
    pub opacity: Option<f32>,
}

/// Everything a render needs besides the session itself. Borrowed by the
/// orchestration calls so the store never owns fonts or config.
pub struct RenderContext<'a> {
    pub render: &'a RenderConfig,
    pub limits: &'a StyleDefaults,
    pub font: &'a OverlayFont,
    pub placement: Placement,
}

/// The per-image unit of state.
pub struct ImageSession {
    pub id: SessionId,
    pub path: PathBuf,
    source: Option<RgbaImage>,
    lines: Vec<StyledLine>,
    pub style: StyleParams,
    output: Option<RgbaImage>,
}

impl ImageSession {
    /// The decoded source raster, once decoding has completed.
    pub fn source(&self) -> Option<&RgbaImage> {
        self.source.as_ref()
    }

    /// The extracted caption lines.
    pub fn lines(&self) -> &[StyledLine] {
        &self.lines
    }

    /// The last rendered output raster.
    pub fn output(&self) -> Option<&RgbaImage> {
        self.output.as_ref()
    }

    pub fn is_rendered(&self) -> bool {
        self.output.is_some()
    }
}

/// Ordered collection of sessions. Collection order is export order.
pub struct SessionStore {
    sessions: Vec<ImageSession>,
    next_id: SessionId,
    default_style: StyleParams,
}

impl SessionStore {
    pub fn new(default_style: StyleParams) -> Self {
        Self { sessions: Vec::new(), next_id: 0, default_style }
    }

    /// Register a new session before its decode/extract pipeline completes.
    ///
    /// The session is live for style edits immediately; the first render
    /// happens when [`complete`](Self::complete) attaches the decoded data.
    pub fn create(&mut self, path: &Path) -> SessionId {
        let id = self.next_id;
        self.next_id += 1;
        self.sessions.push(ImageSession {
            id,
            path: path.to_path_buf(),
            source: None,
            lines: Vec::new(),
            style: self.default_style,
            output: None,
        });
        id
    }

    /// Attach the decoded raster and extracted lines, then render.
    ///
    /// Renders with the session's *current* style: an edit that landed
    /// while decode was in flight wins over the default, never the other
    /// way around.
    pub fn complete(
        &mut self,
        id: SessionId,
        source: RgbaImage,
        lines: Vec<StyledLine>,
        ctx: &RenderContext<'_>,
    ) {
        let Some(session) = self.session_mut(id) else {
            return;
        };
        session.source = Some(source);
        session.lines = lines;
        self.render(id, ctx);
    }

    /// Mark the session's pipeline as failed. Terminal for this session —
    /// it stays unrendered until the user resubmits the file.
    pub fn fail(&mut self, id: SessionId) {
        if let Some(session) = self.session_mut(id) {
            session.source = None;
            session.output = None;
            log::debug!("Session for {} left unrendered", session.path.display());
        }
    }

    /// Apply a partial style edit and re-render. Never re-extracts or
    /// re-formats the caption lines.
    pub fn update_style(&mut self, id: SessionId, delta: StyleDelta, ctx: &RenderContext<'_>) {
        let Some(session) = self.session_mut(id) else {
            return;
        };
        if let Some(font_scale) = delta.font_scale {
            session.style.font_scale = font_scale;
        }
        if let Some(opacity) = delta.opacity {
            session.style.opacity = opacity;
        }
        session.style = session.style.clamped(ctx.limits);
        self.render(id, ctx);
    }

    /// Snapshot a session's style by value.
    pub fn copy_style(&self, id: SessionId) -> Option<StyleParams> {
        self.session(id).map(|s| s.style)
    }

    /// Replace a session's style with a copy of the given value, re-render.
    pub fn apply_style(&mut self, id: SessionId, style: StyleParams, ctx: &RenderContext<'_>) {
        let Some(session) = self.session_mut(id) else {
            return;
        };
        session.style = style.clamped(ctx.limits);
        self.render(id, ctx);
    }

    /// Apply the same style value to every session. Each gets an
    /// independent copy — later edits to one never leak into another.
    pub fn apply_style_to_all(&mut self, style: StyleParams, ctx: &RenderContext<'_>) {
        let ids: Vec<SessionId> = self.sessions.iter().map(|s| s.id).collect();
        for id in ids {
            self.apply_style(id, style, ctx);
        }
    }

    /// Remove a session from the collection (e.g. after a single-shot
    /// export), returning it.
    pub fn remove(&mut self, id: SessionId) -> Option<ImageSession> {
        let index = self.sessions.iter().position(|s| s.id == id)?;
        Some(self.sessions.remove(index))
    }

    pub fn session(&self, id: SessionId) -> Option<&ImageSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    fn session_mut(&mut self, id: SessionId) -> Option<&mut ImageSession> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// All sessions in collection (export) order.
    pub fn sessions(&self) -> &[ImageSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Re-render one session from scratch. Skipped silently while the
    /// session has no decoded source (pipeline still in flight or failed).
    fn render(&mut self, id: SessionId, ctx: &RenderContext<'_>) {
        let Some(session) = self.session_mut(id) else {
            return;
        };
        let Some(source) = session.source.as_ref() else {
            log::debug!("Session {} has no decoded image yet, skipping render", session.id);
            return;
        };
        let style = session.style.clamped(ctx.limits);
        session.output = Some(composite(
            source,
            ctx.placement,
            &session.lines,
            style,
            ctx.render,
            ctx.font,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::overlay::{LineColor, StyledLine};

    fn test_source() -> RgbaImage {
        RgbaImage::from_pixel(32, 32, image::Rgba([128, 128, 128, 255]))
    }

    fn test_lines() -> Vec<StyledLine> {
        vec![StyledLine { text: "Camera X".into(), color: LineColor::Accent }]
    }

    struct Fixture {
        config: Config,
        font: OverlayFont,
    }

    impl Fixture {
        fn new() -> Self {
            Self { config: Config::default(), font: OverlayFont::fallback() }
        }

        fn ctx(&self) -> RenderContext<'_> {
            RenderContext {
                render: &self.config.render,
                limits: &self.config.style,
                font: &self.font,
                placement: Placement::FullBleed,
            }
        }
    }

    #[test]
    fn complete_renders_with_default_style() {
        let fx = Fixture::new();
        let mut store = SessionStore::new(StyleParams::from_defaults(&fx.config.style));
        let id = store.create(Path::new("a.jpg"));
        assert!(!store.session(id).unwrap().is_rendered());

        store.complete(id, test_source(), test_lines(), &fx.ctx());
        assert!(store.session(id).unwrap().is_rendered());
    }

    #[test]
    fn style_edit_before_completion_wins() {
        let fx = Fixture::new();
        let mut store = SessionStore::new(StyleParams::from_defaults(&fx.config.style));
        let id = store.create(Path::new("a.jpg"));

        // slider moved while decode is still in flight
        store.update_style(
            id,
            StyleDelta { font_scale: Some(80.0), opacity: Some(0.5) },
            &fx.ctx(),
        );
        assert!(!store.session(id).unwrap().is_rendered());

        store.complete(id, test_source(), test_lines(), &fx.ctx());
        let session = store.session(id).unwrap();
        assert!(session.is_rendered());
        assert_eq!(session.style, StyleParams { font_scale: 80.0, opacity: 0.5 });
    }

    #[test]
    fn update_style_clamps_to_limits() {
        let fx = Fixture::new();
        let mut store = SessionStore::new(StyleParams::from_defaults(&fx.config.style));
        let id = store.create(Path::new("a.jpg"));

        store.update_style(
            id,
            StyleDelta { font_scale: Some(500.0), opacity: Some(2.0) },
            &fx.ctx(),
        );
        let style = store.session(id).unwrap().style;
        assert_eq!(style.font_scale, fx.config.style.max_font_scale);
        assert_eq!(style.opacity, 1.0);
    }

    #[test]
    fn update_style_keeps_extracted_lines() {
        let fx = Fixture::new();
        let mut store = SessionStore::new(StyleParams::from_defaults(&fx.config.style));
        let id = store.create(Path::new("a.jpg"));
        store.complete(id, test_source(), test_lines(), &fx.ctx());

        store.update_style(id, StyleDelta { font_scale: Some(30.0), ..Default::default() }, &fx.ctx());
        assert_eq!(store.session(id).unwrap().lines(), test_lines().as_slice());
    }

    #[test]
    fn copy_style_is_a_snapshot() {
        let fx = Fixture::new();
        let mut store = SessionStore::new(StyleParams::from_defaults(&fx.config.style));
        let id = store.create(Path::new("a.jpg"));

        let copied = store.copy_style(id).unwrap();
        store.update_style(id, StyleDelta { opacity: Some(0.1), ..Default::default() }, &fx.ctx());
        // the snapshot is unaffected by the later edit
        assert_eq!(copied.opacity, fx.config.style.opacity);
    }

    #[test]
    fn apply_to_all_leaves_sessions_independent() {
        let fx = Fixture::new();
        let mut store = SessionStore::new(StyleParams::from_defaults(&fx.config.style));
        let a = store.create(Path::new("a.jpg"));
        let b = store.create(Path::new("b.jpg"));
        let c = store.create(Path::new("c.jpg"));

        let shared = StyleParams { font_scale: 42.0, opacity: 0.8 };
        store.apply_style_to_all(shared, &fx.ctx());

        // an independent edit on one session must not leak into the others
        store.update_style(a, StyleDelta { font_scale: Some(99.0), ..Default::default() }, &fx.ctx());
        assert_eq!(store.session(a).unwrap().style.font_scale, 99.0);
        assert_eq!(store.session(b).unwrap().style, shared);
        assert_eq!(store.session(c).unwrap().style, shared);
    }

    #[test]
    fn failed_session_stays_unrendered() {
        let fx = Fixture::new();
        let mut store = SessionStore::new(StyleParams::from_defaults(&fx.config.style));
        let id = store.create(Path::new("broken.jpg"));
        store.fail(id);

        // style edits on a failed session must not panic or render
        store.update_style(id, StyleDelta { opacity: Some(0.3), ..Default::default() }, &fx.ctx());
        assert!(!store.session(id).unwrap().is_rendered());
    }

    #[test]
    fn remove_drops_the_session() {
        let mut store = SessionStore::new(StyleParams { font_scale: 55.0, opacity: 0.95 });
        let a = store.create(Path::new("a.jpg"));
        let b = store.create(Path::new("b.jpg"));

        let removed = store.remove(a).unwrap();
        assert_eq!(removed.id, a);
        assert_eq!(store.len(), 1);
        assert!(store.session(b).is_some());
        assert!(store.session(a).is_none());
    }
}
