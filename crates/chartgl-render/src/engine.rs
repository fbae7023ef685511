//! The render engine: frame state machine, shape dispatch and buffer cache.
//!
//! A [`RenderEngine`] owns one backend and drives it through
//! `Uninitialized -> Ready -> Rendering -> Ready -> ... -> Disposed`.
//! Each call to [`RenderEngine::render`] runs one complete frame and leaves
//! the engine `Ready` again, whether the frame succeeded or not. A lost
//! backend context is the one exception: the engine drops every cached
//! handle without releasing it and falls back to `Uninitialized`.

use std::collections::HashSet;

use chartgl_core::{
    clip_box, AxisKind, GraphicId, LightingUniforms, Mat4, ProjectionSnapshot, Scene, Shape,
    ShapeKind, Style, Vec2, Vec3,
};
use image::RgbaImage;

use crate::axes::{self, AxesFrame};
use crate::backend::{
    Batch, FrameSetup, Geometry, HAlign, RenderBackend, TextLabel, VAlign, ViewUniforms,
    WorldLabel,
};
use crate::cache::{BufferCache, CacheEntry};
use crate::error::{RenderError, RenderResult};
use crate::legend;
use crate::tessellate::{tessellate, TessellationContext};

/// Lifecycle state of a [`RenderEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No backend context; `initialize` must be called.
    Uninitialized,
    /// Ready to render a frame.
    Ready,
    /// A frame is in progress.
    Rendering,
    /// Resources released; the engine cannot be used again.
    Disposed,
}

/// Size and pixel density of a requested frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRequest {
    pub width: u32,
    pub height: u32,
    /// Device pixels per logical pixel.
    pub dpi_scale: f32,
}

impl FrameRequest {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            dpi_scale: 1.0,
        }
    }

    #[must_use]
    pub fn with_dpi_scale(mut self, dpi_scale: f32) -> Self {
        self.dpi_scale = dpi_scale;
        self
    }

    #[allow(clippy::cast_precision_loss)]
    fn viewport(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// Why a graphic was left out of a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The backend has no draw routine for the shape kind.
    Unsupported,
    /// The shape's arrays are inconsistent.
    Invalid(String),
    /// The backend failed to draw it.
    Backend(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedGraphic {
    pub id: GraphicId,
    pub kind: ShapeKind,
    pub reason: SkipReason,
}

/// What happened to the legend overlay.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LegendStatus {
    #[default]
    None,
    Hidden,
    Drawn,
    /// The scheme could not be laid out; the rest of the frame was drawn.
    Skipped(String),
}

/// Outcome of one frame.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Frame number, starting at 1.
    pub frame: u64,
    pub drawn: Vec<GraphicId>,
    pub skipped: Vec<SkippedGraphic>,
    /// Cached graphics uploaded this frame.
    pub uploads: usize,
    /// Cached graphics drawn from an earlier upload.
    pub cache_hits: usize,
    /// Cached uploads released because their graphic is gone.
    pub released: usize,
    /// Text to draw on top of the frame, in pixels.
    pub labels: Vec<TextLabel>,
    pub legend: LegendStatus,
    pub screenshot: Option<RgbaImage>,
}

impl FrameReport {
    fn skip(&mut self, id: GraphicId, kind: ShapeKind, reason: SkipReason) {
        self.skipped.push(SkippedGraphic { id, kind, reason });
    }
}

/// Drives a [`RenderBackend`] through frames of a [`Scene`].
pub struct RenderEngine<B: RenderBackend> {
    backend: B,
    state: EngineState,
    cache: BufferCache,
    size: (u32, u32),
    frame: u64,
    screenshot_requested: bool,
    always_update_buffers: bool,
}

impl<B: RenderBackend> RenderEngine<B> {
    /// Wraps a backend. Call [`initialize`](Self::initialize) before rendering.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: EngineState::Uninitialized,
            cache: BufferCache::new(),
            size: (0, 0),
            frame: 0,
            screenshot_requested: false,
            always_update_buffers: false,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Number of graphics with cached uploads.
    pub fn cached_graphics(&self) -> usize {
        self.cache.len()
    }

    /// Frames rendered so far, including failed ones.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Creates the backend context and enters `Ready`.
    pub fn initialize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if self.state != EngineState::Uninitialized {
            return Err(RenderError::InvalidState {
                expected: EngineState::Uninitialized,
                actual: self.state,
            });
        }
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        self.backend.init(width, height)?;
        self.size = (width, height);
        self.state = EngineState::Ready;
        log::info!("{} backend ready at {width}x{height}", self.backend.name());
        Ok(())
    }

    /// Captures the next frame into [`FrameReport::screenshot`].
    pub fn request_screenshot(&mut self) {
        self.screenshot_requested = true;
    }

    pub fn screenshot_requested(&self) -> bool {
        self.screenshot_requested
    }

    /// Re-uploads every cached graphic on the next frame only.
    pub fn set_always_update_buffers(&mut self) {
        self.always_update_buffers = true;
    }

    pub fn always_update_buffers(&self) -> bool {
        self.always_update_buffers
    }

    /// Drops the cached upload of a removed graphic.
    pub fn release_graphic(&mut self, id: GraphicId) -> bool {
        match self.cache.invalidate(id) {
            Some(handle) => {
                self.backend.release(handle);
                true
            }
            None => false,
        }
    }

    /// Releases every cached upload and the backend itself.
    pub fn dispose(&mut self) {
        if self.state == EngineState::Disposed {
            return;
        }
        let handles = self.cache.clear();
        let released = handles.len();
        for handle in handles {
            self.backend.release(handle);
        }
        self.backend.dispose();
        self.state = EngineState::Disposed;
        log::info!("render engine disposed, released {released} cached uploads");
    }

    /// Renders one frame.
    ///
    /// Graphics that cannot be drawn are skipped and listed in the report.
    /// Errors are returned only for failures that affect the whole frame.
    pub fn render(&mut self, scene: &Scene, request: FrameRequest) -> RenderResult<FrameReport> {
        if self.state != EngineState::Ready {
            return Err(RenderError::InvalidState {
                expected: EngineState::Ready,
                actual: self.state,
            });
        }
        if request.width == 0 || request.height == 0 {
            return Err(RenderError::InvalidViewport {
                width: request.width,
                height: request.height,
            });
        }

        self.state = EngineState::Rendering;
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };
        let result = self.render_frame(scene, request, &mut report);
        self.always_update_buffers = false;

        match result {
            Ok(()) => {
                self.state = EngineState::Ready;
                log::debug!(
                    "frame {}: {} drawn, {} skipped, {} uploads, {} cache hits",
                    report.frame,
                    report.drawn.len(),
                    report.skipped.len(),
                    report.uploads,
                    report.cache_hits
                );
                Ok(report)
            }
            Err(e) if e.is_context_lost() => {
                let dropped = self.cache.discard_all();
                self.state = EngineState::Uninitialized;
                log::warn!(
                    "{}: {e}; discarded {dropped} cached uploads",
                    self.backend.name()
                );
                Err(e)
            }
            Err(e) => {
                self.state = EngineState::Ready;
                log::warn!("frame {} failed: {e}", report.frame);
                Err(e)
            }
        }
    }

    fn render_frame(
        &mut self,
        scene: &Scene,
        request: FrameRequest,
        report: &mut FrameReport,
    ) -> RenderResult<()> {
        let opts = scene.options();
        let viewport = request.viewport();
        let dpi = request.dpi_scale * opts.dpi_scale;

        if (request.width, request.height) != self.size {
            self.backend.resize(request.width, request.height)?;
            self.size = (request.width, request.height);
        }

        // 1. clear and configure
        self.backend.begin_frame(&FrameSetup {
            clear_color: opts.background_color,
            antialias: opts.antialias,
            blend: opts.blend,
            viewport,
            dpi_scale: dpi,
        })?;

        // 2-3. camera and the snapshot used for screen-space placement
        let snapshot = frame_snapshot(scene, viewport);
        self.backend.set_view(&ViewUniforms {
            view: snapshot.view,
            projection: snapshot.projection,
            eye: snapshot.view.inverse().w_axis.truncate(),
            lighting: LightingUniforms::from(&opts.lighting),
        })?;

        // Decorations only make sense for a flat projection.
        let flat = scene.projection().is_flat();
        let frame = AxesFrame::new(scene, &snapshot);

        // 4. base and grid
        if flat && (opts.draw_base || opts.draw_grid) {
            self.backend.draw(&single(axes::backdrop(scene, &frame, dpi)))?;
        }

        // 5. clip to the axes extent
        if opts.clip_plane {
            let planes = clip_box(scene.transform(), &scene.axes_extent());
            self.backend.set_clip_planes(&planes)?;
        }

        // 6. graphics
        let world_labels = self.draw_graphics(scene, viewport, dpi, report)?;
        if opts.clip_plane {
            self.backend.set_clip_planes(&[])?;
        }
        for label in world_labels {
            if let Some(position) = snapshot.to_screen(label.position) {
                report.labels.push(TextLabel {
                    text: label.text,
                    position,
                    h_align: HAlign::Left,
                    v_align: VAlign::Bottom,
                    angle: 0.0,
                    font_size: label.font_size * dpi,
                    color: label.color,
                });
            }
        }

        // 7. axes, then the bounding box
        if flat && opts.draw_axes {
            let (batch, labels) = axes::axes(scene, &frame, &snapshot, dpi);
            self.backend.draw(&single(batch))?;
            report.labels.extend(labels);
        }
        if flat && opts.draw_bounding_box {
            self.backend
                .draw(&single(axes::bounding_box(&frame, opts.box_color, dpi)))?;
        }

        // 8. legend
        report.legend = self.draw_legend(scene, viewport, dpi, &mut report.labels)?;

        // 9. title
        report.labels.extend(axes::title(scene, viewport, dpi));

        self.backend.draw_labels(&report.labels)?;
        self.backend.end_frame()?;

        // 10. one-shot capture
        if self.screenshot_requested {
            report.screenshot = Some(self.backend.capture()?);
            self.screenshot_requested = false;
        }
        Ok(())
    }

    /// Dispatches every visible leaf, then drops cache entries of removed graphics.
    fn draw_graphics(
        &mut self,
        scene: &Scene,
        viewport: Vec2,
        dpi: f32,
        report: &mut FrameReport,
    ) -> RenderResult<Vec<WorldLabel>> {
        let ctx = TessellationContext::new(
            scene.transform(),
            scene.projection(),
            scene.camera(),
            viewport,
            dpi,
        );
        let mut labels = Vec::new();

        for graphic in scene.graphics().iter_leaves() {
            let Some((shape, style)) = graphic.leaf() else {
                continue;
            };
            let (id, kind) = (graphic.id(), shape.kind());
            if !self.backend.supports(kind) {
                log::warn!("{}: no draw routine for {kind}, skipping graphic {id}", self.backend.name());
                report.skip(id, kind, SkipReason::Unsupported);
                continue;
            }
            if let Err(e) = shape.validate() {
                log::warn!("skipping invalid graphic {id}: {e}");
                report.skip(id, kind, SkipReason::Invalid(e.to_string()));
                continue;
            }
            match self.draw_leaf(id, graphic.version(), shape, style, &ctx, report) {
                Ok(mut extra) => {
                    report.drawn.push(id);
                    labels.append(&mut extra);
                }
                Err(e) if e.is_context_lost() => return Err(e),
                Err(e) => {
                    log::warn!("graphic {id} failed to draw: {e}");
                    report.skip(id, kind, SkipReason::Backend(e.to_string()));
                }
            }
        }

        let live: HashSet<GraphicId> = scene.graphics().leaf_ids().into_iter().collect();
        for handle in self.cache.sweep(&live) {
            self.backend.release(handle);
            report.released += 1;
        }
        Ok(labels)
    }

    fn draw_leaf(
        &mut self,
        id: GraphicId,
        version: u64,
        shape: &Shape,
        style: &Style,
        ctx: &TessellationContext,
        report: &mut FrameReport,
    ) -> RenderResult<Vec<WorldLabel>> {
        if !shape.kind().is_cached() {
            if let Some(stale) = self.cache.invalidate(id) {
                self.backend.release(stale);
            }
            let geometry = tessellate(shape, style, ctx);
            if !geometry.batches.is_empty() || !geometry.textures.is_empty() {
                self.backend.draw(&geometry)?;
            }
            return Ok(geometry.labels);
        }

        if !self.always_update_buffers {
            let hit = self
                .cache
                .lookup(id, version, ctx.projection, ctx.dpi_scale)
                .and_then(|entry| Some((entry.handle, entry.model_matrix(&ctx.transform)?)));
            if let Some((handle, model)) = hit {
                self.backend.draw_cached(handle, model)?;
                report.cache_hits += 1;
                return Ok(Vec::new());
            }
        }

        let geometry = tessellate(shape, style, ctx);
        if geometry.is_empty() {
            if let Some(stale) = self.cache.invalidate(id) {
                self.backend.release(stale);
            }
            return Ok(Vec::new());
        }
        let handle = self.backend.upload(&geometry)?;
        let entry = CacheEntry {
            handle,
            version,
            transform: ctx.transform,
            projection: ctx.projection,
            dpi_scale: ctx.dpi_scale,
        };
        if let Some(old) = self.cache.insert(id, entry) {
            self.backend.release(old);
        }
        report.uploads += 1;
        self.backend.draw_cached(handle, Mat4::IDENTITY)?;
        Ok(geometry.labels)
    }

    fn draw_legend(
        &mut self,
        scene: &Scene,
        viewport: Vec2,
        dpi: f32,
        labels: &mut Vec<TextLabel>,
    ) -> RenderResult<LegendStatus> {
        let Some(spec) = scene.legend() else {
            return Ok(LegendStatus::None);
        };
        if !spec.options.visible {
            return Ok(LegendStatus::Hidden);
        }
        match legend::layout(&spec.scheme, &spec.options, viewport, dpi) {
            Ok(geometry) => {
                let (fill, lines) = geometry.overlay(&spec.options);
                if !fill.is_empty() {
                    self.backend.draw_overlay(&fill)?;
                }
                if !lines.is_empty() {
                    self.backend.draw_overlay(&lines)?;
                }
                labels.extend(geometry.labels);
                Ok(LegendStatus::Drawn)
            }
            Err(e) => {
                log::warn!("legend skipped: {e}");
                Ok(LegendStatus::Skipped(e.to_string()))
            }
        }
    }
}

fn single(batch: Batch) -> Geometry {
    let mut geometry = Geometry::default();
    geometry.push(batch);
    geometry
}

/// View and projection for the frame, mirrored along inverted axes.
fn frame_snapshot(scene: &Scene, viewport: Vec2) -> ProjectionSnapshot {
    let camera = scene.camera();
    let sign = |kind| if scene.axis(kind).is_inverse() { -1.0 } else { 1.0 };
    let mirror = Mat4::from_scale(Vec3::new(
        sign(AxisKind::X),
        sign(AxisKind::Y),
        sign(AxisKind::Z),
    ));
    ProjectionSnapshot {
        view: camera.view_matrix() * mirror,
        projection: camera.projection_matrix(viewport.x / viewport.y),
        viewport,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{Command, RecordingBackend};
    use chartgl_core::{ColorBreak, DVec3, Extent3D, Graphic, LegendOptions, LegendScheme, Vec4};

    fn mesh() -> Graphic {
        Graphic::new(
            Shape::Mesh {
                vertices: vec![
                    DVec3::new(0.0, 0.0, 0.0),
                    DVec3::new(10.0, 0.0, 0.0),
                    DVec3::new(0.0, 10.0, 5.0),
                ],
                triangles: vec![[0, 1, 2]],
                values: None,
            },
            ColorBreak::polygon(Vec4::ONE),
        )
    }

    fn ready() -> RenderEngine<RecordingBackend> {
        let mut engine = RenderEngine::new(RecordingBackend::new());
        engine.initialize(320, 240).unwrap();
        engine
    }

    fn request() -> FrameRequest {
        FrameRequest::new(320, 240)
    }

    #[test]
    fn test_lifecycle() {
        let mut engine = RenderEngine::new(RecordingBackend::new());
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(matches!(
            engine.render(&Scene::new(), request()),
            Err(RenderError::InvalidState { .. })
        ));
        assert!(matches!(
            engine.initialize(0, 10),
            Err(RenderError::InvalidViewport { .. })
        ));
        engine.initialize(320, 240).unwrap();
        assert_eq!(engine.state(), EngineState::Ready);
        assert!(engine.initialize(320, 240).is_err());

        engine.render(&Scene::new(), request()).unwrap();
        assert_eq!(engine.state(), EngineState::Ready);

        engine.dispose();
        assert_eq!(engine.state(), EngineState::Disposed);
        assert!(engine.render(&Scene::new(), request()).is_err());
        assert!(engine.initialize(320, 240).is_err());
    }

    #[test]
    fn test_frame_order() {
        let mut engine = ready();
        let mut scene = Scene::new();
        scene.add_graphic(mesh());
        scene.options_mut().clip_plane = true;
        engine.render(&scene, request()).unwrap();
        let cmds = engine.backend().commands();
        assert!(matches!(cmds[0], Command::BeginFrame(_)));
        assert!(matches!(cmds[1], Command::SetView { .. }));
        let clip_on = cmds.iter().position(|c| *c == Command::SetClipPlanes(6)).unwrap();
        let upload = cmds.iter().position(|c| matches!(c, Command::Upload { .. })).unwrap();
        let clip_off = cmds.iter().position(|c| *c == Command::SetClipPlanes(0)).unwrap();
        assert!(clip_on < upload && upload < clip_off);
        assert_eq!(cmds.last(), Some(&Command::EndFrame));
    }

    #[test]
    fn test_cached_mesh_uploads_once() {
        let mut engine = ready();
        let mut scene = Scene::new();
        scene.add_graphic(mesh());
        let first = engine.render(&scene, request()).unwrap();
        let second = engine.render(&scene, request()).unwrap();
        assert_eq!((first.uploads, first.cache_hits), (1, 0));
        assert_eq!((second.uploads, second.cache_hits), (0, 1));
        assert_eq!(engine.backend().stats().uploads, 1);
    }

    #[test]
    fn test_always_update_is_one_shot() {
        let mut engine = ready();
        let mut scene = Scene::new();
        scene.add_graphic(mesh());
        engine.render(&scene, request()).unwrap();
        engine.set_always_update_buffers();
        let forced = engine.render(&scene, request()).unwrap();
        assert_eq!(forced.uploads, 1);
        assert!(!engine.always_update_buffers());
        let after = engine.render(&scene, request()).unwrap();
        assert_eq!(after.uploads, 0);
        // the replaced upload was released
        assert_eq!(engine.backend().live_handles(), 1);
    }

    #[test]
    fn test_version_change_reuploads() {
        let mut engine = ready();
        let mut scene = Scene::new();
        let id = scene.add_graphic(mesh());
        engine.render(&scene, request()).unwrap();
        scene
            .update_graphic(id, |g| g.update_style(|s| *s = ColorBreak::polygon(Vec4::X).into()))
            .unwrap();
        assert_eq!(engine.render(&scene, request()).unwrap().uploads, 1);
    }

    #[test]
    fn test_zoom_reuses_upload() {
        let mut engine = ready();
        let mut scene = Scene::new();
        scene.add_graphic(mesh());
        engine.render(&scene, request()).unwrap();
        let zoomed = scene.draw_extent().extend(1.0, 1.0, 0.0);
        scene.set_draw_extent(zoomed).unwrap();
        let report = engine.render(&scene, request()).unwrap();
        assert_eq!((report.uploads, report.cache_hits), (0, 1));
    }

    #[test]
    fn test_unsupported_and_invalid_are_skipped() {
        let mut engine = RenderEngine::new(RecordingBackend::without([ShapeKind::Mesh]));
        engine.initialize(320, 240).unwrap();
        let mut scene = Scene::new();
        let unsupported = scene.add_graphic(mesh());
        let broken = scene.add_graphic(Graphic::new(
            Shape::Points {
                points: vec![DVec3::ZERO, DVec3::ONE],
                values: Some(vec![1.0]),
            },
            ColorBreak::point(Vec4::ONE, 4.0),
        ));
        let fine = scene.add_graphic(Graphic::new(
            Shape::Cube {
                center: DVec3::splat(5.0),
                size: DVec3::ONE,
            },
            ColorBreak::polygon(Vec4::ONE),
        ));
        let report = engine.render(&scene, request()).unwrap();
        assert_eq!(report.drawn, vec![fine]);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].id, unsupported);
        assert_eq!(report.skipped[0].reason, SkipReason::Unsupported);
        assert_eq!(report.skipped[1].id, broken);
        assert!(matches!(report.skipped[1].reason, SkipReason::Invalid(_)));
    }

    #[test]
    fn test_context_loss_requires_reinit() {
        let mut engine = ready();
        let mut scene = Scene::new();
        scene.add_graphic(mesh());
        engine.render(&scene, request()).unwrap();
        assert_eq!(engine.cached_graphics(), 1);

        engine.backend_mut().lose_context();
        let err = engine.render(&scene, request()).unwrap_err();
        assert!(err.is_context_lost());
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert_eq!(engine.cached_graphics(), 0);
        assert!(engine.render(&scene, request()).is_err());

        engine.initialize(320, 240).unwrap();
        let report = engine.render(&scene, request()).unwrap();
        assert_eq!(report.uploads, 1);
    }

    #[test]
    fn test_removed_graphic_is_released() {
        let mut engine = ready();
        let mut scene = Scene::new();
        let id = scene.add_graphic(mesh());
        engine.render(&scene, request()).unwrap();
        scene.remove_graphic(id).unwrap();
        let report = engine.render(&scene, request()).unwrap();
        assert_eq!(report.released, 1);
        assert_eq!(engine.backend().live_handles(), 0);
    }

    #[test]
    fn test_dispose_releases_cache() {
        let mut engine = ready();
        let mut scene = Scene::new();
        scene.add_graphic(mesh());
        engine.render(&scene, request()).unwrap();
        engine.dispose();
        assert_eq!(engine.backend().live_handles(), 0);
        assert_eq!(engine.cached_graphics(), 0);
    }

    #[test]
    fn test_screenshot_is_one_shot() {
        let mut engine = ready();
        engine.request_screenshot();
        let first = engine.render(&Scene::new(), request()).unwrap();
        assert_eq!(first.screenshot.unwrap().dimensions(), (320, 240));
        assert!(!engine.screenshot_requested());
        assert!(engine.render(&Scene::new(), request()).unwrap().screenshot.is_none());
    }

    #[test]
    fn test_malformed_legend_does_not_abort_frame() {
        let mut engine = ready();
        let mut scene = Scene::new();
        let id = scene.add_graphic(mesh());
        scene.set_legend(LegendScheme::default(), LegendOptions::default());
        let report = engine.render(&scene, request()).unwrap();
        assert!(matches!(report.legend, LegendStatus::Skipped(_)));
        assert_eq!(report.drawn, vec![id]);
        assert_eq!(engine.backend().stats().overlays, 0);
    }

    #[test]
    fn test_legend_and_title_labels() {
        let mut engine = ready();
        let mut scene = Scene::new();
        scene.set_title("Depth");
        let scheme =
            LegendScheme::graduated(chartgl_core::ShapeType::Polygon, &[0.0, 1.0, 2.0], &[Vec4::ONE; 2])
                .unwrap();
        scene.set_legend(scheme, LegendOptions::default());
        let report = engine.render(&scene, request()).unwrap();
        assert_eq!(report.legend, LegendStatus::Drawn);
        assert_eq!(engine.backend().stats().overlays, 2);
        assert!(report.labels.iter().any(|l| l.text == "Depth"));
        assert_eq!(engine.backend().last_labels().len(), report.labels.len());
    }

    #[test]
    fn test_spherical_projection_skips_decorations() {
        let mut engine = ready();
        let mut scene = Scene::new();
        scene.add_graphic(Graphic::new(
            Shape::Points {
                points: vec![DVec3::new(0.0, 0.0, 0.0), DVec3::new(90.0, 45.0, 0.0)],
                values: None,
            },
            ColorBreak::point(Vec4::ONE, 4.0),
        ));
        scene.set_projection(chartgl_core::Projection::Spherical { radius: 1.0 });
        let report = engine.render(&scene, request()).unwrap();
        assert!(report.labels.is_empty());
        // only the points were drawn immediately
        assert_eq!(engine.backend().stats().immediate_draws, 1);
    }

    #[test]
    fn test_inverted_axis_mirrors_view() {
        let mut scene = Scene::new();
        let normal = frame_snapshot(&scene, Vec2::new(320.0, 240.0));
        scene.axis_mut(AxisKind::X).set_inverse(true);
        let mirrored = frame_snapshot(&scene, Vec2::new(320.0, 240.0));
        let p = Vec3::new(1.0, 0.0, 0.0);
        let q = Vec3::new(-1.0, 0.0, 0.0);
        assert!((normal.view.transform_point3(p) - mirrored.view.transform_point3(q)).length() < 1e-6);
    }

    #[test]
    fn test_text_labels_are_projected() {
        let mut engine = ready();
        let mut scene = Scene::new();
        scene.options_mut().draw_axes = false;
        scene.set_full_extent(Extent3D::new(0.0, 10.0, 0.0, 10.0, 0.0, 10.0)).unwrap();
        scene.add_graphic(Graphic::new(
            Shape::Text {
                position: DVec3::splat(5.0),
                text: "center".into(),
                font_size: 10.0,
            },
            ColorBreak::color(Vec4::ONE),
        ));
        let report = engine.render(&scene, request().with_dpi_scale(2.0)).unwrap();
        let label = report.labels.iter().find(|l| l.text == "center").unwrap();
        assert!((label.position - Vec2::new(160.0, 120.0)).length() < 1e-3);
        assert!((label.font_size - 20.0).abs() < 1e-6);
    }
}
