//! A backend that records draw calls instead of rasterizing them.
//!
//! Used by the test suites and by exporters that want the frame as a list
//! of primitives. Capture returns a frame filled with the clear color.

use std::collections::{BTreeMap, HashSet};

use chartgl_core::{ClipPlane, Mat4, ShapeKind, Vec2, Vec4};
use image::{Rgba, RgbaImage};

use crate::backend::{
    FrameSetup, Geometry, GeometryHandle, OverlayBatch, RenderBackend, TextLabel, Topology,
    ViewUniforms,
};
use crate::error::{RenderError, RenderResult};
use crate::screenshot::ScreenshotError;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginFrame(FrameSetup),
    SetView { view: Mat4, projection: Mat4 },
    SetClipPlanes(usize),
    Upload { handle: GeometryHandle, vertices: usize },
    Release(GeometryHandle),
    DrawCached { handle: GeometryHandle, model: Mat4 },
    Draw { vertices: usize, textures: usize },
    Overlay { topology: Topology, vertices: usize },
    Labels(usize),
    EndFrame,
}

/// Call counters, accumulated until [`RecordingBackend::reset_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordingStats {
    pub frames: usize,
    pub uploads: usize,
    pub releases: usize,
    pub cached_draws: usize,
    pub immediate_draws: usize,
    pub overlays: usize,
    pub labels: usize,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<Command>,
    stats: RecordingStats,
    /// Uploaded geometry still owned by the caller, with its vertex count.
    live: BTreeMap<GeometryHandle, usize>,
    next_handle: u64,
    unsupported: HashSet<ShapeKind>,
    size: Option<(u32, u32)>,
    context_lost: bool,
    in_frame: bool,
    clear_color: Vec4,
    last_labels: Vec<TextLabel>,
    overlay_vertices: Vec<Vec2>,
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend without draw routines for the given kinds.
    #[must_use]
    pub fn without(kinds: impl IntoIterator<Item = ShapeKind>) -> Self {
        Self {
            unsupported: kinds.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn stats(&self) -> RecordingStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = RecordingStats::default();
    }

    /// Number of uploads not yet released.
    pub fn live_handles(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, handle: GeometryHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Labels passed with the last frame.
    pub fn last_labels(&self) -> &[TextLabel] {
        &self.last_labels
    }

    /// Every overlay vertex position drawn since the last `begin_frame`.
    pub fn overlay_vertices(&self) -> &[Vec2] {
        &self.overlay_vertices
    }

    /// Simulates a lost device: every handle becomes invalid and all calls
    /// fail until the next `init`.
    pub fn lose_context(&mut self) {
        self.context_lost = true;
        self.live.clear();
        self.in_frame = false;
    }

    fn check(&self) -> RenderResult<()> {
        if self.context_lost {
            return Err(RenderError::ContextLost("recording context lost".into()));
        }
        Ok(())
    }
}

impl RenderBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn init(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.context_lost = false;
        self.size = Some((width, height));
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.check()?;
        self.size = Some((width, height));
        Ok(())
    }

    fn dispose(&mut self) {
        self.size = None;
        self.in_frame = false;
    }

    fn supports(&self, kind: ShapeKind) -> bool {
        !self.unsupported.contains(&kind)
    }

    fn begin_frame(&mut self, setup: &FrameSetup) -> RenderResult<()> {
        self.check()?;
        self.in_frame = true;
        self.clear_color = setup.clear_color;
        self.last_labels.clear();
        self.overlay_vertices.clear();
        self.commands.push(Command::BeginFrame(*setup));
        Ok(())
    }

    fn set_view(&mut self, view: &ViewUniforms) -> RenderResult<()> {
        self.check()?;
        self.commands.push(Command::SetView {
            view: view.view,
            projection: view.projection,
        });
        Ok(())
    }

    fn set_clip_planes(&mut self, planes: &[ClipPlane]) -> RenderResult<()> {
        self.check()?;
        self.commands.push(Command::SetClipPlanes(planes.len()));
        Ok(())
    }

    fn upload(&mut self, geometry: &Geometry) -> RenderResult<GeometryHandle> {
        self.check()?;
        self.next_handle += 1;
        let handle = GeometryHandle(self.next_handle);
        let vertices = geometry.vertex_count();
        self.live.insert(handle, vertices);
        self.stats.uploads += 1;
        self.commands.push(Command::Upload { handle, vertices });
        Ok(handle)
    }

    fn release(&mut self, handle: GeometryHandle) {
        if self.live.remove(&handle).is_some() {
            self.stats.releases += 1;
            self.commands.push(Command::Release(handle));
        }
    }

    fn draw_cached(&mut self, handle: GeometryHandle, model: Mat4) -> RenderResult<()> {
        self.check()?;
        if !self.live.contains_key(&handle) {
            return Err(RenderError::UnknownHandle(handle.0));
        }
        self.stats.cached_draws += 1;
        self.commands.push(Command::DrawCached { handle, model });
        Ok(())
    }

    fn draw(&mut self, geometry: &Geometry) -> RenderResult<()> {
        self.check()?;
        self.stats.immediate_draws += 1;
        self.commands.push(Command::Draw {
            vertices: geometry.vertex_count(),
            textures: geometry.textures.len(),
        });
        Ok(())
    }

    fn draw_overlay(&mut self, batch: &OverlayBatch) -> RenderResult<()> {
        self.check()?;
        self.stats.overlays += 1;
        self.overlay_vertices
            .extend(batch.vertices.iter().map(|v| Vec2::from(v.position)));
        self.commands.push(Command::Overlay {
            topology: batch.topology,
            vertices: batch.vertices.len(),
        });
        Ok(())
    }

    fn draw_labels(&mut self, labels: &[TextLabel]) -> RenderResult<()> {
        self.check()?;
        self.stats.labels += labels.len();
        self.last_labels = labels.to_vec();
        self.commands.push(Command::Labels(labels.len()));
        Ok(())
    }

    fn end_frame(&mut self) -> RenderResult<()> {
        self.check()?;
        self.in_frame = false;
        self.stats.frames += 1;
        self.commands.push(Command::EndFrame);
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn capture(&mut self) -> RenderResult<RgbaImage> {
        self.check()?;
        let Some((width, height)) = self.size else {
            return Err(ScreenshotError::InvalidImageData.into());
        };
        if self.in_frame {
            return Err(ScreenshotError::InvalidImageData.into());
        }
        let c = (self.clear_color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
        let pixel = Rgba([c.x as u8, c.y as u8, c.z as u8, c.w as u8]);
        Ok(RgbaImage::from_pixel(width, height, pixel))
    }
}
