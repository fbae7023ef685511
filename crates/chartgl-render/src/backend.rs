//! The seam between the render engine and a concrete graphics API.
//!
//! The engine tessellates shapes into [`Geometry`] in normalized space and
//! hands it to a [`RenderBackend`]. Cached geometry is uploaded once and
//! drawn later by handle with a model matrix; everything else is drawn
//! immediately. Screen-space overlays (legend, title backdrop) go through
//! [`OverlayBatch`] in pixel coordinates.

use chartgl_core::{ClipPlane, ImageData, LightingUniforms, ShapeKind};
use glam::{Mat4, Vec2, Vec3, Vec4};
use image::RgbaImage;

use crate::error::RenderResult;

/// Vertex of a lit or unlit 3D batch, in normalized space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3, color: Vec4) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            color: color.to_array(),
        }
    }

    /// A vertex without a meaningful normal.
    #[must_use]
    pub fn unlit(position: Vec3, color: Vec4) -> Self {
        Self::new(position, Vec3::ZERO, color)
    }
}

/// Vertex of a textured quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Vertex of a screen-space overlay, in pixels with the origin top-left.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl OverlayVertex {
    #[must_use]
    pub fn new(position: Vec2, color: Vec4) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    Triangles,
    Lines,
}

/// Indexed primitives sharing one topology and shading mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub topology: Topology,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Line width in pixels; ignored for triangles.
    pub line_width: f32,
    /// Whether the lighting model applies.
    pub lit: bool,
}

impl Batch {
    #[must_use]
    pub fn triangles(lit: bool) -> Self {
        Self {
            topology: Topology::Triangles,
            vertices: Vec::new(),
            indices: Vec::new(),
            line_width: 1.0,
            lit,
        }
    }

    #[must_use]
    pub fn lines(width: f32) -> Self {
        Self {
            topology: Topology::Lines,
            vertices: Vec::new(),
            indices: Vec::new(),
            line_width: width,
            lit: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Appends a vertex and returns its index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_vertex(&mut self, v: Vertex) -> u32 {
        self.vertices.push(v);
        (self.vertices.len() - 1) as u32
    }

    pub fn push_segment(&mut self, a: Vec3, b: Vec3, color: Vec4) {
        let i = self.push_vertex(Vertex::unlit(a, color));
        let j = self.push_vertex(Vertex::unlit(b, color));
        self.indices.extend([i, j]);
    }

    pub fn push_triangle(&mut self, a: Vertex, b: Vertex, c: Vertex) {
        let i = self.push_vertex(a);
        let j = self.push_vertex(b);
        let k = self.push_vertex(c);
        self.indices.extend([i, j, k]);
    }

    /// Appends a quad as two triangles; corners in winding order.
    pub fn push_quad(&mut self, corners: [Vertex; 4]) {
        let base = self.push_vertex(corners[0]);
        self.push_vertex(corners[1]);
        self.push_vertex(corners[2]);
        self.push_vertex(corners[3]);
        self.indices
            .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// An RGBA image placed on a quad in normalized space.
#[derive(Debug, Clone, PartialEq)]
pub struct TexturedQuad {
    pub vertices: [TexturedVertex; 4],
    pub image: ImageData,
}

/// Text anchored at a normalized-space point, projected by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldLabel {
    pub position: Vec3,
    pub text: String,
    pub font_size: f32,
    pub color: Vec4,
}

/// Tessellated output of one graphic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub batches: Vec<Batch>,
    pub textures: Vec<TexturedQuad>,
    pub labels: Vec<WorldLabel>,
}

impl Geometry {
    pub fn push(&mut self, batch: Batch) {
        if !batch.is_empty() {
            self.batches.push(batch);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty() && self.textures.is_empty() && self.labels.is_empty()
    }

    /// Number of vertices across all batches and quads.
    pub fn vertex_count(&self) -> usize {
        self.batches.iter().map(|b| b.vertices.len()).sum::<usize>() + self.textures.len() * 4
    }
}

/// Screen-space primitives in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBatch {
    pub topology: Topology,
    pub vertices: Vec<OverlayVertex>,
    pub indices: Vec<u32>,
}

impl OverlayBatch {
    #[must_use]
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn push_vertex(&mut self, p: Vec2, color: Vec4) -> u32 {
        self.vertices.push(OverlayVertex::new(p, color));
        (self.vertices.len() - 1) as u32
    }

    /// Fills a convex polygon as a triangle fan.
    pub fn push_convex(&mut self, polygon: &[Vec2], color: Vec4) {
        if polygon.len() < 3 {
            return;
        }
        let base = self.push_vertex(polygon[0], color);
        for p in &polygon[1..] {
            self.push_vertex(*p, color);
        }
        #[allow(clippy::cast_possible_truncation)]
        for i in 1..(polygon.len() as u32 - 1) {
            self.indices.extend([base, base + i, base + i + 1]);
        }
    }

    pub fn push_segment(&mut self, a: Vec2, b: Vec2, color: Vec4) {
        let i = self.push_vertex(a, color);
        let j = self.push_vertex(b, color);
        self.indices.extend([i, j]);
    }

    /// Outlines a closed polyline.
    pub fn push_loop(&mut self, points: &[Vec2], color: Vec4) {
        for (i, a) in points.iter().enumerate() {
            let b = points[(i + 1) % points.len()];
            self.push_segment(*a, b, color);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// Text placed in pixel coordinates, for the host to rasterize.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub text: String,
    /// Anchor point in pixels, origin top-left.
    pub position: Vec2,
    pub h_align: HAlign,
    pub v_align: VAlign,
    /// Counter-clockwise rotation in degrees.
    pub angle: f32,
    pub font_size: f32,
    pub color: Vec4,
}

/// Per-frame settings passed to [`RenderBackend::begin_frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSetup {
    pub clear_color: Vec4,
    pub antialias: bool,
    pub blend: bool,
    pub viewport: Vec2,
    pub dpi_scale: f32,
}

/// Camera and lighting for the 3D part of a frame.
#[derive(Debug, Clone, Copy)]
pub struct ViewUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub eye: Vec3,
    pub lighting: LightingUniforms,
}

/// Opaque reference to geometry uploaded to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryHandle(pub u64);

/// A graphics API the engine can drive.
///
/// Calls between `begin_frame` and `end_frame` are recorded in order; a
/// backend may batch them but must preserve that order when drawing.
/// Any method may fail with [`RenderError::ContextLost`], after which every
/// handle the backend returned is invalid.
///
/// [`RenderError::ContextLost`]: crate::error::RenderError::ContextLost
pub trait RenderBackend {
    fn name(&self) -> &str;

    /// Creates the context and offscreen targets for the given size.
    fn init(&mut self, width: u32, height: u32) -> RenderResult<()>;

    /// Recreates size-dependent targets.
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()>;

    /// Releases everything the backend owns.
    fn dispose(&mut self);

    /// Whether this backend has a draw routine for the shape kind.
    fn supports(&self, kind: ShapeKind) -> bool;

    fn begin_frame(&mut self, setup: &FrameSetup) -> RenderResult<()>;

    fn set_view(&mut self, view: &ViewUniforms) -> RenderResult<()>;

    /// Enables clipping against the given planes; an empty slice disables it.
    fn set_clip_planes(&mut self, planes: &[ClipPlane]) -> RenderResult<()>;

    /// Uploads geometry for repeated drawing.
    fn upload(&mut self, geometry: &Geometry) -> RenderResult<GeometryHandle>;

    /// Frees uploaded geometry. Unknown handles are ignored.
    fn release(&mut self, handle: GeometryHandle);

    /// Draws uploaded geometry with an extra model transform.
    fn draw_cached(&mut self, handle: GeometryHandle, model: Mat4) -> RenderResult<()>;

    /// Draws geometry that is rebuilt every frame.
    fn draw(&mut self, geometry: &Geometry) -> RenderResult<()>;

    /// Draws screen-space primitives on top of the 3D scene.
    fn draw_overlay(&mut self, batch: &OverlayBatch) -> RenderResult<()>;

    /// Receives the frame's text. Backends that cannot rasterize text ignore it.
    fn draw_labels(&mut self, labels: &[TextLabel]) -> RenderResult<()> {
        let _ = labels;
        Ok(())
    }

    fn end_frame(&mut self) -> RenderResult<()>;

    /// Reads back the last finished frame.
    fn capture(&mut self) -> RenderResult<RgbaImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 40);
        assert_eq!(std::mem::size_of::<TexturedVertex>(), 20);
        assert_eq!(std::mem::size_of::<OverlayVertex>(), 24);
    }

    #[test]
    fn test_quad_indices() {
        let mut b = Batch::triangles(false);
        let v = Vertex::unlit(Vec3::ZERO, Vec4::ONE);
        b.push_quad([v; 4]);
        b.push_quad([v; 4]);
        assert_eq!(b.vertices.len(), 8);
        assert_eq!(&b.indices[6..], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn test_convex_fan() {
        let mut o = OverlayBatch::new(Topology::Triangles);
        o.push_convex(
            &[Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y, Vec2::new(-0.5, 0.5)],
            Vec4::ONE,
        );
        assert_eq!(o.indices.len(), 9);
        o.push_convex(&[Vec2::ZERO, Vec2::X], Vec4::ONE);
        assert_eq!(o.indices.len(), 9);
    }

    #[test]
    fn test_empty_batches_are_dropped() {
        let mut g = Geometry::default();
        g.push(Batch::lines(1.0));
        assert!(g.is_empty());
    }
}
