//! The drawable graphic tree.
//!
//! A [`Graphic`] is either a single [`Shape`] with its [`Style`] or a
//! [`GraphicCollection`] of child graphics. Every graphic carries a stable
//! [`GraphicId`] and a version counter that changes whenever its geometry
//! or style may have changed, which is what the render-buffer cache keys on.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};
use crate::extent::Extent3D;
use crate::legend::{ColorBreak, LegendScheme};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a graphic, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphicId(u64);

impl GraphicId {
    /// Allocates a fresh id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GraphicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A regular scalar grid.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGrid {
    pub origin: DVec3,
    pub spacing: DVec3,
    /// Samples along x, y, z.
    pub dims: [usize; 3],
    /// `dims[0] * dims[1] * dims[2]` values, x fastest.
    pub values: Vec<f64>,
    /// Opacity applied to every slice.
    pub opacity: f32,
}

impl VolumeGrid {
    /// Value at grid index `(i, j, k)`.
    #[must_use]
    pub fn value(&self, i: usize, j: usize, k: usize) -> f64 {
        self.values[i + self.dims[0] * (j + self.dims[1] * k)]
    }

    /// World position of grid index `(i, j, k)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn position(&self, i: usize, j: usize, k: usize) -> DVec3 {
        self.origin + self.spacing * DVec3::new(i as f64, j as f64, k as f64)
    }
}

/// RGBA8 pixels for an image graphic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Geometry of a leaf graphic. All coordinates are in data space.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Markers, drawn flat or as spheres depending on the point style.
    Points {
        points: Vec<DVec3>,
        values: Option<Vec<f64>>,
    },
    Polyline {
        points: Vec<DVec3>,
        values: Option<Vec<f64>>,
    },
    /// A planar polygon with optional holes.
    Polygon {
        exterior: Vec<DVec3>,
        holes: Vec<Vec<DVec3>>,
    },
    /// Indexed triangles with optional per-vertex values.
    Mesh {
        vertices: Vec<DVec3>,
        triangles: Vec<[u32; 3]>,
        values: Option<Vec<f64>>,
    },
    Volume(VolumeGrid),
    /// Value-colored points with a shared alpha.
    Particles {
        points: Vec<DVec3>,
        values: Vec<f64>,
        alpha: f32,
    },
    /// A streamline drawn as a tube.
    Pipe {
        points: Vec<DVec3>,
        radius: f64,
        values: Option<Vec<f64>>,
    },
    /// Wind glyphs: an arrow per origin along its vector.
    WindArrows {
        origins: Vec<DVec3>,
        vectors: Vec<DVec3>,
        scale: f64,
    },
    Cube {
        center: DVec3,
        size: DVec3,
    },
    /// An upright cylinder standing on `base`.
    Cylinder {
        base: DVec3,
        radius: f64,
        height: f64,
    },
    /// An image mapped onto a quad; corners run counter-clockwise from bottom-left.
    Image {
        corners: [DVec3; 4],
        image: ImageData,
    },
    Text {
        position: DVec3,
        text: String,
        font_size: f32,
    },
}

/// Discriminant of [`Shape`], used for capability checks and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Points,
    Polyline,
    Polygon,
    Mesh,
    Volume,
    Particles,
    Pipe,
    WindArrows,
    Cube,
    Cylinder,
    Image,
    Text,
}

impl ShapeKind {
    /// All kinds, in declaration order.
    pub const ALL: [ShapeKind; 12] = [
        Self::Points,
        Self::Polyline,
        Self::Polygon,
        Self::Mesh,
        Self::Volume,
        Self::Particles,
        Self::Pipe,
        Self::WindArrows,
        Self::Cube,
        Self::Cylinder,
        Self::Image,
        Self::Text,
    ];

    /// Whether drawing this kind is expensive enough to keep its buffers.
    #[must_use]
    pub fn is_cached(self) -> bool {
        matches!(
            self,
            Self::Mesh | Self::Volume | Self::Polygon | Self::Pipe | Self::Image
        )
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn check_len(values: Option<&Vec<f64>>, expected: usize) -> Result<()> {
    match values {
        Some(v) if v.len() != expected => Err(ChartError::SizeMismatch {
            expected,
            actual: v.len(),
        }),
        _ => Ok(()),
    }
}

impl Shape {
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Points { .. } => ShapeKind::Points,
            Self::Polyline { .. } => ShapeKind::Polyline,
            Self::Polygon { .. } => ShapeKind::Polygon,
            Self::Mesh { .. } => ShapeKind::Mesh,
            Self::Volume(_) => ShapeKind::Volume,
            Self::Particles { .. } => ShapeKind::Particles,
            Self::Pipe { .. } => ShapeKind::Pipe,
            Self::WindArrows { .. } => ShapeKind::WindArrows,
            Self::Cube { .. } => ShapeKind::Cube,
            Self::Cylinder { .. } => ShapeKind::Cylinder,
            Self::Image { .. } => ShapeKind::Image,
            Self::Text { .. } => ShapeKind::Text,
        }
    }

    /// Checks that array lengths and indices agree.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Points { points, values } | Self::Polyline { points, values } => {
                check_len(values.as_ref(), points.len())
            }
            Self::Pipe { points, values, .. } => check_len(values.as_ref(), points.len()),
            Self::Particles { points, values, .. } => check_len(Some(values), points.len()),
            Self::Mesh {
                vertices,
                triangles,
                values,
            } => {
                check_len(values.as_ref(), vertices.len())?;
                let len = vertices.len();
                match triangles.iter().flatten().find(|i| **i as usize >= len) {
                    Some(i) => Err(ChartError::IndexOutOfRange {
                        index: *i as usize,
                        len,
                    }),
                    None => Ok(()),
                }
            }
            Self::Volume(grid) => {
                check_len(Some(&grid.values), grid.dims.iter().product())
            }
            Self::WindArrows {
                origins, vectors, ..
            } => {
                if origins.len() == vectors.len() {
                    Ok(())
                } else {
                    Err(ChartError::SizeMismatch {
                        expected: origins.len(),
                        actual: vectors.len(),
                    })
                }
            }
            Self::Image { image, .. } => {
                let expected = image.width as usize * image.height as usize * 4;
                if image.pixels.len() == expected {
                    Ok(())
                } else {
                    Err(ChartError::SizeMismatch {
                        expected,
                        actual: image.pixels.len(),
                    })
                }
            }
            Self::Polygon { .. } | Self::Cube { .. } | Self::Cylinder { .. } | Self::Text { .. } => {
                Ok(())
            }
        }
    }

    /// Bounding box, or `None` for an empty shape.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn extent(&self) -> Option<Extent3D> {
        match self {
            Self::Points { points, .. }
            | Self::Polyline { points, .. }
            | Self::Particles { points, .. } => Extent3D::from_points(points),
            Self::Polygon { exterior, .. } => Extent3D::from_points(exterior),
            Self::Mesh { vertices, .. } => Extent3D::from_points(vertices),
            Self::Volume(grid) => {
                if grid.dims.contains(&0) {
                    return None;
                }
                let far = grid.position(grid.dims[0] - 1, grid.dims[1] - 1, grid.dims[2] - 1);
                Some(Extent3D::from_corners(grid.origin.min(far), grid.origin.max(far)))
            }
            Self::Pipe { points, radius, .. } => {
                Extent3D::from_points(points).map(|e| e.extend(*radius, *radius, *radius))
            }
            Self::WindArrows {
                origins,
                vectors,
                scale,
            } => {
                let tips: Vec<DVec3> = origins
                    .iter()
                    .zip(vectors)
                    .map(|(o, v)| *o + *v * *scale)
                    .collect();
                Extent3D::from_points(origins.iter().chain(&tips))
            }
            Self::Cube { center, size } => {
                let half = size.abs() * 0.5;
                Some(Extent3D::from_corners(*center - half, *center + half))
            }
            Self::Cylinder {
                base,
                radius,
                height,
            } => {
                let top = *base + DVec3::new(0.0, 0.0, *height);
                let r = DVec3::new(*radius, *radius, 0.0);
                Some(Extent3D::from_corners(
                    base.min(top) - r,
                    base.max(top) + r,
                ))
            }
            Self::Image { corners, .. } => Extent3D::from_points(corners),
            Self::Text { position, .. } => Some(Extent3D::from_corners(*position, *position)),
        }
    }
}

/// How a leaf is styled.
#[derive(Debug, Clone, PartialEq)]
pub enum Style {
    /// One break for the whole shape.
    Break(ColorBreak),
    /// Per-value coloring through a shared scheme.
    Scheme(Arc<LegendScheme>),
}

impl Style {
    /// The break used for size and outline attributes.
    ///
    /// For schemes this is the first break, or a default break when the
    /// scheme is continuous.
    #[must_use]
    pub fn base_break(&self) -> ColorBreak {
        match self {
            Self::Break(b) => b.clone(),
            Self::Scheme(s) => s.breaks.first().cloned().unwrap_or_default(),
        }
    }
}

impl From<ColorBreak> for Style {
    fn from(b: ColorBreak) -> Self {
        Self::Break(b)
    }
}

impl From<LegendScheme> for Style {
    fn from(s: LegendScheme) -> Self {
        Self::Scheme(Arc::new(s))
    }
}

/// What a graphic holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Shape { shape: Shape, style: Style },
    Children(GraphicCollection),
}

/// A node in the graphic tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Graphic {
    id: GraphicId,
    version: u64,
    name: String,
    visible: bool,
    content: Content,
    extent: Option<Extent3D>,
}

impl Graphic {
    /// Creates a leaf graphic.
    pub fn new(shape: Shape, style: impl Into<Style>) -> Self {
        let extent = shape.extent();
        Self {
            id: GraphicId::next(),
            version: 0,
            name: String::new(),
            visible: true,
            content: Content::Shape {
                shape,
                style: style.into(),
            },
            extent,
        }
    }

    /// Creates a group graphic.
    pub fn group(children: GraphicCollection) -> Self {
        let extent = children.extent();
        Self {
            id: GraphicId::next(),
            version: 0,
            name: String::new(),
            visible: true,
            content: Content::Children(children),
            extent,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn id(&self) -> GraphicId {
        self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Shape and style for a leaf.
    pub fn leaf(&self) -> Option<(&Shape, &Style)> {
        match &self.content {
            Content::Shape { shape, style } => Some((shape, style)),
            Content::Children(_) => None,
        }
    }

    pub fn children(&self) -> Option<&GraphicCollection> {
        match &self.content {
            Content::Children(c) => Some(c),
            Content::Shape { .. } => None,
        }
    }

    pub fn extent(&self) -> Option<Extent3D> {
        self.extent
    }

    /// Edits the shape, bumping the version and refreshing the extent.
    pub fn update_shape<R>(&mut self, f: impl FnOnce(&mut Shape) -> R) -> Option<R> {
        let Content::Shape { shape, .. } = &mut self.content else {
            return None;
        };
        let r = f(shape);
        self.extent = shape.extent();
        self.version += 1;
        Some(r)
    }

    /// Edits the style, bumping the version.
    pub fn update_style<R>(&mut self, f: impl FnOnce(&mut Style) -> R) -> Option<R> {
        let Content::Shape { style, .. } = &mut self.content else {
            return None;
        };
        let r = f(style);
        self.version += 1;
        Some(r)
    }

    /// Marks the graphic changed without editing it (e.g. after a DPI change).
    pub fn touch(&mut self) {
        self.version += 1;
    }

    fn find(&self, id: GraphicId) -> Option<&Graphic> {
        if self.id == id {
            return Some(self);
        }
        self.children().and_then(|c| c.get(id))
    }

    fn find_mut(&mut self, id: GraphicId) -> Option<&mut Graphic> {
        if self.id == id {
            return Some(self);
        }
        match &mut self.content {
            Content::Children(c) => c.get_mut_untracked(id),
            Content::Shape { .. } => None,
        }
    }

    fn refresh_extent(&mut self) {
        if let Content::Children(c) = &mut self.content {
            for child in &mut c.items {
                child.refresh_extent();
            }
            c.recompute_extent();
            self.extent = c.extent();
        }
    }
}

/// An ordered list of graphics with a cached union extent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphicCollection {
    items: Vec<Graphic>,
    extent: Option<Extent3D>,
}

impl GraphicCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Union of every child extent, or `None` when nothing has an extent.
    pub fn extent(&self) -> Option<Extent3D> {
        self.extent
    }

    /// Appends a graphic and grows the extent to include it.
    pub fn add(&mut self, graphic: Graphic) -> GraphicId {
        let id = graphic.id();
        self.extend_extent(graphic.extent());
        self.items.push(graphic);
        id
    }

    /// Inserts a graphic at `index` (which may equal the length).
    pub fn insert(&mut self, index: usize, graphic: Graphic) -> Result<GraphicId> {
        if index > self.items.len() {
            return Err(ChartError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        let id = graphic.id();
        self.extend_extent(graphic.extent());
        self.items.insert(index, graphic);
        Ok(id)
    }

    /// Removes a graphic anywhere in the tree.
    ///
    /// The extent is recomputed from the remaining children, since a union
    /// cannot be shrunk incrementally.
    pub fn remove(&mut self, id: GraphicId) -> Result<Graphic> {
        if let Some(pos) = self.items.iter().position(|g| g.id() == id) {
            let removed = self.items.remove(pos);
            self.recompute_extent();
            return Ok(removed);
        }
        for child in &mut self.items {
            if let Content::Children(c) = &mut child.content {
                if let Ok(removed) = c.remove(id) {
                    child.extent = c.extent();
                    child.version += 1;
                    self.recompute_extent();
                    return Ok(removed);
                }
            }
        }
        Err(ChartError::GraphicNotFound(id))
    }

    /// Removes every graphic, returning them.
    pub fn clear(&mut self) -> Vec<Graphic> {
        self.extent = None;
        std::mem::take(&mut self.items)
    }

    /// Finds a graphic anywhere in the tree.
    pub fn get(&self, id: GraphicId) -> Option<&Graphic> {
        self.items.iter().find_map(|g| g.find(id))
    }

    /// Edits a graphic anywhere in the tree, then refreshes cached extents.
    pub fn update<R>(&mut self, id: GraphicId, f: impl FnOnce(&mut Graphic) -> R) -> Result<R> {
        let mut f = Some(f);
        let mut found = None;
        for item in &mut self.items {
            if let Some(g) = item.find_mut(id) {
                found = f.take().map(|f| f(g));
                item.refresh_extent();
                break;
            }
        }
        let r = found.ok_or(ChartError::GraphicNotFound(id))?;
        self.recompute_extent();
        Ok(r)
    }

    fn get_mut_untracked(&mut self, id: GraphicId) -> Option<&mut Graphic> {
        self.items.iter_mut().find_map(|g| g.find_mut(id))
    }

    /// Top-level graphics in draw order.
    pub fn iter(&self) -> std::slice::Iter<'_, Graphic> {
        self.items.iter()
    }

    /// Visible leaves, depth first in draw order. Hidden groups hide their children.
    pub fn iter_leaves(&self) -> LeafIter<'_> {
        LeafIter {
            stack: vec![self.items.iter()],
        }
    }

    /// Ids of every leaf, visible or not.
    pub fn leaf_ids(&self) -> Vec<GraphicId> {
        let mut ids = Vec::new();
        collect_leaf_ids(&self.items, &mut ids);
        ids
    }

    fn extend_extent(&mut self, extent: Option<Extent3D>) {
        self.extent = match (self.extent, extent) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        };
    }

    fn recompute_extent(&mut self) {
        self.extent = None;
        let extents: Vec<_> = self.items.iter().map(Graphic::extent).collect();
        for e in extents {
            self.extend_extent(e);
        }
    }
}

fn collect_leaf_ids(items: &[Graphic], out: &mut Vec<GraphicId>) {
    for g in items {
        match &g.content {
            Content::Shape { .. } => out.push(g.id),
            Content::Children(c) => collect_leaf_ids(&c.items, out),
        }
    }
}

/// Depth-first iterator over visible leaves.
pub struct LeafIter<'a> {
    stack: Vec<std::slice::Iter<'a, Graphic>>,
}

impl<'a> Iterator for LeafIter<'a> {
    type Item = &'a Graphic;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            let Some(g) = top.next() else {
                self.stack.pop();
                continue;
            };
            if !g.visible {
                continue;
            }
            match &g.content {
                Content::Shape { .. } => return Some(g),
                Content::Children(c) => self.stack.push(c.items.iter()),
            }
        }
    }
}
