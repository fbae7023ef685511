//! Turns leaf graphics into backend geometry.
//!
//! [`tessellate`] is the single dispatch point from [`Shape`] variants to
//! draw routines. Everything it emits is already in normalized space under
//! the context's transform and projection.

use std::f32::consts::TAU;

use chartgl_core::{
    BreakKind, CameraState, ColorBreak, LineDash, MarkerKind, PointStyle, Projection, Shape,
    Style, Transform, VolumeGrid,
};
use glam::{DVec3, Vec2, Vec3, Vec4};

use crate::backend::{Batch, Geometry, TexturedQuad, TexturedVertex, Vertex, WorldLabel};
use crate::triangulate::{flatten, ring_normal, triangulate};

const CIRCLE_SEGMENTS: usize = 16;
const SPHERE_STACKS: usize = 8;
const SPHERE_SLICES: usize = 12;
const TUBE_SIDES: usize = 8;
const CYLINDER_SIDES: usize = 24;

/// Everything tessellation needs to know about the current view.
#[derive(Debug, Clone)]
pub struct TessellationContext {
    pub transform: Transform,
    pub projection: Projection,
    /// Camera right and up in normalized space, for billboards.
    pub camera_right: Vec3,
    pub camera_up: Vec3,
    /// Normalized units covered by one device pixel at the cube center.
    pub pixel_size: f32,
    pub dpi_scale: f32,
}

impl TessellationContext {
    #[must_use]
    pub fn new(
        transform: &Transform,
        projection: Projection,
        camera: &CameraState,
        viewport: Vec2,
        dpi_scale: f32,
    ) -> Self {
        let (camera_right, camera_up) = camera.right_up();
        let visible = 2.0 * camera.distance * (camera.fov.to_radians() * 0.5).tan();
        Self {
            transform: *transform,
            projection,
            camera_right,
            camera_up,
            pixel_size: visible / viewport.y.max(1.0),
            dpi_scale,
        }
    }

    fn world(&self, p: DVec3) -> DVec3 {
        self.projection.project(p)
    }

    fn point(&self, p: DVec3) -> Vec3 {
        self.transform.transform(self.world(p))
    }

    /// Converts a size in logical pixels to normalized units.
    fn pixels(&self, px: f32) -> f32 {
        px * self.dpi_scale * self.pixel_size
    }

    /// Maps a world-space normal through the anisotropic normalization.
    #[allow(clippy::cast_possible_truncation)]
    fn normal(&self, n: DVec3) -> Vec3 {
        let (scale, _) = self.transform.scale_offset();
        (n / scale).as_vec3().normalize_or_zero()
    }
}

/// Color for a value under a style. Masked or unclassified values are transparent.
fn value_color(style: &Style, value: Option<f64>) -> Vec4 {
    match (style, value) {
        (Style::Break(b), _) => b.color,
        (Style::Scheme(s), Some(v)) => s.color_for(v).unwrap_or(Vec4::ZERO),
        (Style::Scheme(_), None) => style.base_break().color,
    }
}

fn point_style(brk: &ColorBreak) -> PointStyle {
    match &brk.kind {
        BreakKind::Point(p) => p.clone(),
        _ => PointStyle {
            size: brk.size().max(1.0),
            ..PointStyle::default()
        },
    }
}

/// Tessellates one leaf graphic.
#[must_use]
pub fn tessellate(shape: &Shape, style: &Style, ctx: &TessellationContext) -> Geometry {
    let mut geometry = Geometry::default();
    match shape {
        Shape::Points { points, values } => {
            let brk = style.base_break();
            let colors = per_vertex_colors(style, points.len(), values.as_deref());
            markers(&mut geometry, ctx, points, &colors, &point_style(&brk));
        }
        Shape::Polyline { points, values } => {
            polyline(&mut geometry, ctx, points, values.as_deref(), style);
        }
        Shape::Polygon { exterior, holes } => {
            polygon(&mut geometry, ctx, exterior, holes, &style.base_break());
        }
        Shape::Mesh {
            vertices,
            triangles,
            values,
        } => {
            let colors = per_vertex_colors(style, vertices.len(), values.as_deref());
            geometry.push(mesh(ctx, vertices, triangles, &colors));
        }
        Shape::Volume(grid) => geometry.push(volume(ctx, grid, style)),
        Shape::Particles {
            points,
            values,
            alpha,
        } => {
            let colors: Vec<Vec4> = values
                .iter()
                .map(|v| {
                    let c = value_color(style, Some(*v));
                    c.truncate().extend(c.w * alpha)
                })
                .collect();
            let ps = PointStyle {
                marker: MarkerKind::Square,
                draw_outline: false,
                ..point_style(&style.base_break())
            };
            markers(&mut geometry, ctx, points, &colors, &ps);
        }
        Shape::Pipe {
            points,
            radius,
            values,
        } => {
            let colors = per_vertex_colors(style, points.len(), values.as_deref());
            geometry.push(pipe(ctx, points, *radius, &colors));
        }
        Shape::WindArrows {
            origins,
            vectors,
            scale,
        } => {
            geometry.push(wind_arrows(ctx, origins, vectors, *scale, style));
        }
        Shape::Cube { center, size } => {
            let brk = style.base_break();
            let half = size.abs() * 0.5;
            cube(&mut geometry, ctx, *center - half, *center + half, &brk);
        }
        Shape::Cylinder {
            base,
            radius,
            height,
        } => {
            geometry.push(cylinder(ctx, *base, *radius, *height, style.base_break().color));
        }
        Shape::Image { corners, image } => {
            let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
            let mut vertices = [TexturedVertex {
                position: [0.0; 3],
                uv: [0.0; 2],
            }; 4];
            for (v, (c, uv)) in vertices.iter_mut().zip(corners.iter().zip(uvs)) {
                v.position = ctx.point(*c).to_array();
                v.uv = uv;
            }
            geometry.textures.push(TexturedQuad {
                vertices,
                image: image.clone(),
            });
        }
        Shape::Text {
            position,
            text,
            font_size,
        } => geometry.labels.push(WorldLabel {
            position: ctx.point(*position),
            text: text.clone(),
            font_size: *font_size,
            color: style.base_break().color,
        }),
    }
    geometry
}

fn per_vertex_colors(style: &Style, n: usize, values: Option<&[f64]>) -> Vec<Vec4> {
    match values {
        Some(values) => values.iter().map(|v| value_color(style, Some(*v))).collect(),
        None => vec![value_color(style, None); n],
    }
}

/// Unit outline of a flat marker.
#[allow(clippy::cast_precision_loss)]
fn marker_shape(kind: MarkerKind) -> Vec<Vec2> {
    match kind {
        MarkerKind::Circle | MarkerKind::Sphere => (0..CIRCLE_SEGMENTS)
            .map(|i| Vec2::from_angle(TAU * i as f32 / CIRCLE_SEGMENTS as f32))
            .collect(),
        MarkerKind::Square => vec![
            Vec2::new(-0.8, -0.8),
            Vec2::new(0.8, -0.8),
            Vec2::new(0.8, 0.8),
            Vec2::new(-0.8, 0.8),
        ],
        MarkerKind::Triangle => vec![
            Vec2::new(-0.87, -0.5),
            Vec2::new(0.87, -0.5),
            Vec2::new(0.0, 1.0),
        ],
        MarkerKind::Diamond => vec![
            Vec2::new(0.0, -1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(-1.0, 0.0),
        ],
    }
}

fn markers(
    geometry: &mut Geometry,
    ctx: &TessellationContext,
    points: &[DVec3],
    colors: &[Vec4],
    style: &PointStyle,
) {
    let radius = ctx.pixels(style.size) * 0.5;
    if style.marker == MarkerKind::Sphere {
        let mut batch = Batch::triangles(true);
        for (p, color) in points.iter().zip(colors) {
            sphere(&mut batch, ctx.point(*p), radius, *color);
        }
        geometry.push(batch);
        return;
    }

    let shape = marker_shape(style.marker);
    let (right, up) = (ctx.camera_right * radius, ctx.camera_up * radius);
    let mut fill = Batch::triangles(false);
    let mut outline = Batch::lines(1.0);
    for (p, color) in points.iter().zip(colors) {
        let center = ctx.point(*p);
        let ring: Vec<Vec3> = shape.iter().map(|s| center + right * s.x + up * s.y).collect();
        let base = fill.push_vertex(Vertex::unlit(ring[0], *color));
        for q in &ring[1..] {
            fill.push_vertex(Vertex::unlit(*q, *color));
        }
        #[allow(clippy::cast_possible_truncation)]
        for i in 1..(ring.len() as u32 - 1) {
            fill.indices.extend([base, base + i, base + i + 1]);
        }
        if style.draw_outline {
            for (i, a) in ring.iter().enumerate() {
                outline.push_segment(*a, ring[(i + 1) % ring.len()], style.outline_color);
            }
        }
    }
    geometry.push(fill);
    geometry.push(outline);
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn sphere(batch: &mut Batch, center: Vec3, radius: f32, color: Vec4) {
    let base = batch.vertices.len() as u32;
    for i in 0..=SPHERE_STACKS {
        let phi = std::f32::consts::PI * i as f32 / SPHERE_STACKS as f32;
        for j in 0..=SPHERE_SLICES {
            let theta = TAU * j as f32 / SPHERE_SLICES as f32;
            let n = Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos());
            batch.push_vertex(Vertex::new(center + n * radius, n, color));
        }
    }
    let row = SPHERE_SLICES as u32 + 1;
    for i in 0..SPHERE_STACKS as u32 {
        for j in 0..SPHERE_SLICES as u32 {
            let a = base + i * row + j;
            let b = a + row;
            batch.indices.extend([a, b, a + 1, a + 1, b, b + 1]);
        }
    }
}

fn polyline(
    geometry: &mut Geometry,
    ctx: &TessellationContext,
    points: &[DVec3],
    values: Option<&[f64]>,
    style: &Style,
) {
    let brk = style.base_break();
    let line_style = match &brk.kind {
        BreakKind::Line(l) => l.clone(),
        _ => chartgl_core::LineStyle::default(),
    };
    let colors = per_vertex_colors(style, points.len(), values);
    let normalized: Vec<Vec3> = points.iter().map(|p| ctx.point(*p)).collect();
    let mut batch = Batch::lines(line_style.width * ctx.dpi_scale);
    let unit = ctx.pixels(line_style.width);
    dashed(&mut batch, &normalized, &colors, line_style.dash, unit);
    geometry.push(batch);

    if line_style.draw_symbol {
        let symbol = PointStyle {
            size: line_style.width * 4.0,
            ..PointStyle::default()
        };
        markers(geometry, ctx, points, &colors, &symbol);
    }
}

/// Emits the "on" pieces of a dash pattern along a polyline.
fn dashed(batch: &mut Batch, points: &[Vec3], colors: &[Vec4], dash: LineDash, unit: f32) {
    let pattern: Vec<f32> = dash.pattern().iter().map(|l| l * unit).collect();
    let solid = pattern.is_empty() || pattern.iter().any(|l| *l <= 0.0 || !l.is_finite());
    let mut phase = 0;
    let mut remaining = pattern.first().copied().unwrap_or(0.0);
    for (seg, pair) in points.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        let (ca, cb) = (colors[seg], colors[seg + 1]);
        if solid {
            let i = batch.push_vertex(Vertex::unlit(a, ca));
            let j = batch.push_vertex(Vertex::unlit(b, cb));
            batch.indices.extend([i, j]);
            continue;
        }
        let len = a.distance(b);
        let mut t = 0.0;
        while t < len {
            let step = remaining.min(len - t);
            if phase % 2 == 0 {
                let (t0, t1) = (t / len, (t + step) / len);
                let i = batch.push_vertex(Vertex::unlit(a.lerp(b, t0), ca.lerp(cb, t0)));
                let j = batch.push_vertex(Vertex::unlit(a.lerp(b, t1), ca.lerp(cb, t1)));
                batch.indices.extend([i, j]);
            }
            t += step;
            remaining -= step;
            if remaining <= f32::EPSILON * unit {
                phase = (phase + 1) % pattern.len();
                remaining = pattern[phase];
            }
        }
    }
}

fn polygon(
    geometry: &mut Geometry,
    ctx: &TessellationContext,
    exterior: &[DVec3],
    holes: &[Vec<DVec3>],
    brk: &ColorBreak,
) {
    let rings: Vec<Vec<Vec3>> = std::iter::once(exterior)
        .chain(holes.iter().map(Vec::as_slice))
        .map(|r| r.iter().map(|p| ctx.point(*p)).collect())
        .collect();

    if brk.draws_fill() {
        let outer: Vec<DVec3> = rings[0].iter().map(|p| p.as_dvec3()).collect();
        let normal = ring_normal(&outer);
        let flat_outer = flatten(&outer, normal);
        let flat_holes: Vec<Vec<Vec2>> = rings[1..]
            .iter()
            .map(|r| flatten(&r.iter().map(|p| p.as_dvec3()).collect::<Vec<_>>(), normal))
            .collect();
        let mut batch = Batch::triangles(false);
        for p in rings.iter().flatten() {
            batch.push_vertex(Vertex::unlit(*p, brk.color));
        }
        batch
            .indices
            .extend(triangulate(&flat_outer, &flat_holes).into_iter().flatten());
        geometry.push(batch);
    }

    if let Some(outline) = brk.outline_variant() {
        let mut lines = Batch::lines(outline.size() * ctx.dpi_scale);
        for ring in &rings {
            for (i, a) in ring.iter().enumerate() {
                lines.push_segment(*a, ring[(i + 1) % ring.len()], outline.color);
            }
        }
        geometry.push(lines);
    }
}

fn mesh(ctx: &TessellationContext, vertices: &[DVec3], triangles: &[[u32; 3]], colors: &[Vec4]) -> Batch {
    let positions: Vec<Vec3> = vertices.iter().map(|p| ctx.point(*p)).collect();
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for t in triangles {
        let [a, b, c] = t.map(|i| positions[i as usize]);
        let n = (b - a).cross(c - a);
        for i in t {
            normals[*i as usize] += n;
        }
    }
    let mut batch = Batch::triangles(true);
    batch.vertices = positions
        .iter()
        .zip(&normals)
        .zip(colors)
        .map(|((p, n), c)| Vertex::new(*p, n.normalize_or_zero(), *c))
        .collect();
    batch.indices = triangles.iter().flatten().copied().collect();
    batch
}

/// Alpha-blended slices along z, one per grid layer.
fn volume(ctx: &TessellationContext, grid: &VolumeGrid, style: &Style) -> Batch {
    let mut batch = Batch::triangles(false);
    let [nx, ny, nz] = grid.dims;
    if nx < 2 || ny < 2 {
        return batch;
    }
    let vertex = |i: usize, j: usize, k: usize| {
        let c = value_color(style, Some(grid.value(i, j, k)));
        Vertex::unlit(
            ctx.point(grid.position(i, j, k)),
            c.truncate().extend(c.w * grid.opacity),
        )
    };
    for k in 0..nz {
        for j in 0..ny - 1 {
            for i in 0..nx - 1 {
                let quad = [
                    vertex(i, j, k),
                    vertex(i + 1, j, k),
                    vertex(i + 1, j + 1, k),
                    vertex(i, j + 1, k),
                ];
                if quad.iter().all(|v| v.color[3] <= 0.0) {
                    continue;
                }
                batch.push_quad(quad);
            }
        }
    }
    batch
}

/// Parallel-transport frames along a polyline.
fn tube_frames(points: &[DVec3]) -> Vec<(DVec3, DVec3)> {
    let n = points.len();
    let mut frames = Vec::with_capacity(n);
    let mut normal = DVec3::ZERO;
    for i in 0..n {
        let prev = points[i.saturating_sub(1)];
        let next = points[(i + 1).min(n - 1)];
        let tangent = (next - prev).normalize_or_zero();
        normal = (normal - tangent * normal.dot(tangent)).normalize_or_zero();
        if normal == DVec3::ZERO {
            normal = tangent.any_orthonormal_vector();
        }
        frames.push((normal, tangent.cross(normal).normalize_or_zero()));
    }
    frames
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn pipe(ctx: &TessellationContext, points: &[DVec3], radius: f64, colors: &[Vec4]) -> Batch {
    let mut batch = Batch::triangles(true);
    if points.len() < 2 {
        return batch;
    }
    let world: Vec<DVec3> = points.iter().map(|p| ctx.world(*p)).collect();
    for (i, (p, (n, b))) in world.iter().zip(tube_frames(&world)).enumerate() {
        for s in 0..TUBE_SIDES {
            let theta = std::f64::consts::TAU * s as f64 / TUBE_SIDES as f64;
            let dir = n * theta.cos() + b * theta.sin();
            let pos = ctx.transform.transform(*p + dir * radius);
            batch.push_vertex(Vertex::new(pos, ctx.normal(dir), colors[i]));
        }
    }
    let sides = TUBE_SIDES as u32;
    for ring in 0..(world.len() as u32 - 1) {
        for s in 0..sides {
            let a = ring * sides + s;
            let b = ring * sides + (s + 1) % sides;
            batch.indices.extend([a, a + sides, b, b, a + sides, b + sides]);
        }
    }
    batch
}

fn wind_arrows(
    ctx: &TessellationContext,
    origins: &[DVec3],
    vectors: &[DVec3],
    scale: f64,
    style: &Style,
) -> Batch {
    let mut batch = Batch::lines(style.base_break().size() * ctx.dpi_scale);
    for (o, v) in origins.iter().zip(vectors) {
        let color = value_color(style, Some(v.length()));
        let tail = ctx.point(*o);
        let tip = ctx.point(*o + *v * scale);
        let dir = tip - tail;
        let len = dir.length();
        if len <= f32::EPSILON {
            continue;
        }
        let axis = dir / len;
        let side = if axis.cross(Vec3::Z).length_squared() > 1e-6 {
            axis.cross(Vec3::Z).normalize()
        } else {
            axis.cross(Vec3::X).normalize()
        };
        let head = len * 0.25;
        let back = tip - axis * head;
        batch.push_segment(tail, tip, color);
        batch.push_segment(tip, back + side * head * 0.5, color);
        batch.push_segment(tip, back - side * head * 0.5, color);
    }
    batch
}

const CUBE_FACES: [[usize; 4]; 6] = [
    [0, 2, 6, 4],
    [1, 5, 7, 3],
    [0, 4, 5, 1],
    [2, 3, 7, 6],
    [0, 1, 3, 2],
    [4, 6, 7, 5],
];

const CUBE_EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [2, 3],
    [4, 5],
    [6, 7],
    [0, 2],
    [1, 3],
    [4, 6],
    [5, 7],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Corner `i` has x from bit 0, y from bit 1, z from bit 2.
fn box_corner(min: DVec3, max: DVec3, i: usize) -> DVec3 {
    DVec3::new(
        if i & 1 == 0 { min.x } else { max.x },
        if i & 2 == 0 { min.y } else { max.y },
        if i & 4 == 0 { min.z } else { max.z },
    )
}

fn cube(geometry: &mut Geometry, ctx: &TessellationContext, min: DVec3, max: DVec3, brk: &ColorBreak) {
    let corners: Vec<Vec3> = (0..8).map(|i| ctx.point(box_corner(min, max, i))).collect();
    if brk.draws_fill() {
        let mut batch = Batch::triangles(true);
        for face in CUBE_FACES {
            let [a, b, c, d] = face.map(|i| corners[i]);
            let n = (b - a).cross(d - a).normalize_or_zero();
            batch.push_quad([a, b, c, d].map(|p| Vertex::new(p, -n, brk.color)));
        }
        geometry.push(batch);
    }
    if let Some(outline) = brk.outline_variant() {
        let mut lines = Batch::lines(outline.size() * ctx.dpi_scale);
        for [a, b] in CUBE_EDGES {
            lines.push_segment(corners[a], corners[b], outline.color);
        }
        geometry.push(lines);
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn cylinder(ctx: &TessellationContext, base: DVec3, radius: f64, height: f64, color: Vec4) -> Batch {
    let mut batch = Batch::triangles(true);
    let top = base + DVec3::new(0.0, 0.0, height);
    let dirs: Vec<DVec3> = (0..CYLINDER_SIDES)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / CYLINDER_SIDES as f64;
            DVec3::new(a.cos(), a.sin(), 0.0)
        })
        .collect();
    for (i, d) in dirs.iter().enumerate() {
        let e = dirs[(i + 1) % dirs.len()];
        let n0 = ctx.normal(*d);
        let n1 = ctx.normal(e);
        batch.push_quad([
            Vertex::new(ctx.point(base + *d * radius), n0, color),
            Vertex::new(ctx.point(base + e * radius), n1, color),
            Vertex::new(ctx.point(top + e * radius), n1, color),
            Vertex::new(ctx.point(top + *d * radius), n0, color),
        ]);
    }
    for (center, sign) in [(base, -1.0), (top, 1.0)] {
        let n = ctx.normal(DVec3::new(0.0, 0.0, sign));
        let c = Vertex::new(ctx.point(center), n, color);
        for (i, d) in dirs.iter().enumerate() {
            let e = dirs[(i + 1) % dirs.len()];
            batch.push_triangle(
                c,
                Vertex::new(ctx.point(center + *d * radius), n, color),
                Vertex::new(ctx.point(center + e * radius), n, color),
            );
        }
    }
    batch
}
