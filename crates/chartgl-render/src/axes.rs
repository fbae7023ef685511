//! Axis lines, ticks, grid, base rectangle and bounding box.
//!
//! All decorations are laid out on the axes extent, which only equals the
//! normalized cube when axes zoom is off. Labels are projected through the
//! frame's [`ProjectionSnapshot`] and returned for the host to draw.

use chartgl_core::{AxisKind, ProjectionSnapshot, Scene, Transform};
use glam::{Vec2, Vec3, Vec4};

use crate::backend::{Batch, HAlign, TextLabel, VAlign};

/// The axes extent in normalized space plus which edges face the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxesFrame {
    pub lo: Vec3,
    pub hi: Vec3,
    /// `y` of the edge carrying the x axis.
    pub x_axis_y: f32,
    /// `x` of the edge carrying the y axis.
    pub y_axis_x: f32,
    /// `(x, y)` of the vertical edge carrying the z axis.
    pub z_axis_xy: Vec2,
}

impl AxesFrame {
    /// Places the frame for the scene's axes extent under the given view.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(scene: &Scene, snapshot: &ProjectionSnapshot) -> Self {
        let extent = scene.axes_extent();
        let t = scene.transform();
        let lo = t.transform_f64(extent.min()).as_vec3();
        let hi = t.transform_f64(extent.max()).as_vec3();
        let c = (lo + hi) * 0.5;

        let nearer = |a: Vec3, b: Vec3| snapshot.view_depth(a) <= snapshot.view_depth(b);
        let x_axis_y = if nearer(Vec3::new(c.x, lo.y, lo.z), Vec3::new(c.x, hi.y, lo.z)) {
            lo.y
        } else {
            hi.y
        };
        let y_axis_x = if nearer(Vec3::new(lo.x, c.y, lo.z), Vec3::new(hi.x, c.y, lo.z)) {
            lo.x
        } else {
            hi.x
        };
        // The z axis goes on the leftmost vertical edge.
        let z_axis_xy = [
            Vec2::new(lo.x, lo.y),
            Vec2::new(hi.x, lo.y),
            Vec2::new(hi.x, hi.y),
            Vec2::new(lo.x, hi.y),
        ]
        .into_iter()
        .min_by(|a, b| {
            let sa = snapshot.to_screen(Vec3::new(a.x, a.y, c.z)).map_or(f32::MAX, |s| s.x);
            let sb = snapshot.to_screen(Vec3::new(b.x, b.y, c.z)).map_or(f32::MAX, |s| s.x);
            sa.total_cmp(&sb)
        })
        .unwrap_or(Vec2::new(lo.x, lo.y));

        Self {
            lo,
            hi,
            x_axis_y,
            y_axis_x,
            z_axis_xy,
        }
    }

    fn center(&self) -> Vec3 {
        (self.lo + self.hi) * 0.5
    }

    /// The wall opposite to `front` on an axis.
    fn back(&self, axis: usize, front: f32) -> f32 {
        if front == self.lo[axis] {
            self.hi[axis]
        } else {
            self.lo[axis]
        }
    }

    /// Corner `i`, x from bit 0, y from bit 1, z from bit 2.
    fn corner(&self, i: usize) -> Vec3 {
        Vec3::new(
            if i & 1 == 0 { self.lo.x } else { self.hi.x },
            if i & 2 == 0 { self.lo.y } else { self.hi.y },
            if i & 4 == 0 { self.lo.z } else { self.hi.z },
        )
    }
}

#[allow(clippy::cast_possible_truncation)]
fn normalized(t: &Transform, kind: AxisKind, v: f64) -> f32 {
    match kind {
        AxisKind::X => t.transform_x(v) as f32,
        AxisKind::Y => t.transform_y(v) as f32,
        AxisKind::Z => t.transform_z(v) as f32,
    }
}

fn in_range(v: f32, lo: f32, hi: f32) -> bool {
    let eps = (hi - lo).abs() * 1e-4;
    v >= lo - eps && v <= hi + eps
}

/// Base rectangle and grid lines on the back walls; drawn before the data.
#[must_use]
pub fn backdrop(scene: &Scene, frame: &AxesFrame, dpi_scale: f32) -> Batch {
    let opts = scene.options();
    let mut batch = Batch::lines(dpi_scale);
    let (lo, hi) = (frame.lo, frame.hi);

    if opts.draw_base {
        for [a, b] in [[0, 1], [1, 3], [3, 2], [2, 0]] {
            batch.push_segment(frame.corner(a), frame.corner(b), opts.box_color);
        }
    }

    if opts.draw_grid {
        let t = scene.transform();
        let y_back = frame.back(1, frame.x_axis_y);
        let x_back = frame.back(0, frame.y_axis_x);
        let color = opts.grid_color;
        for kind in [AxisKind::X, AxisKind::Y, AxisKind::Z] {
            let axis = scene.axis(kind);
            if !axis.is_visible() {
                continue;
            }
            let i = kind.index();
            for tick in &axis.ticks().major {
                let v = normalized(t, kind, tick.value);
                if !in_range(v, lo[i], hi[i]) {
                    continue;
                }
                match kind {
                    AxisKind::X => {
                        batch.push_segment(Vec3::new(v, lo.y, lo.z), Vec3::new(v, hi.y, lo.z), color);
                        batch.push_segment(
                            Vec3::new(v, y_back, lo.z),
                            Vec3::new(v, y_back, hi.z),
                            color,
                        );
                    }
                    AxisKind::Y => {
                        batch.push_segment(Vec3::new(lo.x, v, lo.z), Vec3::new(hi.x, v, lo.z), color);
                        batch.push_segment(
                            Vec3::new(x_back, v, lo.z),
                            Vec3::new(x_back, v, hi.z),
                            color,
                        );
                    }
                    AxisKind::Z => {
                        batch.push_segment(
                            Vec3::new(lo.x, y_back, v),
                            Vec3::new(hi.x, y_back, v),
                            color,
                        );
                        batch.push_segment(
                            Vec3::new(x_back, lo.y, v),
                            Vec3::new(x_back, hi.y, v),
                            color,
                        );
                    }
                }
            }
        }
    }
    batch
}

/// Alignment that keeps a label on the far side of `dir` from its anchor.
fn align_for(dir: Vec2) -> (HAlign, VAlign) {
    let len = dir.length().max(f32::EPSILON);
    let h = if dir.x > 0.3 * len {
        HAlign::Left
    } else if dir.x < -0.3 * len {
        HAlign::Right
    } else {
        HAlign::Center
    };
    let v = if dir.y > 0.3 * len {
        VAlign::Top
    } else if dir.y < -0.3 * len {
        VAlign::Bottom
    } else {
        VAlign::Middle
    };
    (h, v)
}

/// Axis lines, major and minor ticks, tick labels and axis titles.
#[must_use]
pub fn axes(
    scene: &Scene,
    frame: &AxesFrame,
    snapshot: &ProjectionSnapshot,
    dpi_scale: f32,
) -> (Batch, Vec<TextLabel>) {
    let opts = scene.options();
    let mut batch = Batch::lines(dpi_scale);
    let mut labels = Vec::new();
    let t = scene.transform();
    let c = frame.center();
    let color = opts.foreground_color;
    let tick_len = opts.tick_length;

    for kind in [AxisKind::X, AxisKind::Y, AxisKind::Z] {
        let axis = scene.axis(kind);
        if !axis.is_visible() {
            continue;
        }
        let i = kind.index();
        // Point on the axis line at normalized coordinate `v`, and the outward tick direction.
        let (at, outward): (Box<dyn Fn(f32) -> Vec3>, Vec3) = match kind {
            AxisKind::X => {
                let y = frame.x_axis_y;
                let z = frame.lo.z;
                (
                    Box::new(move |v| Vec3::new(v, y, z)),
                    Vec3::new(0.0, (y - c.y).signum(), 0.0),
                )
            }
            AxisKind::Y => {
                let x = frame.y_axis_x;
                let z = frame.lo.z;
                (
                    Box::new(move |v| Vec3::new(x, v, z)),
                    Vec3::new((x - c.x).signum(), 0.0, 0.0),
                )
            }
            AxisKind::Z => {
                let xy = frame.z_axis_xy;
                let base = Vec3::new(xy.x, xy.y, c.z);
                let along_x = Vec3::new((xy.x - c.x).signum(), 0.0, 0.0);
                let along_y = Vec3::new(0.0, (xy.y - c.y).signum(), 0.0);
                let screen_dx = |d: Vec3| {
                    match (snapshot.to_screen(base + d), snapshot.to_screen(base)) {
                        (Some(a), Some(b)) => a.x - b.x,
                        _ => 0.0,
                    }
                };
                let outward = if screen_dx(along_x) <= screen_dx(along_y) {
                    along_x
                } else {
                    along_y
                };
                (Box::new(move |v| Vec3::new(xy.x, xy.y, v)), outward)
            }
        };

        batch.push_segment(at(frame.lo[i]), at(frame.hi[i]), color);

        let ticks = axis.ticks();
        for tick in &ticks.major {
            let v = normalized(t, kind, tick.value);
            if !in_range(v, frame.lo[i], frame.hi[i]) {
                continue;
            }
            let base = at(v);
            let end = base + outward * tick_len;
            batch.push_segment(base, end, color);
            let anchor = base + outward * tick_len * 1.5;
            if let (Some(p), Some(b)) = (snapshot.to_screen(anchor), snapshot.to_screen(base)) {
                let (h_align, v_align) = align_for(p - b);
                labels.push(TextLabel {
                    text: tick.text.clone(),
                    position: p,
                    h_align,
                    v_align,
                    angle: 0.0,
                    font_size: opts.tick_font_size * dpi_scale,
                    color,
                });
            }
        }
        for value in &ticks.minor {
            let v = normalized(t, kind, *value);
            if in_range(v, frame.lo[i], frame.hi[i]) {
                let base = at(v);
                batch.push_segment(base, base + outward * tick_len * 0.5, color);
            }
        }

        if !axis.label().is_empty() {
            let mid = at((frame.lo[i] + frame.hi[i]) * 0.5);
            let anchor = mid + outward * tick_len * 4.0;
            if let (Some(p), Some(b)) = (snapshot.to_screen(anchor), snapshot.to_screen(mid)) {
                let (h_align, v_align) = align_for(p - b);
                labels.push(TextLabel {
                    text: axis.label().to_string(),
                    position: p,
                    h_align,
                    v_align,
                    angle: 0.0,
                    font_size: opts.axis_label_font_size * dpi_scale,
                    color,
                });
            }
        }
    }
    (batch, labels)
}

const BOX_EDGES: [[usize; 2]; 12] = [
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

/// The twelve edges of the axes extent.
#[must_use]
pub fn bounding_box(frame: &AxesFrame, color: Vec4, width: f32) -> Batch {
    let mut batch = Batch::lines(width);
    for [a, b] in BOX_EDGES {
        batch.push_segment(frame.corner(a), frame.corner(b), color);
    }
    batch
}

/// The plot title, centered above the scene.
#[must_use]
pub fn title(scene: &Scene, viewport: Vec2, dpi_scale: f32) -> Option<TextLabel> {
    if scene.title().is_empty() {
        return None;
    }
    let opts = scene.options();
    Some(TextLabel {
        text: scene.title().to_string(),
        position: Vec2::new(viewport.x * 0.5, 10.0 * dpi_scale),
        h_align: HAlign::Center,
        v_align: VAlign::Top,
        angle: 0.0,
        font_size: opts.title_font_size * dpi_scale,
        color: opts.foreground_color,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartgl_core::{CameraState, Extent3D};

    fn scene() -> Scene {
        let mut s = Scene::new();
        s.set_full_extent(Extent3D::new(0.0, 10.0, 0.0, 10.0, 0.0, 10.0)).unwrap();
        s
    }

    fn snapshot(camera: &CameraState) -> ProjectionSnapshot {
        ProjectionSnapshot::new(camera, Vec2::new(800.0, 600.0))
    }

    #[test]
    fn test_frame_is_unit_cube_without_axes_zoom() {
        let s = scene();
        let frame = AxesFrame::new(&s, &snapshot(s.camera()));
        assert_eq!(frame.lo, Vec3::splat(-1.0));
        assert_eq!(frame.hi, Vec3::splat(1.0));
    }

    #[test]
    fn test_front_edges_follow_azimuth() {
        let s = scene();
        let front = AxesFrame::new(&s, &snapshot(s.camera()));
        let turned = CameraState {
            angle_y: 225.0,
            ..*s.camera()
        };
        let back = AxesFrame::new(&s, &snapshot(&turned));
        assert_ne!(front.x_axis_y, back.x_axis_y);
        assert_ne!(front.y_axis_x, back.y_axis_x);
    }

    #[test]
    fn test_axes_emit_tick_labels() {
        let s = scene();
        let snap = snapshot(s.camera());
        let frame = AxesFrame::new(&s, &snap);
        let (batch, labels) = axes(&s, &frame, &snap, 1.0);
        let majors: usize = [AxisKind::X, AxisKind::Y, AxisKind::Z]
            .iter()
            .map(|k| s.axis(*k).ticks().major.len())
            .sum();
        assert_eq!(labels.len(), majors);
        // one axis line plus one segment per tick
        assert_eq!(batch.indices.len(), (3 + majors) * 2);
        assert!(labels.iter().any(|l| l.text == "10"));
    }

    #[test]
    fn test_hidden_axis_is_skipped() {
        let mut s = scene();
        s.axis_mut(AxisKind::Z).set_visible(false);
        s.axis_mut(AxisKind::X).set_label("Longitude");
        let snap = snapshot(s.camera());
        let frame = AxesFrame::new(&s, &snap);
        let (_, labels) = axes(&s, &frame, &snap, 1.0);
        assert!(labels.iter().any(|l| l.text == "Longitude"));
        let z_ticks = s.axis(AxisKind::Z).ticks().major.len();
        let xy_ticks = s.axis(AxisKind::X).ticks().major.len() + s.axis(AxisKind::Y).ticks().major.len();
        assert_eq!(labels.len(), xy_ticks + 1);
        assert!(z_ticks > 0);
    }

    #[test]
    fn test_axes_zoom_keeps_decorations() {
        let mut s = scene();
        s.set_axes_zoom(true);
        s.set_draw_extent(Extent3D::new(0.0, 20.0, 0.0, 20.0, 0.0, 20.0)).unwrap();
        let frame = AxesFrame::new(&s, &snapshot(s.camera()));
        assert_eq!(frame.lo, Vec3::splat(-1.0));
        assert_eq!(frame.hi, Vec3::splat(0.0));
    }

    #[test]
    fn test_backdrop_and_box() {
        let mut s = scene();
        s.options_mut().draw_grid = false;
        let frame = AxesFrame::new(&s, &snapshot(s.camera()));
        assert_eq!(backdrop(&s, &frame, 1.0).indices.len(), 8);
        assert_eq!(bounding_box(&frame, Vec4::ONE, 1.0).indices.len(), 24);
    }

    #[test]
    fn test_title_label() {
        let mut s = scene();
        assert!(title(&s, Vec2::new(800.0, 600.0), 1.0).is_none());
        s.set_title("Temperature");
        let label = title(&s, Vec2::new(800.0, 600.0), 1.0).unwrap();
        assert_eq!(label.position.x, 400.0);
        assert_eq!(label.h_align, HAlign::Center);
    }
}
