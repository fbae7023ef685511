//! Pointer and wheel interaction.
//!
//! [`interact`] is a pure function from the current [`ViewState`] and one
//! [`InteractionEvent`] to the next state. The host toolkit only has to
//! translate its native events into [`InteractionEvent`]s.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraState, Projection};
use crate::extent::{Extent3D, MIN_AXIS_SPAN};

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
    };
    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
    };
    pub const CTRL: Self = Self {
        shift: false,
        ctrl: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

/// Input events, positions in pixels from the top-left of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEvent {
    Press {
        position: Vec2,
        button: PointerButton,
        modifiers: Modifiers,
    },
    Drag {
        position: Vec2,
        modifiers: Modifiers,
    },
    Release {
        position: Vec2,
    },
    /// Positive ticks zoom out, negative ticks zoom in.
    Wheel {
        ticks: f32,
        modifiers: Modifiers,
    },
    UndoZoom,
    Resize {
        viewport: Vec2,
    },
}

/// Whether wheel zoom also scales the Z axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZoomPolicy {
    /// Z scales with X and Y.
    #[default]
    WithXY,
    /// Z scales only while ctrl is held.
    OnModifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    pub z_zoom: ZoomPolicy,
    pub rotate_enabled: bool,
    pub pan_enabled: bool,
    pub zoom_enabled: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            z_zoom: ZoomPolicy::WithXY,
            rotate_enabled: true,
            pan_enabled: true,
            zoom_enabled: true,
        }
    }
}

/// Button held and last pointer position of an active drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub button: PointerButton,
    pub last: Vec2,
}

/// Everything the interaction model reads and writes.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub camera: CameraState,
    pub draw_extent: Extent3D,
    /// Snapshot of the full data extent restored by undo-zoom.
    pub full_extent: Extent3D,
    pub projection: Projection,
    pub viewport: Vec2,
    pub drag: Option<DragState>,
}

impl ViewState {
    #[must_use]
    pub fn new(extent: Extent3D, viewport: Vec2) -> Self {
        Self {
            camera: CameraState::default(),
            draw_extent: extent,
            full_extent: extent,
            projection: Projection::Flat,
            viewport,
            drag: None,
        }
    }
}

/// Result of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub state: ViewState,
    /// Whether anything visible changed.
    pub repaint: bool,
}

/// Wraps an angle into `[0, 360)`.
#[must_use]
pub fn wrap_degrees(angle: f32) -> f32 {
    let r = angle.rem_euclid(360.0);
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

/// Applies one event.
#[must_use]
pub fn interact(
    state: &ViewState,
    event: &InteractionEvent,
    config: &InteractionConfig,
) -> Interaction {
    let mut next = state.clone();
    let repaint = match *event {
        InteractionEvent::Press {
            position, button, ..
        } => {
            next.drag = Some(DragState {
                button,
                last: position,
            });
            false
        }
        InteractionEvent::Drag {
            position,
            modifiers,
        } => match state.drag {
            Some(drag) => {
                let delta = position - drag.last;
                next.drag = Some(DragState {
                    last: position,
                    ..drag
                });
                let frac = fraction(delta, state.viewport);
                match drag.button {
                    PointerButton::Left if modifiers.shift => {
                        config.pan_enabled && pan(&mut next, frac)
                    }
                    PointerButton::Left => config.rotate_enabled && rotate(&mut next.camera, frac),
                    PointerButton::Right => {
                        config.rotate_enabled && turn_head(&mut next, frac)
                    }
                    PointerButton::Middle => config.pan_enabled && pan(&mut next, frac),
                }
            }
            None => false,
        },
        InteractionEvent::Release { .. } => {
            next.drag = None;
            false
        }
        InteractionEvent::Wheel { ticks, modifiers } => {
            config.zoom_enabled && zoom(&mut next, ticks, modifiers, config.z_zoom)
        }
        InteractionEvent::UndoZoom => {
            undo_zoom(&mut next);
            true
        }
        InteractionEvent::Resize { viewport } => {
            next.viewport = viewport;
            true
        }
    };
    Interaction {
        state: next,
        repaint,
    }
}

fn fraction(delta: Vec2, viewport: Vec2) -> Vec2 {
    if viewport.x <= 0.0 || viewport.y <= 0.0 {
        return Vec2::ZERO;
    }
    delta / viewport
}

fn rotate(camera: &mut CameraState, frac: Vec2) -> bool {
    if frac == Vec2::ZERO {
        return false;
    }
    camera.angle_y = wrap_degrees(camera.angle_y + 360.0 * frac.x);
    camera.angle_x = (camera.angle_x - 180.0 * frac.y).clamp(-180.0, 0.0);
    true
}

/// Shifts the draw extent against the cursor, following the azimuth so the
/// data moves with the pointer on screen.
fn pan(state: &mut ViewState, frac: Vec2) -> bool {
    if frac == Vec2::ZERO {
        return false;
    }
    let a = f64::from(state.camera.angle_y.to_radians());
    let (sin, cos) = a.sin_cos();
    let (fx, fy) = (f64::from(frac.x), f64::from(frac.y));
    let size = state.draw_extent.size();
    let dx = size.x * (-cos * fx + sin * fy);
    let dy = size.y * (sin * fx + cos * fy);
    state.draw_extent = state.draw_extent.shift(dx, dy, 0.0);
    true
}

fn turn_head(state: &mut ViewState, frac: Vec2) -> bool {
    if frac == Vec2::ZERO {
        return false;
    }
    let mut head = wrap_degrees(state.camera.head_angle + 360.0 * frac.x);
    if !(1.0..=359.0).contains(&head) {
        head = 0.0;
    }
    state.camera.head_angle = head;
    if state.projection.allows_pitch() {
        state.camera.pitch_angle = (state.camera.pitch_angle - 90.0 * frac.y).clamp(-90.0, 0.0);
    }
    true
}

/// Grows (positive ticks) or shrinks the draw extent by `size * ticks / 10`
/// on every side. A zoom that would collapse an axis is refused.
fn zoom(state: &mut ViewState, ticks: f32, modifiers: Modifiers, policy: ZoomPolicy) -> bool {
    if ticks == 0.0 || !ticks.is_finite() {
        return false;
    }
    let f = f64::from(ticks) / 10.0;
    let size = state.draw_extent.size();
    let scale_z = match policy {
        ZoomPolicy::WithXY => true,
        ZoomPolicy::OnModifier => modifiers.ctrl,
    };
    let dz = if scale_z { size.z * f } else { 0.0 };
    let next = state.draw_extent.extend(size.x * f, size.y * f, dz);
    let size = next.size();
    if size.min_element() < MIN_AXIS_SPAN || !next.is_valid() {
        log::debug!("zoom by {ticks} ticks refused: extent would collapse");
        return false;
    }
    state.draw_extent = next;
    true
}

fn undo_zoom(state: &mut ViewState) {
    state.draw_extent = state.full_extent;
    let mode = state.camera.projection_mode;
    state.camera = CameraState {
        projection_mode: mode,
        distance: state.camera.distance,
        fov: state.camera.fov,
        ..CameraState::default()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ViewState {
        ViewState::new(
            Extent3D::new(0.0, 10.0, 0.0, 10.0, 0.0, 10.0),
            Vec2::new(200.0, 100.0),
        )
    }

    fn drag(s: &ViewState, button: PointerButton, from: Vec2, to: Vec2, m: Modifiers) -> ViewState {
        let c = InteractionConfig::default();
        let s = interact(
            s,
            &InteractionEvent::Press {
                position: from,
                button,
                modifiers: m,
            },
            &c,
        )
        .state;
        let s = interact(
            &s,
            &InteractionEvent::Drag {
                position: to,
                modifiers: m,
            },
            &c,
        )
        .state;
        interact(&s, &InteractionEvent::Release { position: to }, &c).state
    }

    #[test]
    fn test_rotate_half_width_adds_180() {
        let s = state();
        let after = drag(&s, PointerButton::Left, Vec2::ZERO, Vec2::new(100.0, 0.0), Modifiers::NONE);
        assert_eq!(after.camera.angle_y, 225.0);

        let mut s = state();
        s.camera.angle_y = 270.0;
        let after = drag(&s, PointerButton::Left, Vec2::ZERO, Vec2::new(100.0, 0.0), Modifiers::NONE);
        assert_eq!(after.camera.angle_y, 90.0);
    }

    #[test]
    fn test_elevation_clamped() {
        let s = state();
        let up = drag(&s, PointerButton::Left, Vec2::ZERO, Vec2::new(0.0, -100.0), Modifiers::NONE);
        assert_eq!(up.camera.angle_x, 0.0);
        let down = drag(&s, PointerButton::Left, Vec2::ZERO, Vec2::new(0.0, 100.0), Modifiers::NONE);
        assert_eq!(down.camera.angle_x, -180.0);
    }

    #[test]
    fn test_shift_drag_pans_instead_of_rotating() {
        let mut s = state();
        s.camera.angle_y = 0.0;
        let after = drag(&s, PointerButton::Left, Vec2::ZERO, Vec2::new(20.0, 0.0), Modifiers::SHIFT);
        assert_eq!(after.camera, s.camera);
        assert!((after.draw_extent.min_x - -1.0).abs() < 1e-6);
        assert!((after.draw_extent.max_x - 9.0).abs() < 1e-6);
        assert_eq!(after.draw_extent.min_z, 0.0);
    }

    #[test]
    fn test_wheel_zoom_out_and_in() {
        let s = state();
        let c = InteractionConfig::default();
        let out = interact(
            &s,
            &InteractionEvent::Wheel {
                ticks: 1.0,
                modifiers: Modifiers::NONE,
            },
            &c,
        );
        assert!(out.repaint);
        assert_eq!(out.state.draw_extent, Extent3D::new(-1.0, 11.0, -1.0, 11.0, -1.0, 11.0));

        let collapse = interact(
            &s,
            &InteractionEvent::Wheel {
                ticks: -5.0,
                modifiers: Modifiers::NONE,
            },
            &c,
        );
        assert!(!collapse.repaint);
        assert_eq!(collapse.state.draw_extent, s.draw_extent);
    }

    #[test]
    fn test_z_zoom_policy() {
        let s = state();
        let c = InteractionConfig {
            z_zoom: ZoomPolicy::OnModifier,
            ..InteractionConfig::default()
        };
        let plain = interact(
            &s,
            &InteractionEvent::Wheel {
                ticks: 1.0,
                modifiers: Modifiers::NONE,
            },
            &c,
        )
        .state;
        assert_eq!((plain.draw_extent.min_z, plain.draw_extent.max_z), (0.0, 10.0));
        let with_ctrl = interact(
            &s,
            &InteractionEvent::Wheel {
                ticks: 1.0,
                modifiers: Modifiers::CTRL,
            },
            &c,
        )
        .state;
        assert_eq!((with_ctrl.draw_extent.min_z, with_ctrl.draw_extent.max_z), (-1.0, 11.0));
    }

    #[test]
    fn test_head_snaps_and_pitch_needs_sphere() {
        let s = state();
        let after = drag(&s, PointerButton::Right, Vec2::ZERO, Vec2::new(-0.5, 50.0), Modifiers::NONE);
        assert_eq!(after.camera.head_angle, 0.0);
        assert_eq!(after.camera.pitch_angle, 0.0);

        let mut globe = state();
        globe.projection = Projection::Spherical { radius: 1.0 };
        let after = drag(&globe, PointerButton::Right, Vec2::ZERO, Vec2::new(50.0, 50.0), Modifiers::NONE);
        assert_eq!(after.camera.head_angle, 90.0);
        assert_eq!(after.camera.pitch_angle, -45.0);
    }

    #[test]
    fn test_undo_zoom_restores_snapshot_exactly() {
        let c = InteractionConfig::default();
        let mut s = state();
        s.full_extent = Extent3D::new(0.1, 9.7, -3.3, 3.3, 1e-3, 2e-3 + 0.5);
        s.draw_extent = s.full_extent;
        s = drag(&s, PointerButton::Left, Vec2::ZERO, Vec2::new(13.0, 7.0), Modifiers::SHIFT);
        s = drag(&s, PointerButton::Left, Vec2::ZERO, Vec2::new(31.0, -17.0), Modifiers::NONE);
        for ticks in [1.0, -2.0, 3.0] {
            s = interact(
                &s,
                &InteractionEvent::Wheel {
                    ticks,
                    modifiers: Modifiers::NONE,
                },
                &c,
            )
            .state;
        }
        assert_ne!(s.draw_extent, s.full_extent);
        let undone = interact(&s, &InteractionEvent::UndoZoom, &c).state;
        assert_eq!(undone.draw_extent, undone.full_extent);
        assert_eq!(undone.camera, CameraState::default());
    }

    #[test]
    fn test_drag_without_press_is_ignored() {
        let s = state();
        let r = interact(
            &s,
            &InteractionEvent::Drag {
                position: Vec2::new(50.0, 0.0),
                modifiers: Modifiers::NONE,
            },
            &InteractionConfig::default(),
        );
        assert!(!r.repaint);
        assert_eq!(r.state, s);
    }

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(wrap_degrees(370.0), 10.0);
        assert_eq!(wrap_degrees(-10.0), 350.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
    }
}
