//! Camera state, projection strategies and screen-space projection.

use glam::{DVec3, Mat4, Vec2, Vec3, Vec4Swizzles};
use serde::{Deserialize, Serialize};

/// Camera projection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionMode {
    /// Perspective projection.
    #[default]
    Perspective,
    /// Orthographic projection.
    Orthographic,
}

/// Camera angles and distance, all angles in degrees.
///
/// Only the interaction model writes these; the renderer reads them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    /// Elevation, rotation about X, in `[-180, 0]`.
    pub angle_x: f32,
    /// Azimuth, rotation about Z, in `[0, 360)`.
    pub angle_y: f32,
    /// Head rotation, in `[0, 360)`.
    pub head_angle: f32,
    /// Pitch, in `[-90, 0]`. Used by spherical projections.
    pub pitch_angle: f32,
    pub projection_mode: ProjectionMode,
    /// Distance from the eye to the center of the normalized cube.
    pub distance: f32,
    /// Vertical field of view.
    pub fov: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            angle_x: -45.0,
            angle_y: 45.0,
            head_angle: 0.0,
            pitch_angle: 0.0,
            projection_mode: ProjectionMode::Perspective,
            distance: 5.0,
            fov: 45.0,
        }
    }
}

impl CameraState {
    /// The view matrix.
    ///
    /// Composed as translate, pitch, elevation, azimuth and finally head, so
    /// head rotation acts on the scene before elevation and azimuth.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -self.distance))
            * Mat4::from_rotation_x(self.pitch_angle.to_radians())
            * Mat4::from_rotation_x(self.angle_x.to_radians())
            * Mat4::from_rotation_z(self.angle_y.to_radians())
            * Mat4::from_rotation_y(self.head_angle.to_radians())
    }

    /// The projection matrix for the given aspect ratio (width / height).
    #[must_use]
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        let aspect = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            aspect_ratio
        } else {
            1.0
        };
        let near = 0.01;
        let far = self.distance * 4.0 + 10.0;
        match self.projection_mode {
            ProjectionMode::Perspective => {
                Mat4::perspective_rh(self.fov.to_radians(), aspect, near, far)
            }
            ProjectionMode::Orthographic => {
                // Same apparent size as perspective at the cube center.
                let half_height = self.distance * (self.fov.to_radians() * 0.5).tan();
                let half_width = half_height * aspect;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    -far,
                    far,
                )
            }
        }
    }

    /// Eye position in normalized space.
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        self.view_matrix().inverse().w_axis.xyz()
    }

    /// Camera right and up directions in normalized space.
    #[must_use]
    pub fn right_up(&self) -> (Vec3, Vec3) {
        let inv = self.view_matrix().inverse();
        (inv.x_axis.xyz().normalize(), inv.y_axis.xyz().normalize())
    }
}

/// How data coordinates become world coordinates before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Projection {
    /// Data coordinates are world coordinates.
    #[default]
    Flat,
    /// `x` = longitude, `y` = latitude (degrees), `z` = altitude above a sphere.
    Spherical { radius: f64 },
}

impl Projection {
    /// Maps a data point into world space.
    #[must_use]
    pub fn project(&self, p: DVec3) -> DVec3 {
        match self {
            Self::Flat => p,
            Self::Spherical { radius } => {
                let (lon, lat) = (p.x.to_radians(), p.y.to_radians());
                let r = radius + p.z;
                DVec3::new(
                    r * lat.cos() * lon.cos(),
                    r * lat.cos() * lon.sin(),
                    r * lat.sin(),
                )
            }
        }
    }

    /// Whether right-drag may change the pitch angle.
    #[must_use]
    pub fn allows_pitch(&self) -> bool {
        matches!(self, Self::Spherical { .. })
    }

    #[must_use]
    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Flat)
    }
}

/// Matrices captured at the start of a frame for placing screen-space text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionSnapshot {
    pub view: Mat4,
    pub projection: Mat4,
    /// Viewport size in pixels.
    pub viewport: Vec2,
}

impl ProjectionSnapshot {
    #[must_use]
    pub fn new(camera: &CameraState, viewport: Vec2) -> Self {
        Self {
            view: camera.view_matrix(),
            projection: camera.projection_matrix(viewport.x / viewport.y),
            viewport,
        }
    }

    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Projects a normalized-space point to pixel coordinates (origin top-left).
    ///
    /// Returns `None` for points behind the eye.
    #[must_use]
    pub fn to_screen(&self, p: Vec3) -> Option<Vec2> {
        let clip = self.view_projection() * p.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.viewport.x,
            (1.0 - ndc.y) * 0.5 * self.viewport.y,
        ))
    }

    /// Depth of a point along the view direction (larger is farther).
    #[must_use]
    pub fn view_depth(&self, p: Vec3) -> f32 {
        -(self.view * p.extend(1.0)).z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_defaults() {
        let c = CameraState::default();
        assert_eq!(c.angle_x, -45.0);
        assert_eq!(c.angle_y, 45.0);
        assert_eq!(c.head_angle, 0.0);
        assert_eq!(c.pitch_angle, 0.0);
        assert_eq!(c.projection_mode, ProjectionMode::Perspective);
    }

    #[test]
    fn test_top_view_looks_down_z() {
        let c = CameraState {
            angle_x: 0.0,
            angle_y: 0.0,
            ..CameraState::default()
        };
        let eye = c.eye();
        assert!((eye - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn test_side_view_puts_z_up() {
        let c = CameraState {
            angle_x: -90.0,
            angle_y: 0.0,
            ..CameraState::default()
        };
        let (_, up) = c.right_up();
        assert!((up - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_cube_fits_viewport() {
        let c = CameraState::default();
        let snap = ProjectionSnapshot::new(&c, Vec2::new(800.0, 600.0));
        for corner in [Vec3::splat(-1.0), Vec3::splat(1.0), Vec3::new(1.0, -1.0, 1.0)] {
            let s = snap.to_screen(corner).unwrap();
            assert!(s.x > 0.0 && s.x < 800.0, "{s:?}");
            assert!(s.y > 0.0 && s.y < 600.0, "{s:?}");
        }
        let center = snap.to_screen(Vec3::ZERO).unwrap();
        assert!((center - Vec2::new(400.0, 300.0)).length() < 1e-3);
    }

    #[test]
    fn test_orthographic_projection() {
        let c = CameraState {
            projection_mode: ProjectionMode::Orthographic,
            ..CameraState::default()
        };
        let proj = c.projection_matrix(1.0);
        assert!((proj.w_axis.w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_spherical_projection() {
        let p = Projection::Spherical { radius: 1.0 };
        let q = p.project(DVec3::new(90.0, 0.0, 0.0));
        assert!((q - DVec3::Y).length() < 1e-12);
        let pole = p.project(DVec3::new(0.0, 90.0, 1.0));
        assert!((pole - DVec3::new(0.0, 0.0, 2.0)).length() < 1e-12);
        assert!(p.allows_pitch());
        assert!(!Projection::Flat.allows_pitch());
    }
}
