//! Clip planes bounding graphics to the axes box.
//!
//! A plane keeps the half-space on its normal side and discards the rest.
//! The renderer works in normalized space, so planes built from an axes
//! extent are expressed there.

use glam::{Vec3, Vec4};

use crate::extent::Extent3D;
use crate::transform::Transform;

/// Number of planes in an axes clip box.
pub const MAX_CLIP_PLANES: usize = 6;

/// A half-space `dot(normal, p) + offset >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlane {
    normal: Vec3,
    offset: f32,
}

impl ClipPlane {
    /// Creates a plane through `origin` keeping the `normal` side.
    #[must_use]
    pub fn new(origin: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            offset: -normal.dot(origin),
        }
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Plane coefficients `(a, b, c, d)`.
    pub fn equation(&self) -> Vec4 {
        self.normal.extend(self.offset)
    }

    /// Positive on the kept side.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.offset
    }

    pub fn is_kept(&self, point: Vec3) -> bool {
        self.signed_distance(point) >= 0.0
    }

    /// Projects a point onto the plane.
    pub fn project(&self, point: Vec3) -> Vec3 {
        point - self.signed_distance(point) * self.normal
    }
}

/// The six planes of an axes extent, in normalized space.
///
/// Ordered -x, +x, -y, +y, -z, +z.
#[must_use]
pub fn clip_box(transform: &Transform, axes_extent: &Extent3D) -> [ClipPlane; MAX_CLIP_PLANES] {
    let lo = transform.transform(axes_extent.min());
    let hi = transform.transform(axes_extent.max());
    [
        ClipPlane::new(lo, Vec3::X),
        ClipPlane::new(hi, Vec3::NEG_X),
        ClipPlane::new(lo, Vec3::Y),
        ClipPlane::new(hi, Vec3::NEG_Y),
        ClipPlane::new(lo, Vec3::Z),
        ClipPlane::new(hi, Vec3::NEG_Z),
    ]
}

/// GPU-compatible clip plane block.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ClipPlaneUniforms {
    pub planes: [[f32; 4]; MAX_CLIP_PLANES],
    /// Number of active planes at the front of `planes`.
    pub count: u32,
    pub _padding: [u32; 3],
}

impl ClipPlaneUniforms {
    /// No clipping.
    pub const DISABLED: Self = Self {
        planes: [[0.0; 4]; MAX_CLIP_PLANES],
        count: 0,
        _padding: [0; 3],
    };
}

impl Default for ClipPlaneUniforms {
    fn default() -> Self {
        Self::DISABLED
    }
}

impl From<&[ClipPlane]> for ClipPlaneUniforms {
    #[allow(clippy::cast_possible_truncation)]
    fn from(planes: &[ClipPlane]) -> Self {
        let mut u = Self::DISABLED;
        for (slot, plane) in u.planes.iter_mut().zip(planes) {
            *slot = plane.equation().to_array();
        }
        u.count = planes.len().min(MAX_CLIP_PLANES) as u32;
        u
    }
}
