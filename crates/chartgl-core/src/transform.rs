//! Mapping from data space into the normalized cube used by the renderer.
//!
//! Every axis is mapped linearly with `(v - min) / (max - min) * 2 - 1`, so
//! the active window lands exactly on `[-1, 1]^3`.
//!
//! Degenerate windows are rejected when the extent is assigned: an inverted,
//! non-finite, or narrower-than-[`MIN_AXIS_SPAN`] axis returns
//! [`ChartError::DegenerateExtent`] and leaves the previous window in place.
//! Flat data is expected to be padded with [`Extent3D::with_min_span`] first.

use glam::{DVec3, Mat4, Vec3, Vec4};

use crate::error::{ChartError, Result};
use crate::extent::{Extent3D, MIN_AXIS_SPAN};

/// The active normalization window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
    zmin: f64,
    zmax: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            xmin: -1.0,
            xmax: 1.0,
            ymin: -1.0,
            ymax: 1.0,
            zmin: -1.0,
            zmax: 1.0,
        }
    }
}

fn check_axis(axis: &'static str, min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() || max - min < MIN_AXIS_SPAN {
        return Err(ChartError::DegenerateExtent { axis, min, max });
    }
    Ok(())
}

impl Transform {
    /// Creates a transform for an extent snapshot.
    pub fn new(extent: &Extent3D) -> Result<Self> {
        let mut t = Self::default();
        t.set_extent(extent)?;
        Ok(t)
    }

    /// Replaces all six bounds at once.
    ///
    /// Either every bound is updated or, on error, none is.
    pub fn set_extent(&mut self, extent: &Extent3D) -> Result<()> {
        check_axis("x", extent.min_x, extent.max_x)?;
        check_axis("y", extent.min_y, extent.max_y)?;
        check_axis("z", extent.min_z, extent.max_z)?;
        *self = Self {
            xmin: extent.min_x,
            xmax: extent.max_x,
            ymin: extent.min_y,
            ymax: extent.max_y,
            zmin: extent.min_z,
            zmax: extent.max_z,
        };
        Ok(())
    }

    /// The window as an extent.
    #[must_use]
    pub fn extent(&self) -> Extent3D {
        Extent3D::new(self.xmin, self.xmax, self.ymin, self.ymax, self.zmin, self.zmax)
    }

    #[must_use]
    pub fn transform_x(&self, v: f64) -> f64 {
        (v - self.xmin) / (self.xmax - self.xmin) * 2.0 - 1.0
    }

    #[must_use]
    pub fn transform_y(&self, v: f64) -> f64 {
        (v - self.ymin) / (self.ymax - self.ymin) * 2.0 - 1.0
    }

    #[must_use]
    pub fn transform_z(&self, v: f64) -> f64 {
        (v - self.zmin) / (self.zmax - self.zmin) * 2.0 - 1.0
    }

    /// Maps a data point into normalized space.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn transform(&self, p: DVec3) -> Vec3 {
        Vec3::new(
            self.transform_x(p.x) as f32,
            self.transform_y(p.y) as f32,
            self.transform_z(p.z) as f32,
        )
    }

    /// Maps a data point into normalized space at full precision.
    #[must_use]
    pub fn transform_f64(&self, p: DVec3) -> DVec3 {
        DVec3::new(self.transform_x(p.x), self.transform_y(p.y), self.transform_z(p.z))
    }

    #[must_use]
    pub fn untransform_x(&self, n: f64) -> f64 {
        (n + 1.0) * 0.5 * (self.xmax - self.xmin) + self.xmin
    }

    #[must_use]
    pub fn untransform_y(&self, n: f64) -> f64 {
        (n + 1.0) * 0.5 * (self.ymax - self.ymin) + self.ymin
    }

    #[must_use]
    pub fn untransform_z(&self, n: f64) -> f64 {
        (n + 1.0) * 0.5 * (self.zmax - self.zmin) + self.zmin
    }

    /// Maps a normalized point back into data space.
    #[must_use]
    pub fn untransform(&self, n: Vec3) -> DVec3 {
        DVec3::new(
            self.untransform_x(f64::from(n.x)),
            self.untransform_y(f64::from(n.y)),
            self.untransform_z(f64::from(n.z)),
        )
    }

    /// Per-axis scale and offset with `n = scale * v + offset`.
    #[must_use]
    pub fn scale_offset(&self) -> (DVec3, DVec3) {
        let scale = DVec3::new(
            2.0 / (self.xmax - self.xmin),
            2.0 / (self.ymax - self.ymin),
            2.0 / (self.zmax - self.zmin),
        );
        let offset = DVec3::new(
            -1.0 - self.xmin * scale.x,
            -1.0 - self.ymin * scale.y,
            -1.0 - self.zmin * scale.z,
        );
        (scale, offset)
    }

    /// The normalization as an affine matrix acting on data-space points.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_matrix(&self) -> Mat4 {
        let (s, o) = self.scale_offset();
        Mat4::from_cols(
            Vec4::new(s.x as f32, 0.0, 0.0, 0.0),
            Vec4::new(0.0, s.y as f32, 0.0, 0.0),
            Vec4::new(0.0, 0.0, s.z as f32, 0.0),
            Vec4::new(o.x as f32, o.y as f32, o.z as f32, 1.0),
        )
    }

    /// Matrix taking points normalized under `earlier` into this window.
    ///
    /// Geometry uploaded once under an old window can be re-used after a pan
    /// or zoom by drawing it with this matrix as its model transform.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn relative_to(&self, earlier: &Transform) -> Mat4 {
        let (s_now, o_now) = self.scale_offset();
        let (s_old, o_old) = earlier.scale_offset();
        let s = s_now / s_old;
        let o = o_now - s * o_old;
        Mat4::from_cols(
            Vec4::new(s.x as f32, 0.0, 0.0, 0.0),
            Vec4::new(0.0, s.y as f32, 0.0, 0.0),
            Vec4::new(0.0, 0.0, s.z as f32, 0.0),
            Vec4::new(o.x as f32, o.y as f32, o.z as f32, 1.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn extent() -> Extent3D {
        Extent3D::new(0.0, 10.0, -5.0, 5.0, 100.0, 200.0)
    }

    #[test]
    fn test_corners_map_to_cube_corners() {
        let t = Transform::new(&extent()).unwrap();
        assert_eq!(t.transform(extent().min()), Vec3::splat(-1.0));
        assert_eq!(t.transform(extent().max()), Vec3::splat(1.0));
        assert_eq!(t.transform(extent().center()), Vec3::ZERO);
    }

    #[test]
    fn test_degenerate_extent_rejected() {
        let mut t = Transform::new(&extent()).unwrap();
        let flat = Extent3D::new(0.0, 10.0, 0.0, 10.0, 3.0, 3.0);
        let err = t.set_extent(&flat).unwrap_err();
        assert!(matches!(err, ChartError::DegenerateExtent { axis: "z", .. }));
        // previous window untouched
        assert_eq!(t.extent(), extent());

        let inverted = Extent3D::new(1.0, 0.0, 0.0, 1.0, 0.0, 1.0);
        assert!(t.set_extent(&inverted).is_err());
        let nan = Extent3D::new(0.0, 1.0, f64::NAN, 1.0, 0.0, 1.0);
        assert!(t.set_extent(&nan).is_err());
    }

    #[test]
    fn test_padded_flat_extent_accepted() {
        let flat = Extent3D::new(0.0, 10.0, 0.0, 10.0, 3.0, 3.0).with_min_span();
        let t = Transform::new(&flat).unwrap();
        assert!((t.transform_z(3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_matrix_matches_scalar_path() {
        let t = Transform::new(&extent()).unwrap();
        let p = DVec3::new(2.5, 1.0, 150.0);
        let via_matrix = t.to_matrix().transform_point3(p.as_vec3());
        assert!((via_matrix - t.transform(p)).length() < 1e-5);
    }

    #[test]
    fn test_relative_to_remaps_uploaded_geometry() {
        let old = Transform::new(&extent()).unwrap();
        let new = Transform::new(&extent().shift(2.0, -1.0, 10.0).extend(1.0, 0.0, 5.0)).unwrap();
        let p = DVec3::new(7.0, -2.0, 130.0);
        let remapped = new.relative_to(&old).transform_point3(old.transform(p));
        assert!((remapped - new.transform(p)).length() < 1e-5);
    }

    proptest! {
        #[test]
        fn prop_points_inside_map_into_unit_cube(
            x0 in -1e6f64..1e6, w in 1e-3f64..1e6,
            y0 in -1e6f64..1e6, h in 1e-3f64..1e6,
            z0 in -1e6f64..1e6, d in 1e-3f64..1e6,
            fx in 0.0f64..=1.0, fy in 0.0f64..=1.0, fz in 0.0f64..=1.0,
        ) {
            let e = Extent3D::new(x0, x0 + w, y0, y0 + h, z0, z0 + d);
            let t = Transform::new(&e).unwrap();
            let p = DVec3::new(x0 + fx * w, y0 + fy * h, z0 + fz * d);
            let n = t.transform_f64(p);
            prop_assert!(n.x >= -1.0 - 1e-9 && n.x <= 1.0 + 1e-9);
            prop_assert!(n.y >= -1.0 - 1e-9 && n.y <= 1.0 + 1e-9);
            prop_assert!(n.z >= -1.0 - 1e-9 && n.z <= 1.0 + 1e-9);
        }

        #[test]
        fn prop_round_trip(
            x0 in -1e3f64..1e3, w in 1e-2f64..1e3,
            fx in 0.0f64..=1.0, fy in 0.0f64..=1.0, fz in 0.0f64..=1.0,
        ) {
            let e = Extent3D::new(x0, x0 + w, x0, x0 + 2.0 * w, -w, w);
            let t = Transform::new(&e).unwrap();
            let p = DVec3::new(x0 + fx * w, x0 + fy * 2.0 * w, -w + fz * 2.0 * w);
            let n = t.transform_f64(p);
            let back = DVec3::new(t.untransform_x(n.x), t.untransform_y(n.y), t.untransform_z(n.z));
            prop_assert!((back - p).length() <= 1e-9 * (1.0 + p.length()));
        }
    }
}
