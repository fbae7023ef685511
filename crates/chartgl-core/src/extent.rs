//! Axis-aligned bounding boxes in data space.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Smallest span a transform accepts on any axis.
pub const MIN_AXIS_SPAN: f64 = 1e-12;

/// Half-span used to pad a flat (zero-width) axis before it is displayed.
pub const FLAT_AXIS_PAD: f64 = 0.5;

/// An axis-aligned bounding box in world coordinates.
///
/// Extents are plain values: assigning one component's extent to another
/// copies it, so later mutation of either side never leaks across.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent3D {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl Default for Extent3D {
    fn default() -> Self {
        Self::new(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0)
    }
}

impl Extent3D {
    /// Creates an extent from the six bounds.
    #[must_use]
    pub const fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64, min_z: f64, max_z: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            min_z,
            max_z,
        }
    }

    /// Creates an extent spanning two corner points.
    #[must_use]
    pub fn from_corners(min: DVec3, max: DVec3) -> Self {
        Self::new(min.x, max.x, min.y, max.y, min.z, max.z)
    }

    /// Computes the tight extent of a point set. Returns `None` for an empty set.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a DVec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self::from_corners(min, max))
    }

    /// Minimum corner.
    #[must_use]
    pub fn min(&self) -> DVec3 {
        DVec3::new(self.min_x, self.min_y, self.min_z)
    }

    /// Maximum corner.
    #[must_use]
    pub fn max(&self) -> DVec3 {
        DVec3::new(self.max_x, self.max_y, self.max_z)
    }

    /// Span along X.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Span along Y.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Span along Z.
    #[must_use]
    pub fn depth(&self) -> f64 {
        self.max_z - self.min_z
    }

    /// All three spans as a vector.
    #[must_use]
    pub fn size(&self) -> DVec3 {
        self.max() - self.min()
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> DVec3 {
        (self.min() + self.max()) * 0.5
    }

    /// Returns the bounds of one axis (0 = x, 1 = y, 2 = z).
    #[must_use]
    pub fn axis_range(&self, axis: usize) -> (f64, f64) {
        match axis {
            0 => (self.min_x, self.max_x),
            1 => (self.min_y, self.max_y),
            _ => (self.min_z, self.max_z),
        }
    }

    /// Whether every bound is finite and `min <= max` on each axis.
    ///
    /// Zero-size axes are valid here; they are only rejected once they reach
    /// a [`Transform`](crate::transform::Transform).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [
            self.min_x, self.max_x, self.min_y, self.max_y, self.min_z, self.max_z,
        ]
        .iter()
        .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
            && self.min_z <= self.max_z
    }

    /// Whether the point lies inside (boundary included).
    #[must_use]
    pub fn contains(&self, p: DVec3) -> bool {
        p.x >= self.min_x
            && p.x <= self.max_x
            && p.y >= self.min_y
            && p.y <= self.max_y
            && p.z >= self.min_z
            && p.z <= self.max_z
    }

    /// Smallest extent containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::from_corners(self.min().min(other.min()), self.max().max(other.max()))
    }

    /// Grows each side outward by the given amounts (negative shrinks).
    #[must_use]
    pub fn extend(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(
            self.min_x - dx,
            self.max_x + dx,
            self.min_y - dy,
            self.max_y + dy,
            self.min_z - dz,
            self.max_z + dz,
        )
    }

    /// Translates the whole box.
    #[must_use]
    pub fn shift(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(
            self.min_x + dx,
            self.max_x + dx,
            self.min_y + dy,
            self.max_y + dy,
            self.min_z + dz,
            self.max_z + dz,
        )
    }

    /// Pads every axis narrower than [`MIN_AXIS_SPAN`] so it can be displayed.
    ///
    /// A flat axis is widened symmetrically around its value by
    /// [`FLAT_AXIS_PAD`], or by 5% of the value when that is larger.
    #[must_use]
    pub fn with_min_span(&self) -> Self {
        fn pad(min: f64, max: f64) -> (f64, f64) {
            if max - min >= MIN_AXIS_SPAN {
                return (min, max);
            }
            let c = (min + max) * 0.5;
            let half = FLAT_AXIS_PAD.max(c.abs() * 0.05);
            (c - half, c + half)
        }
        let (min_x, max_x) = pad(self.min_x, self.max_x);
        let (min_y, max_y) = pad(self.min_y, self.max_y);
        let (min_z, max_z) = pad(self.min_z, self.max_z);
        Self::new(min_x, max_x, min_y, max_y, min_z, max_z)
    }

    /// The eight corner points.
    #[must_use]
    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min(), self.max());
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(b.x, b.y, b.z),
            DVec3::new(a.x, b.y, b.z),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_union_and_size() {
        let a = Extent3D::new(0.0, 1.0, 0.0, 2.0, 0.0, 3.0);
        let b = Extent3D::new(-1.0, 0.5, 1.0, 4.0, 2.0, 2.5);
        let u = a.union(&b);
        assert_eq!(u, Extent3D::new(-1.0, 1.0, 0.0, 4.0, 0.0, 3.0));
        assert_eq!(u.size(), DVec3::new(2.0, 4.0, 3.0));
    }

    #[test]
    fn test_from_points() {
        let pts = [DVec3::new(1.0, 5.0, -2.0), DVec3::new(-3.0, 2.0, 4.0)];
        let e = Extent3D::from_points(&pts).unwrap();
        assert_eq!(e, Extent3D::new(-3.0, 1.0, 2.0, 5.0, -2.0, 4.0));
        assert!(Extent3D::from_points(&[] as &[DVec3]).is_none());
    }

    #[test]
    fn test_extend_and_shift() {
        let e = Extent3D::new(0.0, 10.0, 0.0, 10.0, 0.0, 10.0);
        assert_eq!(e.extend(1.0, 2.0, 0.0), Extent3D::new(-1.0, 11.0, -2.0, 12.0, 0.0, 10.0));
        assert_eq!(e.shift(1.0, 0.0, -1.0), Extent3D::new(1.0, 11.0, 0.0, 10.0, -1.0, 9.0));
    }

    #[test]
    fn test_validity() {
        assert!(Extent3D::new(0.0, 0.0, 0.0, 1.0, 0.0, 1.0).is_valid());
        assert!(!Extent3D::new(1.0, 0.0, 0.0, 1.0, 0.0, 1.0).is_valid());
        assert!(!Extent3D::new(0.0, f64::NAN, 0.0, 1.0, 0.0, 1.0).is_valid());
    }

    #[test]
    fn test_flat_axis_padding() {
        let flat = Extent3D::new(0.0, 10.0, 0.0, 10.0, 500.0, 500.0);
        let padded = flat.with_min_span();
        assert_eq!(padded.min_x, 0.0);
        assert_eq!(padded.max_x, 10.0);
        assert!((padded.min_z - 475.0).abs() < 1e-9);
        assert!((padded.max_z - 525.0).abs() < 1e-9);

        let at_zero = Extent3D::new(0.0, 1.0, 0.0, 1.0, 0.0, 0.0).with_min_span();
        assert_eq!((at_zero.min_z, at_zero.max_z), (-0.5, 0.5));
    }

    fn arb_extent() -> impl Strategy<Value = Extent3D> {
        (
            -1e3f64..1e3,
            0.0f64..1e3,
            -1e3f64..1e3,
            0.0f64..1e3,
            -1e3f64..1e3,
            0.0f64..1e3,
        )
            .prop_map(|(x, w, y, h, z, d)| Extent3D::new(x, x + w, y, y + h, z, z + d))
    }

    proptest! {
        #[test]
        fn prop_union_contains_both(a in arb_extent(), b in arb_extent()) {
            let u = a.union(&b);
            prop_assert!(u.is_valid());
            for c in a.corners().into_iter().chain(b.corners()) {
                prop_assert!(u.contains(c));
            }
            prop_assert_eq!(u, b.union(&a));
        }

        #[test]
        fn prop_from_points_contains_every_point(
            pts in prop::collection::vec((-1e3f64..1e3, -1e3f64..1e3, -1e3f64..1e3), 1..32),
        ) {
            let pts: Vec<DVec3> = pts.into_iter().map(|(x, y, z)| DVec3::new(x, y, z)).collect();
            let e = Extent3D::from_points(&pts).unwrap();
            for p in &pts {
                prop_assert!(e.contains(*p));
            }
        }

        #[test]
        fn prop_min_span_pads_only_flat_axes(e in arb_extent()) {
            let padded = e.with_min_span();
            prop_assert!(padded.size().min_element() >= MIN_AXIS_SPAN);
            prop_assert!(padded.contains(e.center()));
            if e.width() >= MIN_AXIS_SPAN {
                prop_assert_eq!((padded.min_x, padded.max_x), (e.min_x, e.max_x));
            }
        }
    }
}
