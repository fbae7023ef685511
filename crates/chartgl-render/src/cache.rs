//! Render-buffer cache for expensive graphics.
//!
//! Entries are keyed by [`GraphicId`] and remember the graphic version and
//! the transform their geometry was normalized under. A later frame reuses
//! the upload by drawing it with [`Transform::relative_to`] as the model
//! matrix, so pans and zooms do not re-upload anything.

use std::collections::{HashMap, HashSet};

use chartgl_core::{GraphicId, Mat4, Projection, Transform};

use crate::backend::GeometryHandle;

/// Largest scale change or offset (in normalized units) a cached upload may be
/// re-mapped by before f32 precision becomes visible.
const MAX_REMAP: f64 = 1.0e3;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub handle: GeometryHandle,
    pub version: u64,
    /// Transform the geometry was tessellated under.
    pub transform: Transform,
    pub projection: Projection,
    pub dpi_scale: f32,
}

impl CacheEntry {
    /// Model matrix re-mapping this upload into `current`, or `None` if the
    /// remap is too large and the geometry should be rebuilt.
    #[must_use]
    pub fn model_matrix(&self, current: &Transform) -> Option<Mat4> {
        let (s_now, o_now) = current.scale_offset();
        let (s_old, o_old) = self.transform.scale_offset();
        let s = s_now / s_old;
        let o = o_now - s * o_old;
        let within = s.to_array().iter().all(|v| (1.0 / MAX_REMAP..=MAX_REMAP).contains(v))
            && o.abs().max_element() <= MAX_REMAP;
        within.then(|| current.relative_to(&self.transform))
    }
}

/// Cached uploads owned by one render engine.
#[derive(Debug, Default)]
pub struct BufferCache {
    entries: HashMap<GraphicId, CacheEntry>,
}

impl BufferCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: GraphicId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: GraphicId) -> Option<&CacheEntry> {
        self.entries.get(&id)
    }

    /// The entry for `id` if it is still valid for this version and view setup.
    #[allow(clippy::float_cmp)]
    pub fn lookup(
        &self,
        id: GraphicId,
        version: u64,
        projection: Projection,
        dpi_scale: f32,
    ) -> Option<&CacheEntry> {
        self.entries.get(&id).filter(|e| {
            e.version == version && e.projection == projection && e.dpi_scale == dpi_scale
        })
    }

    /// Stores an upload, returning the handle it replaced.
    pub fn insert(&mut self, id: GraphicId, entry: CacheEntry) -> Option<GeometryHandle> {
        self.entries.insert(id, entry).map(|old| old.handle)
    }

    /// Drops the entry for `id`, returning its handle for release.
    pub fn invalidate(&mut self, id: GraphicId) -> Option<GeometryHandle> {
        self.entries.remove(&id).map(|e| e.handle)
    }

    /// Drops entries whose graphic no longer exists, returning their handles.
    pub fn sweep(&mut self, live: &HashSet<GraphicId>) -> Vec<GeometryHandle> {
        let dead: Vec<GraphicId> = self
            .entries
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        if !dead.is_empty() {
            log::debug!("sweeping {} stale cache entries", dead.len());
        }
        dead.into_iter().filter_map(|id| self.invalidate(id)).collect()
    }

    /// Empties the cache, returning every handle for release.
    pub fn clear(&mut self) -> Vec<GeometryHandle> {
        self.entries.drain().map(|(_, e)| e.handle).collect()
    }

    /// Forgets every entry without releasing; used after a context loss.
    pub fn discard_all(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartgl_core::{DVec3, Extent3D, Vec3};
    use proptest::prelude::*;

    fn entry(handle: u64, version: u64, extent: Extent3D) -> CacheEntry {
        CacheEntry {
            handle: GeometryHandle(handle),
            version,
            transform: Transform::new(&extent).unwrap(),
            projection: Projection::Flat,
            dpi_scale: 1.0,
        }
    }

    #[test]
    fn test_lookup_checks_version() {
        let mut cache = BufferCache::new();
        let id = GraphicId::next();
        assert!(cache.insert(id, entry(1, 3, Extent3D::default())).is_none());
        assert!(cache.lookup(id, 3, Projection::Flat, 1.0).is_some());
        assert!(cache.lookup(id, 4, Projection::Flat, 1.0).is_none());
        assert!(cache
            .lookup(id, 3, Projection::Spherical { radius: 1.0 }, 1.0)
            .is_none());
        assert!(cache.lookup(id, 3, Projection::Flat, 2.0).is_none());
    }

    #[test]
    fn test_insert_returns_replaced_handle() {
        let mut cache = BufferCache::new();
        let id = GraphicId::next();
        cache.insert(id, entry(1, 0, Extent3D::default()));
        assert_eq!(cache.insert(id, entry(2, 1, Extent3D::default())), Some(GeometryHandle(1)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sweep_releases_dead_entries() {
        let mut cache = BufferCache::new();
        let (a, b) = (GraphicId::next(), GraphicId::next());
        cache.insert(a, entry(1, 0, Extent3D::default()));
        cache.insert(b, entry(2, 0, Extent3D::default()));
        let live: HashSet<_> = [a].into_iter().collect();
        assert_eq!(cache.sweep(&live), vec![GeometryHandle(2)]);
        assert!(cache.contains(a));
        assert!(!cache.contains(b));
    }

    #[test]
    fn test_clear_and_discard() {
        let mut cache = BufferCache::new();
        cache.insert(GraphicId::next(), entry(1, 0, Extent3D::default()));
        cache.insert(GraphicId::next(), entry(2, 0, Extent3D::default()));
        let mut handles = cache.clear();
        handles.sort();
        assert_eq!(handles, vec![GeometryHandle(1), GeometryHandle(2)]);

        cache.insert(GraphicId::next(), entry(3, 0, Extent3D::default()));
        assert_eq!(cache.discard_all(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_model_matrix_remaps_pan() {
        let e = entry(1, 0, Extent3D::new(0.0, 10.0, 0.0, 10.0, 0.0, 10.0));
        let panned = Transform::new(&Extent3D::new(5.0, 15.0, 0.0, 10.0, 0.0, 10.0)).unwrap();
        let m = e.model_matrix(&panned).unwrap();
        // data x = 10 was at +1, is now at 0
        let p = m.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p.x - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_model_matrix_refuses_extreme_zoom() {
        let e = entry(1, 0, Extent3D::new(0.0, 1.0e6, 0.0, 1.0, 0.0, 1.0));
        let zoomed = Transform::new(&Extent3D::new(0.0, 1.0, 0.0, 1.0, 0.0, 1.0)).unwrap();
        assert!(e.model_matrix(&zoomed).is_none());
    }

    proptest! {
        #[test]
        fn prop_remapped_upload_matches_fresh_tessellation(
            x0 in -5.0f64..5.0, w in 2.0f64..20.0,
            y0 in -5.0f64..5.0, h in 2.0f64..20.0,
            px in 0.0f64..10.0, py in 0.0f64..10.0, pz in 0.0f64..10.0,
        ) {
            let original = Extent3D::new(0.0, 10.0, 0.0, 10.0, 0.0, 10.0);
            let e = entry(1, 0, original);
            let now = Transform::new(&Extent3D::new(x0, x0 + w, y0, y0 + h, 0.0, 10.0)).unwrap();
            let m = e.model_matrix(&now).unwrap();

            let p = DVec3::new(px, py, pz);
            let cached = m.transform_point3(e.transform.transform(p));
            let fresh = now.transform(p);
            prop_assert!((cached - fresh).abs().max_element() < 1e-3);
        }
    }
}
