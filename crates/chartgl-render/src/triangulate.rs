//! Ear-clipping triangulation of simple polygons with holes.

use glam::{DVec3, Vec2};

fn signed_area(points: &[Vec2], ring: &[usize]) -> f32 {
    let mut area = 0.0;
    for (i, &a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        area += points[a].perp_dot(points[b]);
    }
    area * 0.5
}

fn cross(o: Vec2, a: Vec2, b: Vec2) -> f32 {
    (a - o).perp_dot(b - o)
}

fn in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    cross(a, b, p) >= 0.0 && cross(b, c, p) >= 0.0 && cross(c, a, p) >= 0.0
}

/// Splices `hole` into `outer` through a bridge from the hole's rightmost vertex.
fn bridge(points: &[Vec2], outer: &mut Vec<usize>, hole: &[usize]) {
    let Some((m, &hp)) = hole
        .iter()
        .enumerate()
        .max_by(|a, b| points[*a.1].x.total_cmp(&points[*b.1].x))
    else {
        return;
    };
    let h = points[hp];
    // Prefer outer vertices to the right of the hole, closest first.
    let k = outer
        .iter()
        .enumerate()
        .filter(|(_, &o)| points[o].x >= h.x)
        .min_by(|a, b| {
            points[*a.1]
                .distance_squared(h)
                .total_cmp(&points[*b.1].distance_squared(h))
        })
        .or_else(|| {
            outer.iter().enumerate().min_by(|a, b| {
                points[*a.1]
                    .distance_squared(h)
                    .total_cmp(&points[*b.1].distance_squared(h))
            })
        })
        .map(|(k, _)| k);
    let Some(k) = k else { return };

    let mut spliced = Vec::with_capacity(outer.len() + hole.len() + 2);
    spliced.extend_from_slice(&outer[..=k]);
    spliced.extend(hole[m..].iter().chain(&hole[..=m]));
    spliced.extend_from_slice(&outer[k..]);
    *outer = spliced;
}

/// Triangulates a polygon given as an exterior ring plus hole rings.
///
/// Vertex indices refer to the exterior followed by each hole in order.
/// Rings may be in either winding order and must not repeat their first point.
#[must_use]
pub fn triangulate(exterior: &[Vec2], holes: &[Vec<Vec2>]) -> Vec<[u32; 3]> {
    if exterior.len() < 3 {
        return Vec::new();
    }
    let mut points: Vec<Vec2> = exterior.to_vec();
    let mut ring: Vec<usize> = (0..exterior.len()).collect();
    if signed_area(&points, &ring) < 0.0 {
        ring.reverse();
    }

    let mut hole_rings = Vec::new();
    for hole in holes {
        let start = points.len();
        points.extend_from_slice(hole);
        if hole.len() < 3 {
            continue;
        }
        let mut r: Vec<usize> = (start..points.len()).collect();
        if signed_area(&points, &r) > 0.0 {
            r.reverse();
        }
        hole_rings.push(r);
    }
    hole_rings.sort_by(|a, b| {
        let ax = a.iter().map(|&i| points[i].x).fold(f32::MIN, f32::max);
        let bx = b.iter().map(|&i| points[i].x).fold(f32::MIN, f32::max);
        bx.total_cmp(&ax)
    });
    for hole in &hole_rings {
        bridge(&points, &mut ring, hole);
    }

    clip_ears(&points, ring)
}

#[allow(clippy::cast_possible_truncation)]
fn clip_ears(points: &[Vec2], mut ring: Vec<usize>) -> Vec<[u32; 3]> {
    let mut triangles = Vec::with_capacity(ring.len().saturating_sub(2));
    let mut i = 0;
    let mut misses = 0;
    while ring.len() > 3 {
        let n = ring.len();
        let (ia, ib, ic) = (ring[(i + n - 1) % n], ring[i % n], ring[(i + 1) % n]);
        let (a, b, c) = (points[ia], points[ib], points[ic]);
        let convex = cross(a, b, c) > f32::EPSILON;
        let is_ear = convex
            && !ring.iter().any(|&j| {
                let p = points[j];
                p != a && p != b && p != c && in_triangle(p, a, b, c)
            });
        // A full pass without an ear means the rest is degenerate; clip anyway.
        if is_ear || misses >= n {
            triangles.push([ia as u32, ib as u32, ic as u32]);
            ring.remove(i % n);
            misses = 0;
            i %= ring.len();
        } else {
            i = (i + 1) % n;
            misses += 1;
        }
    }
    if ring.len() == 3 && cross(points[ring[0]], points[ring[1]], points[ring[2]]).abs() > 0.0 {
        triangles.push([ring[0] as u32, ring[1] as u32, ring[2] as u32]);
    }
    triangles
}

/// Newell normal of a 3D ring.
#[must_use]
pub fn ring_normal(ring: &[DVec3]) -> DVec3 {
    let mut n = DVec3::ZERO;
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

/// Drops the coordinate along the dominant normal axis.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn flatten(points: &[DVec3], normal: DVec3) -> Vec<Vec2> {
    let a = normal.abs();
    points
        .iter()
        .map(|p| {
            if a.z >= a.x && a.z >= a.y {
                Vec2::new(p.x as f32, p.y as f32)
            } else if a.y >= a.x {
                Vec2::new(p.z as f32, p.x as f32)
            } else {
                Vec2::new(p.y as f32, p.z as f32)
            }
        })
        .collect()
}
