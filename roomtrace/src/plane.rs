//! Plane construction and mesh slicing.
//!
//! Slicing intersects every mesh triangle with a plane, yielding one line
//! segment per triangle the plane cuts through exactly two edges. Segments
//! can then be joined into polylines by endpoint matching. The joining
//! assumes the intersection outline is convex; on non-convex outlines the
//! polyline order is undefined.

use crate::mesh::{Mesh, Triangle};
use roomtrace_core::math::Vec3;
use std::collections::BTreeMap;

const SEGMENT_EPSILON: f64 = 1e-9;

/// An oriented plane with an in-plane basis.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// A point on the plane.
    pub point: Vec3,
    /// Plane normal.
    pub normal: Vec3,
    /// First in-plane basis vector.
    pub u: Vec3,
    /// Second in-plane basis vector.
    pub v: Vec3,
}

/// Returns a vector perpendicular to `a`, preferring the XY plane.
fn perpendicular(a: Vec3) -> Vec3 {
    if a.x == 0.0 && a.y == 0.0 {
        if a.z == 0.0 {
            return Vec3::ZERO;
        }
        return Vec3::Y;
    }
    Vec3::new(-a.y, a.x, 0.0).normalize()
}

/// Bit-exact map key for segment endpoints.
fn endpoint_key(v: Vec3) -> [u64; 3] {
    [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()]
}

impl Plane {
    /// Builds a plane through `point` with the given normal, deriving the
    /// in-plane basis `u` ⟂ `normal`, `v = u × normal`.
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        let u = perpendicular(normal).normalize();
        let v = u.cross(normal).normalize();
        Self {
            point,
            normal,
            u,
            v,
        }
    }

    /// Projects a 3D point into the plane's (u, v) coordinates.
    pub fn project(&self, point: Vec3) -> Vec3 {
        let d = point - self.point;
        Vec3::new(d.dot(self.u), d.dot(self.v), 0.0)
    }

    /// Whether the point lies on the normal side of the plane.
    pub fn point_in_front(&self, point: Vec3) -> bool {
        (point - self.point).dot(self.normal) > 0.0
    }

    fn intersect_edge(&self, v0: Vec3, v1: Vec3) -> Option<Vec3> {
        let u = v1 - v0;
        let w = v0 - self.point;
        let d = self.normal.dot(u);
        if d.abs() < SEGMENT_EPSILON {
            return None;
        }
        let t = -self.normal.dot(w) / d;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }
        Some(v0 + u * t)
    }

    /// Intersects the plane with a triangle.
    ///
    /// Returns the segment where the plane crosses exactly two edges,
    /// oriented so that walking p1 → p2 keeps the triangle's front side on
    /// the plane-normal side. Vertices lying exactly on the plane can
    /// collapse the segment to a point; those are discarded.
    pub fn intersect_triangle(&self, tri: &Triangle) -> Option<(Vec3, Vec3)> {
        let e01 = self.intersect_edge(tri.v0, tri.v1);
        let e12 = self.intersect_edge(tri.v1, tri.v2);
        let e20 = self.intersect_edge(tri.v2, tri.v0);
        let (p1, p2) = match (e01, e12, e20) {
            (Some(a), Some(b), _) => (a, b),
            (Some(a), None, Some(b)) => (a, b),
            (None, Some(a), Some(b)) => (a, b),
            _ => return None,
        };
        if p1 == p2 {
            return None;
        }
        let n = (p2 - p1).cross(self.normal);
        if n.dot(tri.normal) < 0.0 {
            Some((p1, p2))
        } else {
            Some((p2, p1))
        }
    }

    /// Slices the mesh, returning one unordered segment per cut triangle.
    pub fn slice_mesh(&self, mesh: &Mesh) -> Vec<(Vec3, Vec3)> {
        mesh.triangles()
            .iter()
            .filter_map(|tri| self.intersect_triangle(tri))
            .collect()
    }

    /// Slices the mesh and joins the segments into polylines.
    pub fn polylines(&self, mesh: &Mesh) -> Vec<Vec<Vec3>> {
        join_segments(self.slice_mesh(mesh))
    }
}

/// Joins segments into polylines by matching endpoints.
///
/// Each segment is keyed by its first endpoint; chains extend forward via
/// the lookup and fall back to a scan for segments that continue the chain
/// in reversed orientation.
pub fn join_segments(segments: Vec<(Vec3, Vec3)>) -> Vec<Vec<Vec3>> {
    let mut front: BTreeMap<[u64; 3], (Vec3, Vec3)> = segments
        .into_iter()
        .map(|seg| (endpoint_key(seg.0), seg))
        .collect();

    let mut result = Vec::new();
    loop {
        let Some((&start, &(first, _))) = front.iter().next() else {
            break;
        };
        let mut path: Vec<Vec3> = Vec::new();
        let mut key = start;
        let mut cursor = first;
        loop {
            path.push(cursor);
            if let Some(seg) = front.remove(&key) {
                cursor = seg.1;
                key = endpoint_key(cursor);
            } else {
                // Fall back to a segment continuing the chain in reversed
                // orientation.
                let reversed = front
                    .iter()
                    .find(|(_, seg)| endpoint_key(seg.1) == key)
                    .map(|(&k, _)| k);
                match reversed {
                    Some(k) => {
                        let seg = front.remove(&k).unwrap();
                        cursor = seg.0;
                        key = k;
                    }
                    None => break,
                }
            }
        }
        result.push(path);
    }
    result
}
