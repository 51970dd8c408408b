//! Triangle mesh with a BVH-accelerated nearest-hit query.

mod bvh;

use crate::surface::SurfaceId;
use bvh::Bvh;
use roomtrace_core::math::{Aabb, Ray, Vec3};

/// Epsilon shared by the determinant, barycentric and distance rejections
/// of the intersection kernel. Reflected rays originate exactly at the hit
/// position, so the `t > EPSILON` rejection is also what keeps a bounce
/// from re-hitting its own triangle.
pub const INTERSECT_EPSILON: f64 = 1e-9;

/// A mesh triangle tagged with the surface it belongs to.
#[derive(Debug, Clone)]
pub struct Triangle {
    /// First vertex.
    pub v0: Vec3,
    /// Second vertex.
    pub v1: Vec3,
    /// Third vertex.
    pub v2: Vec3,
    /// Unit normal, cached at construction. Zero for degenerate triangles,
    /// which never intersect anything.
    pub normal: Vec3,
    /// The surface this triangle belongs to.
    pub surface: SurfaceId,
}

/// Result of a ray-triangle intersection.
#[derive(Debug, Clone, Copy)]
pub struct Isect {
    /// Ray parameter of the hit.
    pub t: f64,
    /// World-space hit position.
    pub position: Vec3,
    /// Outward-facing normal: the cached triangle normal, negated when the
    /// ray struck the back face.
    pub normal: Vec3,
    /// The specular reflection of the incoming ray, originating exactly at
    /// the hit position.
    pub reflected: Ray,
    /// True when the ray hit the back face.
    pub inside: bool,
}

impl Triangle {
    /// Creates a triangle and caches its unit normal.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, surface: SurfaceId) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        Self {
            v0,
            v1,
            v2,
            normal,
            surface,
        }
    }

    /// Bounding box of the triangle.
    pub fn aabb(&self) -> Aabb { Aabb::from_points(self.v0, self.v1, self.v2) }

    /// Centroid of the triangle.
    pub fn centroid(&self) -> Vec3 { (self.v0 + self.v1 + self.v2) / 3.0 }

    /// Area of the triangle.
    pub fn area(&self) -> f64 {
        (self.v1 - self.v0).cross(self.v2 - self.v0).length() * 0.5
    }

    /// Möller–Trumbore ray-triangle intersection.
    ///
    /// Rejects hits when the determinant magnitude is below
    /// [`INTERSECT_EPSILON`], the barycentric coordinates leave `[0, 1]`,
    /// or `t` is not in front of the origin.
    pub fn intersect(&self, ray: &Ray) -> Option<Isect> {
        let e0 = self.v1 - self.v0;
        let e1 = self.v2 - self.v0;

        let pvec = ray.dir.cross(e1);
        let det = e0.dot(pvec);
        if det.abs() < INTERSECT_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let tvec = ray.org - self.v0;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(e0);
        let v = ray.dir.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e1.dot(qvec) * inv_det;
        if t < INTERSECT_EPSILON {
            return None;
        }

        let position = ray.at(t);
        let inside = self.normal.dot(ray.dir) > 0.0;
        let normal = if inside { -self.normal } else { self.normal };
        let reflected_dir = ray.dir - normal * (2.0 * ray.dir.dot(normal));
        Some(Isect {
            t,
            position,
            normal,
            reflected: Ray::new(position, reflected_dir),
            inside,
        })
    }
}

/// The nearest hit returned by [`Mesh::intersect`].
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    /// The intersection data.
    pub isect: Isect,
    /// Index of the hit triangle in the mesh.
    pub triangle: usize,
    /// Surface of the hit triangle.
    pub surface: SurfaceId,
}

/// An ordered triangle soup with a spatial index.
///
/// The BVH and the bounds cache are rebuilt whenever triangles are
/// appended; queries always see a consistent index.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    triangles: Vec<Triangle>,
    bvh: Bvh,
    bounds: Aabb,
}

impl Mesh {
    /// Creates an empty mesh.
    pub fn new() -> Self { Self::default() }

    /// Creates a mesh from a triangle list.
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        let mut mesh = Self {
            triangles,
            ..Self::default()
        };
        mesh.rebuild();
        mesh
    }

    /// The stored triangles, in insertion order.
    pub fn triangles(&self) -> &[Triangle] { &self.triangles }

    /// Number of triangles.
    pub fn len(&self) -> usize { self.triangles.len() }

    /// Whether the mesh holds no triangles.
    pub fn is_empty(&self) -> bool { self.triangles.is_empty() }

    /// Bounding box over all triangles.
    pub fn bounds(&self) -> Aabb { self.bounds }

    /// Appends triangles and rebuilds the spatial index.
    pub fn append(&mut self, triangles: impl IntoIterator<Item = Triangle>) {
        self.triangles.extend(triangles);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let aabbs: Vec<Aabb> = self.triangles.iter().map(Triangle::aabb).collect();
        self.bvh = Bvh::build(&aabbs);
        self.bounds = Aabb::empty();
        for aabb in &aabbs {
            self.bounds.extend(aabb);
        }
    }

    /// Returns the nearest hit strictly in front of the ray origin.
    pub fn intersect(&self, ray: &Ray) -> Option<Hit> {
        let mut best: Option<Hit> = None;
        self.bvh.traverse(ray, |index, t_max| {
            let triangle = &self.triangles[index];
            match triangle.intersect(ray) {
                Some(isect) if isect.t < t_max => {
                    let t = isect.t;
                    best = Some(Hit {
                        isect,
                        triangle: index,
                        surface: triangle.surface,
                    });
                    Some(t)
                }
                _ => None,
            }
        });
        best
    }

    /// Counts how many triangles the ray crosses, without early exit.
    ///
    /// Used by the interior-surface parity test; every triangle is tested
    /// directly so grazing duplicates are counted the same way every time.
    pub fn count_crossings(&self, ray: &Ray) -> usize {
        self.triangles
            .iter()
            .filter(|tri| tri.intersect(ray).is_some())
            .count()
    }
}

/// The twelve triangles of an axis-aligned box spanning `min` to `max`,
/// as outward-wound vertex triples.
pub fn box_vertices(min: Vec3, max: Vec3) -> Vec<[Vec3; 3]> {
    let [x0, y0, z0] = [min.x, min.y, min.z];
    let [x1, y1, z1] = [max.x, max.y, max.z];

    let v = [
        Vec3::new(x0, y0, z0),
        Vec3::new(x1, y0, z0),
        Vec3::new(x1, y1, z0),
        Vec3::new(x0, y1, z0),
        Vec3::new(x0, y0, z1),
        Vec3::new(x1, y0, z1),
        Vec3::new(x1, y1, z1),
        Vec3::new(x0, y1, z1),
    ];

    // Two triangles per face, outward winding.
    const FACES: [[usize; 4]; 6] = [
        [0, 3, 2, 1], // bottom (z = z0)
        [4, 5, 6, 7], // top (z = z1)
        [0, 1, 5, 4], // front (y = y0)
        [2, 3, 7, 6], // back (y = y1)
        [0, 4, 7, 3], // left (x = x0)
        [1, 2, 6, 5], // right (x = x1)
    ];

    FACES
        .iter()
        .flat_map(|&[a, b, c, d]| [[v[a], v[b], v[c]], [v[a], v[c], v[d]]])
        .collect()
}

/// The twelve triangles of an axis-aligned box, tagged with `surface`.
pub fn box_triangles(min: Vec3, max: Vec3, surface: SurfaceId) -> Vec<Triangle> {
    box_vertices(min, max)
        .into_iter()
        .map(|[v0, v1, v2]| Triangle::new(v0, v1, v2, surface))
        .collect()
}
