//! The room: a tagged mesh, its surfaces, and aggregate acoustic
//! descriptors.

use crate::material::Material;
use crate::mesh::{box_triangles, Mesh, Triangle};
use crate::plane::Plane;
use crate::surface::{AbsorberPanel, Surface, SurfaceId};
use roomtrace_core::math::{Ray, Vec3};
use roomtrace_core::units::SPEED_OF_SOUND;
use std::collections::HashMap;

/// Sabine's reverberation constant (metric).
const SABINE_COEFF: f64 = 0.161;
/// Eyring's reverberation constant (metric).
const EYRING_COEFF: f64 = 55.3;
/// Frequency the Schroeder estimate samples the Sabine T60 at.
const SCHROEDER_EVAL_FREQ_HZ: f64 = 250.0;
/// Frequency at which the summary reports its T60 figures.
pub const T60_REPORT_FREQ_HZ: f64 = 150.0;

/// Absorption used when an object has no material assignment and the host
/// supplies no `default` entry.
const FALLBACK_ABSORPTION: f64 = 0.05;

/// Inclusive bounds along one axis, used to describe prisms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl Bounds {
    /// Creates bounds from min/max.
    pub fn new(min: f64, max: f64) -> Self { Self { min, max } }
}

/// A room: one mesh whose triangles reference surfaces in an append-only
/// arena.
///
/// A room is built once from the input objects and then mutated through
/// [`Room::add_wall`], [`Room::add_prism`] and [`Room::add_surface`]
/// before tracing begins. Every mutation rebuilds the mesh's spatial
/// index, so tracing always sees a fully-built room.
#[derive(Debug, Clone, Default)]
pub struct Room {
    mesh: Mesh,
    surfaces: Vec<Surface>,
    by_name: HashMap<String, SurfaceId>,
}

impl Room {
    /// Builds a room from `(object name, triangles)` pairs, assigning each
    /// object the material mapped to its name.
    ///
    /// Objects without an assignment fall back to the `default` entry of
    /// the map, or to a flat 5% absorber when the host supplies none.
    pub fn from_objects(
        objects: Vec<(String, Vec<[Vec3; 3]>)>,
        materials: &HashMap<String, Material>,
    ) -> Self {
        let fallback = materials
            .get("default")
            .cloned()
            .unwrap_or_else(|| Material::flat(FALLBACK_ABSORPTION));

        let mut room = Room::default();
        let mut triangles = Vec::new();
        for (name, object_triangles) in objects {
            let material = materials.get(&name).cloned().unwrap_or_else(|| {
                log::debug!("object {name:?} has no material assignment; using default");
                fallback.clone()
            });
            let id = room.push_surface(Surface::new(
                name,
                material,
                object_triangles.clone(),
            ));
            triangles.extend(
                object_triangles
                    .into_iter()
                    .map(|[v0, v1, v2]| Triangle::new(v0, v1, v2, id)),
            );
        }
        room.mesh = Mesh::from_triangles(triangles);
        room
    }

    fn push_surface(&mut self, surface: Surface) -> SurfaceId {
        let id = SurfaceId(self.surfaces.len() as u32);
        self.by_name.insert(surface.name.clone(), id);
        self.surfaces.push(surface);
        id
    }

    /// The room's mesh.
    pub fn mesh(&self) -> &Mesh { &self.mesh }

    /// Looks up a surface by id.
    pub fn surface(&self, id: SurfaceId) -> &Surface { &self.surfaces[id.index()] }

    /// Looks up a surface id by name.
    pub fn surface_id(&self, name: &str) -> Option<SurfaceId> {
        self.by_name.get(name).copied()
    }

    /// All surfaces, in creation order.
    pub fn surfaces(&self) -> impl Iterator<Item = (SurfaceId, &Surface)> {
        self.surfaces
            .iter()
            .enumerate()
            .map(|(i, s)| (SurfaceId(i as u32), s))
    }

    /// Cuts a wall into the room along the given plane.
    ///
    /// The mesh is sliced by the plane; every cut triangle contributes a
    /// fan triangle `{plane point, p1, p2}` tagged with the new surface.
    /// Used to flush-mount speaker baffles.
    pub fn add_wall(
        &mut self,
        point: Vec3,
        normal: Vec3,
        name: impl Into<String>,
        material: Material,
    ) -> SurfaceId {
        let name = name.into();
        let plane = Plane::new(point, normal);
        let segments = plane.slice_mesh(&self.mesh);
        log::debug!(
            "add_wall {:?}: plane at {} cut {} triangles",
            name,
            point,
            segments.len()
        );
        let id = self.push_surface(Surface::synthetic(name, material));
        self.mesh.append(
            segments
                .into_iter()
                .map(|(p1, p2)| Triangle::new(plane.point, p1, p2, id)),
        );
        id
    }

    /// Adds an axis-aligned rectangular prism (12 triangles) tagged with a
    /// new surface. Used for ceiling absorber panels.
    pub fn add_prism(
        &mut self,
        x: Bounds,
        y: Bounds,
        z: Bounds,
        name: impl Into<String>,
        material: Material,
    ) -> SurfaceId {
        let id = self.push_surface(Surface::synthetic(name, material));
        self.mesh.append(box_triangles(
            Vec3::new(x.min, y.min, z.min),
            Vec3::new(x.max, y.max, z.max),
            id,
        ));
        id
    }

    /// Adds an absorber panel derived from [`Surface::absorber`].
    pub fn add_surface(&mut self, panel: AbsorberPanel) -> SurfaceId {
        let AbsorberPanel {
            name,
            material,
            min,
            max,
        } = panel;
        let id = self.push_surface(Surface::synthetic(name, material));
        self.mesh.append(box_triangles(min, max, id));
        id
    }

    /// Room volume in cubic meters, from the signed-tetrahedron sum over
    /// all stored triangles with the origin as apex.
    ///
    /// Only exact for a closed, consistently oriented mesh; the room
    /// guarantees neither, so treat this as the descriptor input it is.
    pub fn volume(&self) -> f64 {
        let signed: f64 = self
            .mesh
            .triangles()
            .iter()
            .map(|t| t.v0.dot(t.v1.cross(t.v2)) / 6.0)
            .sum();
        signed.abs()
    }

    /// Indices of the triangles facing the room's interior.
    ///
    /// A triangle is deemed interior when a +X ray from its centroid
    /// crosses the full mesh an odd number of times.
    fn interior_triangles(&self) -> Vec<usize> {
        self.mesh
            .triangles()
            .iter()
            .enumerate()
            .filter(|(_, tri)| {
                let ray = Ray::new(tri.centroid(), Vec3::X);
                self.mesh.count_crossings(&ray) % 2 == 1
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Total area of the interior surfaces, in square meters.
    pub fn surface_area(&self) -> f64 {
        self.interior_triangles()
            .into_iter()
            .map(|i| self.mesh.triangles()[i].area())
            .sum()
    }

    /// Absorption-weighted interior area `Σ α_i(f)·A_i` and the plain
    /// interior area, at frequency `f`.
    fn absorption_area(&self, freq_hz: f64) -> (f64, f64) {
        let mut weighted = 0.0;
        let mut total = 0.0;
        for i in self.interior_triangles() {
            let tri = &self.mesh.triangles()[i];
            let area = tri.area();
            let alpha = self.surface(tri.surface).material.absorption(freq_hz);
            weighted += alpha * area;
            total += area;
        }
        (weighted, total)
    }

    /// Sabine reverberation time at `freq_hz`: `0.161·V / Σ(α_i·A_i)`.
    pub fn t60_sabine(&self, freq_hz: f64) -> f64 {
        let (weighted, _) = self.absorption_area(freq_hz);
        SABINE_COEFF * self.volume() / weighted
    }

    /// Eyring reverberation time at `freq_hz`:
    /// `55.3·V / (−c·S·ln(1 − ᾱ))`.
    pub fn t60_eyring(&self, freq_hz: f64) -> f64 {
        let (weighted, total) = self.absorption_area(freq_hz);
        let mean_alpha = weighted / total;
        EYRING_COEFF * self.volume() / (-SPEED_OF_SOUND * total * (1.0 - mean_alpha).ln())
    }

    /// Schroeder frequency `2000·√(T60_Sabine(250 Hz) / V)`, the boundary
    /// above which the room's response is reflection- rather than
    /// mode-dominated.
    pub fn schroeder_frequency(&self) -> f64 {
        2000.0 * (self.t60_sabine(SCHROEDER_EVAL_FREQ_HZ) / self.volume()).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::box_vertices;
    use approx::assert_abs_diff_eq;

    fn shoebox(
        size: Vec3,
        material: Material,
    ) -> (Vec<(String, Vec<[Vec3; 3]>)>, HashMap<String, Material>) {
        let objects = vec![("room".to_string(), box_vertices(Vec3::ZERO, size))];
        let mut materials = HashMap::new();
        materials.insert("room".to_string(), material);
        (objects, materials)
    }

    fn shoebox_room(size: Vec3, material: Material) -> Room {
        let (objects, materials) = shoebox(size, material);
        Room::from_objects(objects, &materials)
    }

    #[test]
    fn volume_of_unit_cube() {
        let room = shoebox_room(Vec3::ONE, Material::perfect_reflector());
        assert_abs_diff_eq!(room.volume(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn volume_of_origin_centered_cube() {
        let tris = box_vertices(Vec3::splat(-0.5), Vec3::splat(0.5));
        let room = Room::from_objects(vec![("cube".into(), tris)], &HashMap::new());
        assert_abs_diff_eq!(room.volume(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn missing_assignment_falls_back_to_default() {
        let (objects, _) = shoebox(Vec3::ONE, Material::perfect_reflector());
        let mut materials = HashMap::new();
        materials.insert("default".to_string(), Material::flat(0.42));
        let room = Room::from_objects(objects, &materials);
        let id = room.surface_id("room").unwrap();
        assert_abs_diff_eq!(room.surface(id).material.absorption(1000.0), 0.42);
    }

    #[test]
    fn add_wall_tags_new_triangles() {
        let mut room = shoebox_room(Vec3::new(4.0, 3.0, 3.0), Material::perfect_reflector());
        let before = room.mesh().len();
        let id = room.add_wall(
            Vec3::new(1.0, 1.5, 1.5),
            Vec3::X,
            "Left Speaker Wall",
            Material::perfect_reflector(),
        );
        assert!(room.mesh().len() > before);
        for tri in &room.mesh().triangles()[before..] {
            assert_eq!(tri.surface, id);
            assert_eq!(tri.v0, Vec3::new(1.0, 1.5, 1.5));
        }
        assert_eq!(room.surface_id("Left Speaker Wall"), Some(id));
    }

    #[test]
    fn add_prism_appends_box() {
        let mut room = shoebox_room(Vec3::new(5.0, 4.0, 3.0), Material::perfect_reflector());
        let before = room.mesh().len();
        room.add_prism(
            Bounds::new(1.0, 3.0),
            Bounds::new(1.0, 3.0),
            Bounds::new(2.5, 2.8),
            "Center Ceiling Absorber",
            Material::perfect_absorber(),
        );
        assert_eq!(room.mesh().len(), before + 12);
        assert!(room.surface_id("Center Ceiling Absorber").is_some());
    }

    #[test]
    fn sabine_decreases_with_absorption() {
        // Split the box into floor + shell so one surface's absorption can
        // vary while the rest stays fixed.
        let build = |alpha: f64| {
            let floor = vec![
                [
                    Vec3::new(0.0, 0.0, 0.0),
                    Vec3::new(0.0, 4.0, 0.0),
                    Vec3::new(5.0, 4.0, 0.0),
                ],
                [
                    Vec3::new(0.0, 0.0, 0.0),
                    Vec3::new(5.0, 4.0, 0.0),
                    Vec3::new(5.0, 0.0, 0.0),
                ],
            ];
            let shell: Vec<[Vec3; 3]> = box_vertices(Vec3::ZERO, Vec3::new(5.0, 4.0, 3.0))
                .into_iter()
                .filter(|t| !(t[0].z == 0.0 && t[1].z == 0.0 && t[2].z == 0.0))
                .collect();
            let mut materials = HashMap::new();
            materials.insert("floor".to_string(), Material::flat(alpha));
            materials.insert("shell".to_string(), Material::flat(0.1));
            Room::from_objects(
                vec![("floor".into(), floor), ("shell".into(), shell)],
                &materials,
            )
        };

        let low = build(0.2);
        let high = build(0.6);
        assert!(high.t60_sabine(150.0) < low.t60_sabine(150.0));
        assert!(high.t60_eyring(150.0) < low.t60_eyring(150.0));
    }

    #[test]
    fn surface_area_counts_interior_faces_only() {
        let room = shoebox_room(Vec3::new(2.0, 2.0, 2.0), Material::flat(0.3));
        let area = room.surface_area();
        assert!(area > 0.0);
        // The +X parity heuristic can never count more than the box's own
        // faces.
        assert!(area <= 24.0 + 1e-9, "area = {area}");
    }

    #[test]
    fn schroeder_frequency_is_positive() {
        let room = shoebox_room(Vec3::new(5.0, 4.0, 3.0), Material::flat(0.3));
        let f = room.schroeder_frequency();
        assert!(f.is_finite() && f > 0.0, "schroeder = {f}");
    }
}
