//! Named surfaces and the arena that owns them.
//!
//! Every triangle in the room mesh carries a [`SurfaceId`] into the room's
//! append-only surface arena. Surfaces that originate from a named object
//! in the input model also keep their own triangle list so derived
//! geometry (absorber extrusions) can be computed from their bounds.

use crate::material::Material;
use roomtrace_core::math::{Aabb, Vec3};

/// Stable identifier of a [`Surface`] within a room's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub(crate) u32);

impl SurfaceId {
    /// The arena index.
    pub fn index(&self) -> usize { self.0 as usize }
}

/// A named region of the room sharing a single material.
#[derive(Debug, Clone)]
pub struct Surface {
    /// Display name, unique within a room.
    pub name: String,
    /// The acoustic material of the whole surface.
    pub material: Material,
    /// The surface's own triangles when it came from a named input object;
    /// synthetic surfaces (walls, prisms) leave this empty.
    triangles: Vec<[Vec3; 3]>,
}

/// An axis-aligned absorber panel derived from a flat surface, ready to be
/// added to a room.
#[derive(Debug, Clone)]
pub struct AbsorberPanel {
    /// Name of the new surface.
    pub name: String,
    /// Material of the panel.
    pub material: Material,
    /// Minimum corner of the panel box.
    pub min: Vec3,
    /// Maximum corner of the panel box.
    pub max: Vec3,
}

impl Surface {
    /// Creates a surface backed by its own triangle list.
    pub fn new(name: impl Into<String>, material: Material, triangles: Vec<[Vec3; 3]>) -> Self {
        Self {
            name: name.into(),
            material,
            triangles,
        }
    }

    /// Creates a synthetic surface with no triangle list of its own.
    pub fn synthetic(name: impl Into<String>, material: Material) -> Self {
        Self::new(name, material, Vec::new())
    }

    /// The surface's own triangles, if any.
    pub fn triangles(&self) -> &[[Vec3; 3]] { &self.triangles }

    /// Bounding box of the surface's own triangles. `None` for synthetic
    /// surfaces.
    pub fn bounding_box(&self) -> Option<Aabb> {
        if self.triangles.is_empty() {
            return None;
        }
        let mut aabb = Aabb::empty();
        for tri in &self.triangles {
            for v in tri {
                aabb.extend_point(*v);
            }
        }
        Some(aabb)
    }

    /// Derives an absorber panel extruded from this surface.
    ///
    /// The surface must be flat in X or in Y. A flat-in-X surface yields a
    /// box spanning `±thickness` in X, the surface's full Y range, and
    /// `[z_min, z_min + height]`; flat-in-Y analogously.
    ///
    /// # Panics
    ///
    /// Panics if the surface has no triangles or is not axis-aligned;
    /// callers are expected to only extrude walls that came in flat.
    pub fn absorber(&self, thickness: f64, height: f64, material: Material) -> AbsorberPanel {
        let bounds = self
            .bounding_box()
            .unwrap_or_else(|| panic!("surface {} has no mesh to extrude from", self.name));
        let extent = bounds.extent();
        let name = format!("{} absorber", self.name);
        if extent.x == 0.0 {
            AbsorberPanel {
                name,
                material,
                min: Vec3::new(bounds.min.x - thickness, bounds.min.y, bounds.min.z),
                max: Vec3::new(
                    bounds.max.x + thickness,
                    bounds.max.y,
                    bounds.min.z + height,
                ),
            }
        } else if extent.y == 0.0 {
            AbsorberPanel {
                name,
                material,
                min: Vec3::new(bounds.min.x, bounds.min.y - thickness, bounds.min.z),
                max: Vec3::new(
                    bounds.max.x,
                    bounds.max.y + thickness,
                    bounds.min.z + height,
                ),
            }
        } else {
            panic!(
                "surface {} is not axis-aligned (extent {}); cannot extrude an absorber",
                self.name, extent
            );
        }
    }
}
