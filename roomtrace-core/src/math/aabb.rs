use crate::math::Vec3;
use std::fmt::{Debug, Formatter};

/// Axis-aligned bounding box.
#[derive(Copy, Clone, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the box.
    pub min: Vec3,
    /// Maximum corner of the box.
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Vec3::splat(f64::INFINITY),
            max: Vec3::splat(f64::NEG_INFINITY),
        }
    }
}

impl Debug for Aabb {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Aabb {{ {} ~ {} }}", self.min, self.max)
    }
}

impl Aabb {
    /// Creates a new [`Aabb`] from the given bounds.
    pub fn new(min: Vec3, max: Vec3) -> Self { Self { min, max } }

    /// Creates a new empty (i.e. invalid) [`Aabb`].
    pub fn empty() -> Self { Self::default() }

    /// Constructs a box from three points (e.g. a triangle face).
    pub fn from_points(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            min: v0.min(v1).min(v2),
            max: v0.max(v1).max(v2),
        }
    }

    /// Checks if the box is valid.
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Computes the box center.
    pub fn center(&self) -> Vec3 { self.min * 0.5 + self.max * 0.5 }

    /// Computes the box diagonal.
    pub fn extent(&self) -> Vec3 { self.max - self.min }

    /// Returns the axis (0, 1 or 2) along which the box is largest.
    pub fn max_extent_axis(&self) -> usize {
        let d = self.extent();
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// Extends the box to contain another box.
    pub fn extend(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Extends the box to contain a point.
    pub fn extend_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Checks if the bounding box contains a point.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.min.x <= point.x
            && self.min.y <= point.y
            && self.min.z <= point.z
            && self.max.x >= point.x
            && self.max.y >= point.y
            && self.max.z >= point.z
    }

    /// Unions two boxes.
    pub fn union(lhs: &Aabb, rhs: &Aabb) -> Aabb {
        let mut aabb = *lhs;
        aabb.extend(rhs);
        aabb
    }

    /// Slab test against a ray described by origin and reciprocal direction.
    ///
    /// Returns true if the ray hits the box anywhere in `[0, t_max]`.
    pub fn hit_by(&self, org: Vec3, inv_dir: Vec3, t_max: f64) -> bool {
        let t0 = (self.min - org) * inv_dir;
        let t1 = (self.max - org) * inv_dir;
        let t_near = t0.min(t1);
        let t_far = t0.max(t1);
        let t_enter = t_near.x.max(t_near.y).max(t_near.z);
        let t_exit = t_far.x.min(t_far.y).min(t_far.z);
        t_enter <= t_exit && t_exit >= 0.0 && t_enter <= t_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_creation() {
        let aabb = Aabb::from_points(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.8),
            Vec3::new(1.5, 1.0, 1.0),
        );
        assert_eq!(aabb.min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.5, 1.0, 1.8));
        assert!(aabb.is_valid());
        assert!(!Aabb::empty().is_valid());
    }

    #[test]
    fn aabb_extend_and_union() {
        let mut a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        a.extend_point(Vec3::new(2.0, -1.0, 0.5));
        assert_eq!(a.min, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(a.max, Vec3::new(2.0, 1.0, 1.0));

        let b = Aabb::new(Vec3::splat(-3.0), Vec3::splat(-2.0));
        let u = Aabb::union(&a, &b);
        assert_eq!(u.min, Vec3::new(-3.0, -3.0, -3.0));
        assert_eq!(u.max, Vec3::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn aabb_slab_test() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let org = Vec3::new(-1.0, 0.5, 0.5);
        let dir = Vec3::new(1.0, 0.0, 0.0);
        let inv = dir.recip();
        assert!(aabb.hit_by(org, inv, f64::INFINITY));
        assert!(!aabb.hit_by(org, (-dir).recip(), f64::INFINITY));
        // Ray starting inside.
        assert!(aabb.hit_by(Vec3::splat(0.5), inv, f64::INFINITY));
        // Hit beyond t_max.
        assert!(!aabb.hit_by(org, inv, 0.5));
    }

    #[test]
    fn aabb_max_extent_axis() {
        assert_eq!(
            Aabb::new(Vec3::ZERO, Vec3::new(3.0, 2.0, 1.0)).max_extent_axis(),
            0
        );
        assert_eq!(
            Aabb::new(Vec3::ZERO, Vec3::new(1.0, 3.0, 2.0)).max_extent_axis(),
            1
        );
        assert_eq!(
            Aabb::new(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0)).max_extent_axis(),
            2
        );
    }
}
