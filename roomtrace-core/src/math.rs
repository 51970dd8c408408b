//! Math utilities.

use glam::DQuat;

mod aabb;
mod pwl;

pub use aabb::Aabb;
pub use pwl::PiecewiseLinear;

/// Three-component vector of `f64`, the coordinate type of the whole
/// simulator. Coordinates are in meters.
pub type Vec3 = glam::DVec3;

/// Ray with origin and unit-length direction.
///
/// Every constructor of the core normalizes the direction; the tracer
/// asserts this invariant in debug builds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Origin of the ray.
    pub org: Vec3,
    /// Direction of the ray, unit length.
    pub dir: Vec3,
}

impl Ray {
    /// Creates a new ray. The direction is normalized.
    pub fn new(org: Vec3, dir: Vec3) -> Self {
        Self {
            org,
            dir: dir.normalize(),
        }
    }

    /// Point along the ray at parameter `t`.
    #[inline]
    pub fn at(&self, t: f64) -> Vec3 { self.org + self.dir * t }
}

/// Returns the square of the given value.
#[inline(always)]
pub fn sqr(x: f64) -> f64 { x * x }

/// Quadratic equation can have 0, 1 or 2 real solutions.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum QuadraticSolution {
    /// No real solutions.
    None,
    /// One real solution.
    One(f64),
    /// Two real solutions, ordered ascending.
    Two(f64, f64),
}

/// Solves the quadratic equation `a * x^2 + b * x + c = 0`.
#[inline]
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> QuadraticSolution {
    let discriminant = b * b - 4.0 * a * c;
    let rcp_2a = 0.5 / a;
    if discriminant < 0.0 {
        QuadraticSolution::None
    } else if discriminant == 0.0 {
        QuadraticSolution::One(-b * rcp_2a)
    } else {
        let sqrt_d = discriminant.sqrt();
        let p = (-b + sqrt_d) * rcp_2a;
        let q = (-b - sqrt_d) * rcp_2a;
        QuadraticSolution::Two(p.min(q), p.max(q))
    }
}

/// Returns a vector perpendicular to `v`, crossing against the axis along
/// which `v` has the smallest extent.
pub fn orthogonal(v: Vec3) -> Vec3 {
    let x = v.x.abs();
    let y = v.y.abs();
    let z = v.z.abs();
    let other = if x < y && x < z {
        Vec3::X
    } else if y < z {
        Vec3::Y
    } else {
        Vec3::Z
    };
    v.cross(other)
}

const PARALLEL_EPS: f64 = 1e-9;

/// Rotates `point` by the rotation that carries the direction `from` onto
/// the direction `to`.
///
/// `from` and `to` need not be normalized. When the two directions are
/// antiparallel the rotation axis is arbitrary; a vector perpendicular to
/// `from` is used so the result is still a half-turn.
pub fn rotate_toward(point: Vec3, from: Vec3, to: Vec3) -> Vec3 {
    if (from - to).length() < PARALLEL_EPS {
        return point;
    }
    let from = from.normalize();
    let to = to.normalize();
    let quat = if (-from - to).length() < PARALLEL_EPS {
        let axis = orthogonal(from).normalize();
        DQuat::from_axis_angle(axis, std::f64::consts::PI)
    } else {
        DQuat::from_rotation_arc(from, to)
    };
    quat * point
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn assert_vec3_eq(actual: Vec3, expect: Vec3) {
        assert_abs_diff_eq!(actual.x, expect.x, epsilon = 1e-6);
        assert_abs_diff_eq!(actual.y, expect.y, epsilon = 1e-6);
        assert_abs_diff_eq!(actual.z, expect.z, epsilon = 1e-6);
    }

    #[test]
    fn ray_direction_is_normalized() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0));
        assert_abs_diff_eq!(ray.dir.length(), 1.0, epsilon = 1e-12);
        assert_vec3_eq(ray.at(5.0), Vec3::new(3.0, 4.0, 0.0));
    }

    #[test]
    fn quadratic_solutions() {
        assert_eq!(solve_quadratic(1.0, 0.0, 1.0), QuadraticSolution::None);
        match solve_quadratic(1.0, -2.0, 1.0) {
            QuadraticSolution::One(x) => assert_abs_diff_eq!(x, 1.0, epsilon = 1e-12),
            other => panic!("expected one root, got {:?}", other),
        }
        match solve_quadratic(1.0, -3.0, 2.0) {
            QuadraticSolution::Two(a, b) => {
                assert_abs_diff_eq!(a, 1.0, epsilon = 1e-12);
                assert_abs_diff_eq!(b, 2.0, epsilon = 1e-12);
            }
            other => panic!("expected two roots, got {:?}", other),
        }
    }

    #[test]
    fn rotate_cases() {
        let cases: &[(Vec3, Vec3, Vec3, Vec3)] = &[
            // point, from, to, expected
            (Vec3::ZERO, Vec3::X, Vec3::X, Vec3::ZERO),
            (Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ZERO),
            (Vec3::ZERO, Vec3::X, -Vec3::X, Vec3::ZERO),
            (Vec3::ZERO, Vec3::X, Vec3::new(0.0, 1.0, 7.0), Vec3::ZERO),
            (Vec3::X, Vec3::X, Vec3::X, Vec3::X),
            (Vec3::X, Vec3::X, -Vec3::X, -Vec3::X),
            (Vec3::X, Vec3::X, Vec3::Y, Vec3::Y),
            (
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::X,
                Vec3::Y,
                Vec3::new(-1.0, 1.0, 1.0),
            ),
            (
                Vec3::X,
                Vec3::X,
                Vec3::new(0.0, 1.0, 1.0),
                Vec3::new(0.0, 1.0 / 2.0_f64.sqrt(), 1.0 / 2.0_f64.sqrt()),
            ),
            (
                Vec3::X,
                Vec3::X,
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(
                    1.0 / 3.0_f64.sqrt(),
                    1.0 / 3.0_f64.sqrt(),
                    1.0 / 3.0_f64.sqrt(),
                ),
            ),
        ];
        for (point, from, to, expect) in cases {
            assert_vec3_eq(rotate_toward(*point, *from, *to), *expect);
        }
    }

    proptest! {
        #[test]
        fn rotate_identity(px in -10.0..10.0f64, py in -10.0..10.0f64, pz in -10.0..10.0f64,
                           vx in -1.0..1.0f64, vy in -1.0..1.0f64, vz in -1.0..1.0f64) {
            let v = Vec3::new(vx, vy, vz);
            prop_assume!(v.length() > 1e-3);
            let v = v.normalize();
            let p = Vec3::new(px, py, pz);
            let rotated = rotate_toward(p, v, v);
            prop_assert!((rotated - p).length() < 1e-9);
        }

        #[test]
        fn rotate_preserves_length(px in -10.0..10.0f64, py in -10.0..10.0f64, pz in -10.0..10.0f64,
                                   vx in -1.0..1.0f64, vy in -1.0..1.0f64, vz in -1.0..1.0f64) {
            let v = Vec3::new(vx, vy, vz);
            prop_assume!(v.length() > 1e-3);
            let v = v.normalize();
            let p = Vec3::new(px, py, pz);
            let rotated = rotate_toward(p, v, -v);
            prop_assert!((rotated.length() - p.length()).abs() < 1e-9);
        }

        #[test]
        fn orthogonal_is_perpendicular(vx in -1.0..1.0f64, vy in -1.0..1.0f64, vz in -1.0..1.0f64) {
            let v = Vec3::new(vx, vy, vz);
            prop_assume!(v.length() > 1e-3);
            let orth = orthogonal(v);
            prop_assert!(orth.dot(v).abs() < 1e-9 * v.length().max(1.0));
        }
    }
}
