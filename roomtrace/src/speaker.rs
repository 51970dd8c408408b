//! The loudspeaker model: directivity curves, ray sampling, and the
//! cabinet-fits-in-room check.

use crate::mesh::Mesh;
use roomtrace_core::math::{rotate_toward, PiecewiseLinear, Ray, Vec3};
use roomtrace_core::units::from_db;

/// Componentwise tolerance for [`Shot::approx_eq`].
const SHOT_EPSILON: f64 = 1e-7;

/// A single emitted ray with its initial linear gain (1.0 = on-axis,
/// 0 dB).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    /// The emitted ray.
    pub ray: Ray,
    /// Linear gain relative to on-axis.
    pub gain: f64,
}

impl Shot {
    /// Componentwise equality of origin, direction and gain within 1e-7.
    pub fn approx_eq(&self, other: &Shot) -> bool {
        (self.ray.org.x - other.ray.org.x).abs() < SHOT_EPSILON
            && (self.ray.org.y - other.ray.org.y).abs() < SHOT_EPSILON
            && (self.ray.org.z - other.ray.org.z).abs() < SHOT_EPSILON
            && (self.ray.dir.x - other.ray.dir.x).abs() < SHOT_EPSILON
            && (self.ray.dir.y - other.ray.dir.y).abs() < SHOT_EPSILON
            && (self.ray.dir.z - other.ray.dir.z).abs() < SHOT_EPSILON
            && (self.gain - other.gain).abs() < SHOT_EPSILON
    }
}

/// Angular attenuation of a loudspeaker, decomposed into independent
/// horizontal and vertical curves.
///
/// Each curve maps a non-negative angle in degrees to a gain in dB and is
/// mirrored for negative angles. 0° is always present with 0 dB. Beyond
/// the last breakpoint the curve clamps to its last gain. Summing the two
/// curves treats the axes as independent, which is an acknowledged
/// approximation.
#[derive(Debug, Clone, PartialEq)]
pub struct Directivity {
    horiz: PiecewiseLinear,
    vert: PiecewiseLinear,
}

fn process_curve(points: impl IntoIterator<Item = (f64, f64)>, name: &str) -> PiecewiseLinear {
    let mut points: Vec<(f64, f64)> = points
        .into_iter()
        .filter(|&(angle, _)| {
            if angle < 0.0 {
                log::warn!("ignoring negative angle {angle:.2} in {name} directivity curve");
                false
            } else {
                true
            }
        })
        .collect();
    if !points.iter().any(|&(angle, _)| angle == 0.0) {
        points.push((0.0, 0.0));
    }
    PiecewiseLinear::new(points)
}

impl Directivity {
    /// Builds a directivity from horizontal and vertical angle→dB
    /// breakpoints. Negative angles are dropped with a warning; a 0° ⇒
    /// 0 dB breakpoint is inserted when missing.
    pub fn new(
        horiz: impl IntoIterator<Item = (f64, f64)>,
        vert: impl IntoIterator<Item = (f64, f64)>,
    ) -> Self {
        Self {
            horiz: process_curve(horiz, "horizontal"),
            vert: process_curve(vert, "vertical"),
        }
    }

    /// An omnidirectional pattern: 0 dB everywhere.
    pub fn omnidirectional() -> Self {
        Self::new([(0.0, 0.0)], [(0.0, 0.0)])
    }

    /// Gain in dB at the given yaw/pitch, in degrees.
    pub fn gain_db(&self, yaw_deg: f64, pitch_deg: f64) -> f64 {
        self.horiz.at(yaw_deg.abs()) + self.vert.at(pitch_deg.abs())
    }
}

/// Physical description of a loudspeaker model: cabinet dimensions, the
/// acoustic-center offsets inside the cabinet, and its directivity.
///
/// The acoustic center sits on the cabinet's front face; the cabinet
/// extends `x_dim` behind it, `y_off`/`z_off` below/beside it.
#[derive(Debug, Clone, PartialEq)]
pub struct LoudspeakerSpec {
    /// Cabinet depth, meters.
    pub x_dim: f64,
    /// Cabinet width, meters.
    pub y_dim: f64,
    /// Cabinet height, meters.
    pub z_dim: f64,
    /// Lateral offset of the acoustic center inside the cabinet, meters.
    pub y_off: f64,
    /// Vertical offset of the acoustic center inside the cabinet, meters.
    pub z_off: f64,
    /// Angular attenuation pattern.
    pub directivity: Directivity,
}

/// A placed, aimed loudspeaker.
#[derive(Debug, Clone)]
pub struct Speaker {
    /// The loudspeaker model.
    pub spec: LoudspeakerSpec,
    /// Acoustic-center position in the room.
    pub position: Vec3,
    /// Unit aiming direction.
    pub direction: Vec3,
    /// Display name for annotations and error reports.
    pub name: String,
}

/// A failed cabinet-visibility check: some cabinet vertex is not visible
/// from the listening position.
#[derive(Debug, Clone, Copy)]
pub struct PlacementViolation {
    /// The offending cabinet vertex.
    pub vertex: Vec3,
    /// The first mesh hit between listener and vertex, when one exists.
    pub obstruction: Option<Vec3>,
}

impl Speaker {
    /// Creates a speaker; the aiming direction is normalized.
    pub fn new(
        name: impl Into<String>,
        spec: LoudspeakerSpec,
        position: Vec3,
        direction: Vec3,
    ) -> Self {
        Self {
            spec,
            position,
            direction: direction.normalize(),
            name: name.into(),
        }
    }

    /// Gain in dB for a ray emitted at the given yaw/pitch from the aim
    /// axis, degrees.
    pub fn gain_db(&self, yaw_deg: f64, pitch_deg: f64) -> f64 {
        self.spec.directivity.gain_db(yaw_deg, pitch_deg)
    }

    /// Emits shots on a stratified rectangular grid in (yaw, pitch).
    ///
    /// `n_samples` is split into `floor(sqrt(n))` horizontal steps and
    /// `n / floor(sqrt(n))` vertical steps; yaw sweeps
    /// `−h_range + 2·h_range·i/n_h` and pitch analogously, in degrees.
    /// Each direction perturbs the aim axis by the yaw/pitch unit offsets
    /// and renormalizes; this is a small-angle construction kept for
    /// output compatibility, not a spherical parameterization. Gains come
    /// from the directivity, converted to linear.
    pub fn sample(&self, n_samples: usize, h_range: f64, v_range: f64) -> Vec<Shot> {
        let horiz_steps = (n_samples as f64).sqrt().floor() as usize;
        let vert_steps = n_samples / horiz_steps;

        let mut shots = Vec::with_capacity(horiz_steps * vert_steps);
        for x in 0..horiz_steps {
            let yaw = -h_range + 2.0 * h_range * (x as f64 / horiz_steps as f64);
            let yaw_rad = yaw.to_radians();
            for y in 0..vert_steps {
                let pitch = -v_range + 2.0 * v_range * (y as f64 / vert_steps as f64);
                let pitch_rad = pitch.to_radians();

                let dir = self.direction
                    + Vec3::new(pitch_rad.cos(), pitch_rad.sin(), 0.0)
                    + Vec3::new(yaw_rad.cos(), 0.0, yaw_rad.sin());
                shots.push(Shot {
                    ray: Ray::new(self.position, dir),
                    gain: from_db(self.gain_db(yaw, pitch)),
                });
            }
        }
        shots
    }

    /// Samples as [`Speaker::sample`], but with the speaker re-aimed
    /// along `normal` first. Used for targeted tracing at a particular
    /// surface.
    pub fn sample_with_normal(
        &self,
        normal: Vec3,
        n_samples: usize,
        h_range: f64,
        v_range: f64,
    ) -> Vec<Shot> {
        let aimed = Speaker {
            direction: normal.normalize(),
            ..self.clone()
        };
        aimed.sample(n_samples, h_range, v_range)
    }

    /// Emits `n_rays` rays evenly spaced on a circle at `angle_deg` off
    /// the aim axis.
    ///
    /// The cone is built around the canonical Y axis and rotated onto the
    /// aim direction with Rodrigues' formula.
    pub fn sample_cone(&self, angle_deg: f64, n_rays: usize) -> Vec<Ray> {
        let angle_rad = angle_deg.to_radians();
        // Height along the cone axis and ring radius at unit distance.
        let h = angle_rad.cos();
        let r = angle_rad.sin();

        (0..n_rays)
            .map(|i| {
                let theta = 2.0 * std::f64::consts::PI * i as f64 / n_rays as f64;
                let dir = Vec3::new(r * theta.cos(), h, r * theta.sin());
                Ray::new(self.position, align_with_normal(dir, self.direction))
            })
            .collect()
    }

    /// Cabinet vertices in the speaker's local frame: one face at the
    /// acoustic-center plane, extending backwards and around the offsets.
    fn vertices_unrotated(&self) -> [Vec3; 8] {
        let min = Vec3::new(-self.spec.x_dim, -self.spec.y_off, -self.spec.z_off);
        let max = Vec3::new(
            0.0,
            self.spec.y_dim - self.spec.y_off,
            self.spec.z_dim - self.spec.z_off,
        );
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }

    /// Cabinet vertices in room coordinates: the local box rotated from
    /// the canonical +X aim onto the speaker's aim, then translated to
    /// its position.
    pub fn vertices(&self) -> [Vec3; 8] {
        self.vertices_unrotated()
            .map(|v| rotate_toward(v, Vec3::X, self.direction) + self.position)
    }

    /// Checks that every cabinet vertex has an unobstructed path to the
    /// listening position.
    ///
    /// A ray is cast from `listen_pos` toward each vertex; the check
    /// fails if the room mesh is hit before the vertex. What matters
    /// acoustically is an unobstructed path between listener and every
    /// face of the cabinet.
    pub fn is_inside_room(&self, mesh: &Mesh, listen_pos: Vec3) -> Result<(), PlacementViolation> {
        for vertex in self.vertices() {
            let to_vertex = vertex - listen_pos;
            let hit = mesh.intersect(&Ray::new(listen_pos, to_vertex));
            if let Some(hit) = &hit {
                if hit.isect.t <= to_vertex.length() {
                    log::debug!(
                        "speaker {}: vertex {vertex} obscured at {} (t = {:.3})",
                        self.name,
                        hit.isect.position,
                        hit.isect.t
                    );
                    return Err(PlacementViolation {
                        vertex,
                        obstruction: Some(hit.isect.position),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Rodrigues rotation of `dir` from the canonical +Y axis onto `normal`.
fn align_with_normal(dir: Vec3, normal: Vec3) -> Vec3 {
    if (normal - Vec3::Y).length() < 1e-9 {
        return dir;
    }
    if (normal + Vec3::Y).length() < 1e-9 {
        return Vec3::new(dir.x, -dir.y, dir.z);
    }

    let rot_axis = Vec3::Y.cross(normal).normalize();
    let rot_angle = Vec3::Y.dot(normal.normalize()).clamp(-1.0, 1.0).acos();
    let (sin_theta, cos_theta) = rot_angle.sin_cos();

    // v·cosθ + (k × v)·sinθ + k·(k·v)·(1 − cosθ)
    dir * cos_theta
        + rot_axis.cross(dir) * sin_theta
        + rot_axis * (rot_axis.dot(dir) * (1.0 - cos_theta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{box_triangles, Mesh};
    use crate::surface::SurfaceId;
    use approx::assert_abs_diff_eq;

    fn spec(directivity: Directivity) -> LoudspeakerSpec {
        LoudspeakerSpec {
            x_dim: 2.0,
            y_dim: 2.0,
            z_dim: 2.0,
            y_off: 1.0,
            z_off: 1.0,
            directivity,
        }
    }

    fn speaker(position: Vec3, direction: Vec3) -> Speaker {
        Speaker::new(
            "test",
            spec(Directivity::omnidirectional()),
            position,
            direction,
        )
    }

    #[test]
    fn directivity_is_symmetric_and_zero_on_axis() {
        let d = Directivity::new(
            [(30.0, -1.0), (60.0, -3.0), (90.0, -9.0)],
            [(30.0, -4.0), (60.0, -6.0)],
        );
        assert_abs_diff_eq!(d.gain_db(0.0, 0.0), 0.0);
        for angle in [10.0, 30.0, 45.0, 75.0] {
            assert_abs_diff_eq!(d.gain_db(angle, 0.0), d.gain_db(-angle, 0.0));
            assert_abs_diff_eq!(d.gain_db(0.0, angle), d.gain_db(0.0, -angle));
        }
        // Beyond the last breakpoint the curve clamps.
        assert_abs_diff_eq!(d.gain_db(170.0, 0.0), -9.0);
        assert_abs_diff_eq!(d.gain_db(0.0, 170.0), -6.0);
    }

    #[test]
    fn directivity_drops_negative_angles() {
        let d = Directivity::new([(-20.0, -50.0), (40.0, -2.0)], [(0.0, 0.0)]);
        // The negative breakpoint is ignored, leaving 0° and 40°.
        assert_abs_diff_eq!(d.gain_db(20.0, 0.0), -1.0);
    }

    #[test]
    fn sampling_is_deterministic_across_instances() {
        let make = || {
            Speaker::new(
                "L",
                spec(Directivity::new(
                    [(30.0, -2.0), (60.0, -9.0)],
                    [(30.0, -4.0)],
                )),
                Vec3::new(0.5, 1.0, 1.4),
                Vec3::new(1.0, 0.3, -0.1),
            )
        };
        let a = make().sample(1000, 60.0, 45.0);
        let b = make().sample(1000, 60.0, 45.0);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert!(x.approx_eq(y));
        }
    }

    #[test]
    fn sample_grid_has_expected_size_and_gains() {
        let s = speaker(Vec3::ZERO, Vec3::X);
        let shots = s.sample(1000, 90.0, 90.0);
        // floor(sqrt(1000)) = 31 horizontal, 1000/31 = 32 vertical.
        assert_eq!(shots.len(), 31 * 32);
        for shot in &shots {
            assert_abs_diff_eq!(shot.ray.dir.length(), 1.0, epsilon = 1e-12);
            // Omnidirectional: all gains are unity.
            assert_abs_diff_eq!(shot.gain, 1.0, epsilon = 1e-12);
            assert_eq!(shot.ray.org, Vec3::ZERO);
        }
    }

    #[test]
    fn sample_with_normal_re_aims() {
        let s = speaker(Vec3::ZERO, Vec3::X);
        let shots = s.sample_with_normal(Vec3::Z, 4, 0.0, 0.0);
        for shot in &shots {
            // Zero angular range collapses the grid onto the new aim
            // perturbed by the unit yaw/pitch offsets.
            assert!(shot.ray.dir.z > 0.0);
        }
    }

    #[test]
    fn cone_rays_sit_at_the_requested_angle() {
        for aim in [Vec3::X, Vec3::Y, -Vec3::Y, Vec3::new(1.0, 1.0, 0.5)] {
            let s = speaker(Vec3::new(1.0, 2.0, 3.0), aim);
            let rays = s.sample_cone(25.0, 16);
            assert_eq!(rays.len(), 16);
            for ray in &rays {
                assert_eq!(ray.org, s.position);
                let angle = ray.dir.dot(s.direction).clamp(-1.0, 1.0).acos();
                assert_abs_diff_eq!(angle.to_degrees(), 25.0, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn vertices_unrotated_box_corners() {
        let s = speaker(Vec3::ZERO, Vec3::X);
        let vertices = s.vertices();
        for expect in [Vec3::new(-2.0, -1.0, -1.0), Vec3::new(0.0, -1.0, -1.0)] {
            assert!(
                vertices.iter().any(|v| (*v - expect).length() < 1e-6),
                "missing vertex {expect} in {vertices:?}"
            );
        }
    }

    #[test]
    fn vertices_rotate_with_aim() {
        // 180°: the cabinet flips through the acoustic center.
        let s = speaker(Vec3::ZERO, -Vec3::X);
        let vertices = s.vertices();
        for expect in [Vec3::new(2.0, 1.0, -1.0), Vec3::new(0.0, 1.0, -1.0)] {
            assert!(
                vertices.iter().any(|v| (*v - expect).length() < 1e-6),
                "missing vertex {expect} in {vertices:?}"
            );
        }

        // 90° about Z: +X maps onto +Y.
        let s = speaker(Vec3::ZERO, Vec3::Y);
        let vertices = s.vertices();
        for expect in [Vec3::new(-1.0, -2.0, -1.0), Vec3::new(1.0, 0.0, -1.0)] {
            assert!(
                vertices.iter().any(|v| (*v - expect).length() < 1e-6),
                "missing vertex {expect} in {vertices:?}"
            );
        }

        // 45° about Z, translated.
        let s = speaker(Vec3::new(10.0, 10.0, 10.0), Vec3::new(1.0, 1.0, 0.0));
        let vertices = s.vertices();
        let expect = Vec3::new(
            2.0_f64.sqrt() / 2.0 + 10.0,
            -(2.0_f64.sqrt()) / 2.0 + 10.0,
            9.0,
        );
        assert!(
            vertices.iter().any(|v| (*v - expect).length() < 1e-6),
            "missing vertex {expect} in {vertices:?}"
        );
    }

    #[test]
    fn cabinet_inside_box_room_passes_check() {
        let mesh = Mesh::from_triangles(box_triangles(
            Vec3::ZERO,
            Vec3::new(8.0, 6.0, 4.0),
            SurfaceId(0),
        ));
        let listen = Vec3::new(5.0, 3.0, 1.4);
        let inside = Speaker::new(
            "ok",
            LoudspeakerSpec {
                x_dim: 0.4,
                y_dim: 0.3,
                z_dim: 0.5,
                y_off: 0.15,
                z_off: 0.25,
                directivity: Directivity::omnidirectional(),
            },
            Vec3::new(1.0, 3.0, 1.4),
            Vec3::X,
        );
        assert!(inside.is_inside_room(&mesh, listen).is_ok());

        // Push the cabinet through the front wall: vertices poke outside.
        let outside = Speaker {
            position: Vec3::new(0.2, 3.0, 1.4),
            ..inside
        };
        let violation = outside.is_inside_room(&mesh, listen).unwrap_err();
        assert!(violation.vertex.x < 0.0);
        let obstruction = violation.obstruction.unwrap();
        assert_abs_diff_eq!(obstruction.x, 0.0, epsilon = 1e-9);
    }
}
