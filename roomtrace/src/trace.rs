//! The reflection tracer: advancing shots through the room, detecting
//! reflection-free-zone crossings, and terminating on budget.

use crate::error::SimulationError;
use crate::room::Room;
use crate::speaker::Shot;
use crate::surface::SurfaceId;
use roomtrace_core::math::{solve_quadratic, QuadraticSolution, Ray, Vec3};
use roomtrace_core::units::{to_db, SPEED_OF_SOUND};

/// The single frequency at which the tracer evaluates absorption. Keeping
/// reflections frequency-independent per trace is a documented limitation.
pub const TRACE_EVAL_FREQ_HZ: f64 = 1000.0;

#[cfg(debug_assertions)]
const REFLECTION_ANGLE_EPSILON: f64 = 1e-7;
#[cfg(debug_assertions)]
const REFLECTION_COPLANARITY_EPSILON: f64 = 1e-6;

/// Parameters bounding a trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceParams {
    /// Maximum number of reflections to simulate.
    pub order: usize,
    /// Stop tracing once the reflection has lost this many dB relative to
    /// the direct signal (a negative number).
    pub gain_threshold_db: f64,
    /// Stop tracing after this many seconds of travel.
    pub time_threshold_s: f64,
    /// Reflections passing within this distance of the listening position
    /// count as arrivals, meters.
    pub rfz_radius: f64,
}

/// One bounce of a traced path.
#[derive(Debug, Clone, Copy)]
pub struct Reflection {
    /// Where the ray hit.
    pub position: Vec3,
    /// Outward surface normal at the hit. For the synthetic emission
    /// entry this is the shot direction.
    pub normal: Vec3,
    /// The surface that was hit; `None` only for the synthetic zeroth
    /// entry at the emission point.
    pub surface: Option<SurfaceId>,
}

/// A reflection sequence whose final segment passes through the RFZ.
#[derive(Debug, Clone)]
pub struct Arrival {
    /// The shot this path originated from.
    pub shot: Shot,
    /// The emission point followed by every reflection up to and
    /// including the end of the detected segment.
    pub reflections: Vec<Reflection>,
    /// Linear gain at detection.
    pub gain: f64,
    /// Total distance traveled, including the final partial segment up
    /// to the nearest-approach point, meters.
    pub distance: f64,
    /// How closely the final segment approaches the listening position,
    /// meters.
    pub nearest_approach_distance: f64,
    /// The point of nearest approach on the final segment.
    pub nearest_approach_position: Vec3,
}

impl Arrival {
    /// Travel time of this arrival in milliseconds.
    pub fn time_ms(&self) -> f64 { self.distance / SPEED_OF_SOUND * 1000.0 }
}

/// Nearest-approach data for a segment crossing the RFZ sphere.
struct RfzApproach {
    /// Distance from the segment start to the nearest-approach point.
    t: f64,
    position: Vec3,
    distance: f64,
}

/// Tests whether the segment `[ray.org, ray.org + dir·segment_len]`
/// enters the sphere of `radius` around `center`.
///
/// Detection solves the ray–sphere quadratic and requires the entry point
/// to fall within the segment. The reported approach uses the projection
/// of the center onto the segment, with the original miss-distance
/// formula `|d·(p − o) − |p − o||`.
fn rfz_crossing(ray: &Ray, segment_len: f64, center: Vec3, radius: f64) -> Option<RfzApproach> {
    let oc = ray.org - center;
    let a = ray.dir.length_squared();
    let b = 2.0 * oc.dot(ray.dir);
    let c = oc.length_squared() - radius * radius;

    let entry = match solve_quadratic(a, b, c) {
        QuadraticSolution::None => return None,
        QuadraticSolution::One(t) => {
            if t < 0.0 {
                return None;
            }
            t
        }
        QuadraticSolution::Two(t0, t1) => {
            if t0 >= 0.0 {
                t0
            } else if t1 >= 0.0 {
                // Segment starts inside the sphere.
                0.0
            } else {
                return None;
            }
        }
    };
    if entry > segment_len {
        return None;
    }

    let diff = center - ray.org;
    let t = ray.dir.dot(diff).clamp(0.0, segment_len);
    Some(RfzApproach {
        t,
        position: ray.at(t),
        distance: (ray.dir.dot(diff) - diff.length()).abs(),
    })
}

#[cfg(debug_assertions)]
fn assert_reflection_law(incident: &Ray, normal: Vec3, reflected: &Ray) {
    let incidence = (-incident.dir).dot(normal).clamp(-1.0, 1.0).acos();
    let reflection = reflected.dir.dot(normal).clamp(-1.0, 1.0).acos();
    debug_assert!(
        (incidence - reflection).abs() < REFLECTION_ANGLE_EPSILON,
        "angle of incidence {incidence} != angle of reflection {reflection}"
    );
    let triple = incident.dir.dot(normal.cross(reflected.dir)).abs();
    debug_assert!(
        triple < REFLECTION_COPLANARITY_EPSILON,
        "incident, normal and reflected directions are not coplanar (triple = {triple})"
    );
}

impl Room {
    /// Traces a shot through the room, collecting every RFZ crossing.
    ///
    /// Per bounce: intersect the mesh (no hit is a
    /// [`SimulationError::NonTerminatingRay`]), record the reflection,
    /// attenuate by the hit surface's absorption at
    /// [`TRACE_EVAL_FREQ_HZ`], accumulate distance, then check the
    /// termination triggers (max order, gain threshold, time threshold)
    /// before testing the just-traversed segment against the RFZ sphere.
    /// A shot may contribute multiple arrivals; recording one does not
    /// stop the trace.
    pub fn trace_shot(
        &self,
        shot: Shot,
        listen_pos: Vec3,
        params: TraceParams,
    ) -> Result<Vec<Arrival>, SimulationError> {
        let mut arrivals = Vec::new();
        self.trace_inner(shot, listen_pos, params, &mut arrivals, false)?;
        Ok(arrivals)
    }

    /// Traces a shot and records a single arrival for the full path even
    /// when it never crosses the RFZ. Used for targeted diagnostics
    /// (aim at a surface, show the path that comes back).
    pub fn trace_shot_unconditional(
        &self,
        shot: Shot,
        listen_pos: Vec3,
        params: TraceParams,
    ) -> Result<Arrival, SimulationError> {
        let mut arrivals = Vec::new();
        let unconditional =
            self.trace_inner(shot, listen_pos, params, &mut arrivals, true)?;
        Ok(unconditional.expect("unconditional trace always produces an arrival"))
    }

    fn trace_inner(
        &self,
        shot: Shot,
        listen_pos: Vec3,
        params: TraceParams,
        arrivals: &mut Vec<Arrival>,
        unconditional: bool,
    ) -> Result<Option<Arrival>, SimulationError> {
        debug_assert!(
            (shot.ray.dir.length() - 1.0).abs() < 1e-9,
            "shot direction must be normalized"
        );

        let mut current = shot.ray;
        let mut gain = shot.gain;
        let mut distance = 0.0;
        let mut reflections = vec![Reflection {
            position: shot.ray.org,
            normal: shot.ray.dir,
            surface: None,
        }];

        for bounce in 0..params.order {
            let hit = self.mesh().intersect(&current).ok_or(
                SimulationError::NonTerminatingRay {
                    origin: current.org,
                    direction: current.dir,
                },
            )?;

            reflections.push(Reflection {
                position: hit.isect.position,
                normal: hit.isect.normal,
                surface: Some(hit.surface),
            });
            gain *= self.surface(hit.surface).material.reflection(TRACE_EVAL_FREQ_HZ);
            let segment_start = distance;
            distance += hit.isect.t;
            let next = hit.isect.reflected;

            #[cfg(debug_assertions)]
            assert_reflection_law(&current, hit.isect.normal, &next);

            let max_order = bounce + 1 == params.order;
            let gain_spent = to_db(gain) <= params.gain_threshold_db;
            let time_spent = distance / SPEED_OF_SOUND > params.time_threshold_s;
            if max_order || gain_spent || time_spent {
                log::trace!(
                    "trace terminated at bounce {bounce}: max_order={max_order} \
                     gain_spent={gain_spent} time_spent={time_spent}"
                );
                if unconditional {
                    let approach = nearest_approach(&current, hit.isect.t, listen_pos);
                    return Ok(Some(Arrival {
                        shot,
                        reflections,
                        gain,
                        distance,
                        nearest_approach_distance: approach.distance,
                        nearest_approach_position: approach.position,
                    }));
                }
                return Ok(None);
            }

            if !unconditional {
                if let Some(approach) =
                    rfz_crossing(&current, hit.isect.t, listen_pos, params.rfz_radius)
                {
                    arrivals.push(Arrival {
                        shot,
                        reflections: reflections.clone(),
                        gain,
                        distance: segment_start + approach.t,
                        nearest_approach_distance: approach.distance,
                        nearest_approach_position: approach.position,
                    });
                }
            }

            current = next;
        }
        unreachable!("the termination check fires on the final bounce");
    }
}

/// Unconditional nearest approach of a segment to a point.
fn nearest_approach(ray: &Ray, segment_len: f64, point: Vec3) -> RfzApproach {
    let diff = point - ray.org;
    let t = ray.dir.dot(diff).clamp(0.0, segment_len);
    RfzApproach {
        t,
        position: ray.at(t),
        distance: (ray.dir.dot(diff) - diff.length()).abs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn crossing_through_center() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let approach = rfz_crossing(&ray, 10.0, Vec3::new(4.0, 0.0, 0.0), 0.5).unwrap();
        assert_abs_diff_eq!(approach.t, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(approach.distance, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(approach.position.x, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn crossing_offset_from_center() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        // Center 0.3 off-axis, radius 0.5: the segment clips the sphere.
        let approach = rfz_crossing(&ray, 10.0, Vec3::new(4.0, 0.3, 0.0), 0.5).unwrap();
        assert_abs_diff_eq!(approach.t, 4.0, epsilon = 1e-12);
        // The miss-distance formula measures projection shortfall, not
        // the perpendicular distance.
        let diff_len = (4.0_f64 * 4.0 + 0.09).sqrt();
        assert_abs_diff_eq!(approach.distance, diff_len - 4.0, epsilon = 1e-12);
    }

    #[test]
    fn miss_is_rejected() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(rfz_crossing(&ray, 10.0, Vec3::new(4.0, 2.0, 0.0), 0.5).is_none());
        // Sphere behind the origin.
        assert!(rfz_crossing(&ray, 10.0, Vec3::new(-4.0, 0.0, 0.0), 0.5).is_none());
        // Sphere beyond the segment end.
        assert!(rfz_crossing(&ray, 2.0, Vec3::new(4.0, 0.0, 0.0), 0.5).is_none());
    }

    #[test]
    fn segment_starting_inside_sphere() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let approach = rfz_crossing(&ray, 10.0, Vec3::new(0.1, 0.0, 0.0), 0.5).unwrap();
        assert_abs_diff_eq!(approach.t, 0.1, epsilon = 1e-12);
    }
}
