//! Post-processing aggregates over sorted arrival lists.

use crate::trace::Arrival;
use roomtrace_core::math::Vec3;
use roomtrace_core::units::{to_db, MS_PER_S, SPEED_OF_SOUND};

/// Sums `|floor_db − gain_dB|` over every arrival that lands within the
/// given time window.
///
/// The caller divides by the total shot count to obtain the average
/// early-energy figure reported in the summary.
pub fn energy_over_window(arrivals: &[Arrival], window_ms: f64, floor_db: f64) -> f64 {
    arrivals
        .iter()
        .filter(|a| a.distance / SPEED_OF_SOUND * MS_PER_S < window_ms)
        .map(|a| (floor_db - to_db(a.gain)).abs())
        .sum()
}

/// Initial time-delay gap in milliseconds: how long after the direct
/// sound the first recorded reflection arrives.
///
/// `arrivals` must be sorted by distance; the first entry is compared
/// against the direct path from its shot's origin to the listening
/// position. Returns `None` when there are no arrivals.
pub fn itd_ms(arrivals: &[Arrival], listen_pos: Vec3) -> Option<f64> {
    let first = arrivals.first()?;
    let direct = (listen_pos - first.shot.ray.org).length();
    Some((first.distance - direct) / SPEED_OF_SOUND * MS_PER_S)
}
