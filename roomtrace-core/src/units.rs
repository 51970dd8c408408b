//! Acoustic units and conversions.

/// Speed of sound in air at room temperature, meters per second.
pub const SPEED_OF_SOUND: f64 = 343.0;

/// Milliseconds per second.
pub const MS_PER_S: f64 = 1000.0;

/// Converts a linear gain to decibels.
///
/// The whole pipeline uses the 10·log10 power convention, matching the
/// gain bookkeeping of the tracer. Do not swap in 20·log10 without
/// changing every threshold that is expressed in dB.
#[inline]
pub fn to_db(gain: f64) -> f64 { 10.0 * gain.log10() }

/// Converts a gain in decibels to linear.
#[inline]
pub fn from_db(gain_db: f64) -> f64 { 10.0_f64.powf(gain_db / 10.0) }
