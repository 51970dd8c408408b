//! Acoustic materials: frequency-dependent absorption curves.

use roomtrace_core::math::PiecewiseLinear;

/// Frequency at which the distinguished single-point materials store their
/// breakpoint (the bottom of the usual octave-band table).
pub const REFERENCE_FREQ_HZ: f64 = 125.0;

/// An acoustic material described by absorption breakpoints.
///
/// Absorption is a fraction in `[0, 1]`: the share of incident energy a
/// surface swallows at a given frequency. Evaluation between breakpoints
/// is piecewise-linear and clamps to the end values outside the covered
/// band.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Sorted (frequency, absorption) breakpoints, kept verbatim for
    /// serialization.
    breakpoints: Vec<(f64, f64)>,
    curve: PiecewiseLinear,
}

impl Material {
    /// Builds a material from (frequency_hz, absorption) pairs.
    ///
    /// Absorption values are clamped into `[0, 1]`. At least one
    /// breakpoint is required.
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let points: Vec<(f64, f64)> = points
            .into_iter()
            .map(|(f, a)| (f, a.clamp(0.0, 1.0)))
            .collect();
        let curve = PiecewiseLinear::new(points);
        let breakpoints = curve
            .xs()
            .iter()
            .copied()
            .zip(curve.ys().iter().copied())
            .collect();
        Self { breakpoints, curve }
    }

    /// A material with a single absorption value across the whole band.
    pub fn flat(absorption: f64) -> Self {
        Self::new([(REFERENCE_FREQ_HZ, absorption)])
    }

    /// A material that absorbs nothing at any frequency.
    pub fn perfect_reflector() -> Self { Self::flat(0.0) }

    /// A material that absorbs everything at any frequency.
    pub fn perfect_absorber() -> Self { Self::flat(1.0) }

    /// Absorption coefficient at frequency `f` (Hz).
    pub fn absorption(&self, f: f64) -> f64 { self.curve.at(f) }

    /// Reflection coefficient at frequency `f`, i.e. `1 − absorption(f)`.
    pub fn reflection(&self, f: f64) -> f64 { 1.0 - self.absorption(f) }

    /// The sorted (frequency, absorption) breakpoints.
    pub fn breakpoints(&self) -> &[(f64, f64)] { &self.breakpoints }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn distinguished_materials() {
        for f in [20.0, 125.0, 1000.0, 20_000.0] {
            assert_abs_diff_eq!(Material::perfect_reflector().absorption(f), 0.0);
            assert_abs_diff_eq!(Material::perfect_absorber().absorption(f), 1.0);
        }
    }

    #[test]
    fn reflection_is_complement() {
        let m = Material::new([(125.0, 0.2), (4000.0, 0.8)]);
        for f in [60.0, 125.0, 1000.0, 4000.0, 16_000.0] {
            assert_abs_diff_eq!(m.reflection(f), 1.0 - m.absorption(f), epsilon = 1e-12);
        }
    }

    #[test]
    fn absorption_is_clamped_to_unit_interval() {
        let m = Material::new([(125.0, -0.5), (1000.0, 1.7)]);
        assert_abs_diff_eq!(m.absorption(125.0), 0.0);
        assert_abs_diff_eq!(m.absorption(1000.0), 1.0);
    }

    #[test]
    fn clamps_outside_band() {
        let m = Material::new([(250.0, 0.3), (2000.0, 0.6)]);
        assert_abs_diff_eq!(m.absorption(20.0), 0.3);
        assert_abs_diff_eq!(m.absorption(8000.0), 0.6);
    }

    proptest! {
        #[test]
        fn interpolation_matches_linear_interpolant(
            f0 in 20.0..500.0f64, df in 10.0..4000.0f64,
            a0 in 0.0..1.0f64, a1 in 0.0..1.0f64,
            t in 0.0..1.0f64,
        ) {
            let f1 = f0 + df;
            let m = Material::new([(f0, a0), (f1, a1)]);
            let f = f0 + t * df;
            let expected = a0 + (f - f0) / df * (a1 - a0);
            prop_assert!((m.absorption(f) - expected).abs() < 1e-12);
        }
    }
}
