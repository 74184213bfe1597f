//! Kepler-equation solving for elliptic and hyperbolic trajectories.
//!
//! The solver is pure and stateless: given an eccentricity and a mean
//! anomaly it returns the matching eccentric (or hyperbolic) anomaly, or
//! reports divergence. It never loops unbounded; the iteration budget is
//! part of the contract.

use std::f64::consts::PI;

use astro_core::angles;
use thiserror::Error;

/// Newton correction magnitude below which iteration stops.
pub const CONVERGENCE_THRESHOLD: f64 = 1e-12;
/// Absolute floor applied to the eccentricity-scaled threshold.
pub const MIN_THRESHOLD: f64 = 1e-14;
/// Iterations granted to the primary starter before switching to the
/// series starter.
pub const PRIMARY_ITERATIONS: u32 = 7;
/// Total iteration budget before the solver gives up.
pub const MAX_ITERATIONS: u32 = 14;

/// Eccentricity above which the low-eccentricity starter stops converging
/// reliably and the series starter is used from the outset.
const HIGH_ECCENTRICITY: f64 = 0.9;
/// `M / e` ratio above which the logarithmic hyperbolic starter applies.
const LARGE_RATIO: f64 = 3.0;

/// Failures surfaced by [`solve`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum KeplerError {
    /// Inputs were non-finite, negative-eccentricity, or parabolic.
    #[error("kepler solver requires finite e >= 0, e != 1 (e = {eccentricity}, M = {mean_anomaly})")]
    InvalidArgument {
        eccentricity: f64,
        mean_anomaly: f64,
    },
    /// The iteration budget ran out before the correction shrank below
    /// threshold.
    #[error("kepler iteration failed to converge for e = {eccentricity}, M = {mean_anomaly}")]
    NumericalDivergence {
        eccentricity: f64,
        mean_anomaly: f64,
    },
}

/// Solve Kepler's equation for the eccentric anomaly `E`.
///
/// For elliptic inputs (`e < 1`) the result satisfies `M = E - e sin E`;
/// for hyperbolic inputs (`e > 1`) it satisfies `M = e sinh E - E`, both
/// to within `CONVERGENCE_THRESHOLD * max(1, |1 - e|)`.
pub fn solve(eccentricity: f64, mean_anomaly: f64) -> Result<f64, KeplerError> {
    if !eccentricity.is_finite()
        || !mean_anomaly.is_finite()
        || eccentricity < 0.0
        || eccentricity == 1.0
    {
        return Err(KeplerError::InvalidArgument {
            eccentricity,
            mean_anomaly,
        });
    }
    if eccentricity == 0.0 {
        return Ok(mean_anomaly);
    }
    if eccentricity < 1.0 {
        solve_elliptic(eccentricity, mean_anomaly)
    } else {
        solve_hyperbolic(eccentricity, mean_anomaly)
    }
}

fn threshold_for(eccentricity: f64) -> f64 {
    (CONVERGENCE_THRESHOLD * (1.0 - eccentricity).abs().max(1.0)).max(MIN_THRESHOLD)
}

fn solve_elliptic(e: f64, mean_anomaly: f64) -> Result<f64, KeplerError> {
    // Work in [-pi, pi] and exploit the odd symmetry of the equation.
    let (reduced, offset) = angles::reduce_symmetric(mean_anomaly);
    let sign = if reduced < 0.0 { -1.0 } else { 1.0 };
    let m = reduced.abs();
    let threshold = threshold_for(e);

    let starter = if e < HIGH_ECCENTRICITY {
        // Meeus' low-eccentricity starter.
        m.sin().atan2(m.cos() - e)
    } else {
        series_starter(e, 1.0 - e, m).min(PI)
    };
    if let Some(ea) = newton_elliptic(e, m, starter, PRIMARY_ITERATIONS, threshold) {
        return Ok(sign * ea + offset);
    }
    let retry = if e < HIGH_ECCENTRICITY {
        series_starter(e, 1.0 - e, m).min(PI)
    } else {
        PI
    };
    newton_elliptic(e, m, retry, MAX_ITERATIONS - PRIMARY_ITERATIONS, threshold)
        .map(|ea| sign * ea + offset)
        .ok_or(KeplerError::NumericalDivergence {
            eccentricity: e,
            mean_anomaly,
        })
}

fn solve_hyperbolic(e: f64, mean_anomaly: f64) -> Result<f64, KeplerError> {
    let sign = if mean_anomaly < 0.0 { -1.0 } else { 1.0 };
    let m = mean_anomaly.abs();
    if m == 0.0 {
        return Ok(0.0);
    }
    let threshold = threshold_for(e);

    let ratio = m / e;
    let starter = if ratio > LARGE_RATIO {
        ratio.ln() + 0.85
    } else {
        // Near periapsis either the linear or the cube-root term of the
        // expanded equation dominates; the smaller root is the safe pick.
        let linear = m / (e - 1.0);
        let cubic = (6.0 * m / e).cbrt();
        linear.min(cubic)
    };
    if let Some(ha) = newton_hyperbolic(e, m, starter, PRIMARY_ITERATIONS, threshold) {
        return Ok(sign * ha);
    }
    // Near-parabolic regime: restart from the series starter in |1 - e|.
    let retry = series_starter(e, e - 1.0, m);
    newton_hyperbolic(e, m, retry, MAX_ITERATIONS - PRIMARY_ITERATIONS, threshold)
        .map(|ha| sign * ha)
        .ok_or(KeplerError::NumericalDivergence {
            eccentricity: e,
            mean_anomaly,
        })
}

/// Root of `e/6 x^3 + c x = M` by Cardano's formula, used as the starter
/// when the eccentricity is close to one and `c = |1 - e|` is small.
fn series_starter(e: f64, linear_coefficient: f64, m: f64) -> f64 {
    let p = 2.0 * linear_coefficient / e;
    let q = 3.0 * m / e;
    let discriminant = (q * q + p * p * p).sqrt();
    (q + discriminant).cbrt() + (q - discriminant).cbrt()
}

fn newton_elliptic(e: f64, m: f64, starter: f64, budget: u32, threshold: f64) -> Option<f64> {
    let mut ea = starter;
    for _ in 0..budget {
        let correction = (ea - e * ea.sin() - m) / (1.0 - e * ea.cos());
        ea -= correction;
        if correction.abs() < threshold {
            return Some(ea);
        }
    }
    None
}

fn newton_hyperbolic(e: f64, m: f64, starter: f64, budget: u32, threshold: f64) -> Option<f64> {
    let mut ha = starter;
    for _ in 0..budget {
        let correction = (e * ha.sinh() - ha - m) / (e * ha.cosh() - 1.0);
        ha -= correction;
        if correction.abs() < threshold {
            return Some(ha);
        }
    }
    None
}
