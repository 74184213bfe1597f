//! Flight-path prediction: a lazy, incremental timeline stitching
//! closed-form ballistic arcs and mean-acceleration thrust arcs into one
//! continuous trajectory across sphere-of-influence boundaries.
//!
//! [`FlightPath`] is the facade. It owns the maneuver schedule and a cache
//! of segment groups, each group covering the span of one maneuver state
//! (a coast, or one specific burn). Groups own segments; a segment is one
//! arc under a single primary body. Extension is monotone in time and
//! already-resolved results are never recomputed.

mod flight_path;
mod group;
mod maneuver;
mod segment;

use astro_bodies::BodyError;
use astro_orbits::OrbitError;
use glam::DVec3;
use thiserror::Error;

pub use flight_path::{FlightPath, OrbitData};
pub use maneuver::{Maneuver, ThrustDirection};

/// Largest fraction of the current orbital period covered by one
/// calculation step.
const MAX_PERIOD_FRACTION_PER_STEP: f64 = 0.01;
/// Floor on ballistic step duration while closing on a sphere of
/// influence, to avoid Zeno-style convergence against the boundary.
const MIN_BALLISTIC_STEP: f64 = 15.0;
/// Largest fraction of a thrust segment's starting mass expended within
/// that segment.
const MAX_MASS_RATIO_CHANGE_PER_STEP: f64 = 0.001;
/// Floor on thrust segment duration.
const MIN_THRUST_SEGMENT_LEN: f64 = 0.06;

/// Failures surfaced by flight-path construction and queries.
#[derive(Debug, Error)]
pub enum PathError {
    /// Construction input outside the valid domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A query time fell outside the structure's valid interval.
    #[error("time {t} is outside the valid range starting at {start}")]
    OutOfRange { t: f64, start: f64 },
    /// A maneuver overlaps one already scheduled.
    #[error("maneuver starting at {t0} overlaps an existing maneuver ending at {existing_t1}")]
    Conflict { t0: f64, existing_t1: f64 },
    /// A sanity check on the body tree or cache failed.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    /// A calculation pass failed to advance the timeline.
    #[error("calculation did not advance past t = {t}")]
    NonProgress { t: f64 },
    /// Failure raised by the body tree.
    #[error(transparent)]
    Body(#[from] BodyError),
    /// Failure raised by orbit propagation.
    #[error(transparent)]
    Orbit(#[from] OrbitError),
}

/// Position and velocity in the system frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicData {
    pub position: DVec3,
    pub velocity: DVec3,
}

/// Watermark of lazy calculation: the earliest time for which the
/// trajectory has been determined, the state there, and whether the
/// bounding element has finalized.
#[derive(Debug, Clone, Copy)]
pub struct CalculationStatus {
    /// Earliest time position and velocity have been determined for.
    pub end_t: f64,
    /// Position at `end_t` in the system frame.
    pub r: DVec3,
    /// Velocity at `end_t` in the system frame.
    pub v: DVec3,
    /// True while the bounding segment or group has not finalized.
    pub incomplete: bool,
}

impl CalculationStatus {
    fn at(t: f64, r: DVec3, v: DVec3) -> CalculationStatus {
        CalculationStatus {
            end_t: t,
            r,
            v,
            incomplete: true,
        }
    }
}
