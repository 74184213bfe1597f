//! Scheduled burns: a time-bounded thrust prescription with derived mass
//! and duration bookkeeping.

use astro_bodies::{Body, System};
use astro_propulsion::EnginePerformance;
use glam::DVec3;

use crate::PathError;

/// Orientation of the thrust vector over a burn, resolved against the
/// craft's motion relative to a reference body (except `Fixed`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThrustDirection {
    Prograde,
    Retrograde,
    Normal,
    AntiNormal,
    Radial,
    AntiRadial,
    /// A fixed unit direction in the system frame.
    Fixed(DVec3),
}

/// An immutable burn prescription: direction, total delta-v, engine
/// performance, craft mass, and start time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Maneuver {
    direction: ThrustDirection,
    dv: f64,
    performance: EnginePerformance,
    m0: f64,
    t0: f64,
}

impl Maneuver {
    /// Create a maneuver. `dv` is the total velocity change (m/s), `m0`
    /// the craft mass at ignition (kg), and `t0` the ignition time (s).
    pub fn new(
        direction: ThrustDirection,
        dv: f64,
        performance: EnginePerformance,
        m0: f64,
        t0: f64,
    ) -> Result<Maneuver, PathError> {
        if !(dv > 0.0 && dv.is_finite()) {
            return Err(PathError::InvalidArgument(format!(
                "maneuver delta-v must be positive, got {dv}"
            )));
        }
        if !(m0 > 0.0 && m0.is_finite()) {
            return Err(PathError::InvalidArgument(format!(
                "maneuver initial mass must be positive, got {m0}"
            )));
        }
        if !(performance.exhaust_velocity > 0.0 && performance.thrust > 0.0) {
            return Err(PathError::InvalidArgument(
                "engine performance must have positive exhaust velocity and thrust".into(),
            ));
        }
        if !t0.is_finite() || t0 < 0.0 {
            return Err(PathError::InvalidArgument(format!(
                "maneuver start time must be non-negative, got {t0}"
            )));
        }
        let direction = match direction {
            ThrustDirection::Fixed(vector) => {
                if vector.length_squared() == 0.0 || !vector.is_finite() {
                    return Err(PathError::InvalidArgument(
                        "fixed thrust direction must be a non-zero vector".into(),
                    ));
                }
                ThrustDirection::Fixed(vector.normalize())
            }
            other => other,
        };
        Ok(Maneuver {
            direction,
            dv,
            performance,
            m0,
            t0,
        })
    }

    /// Convenience constructor for a burn along a fixed direction.
    pub fn fixed(
        direction: DVec3,
        dv: f64,
        performance: EnginePerformance,
        m0: f64,
        t0: f64,
    ) -> Result<Maneuver, PathError> {
        Maneuver::new(ThrustDirection::Fixed(direction), dv, performance, m0, t0)
    }

    pub fn direction(&self) -> ThrustDirection {
        self.direction
    }

    pub fn dv(&self) -> f64 {
        self.dv
    }

    pub fn performance(&self) -> EnginePerformance {
        self.performance
    }

    pub fn initial_mass(&self) -> f64 {
        self.m0
    }

    pub fn t0(&self) -> f64 {
        self.t0
    }

    /// Fraction of the initial mass expended over the whole burn (from
    /// the rocket equation).
    pub fn mass_fraction(&self) -> f64 {
        1.0 - (-self.dv / self.performance.exhaust_velocity).exp()
    }

    /// Propellant mass expended over the whole burn.
    pub fn expended_mass(&self) -> f64 {
        self.m0 * self.mass_fraction()
    }

    /// Burn duration at full thrust.
    pub fn duration(&self) -> f64 {
        self.expended_mass() / self.performance.flow_rate()
    }

    /// Time the burn ends.
    pub fn t1(&self) -> f64 {
        self.t0 + self.duration()
    }

    /// Whether `t` falls within the burn's half-open interval `[t0, t1)`.
    pub fn contains(&self, t: f64) -> bool {
        self.t0 <= t && t < self.t1()
    }

    /// Craft mass at time `t` during the burn.
    pub fn find_mass_at_time(&self, t: f64) -> Result<f64, PathError> {
        if t < self.t0 || t > self.t1() {
            return Err(PathError::OutOfRange { t, start: self.t0 });
        }
        Ok(self.m0 - (t - self.t0) * self.performance.flow_rate())
    }

    /// Resolve the thrust direction at `(r, v, t)` against the craft's
    /// motion relative to `reference`.
    pub fn find_thrust_vector(
        &self,
        system: &System,
        reference: &Body,
        r: DVec3,
        v: DVec3,
        t: f64,
    ) -> Result<DVec3, PathError> {
        if let ThrustDirection::Fixed(direction) = self.direction {
            return Ok(direction);
        }
        let r_rel = r - system.predict_system_position(reference, t)?;
        let v_rel = v - system.predict_system_velocity(reference, t)?;
        let radial = r_rel.normalize();
        let prograde = v_rel.normalize();
        Ok(match self.direction {
            ThrustDirection::Retrograde => -prograde,
            ThrustDirection::Radial => radial,
            ThrustDirection::AntiRadial => -radial,
            ThrustDirection::Normal => radial.cross(prograde),
            ThrustDirection::AntiNormal => prograde.cross(radial),
            ThrustDirection::Prograde | ThrustDirection::Fixed(_) => prograde,
        })
    }
}
