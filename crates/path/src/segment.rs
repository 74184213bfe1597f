//! Trajectory segments: one arc under a single primary body, either
//! analytic (ballistic) or a constant-mean-acceleration thrust slice.

use std::f64::consts::TAU;

use astro_bodies::{Body, System};
use astro_orbits::Orbit;
use glam::DVec3;

use crate::maneuver::Maneuver;
use crate::{
    CalculationStatus, KinematicData, PathError, MAX_MASS_RATIO_CHANGE_PER_STEP,
    MAX_PERIOD_FRACTION_PER_STEP, MIN_BALLISTIC_STEP, MIN_THRUST_SEGMENT_LEN,
};

/// One arc of the trajectory with a single primary body.
#[derive(Debug)]
pub(crate) enum Segment<'s> {
    Ballistic(BallisticSegment<'s>),
    Thrust(ThrustSegment<'s>),
}

impl<'s> Segment<'s> {
    pub(crate) fn start_time(&self) -> f64 {
        match self {
            Segment::Ballistic(segment) => segment.t0,
            Segment::Thrust(segment) => segment.t0,
        }
    }

    pub(crate) fn status(&self) -> CalculationStatus {
        match self {
            Segment::Ballistic(segment) => segment.status,
            Segment::Thrust(segment) => segment.status,
        }
    }

    pub(crate) fn calculate(&mut self, system: &'s System, t: f64) -> Result<(), PathError> {
        match self {
            Segment::Ballistic(segment) => segment.calculate(system, t),
            Segment::Thrust(segment) => segment.calculate(system, t),
        }
    }

    pub(crate) fn predict(&self, system: &System, t: f64) -> Result<KinematicData, PathError> {
        match self {
            Segment::Ballistic(segment) => segment.predict(system, t),
            Segment::Thrust(segment) => segment.predict(system, t),
        }
    }

    /// Osculating orbit about the segment's primary at time `t`.
    pub(crate) fn predict_orbit(
        &self,
        system: &System,
        t: f64,
    ) -> Result<(Orbit, &'s Body), PathError> {
        match self {
            Segment::Ballistic(segment) => {
                let orbit = segment.orbit.predict(t - segment.t0)?;
                Ok((orbit, segment.primary))
            }
            Segment::Thrust(segment) => {
                let kinematics = segment.predict(system, t)?;
                let r_rel =
                    kinematics.position - system.predict_system_position(segment.primary, t)?;
                let v_rel =
                    kinematics.velocity - system.predict_system_velocity(segment.primary, t)?;
                let orbit = Orbit::from_state(segment.primary, r_rel, v_rel)?;
                Ok((orbit, segment.primary))
            }
        }
    }
}

/// Unpowered arc: a two-body orbit about the primary, stepped forward
/// until a peer sphere of influence is entered or the query time is
/// covered.
#[derive(Debug)]
pub(crate) struct BallisticSegment<'s> {
    primary: &'s Body,
    t0: f64,
    orbit: Orbit,
    status: CalculationStatus,
}

impl<'s> BallisticSegment<'s> {
    pub(crate) fn new(
        system: &'s System,
        r: DVec3,
        v: DVec3,
        t: f64,
    ) -> Result<BallisticSegment<'s>, PathError> {
        let primary = system.find_primary_influence(r, t)?;
        let r_local = r - system.predict_system_position(primary, t)?;
        let v_local = v - system.predict_system_velocity(primary, t)?;
        let orbit = Orbit::from_state(primary, r_local, v_local)?;
        Ok(BallisticSegment {
            primary,
            t0: t,
            orbit,
            status: CalculationStatus::at(t, r, v),
        })
    }

    fn predict(&self, system: &System, t: f64) -> Result<KinematicData, PathError> {
        if t < self.t0 {
            return Err(PathError::OutOfRange { t, start: self.t0 });
        }
        let prediction = self.orbit.predict(t - self.t0)?;
        Ok(KinematicData {
            position: prediction.position()?
                + system.predict_system_position(self.primary, t)?,
            velocity: prediction.velocity()?
                + system.predict_system_velocity(self.primary, t)?,
        })
    }

    fn calculate(&mut self, system: &'s System, t: f64) -> Result<(), PathError> {
        if t < self.status.end_t {
            return Ok(());
        }

        // An elliptic orbit wholly inside a childless primary's sphere of
        // influence never ends; just keep the watermark ahead of the query.
        if self.is_eternal() {
            let prediction = self.orbit.predict(t + 1.0 - self.t0)?;
            let end_t = t + 1.0;
            self.status = CalculationStatus::at(
                end_t,
                prediction.position()? + system.predict_system_position(self.primary, end_t)?,
                prediction.velocity()? + system.predict_system_velocity(self.primary, end_t)?,
            );
            return Ok(());
        }

        let max_step = if self.orbit.eccentricity() < 1.0 {
            self.orbit.period()? * MAX_PERIOD_FRACTION_PER_STEP
        } else {
            TAU / self.orbit.mean_motion() * MAX_PERIOD_FRACTION_PER_STEP
        };

        // Peers: bodies orbiting the same primary, whose spheres of
        // influence this segment could enter.
        let mut peers = Vec::new();
        for peer_id in self.primary.child_ids() {
            let peer = system
                .body(peer_id)
                .ok_or_else(|| PathError::InvariantViolation(format!("unknown peer '{peer_id}'")))?;
            if peer.parent_id() != Some(self.primary.id()) {
                return Err(PathError::InvariantViolation(format!(
                    "peer '{}' does not list '{}' as its parent",
                    peer.id(),
                    self.primary.id()
                )));
            }
            let sphere = peer.sphere_of_influence().ok_or_else(|| {
                PathError::InvariantViolation(format!(
                    "parented peer '{}' has no sphere of influence",
                    peer.id()
                ))
            })?;
            let max_speed = peer
                .orbit()
                .ok_or_else(|| {
                    PathError::InvariantViolation(format!("parented peer '{}' has no orbit", peer.id()))
                })?
                .max_speed();
            peers.push((peer, sphere, max_speed));
        }

        while self.status.end_t <= t {
            let step_t = self.status.end_t;
            let mut step = max_step;
            if !peers.is_empty() {
                let local_position = self.orbit.predict(step_t - self.t0)?.position()?;
                for &(peer, sphere, peer_speed) in &peers {
                    let peer_position = peer.local_position(step_t)?;
                    let distance = (local_position - peer_position).length() - sphere;
                    if distance < 0.0 {
                        return Err(PathError::InvariantViolation(format!(
                            "distance to peer '{}' is negative at t = {step_t}",
                            peer.id()
                        )));
                    }
                    // Upper bound on the time until this peer's sphere
                    // could be reached.
                    let time_separation = distance / peer_speed;
                    if time_separation < step {
                        step = time_separation;
                        if step < MIN_BALLISTIC_STEP {
                            step = MIN_BALLISTIC_STEP;
                            break;
                        }
                    }
                }
            }

            let new_t = step_t + step;
            let prediction = self.orbit.predict(new_t - self.t0)?;
            let position =
                prediction.position()? + system.predict_system_position(self.primary, new_t)?;
            let velocity =
                prediction.velocity()? + system.predict_system_velocity(self.primary, new_t)?;
            self.status.end_t = new_t;
            self.status.r = position;
            self.status.v = velocity;

            let new_primary = system.find_primary_influence(position, new_t)?;
            if new_primary.id() != self.primary.id() {
                self.status.incomplete = false;
                break;
            }
        }
        Ok(())
    }

    fn is_eternal(&self) -> bool {
        self.primary.child_ids().is_empty()
            && self.orbit.eccentricity() < 1.0
            && match (self.orbit.apoapsis(), self.primary.sphere_of_influence()) {
                (Some(apoapsis), Some(sphere)) => apoapsis < sphere,
                _ => false,
            }
    }
}

/// Powered arc: one slice of a burn approximated with a constant mean
/// acceleration (thrust plus midpoint gravity).
#[derive(Debug)]
pub(crate) struct ThrustSegment<'s> {
    primary: &'s Body,
    maneuver: Maneuver,
    r0: DVec3,
    v0: DVec3,
    t0: f64,
    m0: f64,
    orbit: Orbit,
    acceleration: Option<DVec3>,
    status: CalculationStatus,
}

impl<'s> ThrustSegment<'s> {
    pub(crate) fn new(
        system: &'s System,
        maneuver: Maneuver,
        r: DVec3,
        v: DVec3,
        t: f64,
    ) -> Result<ThrustSegment<'s>, PathError> {
        let m0 = maneuver.find_mass_at_time(t)?;
        let primary = system.find_primary_influence(r, t)?;
        let r_local = r - system.predict_system_position(primary, t)?;
        let v_local = v - system.predict_system_velocity(primary, t)?;
        let orbit = Orbit::from_state(primary, r_local, v_local)?;
        Ok(ThrustSegment {
            primary,
            maneuver,
            r0: r,
            v0: v,
            t0: t,
            m0,
            orbit,
            acceleration: None,
            status: CalculationStatus::at(t, r, v),
        })
    }

    fn predict(&self, _system: &System, t: f64) -> Result<KinematicData, PathError> {
        if t < self.t0 || t > self.status.end_t {
            return Err(PathError::OutOfRange { t, start: self.t0 });
        }
        if t == self.t0 {
            return Ok(KinematicData {
                position: self.r0,
                velocity: self.v0,
            });
        }
        let acceleration = self.acceleration.ok_or_else(|| {
            PathError::InvariantViolation("thrust segment queried before calculation".into())
        })?;
        let rel_t = t - self.t0;
        Ok(KinematicData {
            position: self.r0 + self.v0 * rel_t + acceleration * (rel_t * rel_t / 2.0),
            velocity: self.v0 + acceleration * rel_t,
        })
    }

    fn calculate(&mut self, system: &'s System, _t: f64) -> Result<(), PathError> {
        if self.acceleration.is_some() {
            return Ok(());
        }
        let performance = self.maneuver.performance();
        let flow_rate = performance.flow_rate();

        // Segment length: short enough that neither the craft mass nor
        // the orbit geometry changes much, capped by the burn's end.
        let mass_limited = self.m0 * MAX_MASS_RATIO_CHANGE_PER_STEP / flow_rate;
        let period_limited = if self.orbit.eccentricity() < 1.0 {
            self.orbit.period()? * MAX_PERIOD_FRACTION_PER_STEP
        } else {
            TAU / self.orbit.mean_motion() * MAX_PERIOD_FRACTION_PER_STEP
        };
        let mut duration = mass_limited.min(period_limited);
        if duration < MIN_THRUST_SEGMENT_LEN {
            duration = MIN_THRUST_SEGMENT_LEN;
        }
        duration = duration.min(self.maneuver.t1() - self.t0);
        if duration <= 0.0 {
            return Err(PathError::NonProgress { t: self.t0 });
        }

        // Mean thrust acceleration, weighted toward the heavier start.
        let mass_at_end = self.m0 - duration * flow_rate;
        let mean_magnitude =
            (2.0 * performance.thrust / self.m0 + performance.thrust / mass_at_end) / 3.0;
        let direction =
            self.maneuver
                .find_thrust_vector(system, self.primary, self.r0, self.v0, self.t0)?;
        let thrust_acceleration = direction * mean_magnitude;

        // Gravity sampled at the free-flight midpoint.
        let midpoint_t = self.t0 + duration / 2.0;
        let midpoint = self.r0
            + self.v0 * (duration / 2.0)
            + thrust_acceleration * (duration * duration / 8.0);
        let midpoint_rel = midpoint - system.predict_system_position(self.primary, midpoint_t)?;
        let gravity = midpoint_rel * (-self.primary.gm() / midpoint_rel.length().powi(3));

        self.acceleration = Some(thrust_acceleration + gravity);
        let end_t = self.t0 + duration;
        self.status.end_t = end_t;
        let end = self.predict(system, end_t)?;
        self.status.r = end.position;
        self.status.v = end.velocity;
        self.status.incomplete = false;
        Ok(())
    }
}
