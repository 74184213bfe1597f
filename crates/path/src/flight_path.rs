//! The flight-path facade: maneuver schedule plus the lazily extended
//! segment-group timeline.

use std::cell::RefCell;

use astro_bodies::{Body, System};
use astro_orbits::Orbit;
use glam::DVec3;

use crate::group::SegmentGroup;
use crate::maneuver::Maneuver;
use crate::{CalculationStatus, KinematicData, PathError};

/// An osculating orbit paired with the body it is measured about.
#[derive(Debug)]
pub struct OrbitData<'s> {
    pub orbit: Orbit,
    pub reference: &'s Body,
}

#[derive(Debug)]
struct TimelineCache<'s> {
    groups: Vec<SegmentGroup<'s>>,
    status: CalculationStatus,
}

/// Predicts the position and velocity of a craft at any future time,
/// stitching ballistic and thrust arcs across sphere-of-influence
/// boundaries.
///
/// The timeline cache is extended monotonically by queries and grows
/// behind a `RefCell`; a `FlightPath` is therefore not thread-safe.
/// Any change to the maneuver schedule drops the cache in one step.
#[derive(Debug)]
pub struct FlightPath<'s> {
    system: &'s System,
    r0: DVec3,
    v0: DVec3,
    t0: f64,
    maneuvers: Vec<Maneuver>,
    cache: RefCell<TimelineCache<'s>>,
}

impl<'s> FlightPath<'s> {
    /// Create a path for a craft at `(r, v)` in the system frame at time
    /// `t0`.
    pub fn new(system: &'s System, r: DVec3, v: DVec3, t0: f64) -> Result<FlightPath<'s>, PathError> {
        if !t0.is_finite() || t0 < 0.0 {
            return Err(PathError::InvalidArgument(format!(
                "path start time must be non-negative, got {t0}"
            )));
        }
        if r.length_squared() == 0.0 || !r.is_finite() || !v.is_finite() {
            return Err(PathError::InvalidArgument(
                "path start position must be finite and non-zero".into(),
            ));
        }
        Ok(FlightPath {
            system,
            r0: r,
            v0: v,
            t0,
            maneuvers: Vec::new(),
            cache: RefCell::new(TimelineCache {
                groups: Vec::new(),
                status: CalculationStatus::at(t0, r, v),
            }),
        })
    }

    pub fn system(&self) -> &'s System {
        self.system
    }

    pub fn t0(&self) -> f64 {
        self.t0
    }

    /// Scheduled maneuvers, ordered by ignition time.
    pub fn maneuvers(&self) -> &[Maneuver] {
        &self.maneuvers
    }

    /// Current watermark of lazy calculation.
    pub fn calculation_status(&self) -> CalculationStatus {
        self.cache.borrow().status
    }

    /// Schedule a maneuver. Its ignition must not precede the end of the
    /// last maneuver already scheduled.
    pub fn add(&mut self, maneuver: Maneuver) -> Result<(), PathError> {
        if let Some(last) = self.maneuvers.last() {
            if maneuver.t0() < last.t1() {
                return Err(PathError::Conflict {
                    t0: maneuver.t0(),
                    existing_t1: last.t1(),
                });
            }
        }
        self.maneuvers.push(maneuver);
        self.reset_cache();
        Ok(())
    }

    /// Drop every scheduled maneuver.
    pub fn clear(&mut self) {
        self.maneuvers.clear();
        self.reset_cache();
    }

    /// Drop every maneuver igniting after `t`.
    pub fn clear_after(&mut self, t: f64) {
        self.maneuvers.retain(|maneuver| maneuver.t0() <= t);
        self.reset_cache();
    }

    /// Remove one scheduled maneuver, matched by ignition time. Returns
    /// whether anything was removed.
    pub fn remove(&mut self, maneuver: &Maneuver) -> bool {
        let before = self.maneuvers.len();
        self.maneuvers
            .retain(|scheduled| scheduled.t0() != maneuver.t0());
        let removed = self.maneuvers.len() != before;
        if removed {
            self.reset_cache();
        }
        removed
    }

    /// The maneuver whose burn interval contains `t`, if any.
    pub fn find_maneuver(&self, t: f64) -> Option<&Maneuver> {
        let index = self.maneuvers.partition_point(|maneuver| maneuver.t0() <= t);
        if index == 0 {
            return None;
        }
        let candidate = &self.maneuvers[index - 1];
        candidate.contains(t).then_some(candidate)
    }

    /// The first maneuver igniting strictly after `t`, if any.
    pub fn find_next_maneuver(&self, t: f64) -> Option<&Maneuver> {
        let index = self.maneuvers.partition_point(|maneuver| maneuver.t0() <= t);
        self.maneuvers.get(index)
    }

    /// Position and velocity in the system frame at time `t`.
    pub fn predict(&self, t: f64) -> Result<KinematicData, PathError> {
        if t < self.t0 {
            return Err(PathError::OutOfRange { t, start: self.t0 });
        }
        let mut cache = self.cache.borrow_mut();
        self.calculate(&mut cache, t)?;
        let group = Self::group_at(&cache, self.t0, t)?;
        group.predict(self.system, t)
    }

    /// Osculating orbit at time `t`. With no `reference` the segment's
    /// own primary is used; otherwise the orbit is measured about the
    /// supplied body (meaningful only if that body dominates at `t`).
    pub fn predict_orbit(
        &self,
        t: f64,
        reference: Option<&'s Body>,
    ) -> Result<OrbitData<'s>, PathError> {
        if t < self.t0 {
            return Err(PathError::OutOfRange { t, start: self.t0 });
        }
        match reference {
            Some(body) => {
                let kinematics = self.predict(t)?;
                let r_rel =
                    kinematics.position - self.system.predict_system_position(body, t)?;
                let v_rel =
                    kinematics.velocity - self.system.predict_system_velocity(body, t)?;
                Ok(OrbitData {
                    orbit: Orbit::from_state(body, r_rel, v_rel)?,
                    reference: body,
                })
            }
            None => {
                let mut cache = self.cache.borrow_mut();
                self.calculate(&mut cache, t)?;
                let group = Self::group_at(&cache, self.t0, t)?;
                let (orbit, body) = group.get_segment(t)?.predict_orbit(self.system, t)?;
                Ok(OrbitData {
                    orbit,
                    reference: body,
                })
            }
        }
    }

    /// Extend the cached timeline until `t` is covered.
    fn calculate(&self, cache: &mut TimelineCache<'s>, t: f64) -> Result<(), PathError> {
        if t < cache.status.end_t {
            return Ok(());
        }

        // Resume an unfinished trailing group first.
        if let Some(last) = cache.groups.last_mut() {
            if last.status().incomplete {
                last.calculate(self.system, t)?;
                cache.status = last.status();
                if cache.status.end_t > t {
                    return Ok(());
                }
            }
        }

        while cache.status.end_t <= t {
            let start = cache.status.end_t;
            let r = cache.status.r;
            let v = cache.status.v;
            let mut group = match self.find_maneuver(start) {
                Some(maneuver) => SegmentGroup::thrust(*maneuver, r, v, start)?,
                None => {
                    let cap = self.find_next_maneuver(start).map(Maneuver::t0);
                    SegmentGroup::ballistic(r, v, start, cap)?
                }
            };
            group.calculate(self.system, t)?;
            let status = group.status();
            if status.end_t <= start {
                return Err(PathError::NonProgress { t: start });
            }
            cache.groups.push(group);
            cache.status = status;
        }
        Ok(())
    }

    /// The cached group whose span contains `t`.
    fn group_at<'c>(
        cache: &'c TimelineCache<'s>,
        t0: f64,
        t: f64,
    ) -> Result<&'c SegmentGroup<'s>, PathError> {
        let index = cache.groups.partition_point(|group| group.start_time() <= t);
        if index == 0 {
            return Err(PathError::OutOfRange { t, start: t0 });
        }
        Ok(&cache.groups[index - 1])
    }

    fn reset_cache(&mut self) {
        *self.cache.borrow_mut() = TimelineCache {
            groups: Vec::new(),
            status: CalculationStatus::at(self.t0, self.r0, self.v0),
        };
    }
}
