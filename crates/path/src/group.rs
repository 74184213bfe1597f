//! Segment groups: ordered runs of segments sharing one maneuver state
//! (a coast, or one specific burn), bounded by the next maneuver boundary.

use astro_bodies::System;
use glam::DVec3;

use crate::maneuver::Maneuver;
use crate::segment::{BallisticSegment, Segment, ThrustSegment};
use crate::{CalculationStatus, KinematicData, PathError};

/// Which maneuver state the group's segments share.
#[derive(Debug)]
enum GroupKind {
    Ballistic,
    Thrust(Maneuver),
}

/// An ordered run of segments covering one maneuver state.
#[derive(Debug)]
pub(crate) struct SegmentGroup<'s> {
    kind: GroupKind,
    t0: f64,
    /// Upper bound of the group's span: the burn's end for thrust groups,
    /// the next maneuver's start (if any) for ballistic groups.
    tf: Option<f64>,
    segments: Vec<Segment<'s>>,
    status: CalculationStatus,
}

impl<'s> SegmentGroup<'s> {
    /// Create a coasting group, optionally capped at `tf`.
    pub(crate) fn ballistic(
        r: DVec3,
        v: DVec3,
        t: f64,
        tf: Option<f64>,
    ) -> Result<SegmentGroup<'s>, PathError> {
        SegmentGroup::validated(GroupKind::Ballistic, r, v, t, tf)
    }

    /// Create a group covering one burn. The group time must equal the
    /// maneuver's ignition time; the cap is always the burn's end.
    pub(crate) fn thrust(
        maneuver: Maneuver,
        r: DVec3,
        v: DVec3,
        t: f64,
    ) -> Result<SegmentGroup<'s>, PathError> {
        if maneuver.t0() != t {
            return Err(PathError::InvalidArgument(format!(
                "group time {t} does not match maneuver ignition at {}",
                maneuver.t0()
            )));
        }
        let tf = Some(maneuver.t1());
        SegmentGroup::validated(GroupKind::Thrust(maneuver), r, v, t, tf)
    }

    fn validated(
        kind: GroupKind,
        r: DVec3,
        v: DVec3,
        t: f64,
        tf: Option<f64>,
    ) -> Result<SegmentGroup<'s>, PathError> {
        if t < 0.0 {
            return Err(PathError::InvalidArgument(format!(
                "group start time must be non-negative, got {t}"
            )));
        }
        if r.length_squared() == 0.0 {
            return Err(PathError::InvalidArgument(
                "group start position must be non-zero".into(),
            ));
        }
        if let Some(tf) = tf {
            if tf <= t {
                return Err(PathError::InvalidArgument(format!(
                    "group cap {tf} must come after its start {t}"
                )));
            }
        }
        Ok(SegmentGroup {
            kind,
            t0: t,
            tf,
            segments: Vec::new(),
            status: CalculationStatus::at(t, r, v),
        })
    }

    pub(crate) fn start_time(&self) -> f64 {
        self.t0
    }

    pub(crate) fn status(&self) -> CalculationStatus {
        self.status
    }

    /// Extend the group's segments until `t` is covered or the cap is
    /// reached. Finalizing at the cap truncates the status to exactly
    /// `tf` and clears `incomplete`.
    pub(crate) fn calculate(&mut self, system: &'s System, t: f64) -> Result<(), PathError> {
        if t < self.t0 {
            return Err(PathError::OutOfRange { t, start: self.t0 });
        }
        let t = match self.tf {
            Some(tf) if t > tf => tf,
            _ => t,
        };
        if t < self.status.end_t {
            return Ok(());
        }

        // Resume the trailing segment before spawning new ones.
        if let Some(last) = self.segments.last_mut() {
            if last.status().incomplete {
                last.calculate(system, t)?;
                let status = last.status();
                self.status.end_t = status.end_t;
                self.status.r = status.r;
                self.status.v = status.v;
            }
        }

        while self.status.end_t <= t && self.tf.map_or(true, |tf| self.status.end_t < tf) {
            let start = self.status.end_t;
            let mut segment = self.create_segment(system, self.status.r, self.status.v, start)?;
            segment.calculate(system, t)?;
            let status = segment.status();
            if status.end_t <= start {
                return Err(PathError::NonProgress { t: start });
            }
            self.segments.push(segment);
            self.status.end_t = status.end_t;
            self.status.r = status.r;
            self.status.v = status.v;
        }

        if let Some(tf) = self.tf {
            if self.status.end_t >= tf {
                let end = self.get_segment(tf)?.predict(system, tf)?;
                self.status = CalculationStatus {
                    end_t: tf,
                    r: end.position,
                    v: end.velocity,
                    incomplete: false,
                };
                return Ok(());
            }
        }
        self.status.incomplete = true;
        Ok(())
    }

    pub(crate) fn predict(&self, system: &System, t: f64) -> Result<KinematicData, PathError> {
        self.get_segment(t)?.predict(system, t)
    }

    /// The segment whose start time is the greatest at or before `t`.
    pub(crate) fn get_segment(&self, t: f64) -> Result<&Segment<'s>, PathError> {
        let index = self
            .segments
            .partition_point(|segment| segment.start_time() <= t);
        if index == 0 {
            return Err(PathError::OutOfRange { t, start: self.t0 });
        }
        Ok(&self.segments[index - 1])
    }

    fn create_segment(
        &self,
        system: &'s System,
        r: DVec3,
        v: DVec3,
        t: f64,
    ) -> Result<Segment<'s>, PathError> {
        Ok(match &self.kind {
            GroupKind::Ballistic => Segment::Ballistic(BallisticSegment::new(system, r, v, t)?),
            GroupKind::Thrust(maneuver) => {
                Segment::Thrust(ThrustSegment::new(system, *maneuver, r, v, t)?)
            }
        })
    }
}
