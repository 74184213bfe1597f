//! Osculating two-body orbits: state-vector/element conversion, anomaly
//! bookkeeping, and time propagation through the Kepler solver.

pub mod kepler;

use std::cell::OnceCell;
use std::f64::consts::{PI, TAU};

use astro_core::angles;
use glam::{DQuat, DVec3};
use thiserror::Error;

pub use kepler::KeplerError;

/// A body massive enough to anchor a two-body orbit.
pub trait GravitySource {
    /// Standard gravitational parameter `GM` in m³/s².
    fn gm(&self) -> f64;
}

/// Failures surfaced by [`Orbit`] construction and queries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrbitError {
    /// Construction input outside the orbit domain.
    #[error("invalid orbit state: {0}")]
    InvalidArgument(String),
    /// A closed-orbit quantity was requested on an open orbit.
    #[error("orbit is open (e = {eccentricity}); it has no finite period")]
    NoPeriod { eccentricity: f64 },
    /// The minimum speed exists only on closed orbits.
    #[error("orbit is open (e = {eccentricity}); it has no minimum speed")]
    NoMinSpeed { eccentricity: f64 },
    /// A capability this orbit representation cannot provide.
    #[error("not supported: {0}")]
    NotSupported(&'static str),
    /// Anomaly propagation failed to converge.
    #[error(transparent)]
    Kepler(#[from] KeplerError),
}

/// Source state vectors an orbit was derived from, kept together with the
/// true anomaly they were captured at so the spatial frame can be
/// reconstructed later, no matter how far the orbit has been stepped.
#[derive(Debug, Clone, Copy)]
struct SourceState {
    r: DVec3,
    v: DVec3,
    true_anomaly: f64,
}

/// Cached rotations mapping the in-plane conic onto the source frame.
#[derive(Debug, Clone, Copy)]
struct Transforms {
    plane: DQuat,
    periapsis: DQuat,
}

/// An osculating two-body orbit about a primary.
///
/// Angles are radians, distances metres, times seconds. The classical
/// elements are `a` (semi-major axis), `e` (eccentricity), `i`
/// (inclination), `l` (longitude of the ascending node), `w` (argument of
/// periapsis), and `t` (true anomaly).
#[derive(Debug, Clone)]
pub struct Orbit {
    u: f64,
    a: f64,
    e: f64,
    i: f64,
    l: f64,
    w: f64,
    t: f64,
    source: Option<SourceState>,
    transforms: OnceCell<Transforms>,
}

impl Orbit {
    /// Build an orbit from primary-centred state vectors.
    pub fn from_state(
        primary: &impl GravitySource,
        r: DVec3,
        v: DVec3,
    ) -> Result<Orbit, OrbitError> {
        let u = primary.gm();
        if !r.is_finite() || !v.is_finite() {
            return Err(OrbitError::InvalidArgument(
                "state vectors must be finite".into(),
            ));
        }
        if r.length_squared() == 0.0 {
            return Err(OrbitError::InvalidArgument(
                "position vector must be non-zero".into(),
            ));
        }
        if u <= 0.0 {
            return Err(OrbitError::InvalidArgument(format!(
                "gravitational parameter must be positive, got {u}"
            )));
        }

        // Specific relative angular momentum and the node line.
        let h = r.cross(v);
        if h.length_squared() == 0.0 {
            return Err(OrbitError::InvalidArgument(
                "state vectors describe a rectilinear trajectory".into(),
            ));
        }
        let node = DVec3::new(-h.y, h.x, 0.0);
        let node_len = node.length();
        let r_len = r.length();

        let e_vec = v.cross(h) / u - r / r_len;
        let e = e_vec.length();

        let energy = v.length_squared() * 0.5 - u / r_len;
        let a = -u / (2.0 * energy);

        let i = acos_clamped(h.z / h.length());

        let l = if node_len == 0.0 {
            0.0
        } else if node.y >= 0.0 {
            acos_clamped(node.x / node_len)
        } else {
            TAU - acos_clamped(node.x / node_len)
        };

        let w = if e == 0.0 {
            0.0
        } else if node_len == 0.0 {
            acos_clamped(e_vec.x / e)
        } else if e_vec.z >= 0.0 {
            acos_clamped(node.dot(e_vec) / (node_len * e))
        } else {
            TAU - acos_clamped(node.dot(e_vec) / (node_len * e))
        };

        let t = if e == 0.0 {
            // Circular orbit: measure the anomaly from the node line, or
            // from the x axis when the orbit is equatorial.
            if node_len == 0.0 {
                angles::normalize(r.y.atan2(r.x))
            } else if r.z >= 0.0 {
                acos_clamped(node.dot(r) / (node_len * r_len))
            } else {
                TAU - acos_clamped(node.dot(r) / (node_len * r_len))
            }
        } else if r.dot(v) >= 0.0 {
            acos_clamped(e_vec.dot(r) / (e * r_len))
        } else {
            TAU - acos_clamped(e_vec.dot(r) / (e * r_len))
        };

        Ok(Orbit {
            u,
            a,
            e,
            i,
            l,
            w,
            t,
            source: Some(SourceState {
                r,
                v,
                true_anomaly: t,
            }),
            transforms: OnceCell::new(),
        })
    }

    /// Build an orbit from classical elements.
    ///
    /// The resulting orbit can be stepped and queried for scalar
    /// quantities, but [`Orbit::position`] and [`Orbit::velocity`] fail
    /// with [`OrbitError::NotSupported`]: the spatial frame is currently
    /// only recoverable from source state vectors.
    pub fn from_elements(
        primary: &impl GravitySource,
        a: f64,
        e: f64,
        i: f64,
        l: f64,
        w: f64,
        t: f64,
    ) -> Result<Orbit, OrbitError> {
        let u = primary.gm();
        if u <= 0.0 {
            return Err(OrbitError::InvalidArgument(format!(
                "gravitational parameter must be positive, got {u}"
            )));
        }
        for (name, value) in [("a", a), ("e", e), ("i", i), ("l", l), ("w", w), ("t", t)] {
            if !value.is_finite() {
                return Err(OrbitError::InvalidArgument(format!(
                    "element {name} must be finite, got {value}"
                )));
            }
        }
        if e < 0.0 {
            return Err(OrbitError::InvalidArgument(format!(
                "eccentricity must be non-negative, got {e}"
            )));
        }
        if e < 1.0 && a <= 0.0 {
            return Err(OrbitError::InvalidArgument(format!(
                "closed orbit requires a > 0, got {a}"
            )));
        }
        if e > 1.0 && a >= 0.0 {
            return Err(OrbitError::InvalidArgument(format!(
                "open orbit requires a < 0, got {a}"
            )));
        }
        Ok(Orbit {
            u,
            a,
            e,
            i,
            l,
            w,
            t,
            source: None,
            transforms: OnceCell::new(),
        })
    }

    /// Gravitational parameter of the primary (m³/s²).
    pub fn gm(&self) -> f64 {
        self.u
    }

    pub fn semi_major_axis(&self) -> f64 {
        self.a
    }

    pub fn eccentricity(&self) -> f64 {
        self.e
    }

    pub fn inclination(&self) -> f64 {
        self.i
    }

    pub fn longitude_of_ascending_node(&self) -> f64 {
        self.l
    }

    pub fn argument_of_periapsis(&self) -> f64 {
        self.w
    }

    /// Current true anomaly, normalized into `[0, 2π)` for closed orbits.
    pub fn true_anomaly(&self) -> f64 {
        if self.e < 1.0 {
            angles::normalize(self.t)
        } else {
            self.t
        }
    }

    /// Periapsis distance from the primary.
    pub fn periapsis(&self) -> f64 {
        self.a * (1.0 - self.e)
    }

    /// Apoapsis distance, defined only for closed orbits.
    pub fn apoapsis(&self) -> Option<f64> {
        (self.e < 1.0).then(|| self.a * (1.0 + self.e))
    }

    /// Semi-minor axis, defined only for closed orbits.
    pub fn semi_minor_axis(&self) -> Option<f64> {
        (self.e < 1.0).then(|| (self.a * self.a * (1.0 - self.e * self.e)).sqrt())
    }

    pub fn semiparameter(&self) -> f64 {
        self.a * (1.0 - self.e * self.e)
    }

    /// Orbital period of a closed orbit.
    pub fn period(&self) -> Result<f64, OrbitError> {
        if self.e >= 1.0 {
            return Err(OrbitError::NoPeriod {
                eccentricity: self.e,
            });
        }
        Ok(TAU * (self.a.powi(3) / self.u).sqrt())
    }

    /// Mean angular motion. For open orbits the magnitude of the
    /// semi-major axis is used.
    pub fn mean_motion(&self) -> f64 {
        (self.u / self.a.abs().powi(3)).sqrt()
    }

    /// Eccentric anomaly (hyperbolic anomaly for open orbits).
    pub fn eccentric_anomaly(&self) -> Result<f64, OrbitError> {
        if self.e < 1.0 {
            let t = angles::normalize(self.t);
            let mut ea = acos_clamped((self.e + t.cos()) / (1.0 + self.e * t.cos()));
            if t > PI && ea < PI {
                ea = TAU - ea;
            }
            Ok(ea)
        } else if self.e > 1.0 {
            let ratio = ((self.e - 1.0) / (self.e + 1.0)).sqrt();
            Ok(2.0 * (ratio * (self.t / 2.0).tan()).atanh())
        } else {
            Err(OrbitError::NotSupported(
                "parabolic trajectories have no eccentric anomaly",
            ))
        }
    }

    /// Mean anomaly matching the current true anomaly.
    pub fn mean_anomaly(&self) -> Result<f64, OrbitError> {
        let ea = self.eccentric_anomaly()?;
        if self.e < 1.0 {
            let mut m = ea - self.e * ea.sin();
            if ea > PI && m < PI {
                m = TAU - m;
            }
            Ok(m)
        } else {
            Ok(self.e * ea.sinh() - ea)
        }
    }

    /// Time elapsed since the last periapsis passage.
    pub fn time_since_periapsis(&self) -> Result<f64, OrbitError> {
        Ok(self.mean_anomaly()? / self.mean_motion())
    }

    /// Orbital speed at the given distance from the primary.
    pub fn speed_at_distance(&self, distance: f64) -> f64 {
        (self.u * (2.0 / distance - 1.0 / self.a)).sqrt()
    }

    /// Speed at periapsis, the fastest point of the orbit.
    pub fn max_speed(&self) -> f64 {
        self.speed_at_distance(self.periapsis())
    }

    /// Speed at apoapsis; only closed orbits have one.
    pub fn min_speed(&self) -> Result<f64, OrbitError> {
        match self.apoapsis() {
            Some(apoapsis) => Ok(self.speed_at_distance(apoapsis)),
            None => Err(OrbitError::NoMinSpeed {
                eccentricity: self.e,
            }),
        }
    }

    /// Position in the primary-centred inertial frame.
    pub fn position(&self) -> Result<DVec3, OrbitError> {
        let transforms = self.transforms()?;
        Ok(transforms.periapsis * (transforms.plane * self.plane_position()))
    }

    /// Velocity in the primary-centred inertial frame.
    pub fn velocity(&self) -> Result<DVec3, OrbitError> {
        let transforms = self.transforms()?;
        Ok(transforms.periapsis * (transforms.plane * self.plane_velocity()))
    }

    /// Advance the orbit in place by `dt` seconds (negative values step
    /// backwards). The cached spatial frame survives.
    pub fn step(&mut self, dt: f64) -> Result<(), OrbitError> {
        if self.e == 1.0 {
            return Err(OrbitError::NotSupported(
                "parabolic trajectories cannot be propagated",
            ));
        }
        let mut m = self.mean_anomaly()? + self.mean_motion() * dt;
        if self.e < 1.0 {
            m = angles::normalize(m);
        }
        let ea = kepler::solve(self.e, m)?;
        self.t = self.true_anomaly_from_eccentric(ea);
        Ok(())
    }

    /// Return a copy advanced by `dt` seconds. The copy inherits an
    /// already-initialized spatial frame, so predictions share the frame
    /// of their parent.
    pub fn predict(&self, dt: f64) -> Result<Orbit, OrbitError> {
        let mut prediction = self.clone();
        prediction.step(dt)?;
        Ok(prediction)
    }

    fn true_anomaly_from_eccentric(&self, ea: f64) -> f64 {
        if self.e < 1.0 {
            let mut t = acos_clamped((ea.cos() - self.e) / (1.0 - self.e * ea.cos()));
            if ea > PI && t < PI {
                t = TAU - t;
            }
            t
        } else {
            let ratio = ((self.e + 1.0) / (self.e - 1.0)).sqrt();
            2.0 * (ratio * (ea / 2.0).tanh()).atan()
        }
    }

    /// Conic position in the orbital-plane frame at the current anomaly.
    fn plane_position(&self) -> DVec3 {
        self.plane_position_at(self.t)
    }

    fn plane_position_at(&self, t: f64) -> DVec3 {
        let radius = self.semiparameter() / (1.0 + self.e * t.cos());
        DVec3::new(radius * t.cos(), radius * t.sin(), 0.0)
    }

    /// Conic velocity in the orbital-plane frame at the current anomaly.
    fn plane_velocity(&self) -> DVec3 {
        let g = (self.u / self.semiparameter()).sqrt();
        DVec3::new(-g * self.t.sin(), g * (self.e + self.t.cos()), 0.0)
    }

    /// Rotations from the plane frame into the source frame, computed once
    /// on first use from the original `(r0, v0)`. The plane rotation
    /// carries `(0,0,1)` onto the orbit normal; the periapsis rotation
    /// aligns the in-plane point at the epoch anomaly with the stored
    /// source position, so the frame is the same however far the orbit
    /// has been stepped before the first read.
    fn transforms(&self) -> Result<Transforms, OrbitError> {
        if let Some(transforms) = self.transforms.get() {
            return Ok(*transforms);
        }
        let SourceState { r, v, true_anomaly } = self.source.ok_or(OrbitError::NotSupported(
            "spatial frames require an orbit built from state vectors",
        ))?;
        let normal = r.cross(v).normalize();
        let plane = DQuat::from_rotation_arc(DVec3::Z, normal);
        let flat = plane * self.plane_position_at(true_anomaly);
        let periapsis = DQuat::from_rotation_arc(flat.normalize(), r.normalize());
        let transforms = Transforms { plane, periapsis };
        let _ = self.transforms.set(transforms);
        Ok(transforms)
    }
}

fn acos_clamped(value: f64) -> f64 {
    value.clamp(-1.0, 1.0).acos()
}
