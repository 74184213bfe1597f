//! Flight-path prediction for maneuverable craft in nested gravitational
//! systems.
//!
//! The workspace answers one question: *where and how fast is a craft at
//! time t?* Celestial bodies ride fixed Keplerian rails in a tree of
//! spheres of influence; craft trajectories are stitched together from
//! closed-form ballistic arcs and mean-acceleration thrust arcs by
//! [`FlightPath`]. Keeping the physics in library crates lets multiple
//! front-ends share it; this facade re-exports the public surface.

pub use astro_bodies::{Body, BodyError, System};
pub use astro_core::{angles, constants};
pub use astro_orbits::{kepler, GravitySource, KeplerError, Orbit, OrbitError};
pub use astro_path::{
    CalculationStatus, FlightPath, KinematicData, Maneuver, OrbitData, PathError, ThrustDirection,
};
pub use astro_propulsion::EnginePerformance;

/// Catalog models and loaders.
pub mod config {
    pub use astro_config::*;
}

/// Returns the version of the library for smoke tests.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
