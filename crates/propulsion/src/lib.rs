//! Engine performance descriptors shared by maneuver planning.

use astro_core::constants::G0;

/// Performance figures for a constant-thrust engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnginePerformance {
    /// Effective exhaust velocity (m/s).
    pub exhaust_velocity: f64,
    /// Thrust (N).
    pub thrust: f64,
}

impl EnginePerformance {
    pub fn new(exhaust_velocity: f64, thrust: f64) -> EnginePerformance {
        EnginePerformance {
            exhaust_velocity,
            thrust,
        }
    }

    /// Build from a specific impulse quoted in seconds.
    pub fn from_isp(isp_seconds: f64, thrust: f64) -> EnginePerformance {
        EnginePerformance {
            exhaust_velocity: isp_seconds * G0,
            thrust,
        }
    }

    /// Propellant mass flow rate at full thrust (kg/s).
    pub fn flow_rate(&self) -> f64 {
        self.thrust / self.exhaust_velocity
    }
}
