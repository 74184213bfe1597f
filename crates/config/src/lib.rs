//! Configuration models and loaders for body and engine catalogs.
//!
//! Catalogs are TOML or YAML; a path may point at a single file or a
//! directory of TOML records. All quantities are SI: metres, metres per
//! second, m³/s² for gravitational parameters.

use std::fs::File;
use std::path::{Path, PathBuf};

use astro_bodies::{Body, BodyError, System};
use astro_orbits::{Orbit, OrbitError};
use astro_propulsion::EnginePerformance;
use glam::DVec3;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

/// A celestial body record. Parented bodies carry the state vectors of
/// their orbit about the parent at t = 0.
#[derive(Debug, Deserialize, Clone)]
pub struct BodyConfig {
    pub name: String,
    pub gm_m3_s2: f64,
    pub radius_m: f64,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub state: Option<StateConfig>,
}

/// Parent-relative state vectors at t = 0.
#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    pub position_m: [f64; 3],
    pub velocity_m_s: [f64; 3],
}

/// An engine record, quoting either exhaust velocity or specific impulse.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub name: String,
    pub performance: EnginePerformanceConfig,
}

/// Engine performance in catalog form.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum EnginePerformanceConfig {
    #[serde(rename = "exhaust_velocity")]
    ExhaustVelocity { ve_m_s: f64, thrust_newtons: f64 },
    #[serde(rename = "isp")]
    SpecificImpulse {
        isp_seconds: f64,
        thrust_newtons: f64,
    },
}

/// Errors that can occur while loading catalogs or assembling a system.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("catalog has no root body (every body lists a parent)")]
    NoRoot,
    #[error("catalog has multiple root bodies: '{first}' and '{second}'")]
    MultipleRoots { first: String, second: String },
    #[error("body '{name}' lists unknown parent '{parent}'")]
    UnknownParent { name: String, parent: String },
    #[error("parented body '{name}' has no state vectors")]
    MissingState { name: String },
    #[error(transparent)]
    Body(#[from] BodyError),
    #[error(transparent)]
    Orbit(#[from] OrbitError),
}

/// Load body records from a YAML file or a TOML file/directory.
pub fn load_bodies<P: AsRef<Path>>(path: P) -> Result<Vec<BodyConfig>, ConfigError> {
    load_records(path)
}

/// Load engine records from a YAML file or a TOML file/directory.
pub fn load_engines<P: AsRef<Path>>(path: P) -> Result<Vec<EngineConfig>, ConfigError> {
    load_records(path)
}

/// Convert an engine record into runtime performance figures.
pub fn engine_performance(config: &EngineConfig) -> EnginePerformance {
    match config.performance {
        EnginePerformanceConfig::ExhaustVelocity {
            ve_m_s,
            thrust_newtons,
        } => EnginePerformance::new(ve_m_s, thrust_newtons),
        EnginePerformanceConfig::SpecificImpulse {
            isp_seconds,
            thrust_newtons,
        } => EnginePerformance::from_isp(isp_seconds, thrust_newtons),
    }
}

/// Assemble a [`System`] from a body catalog. Exactly one record must be
/// parentless; children may appear in any order.
pub fn build_system(configs: &[BodyConfig]) -> Result<System, ConfigError> {
    let mut root = None;
    for config in configs {
        if config.parent.is_none() {
            match &root {
                None => root = Some(config),
                Some(existing) => {
                    return Err(ConfigError::MultipleRoots {
                        first: existing.name.clone(),
                        second: config.name.clone(),
                    })
                }
            }
        }
    }
    let root = root.ok_or(ConfigError::NoRoot)?;
    let mut system = System::new(Body::new(root.gm_m3_s2, root.radius_m, root.name.clone()));

    // Attach children once their parent is present; a full pass with no
    // progress means a parent name never resolves.
    let mut pending: Vec<&BodyConfig> = configs
        .iter()
        .filter(|config| config.parent.is_some())
        .collect();
    while !pending.is_empty() {
        let mut attached_any = false;
        let mut remaining = Vec::new();
        for config in pending {
            let parent = match &config.parent {
                Some(parent) => parent,
                None => continue,
            };
            let parent_body = match system.body(parent) {
                Some(body) => body,
                None => {
                    remaining.push(config);
                    continue;
                }
            };
            let state = config.state.as_ref().ok_or_else(|| ConfigError::MissingState {
                name: config.name.clone(),
            })?;
            let orbit = Orbit::from_state(
                parent_body,
                DVec3::from_array(state.position_m),
                DVec3::from_array(state.velocity_m_s),
            )?;
            system.add_child(
                parent,
                Body::orbiting(config.gm_m3_s2, config.radius_m, config.name.clone(), orbit),
            )?;
            attached_any = true;
        }
        if !attached_any && !remaining.is_empty() {
            let config = remaining[0];
            return Err(ConfigError::UnknownParent {
                name: config.name.clone(),
                parent: config.parent.clone().unwrap_or_default(),
            });
        }
        pending = remaining;
    }
    Ok(system)
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("toml")
}

fn toml_record<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    Ok(toml::from_str(&std::fs::read_to_string(path)?)?)
}

/// A catalog path is either a directory holding one TOML record per
/// file, a single-record TOML file, or a YAML file holding the whole
/// record list.
fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|file| is_toml(file))
            .collect();
        files.sort();
        return files.iter().map(|file| toml_record(file)).collect();
    }
    if is_toml(path) {
        Ok(vec![toml_record(path)?])
    } else {
        Ok(serde_yaml::from_reader(File::open(path)?)?)
    }
}
