//! Celestial bodies on fixed Keplerian rails, arranged in a tree owned by
//! a [`System`], with sphere-of-influence lookup for any point in space.

use std::collections::{HashMap, HashSet};

use astro_core::constants::G;
use astro_orbits::{GravitySource, Orbit, OrbitError};
use glam::DVec3;
use thiserror::Error;

/// Failures surfaced by body-tree construction and queries.
#[derive(Debug, Error)]
pub enum BodyError {
    /// A parented body was attached without an orbit about its parent.
    #[error("body '{id}' requires an orbit to be attached to a parent")]
    MissingOrbit { id: String },
    /// A body id was not found in the system.
    #[error("unknown body '{id}'")]
    UnknownBody { id: String },
    /// Propagating a body's rail orbit failed.
    #[error(transparent)]
    Orbit(#[from] OrbitError),
}

/// An immutable celestial body: gravitational parameter, physical radius,
/// and (for parented bodies) the orbit it rides about its parent.
#[derive(Debug, Clone)]
pub struct Body {
    id: String,
    gm: f64,
    radius: f64,
    orbit: Option<Orbit>,
    parent: Option<String>,
    children: Vec<String>,
    sphere_of_influence: Option<f64>,
}

impl Body {
    /// Create a free-standing body (a system root, or a child awaiting
    /// attachment via [`System::add_child`]).
    pub fn new(gm: f64, radius: f64, id: impl Into<String>) -> Body {
        Body {
            id: id.into(),
            gm,
            radius,
            orbit: None,
            parent: None,
            children: Vec::new(),
            sphere_of_influence: None,
        }
    }

    /// Create a body carrying the orbit it will ride about its parent.
    pub fn orbiting(gm: f64, radius: f64, id: impl Into<String>, orbit: Orbit) -> Body {
        Body {
            orbit: Some(orbit),
            ..Body::new(gm, radius, id)
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn gm(&self) -> f64 {
        self.gm
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Mass implied by the gravitational parameter.
    pub fn mass(&self) -> f64 {
        self.gm / G
    }

    pub fn orbit(&self) -> Option<&Orbit> {
        self.orbit.as_ref()
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn child_ids(&self) -> &[String] {
        &self.children
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Radius of the sphere of influence, set when the body is attached to
    /// a parent. Roots have none.
    pub fn sphere_of_influence(&self) -> Option<f64> {
        self.sphere_of_influence
    }

    /// Position relative to the parent at time `t` (zero for roots).
    pub fn local_position(&self, t: f64) -> Result<DVec3, OrbitError> {
        match &self.orbit {
            Some(orbit) => orbit.predict(t)?.position(),
            None => Ok(DVec3::ZERO),
        }
    }

    /// Velocity relative to the parent at time `t` (zero for roots).
    pub fn local_velocity(&self, t: f64) -> Result<DVec3, OrbitError> {
        match &self.orbit {
            Some(orbit) => orbit.predict(t)?.velocity(),
            None => Ok(DVec3::ZERO),
        }
    }
}

impl GravitySource for Body {
    fn gm(&self) -> f64 {
        self.gm
    }
}

/// Owner of a body tree. Bodies are stored in an arena keyed by id; the
/// tree structure lives in parent/child id links.
#[derive(Debug)]
pub struct System {
    id: String,
    root: String,
    bodies: HashMap<String, Body>,
    actors: HashSet<String>,
}

impl System {
    /// Create a system owning `root` at its origin.
    pub fn new(root: Body) -> System {
        System::with_id(String::new(), root)
    }

    /// Create a system with an explicit id.
    pub fn with_id(id: impl Into<String>, root: Body) -> System {
        let root_id = root.id.clone();
        let mut bodies = HashMap::new();
        bodies.insert(root_id.clone(), root);
        System {
            id: id.into(),
            root: root_id,
            bodies,
            actors: HashSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Body {
        &self.bodies[&self.root]
    }

    pub fn body(&self, id: &str) -> Option<&Body> {
        self.bodies.get(id)
    }

    /// Attach `child` under `parent_id`. The child must carry an orbit
    /// about its parent, able to produce spatial positions (rail orbits
    /// are queried for vectors, so element-only orbits are rejected
    /// here rather than at first prediction). The child's sphere of
    /// influence is derived at attach time. Re-attaching an id already
    /// present is a no-op.
    pub fn add_child(&mut self, parent_id: &str, child: Body) -> Result<(), BodyError> {
        if self.bodies.contains_key(&child.id) {
            return Ok(());
        }
        let parent_gm = match self.bodies.get(parent_id) {
            Some(parent) => parent.gm,
            None => {
                return Err(BodyError::UnknownBody {
                    id: parent_id.to_string(),
                })
            }
        };
        let orbit = match &child.orbit {
            Some(orbit) => orbit,
            None => {
                return Err(BodyError::MissingOrbit {
                    id: child.id.clone(),
                })
            }
        };
        // Surfaces NotSupported for element-only orbits before the body
        // joins the tree.
        orbit.position()?;
        let sphere = (orbit.semi_major_axis() * child.gm / parent_gm).powf(0.4);

        let child_id = child.id.clone();
        let mut child = child;
        child.parent = Some(parent_id.to_string());
        child.sphere_of_influence = Some(sphere);
        self.bodies.insert(child_id.clone(), child);
        if let Some(parent) = self.bodies.get_mut(parent_id) {
            parent.children.push(child_id);
        }
        Ok(())
    }

    /// Whether `parent` is the direct parent of `child`.
    pub fn is_parent(&self, parent: &Body, child: &Body) -> bool {
        child.parent.as_deref() == Some(parent.id())
    }

    /// Position of `body` in the system frame at time `t`, accumulated up
    /// the parent chain.
    pub fn predict_system_position(&self, body: &Body, t: f64) -> Result<DVec3, BodyError> {
        let mut position = body.local_position(t)?;
        let mut parent = body.parent.as_deref();
        while let Some(id) = parent {
            let ancestor = self.bodies.get(id).ok_or_else(|| BodyError::UnknownBody {
                id: id.to_string(),
            })?;
            position += ancestor.local_position(t)?;
            parent = ancestor.parent.as_deref();
        }
        Ok(position)
    }

    /// Velocity of `body` in the system frame at time `t`.
    pub fn predict_system_velocity(&self, body: &Body, t: f64) -> Result<DVec3, BodyError> {
        let mut velocity = body.local_velocity(t)?;
        let mut parent = body.parent.as_deref();
        while let Some(id) = parent {
            let ancestor = self.bodies.get(id).ok_or_else(|| BodyError::UnknownBody {
                id: id.to_string(),
            })?;
            velocity += ancestor.local_velocity(t)?;
            parent = ancestor.parent.as_deref();
        }
        Ok(velocity)
    }

    /// The deepest body whose sphere of influence contains `r` at time
    /// `t`. Sibling spheres are assumed disjoint, so at most one child
    /// matches at each level.
    pub fn find_primary_influence(&self, r: DVec3, t: f64) -> Result<&Body, BodyError> {
        let mut primary = self.root();
        let mut origin = DVec3::ZERO;
        'descend: loop {
            for child_id in &primary.children {
                let child = self
                    .bodies
                    .get(child_id)
                    .ok_or_else(|| BodyError::UnknownBody {
                        id: child_id.clone(),
                    })?;
                let sphere = match child.sphere_of_influence {
                    Some(sphere) => sphere,
                    None => continue,
                };
                let child_position = origin + child.local_position(t)?;
                if (child_position - r).length_squared() < sphere * sphere {
                    primary = child;
                    origin = child_position;
                    continue 'descend;
                }
            }
            return Ok(primary);
        }
    }

    /// Register an actor as resident in this system.
    pub fn add_actor(&mut self, actor_id: impl Into<String>) {
        self.actors.insert(actor_id.into());
    }

    /// Drop an actor from this system's registry.
    pub fn remove_actor(&mut self, actor_id: &str) -> bool {
        self.actors.remove(actor_id)
    }

    /// Ids of the actors resident in this system.
    pub fn actor_ids(&self) -> impl Iterator<Item = &str> {
        self.actors.iter().map(String::as_str)
    }
}
