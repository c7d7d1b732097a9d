//! Two-body propagation of catalog bodies

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use chrono::{DateTime, Utc};
use nalgebra::Vector3;

use super::elements::{OrbitalElements, EARTH_RADIUS_M, SECONDS_PER_DAY};
use super::frames::{inertial_to_earth_fixed, perifocal_to_inertial, NodeRotation};
use super::kepler;
use super::orbit_track::PathFrame;
use super::sidereal::greenwich_mean_sidereal_time;

/// Number of points in a sampled orbit path
pub const DEFAULT_PATH_POINTS: usize = 100;

/// Frame conventions shared by live positions and sampled paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationConfig {
    /// RAAN handling in the perifocal transform
    pub node_rotation: NodeRotation,
    /// Frame the static orbit paths are expressed in
    pub path_frame: PathFrame,
    /// Points per sampled orbit path
    pub path_points: usize,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            node_rotation: NodeRotation::Apply,
            path_frame: PathFrame::Inertial,
            path_points: DEFAULT_PATH_POINTS,
        }
    }
}

/// A tracked object: stable identity plus its element set
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Unique key used for visibility lookups and path association
    pub id: String,
    pub name: String,
    pub elements: OrbitalElements,
}

impl Body {
    pub fn new(id: impl Into<String>, name: impl Into<String>, elements: OrbitalElements) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            elements,
        }
    }
}

/// Propagation result for a single body
#[derive(Debug, Clone, PartialEq)]
pub struct BodyState {
    pub id: String,
    /// Position in the Earth-fixed frame (meters)
    pub position: Vector3<f64>,
    /// Height above the mean Earth radius (meters)
    pub altitude_m: f64,
    /// Age of the element set at the propagation time, in days (negative
    /// when propagating before the epoch)
    pub element_age_days: f64,
}

/// Signed seconds from `from` to `to`
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) * 1e-9
}

/// Mean anomaly at `time`, wrapped to [0, 2π)
pub fn mean_anomaly_at(elements: &OrbitalElements, time: DateTime<Utc>) -> f64 {
    let elapsed = seconds_between(elements.epoch(), time);
    (elements.mean_anomaly() + elements.mean_motion() * elapsed).rem_euclid(TAU)
}

/// Inertial position (meters) of a body at `time`
pub fn inertial_position_at(
    elements: &OrbitalElements,
    time: DateTime<Utc>,
    node: NodeRotation,
) -> Vector3<f64> {
    let m = mean_anomaly_at(elements, time);
    let sol = kepler::solve(m, elements.eccentricity(), elements.semi_major_axis());
    perifocal_to_inertial(
        sol.radius,
        sol.true_anomaly,
        elements.inclination(),
        elements.raan(),
        elements.arg_perigee(),
        node,
    )
}

/// Earth-fixed position (meters) of a body at `time`.
///
/// Pure function of its inputs: the same elements and instant always give the
/// same position.
pub fn position_at(
    elements: &OrbitalElements,
    time: DateTime<Utc>,
    node: NodeRotation,
) -> Vector3<f64> {
    let eci = inertial_position_at(elements, time, node);
    inertial_to_earth_fixed(&eci, greenwich_mean_sidereal_time(time))
}

/// Manages two-body propagation for all loaded bodies
#[derive(Debug, Clone, Default)]
pub struct PropagationEngine {
    config: PropagationConfig,
    /// Bodies indexed by id, iterated in id order
    bodies: BTreeMap<String, Body>,
}

impl PropagationEngine {
    pub fn new(config: PropagationConfig) -> Self {
        Self {
            config,
            bodies: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Replace the body set. Later duplicates of an id win.
    pub fn load_bodies(&mut self, bodies: impl IntoIterator<Item = Body>) {
        self.bodies.clear();
        for body in bodies {
            if let Some(previous) = self.bodies.insert(body.id.clone(), body) {
                log::debug!("Duplicate body id {}, keeping the later element set", previous.id);
            }
        }

        log::info!("Loaded {} bodies for propagation", self.bodies.len());
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn body(&self, id: &str) -> Option<&Body> {
        self.bodies.get(id)
    }

    /// All bodies in id order
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    /// Earth-fixed position using this engine's node convention
    pub fn position_at(&self, elements: &OrbitalElements, time: DateTime<Utc>) -> Vector3<f64> {
        position_at(elements, time, self.config.node_rotation)
    }

    /// Inertial position using this engine's node convention
    pub fn inertial_position_at(
        &self,
        elements: &OrbitalElements,
        time: DateTime<Utc>,
    ) -> Vector3<f64> {
        inertial_position_at(elements, time, self.config.node_rotation)
    }

    /// Propagate a single body
    pub fn propagate(&self, id: &str, time: DateTime<Utc>) -> Option<BodyState> {
        let body = self.bodies.get(id)?;
        Some(self.state_of(body, time))
    }

    /// Propagate all bodies, ordered by id
    pub fn propagate_all(&self, time: DateTime<Utc>) -> Vec<BodyState> {
        self.bodies
            .values()
            .map(|body| self.state_of(body, time))
            .collect()
    }

    fn state_of(&self, body: &Body, time: DateTime<Utc>) -> BodyState {
        let position = self.position_at(&body.elements, time);
        let age_days = seconds_between(body.elements.epoch(), time) / SECONDS_PER_DAY;

        BodyState {
            id: body.id.clone(),
            position,
            altitude_m: position.norm() - EARTH_RADIUS_M,
            element_age_days: age_days,
        }
    }
}
