//! Orbital propagation module
//!
//! Two-body Keplerian propagation of catalog bodies:
//!
//! - `elements`: validated Keplerian element sets and Earth constants
//! - `kepler`: mean → eccentric/true anomaly and orbital radius
//! - `frames`: perifocal → inertial → Earth-fixed transforms
//! - `sidereal`: Greenwich Mean Sidereal Time
//! - `propagator`: position of a body at an instant, body set management
//! - `orbit_track`: static orbit paths sampled over one period
//!
//! # Example
//!
//! ```ignore
//! use orbitclock::propagation::*;
//!
//! let mut engine = PropagationEngine::new(PropagationConfig::default());
//! engine.load_bodies(bodies);
//!
//! let states = engine.propagate_all(clock.simulated_time());
//! let track = engine.orbit_track("25544", clock.simulated_time());
//! ```

pub mod elements;
pub mod frames;
pub mod kepler;
pub mod sidereal;

mod orbit_track;
mod propagator;

pub use elements::{ElementError, ElementInputs, OrbitalElements, EARTH_RADIUS_M, MU_EARTH};
pub use frames::NodeRotation;
pub use kepler::KeplerSolution;
pub use orbit_track::*;
pub use propagator::*;
pub use sidereal::greenwich_mean_sidereal_time;
