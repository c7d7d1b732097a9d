//! Orbit path sampling

use chrono::{DateTime, Duration, Utc};
use nalgebra::Vector3;

use super::elements::OrbitalElements;
use super::frames::NodeRotation;
use super::propagator::{inertial_position_at, position_at, PropagationEngine};

/// Frame a sampled orbit path is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathFrame {
    /// Non-rotating frame. A two-body orbit is a fixed ellipse here, so the
    /// path can be drawn once and reused every frame.
    #[default]
    Inertial,
    /// Rotating frame. Each sample is rotated by the sidereal angle at its own
    /// sample time, giving the ground-relative track over one period.
    EarthFixed,
}

impl PathFrame {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inertial => "inertial",
            Self::EarthFixed => "earth-fixed",
        }
    }
}

/// Static polyline for one body, built once when the body is created
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitTrack {
    pub body_id: String,
    pub frame: PathFrame,
    pub reference_time: DateTime<Utc>,
    /// Ordered samples (meters). The path closes back on the first point.
    pub points: Vec<Vector3<f64>>,
}

/// Sample `num_points` positions evenly spaced in time (and therefore in
/// mean anomaly) across one orbital period starting at `reference_time`.
pub fn sample_path(
    elements: &OrbitalElements,
    num_points: usize,
    reference_time: DateTime<Utc>,
    frame: PathFrame,
    node: NodeRotation,
) -> Vec<Vector3<f64>> {
    if num_points == 0 {
        return Vec::new();
    }

    let step_seconds = elements.period() / num_points as f64;
    (0..num_points)
        .map(|k| {
            let offset_ns = (step_seconds * k as f64 * 1e9).round() as i64;
            let sample_time = reference_time + Duration::nanoseconds(offset_ns);
            match frame {
                PathFrame::Inertial => inertial_position_at(elements, sample_time, node),
                PathFrame::EarthFixed => position_at(elements, sample_time, node),
            }
        })
        .collect()
}

impl PropagationEngine {
    /// Build the static orbit track of a loaded body using the engine's
    /// configured frame and point count
    pub fn orbit_track(&self, id: &str, reference_time: DateTime<Utc>) -> Option<OrbitTrack> {
        let body = self.body(id)?;
        let config = self.config();
        let points = sample_path(
            &body.elements,
            config.path_points,
            reference_time,
            config.path_frame,
            config.node_rotation,
        );

        Some(OrbitTrack {
            body_id: body.id.clone(),
            frame: config.path_frame,
            reference_time,
            points,
        })
    }

    /// Orbit tracks for every loaded body, in id order
    pub fn orbit_tracks(&self, reference_time: DateTime<Utc>) -> Vec<OrbitTrack> {
        let ids: Vec<String> = self.bodies().map(|b| b.id.clone()).collect();
        let tracks: Vec<OrbitTrack> = ids
            .iter()
            .filter_map(|id| self.orbit_track(id, reference_time))
            .collect();

        log::debug!(
            "Sampled {} orbit tracks ({} frame, {} points each)",
            tracks.len(),
            self.config().path_frame.name(),
            self.config().path_points
        );
        tracks
    }
}
