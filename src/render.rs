//! Hand-off to a renderer: unit and axis conversion, instance colors,
//! orbit polylines and the sun direction for lighting.
//!
//! Propagation works in meters with Z toward the pole. Scenes here are Y-up
//! and measured in Earth radii.

use chrono::{DateTime, Datelike, Utc};
use glam::Vec3;
use nalgebra::Vector3;

use crate::propagation::frames::inertial_to_earth_fixed;
use crate::propagation::{greenwich_mean_sidereal_time, OrbitTrack, PathFrame, EARTH_RADIUS_M};
use crate::sim::FrameSnapshot;

const SOLAR_DECLINATION_MAX_DEG: f64 = -23.45;
const DAYS_PER_YEAR: f64 = 365.0;

/// Instance data for one satellite point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SatelliteInstance {
    /// Position in world space (Earth radii, Y-up)
    pub position: [f32; 3],
    /// Color based on altitude (RGBA)
    pub color: [f32; 4],
    /// Size multiplier
    pub size: f32,
}

/// Meters, Z-up → Earth radii, Y-up.
///
/// X stays X, the polar Z becomes Y, and Y becomes -Z so the frame stays
/// right-handed.
pub fn to_render_space(position_m: &Vector3<f64>) -> Vec3 {
    let scaled = position_m.unscale(EARTH_RADIUS_M);
    Vec3::new(scaled.x as f32, scaled.z as f32, -scaled.y as f32)
}

/// Get color for a satellite based on altitude (in km)
pub fn altitude_to_color(altitude_km: f64) -> [f32; 4] {
    let alt = altitude_km as f32;

    if alt < 2000.0 {
        // LEO: blue to cyan
        let t = (alt.max(500.0) - 500.0) / 1500.0;
        [0.2, 0.4 + 0.6 * t, 1.0, 1.0]
    } else if alt < 35000.0 {
        // MEO: cyan to green
        let t = (alt - 2000.0) / 33000.0;
        [0.2 * (1.0 - t), 1.0, 1.0 - t, 1.0]
    } else if alt < 40000.0 {
        // GEO band
        [1.0, 1.0, 0.0, 1.0]
    } else {
        // HEO: orange to red
        let t = ((alt - 40000.0) / 50000.0).min(1.0);
        [1.0, 1.0 - 0.5 * t, 0.0, 1.0]
    }
}

/// Instances for every visible body in a frame
pub fn satellite_instances(snapshot: &FrameSnapshot, size: f32) -> Vec<SatelliteInstance> {
    snapshot
        .visible()
        .map(|body| SatelliteInstance {
            position: to_render_space(&body.state.position).to_array(),
            color: altitude_to_color(body.state.altitude_m / 1000.0),
            size,
        })
        .collect()
}

/// Line strip for an orbit track, closed back onto its first point.
///
/// Live positions are Earth-fixed, so inertial tracks are turned by the
/// frame's Earth rotation angle (`FrameSnapshot::earth_rotation`) to stay
/// under their bodies. Earth-fixed tracks are drawn as sampled.
pub fn orbit_polyline(track: &OrbitTrack, earth_rotation: f64) -> Vec<Vec3> {
    let mut points: Vec<Vec3> = match track.frame {
        PathFrame::Inertial => track
            .points
            .iter()
            .map(|p| to_render_space(&inertial_to_earth_fixed(p, earth_rotation)))
            .collect(),
        PathFrame::EarthFixed => track.points.iter().map(to_render_space).collect(),
    };
    if let Some(first) = points.first().copied() {
        points.push(first);
    }
    points
}

/// Approximate unit vector toward the Sun in the inertial frame (Z-up).
///
/// Low-precision declination/right-ascension model; good enough for a
/// day/night terminator.
pub fn sun_direction(time: DateTime<Utc>) -> Vector3<f64> {
    let day_of_year = time.ordinal() as f64;
    let declination = (SOLAR_DECLINATION_MAX_DEG
        * ((360.0 / DAYS_PER_YEAR) * (day_of_year + 10.0)).to_radians().cos())
    .to_radians();
    let right_ascension = ((day_of_year - 80.0) * 360.0 / DAYS_PER_YEAR).to_radians();

    Vector3::new(
        declination.cos() * right_ascension.cos(),
        declination.cos() * right_ascension.sin(),
        declination.sin(),
    )
}

/// Sun direction in the Earth-fixed frame, for lighting a rotating globe
pub fn sun_direction_earth_fixed(time: DateTime<Utc>) -> Vector3<f64> {
    inertial_to_earth_fixed(&sun_direction(time), greenwich_mean_sidereal_time(time))
}
