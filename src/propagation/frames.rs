//! Perifocal, inertial and Earth-fixed frame transforms

use nalgebra::{Rotation3, Vector3};

/// Whether the RAAN node rotation is applied in the perifocal transform.
///
/// Some element consumers render orbits without the node rotation. Keeping
/// it an explicit switch means live positions and sampled paths always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeRotation {
    /// Rotate about the polar axis by RAAN after argument of perigee and
    /// inclination.
    #[default]
    Apply,
    /// Leave RAAN out of the rotation.
    Ignore,
}

impl NodeRotation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::Ignore => "ignore",
        }
    }
}

/// Position in the inertial frame from radius and true anomaly.
///
/// Argument of perigee and inclination are folded into the in-plane
/// components; the node rotation by `raan` follows when `node` is
/// [`NodeRotation::Apply`]. Output is in the unit of `radius`.
pub fn perifocal_to_inertial(
    radius: f64,
    true_anomaly: f64,
    inclination: f64,
    raan: f64,
    arg_perigee: f64,
    node: NodeRotation,
) -> Vector3<f64> {
    let (sin_nu, cos_nu) = true_anomaly.sin_cos();
    let (sin_w, cos_w) = arg_perigee.sin_cos();
    let (sin_i, cos_i) = inclination.sin_cos();

    let in_plane = Vector3::new(
        radius * (cos_nu * cos_w - sin_nu * sin_w * cos_i),
        radius * (cos_nu * sin_w + sin_nu * cos_w * cos_i),
        radius * sin_nu * sin_i,
    );

    match node {
        NodeRotation::Apply => polar_rotation(raan) * in_plane,
        NodeRotation::Ignore => in_plane,
    }
}

/// Rotate an inertial vector into the Earth-fixed frame at sidereal angle `gmst`
pub fn inertial_to_earth_fixed(eci: &Vector3<f64>, gmst: f64) -> Vector3<f64> {
    polar_rotation(-gmst).transform_vector(eci)
}

/// Inverse of [`inertial_to_earth_fixed`]
pub fn earth_fixed_to_inertial(ecef: &Vector3<f64>, gmst: f64) -> Vector3<f64> {
    polar_rotation(gmst).transform_vector(ecef)
}

/// Geocentric latitude and longitude (rad) of an Earth-fixed position
pub fn geocentric_lat_lon(ecef: &Vector3<f64>) -> (f64, f64) {
    let horizontal = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();
    (ecef.z.atan2(horizontal), ecef.y.atan2(ecef.x))
}

fn polar_rotation(angle: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), angle)
}
