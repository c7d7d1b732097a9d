//! Keplerian element sets and physical constants

use std::f64::consts::TAU;

use chrono::{DateTime, Utc};

/// Gravitational constant in N⋅m²/kg²
pub const GRAVITATIONAL_CONSTANT: f64 = 6.6743e-11;

/// Mass of Earth in kg
pub const EARTH_MASS_KG: f64 = 5.972e24;

/// Earth's gravitational parameter (G·M) in m³/s²
pub const MU_EARTH: f64 = GRAVITATIONAL_CONSTANT * EARTH_MASS_KG;

/// Earth's mean radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Reasons an element set is rejected before it reaches the propagator
#[derive(Debug, Clone, PartialEq)]
pub enum ElementError {
    /// A field is NaN or infinite after parsing
    NonFinite { field: &'static str },

    /// Mean motion must be strictly positive
    NonPositiveMeanMotion(f64),

    /// Semi-major axis must be strictly positive
    NonPositiveSemiMajorAxis(f64),

    /// Only closed orbits (0 <= e < 1) are supported
    UnsupportedEccentricity(f64),

    /// A required field was absent from the source record
    MissingField { field: &'static str },
}

impl std::fmt::Display for ElementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinite { field } => write!(f, "Field {} is not a finite number", field),
            Self::NonPositiveMeanMotion(n) => {
                write!(f, "Mean motion must be positive, got {} rad/s", n)
            }
            Self::NonPositiveSemiMajorAxis(a) => {
                write!(f, "Semi-major axis must be positive, got {} m", a)
            }
            Self::UnsupportedEccentricity(e) => {
                write!(f, "Eccentricity {} is outside the closed-orbit range [0, 1)", e)
            }
            Self::MissingField { field } => write!(f, "Missing field {}", field),
        }
    }
}

impl std::error::Error for ElementError {}

/// Raw element values in SI units and radians, before validation
#[derive(Debug, Clone, Copy)]
pub struct ElementInputs {
    /// Semi-major axis in meters; derived from mean motion when `None`
    pub semi_major_axis: Option<f64>,
    pub eccentricity: f64,
    /// Inclination (rad)
    pub inclination: f64,
    /// Right ascension of ascending node (rad)
    pub raan: f64,
    /// Argument of perigee (rad)
    pub arg_perigee: f64,
    /// Mean anomaly at epoch (rad)
    pub mean_anomaly: f64,
    /// Mean motion (rad/s)
    pub mean_motion: f64,
    pub epoch: DateTime<Utc>,
}

/// Immutable Keplerian elements of one body.
///
/// All angles are radians, lengths meters and rates rad/s. Instances can only
/// be built through [`OrbitalElements::new`], which enforces those ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalElements {
    semi_major_axis: f64,
    eccentricity: f64,
    inclination: f64,
    raan: f64,
    arg_perigee: f64,
    mean_anomaly: f64,
    mean_motion: f64,
    epoch: DateTime<Utc>,
}

impl OrbitalElements {
    /// Validate raw inputs and build an element set
    pub fn new(inputs: ElementInputs) -> Result<Self, ElementError> {
        let finite = [
            ("eccentricity", inputs.eccentricity),
            ("inclination", inputs.inclination),
            ("raan", inputs.raan),
            ("arg_perigee", inputs.arg_perigee),
            ("mean_anomaly", inputs.mean_anomaly),
            ("mean_motion", inputs.mean_motion),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ElementError::NonFinite { field });
            }
        }

        if inputs.mean_motion <= 0.0 {
            return Err(ElementError::NonPositiveMeanMotion(inputs.mean_motion));
        }
        if !(0.0..1.0).contains(&inputs.eccentricity) {
            return Err(ElementError::UnsupportedEccentricity(inputs.eccentricity));
        }

        let semi_major_axis = match inputs.semi_major_axis {
            Some(a) if !a.is_finite() => {
                return Err(ElementError::NonFinite {
                    field: "semi_major_axis",
                })
            }
            Some(a) => a,
            None => semi_major_axis_from_mean_motion(inputs.mean_motion),
        };
        if semi_major_axis <= 0.0 {
            return Err(ElementError::NonPositiveSemiMajorAxis(semi_major_axis));
        }

        Ok(Self {
            semi_major_axis,
            eccentricity: inputs.eccentricity,
            inclination: inputs.inclination,
            raan: inputs.raan,
            arg_perigee: inputs.arg_perigee,
            mean_anomaly: inputs.mean_anomaly,
            mean_motion: inputs.mean_motion,
            epoch: inputs.epoch,
        })
    }

    /// Build from catalog-style units: degrees and revolutions per day
    #[allow(clippy::too_many_arguments)]
    pub fn from_catalog_units(
        mean_motion_rev_per_day: f64,
        eccentricity: f64,
        inclination_deg: f64,
        raan_deg: f64,
        arg_perigee_deg: f64,
        mean_anomaly_deg: f64,
        epoch: DateTime<Utc>,
    ) -> Result<Self, ElementError> {
        Self::new(ElementInputs {
            semi_major_axis: None,
            eccentricity,
            inclination: inclination_deg.to_radians(),
            raan: raan_deg.to_radians(),
            arg_perigee: arg_perigee_deg.to_radians(),
            mean_anomaly: mean_anomaly_deg.to_radians(),
            mean_motion: rev_per_day_to_rad_per_sec(mean_motion_rev_per_day),
            epoch,
        })
    }

    pub fn semi_major_axis(&self) -> f64 {
        self.semi_major_axis
    }

    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    pub fn inclination(&self) -> f64 {
        self.inclination
    }

    pub fn raan(&self) -> f64 {
        self.raan
    }

    pub fn arg_perigee(&self) -> f64 {
        self.arg_perigee
    }

    /// Mean anomaly at [`Self::epoch`] (rad)
    pub fn mean_anomaly(&self) -> f64 {
        self.mean_anomaly
    }

    pub fn mean_motion(&self) -> f64 {
        self.mean_motion
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Orbital period in seconds
    pub fn period(&self) -> f64 {
        TAU / self.mean_motion
    }

    /// Distance from Earth's center at perigee (m)
    pub fn perigee_radius(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity)
    }

    /// Distance from Earth's center at apogee (m)
    pub fn apogee_radius(&self) -> f64 {
        self.semi_major_axis * (1.0 + self.eccentricity)
    }

    /// Perigee and apogee altitude above the mean Earth radius (km)
    pub fn perigee_apogee_km(&self) -> (f64, f64) {
        (
            (self.perigee_radius() - EARTH_RADIUS_M) / 1000.0,
            (self.apogee_radius() - EARTH_RADIUS_M) / 1000.0,
        )
    }
}

/// a = (μ/n²)^(1/3)
pub fn semi_major_axis_from_mean_motion(mean_motion_rad_s: f64) -> f64 {
    (MU_EARTH / (mean_motion_rad_s * mean_motion_rad_s)).cbrt()
}

pub fn rev_per_day_to_rad_per_sec(rev_per_day: f64) -> f64 {
    rev_per_day * TAU / SECONDS_PER_DAY
}
