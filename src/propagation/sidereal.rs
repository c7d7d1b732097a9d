//! Greenwich Mean Sidereal Time

use chrono::{DateTime, Utc};
use std::f64::consts::TAU;

use super::elements::SECONDS_PER_DAY;

pub const DAYS_PER_JULIAN_CENTURY: f64 = 36525.0;
pub const GMST_BASE_DEG: f64 = 280.46061837;
pub const GMST_ROTATION_PER_DAY: f64 = 360.98564736629;
pub const GMST_CORRECTION: f64 = 0.000387933;
const GMST_CUBIC_DIVISOR: f64 = 38_710_000.0;

/// 2000-01-01T12:00:00Z as Unix milliseconds
const J2000_UNIX_MS: i64 = 946_728_000_000;

/// Days (fractional) elapsed since the J2000 epoch
pub fn days_since_j2000(timestamp: DateTime<Utc>) -> f64 {
    (timestamp.timestamp_millis() - J2000_UNIX_MS) as f64 / (1000.0 * SECONDS_PER_DAY)
}

/// GMST in radians, normalized to [0, 2π)
pub fn greenwich_mean_sidereal_time(timestamp: DateTime<Utc>) -> f64 {
    let days = days_since_j2000(timestamp);
    let centuries = days / DAYS_PER_JULIAN_CENTURY;
    let gmst_degrees = GMST_BASE_DEG
        + GMST_ROTATION_PER_DAY * days
        + GMST_CORRECTION * centuries * centuries
        - centuries * centuries * centuries / GMST_CUBIC_DIVISOR;
    gmst_degrees.to_radians().rem_euclid(TAU)
}
