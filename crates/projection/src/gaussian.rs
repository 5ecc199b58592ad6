//! Gaussian latitudes and quadrature weights.
//!
//! A Gaussian grid with `N` parallels between pole and equator has `2N`
//! latitude rows placed at the roots of the Legendre polynomial `P_2N(μ)`,
//! `μ = sin(lat)`.

use std::f64::consts::PI;

use crate::error::{ProjectionError, Result};

const MAX_NEWTON_ITERATIONS: usize = 100;

/// One Gaussian latitude row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianRow {
    /// Latitude in degrees
    pub lat: f64,
    /// Quadrature weight; all `2N` weights sum to 2
    pub weight: f64,
}

/// Compute the `2N` Gaussian latitudes, ordered north to south.
pub fn gaussian_latitudes(n: usize) -> Result<Vec<GaussianRow>> {
    if n == 0 {
        return Err(ProjectionError::invalid_grid(
            "Gaussian grid needs at least one parallel between pole and equator",
        ));
    }

    let nlat = 2 * n;
    let mut north = Vec::with_capacity(n);

    for k in 0..n {
        let mut z = (PI * (k as f64 + 0.75) / (nlat as f64 + 0.5)).cos();
        let mut converged = false;

        for _ in 0..MAX_NEWTON_ITERATIONS {
            let (p, dp) = legendre_with_derivative(nlat, z);
            let step = p / dp;
            z -= step;
            if step.abs() < 1e-14 {
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(ProjectionError::invalid_grid(format!(
                "Gaussian latitude {} of N={} did not converge",
                k, n
            )));
        }

        let (_, dp) = legendre_with_derivative(nlat, z);
        north.push(GaussianRow {
            lat: z.asin().to_degrees(),
            weight: 2.0 / ((1.0 - z * z) * dp * dp),
        });
    }

    let mut rows = north.clone();
    rows.extend(north.iter().rev().map(|row| GaussianRow {
        lat: -row.lat,
        weight: row.weight,
    }));
    Ok(rows)
}

/// `P_n(z)` and its derivative via the three-term recurrence.
fn legendre_with_derivative(n: usize, z: f64) -> (f64, f64) {
    let mut p1 = 1.0;
    let mut p2 = 0.0;
    for j in 1..=n {
        let p3 = p2;
        p2 = p1;
        p1 = ((2 * j - 1) as f64 * z * p2 - (j - 1) as f64 * p3) / j as f64;
    }
    let dp = n as f64 * (z * p1 - p2) / (z * z - 1.0);
    (p1, dp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n1_latitudes() {
        // Roots of P_2 are ±1/sqrt(3)
        let rows = gaussian_latitudes(1).unwrap();
        assert_eq!(rows.len(), 2);
        let expected = (1.0f64 / 3.0f64.sqrt()).asin().to_degrees();
        assert!((rows[0].lat - expected).abs() < 1e-12);
        assert!((rows[1].lat + expected).abs() < 1e-12);
        assert!((rows[0].weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weights_sum_to_two_and_order() {
        let rows = gaussian_latitudes(48).unwrap();
        assert_eq!(rows.len(), 96);
        let total: f64 = rows.iter().map(|r| r.weight).sum();
        assert!((total - 2.0).abs() < 1e-12);
        assert!(rows.windows(2).all(|w| w[0].lat > w[1].lat));
    }

    #[test]
    fn test_f48_first_latitude() {
        // ECMWF N48 first latitude
        let rows = gaussian_latitudes(48).unwrap();
        assert!((rows[0].lat - 88.572168514007).abs() < 1e-9);
    }

    #[test]
    fn test_zero_rejected() {
        assert!(gaussian_latitudes(0).is_err());
    }
}
