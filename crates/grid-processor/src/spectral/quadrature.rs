//! Latitude quadrature weights for spectral analysis.

use nalgebra::{DMatrix, DVector};
use projection::geometry::Ring;

use super::legendre::legendre_polynomials;
use crate::error::{GridProcessorError, Result};

/// Weights `w_j` with `Σ_j w_j g(μ_j) ≈ ∫₋₁¹ g(μ) dμ`, one per ring.
///
/// Gaussian rings carry their own weights. Other rings get interpolatory
/// weights, exact for polynomials of degree below the ring count.
pub fn ring_weights(rings: &[Ring]) -> Result<Vec<f64>> {
    if rings.is_empty() {
        return Err(GridProcessorError::incompatible_grid("grid has no latitude rings"));
    }
    if let Some(weights) = rings.iter().map(|r| r.gaussian_weight).collect::<Option<Vec<f64>>>() {
        return Ok(weights);
    }
    interpolatory_weights(&rings.iter().map(|r| r.lat.to_radians().sin()).collect::<Vec<_>>())
}

/// Solve `Σ_j w_j P_k(μ_j) = ∫ P_k` for `k < μ.len()`.
pub fn interpolatory_weights(mu: &[f64]) -> Result<Vec<f64>> {
    let count = mu.len();
    let columns: Vec<Vec<f64>> = mu.iter().map(|&x| legendre_polynomials(count, x)).collect();
    let matrix = DMatrix::from_fn(count, count, |k, j| columns[j][k]);
    let mut rhs = DVector::zeros(count);
    rhs[0] = 2.0;

    matrix
        .lu()
        .solve(&rhs)
        .map(|w| w.iter().copied().collect())
        .ok_or_else(|| GridProcessorError::incompatible_grid("ring latitudes do not admit quadrature weights"))
}
