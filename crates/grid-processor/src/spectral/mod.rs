//! Spherical harmonic analysis and synthesis.
//!
//! Fields are expanded with triangular truncation `T` into complex
//! coefficients `a(n, m)`, `0 ≤ m ≤ n ≤ T`:
//!
//! ```text
//! f(λ, μ) = Σₙ a(n,0) P̄ₙ⁰(μ) + 2 Re Σₘ≥₁ Σₙ a(n,m) P̄ₙᵐ(μ) e^{imλ}
//! ```
//!
//! with `μ = sin(latitude)` and the Legendre functions of [`legendre`]
//! (no Condon-Shortley phase, `½∫P̄² = 1`). Under this convention `a(0,0)` is
//! the area mean of the field.
//!
//! Analysis runs on global ring grids (regular lat/lon or Gaussian, regular
//! or reduced). The longitudinal transform of each ring is a direct Fourier
//! sum; the latitudinal integral uses Gaussian weights on Gaussian grids and
//! interpolatory weights elsewhere.

pub mod filter;
pub mod legendre;
pub mod quadrature;

use nalgebra::Complex;
use projection::{GeoPoint, GridDescriptor, GridGeometry};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{GridProcessorError, Result};
pub use filter::SpectralFilter;
use legendre::{legendre_table, order_offset, triangle_index, triangle_len};

/// Triangularly truncated spherical harmonic coefficients, m-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralCoefficients {
    pub truncation: usize,
    pub coeffs: Vec<Complex<f64>>,
}

impl SpectralCoefficients {
    pub fn zeros(truncation: usize) -> Self {
        Self {
            truncation,
            coeffs: vec![Complex::new(0.0, 0.0); triangle_len(truncation)],
        }
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn get(&self, n: usize, m: usize) -> Complex<f64> {
        self.coeffs[triangle_index(self.truncation, n, m)]
    }

    pub fn get_mut(&mut self, n: usize, m: usize) -> &mut Complex<f64> {
        &mut self.coeffs[triangle_index(self.truncation, n, m)]
    }

    /// Coefficients stored as GRIB2 section 7 lays them out: `m` outer, `n`
    /// from `m` to `T`, real then imaginary part.
    pub fn from_grib_order(truncation: usize, values: &[f64]) -> Result<Self> {
        let expected = 2 * triangle_len(truncation);
        if values.len() != expected {
            return Err(GridProcessorError::invalid_request(format!(
                "T{} needs {} coefficient values, got {}",
                truncation,
                expected,
                values.len()
            )));
        }
        Ok(Self {
            truncation,
            coeffs: values.chunks_exact(2).map(|pair| Complex::new(pair[0], pair[1])).collect(),
        })
    }

    pub fn to_grib_order(&self) -> Vec<f64> {
        self.coeffs.iter().flat_map(|c| [c.re, c.im]).collect()
    }

    /// The same expansion cut to a lower truncation.
    pub fn truncated(&self, truncation: usize) -> Self {
        if truncation >= self.truncation {
            return self.clone();
        }
        let mut out = Self::zeros(truncation);
        for m in 0..=truncation {
            for n in m..=truncation {
                *out.get_mut(n, m) = self.get(n, m);
            }
        }
        out
    }
}

/// Highest truncation `analyze` supports on `grid`.
pub fn max_truncation(grid: &GridGeometry) -> Result<usize> {
    if !grid.covers_sphere() {
        return Err(GridProcessorError::incompatible_grid(format!(
            "spectral analysis needs a global grid, {} grid does not cover the sphere",
            grid.descriptor().projection.kind()
        )));
    }
    let rings = grid.rings()?;
    let nlat = rings.len();
    let widest = rings.iter().map(|r| r.len).max().unwrap_or(0);
    if nlat == 0 || widest == 0 {
        return Err(GridProcessorError::incompatible_grid("grid has no points to analyze"));
    }
    let gaussian = rings.iter().all(|r| r.gaussian_weight.is_some());
    Ok(if gaussian {
        (nlat - 1).min((widest - 1) / 2)
    } else {
        ((nlat - 1) / 2).min((widest - 1) / 2)
    })
}

/// One ring's Fourier coefficients `F(m)` for `m ≤ T`, with the latitude
/// quadrature weight and Legendre table.
struct RingTransform {
    weight: f64,
    fourier: Vec<Complex<f64>>,
    legendre: Vec<f64>,
}

/// Spherical harmonic coefficients of `field` (storage order of `grid`).
///
/// `truncation` defaults to [`max_truncation`]; a higher order is an
/// [`GridProcessorError::IncompatibleGrid`] error, as is any NaN value.
pub fn analyze(field: &[f64], grid: &GridDescriptor, truncation: Option<usize>) -> Result<SpectralCoefficients> {
    let geometry = GridGeometry::new(grid)?;
    geometry.descriptor().validate_field_len(field.len())?;
    let limit = max_truncation(&geometry)?;
    let truncation = match truncation {
        Some(t) if t > limit => {
            return Err(GridProcessorError::incompatible_grid(format!(
                "truncation T{} exceeds T{} supported by the {} grid",
                t,
                limit,
                grid.projection.kind()
            )))
        }
        Some(t) => t,
        None => limit,
    };
    if field.iter().any(|v| !v.is_finite()) {
        return Err(GridProcessorError::incompatible_grid(
            "spectral analysis needs a field without missing values",
        ));
    }

    let rings = geometry.rings()?;
    let weights = quadrature::ring_weights(&rings)?;
    debug!(truncation, rings = rings.len(), points = field.len(), "Spectral analysis");

    let transforms: Vec<RingTransform> = rings
        .par_iter()
        .zip(weights.par_iter())
        .map(|(ring, &weight)| {
            // Orders the ring cannot resolve stay zero
            let resolved = (ring.len.saturating_sub(1) / 2).min(truncation);
            let mut fourier = vec![Complex::new(0.0, 0.0); truncation + 1];
            let scale = 1.0 / ring.len as f64;
            for k in 0..ring.len {
                let value = field[geometry.storage_index(k, ring.j)];
                let lambda = (ring.lon_first + k as f64 * ring.dlon).to_radians();
                for (m, slot) in fourier.iter_mut().enumerate().take(resolved + 1) {
                    let (sin, cos) = (m as f64 * lambda).sin_cos();
                    *slot += Complex::new(value * cos, -value * sin) * scale;
                }
            }
            RingTransform {
                weight,
                fourier,
                legendre: legendre_table(truncation, ring.lat.to_radians().sin()),
            }
        })
        .collect();

    let per_order: Vec<Vec<Complex<f64>>> = (0..=truncation)
        .into_par_iter()
        .map(|m| {
            let base = order_offset(truncation, m);
            (m..=truncation)
                .map(|n| {
                    let k = base + n - m;
                    transforms
                        .iter()
                        .map(|t| t.fourier[m] * (t.weight * t.legendre[k]))
                        .sum::<Complex<f64>>()
                        * 0.5
                })
                .collect()
        })
        .collect();

    Ok(SpectralCoefficients {
        truncation,
        coeffs: per_order.into_iter().flatten().collect(),
    })
}

/// Field value of the expansion at one point.
pub fn evaluate(coefficients: &SpectralCoefficients, point: GeoPoint) -> f64 {
    let truncation = coefficients.truncation;
    let legendre = legendre_table(truncation, point.lat.to_radians().sin());
    let lambda = point.lon.to_radians();

    let mut value = 0.0;
    for m in 0..=truncation {
        let base = order_offset(truncation, m);
        let amplitude: Complex<f64> = (base..base + truncation + 1 - m)
            .map(|k| coefficients.coeffs[k] * legendre[k])
            .sum();
        if m == 0 {
            value += amplitude.re;
        } else {
            let (sin, cos) = (m as f64 * lambda).sin_cos();
            value += 2.0 * (amplitude.re * cos - amplitude.im * sin);
        }
    }
    value
}

/// Evaluate the expansion at every point, in parallel.
pub fn synthesize(coefficients: &SpectralCoefficients, points: &[GeoPoint]) -> Vec<f64> {
    points.par_iter().map(|p| evaluate(coefficients, *p)).collect()
}

/// Analyze `field`, apply `filter` and synthesize back onto the grid points
/// in storage order.
pub fn filter_field(
    field: &[f64],
    grid: &GridDescriptor,
    truncation: Option<usize>,
    filter: &SpectralFilter,
) -> Result<Vec<f64>> {
    let mut coefficients = analyze(field, grid, truncation)?;
    filter.apply(&mut coefficients);
    let geometry = GridGeometry::new(grid)?;
    Ok(synthesize(&coefficients, &geometry.points()))
}
