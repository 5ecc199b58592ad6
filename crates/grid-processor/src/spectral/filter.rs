//! Spectral-domain filters.

use serde::{Deserialize, Serialize};

use super::SpectralCoefficients;

/// Damping applied to coefficients between analysis and synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectralFilter {
    #[default]
    None,
    /// Zero every coefficient with total wavenumber `n` above the given order.
    Truncate(usize),
    /// Multiply by `exp(-strength * (n / T)^order)`.
    Exponential { order: u32, strength: f64 },
}

impl SpectralFilter {
    /// Response for total wavenumber `n` at truncation `truncation`.
    pub fn response(&self, n: usize, truncation: usize) -> f64 {
        match *self {
            SpectralFilter::None => 1.0,
            SpectralFilter::Truncate(limit) => {
                if n <= limit {
                    1.0
                } else {
                    0.0
                }
            }
            SpectralFilter::Exponential { order, strength } => {
                if truncation == 0 {
                    return 1.0;
                }
                let ratio = n as f64 / truncation as f64;
                (-strength * ratio.powi(order as i32)).exp()
            }
        }
    }

    pub fn is_identity(&self) -> bool {
        match *self {
            SpectralFilter::None => true,
            SpectralFilter::Exponential { strength, .. } => strength == 0.0,
            SpectralFilter::Truncate(_) => false,
        }
    }

    pub fn apply(&self, coefficients: &mut SpectralCoefficients) {
        if self.is_identity() {
            return;
        }
        let truncation = coefficients.truncation;
        for m in 0..=truncation {
            for n in m..=truncation {
                let gain = self.response(n, truncation);
                if gain != 1.0 {
                    *coefficients.get_mut(n, m) *= gain;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Complex;

    fn ones(truncation: usize) -> SpectralCoefficients {
        let mut coefficients = SpectralCoefficients::zeros(truncation);
        coefficients.coeffs.iter_mut().for_each(|c| *c = Complex::new(1.0, 1.0));
        coefficients
    }

    #[test]
    fn test_truncate() {
        let mut coefficients = ones(4);
        SpectralFilter::Truncate(2).apply(&mut coefficients);
        assert_eq!(coefficients.get(2, 1), Complex::new(1.0, 1.0));
        assert_eq!(coefficients.get(3, 0), Complex::new(0.0, 0.0));
        assert_eq!(coefficients.get(4, 4), Complex::new(0.0, 0.0));
    }

    #[test]
    fn test_exponential_damps_high_wavenumbers() {
        let mut coefficients = ones(8);
        let filter = SpectralFilter::Exponential { order: 4, strength: 2.0 };
        filter.apply(&mut coefficients);
        assert_eq!(coefficients.get(0, 0).re, 1.0);
        assert!((coefficients.get(8, 3).re - (-2.0f64).exp()).abs() < 1e-15);
        assert!(coefficients.get(4, 0).re > coefficients.get(6, 0).re);
    }

    #[test]
    fn test_serde_forms() {
        let filter: SpectralFilter = serde_json::from_str(r#"{"truncate": 21}"#).unwrap();
        assert_eq!(filter, SpectralFilter::Truncate(21));
        let filter: SpectralFilter = serde_json::from_str(r#""none""#).unwrap();
        assert!(filter.is_identity());
    }
}
