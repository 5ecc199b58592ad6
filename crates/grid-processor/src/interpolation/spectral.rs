//! Spectral interpolation: analysis of the source, optional filtering and
//! synthesis at the target points.

use projection::{GeoPoint, GridDescriptor, GridShape};

use super::SourceField;
use crate::error::{GridProcessorError, Result};
use crate::spectral::{analyze, synthesize, SpectralCoefficients, SpectralFilter};

/// Coefficients carried directly by a spherical harmonic source.
pub(crate) fn source_coefficients(field: &SourceField<'_>, source: &GridDescriptor) -> Result<SpectralCoefficients> {
    let GridShape::Spectral { truncation } = source.shape else {
        return Err(GridProcessorError::incompatible_grid(format!(
            "{} grid holds no spectral coefficients",
            source.projection.kind()
        )));
    };
    if field.has_missing() {
        return Err(GridProcessorError::incompatible_grid("spectral coefficients contain missing values"));
    }
    SpectralCoefficients::from_grib_order(truncation, field.values)
}

/// Coefficients of `field` at `truncation` (default the highest the
/// source supports).
pub fn coefficients(
    field: &SourceField<'_>,
    source: &GridDescriptor,
    truncation: Option<usize>,
) -> Result<SpectralCoefficients> {
    if source.is_spectral() {
        let coefficients = source_coefficients(field, source)?;
        return Ok(match truncation {
            Some(t) => coefficients.truncated(t),
            None => coefficients,
        });
    }
    if field.has_missing() {
        return Err(GridProcessorError::incompatible_grid(
            "spectral interpolation needs a source field without missing values",
        ));
    }
    analyze(field.values, source, truncation)
}

/// Spectral interpolation at `points`. Points with a non-finite location
/// or synthesized value are missing.
pub fn resample_points(
    field: SourceField<'_>,
    source: &GridDescriptor,
    points: &[GeoPoint],
    truncation: Option<usize>,
    filter: &SpectralFilter,
) -> Result<Vec<Option<f64>>> {
    let mut coefficients = coefficients(&field, source, truncation)?;
    filter.apply(&mut coefficients);
    let values = synthesize(&coefficients, points);
    Ok(points
        .iter()
        .zip(values)
        .map(|(point, value)| {
            (point.lat.is_finite() && point.lon.is_finite() && value.is_finite()).then_some(value)
        })
        .collect())
}
