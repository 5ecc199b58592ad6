//! Interpolation of decoded fields onto target grids.
//!
//! [`resample`] maps a source field, in the storage order of its grid, onto
//! every point of a target grid and returns the result in the target's
//! storage order. Target points the method cannot fill (outside coverage,
//! beyond the search radius, too many missing neighbours) receive the
//! missing marker and are counted, never dropped.

pub mod bicubic;
pub mod bilinear;
pub mod budget;
pub mod nearest;
pub mod spectral;

use grib2_parser::DecodedField;
use projection::{GeoPoint, GridDescriptor, GridGeometry};
use rayon::prelude::*;
use tracing::debug;

use crate::config::ResampleConfig;
use crate::error::{GridProcessorError, Result};
use crate::spectral::SpectralFilter;
use crate::types::{InterpolationMethod, InterpolationRequest, MethodOptions, ResampleOutput};

/// Read-only view of a source field.
///
/// A point is missing when the presence mask says so, when its value is
/// NaN, or when it equals `missing_value`.
#[derive(Debug, Clone, Copy)]
pub struct SourceField<'a> {
    pub values: &'a [f64],
    pub present: Option<&'a [bool]>,
    pub missing_value: Option<f64>,
}

impl<'a> SourceField<'a> {
    /// A field in which every finite value is present.
    pub fn new(values: &'a [f64]) -> Self {
        Self {
            values,
            present: None,
            missing_value: None,
        }
    }

    pub fn with_present(mut self, present: &'a [bool]) -> Self {
        self.present = Some(present);
        self
    }

    pub fn with_missing_value(mut self, missing_value: f64) -> Self {
        self.missing_value = Some(missing_value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at storage index `index`, `None` when missing.
    #[inline]
    pub fn value(&self, index: usize) -> Option<f64> {
        if let Some(present) = self.present {
            if !present[index] {
                return None;
            }
        }
        let value = self.values[index];
        if value.is_nan() || self.missing_value == Some(value) {
            None
        } else {
            Some(value)
        }
    }

    pub fn has_missing(&self) -> bool {
        (0..self.values.len()).any(|i| self.value(i).is_none())
    }

    /// Values with NaN at missing points.
    pub fn to_nan_filled(&self) -> Vec<f64> {
        (0..self.values.len()).map(|i| self.value(i).unwrap_or(f64::NAN)).collect()
    }
}

impl<'a> From<&'a DecodedField> for SourceField<'a> {
    fn from(field: &'a DecodedField) -> Self {
        Self {
            values: &field.values,
            present: field.bitmap.as_deref(),
            missing_value: None,
        }
    }
}

/// Point-wise interpolation over a source grid.
pub trait PointSampler: Sync {
    /// Interpolated value at a geographic point, `None` when missing.
    fn sample(&self, point: GeoPoint) -> Option<f64>;
}

/// Evaluate `f` for every index, in parallel when the current rayon pool
/// has more than one thread. Each index writes its own output slot.
pub(crate) fn map_points<F>(count: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(usize) -> Option<f64> + Sync + Send,
{
    if rayon::current_num_threads() > 1 {
        (0..count).into_par_iter().map(f).collect()
    } else {
        (0..count).map(f).collect()
    }
}

fn sample_points(sampler: &dyn PointSampler, points: &[GeoPoint]) -> Vec<Option<f64>> {
    map_points(points.len(), |k| sampler.sample(points[k]))
}

/// Sampler for `method` over `source`, for the point-wise methods.
fn point_sampler<'a>(
    method: InterpolationMethod,
    field: SourceField<'a>,
    source: &'a GridGeometry,
    options: &MethodOptions,
) -> Result<Box<dyn PointSampler + 'a>> {
    if method.needs_quadrilateral_source() && !source.is_quadrilateral() {
        return Err(GridProcessorError::incompatible_grid(format!(
            "{} interpolation needs a quadrilateral source grid, got {} {}",
            method,
            if source.descriptor().is_spectral() { "spectral" } else { "reduced" },
            source.descriptor().projection.kind()
        )));
    }
    Ok(match method {
        InterpolationMethod::Nearest => Box::new(nearest::NearestSampler::new(field, source, options.search_radius_km)?),
        InterpolationMethod::Bilinear => Box::new(bilinear::BilinearSampler::new(field, source)),
        InterpolationMethod::Bicubic => Box::new(bicubic::BicubicSampler::new(field, source)),
        InterpolationMethod::Budget | InterpolationMethod::Spectral => {
            return Err(GridProcessorError::invalid_request(format!(
                "{} interpolation is not point-wise",
                method
            )))
        }
    })
}

fn check_source(field: &SourceField<'_>, source: &GridDescriptor) -> Result<()> {
    if field.len() != source.point_count() {
        return Err(GridProcessorError::invalid_request(format!(
            "field has {} values, source grid has {} points",
            field.len(),
            source.point_count()
        )));
    }
    if let Some(present) = field.present {
        if present.len() != field.len() {
            return Err(GridProcessorError::invalid_request(format!(
                "presence mask has {} entries for {} values",
                present.len(),
                field.len()
            )));
        }
    }
    Ok(())
}

/// Smooth the source spectrally. Spectral sources are filtered in place on
/// their coefficients.
fn prefilter_source(
    field: &SourceField<'_>,
    source: &GridDescriptor,
    filter: &SpectralFilter,
    truncation: Option<usize>,
) -> Result<Vec<f64>> {
    if field.has_missing() {
        return Err(GridProcessorError::incompatible_grid(
            "spectral pre-filter needs a source field without missing values",
        ));
    }
    if source.is_spectral() {
        let mut coefficients = spectral::source_coefficients(field, source)?;
        filter.apply(&mut coefficients);
        return Ok(coefficients.to_grib_order());
    }
    crate::spectral::filter_field(field.values, source, truncation, filter)
}

/// Resample `field` from `source` onto `request.target`.
pub fn resample(
    field: SourceField<'_>,
    source: &GridDescriptor,
    request: &InterpolationRequest,
    config: &ResampleConfig,
) -> Result<ResampleOutput> {
    check_source(&field, source)?;
    let target = &request.target;
    if target.is_spectral() {
        return Err(GridProcessorError::invalid_request(
            "target grid must be a grid of points, not spectral coefficients",
        ));
    }
    let target_geometry = GridGeometry::new(target)?;
    let missing_value = request
        .missing_value
        .or(field.missing_value)
        .unwrap_or(config.missing_value);
    let truncation = request.options.truncation.or(config.truncation);

    let filtered;
    let field = match request.prefilter.filter(|f| !f.is_identity()) {
        Some(filter) => {
            filtered = prefilter_source(&field, source, &filter, truncation)?;
            SourceField::new(&filtered)
        }
        None => field,
    };

    debug!(
        method = %request.method,
        source = source.projection.kind(),
        target = target.projection.kind(),
        source_points = field.len(),
        target_points = target_geometry.point_count(),
        "Resampling field"
    );

    let results = match request.method {
        InterpolationMethod::Spectral => {
            let points = target_geometry.points();
            spectral::resample_points(field, source, &points, truncation, &request.options.filter)?
        }
        InterpolationMethod::Budget => {
            let source_geometry = source_geometry(source, request.method)?;
            let subdivisions = request.options.budget_subdivisions.unwrap_or(config.budget_subdivisions);
            budget::resample(
                field,
                &source_geometry,
                &target_geometry,
                subdivisions,
                request.options.budget_radius,
            )?
        }
        method => {
            let source_geometry = source_geometry(source, method)?;
            let sampler = point_sampler(method, field, &source_geometry, &request.options)?;
            sample_points(sampler.as_ref(), &target_geometry.points())
        }
    };

    Ok(ResampleOutput::from_options(results, request.method, missing_value))
}

/// Interpolate `field` at arbitrary geographic points.
///
/// The budget method needs target cells and is rejected.
pub fn resample_points(
    field: SourceField<'_>,
    source: &GridDescriptor,
    points: &[GeoPoint],
    method: InterpolationMethod,
    options: &MethodOptions,
    config: &ResampleConfig,
) -> Result<ResampleOutput> {
    check_source(&field, source)?;
    let missing_value = field.missing_value.unwrap_or(config.missing_value);
    let results = match method {
        InterpolationMethod::Budget => {
            return Err(GridProcessorError::invalid_request(
                "budget interpolation needs a target grid, not points",
            ))
        }
        InterpolationMethod::Spectral => {
            let truncation = options.truncation.or(config.truncation);
            spectral::resample_points(field, source, points, truncation, &options.filter)?
        }
        method => {
            let source_geometry = source_geometry(source, method)?;
            let sampler = point_sampler(method, field, &source_geometry, options)?;
            sample_points(sampler.as_ref(), points)
        }
    };
    Ok(ResampleOutput::from_options(results, method, missing_value))
}

fn source_geometry(source: &GridDescriptor, method: InterpolationMethod) -> Result<GridGeometry> {
    if source.is_spectral() {
        return Err(GridProcessorError::incompatible_grid(format!(
            "{} interpolation cannot read spectral coefficients; use spectral",
            method
        )));
    }
    Ok(GridGeometry::new(source)?)
}
