//! Budget (area-weighted) interpolation.
//!
//! Each target cell is sampled on an `s × s` lattice of sub-points spanning
//! `2 · radius` target cell widths around the cell centre. Every sub-point
//! takes the value of the source cell containing it, weighted by the cosine
//! of its latitude. The result is the weighted mean of present
//! contributions, or missing when less than half of the sampled weight is
//! present. Sub-points outside the source domain count as absent.

use projection::{GeoPoint, GridGeometry};

use super::nearest::SpatialIndex;
use super::{map_points, SourceField};
use crate::error::{GridProcessorError, Result};

/// Smallest share of sampled weight that must be present.
const MIN_PRESENT_WEIGHT: f64 = 0.5;

/// Storage index of the source cell containing a point.
enum CellLookup {
    Quadrilateral { nx: usize, wraps: bool },
    Scattered { index: SpatialIndex, max_km: f64, earth_radius: f64 },
}

impl CellLookup {
    fn new(source: &GridGeometry) -> Self {
        match source.descriptor().dimensions() {
            Some((nx, _)) if source.is_quadrilateral() => CellLookup::Quadrilateral {
                nx,
                wraps: source.wraps_longitude(),
            },
            _ => CellLookup::Scattered {
                index: SpatialIndex::build(source, |_| true),
                max_km: source.nominal_spacing_km(),
                earth_radius: source.descriptor().earth_radius,
            },
        }
    }

    fn cell(&self, source: &GridGeometry, point: GeoPoint) -> Option<usize> {
        match self {
            CellLookup::Quadrilateral { nx, wraps } => {
                let location = source.locate(point)?;
                let mut i = location.fi.round() as usize;
                if i >= *nx {
                    if !wraps {
                        return None;
                    }
                    i %= nx;
                }
                Some(source.storage_index(i, location.fj.round() as usize))
            }
            CellLookup::Scattered {
                index,
                max_km,
                earth_radius,
            } => index.nearest(point, *max_km, *earth_radius),
        }
    }
}

/// Budget interpolation of `field` onto every point of `target`, in target
/// storage order.
pub fn resample(
    field: SourceField<'_>,
    source: &GridGeometry,
    target: &GridGeometry,
    subdivisions: usize,
    radius: f64,
) -> Result<Vec<Option<f64>>> {
    if subdivisions == 0 {
        return Err(GridProcessorError::invalid_request("budget subdivisions must be > 0"));
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(GridProcessorError::invalid_request(format!(
            "budget radius must be positive, got {}",
            radius
        )));
    }

    let lookup = CellLookup::new(source);
    let offsets: Vec<f64> = (0..subdivisions)
        .map(|a| -radius + 2.0 * radius * (a as f64 + 0.5) / subdivisions as f64)
        .collect();

    Ok(map_points(target.point_count(), |k| {
        let (i, j) = target.canonical_indices(k);
        let mut total_weight = 0.0;
        let mut present_weight = 0.0;
        // Contributions are summed relative to the first present value, so a
        // cell drawn from a single source value reproduces it exactly
        let mut base = None;
        let mut sum = 0.0;
        for &dj in &offsets {
            for &di in &offsets {
                let point = target.point_at(i as f64 + di, j as f64 + dj);
                let weight = point.lat.to_radians().cos().max(0.0);
                if weight <= 0.0 {
                    continue;
                }
                total_weight += weight;
                let value = lookup.cell(source, point).and_then(|index| field.value(index));
                if let Some(value) = value {
                    let base = *base.get_or_insert(value);
                    present_weight += weight;
                    sum += weight * (value - base);
                }
            }
        }
        if total_weight == 0.0 || present_weight < MIN_PRESENT_WEIGHT * total_weight {
            None
        } else {
            base.map(|base| base + sum / present_weight)
        }
    }))
}
