//! Nearest-neighbour interpolation.
//!
//! Quadrilateral grids round the fractional index found by inverse
//! projection. Reduced grids, whose rows do not line up, search a bin index
//! of unit vectors on the sphere.

use std::collections::HashMap;

use projection::geographic::great_circle_distance_km;
use projection::{GeoPoint, GridGeometry};

use super::{PointSampler, SourceField};
use crate::error::{GridProcessorError, Result};

/// Default search radius in source grid spacings.
const DEFAULT_RADIUS_SPACINGS: f64 = 2.0;

pub struct NearestSampler<'a> {
    field: SourceField<'a>,
    source: &'a GridGeometry,
    radius_km: f64,
    index: Option<SpatialIndex>,
}

impl<'a> NearestSampler<'a> {
    pub fn new(field: SourceField<'a>, source: &'a GridGeometry, radius_km: Option<f64>) -> Result<Self> {
        let radius_km = match radius_km {
            Some(r) if r.is_nan() || r <= 0.0 => {
                return Err(GridProcessorError::invalid_request(format!(
                    "search radius must be positive, got {} km",
                    r
                )))
            }
            Some(r) => r,
            None => DEFAULT_RADIUS_SPACINGS * source.nominal_spacing_km(),
        };
        let index = (!source.is_quadrilateral()).then(|| SpatialIndex::build(source, |i| field.value(i).is_some()));
        Ok(Self {
            field,
            source,
            radius_km,
            index,
        })
    }

    fn within_radius(&self, point: GeoPoint, index: usize) -> bool {
        let (i, j) = self.source.canonical_indices(index);
        great_circle_distance_km(point, self.source.point(i, j), self.source.descriptor().earth_radius)
            <= self.radius_km
    }

    /// Storage index of the nearest present point of a quadrilateral grid.
    fn nearest_on_quadrilateral(&self, point: GeoPoint) -> Option<usize> {
        let location = self.source.locate(point)?;
        let (nx, ny) = self.source.descriptor().dimensions()?;
        let wraps = self.source.wraps_longitude();

        let i0 = location.fi.floor();
        let j0 = location.fj.floor();
        let mut corners: Vec<(f64, usize)> = Vec::with_capacity(4);
        for (di, dj) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)] {
            let (ci, cj) = (i0 + di, j0 + dj);
            let d2 = (location.fi - ci).powi(2) + (location.fj - cj).powi(2);
            let i = if ci as usize >= nx {
                if !wraps {
                    continue;
                }
                ci as usize % nx
            } else {
                ci as usize
            };
            if cj as usize >= ny {
                continue;
            }
            corners.push((d2, self.source.storage_index(i, cj as usize)));
        }
        corners.sort_by(|a, b| a.0.total_cmp(&b.0));

        corners
            .into_iter()
            .map(|(_, index)| index)
            .find(|&index| self.field.value(index).is_some())
    }
}

impl PointSampler for NearestSampler<'_> {
    fn sample(&self, point: GeoPoint) -> Option<f64> {
        let index = match &self.index {
            Some(spatial) => spatial.nearest(point, self.radius_km, self.source.descriptor().earth_radius)?,
            None => self.nearest_on_quadrilateral(point)?,
        };
        if !self.within_radius(point, index) {
            return None;
        }
        self.field.value(index)
    }
}

type Cell = (i64, i64, i64);

/// Bins of source points by their unit vector, with cubic cells roughly
/// one grid spacing wide.
pub(crate) struct SpatialIndex {
    cell: f64,
    bins: HashMap<Cell, Vec<(usize, [f64; 3])>>,
}

impl SpatialIndex {
    /// Index the storage indices for which `keep` holds.
    pub(crate) fn build(source: &GridGeometry, keep: impl Fn(usize) -> bool) -> Self {
        let radius_km = source.descriptor().earth_radius / 1000.0;
        let cell = (source.nominal_spacing_km() / radius_km).clamp(1e-6, 2.0);
        let mut bins: HashMap<Cell, Vec<(usize, [f64; 3])>> = HashMap::new();
        for (index, point) in source.points().into_iter().enumerate() {
            if !keep(index) {
                continue;
            }
            let v = point.to_unit_vector();
            bins.entry(Self::cell_of(cell, &v)).or_default().push((index, v));
        }
        Self { cell, bins }
    }

    fn cell_of(cell: f64, v: &[f64; 3]) -> Cell {
        (
            (v[0] / cell).floor() as i64,
            (v[1] / cell).floor() as i64,
            (v[2] / cell).floor() as i64,
        )
    }

    /// Storage index of the nearest indexed point within `max_km`.
    pub(crate) fn nearest(&self, point: GeoPoint, max_km: f64, earth_radius_m: f64) -> Option<usize> {
        if !point.lat.is_finite() || !point.lon.is_finite() {
            return None;
        }
        let q = point.to_unit_vector();
        let center = Self::cell_of(self.cell, &q);
        let angle = (max_km * 1000.0 / earth_radius_m).min(std::f64::consts::PI);
        let max_chord = 2.0 * (angle / 2.0).sin();
        let max_shell = (max_chord / self.cell).ceil() as i64 + 1;

        let mut best: Option<(f64, usize)> = None;
        for shell in 0..=max_shell {
            for cell in shell_cells(center, shell) {
                let Some(points) = self.bins.get(&cell) else {
                    continue;
                };
                for (index, v) in points {
                    let d2 = (v[0] - q[0]).powi(2) + (v[1] - q[1]).powi(2) + (v[2] - q[2]).powi(2);
                    if best.map_or(true, |(b, bi)| d2 < b || (d2 == b && *index < bi)) {
                        best = Some((d2, *index));
                    }
                }
            }
            // Cells beyond this shell are at least `shell * cell` away
            if let Some((d2, index)) = best {
                if d2.sqrt() <= shell as f64 * self.cell {
                    return (d2.sqrt() <= max_chord).then_some(index);
                }
            }
        }
        best.and_then(|(d2, index)| (d2.sqrt() <= max_chord).then_some(index))
    }
}

/// Cells at Chebyshev distance exactly `shell` from `center`.
fn shell_cells(center: Cell, shell: i64) -> impl Iterator<Item = Cell> {
    (-shell..=shell).flat_map(move |dx| {
        (-shell..=shell).flat_map(move |dy| {
            (-shell..=shell).filter_map(move |dz| {
                (dx.abs() == shell || dy.abs() == shell || dz.abs() == shell)
                    .then_some((center.0 + dx, center.1 + dy, center.2 + dz))
            })
        })
    })
}
