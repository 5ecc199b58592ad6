//! Bicubic (Catmull-Rom) interpolation on quadrilateral grids.

use projection::{GeoPoint, GridGeometry, GridLocation};

use super::bilinear::BilinearSampler;
use super::{PointSampler, SourceField};

pub struct BicubicSampler<'a> {
    field: SourceField<'a>,
    source: &'a GridGeometry,
    fallback: BilinearSampler<'a>,
}

impl<'a> BicubicSampler<'a> {
    pub fn new(field: SourceField<'a>, source: &'a GridGeometry) -> Self {
        Self {
            field,
            source,
            fallback: BilinearSampler::new(field, source),
        }
    }

    /// The 4x4 neighbourhood around a location, or `None` when it leaves
    /// the grid or holds a missing value.
    fn neighbourhood(&self, location: GridLocation) -> Option<[[f64; 4]; 4]> {
        let (nx, ny) = self.source.descriptor().dimensions()?;
        let wraps = self.source.wraps_longitude();
        let xi = location.fi.floor() as i64;
        let yi = location.fj.floor() as i64;

        let mut values = [[0.0; 4]; 4];
        for (dj, row) in values.iter_mut().enumerate() {
            let j = yi + dj as i64 - 1;
            if j < 0 || j >= ny as i64 {
                return None;
            }
            for (di, value) in row.iter_mut().enumerate() {
                let i = xi + di as i64 - 1;
                let i = if wraps {
                    i.rem_euclid(nx as i64)
                } else if i < 0 || i >= nx as i64 {
                    return None;
                } else {
                    i
                };
                *value = self.field.value(self.source.storage_index(i as usize, j as usize))?;
            }
        }
        Some(values)
    }
}

impl PointSampler for BicubicSampler<'_> {
    fn sample(&self, point: GeoPoint) -> Option<f64> {
        let location = self.source.locate(point)?;
        let Some(values) = self.neighbourhood(location) else {
            return self.fallback.at(location);
        };

        let xf = location.fi - location.fi.floor();
        let yf = location.fj - location.fj.floor();

        // Cubic interpolation along x for each row, then along y
        let mut row_values = [0.0; 4];
        for (out, row) in row_values.iter_mut().zip(&values) {
            *out = cubic_1d(row[0], row[1], row[2], row[3], xf);
        }
        Some(cubic_1d(row_values[0], row_values[1], row_values[2], row_values[3], yf))
    }
}

/// 1D cubic interpolation using Catmull-Rom spline.
fn cubic_1d(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;

    // Catmull-Rom coefficients
    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}
