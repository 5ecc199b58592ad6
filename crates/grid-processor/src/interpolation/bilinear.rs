//! Bilinear interpolation on quadrilateral grids.

use projection::{GeoPoint, GridGeometry, GridLocation};

use super::{PointSampler, SourceField};

/// Smallest share of corner weight that must be present.
const MIN_PRESENT_WEIGHT: f64 = 0.5;

pub struct BilinearSampler<'a> {
    field: SourceField<'a>,
    source: &'a GridGeometry,
}

impl<'a> BilinearSampler<'a> {
    pub fn new(field: SourceField<'a>, source: &'a GridGeometry) -> Self {
        Self { field, source }
    }

    /// Bilinear value at a located position.
    ///
    /// Weights are renormalized over present corners; corners with zero
    /// weight are never read, so co-located points return source values
    /// unchanged.
    pub(crate) fn at(&self, location: GridLocation) -> Option<f64> {
        let (nx, ny) = self.source.descriptor().dimensions()?;
        let wraps = self.source.wraps_longitude();

        let i0 = location.fi.floor() as usize;
        let j0 = location.fj.floor() as usize;
        let xf = location.fi - i0 as f64;
        let yf = location.fj - j0 as f64;

        let corners = [
            (i0, j0, (1.0 - xf) * (1.0 - yf)),
            (i0 + 1, j0, xf * (1.0 - yf)),
            (i0, j0 + 1, (1.0 - xf) * yf),
            (i0 + 1, j0 + 1, xf * yf),
        ];

        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;
        for (i, j, weight) in corners {
            if weight == 0.0 {
                continue;
            }
            let i = match i {
                i if i < nx => i,
                i if wraps => i % nx,
                _ => continue,
            };
            if j >= ny {
                continue;
            }
            if let Some(value) = self.field.value(self.source.storage_index(i, j)) {
                weight_sum += weight;
                value_sum += weight * value;
            }
        }

        if weight_sum < MIN_PRESENT_WEIGHT {
            return None;
        }
        if weight_sum == 1.0 {
            Some(value_sum)
        } else {
            Some(value_sum / weight_sum)
        }
    }
}

impl PointSampler for BilinearSampler<'_> {
    fn sample(&self, point: GeoPoint) -> Option<f64> {
        self.at(self.source.locate(point)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection::GridDescriptor;
    use test_utils::{assert_approx_eq, create_linear_grid};

    fn unit_grid(nx: usize, ny: usize) -> GridGeometry {
        GridGeometry::new(&GridDescriptor::lat_lon(0.0, 0.0, 1.0, 1.0, nx, ny)).unwrap()
    }

    #[test]
    fn test_corners_and_center() {
        let geometry = unit_grid(2, 2);
        let values = [1.0, 2.0, 3.0, 4.0];
        let sampler = BilinearSampler::new(SourceField::new(&values), &geometry);

        assert_eq!(sampler.sample(GeoPoint::new(0.0, 0.0)), Some(1.0));
        assert_eq!(sampler.sample(GeoPoint::new(0.0, 1.0)), Some(2.0));
        assert_eq!(sampler.sample(GeoPoint::new(1.0, 0.0)), Some(3.0));
        assert_eq!(sampler.sample(GeoPoint::new(1.0, 1.0)), Some(4.0));
        assert_approx_eq!(sampler.sample(GeoPoint::new(0.5, 0.5)).unwrap(), 2.5, 1e-12);
    }

    #[test]
    fn test_reproduces_plane() {
        let geometry = unit_grid(5, 4);
        let values = create_linear_grid(5, 4, 10.0, 2.0, -3.0);
        let sampler = BilinearSampler::new(SourceField::new(&values), &geometry);
        for (lat, lon) in [(0.25, 0.75), (2.5, 3.1), (2.99, 3.99)] {
            let expected = 10.0 + 2.0 * lon - 3.0 * lat;
            assert_approx_eq!(sampler.sample(GeoPoint::new(lat, lon)).unwrap(), expected, 1e-9);
        }
    }

    #[test]
    fn test_renormalizes_over_present_corners() {
        let geometry = unit_grid(2, 2);
        let values = [1.0, 2.0, 3.0, 100.0];
        let present = [true, true, true, false];
        let sampler = BilinearSampler::new(SourceField::new(&values).with_present(&present), &geometry);

        // Three quarters of the weight present
        assert_approx_eq!(sampler.sample(GeoPoint::new(0.5, 0.5)).unwrap(), 2.0, 1e-12);
        // Mostly on the absent corner
        assert_eq!(sampler.sample(GeoPoint::new(0.9, 0.9)), None);
    }

    #[test]
    fn test_wraps_across_meridian() {
        let grid = GridDescriptor::lat_lon(-90.0, 0.0, 90.0, 90.0, 4, 3);
        let geometry = GridGeometry::new(&grid).unwrap();
        assert!(geometry.wraps_longitude());
        let values = [0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0, 20.0, 21.0, 22.0, 23.0];
        let sampler = BilinearSampler::new(SourceField::new(&values), &geometry);
        // Halfway between column 3 (270E) and column 0 (360E)
        assert_approx_eq!(sampler.sample(GeoPoint::new(0.0, 315.0)).unwrap(), 11.5, 1e-9);
        assert_approx_eq!(sampler.sample(GeoPoint::new(0.0, -45.0)).unwrap(), 11.5, 1e-9);
    }

    #[test]
    fn test_outside_domain() {
        let geometry = unit_grid(2, 2);
        let values = [1.0, 2.0, 3.0, 4.0];
        let sampler = BilinearSampler::new(SourceField::new(&values), &geometry);
        assert_eq!(sampler.sample(GeoPoint::new(-0.5, 0.5)), None);
        assert_eq!(sampler.sample(GeoPoint::new(0.5, 1.5)), None);
    }
}
