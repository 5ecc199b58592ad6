//! Mercator projection (GRIB2 grid template 3.10).

use std::f64::consts::PI;

use crate::error::{ProjectionError, Result};
use crate::transform::{wrap_pi, MapProjection};

/// Spherical Mercator with the scale true at latitude `LaD`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mercator {
    /// Longitude mapped to x = 0, in radians
    pub lon0: f64,
    /// Latitude where the scale is true, in radians
    pub lad: f64,
    pub earth_radius: f64,
    /// `R * cos(LaD)`
    scale: f64,
}

impl Mercator {
    pub fn new(lad_deg: f64, lon0_deg: f64, earth_radius: f64) -> Result<Self> {
        if lad_deg.abs() >= 90.0 {
            return Err(ProjectionError::invalid_parameter(format!(
                "Mercator LaD must be strictly between the poles: {}",
                lad_deg
            )));
        }
        let lad = lad_deg.to_radians();
        Ok(Self {
            lon0: lon0_deg.to_radians(),
            lad,
            earth_radius,
            scale: earth_radius * lad.cos(),
        })
    }
}

impl MapProjection for Mercator {
    fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let dlon = wrap_pi(lon_deg.to_radians() - self.lon0);
        (
            self.scale * dlon,
            self.scale * (PI / 4.0 + lat / 2.0).tan().ln(),
        )
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let lat = 2.0 * (y / self.scale).exp().atan() - PI / 2.0;
        let lon = self.lon0 + x / self.scale;
        (lat.to_degrees(), lon.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geographic::EARTH_RADIUS_M;

    #[test]
    fn test_equator_is_zero() {
        let proj = Mercator::new(20.0, 100.0, EARTH_RADIUS_M).unwrap();
        let (x, y) = proj.forward(0.0, 100.0);
        assert!(x.abs() < 1e-9 && y.abs() < 1e-9);
    }

    #[test]
    fn test_roundtrip() {
        let proj = Mercator::new(20.0, 100.0, EARTH_RADIUS_M).unwrap();
        let (x, y) = proj.forward(35.5, 120.25);
        let (lat, lon) = proj.inverse(x, y);
        assert!((lat - 35.5).abs() < 1e-9);
        assert!((lon - 120.25).abs() < 1e-9);
    }
}
