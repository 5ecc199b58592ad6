//! Lambert Conformal Conic projection.
//!
//! Used by GRIB2 grid template 3.30 (HRRR, NAM and most regional models).
//! It maps a cone tangent or secant to the Earth's surface onto a flat plane.
//!
//! The projection parameters include:
//! - Central meridian (LoV in GRIB2)
//! - Standard parallel(s): Latin1 and Latin2 (equal for a tangent cone)
//!
//! Plane coordinates are measured from the cone apex, so the grid origin is
//! kept by the caller as an offset in meters.

use std::f64::consts::PI;

use crate::error::{ProjectionError, Result};
use crate::transform::{wrap_pi, MapProjection};

/// Lambert Conformal Conic projection on a sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertConformal {
    /// Central meridian (LoV) in radians
    pub lon0: f64,
    /// First standard parallel in radians
    pub latin1: f64,
    /// Second standard parallel in radians
    pub latin2: f64,
    /// Earth radius (meters)
    pub earth_radius: f64,
    /// Cone constant (n)
    n: f64,
    /// F constant
    f: f64,
}

impl LambertConformal {
    /// Create a projection from GRIB2 template 3.30 parameters.
    ///
    /// # Arguments
    /// * `latin1_deg` - First standard parallel (degrees)
    /// * `latin2_deg` - Second standard parallel (degrees)
    /// * `lov_deg` - Central meridian / orientation of the grid (degrees)
    /// * `earth_radius` - Sphere radius (meters)
    pub fn new(latin1_deg: f64, latin2_deg: f64, lov_deg: f64, earth_radius: f64) -> Result<Self> {
        let latin1 = latin1_deg.to_radians();
        let latin2 = latin2_deg.to_radians();

        if latin1.abs() >= PI / 2.0 || latin2.abs() >= PI / 2.0 {
            return Err(ProjectionError::invalid_parameter(format!(
                "standard parallels must be strictly between the poles: {} / {}",
                latin1_deg, latin2_deg
            )));
        }

        // Compute cone constant n
        let n = if (latin1 - latin2).abs() < 1e-10 {
            // Tangent cone (single standard parallel)
            latin1.sin()
        } else {
            // Secant cone (two standard parallels)
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio =
                ((PI / 4.0 + latin2 / 2.0).tan() / (PI / 4.0 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };

        if n.abs() < 1e-10 || !n.is_finite() {
            return Err(ProjectionError::invalid_parameter(format!(
                "degenerate cone for standard parallels {} / {}",
                latin1_deg, latin2_deg
            )));
        }

        let f = (latin1.cos() * (PI / 4.0 + latin1 / 2.0).tan().powf(n)) / n;

        Ok(Self {
            lon0: lov_deg.to_radians(),
            latin1,
            latin2,
            earth_radius,
            n,
            f,
        })
    }

    /// Cone constant.
    pub fn cone_constant(&self) -> f64 {
        self.n
    }

    fn rho(&self, lat: f64) -> f64 {
        self.earth_radius * self.f / (PI / 4.0 + lat / 2.0).tan().powf(self.n)
    }
}

impl MapProjection for LambertConformal {
    fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let theta = self.n * wrap_pi(lon_deg.to_radians() - self.lon0);
        let rho = self.rho(lat);
        (rho * theta.sin(), -rho * theta.cos())
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let sign = self.n.signum();
        let rho = sign * (x * x + y * y).sqrt();
        let theta = (sign * x).atan2(-sign * y);

        let lat = if rho == 0.0 {
            sign * PI / 2.0
        } else {
            2.0 * (self.earth_radius * self.f / rho).powf(1.0 / self.n).atan() - PI / 2.0
        };
        let lon = self.lon0 + theta / self.n;

        (lat.to_degrees(), lon.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geographic::EARTH_RADIUS_M;

    fn hrrr() -> LambertConformal {
        LambertConformal::new(38.5, 38.5, 262.5, EARTH_RADIUS_M).unwrap()
    }

    #[test]
    fn test_hrrr_roundtrip() {
        let proj = hrrr();
        let (x, y) = proj.forward(21.138123, 237.280472);
        let (lat, lon) = proj.inverse(x, y);

        assert!((lat - 21.138123).abs() < 1e-9, "lat roundtrip failed: {}", lat);
        let dlon = crate::geographic::normalize_lon_180(lon - 237.280472);
        assert!(dlon.abs() < 1e-9, "lon roundtrip failed: {}", lon);
    }

    #[test]
    fn test_central_meridian_is_vertical() {
        let proj = hrrr();
        let (x_low, y_low) = proj.forward(30.0, -97.5);
        let (x_high, y_high) = proj.forward(45.0, -97.5);

        assert!(x_low.abs() < 1e-6 && x_high.abs() < 1e-6);
        assert!(y_high > y_low, "north should have larger y");
    }

    #[test]
    fn test_hrrr_grid_spacing_near_standard_parallel() {
        // 3 km east of a point on the standard parallel is ~3 km in the plane
        let proj = hrrr();
        let (x0, y0) = proj.forward(38.5, -97.5);
        let dlon = (3000.0 / (EARTH_RADIUS_M * 38.5f64.to_radians().cos())).to_degrees();
        let (x1, y1) = proj.forward(38.5, -97.5 + dlon);
        let dist = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        assert!((dist - 3000.0).abs() < 1.0, "got {}", dist);
    }

    #[test]
    fn test_southern_hemisphere_cone() {
        let proj = LambertConformal::new(-30.0, -60.0, 140.0, EARTH_RADIUS_M).unwrap();
        assert!(proj.cone_constant() < 0.0);

        let (x, y) = proj.forward(-35.0, 150.0);
        let (lat, lon) = proj.inverse(x, y);
        assert!((lat + 35.0).abs() < 1e-9);
        assert!((lon - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_polar_standard_parallel() {
        assert!(LambertConformal::new(90.0, 90.0, 0.0, EARTH_RADIUS_M).is_err());
        assert!(LambertConformal::new(30.0, -30.0, 0.0, EARTH_RADIUS_M).is_err());
    }
}
