//! Geographic helpers: longitude normalization and great-circle distance.

use serde::{Deserialize, Serialize};

/// Earth radius used by GRIB2 shape-of-earth code 6 (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_229.0;

/// Earth radius used by GRIB2 shape-of-earth code 0 (meters).
pub const EARTH_RADIUS_GRIB1_M: f64 = 6_367_470.0;

/// A geographic location in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Unit vector on the sphere (x towards 0°E, z towards the north pole).
    pub fn to_unit_vector(&self) -> [f64; 3] {
        let (lat, lon) = (self.lat.to_radians(), self.lon.to_radians());
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }
}

/// Normalize a longitude into `[0, 360)`.
pub fn normalize_lon_360(lon: f64) -> f64 {
    let wrapped = lon.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Normalize a longitude into `[-180, 180)`.
pub fn normalize_lon_180(lon: f64) -> f64 {
    normalize_lon_360(lon + 180.0) - 180.0
}

/// Eastward distance in degrees from `from` to `to`, in `[0, 360)`.
pub fn lon_offset_east(from: f64, to: f64) -> f64 {
    normalize_lon_360(to - from)
}

/// Great-circle distance between two points in kilometers (haversine).
pub fn great_circle_distance_km(a: GeoPoint, b: GeoPoint, radius_m: f64) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * radius_m / 1000.0 * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_longitudes() {
        assert_eq!(normalize_lon_360(-90.0), 270.0);
        assert_eq!(normalize_lon_360(720.0), 0.0);
        assert_eq!(normalize_lon_180(270.0), -90.0);
        assert_eq!(normalize_lon_180(180.0), -180.0);
        assert!(normalize_lon_360(-1e-20) < 360.0);
    }

    #[test]
    fn test_lon_offset_east_wraps() {
        assert!((lon_offset_east(350.0, 10.0) - 20.0).abs() < 1e-12);
        assert!((lon_offset_east(-10.0, 350.0) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_great_circle_quarter_meridian() {
        let d = great_circle_distance_km(
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(90.0, 0.0),
            EARTH_RADIUS_M,
        );
        let expected = std::f64::consts::FRAC_PI_2 * EARTH_RADIUS_M / 1000.0;
        assert!((d - expected).abs() < 1e-6);
    }
}
