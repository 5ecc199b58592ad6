//! Rotated-pole coordinates (GRIB2 grid template 3.1).
//!
//! A rotated lat/lon grid is a regular lat/lon grid in a coordinate system
//! whose south pole sits at `(south_pole_lat, south_pole_lon)`. The rotation
//! angle is applied about the rotated polar axis:
//! `λ' = λ_rotated - angle`.

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Rotated pole parameters, all in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotatedPole {
    pub south_pole_lat: f64,
    pub south_pole_lon: f64,
    #[serde(default)]
    pub angle: f64,
}

impl RotatedPole {
    pub fn new(south_pole_lat: f64, south_pole_lon: f64, angle: f64) -> Self {
        Self {
            south_pole_lat,
            south_pole_lon,
            angle,
        }
    }

    /// Rotation taking rotated-frame unit vectors to geographic ones.
    fn to_geographic(&self) -> Rotation3<f64> {
        let tilt = (90.0 + self.south_pole_lat).to_radians();
        Rotation3::from_axis_angle(&Vector3::z_axis(), self.south_pole_lon.to_radians())
            * Rotation3::from_axis_angle(&Vector3::y_axis(), -tilt)
    }

    /// Rotated `(lat, lon)` to geographic `(lat, lon)`, degrees.
    pub fn rotated_to_geographic(&self, lat: f64, lon: f64) -> (f64, f64) {
        let v = unit_vector(lat, lon - self.angle);
        from_unit_vector(&(self.to_geographic() * v))
    }

    /// Geographic `(lat, lon)` to rotated `(lat, lon)`, degrees.
    pub fn geographic_to_rotated(&self, lat: f64, lon: f64) -> (f64, f64) {
        let v = unit_vector(lat, lon);
        let (rlat, rlon) = from_unit_vector(&(self.to_geographic().inverse() * v));
        (rlat, rlon + self.angle)
    }
}

fn unit_vector(lat: f64, lon: f64) -> Vector3<f64> {
    let (lat, lon) = (lat.to_radians(), lon.to_radians());
    Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

fn from_unit_vector(v: &Vector3<f64>) -> (f64, f64) {
    let lat = v.z.clamp(-1.0, 1.0).asin().to_degrees();
    let lon = v.y.atan2(v.x).to_degrees();
    (lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geographic::normalize_lon_180;

    #[test]
    fn test_unrotated_is_identity() {
        let pole = RotatedPole::new(-90.0, 0.0, 0.0);
        let (lat, lon) = pole.rotated_to_geographic(12.5, 40.0);
        assert!((lat - 12.5).abs() < 1e-9);
        assert!((lon - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotated_origin_location() {
        // Rotated north pole at 40N 190E, so rotated (0, 0) lies at 50N 10E
        let pole = RotatedPole::new(-40.0, 10.0, 0.0);
        let (lat, lon) = pole.rotated_to_geographic(0.0, 0.0);
        assert!((lat - 50.0).abs() < 1e-9, "lat {}", lat);
        assert!((lon - 10.0).abs() < 1e-9, "lon {}", lon);

        let (plat, plon) = pole.rotated_to_geographic(90.0, 0.0);
        assert!((plat - 40.0).abs() < 1e-9);
        assert!(normalize_lon_180(plon - 190.0).abs() < 1e-9);
    }

    #[test]
    fn test_roundtrip_with_angle() {
        let pole = RotatedPole::new(-35.0, 15.0, 7.5);
        let (lat, lon) = pole.geographic_to_rotated(48.2, 11.6);
        let (lat2, lon2) = pole.rotated_to_geographic(lat, lon);
        assert!((lat2 - 48.2).abs() < 1e-9);
        assert!(normalize_lon_180(lon2 - 11.6).abs() < 1e-9);
    }
}
