//! Common interface for plane projections.

/// A projection between geographic coordinates (degrees) and plane
/// coordinates (meters).
pub trait MapProjection {
    /// Geographic `(lat, lon)` in degrees to plane `(x, y)` in meters.
    fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64);

    /// Plane `(x, y)` in meters to geographic `(lat, lon)` in degrees.
    fn inverse(&self, x: f64, y: f64) -> (f64, f64);
}

/// Wrap a longitude difference in radians into `[-π, π]`.
pub(crate) fn wrap_pi(mut dlon: f64) -> f64 {
    use std::f64::consts::PI;
    while dlon > PI {
        dlon -= 2.0 * PI;
    }
    while dlon < -PI {
        dlon += 2.0 * PI;
    }
    dlon
}
