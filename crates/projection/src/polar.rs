//! Polar stereographic projection (GRIB2 grid template 3.20).
//!
//! The scale is true at latitude `LaD`; the grid is oriented so that the
//! meridian `LoV` runs parallel to the +y axis.

use std::f64::consts::PI;

use crate::error::{ProjectionError, Result};
use crate::transform::{wrap_pi, MapProjection};

/// Spherical polar stereographic projection.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarStereographic {
    /// Orientation meridian (LoV) in radians
    pub lov: f64,
    /// Latitude where the scale is true, in radians
    pub lad: f64,
    /// True when the projection is centred on the south pole
    pub south_pole: bool,
    /// Earth radius (meters)
    pub earth_radius: f64,
    /// `R * (1 + sin|LaD|)`, the plane radius scale
    scale: f64,
}

impl PolarStereographic {
    pub fn new(lad_deg: f64, lov_deg: f64, south_pole: bool, earth_radius: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lad_deg) {
            return Err(ProjectionError::invalid_parameter(format!(
                "LaD out of range: {}",
                lad_deg
            )));
        }
        let lad = lad_deg.to_radians();
        Ok(Self {
            lov: lov_deg.to_radians(),
            lad,
            south_pole,
            earth_radius,
            scale: earth_radius * (1.0 + lad.abs().sin()),
        })
    }
}

impl MapProjection for PolarStereographic {
    fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let dlon = wrap_pi(lon_deg.to_radians() - self.lov);

        if self.south_pole {
            let rho = self.scale * (PI / 4.0 + lat / 2.0).tan();
            (rho * dlon.sin(), rho * dlon.cos())
        } else {
            let rho = self.scale * (PI / 4.0 - lat / 2.0).tan();
            (rho * dlon.sin(), -rho * dlon.cos())
        }
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let rho = (x * x + y * y).sqrt();
        let colat = 2.0 * (rho / self.scale).atan();

        let (lat, dlon) = if self.south_pole {
            (colat - PI / 2.0, x.atan2(y))
        } else {
            (PI / 2.0 - colat, x.atan2(-y))
        };

        (lat.to_degrees(), (self.lov + dlon).to_degrees())
    }
}
