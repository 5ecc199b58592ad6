//! Precomputed grid geometry for point lookups.
//!
//! [`GridGeometry`] wraps a [`GridDescriptor`] with everything that is
//! expensive to derive on every lookup: Gaussian latitudes, row offsets of
//! reduced grids and the plane projection of projected grids.

use crate::descriptor::{reduced_storage_index, GridDescriptor, GridShape, Projection};
use crate::error::{ProjectionError, Result};
use crate::gaussian::gaussian_latitudes;
use crate::geographic::{lon_offset_east, GeoPoint};
use crate::lambert::LambertConformal;
use crate::mercator::Mercator;
use crate::polar::PolarStereographic;
use crate::rotated::RotatedPole;
use crate::transform::MapProjection;

/// Fractional indices within this distance of an integer snap to it.
const INDEX_SNAP: f64 = 1e-6;

/// Fractional canonical position of a point inside a quadrilateral grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLocation {
    pub fi: f64,
    pub fj: f64,
}

/// A latitude ring of a grid, used by the spectral transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    /// Canonical row index
    pub j: usize,
    pub lat: f64,
    /// Gaussian quadrature weight when the ring is a Gaussian latitude
    pub gaussian_weight: Option<f64>,
    pub lon_first: f64,
    pub dlon: f64,
    pub len: usize,
}

#[derive(Debug, Clone)]
enum PlaneProjection {
    Lambert(LambertConformal),
    Polar(PolarStereographic),
    Mercator(Mercator),
}

impl MapProjection for PlaneProjection {
    fn forward(&self, lat: f64, lon: f64) -> (f64, f64) {
        match self {
            PlaneProjection::Lambert(p) => p.forward(lat, lon),
            PlaneProjection::Polar(p) => p.forward(lat, lon),
            PlaneProjection::Mercator(p) => p.forward(lat, lon),
        }
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            PlaneProjection::Lambert(p) => p.inverse(x, y),
            PlaneProjection::Polar(p) => p.inverse(x, y),
            PlaneProjection::Mercator(p) => p.inverse(x, y),
        }
    }
}

#[derive(Debug, Clone)]
enum Kind {
    LatLon {
        lat0: f64,
        lon0: f64,
        dlat: f64,
        dlon: f64,
        pole: Option<RotatedPole>,
    },
    Gaussian {
        /// Row latitudes, south to north
        lats: Vec<f64>,
        weights: Vec<f64>,
        lon0: f64,
        lon_last: f64,
    },
    Plane {
        proj: PlaneProjection,
        x0: f64,
        y0: f64,
        dx: f64,
        dy: f64,
    },
    Spectral,
}

/// A grid descriptor with precomputed lookup state.
#[derive(Debug, Clone)]
pub struct GridGeometry {
    descriptor: GridDescriptor,
    kind: Kind,
    row_offsets: Vec<usize>,
    wraps: bool,
}

impl GridGeometry {
    pub fn new(descriptor: &GridDescriptor) -> Result<Self> {
        descriptor.validate()?;
        let radius = descriptor.earth_radius;

        let kind = match &descriptor.projection {
            Projection::LatLon {
                lat_first,
                lon_first,
                dlat,
                dlon,
            } => Kind::LatLon {
                lat0: *lat_first,
                lon0: *lon_first,
                dlat: *dlat,
                dlon: *dlon,
                pole: None,
            },
            Projection::RotatedLatLon {
                lat_first,
                lon_first,
                dlat,
                dlon,
                pole,
            } => Kind::LatLon {
                lat0: *lat_first,
                lon0: *lon_first,
                dlat: *dlat,
                dlon: *dlon,
                pole: Some(*pole),
            },
            Projection::Gaussian {
                n,
                first_row,
                lon_first,
                lon_last,
            } => {
                let mut rows = gaussian_latitudes(*n)?;
                rows.reverse();
                let rows = &rows[*first_row..first_row + descriptor.row_count()];
                Kind::Gaussian {
                    lats: rows.iter().map(|r| r.lat).collect(),
                    weights: rows.iter().map(|r| r.weight).collect(),
                    lon0: *lon_first,
                    lon_last: *lon_last,
                }
            }
            Projection::LambertConformal {
                latin1,
                latin2,
                lov,
                x0,
                y0,
                dx,
                dy,
            } => Kind::Plane {
                proj: PlaneProjection::Lambert(LambertConformal::new(*latin1, *latin2, *lov, radius)?),
                x0: *x0,
                y0: *y0,
                dx: *dx,
                dy: *dy,
            },
            Projection::PolarStereographic {
                lad,
                lov,
                south_pole,
                x0,
                y0,
                dx,
                dy,
            } => Kind::Plane {
                proj: PlaneProjection::Polar(PolarStereographic::new(*lad, *lov, *south_pole, radius)?),
                x0: *x0,
                y0: *y0,
                dx: *dx,
                dy: *dy,
            },
            Projection::Mercator {
                lad,
                lon0,
                x0,
                y0,
                dx,
                dy,
            } => Kind::Plane {
                proj: PlaneProjection::Mercator(Mercator::new(*lad, *lon0, radius)?),
                x0: *x0,
                y0: *y0,
                dx: *dx,
                dy: *dy,
            },
            Projection::SphericalHarmonic { .. } => Kind::Spectral,
        };

        let row_offsets = match descriptor.shape {
            GridShape::Reduced { .. } => descriptor.row_offsets(),
            _ => Vec::new(),
        };

        let mut geometry = Self {
            descriptor: descriptor.clone(),
            kind,
            row_offsets,
            wraps: false,
        };
        geometry.wraps = geometry.compute_wraps();
        Ok(geometry)
    }

    pub fn descriptor(&self) -> &GridDescriptor {
        &self.descriptor
    }

    pub fn point_count(&self) -> usize {
        self.descriptor.point_count()
    }

    pub fn row_count(&self) -> usize {
        self.descriptor.row_count()
    }

    pub fn row_len(&self, j: usize) -> usize {
        self.descriptor.row_len(j)
    }

    pub fn is_quadrilateral(&self) -> bool {
        self.descriptor.is_quadrilateral()
    }

    fn widest_row(&self) -> usize {
        (0..self.row_count()).map(|j| self.row_len(j)).max().unwrap_or(0)
    }

    fn compute_wraps(&self) -> bool {
        match &self.kind {
            Kind::LatLon { dlon, .. } => {
                let nx = self.widest_row() as f64;
                (nx * dlon - 360.0).abs() < 0.5 * dlon
            }
            Kind::Gaussian { lon0, lon_last, .. } => {
                let widest = self.widest_row();
                if widest == 0 {
                    return false;
                }
                let spacing = 360.0 / widest as f64;
                let span = lon_offset_east(*lon0, *lon_last);
                (span - (360.0 - spacing)).abs() < 0.5 * spacing
            }
            _ => false,
        }
    }

    /// True when the rows close around the globe in longitude.
    pub fn wraps_longitude(&self) -> bool {
        self.wraps
    }

    /// True when the grid covers the whole sphere (longitude wrap plus rows
    /// reaching both polar caps).
    pub fn covers_sphere(&self) -> bool {
        if !self.wraps {
            return false;
        }
        match &self.kind {
            Kind::LatLon { lat0, dlat, pole, .. } => {
                if pole.is_some() {
                    return false;
                }
                let lat_last = lat0 + dlat * (self.row_count() as f64 - 1.0);
                lat0 - dlat / 2.0 <= -90.0 + 1e-6 && lat_last + dlat / 2.0 >= 90.0 - 1e-6
            }
            Kind::Gaussian { lats, .. } => match &self.descriptor.projection {
                Projection::Gaussian { n, first_row, .. } => *first_row == 0 && lats.len() == 2 * n,
                _ => false,
            },
            _ => false,
        }
    }

    /// Longitude spacing of canonical row `j`.
    pub fn row_dlon(&self, j: usize) -> f64 {
        let len = self.row_len(j);
        match &self.kind {
            Kind::LatLon { dlon, .. } => {
                if self.wraps {
                    360.0 / len as f64
                } else {
                    *dlon
                }
            }
            Kind::Gaussian { lon0, lon_last, .. } => {
                if self.wraps {
                    360.0 / len as f64
                } else if len > 1 {
                    lon_offset_east(*lon0, *lon_last) / (len - 1) as f64
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    /// Latitude of canonical row `j` for ring grids.
    fn row_lat(&self, j: usize) -> f64 {
        match &self.kind {
            Kind::LatLon { lat0, dlat, .. } => lat0 + dlat * j as f64,
            Kind::Gaussian { lats, .. } => lats[j],
            _ => f64::NAN,
        }
    }

    /// Flat storage index of canonical `(i, j)`.
    pub fn storage_index(&self, i: usize, j: usize) -> usize {
        match &self.descriptor.shape {
            GridShape::Regular { nx, ny } => self.descriptor.scan.storage_index(i, j, *nx, *ny),
            GridShape::Reduced { .. } => reduced_storage_index(
                &self.descriptor.scan,
                &self.row_offsets,
                self.row_len(j),
                i,
                j,
                self.row_count(),
            ),
            GridShape::Spectral { .. } => i,
        }
    }

    /// Canonical `(i, j)` of a flat storage index.
    pub fn canonical_indices(&self, index: usize) -> (usize, usize) {
        match &self.descriptor.shape {
            GridShape::Regular { nx, ny } => self.descriptor.scan.canonical_indices(index, *nx, *ny),
            GridShape::Reduced { .. } => {
                let rows = self.row_count();
                let j_positive = self.descriptor.scan.j_positive;
                let canonical = |sj: usize| if j_positive { sj } else { rows - 1 - sj };

                // Offsets ascend in stored row order
                let (mut lo, mut hi) = (0usize, rows);
                while hi - lo > 1 {
                    let mid = (lo + hi) / 2;
                    if self.row_offsets[canonical(mid)] <= index {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
                let stored_j = lo;
                let j = canonical(stored_j);
                let len = self.row_len(j);
                let si = index - self.row_offsets[j];
                let si = if self.descriptor.scan.alternating_rows && stored_j % 2 == 1 {
                    len - 1 - si
                } else {
                    si
                };
                let i = if self.descriptor.scan.i_negative {
                    len - 1 - si
                } else {
                    si
                };
                (i, j)
            }
            GridShape::Spectral { .. } => (index, 0),
        }
    }

    /// Geographic location of canonical point `(i, j)`.
    pub fn point(&self, i: usize, j: usize) -> GeoPoint {
        match &self.kind {
            Kind::Gaussian { lon0, .. } => {
                GeoPoint::new(self.row_lat(j), lon0 + i as f64 * self.row_dlon(j))
            }
            _ => self.point_at(i as f64, j as f64),
        }
    }

    /// Geographic location of a fractional canonical position.
    pub fn point_at(&self, fi: f64, fj: f64) -> GeoPoint {
        match &self.kind {
            Kind::LatLon {
                lat0,
                lon0,
                dlat,
                pole,
                ..
            } => {
                let dlon = self.row_dlon(0);
                let lat = (lat0 + fj * dlat).clamp(-90.0, 90.0);
                let lon = lon0 + fi * dlon;
                match pole {
                    Some(pole) => {
                        let (glat, glon) = pole.rotated_to_geographic(lat, lon);
                        GeoPoint::new(glat, glon)
                    }
                    None => GeoPoint::new(lat, lon),
                }
            }
            Kind::Gaussian { lats, lon0, .. } => {
                let rows = lats.len();
                let lat = interpolate_rows(lats, fj);
                let j = (fj.round().max(0.0) as usize).min(rows - 1);
                GeoPoint::new(lat, lon0 + fi * self.row_dlon(j))
            }
            Kind::Plane {
                proj,
                x0,
                y0,
                dx,
                dy,
            } => {
                let (lat, lon) = proj.inverse(x0 + fi * dx, y0 + fj * dy);
                GeoPoint::new(lat, lon)
            }
            Kind::Spectral => GeoPoint::new(f64::NAN, f64::NAN),
        }
    }

    /// All grid points in storage order. Spectral grids have none.
    pub fn points(&self) -> Vec<GeoPoint> {
        if matches!(self.kind, Kind::Spectral) {
            return Vec::new();
        }
        (0..self.point_count())
            .map(|index| {
                let (i, j) = self.canonical_indices(index);
                self.point(i, j)
            })
            .collect()
    }

    /// Locate a geographic point inside a quadrilateral grid.
    ///
    /// Returns `None` outside the grid's coverage and for grids without
    /// quadrilateral cells. On grids that wrap in longitude `fi` lies in
    /// `[0, nx)`; columns past `nx - 1` interpolate towards column 0.
    pub fn locate(&self, point: GeoPoint) -> Option<GridLocation> {
        let (nx, ny) = self.descriptor.dimensions()?;
        if !self.is_quadrilateral() || !point.lat.is_finite() || !point.lon.is_finite() {
            return None;
        }
        let (max_i, max_j) = ((nx - 1) as f64, (ny - 1) as f64);

        let (fi, fj) = match &self.kind {
            Kind::LatLon {
                lat0,
                lon0,
                dlat,
                dlon,
                pole,
            } => {
                let (lat, lon) = match pole {
                    Some(pole) => pole.geographic_to_rotated(point.lat, point.lon),
                    None => (point.lat, point.lon),
                };
                let fj = (lat - lat0) / dlat;
                let offset = lon_offset_east(*lon0, lon);
                let fi = if self.wraps {
                    let fi = offset / (360.0 / nx as f64);
                    if fi >= nx as f64 {
                        0.0
                    } else {
                        fi
                    }
                } else {
                    let fi = offset / dlon;
                    if fi > max_i + INDEX_SNAP && (offset - 360.0) / dlon >= -INDEX_SNAP {
                        0.0
                    } else {
                        fi
                    }
                };
                (fi, fj)
            }
            Kind::Gaussian { lats, lon0, .. } => {
                let fj = locate_in_rows(lats, point.lat);
                let offset = lon_offset_east(*lon0, point.lon);
                let dlon = self.row_dlon(0);
                let fi = if self.wraps {
                    let fi = offset / dlon;
                    if fi >= nx as f64 {
                        0.0
                    } else {
                        fi
                    }
                } else {
                    offset / dlon
                };
                (fi, fj)
            }
            Kind::Plane {
                proj,
                x0,
                y0,
                dx,
                dy,
            } => {
                let (x, y) = proj.forward(point.lat, point.lon);
                ((x - x0) / dx, (y - y0) / dy)
            }
            Kind::Spectral => return None,
        };

        let fj = if self.covers_sphere() {
            fj.clamp(0.0, max_j)
        } else {
            fj
        };

        let fi = snap(fi);
        let fj = snap(fj);
        let i_limit = if self.wraps { nx as f64 } else { max_i };
        if fi < 0.0 || fj < 0.0 || fj > max_j || fi > i_limit || (self.wraps && fi >= nx as f64) {
            return None;
        }
        Some(GridLocation {
            fi: fi.min(i_limit),
            fj: fj.min(max_j),
        })
    }

    /// Latitude rings of a ring-structured grid (regular lat/lon or
    /// Gaussian), canonical order.
    pub fn rings(&self) -> Result<Vec<Ring>> {
        match &self.kind {
            Kind::LatLon { pole: None, lon0, .. } => Ok((0..self.row_count())
                .map(|j| Ring {
                    j,
                    lat: self.row_lat(j),
                    gaussian_weight: None,
                    lon_first: *lon0,
                    dlon: self.row_dlon(j),
                    len: self.row_len(j),
                })
                .collect()),
            Kind::Gaussian { weights, lon0, .. } => Ok((0..self.row_count())
                .map(|j| Ring {
                    j,
                    lat: self.row_lat(j),
                    gaussian_weight: Some(weights[j]),
                    lon_first: *lon0,
                    dlon: self.row_dlon(j),
                    len: self.row_len(j),
                })
                .collect()),
            _ => Err(ProjectionError::unsupported(format!(
                "{} grids have no latitude rings",
                self.descriptor.projection.kind()
            ))),
        }
    }

    /// Representative point spacing in kilometers.
    pub fn nominal_spacing_km(&self) -> f64 {
        let km_per_degree = self.descriptor.earth_radius / 1000.0 * std::f64::consts::PI / 180.0;
        match &self.kind {
            Kind::LatLon { dlat, dlon, .. } => dlat.max(*dlon) * km_per_degree,
            Kind::Gaussian { .. } => {
                let rows = match &self.descriptor.projection {
                    Projection::Gaussian { n, .. } => 2 * n,
                    _ => self.row_count(),
                };
                let lat_step = 180.0 / rows.max(1) as f64;
                let widest = self.widest_row().max(1) as f64;
                lat_step.max(360.0 / widest) * km_per_degree
            }
            Kind::Plane { dx, dy, .. } => dx.max(*dy) / 1000.0,
            Kind::Spectral => f64::INFINITY,
        }
    }
}

fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < INDEX_SNAP {
        r
    } else {
        v
    }
}

/// Fractional row position of `lat` among ascending row latitudes.
fn locate_in_rows(lats: &[f64], lat: f64) -> f64 {
    let last = lats.len() - 1;
    if lats.len() == 1 {
        return if (lat - lats[0]).abs() < 1e-9 { 0.0 } else { -1.0 };
    }
    if lat < lats[0] {
        return (lat - lats[0]) / (lats[1] - lats[0]);
    }
    if lat > lats[last] {
        return last as f64 + (lat - lats[last]) / (lats[last] - lats[last - 1]);
    }
    let j = lats.partition_point(|&l| l <= lat).saturating_sub(1).min(last - 1);
    j as f64 + (lat - lats[j]) / (lats[j + 1] - lats[j])
}

/// Latitude at a fractional row position, extrapolating past the ends.
fn interpolate_rows(lats: &[f64], fj: f64) -> f64 {
    let last = lats.len() - 1;
    if last == 0 {
        return lats[0];
    }
    let j = (fj.floor().max(0.0) as usize).min(last - 1);
    let t = fj - j as f64;
    (lats[j] + t * (lats[j + 1] - lats[j])).clamp(-90.0, 90.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ScanMode;
    use crate::geographic::EARTH_RADIUS_M;

    #[test]
    fn test_latlon_locate_exact_points() {
        let grid = GridDescriptor::lat_lon(10.0, 20.0, 1.0, 1.0, 4, 4);
        let geom = GridGeometry::new(&grid).unwrap();
        let loc = geom.locate(GeoPoint::new(12.0, 21.0)).unwrap();
        assert_eq!(loc, GridLocation { fi: 1.0, fj: 2.0 });
        assert!(geom.locate(GeoPoint::new(50.0, 21.0)).is_none());
        assert!(geom.locate(GeoPoint::new(12.0, 30.0)).is_none());
    }

    #[test]
    fn test_latlon_negative_longitudes() {
        let grid = GridDescriptor::lat_lon(30.0, 230.0, 1.0, 1.0, 11, 11);
        let geom = GridGeometry::new(&grid).unwrap();
        let loc = geom.locate(GeoPoint::new(35.0, -125.0)).unwrap();
        assert_eq!(loc.fi, 5.0);
        assert_eq!(loc.fj, 5.0);
    }

    #[test]
    fn test_global_grid_wraps() {
        let grid = GridDescriptor::lat_lon(-90.0, 0.0, 1.0, 1.0, 360, 181);
        let geom = GridGeometry::new(&grid).unwrap();
        assert!(geom.wraps_longitude());
        assert!(geom.covers_sphere());
        let loc = geom.locate(GeoPoint::new(0.0, 359.5)).unwrap();
        assert!((loc.fi - 359.5).abs() < 1e-9);
        let loc = geom.locate(GeoPoint::new(0.0, -0.0)).unwrap();
        assert_eq!(loc.fi, 0.0);
    }

    #[test]
    fn test_points_follow_storage_order() {
        let grid = GridDescriptor::lat_lon(10.0, 20.0, 1.0, 2.0, 2, 2).with_scan(ScanMode::default());
        let geom = GridGeometry::new(&grid).unwrap();
        let points = geom.points();
        assert_eq!(points[0], GeoPoint::new(11.0, 20.0));
        assert_eq!(points[1], GeoPoint::new(11.0, 22.0));
        assert_eq!(points[2], GeoPoint::new(10.0, 20.0));
    }

    #[test]
    fn test_lambert_grid_locate_roundtrip() {
        let proj = LambertConformal::new(25.0, 25.0, 265.0, EARTH_RADIUS_M).unwrap();
        let (x0, y0) = proj.forward(20.0, 250.0);
        let grid = GridDescriptor {
            projection: Projection::LambertConformal {
                latin1: 25.0,
                latin2: 25.0,
                lov: 265.0,
                x0,
                y0,
                dx: 12000.0,
                dy: 12000.0,
            },
            shape: GridShape::Regular { nx: 50, ny: 40 },
            scan: ScanMode::canonical(),
            earth_radius: EARTH_RADIUS_M,
        };
        let geom = GridGeometry::new(&grid).unwrap();
        let p = geom.point(17, 23);
        let loc = geom.locate(p).unwrap();
        assert_eq!(loc, GridLocation { fi: 17.0, fj: 23.0 });
    }

    #[test]
    fn test_gaussian_rings_and_locate() {
        let grid = GridDescriptor::regular_gaussian(4, 16);
        let geom = GridGeometry::new(&grid).unwrap();
        assert!(geom.covers_sphere());
        let rings = geom.rings().unwrap();
        assert_eq!(rings.len(), 8);
        assert!(rings[0].lat < 0.0 && rings[7].lat > 0.0);
        let p = geom.point(3, 5);
        let loc = geom.locate(p).unwrap();
        assert!((loc.fi - 3.0).abs() < 1e-9 && (loc.fj - 5.0).abs() < 1e-9);
        // Poleward of the last row clamps on a global grid
        let polar = geom.locate(GeoPoint::new(89.9, 10.0)).unwrap();
        assert_eq!(polar.fj, 7.0);
    }

    #[test]
    fn test_reduced_grid_canonical_indices() {
        let grid = GridDescriptor::reduced_gaussian(2, vec![4, 8, 8, 4]).with_scan(ScanMode::default());
        let geom = GridGeometry::new(&grid).unwrap();
        assert!(!geom.is_quadrilateral());
        for index in 0..geom.point_count() {
            let (i, j) = geom.canonical_indices(index);
            assert_eq!(geom.storage_index(i, j), index);
        }
        assert_eq!(geom.points().len(), 24);
        assert!(geom.locate(GeoPoint::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_rotated_grid_locate() {
        let pole = RotatedPole::new(-40.0, 10.0, 0.0);
        let grid = GridDescriptor {
            projection: Projection::RotatedLatLon {
                lat_first: -5.0,
                lon_first: -5.0,
                dlat: 0.5,
                dlon: 0.5,
                pole,
            },
            shape: GridShape::Regular { nx: 21, ny: 21 },
            scan: ScanMode::canonical(),
            earth_radius: EARTH_RADIUS_M,
        };
        let geom = GridGeometry::new(&grid).unwrap();
        // Rotated origin lies at 50N 10E
        let loc = geom.locate(GeoPoint::new(50.0, 10.0)).unwrap();
        assert!((loc.fi - 10.0).abs() < 1e-9 && (loc.fj - 10.0).abs() < 1e-9);
    }
}
