//! Canonical grid descriptors.
//!
//! A [`GridDescriptor`] describes a grid independently of how a GRIB2
//! message encoded it. Geometry is always stored in *canonical order*:
//! `i` increases eastward (+x), `j` increases northward (+y), and the origin
//! is the south-west point. The [`ScanMode`] records how the stored values
//! of a field map onto that canonical order, so consumers can reorder lazily
//! with [`GridDescriptor::storage_index`].

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};
use crate::geographic::EARTH_RADIUS_M;
use crate::rotated::RotatedPole;

/// Scan mode flags for grid data ordering.
///
/// Based on GRIB2 scanning mode (Flag Table 3.4).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanMode {
    /// +i direction: false = +x (east), true = -x (west)
    #[serde(default)]
    pub i_negative: bool,
    /// +j direction: false = -y (south), true = +y (north)
    #[serde(default)]
    pub j_positive: bool,
    /// Adjacent points: false = i direction, true = j direction
    #[serde(default)]
    pub j_consecutive: bool,
    /// Row scan direction alternates
    #[serde(default)]
    pub alternating_rows: bool,
}

impl ScanMode {
    /// Canonical order: starts at the south-west corner, rows run west to
    /// east, rows are stacked south to north.
    pub fn canonical() -> Self {
        Self {
            j_positive: true,
            ..Self::default()
        }
    }

    /// Create from GRIB2 flag byte.
    pub fn from_grib2_flag(flag: u8) -> Self {
        Self {
            i_negative: (flag & 0x80) != 0,
            j_positive: (flag & 0x40) != 0,
            j_consecutive: (flag & 0x20) != 0,
            alternating_rows: (flag & 0x10) != 0,
        }
    }

    /// Encode back into the GRIB2 flag byte.
    pub fn to_grib2_flag(&self) -> u8 {
        let mut flag = 0u8;
        if self.i_negative {
            flag |= 0x80;
        }
        if self.j_positive {
            flag |= 0x40;
        }
        if self.j_consecutive {
            flag |= 0x20;
        }
        if self.alternating_rows {
            flag |= 0x10;
        }
        flag
    }

    /// Flat storage index of canonical point `(i, j)` on an `nx × ny` grid.
    pub fn storage_index(&self, i: usize, j: usize, nx: usize, ny: usize) -> usize {
        let si = if self.i_negative { nx - 1 - i } else { i };
        let sj = if self.j_positive { j } else { ny - 1 - j };

        if self.j_consecutive {
            let sj = if self.alternating_rows && si % 2 == 1 {
                ny - 1 - sj
            } else {
                sj
            };
            si * ny + sj
        } else {
            let si = if self.alternating_rows && sj % 2 == 1 {
                nx - 1 - si
            } else {
                si
            };
            sj * nx + si
        }
    }

    /// Canonical `(i, j)` of a flat storage index on an `nx × ny` grid.
    pub fn canonical_indices(&self, index: usize, nx: usize, ny: usize) -> (usize, usize) {
        let (si, sj) = if self.j_consecutive {
            let si = index / ny;
            let sj = index % ny;
            let sj = if self.alternating_rows && si % 2 == 1 {
                ny - 1 - sj
            } else {
                sj
            };
            (si, sj)
        } else {
            let sj = index / nx;
            let si = index % nx;
            let si = if self.alternating_rows && sj % 2 == 1 {
                nx - 1 - si
            } else {
                si
            };
            (si, sj)
        };

        let i = if self.i_negative { nx - 1 - si } else { si };
        let j = if self.j_positive { sj } else { ny - 1 - sj };
        (i, j)
    }
}

/// Supported projections, with parameters in canonical order.
///
/// Angles are degrees; plane coordinates and spacings are meters. For
/// projected grids `(x0, y0)` is the plane position of canonical point
/// `(0, 0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    /// Regular latitude/longitude (template 3.0).
    LatLon {
        lat_first: f64,
        lon_first: f64,
        dlat: f64,
        dlon: f64,
    },
    /// Regular grid in a rotated-pole frame (template 3.1); `lat_first` and
    /// `lon_first` are rotated coordinates.
    RotatedLatLon {
        lat_first: f64,
        lon_first: f64,
        dlat: f64,
        dlon: f64,
        pole: RotatedPole,
    },
    /// Gaussian latitudes (template 3.40). `n` is the number of parallels
    /// between pole and equator; `first_row` indexes the southernmost row
    /// among the `2n` global latitudes counted from the south.
    Gaussian {
        n: usize,
        #[serde(default)]
        first_row: usize,
        lon_first: f64,
        lon_last: f64,
    },
    /// Lambert conformal conic (template 3.30).
    LambertConformal {
        latin1: f64,
        latin2: f64,
        lov: f64,
        x0: f64,
        y0: f64,
        dx: f64,
        dy: f64,
    },
    /// Polar stereographic (template 3.20).
    PolarStereographic {
        lad: f64,
        lov: f64,
        #[serde(default)]
        south_pole: bool,
        x0: f64,
        y0: f64,
        dx: f64,
        dy: f64,
    },
    /// Mercator (template 3.10); `lon0` is the meridian mapped to x = 0.
    Mercator {
        lad: f64,
        lon0: f64,
        x0: f64,
        y0: f64,
        dx: f64,
        dy: f64,
    },
    /// Spherical harmonic coefficients (template 3.50) with pentagonal
    /// resolution parameters J, K, M.
    SphericalHarmonic { j: usize, k: usize, m: usize },
}

impl Projection {
    /// Short name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Projection::LatLon { .. } => "regular_ll",
            Projection::RotatedLatLon { .. } => "rotated_ll",
            Projection::Gaussian { .. } => "gaussian",
            Projection::LambertConformal { .. } => "lambert",
            Projection::PolarStereographic { .. } => "polar_stereographic",
            Projection::Mercator { .. } => "mercator",
            Projection::SphericalHarmonic { .. } => "spherical_harmonic",
        }
    }
}

/// Grid point layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GridShape {
    /// `nx` columns by `ny` rows.
    Regular { nx: usize, ny: usize },
    /// Variable points per row, rows listed south to north.
    Reduced { row_points: Vec<usize> },
    /// Triangular spectral truncation; values are real/imaginary pairs.
    Spectral { truncation: usize },
}

fn default_earth_radius() -> f64 {
    EARTH_RADIUS_M
}

/// Canonical, codec-independent description of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDescriptor {
    pub projection: Projection,
    pub shape: GridShape,
    /// How stored field values map to canonical order
    #[serde(default = "ScanMode::canonical")]
    pub scan: ScanMode,
    /// Sphere radius in meters
    #[serde(default = "default_earth_radius")]
    pub earth_radius: f64,
}

impl GridDescriptor {
    /// Regular lat/lon grid in canonical scan order.
    ///
    /// # Arguments
    /// * `lat_first` - Latitude of the southernmost row (degrees)
    /// * `lon_first` - Longitude of the westernmost column (degrees)
    /// * `dlat`, `dlon` - Positive increments (degrees)
    /// * `nx`, `ny` - Columns and rows
    pub fn lat_lon(lat_first: f64, lon_first: f64, dlat: f64, dlon: f64, nx: usize, ny: usize) -> Self {
        Self {
            projection: Projection::LatLon {
                lat_first,
                lon_first,
                dlat,
                dlon,
            },
            shape: GridShape::Regular { nx, ny },
            scan: ScanMode::canonical(),
            earth_radius: EARTH_RADIUS_M,
        }
    }

    /// Global regular Gaussian grid with `nlon` points per row.
    pub fn regular_gaussian(n: usize, nlon: usize) -> Self {
        let dlon = if nlon > 0 { 360.0 / nlon as f64 } else { 0.0 };
        Self {
            projection: Projection::Gaussian {
                n,
                first_row: 0,
                lon_first: 0.0,
                lon_last: 360.0 - dlon,
            },
            shape: GridShape::Regular { nx: nlon, ny: 2 * n },
            scan: ScanMode::canonical(),
            earth_radius: EARTH_RADIUS_M,
        }
    }

    /// Global reduced Gaussian grid; `row_points` lists rows south to north.
    pub fn reduced_gaussian(n: usize, row_points: Vec<usize>) -> Self {
        let widest = row_points.iter().copied().max().unwrap_or(0);
        let dlon = if widest > 0 { 360.0 / widest as f64 } else { 0.0 };
        Self {
            projection: Projection::Gaussian {
                n,
                first_row: 0,
                lon_first: 0.0,
                lon_last: 360.0 - dlon,
            },
            shape: GridShape::Reduced { row_points },
            scan: ScanMode::canonical(),
            earth_radius: EARTH_RADIUS_M,
        }
    }

    /// Spherical-harmonic coefficient set with triangular truncation.
    pub fn spherical_harmonic(truncation: usize) -> Self {
        Self {
            projection: Projection::SphericalHarmonic {
                j: truncation,
                k: truncation,
                m: truncation,
            },
            shape: GridShape::Spectral { truncation },
            scan: ScanMode::canonical(),
            earth_radius: EARTH_RADIUS_M,
        }
    }

    pub fn with_scan(mut self, scan: ScanMode) -> Self {
        self.scan = scan;
        self
    }

    /// Number of values a field on this grid holds.
    pub fn point_count(&self) -> usize {
        match &self.shape {
            GridShape::Regular { nx, ny } => nx * ny,
            GridShape::Reduced { row_points } => row_points.iter().sum(),
            GridShape::Spectral { truncation } => (truncation + 1) * (truncation + 2),
        }
    }

    /// `(nx, ny)` for regular grids.
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        match self.shape {
            GridShape::Regular { nx, ny } => Some((nx, ny)),
            _ => None,
        }
    }

    /// Number of latitude rows (0 for spectral grids).
    pub fn row_count(&self) -> usize {
        match &self.shape {
            GridShape::Regular { ny, .. } => *ny,
            GridShape::Reduced { row_points } => row_points.len(),
            GridShape::Spectral { .. } => 0,
        }
    }

    /// Points in canonical row `j`.
    pub fn row_len(&self, j: usize) -> usize {
        match &self.shape {
            GridShape::Regular { nx, .. } => *nx,
            GridShape::Reduced { row_points } => row_points.get(j).copied().unwrap_or(0),
            GridShape::Spectral { .. } => 0,
        }
    }

    /// True for grids whose cells are quadrilaterals (regular shape, not
    /// spectral).
    pub fn is_quadrilateral(&self) -> bool {
        matches!(self.shape, GridShape::Regular { .. })
            && !matches!(self.projection, Projection::SphericalHarmonic { .. })
    }

    pub fn is_spectral(&self) -> bool {
        matches!(self.projection, Projection::SphericalHarmonic { .. })
    }

    /// The same geometry with canonical scan order. Two descriptors that
    /// differ only in scan flags have equal canonical geometries.
    pub fn canonical_geometry(&self) -> GridDescriptor {
        GridDescriptor {
            scan: ScanMode::canonical(),
            ..self.clone()
        }
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        match &self.shape {
            GridShape::Regular { nx, ny } if *nx == 0 || *ny == 0 => {
                return Err(ProjectionError::invalid_grid(format!(
                    "empty grid {}x{}",
                    nx, ny
                )));
            }
            GridShape::Reduced { row_points } => {
                if row_points.is_empty() || row_points.iter().any(|&n| n == 0) {
                    return Err(ProjectionError::invalid_grid(
                        "reduced grid rows must all hold at least one point",
                    ));
                }
                if !matches!(self.projection, Projection::Gaussian { .. }) {
                    return Err(ProjectionError::invalid_grid(
                        "reduced rows are only supported for Gaussian grids",
                    ));
                }
                if self.scan.j_consecutive {
                    return Err(ProjectionError::invalid_grid(
                        "reduced grids must be stored row by row",
                    ));
                }
            }
            _ => {}
        }

        if !(self.earth_radius.is_finite() && self.earth_radius > 0.0) {
            return Err(ProjectionError::invalid_grid(format!(
                "invalid earth radius {}",
                self.earth_radius
            )));
        }

        let positive = |name: &str, v: f64| -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ProjectionError::invalid_grid(format!(
                    "{} must be positive, got {}",
                    name, v
                )))
            }
        };

        match &self.projection {
            Projection::LatLon { dlat, dlon, .. } | Projection::RotatedLatLon { dlat, dlon, .. } => {
                positive("dlat", *dlat)?;
                positive("dlon", *dlon)?;
            }
            Projection::Gaussian { n, first_row, .. } => {
                if *n == 0 || first_row + self.row_count() > 2 * n {
                    return Err(ProjectionError::invalid_grid(format!(
                        "{} rows from row {} do not fit a Gaussian grid with N={}",
                        self.row_count(),
                        first_row,
                        n
                    )));
                }
            }
            Projection::LambertConformal { dx, dy, .. }
            | Projection::PolarStereographic { dx, dy, .. }
            | Projection::Mercator { dx, dy, .. } => {
                positive("dx", *dx)?;
                positive("dy", *dy)?;
            }
            Projection::SphericalHarmonic { j, k, m } => {
                if !(j == k && k == m) {
                    return Err(ProjectionError::unsupported(format!(
                        "only triangular truncation is supported (J={}, K={}, M={})",
                        j, k, m
                    )));
                }
                if self.shape != (GridShape::Spectral { truncation: *j }) {
                    return Err(ProjectionError::invalid_grid(
                        "spherical harmonic grids need a spectral shape",
                    ));
                }
            }
        }

        if matches!(self.shape, GridShape::Spectral { .. }) && !self.is_spectral() {
            return Err(ProjectionError::invalid_grid(
                "spectral shape requires a spherical harmonic projection",
            ));
        }

        Ok(())
    }

    /// Check that a field of `len` values fits this grid.
    pub fn validate_field_len(&self, len: usize) -> Result<()> {
        let expected = self.point_count();
        if expected != len {
            return Err(ProjectionError::invalid_grid(format!(
                "field holds {} values but the grid has {} points",
                len, expected
            )));
        }
        Ok(())
    }

    /// Storage offset of each canonical row.
    pub fn row_offsets(&self) -> Vec<usize> {
        let rows = self.row_count();
        let mut stored_lengths: Vec<usize> = (0..rows)
            .map(|sj| self.row_len(self.canonical_row(sj)))
            .collect();
        let mut offset = 0;
        for len in stored_lengths.iter_mut() {
            let this = *len;
            *len = offset;
            offset += this;
        }
        (0..rows)
            .map(|j| stored_lengths[self.canonical_row(j)])
            .collect()
    }

    /// Stored row position of canonical row `j` (the mapping is an
    /// involution, so it also maps stored rows back to canonical ones).
    fn canonical_row(&self, j: usize) -> usize {
        if self.scan.j_positive {
            j
        } else {
            self.row_count() - 1 - j
        }
    }

    /// Flat storage index of canonical point `(i, j)`.
    ///
    /// Reduced grids compute row offsets on every call; use
    /// [`crate::GridGeometry`] for repeated lookups.
    pub fn storage_index(&self, i: usize, j: usize) -> usize {
        match &self.shape {
            GridShape::Regular { nx, ny } => self.scan.storage_index(i, j, *nx, *ny),
            GridShape::Reduced { .. } => {
                reduced_storage_index(&self.scan, &self.row_offsets(), self.row_len(j), i, j, self.row_count())
            }
            GridShape::Spectral { .. } => i,
        }
    }

    /// Reorder a stored field into canonical order.
    pub fn to_canonical_order<T: Copy>(&self, values: &[T]) -> Result<Vec<T>> {
        self.validate_field_len(values.len())?;
        match &self.shape {
            GridShape::Regular { nx, ny } => {
                let mut out = Vec::with_capacity(values.len());
                for j in 0..*ny {
                    for i in 0..*nx {
                        out.push(values[self.scan.storage_index(i, j, *nx, *ny)]);
                    }
                }
                Ok(out)
            }
            GridShape::Reduced { .. } => {
                let offsets = self.row_offsets();
                let rows = self.row_count();
                let mut out = Vec::with_capacity(values.len());
                for (j, _) in offsets.iter().enumerate() {
                    let len = self.row_len(j);
                    for i in 0..len {
                        out.push(values[reduced_storage_index(&self.scan, &offsets, len, i, j, rows)]);
                    }
                }
                Ok(out)
            }
            GridShape::Spectral { .. } => Ok(values.to_vec()),
        }
    }
}

pub(crate) fn reduced_storage_index(
    scan: &ScanMode,
    offsets: &[usize],
    len: usize,
    i: usize,
    j: usize,
    rows: usize,
) -> usize {
    let sj = if scan.j_positive { j } else { rows - 1 - j };
    let si = if scan.i_negative { len - 1 - i } else { i };
    let si = if scan.alternating_rows && sj % 2 == 1 {
        len - 1 - si
    } else {
        si
    };
    offsets[j] + si
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_mode_from_grib2() {
        let mode = ScanMode::from_grib2_flag(0x40);
        assert!(!mode.i_negative);
        assert!(mode.j_positive);
        assert!(!mode.j_consecutive);
        assert_eq!(mode, ScanMode::canonical());
        assert_eq!(ScanMode::from_grib2_flag(0xF0).to_grib2_flag(), 0xF0);
    }

    #[test]
    fn test_storage_index_roundtrip_all_modes() {
        let (nx, ny) = (5, 3);
        for flag in [0x00u8, 0x40, 0x80, 0xC0, 0x20, 0x60, 0x10, 0x50, 0x30] {
            let scan = ScanMode::from_grib2_flag(flag);
            let mut seen = vec![false; nx * ny];
            for j in 0..ny {
                for i in 0..nx {
                    let idx = scan.storage_index(i, j, nx, ny);
                    assert!(!seen[idx], "flag {:#x} maps twice to {}", flag, idx);
                    seen[idx] = true;
                    assert_eq!(scan.canonical_indices(idx, nx, ny), (i, j));
                }
            }
        }
    }

    #[test]
    fn test_north_to_south_storage() {
        // GRIB default scan: first stored value is the north-west corner
        let scan = ScanMode::default();
        assert_eq!(scan.storage_index(0, 2, 4, 3), 0);
        assert_eq!(scan.storage_index(0, 0, 4, 3), 8);
    }

    #[test]
    fn test_canonical_order_makes_scans_equivalent() {
        let north_first = GridDescriptor::lat_lon(10.0, 20.0, 1.0, 1.0, 3, 2).with_scan(ScanMode::default());
        let south_first = GridDescriptor::lat_lon(10.0, 20.0, 1.0, 1.0, 3, 2);

        // Same physical field stored in both orders
        let stored_north = [4.0, 5.0, 6.0, 1.0, 2.0, 3.0];
        let stored_south = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

        assert_eq!(north_first.canonical_geometry(), south_first.canonical_geometry());
        assert_eq!(
            north_first.to_canonical_order(&stored_north).unwrap(),
            south_first.to_canonical_order(&stored_south).unwrap()
        );
    }

    #[test]
    fn test_reduced_rows_and_offsets() {
        let grid = GridDescriptor::reduced_gaussian(1, vec![4, 6]).with_scan(ScanMode::default());
        assert_eq!(grid.point_count(), 10);
        // Stored north row first: canonical row 1 (6 points) at offset 0
        assert_eq!(grid.row_offsets(), vec![6, 0]);
        assert_eq!(grid.storage_index(0, 0), 6);
        assert_eq!(grid.storage_index(5, 1), 5);
        grid.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_grids() {
        assert!(GridDescriptor::lat_lon(0.0, 0.0, -1.0, 1.0, 2, 2).validate().is_err());
        assert!(GridDescriptor::lat_lon(0.0, 0.0, 1.0, 1.0, 0, 2).validate().is_err());
        assert!(GridDescriptor::reduced_gaussian(1, vec![4, 0]).validate().is_err());
        assert!(GridDescriptor::reduced_gaussian(1, vec![4, 4, 4]).validate().is_err());
        GridDescriptor::spherical_harmonic(21).validate().unwrap();
    }

    #[test]
    fn test_spectral_point_count() {
        assert_eq!(GridDescriptor::spherical_harmonic(2).point_count(), 12);
    }

    #[test]
    fn test_descriptor_from_json() {
        let json = r#"{
            "projection": {"kind": "lat_lon", "lat_first": 20.0, "lon_first": 230.0, "dlat": 0.5, "dlon": 0.5},
            "shape": {"type": "regular", "nx": 10, "ny": 8}
        }"#;
        let grid: GridDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(grid.scan, ScanMode::canonical());
        assert_eq!(grid.point_count(), 80);
        assert_eq!(grid.earth_radius, EARTH_RADIUS_M);
    }
}
