//! Grid definition resolver.
//!
//! Turns the raw template of section 3 into a [`GridDescriptor`] in
//! canonical order (south-west origin, positive increments). The scan flags
//! of the message are kept on the descriptor; the field itself is never
//! reordered here.

use projection::gaussian::gaussian_latitudes;
use projection::geographic::{lon_offset_east, normalize_lon_360};
use projection::{
    GridDescriptor, GridShape, LambertConformal, MapProjection, Mercator, PolarStereographic, Projection,
    RotatedPole, ScanMode,
};
use tracing::{debug, warn};

use crate::bitstream::decode_grib2_signed;
use crate::error::{Grib2Error, Result};
use crate::sections::GridDefinitionSection;

/// Radius for shape of earth code 0 (meters).
const EARTH_RADIUS_CODE_0: f64 = 6_367_470.0;
/// Radius for shape of earth code 6 and the fallback (meters).
const EARTH_RADIUS_CODE_6: f64 = 6_371_229.0;

/// Degrees per unit when the basic angle is 0 or missing.
const MICRODEGREE: f64 = 1e-6;

/// Octets of a section 3 template, addressed from the template start.
struct Template<'a> {
    number: u16,
    bytes: &'a [u8],
    /// Degrees per unit of angles and increments
    unit: f64,
}

impl<'a> Template<'a> {
    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        self.bytes.get(offset..offset + len).ok_or_else(|| {
            Grib2Error::invalid_section(
                3,
                format!(
                    "template 3.{} truncated: octet {} of {}",
                    self.number,
                    offset + len,
                    self.bytes.len()
                ),
            )
        })
    }

    fn u8(&self, offset: usize) -> Result<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    fn u32(&self, offset: usize) -> Result<u32> {
        let b = self.slice(offset, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&self, offset: usize) -> Result<f32> {
        let b = self.slice(offset, 4)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Sign-magnitude angle in template units.
    fn degrees(&self, offset: usize) -> Result<f64> {
        Ok(decode_grib2_signed(self.slice(offset, 4)?) as f64 * self.unit)
    }

    /// Unsigned increment in template units, `None` when missing.
    fn increment_degrees(&self, offset: usize) -> Result<Option<f64>> {
        let raw = self.u32(offset)?;
        Ok((raw != u32::MAX).then(|| raw as f64 * self.unit))
    }

    /// Angle unit of templates 3.0, 3.1 and 3.40: basic angle over its
    /// subdivisions, microdegrees when the basic angle is 0 or missing.
    fn angle_unit(&self) -> Result<f64> {
        let basic_angle = self.u32(24)?;
        let subdivisions = self.u32(28)?;
        if basic_angle == 0 || basic_angle == u32::MAX {
            return Ok(MICRODEGREE);
        }
        if subdivisions == 0 || subdivisions == u32::MAX {
            return Err(Grib2Error::invalid_section(
                3,
                format!("basic angle {} without subdivisions", basic_angle),
            ));
        }
        Ok(basic_angle as f64 / subdivisions as f64)
    }

    /// Unsigned distance in millimetres, converted to meters.
    fn millimetres(&self, offset: usize) -> Result<f64> {
        Ok(self.u32(offset)? as f64 * 1e-3)
    }

    fn count(&self, offset: usize) -> Result<usize> {
        Ok(self.u32(offset)? as usize)
    }

    /// Sphere radius from the shape of the earth octets at the template start.
    fn earth_radius(&self) -> Result<f64> {
        let shape = self.u8(0)?;
        Ok(match shape {
            0 => EARTH_RADIUS_CODE_0,
            1 => {
                let scale = self.u8(1)?;
                let value = self.u32(2)?;
                if scale == 0xFF || value == u32::MAX || value == 0 {
                    return Err(Grib2Error::invalid_section(3, "earth shape 1 without a radius"));
                }
                value as f64 * 10f64.powi(-(scale as i32))
            }
            6 => EARTH_RADIUS_CODE_6,
            other => {
                warn!(shape = other, "Unsupported shape of the earth, using a 6371229 m sphere");
                EARTH_RADIUS_CODE_6
            }
        })
    }
}

/// Resolve section 3 into a canonical grid descriptor.
pub fn resolve(section: &GridDefinitionSection) -> Result<GridDescriptor> {
    let mut template = Template {
        number: section.template_number,
        bytes: &section.template,
        unit: MICRODEGREE,
    };
    if matches!(section.template_number, 0 | 1 | 40) {
        template.unit = template.angle_unit()?;
    }

    let descriptor = match section.template_number {
        0 => lat_lon(&template, None)?,
        1 => {
            let pole = RotatedPole::new(template.degrees(58)?, template.degrees(62)?, template.f32(66)? as f64);
            lat_lon(&template, Some(pole))?
        }
        10 => mercator(&template)?,
        20 => polar_stereographic(&template)?,
        30 => lambert(&template)?,
        40 => gaussian(&template, &section.optional_list)?,
        50 => spherical_harmonic(&template)?,
        other => return Err(Grib2Error::UnsupportedProjection(other)),
    };

    descriptor.validate()?;
    if descriptor.point_count() != section.num_points as usize {
        return Err(Grib2Error::invalid_section(
            3,
            format!(
                "template 3.{} describes {} points, section declares {}",
                section.template_number,
                descriptor.point_count(),
                section.num_points
            ),
        ));
    }

    debug!(
        template = section.template_number,
        projection = descriptor.projection.kind(),
        points = descriptor.point_count(),
        "Resolved grid definition"
    );
    Ok(descriptor)
}

/// Templates 3.0 and 3.1.
fn lat_lon(t: &Template<'_>, pole: Option<RotatedPole>) -> Result<GridDescriptor> {
    let nx = t.count(16)?;
    let ny = t.count(20)?;
    let la1 = t.degrees(32)?;
    let lo1 = t.degrees(36)?;
    let la2 = t.degrees(41)?;
    let lo2 = t.degrees(45)?;
    let scan = ScanMode::from_grib2_flag(t.u8(57)?);

    let dlat = match t.increment_degrees(53)? {
        Some(d) if d > 0.0 => d,
        _ if ny > 1 => (la2 - la1).abs() / (ny - 1) as f64,
        _ => 0.0,
    };
    let dlon = match t.increment_degrees(49)? {
        Some(d) if d > 0.0 => d,
        _ if nx > 1 => {
            let (west, east) = if scan.i_negative { (lo2, lo1) } else { (lo1, lo2) };
            lon_offset_east(west, east) / (nx - 1) as f64
        }
        _ => 0.0,
    };

    let lat_first = if scan.j_positive {
        la1
    } else {
        la1 - dlat * ny.saturating_sub(1) as f64
    };
    let lon_first = if scan.i_negative {
        lo1 - dlon * nx.saturating_sub(1) as f64
    } else {
        lo1
    };
    let lon_first = normalize_lon_360(lon_first);

    let projection = match pole {
        None => Projection::LatLon {
            lat_first,
            lon_first,
            dlat,
            dlon,
        },
        Some(pole) => Projection::RotatedLatLon {
            lat_first,
            lon_first,
            dlat,
            dlon,
            pole,
        },
    };

    Ok(GridDescriptor {
        projection,
        shape: GridShape::Regular { nx, ny },
        scan,
        earth_radius: t.earth_radius()?,
    })
}

/// Plane coordinates of canonical point `(0, 0)` given the first stored
/// point.
fn plane_origin(
    first: (f64, f64),
    scan: ScanMode,
    nx: usize,
    ny: usize,
    dx: f64,
    dy: f64,
) -> (f64, f64) {
    let x0 = if scan.i_negative {
        first.0 - (nx.saturating_sub(1)) as f64 * dx
    } else {
        first.0
    };
    let y0 = if scan.j_positive {
        first.1
    } else {
        first.1 - (ny.saturating_sub(1)) as f64 * dy
    };
    (x0, y0)
}

/// Template 3.10.
fn mercator(t: &Template<'_>) -> Result<GridDescriptor> {
    let nx = t.count(16)?;
    let ny = t.count(20)?;
    let la1 = t.degrees(24)?;
    let lo1 = t.degrees(28)?;
    let lad = t.degrees(33)?;
    let scan = ScanMode::from_grib2_flag(t.u8(45)?);
    let dx = t.millimetres(50)?;
    let dy = t.millimetres(54)?;
    let radius = t.earth_radius()?;

    let lon0 = normalize_lon_360(lo1);
    let first = Mercator::new(lad, lon0, radius)?.forward(la1, lo1);
    let (x0, y0) = plane_origin(first, scan, nx, ny, dx, dy);

    Ok(GridDescriptor {
        projection: Projection::Mercator {
            lad,
            lon0,
            x0,
            y0,
            dx,
            dy,
        },
        shape: GridShape::Regular { nx, ny },
        scan,
        earth_radius: radius,
    })
}

/// Template 3.20.
fn polar_stereographic(t: &Template<'_>) -> Result<GridDescriptor> {
    let nx = t.count(16)?;
    let ny = t.count(20)?;
    let la1 = t.degrees(24)?;
    let lo1 = t.degrees(28)?;
    let lad = t.degrees(33)?;
    let lov = t.degrees(37)?;
    let dx = t.millimetres(41)?;
    let dy = t.millimetres(45)?;
    let south_pole = t.u8(49)? & 0x80 != 0;
    let scan = ScanMode::from_grib2_flag(t.u8(50)?);
    let radius = t.earth_radius()?;

    let first = PolarStereographic::new(lad, lov, south_pole, radius)?.forward(la1, lo1);
    let (x0, y0) = plane_origin(first, scan, nx, ny, dx, dy);

    Ok(GridDescriptor {
        projection: Projection::PolarStereographic {
            lad,
            lov,
            south_pole,
            x0,
            y0,
            dx,
            dy,
        },
        shape: GridShape::Regular { nx, ny },
        scan,
        earth_radius: radius,
    })
}

/// Template 3.30.
fn lambert(t: &Template<'_>) -> Result<GridDescriptor> {
    let nx = t.count(16)?;
    let ny = t.count(20)?;
    let la1 = t.degrees(24)?;
    let lo1 = t.degrees(28)?;
    let lov = t.degrees(37)?;
    let dx = t.millimetres(41)?;
    let dy = t.millimetres(45)?;
    let scan = ScanMode::from_grib2_flag(t.u8(50)?);
    let latin1 = t.degrees(51)?;
    let latin2 = t.degrees(55)?;
    let radius = t.earth_radius()?;

    let first = LambertConformal::new(latin1, latin2, lov, radius)?.forward(la1, lo1);
    let (x0, y0) = plane_origin(first, scan, nx, ny, dx, dy);

    Ok(GridDescriptor {
        projection: Projection::LambertConformal {
            latin1,
            latin2,
            lov,
            x0,
            y0,
            dx,
            dy,
        },
        shape: GridShape::Regular { nx, ny },
        scan,
        earth_radius: radius,
    })
}

/// Template 3.40, regular or reduced.
fn gaussian(t: &Template<'_>, optional_list: &[u32]) -> Result<GridDescriptor> {
    let ni = t.u32(16)?;
    let nj = t.count(20)?;
    let la1 = t.degrees(32)?;
    let lo1 = t.degrees(36)?;
    let la2 = t.degrees(41)?;
    let lo2 = t.degrees(45)?;
    let n = t.count(53)?;
    let scan = ScanMode::from_grib2_flag(t.u8(57)?);

    let shape = if ni == u32::MAX || ni == 0 {
        if optional_list.len() != nj {
            return Err(Grib2Error::invalid_section(
                3,
                format!("reduced Gaussian grid lists {} rows, Nj is {}", optional_list.len(), nj),
            ));
        }
        let mut row_points: Vec<usize> = optional_list.iter().map(|&p| p as usize).collect();
        if !scan.j_positive {
            row_points.reverse();
        }
        GridShape::Reduced { row_points }
    } else {
        GridShape::Regular { nx: ni as usize, ny: nj }
    };

    // Southernmost row among the 2N global latitudes, counted from the south
    let rows = gaussian_latitudes(n)?;
    let south = la1.min(la2);
    let (first_row, distance) = rows
        .iter()
        .rev()
        .enumerate()
        .map(|(k, row)| (k, (row.lat - south).abs()))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });
    let row_spacing = 90.0 / n as f64;
    if distance > 0.5 * row_spacing {
        return Err(Grib2Error::invalid_section(
            3,
            format!("latitude {} is not a Gaussian latitude for N={}", south, n),
        ));
    }

    let (lon_first, lon_last) = if scan.i_negative { (lo2, lo1) } else { (lo1, lo2) };

    Ok(GridDescriptor {
        projection: Projection::Gaussian {
            n,
            first_row,
            lon_first: normalize_lon_360(lon_first),
            lon_last: normalize_lon_360(lon_last),
        },
        shape,
        scan,
        earth_radius: t.earth_radius()?,
    })
}

/// Template 3.50.
fn spherical_harmonic(t: &Template<'_>) -> Result<GridDescriptor> {
    let j = t.count(0)?;
    let k = t.count(4)?;
    let m = t.count(8)?;
    let representation = t.u8(12)?;
    if representation != 1 || !(j == k && k == m) {
        debug!(j, k, m, representation, "Non-triangular spectral truncation");
        return Err(Grib2Error::UnsupportedProjection(50));
    }
    Ok(GridDescriptor::spherical_harmonic(j))
}
