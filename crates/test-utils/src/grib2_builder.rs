//! Synthesizes complete GRIB2 records for tests and benchmarks.
//!
//! ```
//! use test_utils::{Grib2Builder, GridTemplate, FieldSpec};
//!
//! let grid = GridTemplate::lat_lon(4, 3, 50.0, 10.0, 1.0, 1.0);
//! let values: Vec<f64> = (0..12).map(|v| v as f64).collect();
//! let bytes = Grib2Builder::new()
//!     .field(FieldSpec::new(grid, values).parameter(0, 0))
//!     .build();
//! assert_eq!(&bytes[0..4], b"GRIB");
//! assert_eq!(&bytes[bytes.len() - 4..], b"7777");
//! ```

use crate::bitwriter::BitWriter;

/// Grid definition (section 3) of a synthesized field. Angles are
/// degrees, distances meters.
#[derive(Debug, Clone, PartialEq)]
pub enum GridTemplate {
    /// Template 3.0. `la1`/`lo1` is the first stored point.
    LatLon {
        nx: u32,
        ny: u32,
        la1: f64,
        lo1: f64,
        la2: f64,
        lo2: f64,
        di: f64,
        dj: f64,
        scan: u8,
    },
    /// Template 3.1 with the rotated pole and angle.
    RotatedLatLon {
        nx: u32,
        ny: u32,
        la1: f64,
        lo1: f64,
        la2: f64,
        lo2: f64,
        di: f64,
        dj: f64,
        scan: u8,
        south_pole_lat: f64,
        south_pole_lon: f64,
        angle: f32,
    },
    /// Template 3.10.
    Mercator {
        nx: u32,
        ny: u32,
        la1: f64,
        lo1: f64,
        la2: f64,
        lo2: f64,
        lad: f64,
        dx: f64,
        dy: f64,
        scan: u8,
    },
    /// Template 3.20.
    PolarStereographic {
        nx: u32,
        ny: u32,
        la1: f64,
        lo1: f64,
        lad: f64,
        lov: f64,
        dx: f64,
        dy: f64,
        south_pole: bool,
        scan: u8,
    },
    /// Template 3.30.
    LambertConformal {
        nx: u32,
        ny: u32,
        la1: f64,
        lo1: f64,
        lov: f64,
        latin1: f64,
        latin2: f64,
        dx: f64,
        dy: f64,
        scan: u8,
    },
    /// Template 3.40; `row_points` (stored order) makes it reduced.
    Gaussian {
        n: u32,
        nx: Option<u32>,
        la1: f64,
        lo1: f64,
        la2: f64,
        lo2: f64,
        row_points: Vec<u32>,
        scan: u8,
    },
    /// Template 3.50 with triangular truncation.
    SphericalHarmonic { truncation: u32 },
    /// Any template, bytes given verbatim.
    Raw {
        template: u16,
        bytes: Vec<u8>,
        num_points: u32,
    },
}

impl GridTemplate {
    /// Regular lat/lon grid stored south to north, west to east.
    pub fn lat_lon(nx: u32, ny: u32, lat_south: f64, lon_west: f64, dlat: f64, dlon: f64) -> Self {
        GridTemplate::LatLon {
            nx,
            ny,
            la1: lat_south,
            lo1: lon_west,
            la2: lat_south + dlat * (ny as f64 - 1.0),
            lo2: lon_west + dlon * (nx as f64 - 1.0),
            di: dlon,
            dj: dlat,
            scan: 0x40,
        }
    }

    /// Regular lat/lon grid stored north to south (the common GRIB2 layout).
    pub fn lat_lon_north_first(nx: u32, ny: u32, lat_north: f64, lon_west: f64, dlat: f64, dlon: f64) -> Self {
        GridTemplate::LatLon {
            nx,
            ny,
            la1: lat_north,
            lo1: lon_west,
            la2: lat_north - dlat * (ny as f64 - 1.0),
            lo2: lon_west + dlon * (nx as f64 - 1.0),
            di: dlon,
            dj: dlat,
            scan: 0x00,
        }
    }

    pub fn point_count(&self) -> u32 {
        match self {
            GridTemplate::LatLon { nx, ny, .. }
            | GridTemplate::RotatedLatLon { nx, ny, .. }
            | GridTemplate::Mercator { nx, ny, .. }
            | GridTemplate::PolarStereographic { nx, ny, .. }
            | GridTemplate::LambertConformal { nx, ny, .. } => nx * ny,
            GridTemplate::Gaussian { n, nx, row_points, .. } => match nx {
                Some(nx) => nx * 2 * n,
                None => row_points.iter().sum(),
            },
            GridTemplate::SphericalHarmonic { truncation } => (truncation + 1) * (truncation + 2),
            GridTemplate::Raw { num_points, .. } => *num_points,
        }
    }

    fn template_number(&self) -> u16 {
        match self {
            GridTemplate::LatLon { .. } => 0,
            GridTemplate::RotatedLatLon { .. } => 1,
            GridTemplate::Mercator { .. } => 10,
            GridTemplate::PolarStereographic { .. } => 20,
            GridTemplate::LambertConformal { .. } => 30,
            GridTemplate::Gaussian { .. } => 40,
            GridTemplate::SphericalHarmonic { .. } => 50,
            GridTemplate::Raw { template, .. } => *template,
        }
    }

    /// Template bytes and the optional per-row list.
    fn encode(&self) -> (Vec<u8>, Vec<u32>) {
        match self {
            GridTemplate::LatLon {
                nx,
                ny,
                la1,
                lo1,
                la2,
                lo2,
                di,
                dj,
                scan,
            } => {
                let mut t = lat_lon_body(*nx, *ny, *la1, *lo1, *la2, *lo2, *scan);
                put_u32(&mut t, 49, micro(*di) as u32);
                put_u32(&mut t, 53, micro(*dj) as u32);
                (t, Vec::new())
            }
            GridTemplate::RotatedLatLon {
                nx,
                ny,
                la1,
                lo1,
                la2,
                lo2,
                di,
                dj,
                scan,
                south_pole_lat,
                south_pole_lon,
                angle,
            } => {
                let mut t = lat_lon_body(*nx, *ny, *la1, *lo1, *la2, *lo2, *scan);
                put_u32(&mut t, 49, micro(*di) as u32);
                put_u32(&mut t, 53, micro(*dj) as u32);
                t.resize(70, 0);
                put_sm(&mut t, 58, micro(*south_pole_lat));
                put_sm(&mut t, 62, micro(*south_pole_lon));
                t[66..70].copy_from_slice(&angle.to_be_bytes());
                (t, Vec::new())
            }
            GridTemplate::Mercator {
                nx,
                ny,
                la1,
                lo1,
                la2,
                lo2,
                lad,
                dx,
                dy,
                scan,
            } => {
                let mut t = earth_header(58);
                put_u32(&mut t, 16, *nx);
                put_u32(&mut t, 20, *ny);
                put_sm(&mut t, 24, micro(*la1));
                put_sm(&mut t, 28, micro(*lo1));
                t[32] = 0x30;
                put_sm(&mut t, 33, micro(*lad));
                put_sm(&mut t, 37, micro(*la2));
                put_sm(&mut t, 41, micro(*lo2));
                t[45] = *scan;
                put_u32(&mut t, 50, millimetres(*dx));
                put_u32(&mut t, 54, millimetres(*dy));
                (t, Vec::new())
            }
            GridTemplate::PolarStereographic {
                nx,
                ny,
                la1,
                lo1,
                lad,
                lov,
                dx,
                dy,
                south_pole,
                scan,
            } => {
                let mut t = earth_header(51);
                put_u32(&mut t, 16, *nx);
                put_u32(&mut t, 20, *ny);
                put_sm(&mut t, 24, micro(*la1));
                put_sm(&mut t, 28, micro(*lo1));
                t[32] = 0x30;
                put_sm(&mut t, 33, micro(*lad));
                put_sm(&mut t, 37, micro(*lov));
                put_u32(&mut t, 41, millimetres(*dx));
                put_u32(&mut t, 45, millimetres(*dy));
                t[49] = if *south_pole { 0x80 } else { 0x00 };
                t[50] = *scan;
                (t, Vec::new())
            }
            GridTemplate::LambertConformal {
                nx,
                ny,
                la1,
                lo1,
                lov,
                latin1,
                latin2,
                dx,
                dy,
                scan,
            } => {
                let mut t = earth_header(67);
                put_u32(&mut t, 16, *nx);
                put_u32(&mut t, 20, *ny);
                put_sm(&mut t, 24, micro(*la1));
                put_sm(&mut t, 28, micro(*lo1));
                t[32] = 0x30;
                put_sm(&mut t, 33, micro(*latin1));
                put_sm(&mut t, 37, micro(*lov));
                put_u32(&mut t, 41, millimetres(*dx));
                put_u32(&mut t, 45, millimetres(*dy));
                t[50] = *scan;
                put_sm(&mut t, 51, micro(*latin1));
                put_sm(&mut t, 55, micro(*latin2));
                put_sm(&mut t, 59, -90_000_000);
                put_sm(&mut t, 63, 0);
                (t, Vec::new())
            }
            GridTemplate::Gaussian {
                n,
                nx,
                la1,
                lo1,
                la2,
                lo2,
                row_points,
                scan,
            } => {
                let rows = 2 * n;
                let mut t = lat_lon_body(nx.unwrap_or(u32::MAX), rows, *la1, *lo1, *la2, *lo2, *scan);
                put_u32(&mut t, 49, u32::MAX);
                put_u32(&mut t, 53, *n);
                let list = if nx.is_some() { Vec::new() } else { row_points.clone() };
                (t, list)
            }
            GridTemplate::SphericalHarmonic { truncation } => {
                let mut t = vec![0u8; 14];
                put_u32(&mut t, 0, *truncation);
                put_u32(&mut t, 4, *truncation);
                put_u32(&mut t, 8, *truncation);
                t[12] = 1;
                t[13] = 1;
                (t, Vec::new())
            }
            GridTemplate::Raw { bytes, .. } => (bytes.clone(), Vec::new()),
        }
    }
}

/// Data representation of a synthesized field.
#[derive(Debug, Clone, PartialEq)]
pub enum Packing {
    /// Template 5.0 with decimal scale `D` and bit width.
    Simple { decimal_scale: i16, nbits: u8 },
    /// Template 5.4, single precision.
    Ieee32,
    /// Template 5.4, double precision.
    Ieee64,
    /// Any template: section 5 body after the template number, and the
    /// section 7 payload, given verbatim.
    Raw {
        template: u16,
        body: Vec<u8>,
        data: Vec<u8>,
        num_packed: u32,
    },
}

/// Bitmap of a synthesized field.
#[derive(Debug, Clone, PartialEq)]
pub enum BitmapSpec {
    None,
    /// Explicit bitmap, `true` where a value is present
    Present(Vec<bool>),
    /// Indicator 254: reuse the previous bitmap of the record
    Reuse,
}

/// One field of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub grid: GridTemplate,
    /// One value per grid point in stored order; absent points are skipped
    pub values: Vec<f64>,
    pub category: u8,
    pub number: u8,
    pub surface_type: u8,
    pub surface_value: u32,
    pub forecast_hours: u32,
    pub packing: Packing,
    pub bitmap: BitmapSpec,
}

impl FieldSpec {
    pub fn new(grid: GridTemplate, values: Vec<f64>) -> Self {
        Self {
            grid,
            values,
            category: 0,
            number: 0,
            surface_type: 1,
            surface_value: 0,
            forecast_hours: 0,
            packing: Packing::Simple {
                decimal_scale: 2,
                nbits: 24,
            },
            bitmap: BitmapSpec::None,
        }
    }

    pub fn parameter(mut self, category: u8, number: u8) -> Self {
        self.category = category;
        self.number = number;
        self
    }

    pub fn surface(mut self, surface_type: u8, value: u32) -> Self {
        self.surface_type = surface_type;
        self.surface_value = value;
        self
    }

    pub fn forecast_hours(mut self, hours: u32) -> Self {
        self.forecast_hours = hours;
        self
    }

    pub fn packing(mut self, packing: Packing) -> Self {
        self.packing = packing;
        self
    }

    pub fn bitmap(mut self, present: Vec<bool>) -> Self {
        self.bitmap = BitmapSpec::Present(present);
        self
    }

    pub fn reuse_bitmap(mut self) -> Self {
        self.bitmap = BitmapSpec::Reuse;
        self
    }
}

/// Builds one GRIB2 record from one or more fields.
#[derive(Debug, Clone)]
pub struct Grib2Builder {
    discipline: u8,
    center: u16,
    reference_time: (u16, u8, u8, u8, u8, u8),
    local_use: Option<Vec<u8>>,
    fields: Vec<FieldSpec>,
}

impl Default for Grib2Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Grib2Builder {
    pub fn new() -> Self {
        Self {
            discipline: 0,
            center: 7,
            reference_time: (2024, 1, 15, 12, 0, 0),
            local_use: None,
            fields: Vec::new(),
        }
    }

    pub fn discipline(mut self, discipline: u8) -> Self {
        self.discipline = discipline;
        self
    }

    pub fn center(mut self, center: u16) -> Self {
        self.center = center;
        self
    }

    pub fn reference_time(mut self, year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        self.reference_time = (year, month, day, hour, minute, second);
        self
    }

    pub fn local_use(mut self, data: Vec<u8>) -> Self {
        self.local_use = Some(data);
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Encode the record. Fields after the first repeat from section 4
    /// when they share the previous grid and from section 3 otherwise.
    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(self.identification());
        if let Some(local) = &self.local_use {
            body.extend(section(2, local));
        }

        let mut previous_grid: Option<&GridTemplate> = None;
        let mut defined_bitmap: Option<&[bool]> = None;
        for field in &self.fields {
            if previous_grid != Some(&field.grid) {
                body.extend(grid_section(&field.grid));
            }
            body.extend(product_section(field));
            let (representation, data) = packing_sections(field, defined_bitmap);
            if let BitmapSpec::Present(mask) = &field.bitmap {
                defined_bitmap = Some(mask);
            }
            body.extend(representation);
            body.extend(bitmap_section(field));
            body.extend(section(7, &data));
            previous_grid = Some(&field.grid);
        }

        let total = 16 + body.len() + 4;
        let mut record = Vec::with_capacity(total);
        record.extend_from_slice(b"GRIB");
        record.extend_from_slice(&[0, 0, self.discipline, 2]);
        record.extend_from_slice(&(total as u64).to_be_bytes());
        record.extend(body);
        record.extend_from_slice(b"7777");
        record
    }

    fn identification(&self) -> Vec<u8> {
        let (year, month, day, hour, minute, second) = self.reference_time;
        let mut b = Vec::new();
        b.extend_from_slice(&self.center.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.extend_from_slice(&[2, 1, 1]);
        b.extend_from_slice(&year.to_be_bytes());
        b.extend_from_slice(&[month, day, hour, minute, second, 0, 1]);
        section(1, &b)
    }
}

/// Prefix a body with its section length and number.
fn section(number: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 5);
    out.extend_from_slice(&((body.len() + 5) as u32).to_be_bytes());
    out.push(number);
    out.extend_from_slice(body);
    out
}

fn grid_section(grid: &GridTemplate) -> Vec<u8> {
    let (template, list) = grid.encode();
    let mut b = vec![0u8];
    b.extend_from_slice(&grid.point_count().to_be_bytes());
    b.push(if list.is_empty() { 0 } else { 2 });
    b.push(if list.is_empty() { 0 } else { 1 });
    b.extend_from_slice(&grid.template_number().to_be_bytes());
    b.extend(template);
    for points in list {
        b.extend_from_slice(&(points as u16).to_be_bytes());
    }
    section(3, &b)
}

fn product_section(field: &FieldSpec) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(&0u16.to_be_bytes());
    b.extend_from_slice(&0u16.to_be_bytes());
    b.extend_from_slice(&[field.category, field.number, 2, 0, 96, 0, 0, 0, 1]);
    b.extend_from_slice(&field.forecast_hours.to_be_bytes());
    b.extend_from_slice(&[field.surface_type, 0]);
    b.extend_from_slice(&field.surface_value.to_be_bytes());
    b.extend_from_slice(&[255, 255]);
    b.extend_from_slice(&u32::MAX.to_be_bytes());
    section(4, &b)
}

/// Values of the points that carry data.
fn present_values(field: &FieldSpec, previous: Option<&[bool]>) -> Vec<f64> {
    let mask = match &field.bitmap {
        BitmapSpec::None => None,
        BitmapSpec::Present(mask) => Some(mask.as_slice()),
        BitmapSpec::Reuse => previous,
    };
    match mask {
        Some(mask) => field
            .values
            .iter()
            .zip(mask)
            .filter(|(_, present)| **present)
            .map(|(v, _)| *v)
            .collect(),
        None => field.values.clone(),
    }
}

fn packing_sections(field: &FieldSpec, defined_bitmap: Option<&[bool]>) -> (Vec<u8>, Vec<u8>) {
    let values = present_values(field, defined_bitmap);
    let mut b = Vec::new();
    let (template, body, data, count) = match &field.packing {
        Packing::Simple { decimal_scale, nbits } => {
            let packed = pack_simple(&values, *decimal_scale, *nbits);
            let mut body = Vec::new();
            body.extend_from_slice(&packed.reference.to_be_bytes());
            body.extend_from_slice(&sign_magnitude_16(packed.binary_scale));
            body.extend_from_slice(&sign_magnitude_16(*decimal_scale));
            body.extend_from_slice(&[*nbits, 0]);
            (0u16, body, packed.data, values.len() as u32)
        }
        Packing::Ieee32 => {
            let data = values.iter().flat_map(|v| (*v as f32).to_be_bytes()).collect();
            (4, vec![1], data, values.len() as u32)
        }
        Packing::Ieee64 => {
            let data = values.iter().flat_map(|v| v.to_be_bytes()).collect();
            (4, vec![2], data, values.len() as u32)
        }
        Packing::Raw {
            template,
            body,
            data,
            num_packed,
        } => (*template, body.clone(), data.clone(), *num_packed),
    };
    b.extend_from_slice(&count.to_be_bytes());
    b.extend_from_slice(&template.to_be_bytes());
    b.extend(body);
    (section(5, &b), data)
}

fn bitmap_section(field: &FieldSpec) -> Vec<u8> {
    match &field.bitmap {
        BitmapSpec::None => section(6, &[255]),
        BitmapSpec::Reuse => section(6, &[254]),
        BitmapSpec::Present(mask) => {
            let mut w = BitWriter::new();
            w.put(0, 8);
            for present in mask {
                w.put(u64::from(*present), 1);
            }
            section(6, &w.finish())
        }
    }
}

/// Simple packing output.
struct Packed {
    reference: f32,
    binary_scale: i16,
    data: Vec<u8>,
}

/// Simple packing with the smallest binary scale that fits `nbits`.
fn pack_simple(values: &[f64], decimal_scale: i16, nbits: u8) -> Packed {
    let scale = 10f64.powi(decimal_scale as i32);
    let scaled: Vec<f64> = values.iter().map(|v| v * scale).collect();
    let min = scaled.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if scaled.is_empty() || nbits == 0 {
        let reference = if scaled.is_empty() { 0.0 } else { min as f32 };
        return Packed {
            reference,
            binary_scale: 0,
            data: Vec::new(),
        };
    }

    let mut reference = min as f32;
    if reference as f64 > min {
        reference = f32::from_bits(if reference > 0.0 {
            reference.to_bits() - 1
        } else if reference < 0.0 {
            reference.to_bits() + 1
        } else {
            0x8000_0001
        });
    }
    let range = max - reference as f64;
    let max_packed = ((1u64 << nbits) - 1) as f64;
    let mut binary_scale = 0i16;
    if range > 0.0 {
        while range / 2f64.powi(binary_scale as i32) > max_packed {
            binary_scale += 1;
        }
        while range / 2f64.powi(binary_scale as i32 - 1) <= max_packed {
            binary_scale -= 1;
        }
    }

    let step = 2f64.powi(binary_scale as i32);
    let mut w = BitWriter::new();
    for v in &scaled {
        let x = ((v - reference as f64) / step).round().clamp(0.0, max_packed) as u64;
        w.put(x, nbits as usize);
    }
    Packed {
        reference,
        binary_scale,
        data: w.finish(),
    }
}

fn micro(degrees: f64) -> i64 {
    (degrees * 1e6).round() as i64
}

fn millimetres(meters: f64) -> u32 {
    (meters * 1e3).round() as u32
}

fn sign_magnitude_16(value: i16) -> [u8; 2] {
    let magnitude = value.unsigned_abs() & 0x7FFF;
    let raw = if value < 0 { magnitude | 0x8000 } else { magnitude };
    raw.to_be_bytes()
}

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

fn put_sm(buf: &mut [u8], offset: usize, value: i64) {
    let magnitude = value.unsigned_abs() as u32 & 0x7FFF_FFFF;
    let raw = if value < 0 { magnitude | 0x8000_0000 } else { magnitude };
    put_u32(buf, offset, raw);
}

/// Template bytes with a 6371229 m sphere (shape code 6).
fn earth_header(len: usize) -> Vec<u8> {
    let mut t = vec![0u8; len];
    t[0] = 6;
    t
}

/// Shared layout of templates 3.0, 3.1 and 3.40.
fn lat_lon_body(nx: u32, ny: u32, la1: f64, lo1: f64, la2: f64, lo2: f64, scan: u8) -> Vec<u8> {
    let mut t = earth_header(58);
    put_u32(&mut t, 16, nx);
    put_u32(&mut t, 20, ny);
    put_u32(&mut t, 28, u32::MAX);
    put_sm(&mut t, 32, micro(la1));
    put_sm(&mut t, 36, micro(lo1));
    t[40] = 0x30;
    put_sm(&mut t, 41, micro(la2));
    put_sm(&mut t, 45, micro(lo2));
    t[57] = scan;
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lengths(record: &[u8]) -> Vec<(u8, usize)> {
        let mut out = Vec::new();
        let mut pos = 16;
        while &record[pos..pos + 4] != b"7777" {
            let len = u32::from_be_bytes([record[pos], record[pos + 1], record[pos + 2], record[pos + 3]]) as usize;
            out.push((record[pos + 4], len));
            pos += len;
        }
        out
    }

    #[test]
    fn test_single_field_layout() {
        let grid = GridTemplate::lat_lon(4, 3, 50.0, 10.0, 1.0, 1.0);
        let record = Grib2Builder::new()
            .field(FieldSpec::new(grid, vec![1.0; 12]))
            .build();
        let total = u64::from_be_bytes(record[8..16].try_into().unwrap()) as usize;
        assert_eq!(total, record.len());
        let sections: Vec<u8> = lengths(&record).iter().map(|(n, _)| *n).collect();
        assert_eq!(sections, vec![1, 3, 4, 5, 6, 7]);
        // Template 3.0 body is 58 octets after the 14-octet header
        assert_eq!(lengths(&record)[1].1, 72);
    }

    #[test]
    fn test_multi_field_repeats() {
        let grid = GridTemplate::lat_lon(2, 2, 0.0, 0.0, 1.0, 1.0);
        let other = GridTemplate::lat_lon(3, 1, 0.0, 0.0, 1.0, 1.0);
        let record = Grib2Builder::new()
            .local_use(vec![1, 2, 3])
            .field(FieldSpec::new(grid.clone(), vec![1.0; 4]))
            .field(FieldSpec::new(grid, vec![2.0; 4]))
            .field(FieldSpec::new(other, vec![3.0; 3]))
            .build();
        let sections: Vec<u8> = lengths(&record).iter().map(|(n, _)| *n).collect();
        assert_eq!(sections, vec![1, 2, 3, 4, 5, 6, 7, 4, 5, 6, 7, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_pack_simple_reference_at_or_below_minimum() {
        let packed = pack_simple(&[0.1, 0.2, 0.3], 0, 16);
        assert!(packed.reference as f64 <= 0.1);
        assert_eq!(packed.data.len(), 6);
    }
}
