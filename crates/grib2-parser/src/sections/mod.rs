//! GRIB2 section parsing.
//!
//! This module handles parsing of individual GRIB2 message sections. Every
//! section after the indicator starts with a 4-byte length and a 1-byte
//! section number; fixed layouts are parsed with `nom`, template payloads
//! are handed to [`crate::templates`].

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use nom::{
    bytes::complete::{tag, take},
    number::complete::{be_u16, be_u32, be_u64, be_u8},
    sequence::tuple,
    IResult,
};

use crate::bitstream::BitReader;
use crate::error::{Grib2Error, Result};
use crate::templates::{decode_template, TemplatePayload};
use crate::unpacking::CodecParameters;

/// Length of section 0 in edition 2.
pub const INDICATOR_LEN: usize = 16;

/// End-of-message marker (section 8).
pub const END_MARKER: &[u8; 4] = b"7777";

/// Byte span of one section inside the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpan {
    pub number: u8,
    /// Absolute byte offset in the buffer the record was read from
    pub offset: usize,
    pub length: usize,
}

/// Section 0: Indicator Section (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub total_length: u64,
}

/// Section 1: Identification Section
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    pub center: u16,
    pub sub_center: u16,
    pub master_table_version: u8,
    pub local_table_version: u8,
    pub significance_of_reference_time: u8,
    pub reference_time: DateTime<Utc>,
    pub production_status: u8,
    pub data_type: u8,
}

/// Section 2: Local Use Section, kept opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalUse {
    pub data: Bytes,
}

/// Section 3: Grid Definition Section.
///
/// The template payload is kept raw; [`crate::grid::resolve`] interprets it.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDefinitionSection {
    pub source: u8,
    pub num_points: u32,
    pub optional_list_octets: u8,
    pub optional_list_interpretation: u8,
    pub template_number: u16,
    /// Template bytes, starting at section octet 15
    pub template: Bytes,
    /// Points per row for quasi-regular grids, in stored row order
    pub optional_list: Vec<u32>,
}

/// A horizontal level or layer bound (Code Table 4.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSurface {
    pub surface_type: u8,
    /// Scaled value, `None` when the message marks it missing
    pub value: Option<f64>,
}

/// Statistical processing over a time interval (template 4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticalProcess {
    pub end_time: Option<DateTime<Utc>>,
    /// Code Table 4.10 (0 average, 1 accumulation, 2 maximum, ...)
    pub process: u8,
    pub time_range_unit: u8,
    pub time_range_length: u32,
}

/// Section 4: Product Definition Section
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDefinition {
    pub template_number: u16,
    pub coordinate_values: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    pub generating_process: u8,
    /// Code Table 4.4
    pub time_unit: u8,
    pub forecast_time: u32,
    pub first_surface: FixedSurface,
    pub second_surface: Option<FixedSurface>,
    pub statistics: Option<StatisticalProcess>,
}

impl ProductDefinition {
    /// Forecast time converted to hours when the unit allows it.
    pub fn forecast_hours(&self) -> Option<f64> {
        let t = self.forecast_time as f64;
        match self.time_unit {
            0 => Some(t / 60.0),
            1 => Some(t),
            2 => Some(t * 24.0),
            10 => Some(t * 3.0),
            11 => Some(t * 6.0),
            12 => Some(t * 12.0),
            13 => Some(t / 3600.0),
            _ => None,
        }
    }
}

/// Section 5: Data Representation Section
#[derive(Debug, Clone, PartialEq)]
pub struct DataRepresentation {
    /// Number of values actually packed in section 7
    pub num_packed: u32,
    pub template_number: u16,
    pub params: CodecParameters,
}

/// Section 6: Bitmap Section
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub indicator: u8,
    /// Bitmap bits, one per grid point, MSB first. Resolved from an earlier
    /// field of the same record when the indicator is 254.
    pub data: Option<Bytes>,
}

impl Bitmap {
    pub fn none() -> Self {
        Self {
            indicator: 255,
            data: None,
        }
    }

    /// Whether grid point `index` holds a packed value.
    pub fn is_present(&self, index: usize) -> bool {
        match &self.data {
            Some(bits) => bits
                .get(index / 8)
                .map(|byte| byte & (0x80 >> (index % 8)) != 0)
                .unwrap_or(false),
            None => true,
        }
    }
}

/// Section 7: Data Section
#[derive(Debug, Clone, PartialEq)]
pub struct DataSection {
    pub data: Bytes,
}

// ===== nom parsers for fixed layouts =====

fn indicator_fields(input: &[u8]) -> IResult<&[u8], (u8, u8, u64)> {
    let (input, (_, _, discipline, edition, total_length)) =
        tuple((tag(&b"GRIB"[..]), be_u16, be_u8, be_u8, be_u64))(input)?;
    Ok((input, (discipline, edition, total_length)))
}

/// Section length and number.
fn section_header(input: &[u8]) -> IResult<&[u8], (u32, u8)> {
    tuple((be_u32, be_u8))(input)
}

#[allow(clippy::type_complexity)]
fn identification_fields(
    input: &[u8],
) -> IResult<&[u8], (u16, u16, u8, u8, u8, (u16, u8, u8, u8, u8, u8), u8, u8)> {
    let (input, _) = take(5usize)(input)?;
    tuple((
        be_u16,
        be_u16,
        be_u8,
        be_u8,
        be_u8,
        tuple((be_u16, be_u8, be_u8, be_u8, be_u8, be_u8)),
        be_u8,
        be_u8,
    ))(input)
}

#[allow(clippy::type_complexity)]
fn grid_definition_header(input: &[u8]) -> IResult<&[u8], (u8, u32, u8, u8, u16)> {
    let (input, _) = take(5usize)(input)?;
    tuple((be_u8, be_u32, be_u8, be_u8, be_u16))(input)
}

fn truncated<E>(section: u8) -> impl FnOnce(nom::Err<E>) -> Grib2Error {
    move |_| Grib2Error::invalid_section(section, "section body truncated")
}

// ===== Section readers =====

/// Outcome of reading the indicator: edition 2 records parse on, other
/// editions are reported with their length when it is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorRead {
    Edition2(Indicator),
    /// Edition 1 record with its 24-bit total length
    Edition1 { total_length: usize },
    Other { edition: u8 },
}

/// Parse Section 0 (Indicator) from the start of a record.
pub fn parse_indicator(data: &[u8]) -> Result<IndicatorRead> {
    if data.len() >= 8 && &data[0..4] == b"GRIB" && data[7] == 1 {
        let total_length = u32::from_be_bytes([0, data[4], data[5], data[6]]) as usize;
        return Ok(IndicatorRead::Edition1 { total_length });
    }

    let (_, (discipline, edition, total_length)) = indicator_fields(data).map_err(|_| {
        if data.len() >= 4 && &data[0..4] != b"GRIB" {
            Grib2Error::invalid_format("missing GRIB magic")
        } else {
            Grib2Error::invalid_format("not enough data for indicator section")
        }
    })?;

    if edition != 2 {
        return Ok(IndicatorRead::Other { edition });
    }

    Ok(IndicatorRead::Edition2(Indicator {
        discipline,
        edition,
        total_length,
    }))
}

/// Read the `(length, number)` header of the section starting at `data`.
pub fn parse_section_header(data: &[u8]) -> Result<(usize, u8)> {
    let (_, (length, number)) = section_header(data)
        .map_err(|_| Grib2Error::invalid_format("truncated section header"))?;
    Ok((length as usize, number))
}

/// Parse Section 1 (Identification); `data` is the whole section.
pub fn parse_identification(data: &[u8]) -> Result<Identification> {
    let (_, fields) = identification_fields(data).map_err(truncated(1))?;
    let (
        center,
        sub_center,
        master_table_version,
        local_table_version,
        significance_of_reference_time,
        (year, month, day, hour, minute, second),
        production_status,
        data_type,
    ) = fields;

    let reference_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| {
            Grib2Error::invalid_section(
                1,
                format!(
                    "Invalid date: {}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                ),
            )
        })?;

    Ok(Identification {
        center,
        sub_center,
        master_table_version,
        local_table_version,
        significance_of_reference_time,
        reference_time: DateTime::<Utc>::from_naive_utc_and_offset(reference_time, Utc),
        production_status,
        data_type,
    })
}

/// Parse Section 2 (Local Use).
pub fn parse_local_use(section: &Bytes) -> LocalUse {
    LocalUse {
        data: section.slice(5..),
    }
}

/// Template body length for the grid templates the resolver understands;
/// anything after it is the optional per-row point list.
fn grid_template_len(template: u16) -> Option<usize> {
    match template {
        0 | 40 => Some(58),
        1 => Some(70),
        10 => Some(58),
        20 => Some(51),
        30 => Some(67),
        50 => Some(14),
        _ => None,
    }
}

/// Parse Section 3 (Grid Definition); `section` is the whole section.
pub fn parse_grid_definition(section: &Bytes) -> Result<GridDefinitionSection> {
    let (_, (source, num_points, optional_list_octets, optional_list_interpretation, template_number)) =
        grid_definition_header(section).map_err(truncated(3))?;

    let body = section.slice(14..);
    let (template, optional_list) = match (grid_template_len(template_number), optional_list_octets) {
        (Some(len), octets) if octets > 0 => {
            if body.len() < len {
                return Err(Grib2Error::invalid_section(
                    3,
                    format!("template 3.{} needs {} octets, found {}", template_number, len, body.len()),
                ));
            }
            let list = &body[len..];
            let width = octets as usize;
            if list.len() % width != 0 {
                return Err(Grib2Error::invalid_section(
                    3,
                    format!("optional list of {} octets is not a multiple of {}", list.len(), width),
                ));
            }
            let values = list
                .chunks(width)
                .map(|chunk| chunk.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
                .collect();
            (body.slice(..len), values)
        }
        _ => (body, Vec::new()),
    };

    Ok(GridDefinitionSection {
        source,
        num_points,
        optional_list_octets,
        optional_list_interpretation,
        template_number,
        template,
        optional_list,
    })
}

/// Parse Section 4 (Product Definition) through the template decode table.
pub fn parse_product_definition(section: &[u8]) -> Result<ProductDefinition> {
    let mut reader = BitReader::new(section);
    read_product_definition(&mut reader).map_err(|e| e.in_section(4))
}

fn read_product_definition(reader: &mut BitReader<'_>) -> Result<ProductDefinition> {
    reader.seek(5)?;
    let coordinate_values = reader.read_u16()?;
    let template_number = reader.read_u16()?;
    match decode_template(4, template_number, reader)? {
        TemplatePayload::Product(mut product) => {
            product.coordinate_values = coordinate_values;
            Ok(product)
        }
        TemplatePayload::DataRepresentation(_) => Err(Grib2Error::invalid_section(
            4,
            "product template decoded as a data representation",
        )),
    }
}

/// Parse Section 5 (Data Representation) through the template decode table.
pub fn parse_data_representation(section: &[u8]) -> Result<DataRepresentation> {
    let mut reader = BitReader::new(section);
    read_data_representation(&mut reader).map_err(|e| e.in_section(5))
}

fn read_data_representation(reader: &mut BitReader<'_>) -> Result<DataRepresentation> {
    reader.seek(5)?;
    let num_packed = reader.read_u32()?;
    let template_number = reader.read_u16()?;
    match decode_template(5, template_number, reader)? {
        TemplatePayload::DataRepresentation(params) => Ok(DataRepresentation {
            num_packed,
            template_number,
            params,
        }),
        TemplatePayload::Product(_) => Err(Grib2Error::invalid_section(
            5,
            "data representation template decoded as a product",
        )),
    }
}

/// Parse Section 6 (Bitmap). Indicator 254 resolves to `previous`.
pub fn parse_bitmap(section: &Bytes, previous: Option<&Bitmap>) -> Result<Bitmap> {
    let indicator = *section
        .get(5)
        .ok_or_else(|| Grib2Error::invalid_section(6, "missing bitmap indicator"))?;

    match indicator {
        0 => Ok(Bitmap {
            indicator,
            data: Some(section.slice(6..)),
        }),
        254 => match previous.and_then(|b| b.data.clone()) {
            Some(data) => Ok(Bitmap {
                indicator,
                data: Some(data),
            }),
            None => Err(Grib2Error::invalid_section(
                6,
                "bitmap indicator 254 without an earlier bitmap in the record",
            )),
        },
        255 => Ok(Bitmap::none()),
        predefined => Err(Grib2Error::UnsupportedTemplate {
            section: 6,
            template: predefined as u16,
        }),
    }
}

/// Parse Section 7 (Data).
pub fn parse_data_section(section: &Bytes) -> DataSection {
    DataSection {
        data: section.slice(5..),
    }
}
