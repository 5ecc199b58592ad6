//! Template decode table for sections 4 and 5.
//!
//! Every supported `(section, template)` pair maps to a decoder function
//! that reads the template body from a [`BitReader`] positioned just after
//! the template number. Pairs missing from [`TEMPLATE_DECODERS`] are
//! unsupported rather than malformed.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::bitstream::BitReader;
use crate::error::{Grib2Error, Result};
use crate::sections::{FixedSurface, ProductDefinition, StatisticalProcess};
use crate::unpacking::{CodecParameters, CodecSpecific, ComplexPacking};

/// Decoded template payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePayload {
    Product(ProductDefinition),
    DataRepresentation(CodecParameters),
}

/// Reads one template body; receives the template number.
pub type TemplateDecoder = fn(u16, &mut BitReader<'_>) -> Result<TemplatePayload>;

/// Tagged decode table keyed by `(section number, template number)`.
pub static TEMPLATE_DECODERS: &[((u8, u16), TemplateDecoder)] = &[
    ((4, 0), product_header),
    ((4, 1), product_header),
    ((4, 2), product_header),
    ((4, 3), product_header),
    ((4, 4), product_header),
    ((4, 5), product_header),
    ((4, 6), product_header),
    ((4, 7), product_header),
    ((4, 8), product_statistical),
    ((4, 9), product_header),
    ((4, 10), product_header),
    ((4, 11), product_header),
    ((4, 12), product_header),
    ((4, 13), product_header),
    ((4, 14), product_header),
    ((4, 15), product_header),
    ((5, 0), data_simple),
    ((5, 2), data_complex),
    ((5, 3), data_complex),
    ((5, 4), data_ieee),
    ((5, 40), data_jpeg2000),
    ((5, 41), data_simple),
    ((5, 42), data_aec),
    ((5, 50), data_spectral_simple),
    ((5, 51), data_spectral_complex),
    ((5, 61), data_simple_log),
    ((5, 200), data_run_length),
];

/// Look up the decoder for a template.
pub fn decoder_for(section: u8, template: u16) -> Option<TemplateDecoder> {
    TEMPLATE_DECODERS
        .iter()
        .find(|(key, _)| *key == (section, template))
        .map(|(_, decoder)| *decoder)
}

/// Decode a template body, failing with `UnsupportedTemplate` for pairs
/// missing from the table.
pub fn decode_template(section: u8, template: u16, reader: &mut BitReader<'_>) -> Result<TemplatePayload> {
    let decoder = decoder_for(section, template).ok_or(Grib2Error::UnsupportedTemplate { section, template })?;
    debug!(section, template, "Decoding template");
    decoder(template, reader)
}

// ===== Section 4 =====

fn read_surface(reader: &mut BitReader<'_>) -> Result<FixedSurface> {
    let surface_type = reader.read_u8()?;
    let scale = reader.read_u8()?;
    let scaled_value = reader.read_u32()?;

    let value = if scale == 0xFF || scaled_value == u32::MAX {
        None
    } else {
        let magnitude = (scale & 0x7F) as i32;
        let scale = if scale & 0x80 != 0 { -magnitude } else { magnitude };
        Some(scaled_value as f64 * 10f64.powi(-scale))
    };

    Ok(FixedSurface { surface_type, value })
}

fn read_product_header(template: u16, reader: &mut BitReader<'_>) -> Result<ProductDefinition> {
    let parameter_category = reader.read_u8()?;
    let parameter_number = reader.read_u8()?;
    let generating_process = reader.read_u8()?;
    // Background and analysis process ids, observation cutoff
    reader.skip_bits(8 + 8 + 16 + 8)?;
    let time_unit = reader.read_u8()?;
    let forecast_time = reader.read_u32()?;
    let first_surface = read_surface(reader)?;
    let second = read_surface(reader)?;

    Ok(ProductDefinition {
        template_number: template,
        coordinate_values: 0,
        parameter_category,
        parameter_number,
        generating_process,
        time_unit,
        forecast_time,
        first_surface,
        second_surface: (second.surface_type != 255).then_some(second),
        statistics: None,
    })
}

fn product_header(template: u16, reader: &mut BitReader<'_>) -> Result<TemplatePayload> {
    Ok(TemplatePayload::Product(read_product_header(template, reader)?))
}

fn product_statistical(template: u16, reader: &mut BitReader<'_>) -> Result<TemplatePayload> {
    let mut product = read_product_header(template, reader)?;

    let year = reader.read_u16()?;
    let month = reader.read_u8()?;
    let day = reader.read_u8()?;
    let hour = reader.read_u8()?;
    let minute = reader.read_u8()?;
    let second = reader.read_u8()?;
    let end_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .map(|t| DateTime::<Utc>::from_naive_utc_and_offset(t, Utc));

    let ranges = reader.read_u8()?;
    let _missing = reader.read_u32()?;
    if ranges == 0 {
        return Err(Grib2Error::invalid_section(4, "template 4.8 without a time range specification"));
    }
    let process = reader.read_u8()?;
    let _increment_type = reader.read_u8()?;
    let time_range_unit = reader.read_u8()?;
    let time_range_length = reader.read_u32()?;

    product.statistics = Some(StatisticalProcess {
        end_time,
        process,
        time_range_unit,
        time_range_length,
    });
    Ok(TemplatePayload::Product(product))
}

// ===== Section 5 =====

/// The reference value, scale factors, bit width and type shared by every
/// integer packing template.
fn read_packing_header(template: u16, reader: &mut BitReader<'_>) -> Result<CodecParameters> {
    Ok(CodecParameters {
        template,
        reference_value: reader.read_f32()?,
        binary_scale: reader.read_i16_sm()?,
        decimal_scale: reader.read_i16_sm()?,
        nbits: reader.read_u8()?,
        original_type: reader.read_u8()?,
        specific: CodecSpecific::None,
    })
}

fn data_simple(template: u16, reader: &mut BitReader<'_>) -> Result<TemplatePayload> {
    Ok(TemplatePayload::DataRepresentation(read_packing_header(template, reader)?))
}

fn data_simple_log(template: u16, reader: &mut BitReader<'_>) -> Result<TemplatePayload> {
    let mut params = read_packing_header(template, reader)?;
    params.specific = CodecSpecific::SimpleLog {
        preprocess: reader.read_f32()?,
    };
    Ok(TemplatePayload::DataRepresentation(params))
}

fn data_complex(template: u16, reader: &mut BitReader<'_>) -> Result<TemplatePayload> {
    let mut params = read_packing_header(template, reader)?;
    let mut complex = ComplexPacking {
        splitting_method: reader.read_u8()?,
        missing_management: reader.read_u8()?,
        primary_missing: reader.read_u32()?,
        secondary_missing: reader.read_u32()?,
        groups: reader.read_u32()?,
        group_width_reference: reader.read_u8()?,
        group_width_bits: reader.read_u8()?,
        group_length_reference: reader.read_u32()?,
        group_length_increment: reader.read_u8()?,
        last_group_length: reader.read_u32()?,
        group_length_bits: reader.read_u8()?,
        spatial_order: 0,
        extra_octets: 0,
    };
    if template == 3 {
        complex.spatial_order = reader.read_u8()?;
        complex.extra_octets = reader.read_u8()?;
    }
    params.specific = CodecSpecific::Complex(complex);
    Ok(TemplatePayload::DataRepresentation(params))
}

fn data_ieee(template: u16, reader: &mut BitReader<'_>) -> Result<TemplatePayload> {
    let precision = reader.read_u8()?;
    let nbits = match precision {
        1 => 32,
        2 => 64,
        other => {
            return Err(Grib2Error::invalid_section(
                5,
                format!("unsupported IEEE precision code {}", other),
            ))
        }
    };
    Ok(TemplatePayload::DataRepresentation(CodecParameters {
        template,
        reference_value: 0.0,
        binary_scale: 0,
        decimal_scale: 0,
        nbits,
        original_type: 0,
        specific: CodecSpecific::Ieee { precision },
    }))
}

fn data_jpeg2000(template: u16, reader: &mut BitReader<'_>) -> Result<TemplatePayload> {
    let mut params = read_packing_header(template, reader)?;
    params.specific = CodecSpecific::Jpeg2000 {
        compression_type: reader.read_u8()?,
        target_ratio: reader.read_u8()?,
    };
    Ok(TemplatePayload::DataRepresentation(params))
}

fn data_aec(template: u16, reader: &mut BitReader<'_>) -> Result<TemplatePayload> {
    let mut params = read_packing_header(template, reader)?;
    params.specific = CodecSpecific::Aec {
        flags: reader.read_u8()?,
        block_size: reader.read_u8()?,
        reference_sample_interval: reader.read_u16()?,
    };
    Ok(TemplatePayload::DataRepresentation(params))
}

fn data_spectral_simple(template: u16, reader: &mut BitReader<'_>) -> Result<TemplatePayload> {
    let reference_value = reader.read_f32()?;
    let binary_scale = reader.read_i16_sm()?;
    let decimal_scale = reader.read_i16_sm()?;
    let nbits = reader.read_u8()?;
    let real_00 = reader.read_f32()?;
    Ok(TemplatePayload::DataRepresentation(CodecParameters {
        template,
        reference_value,
        binary_scale,
        decimal_scale,
        nbits,
        original_type: 0,
        specific: CodecSpecific::SpectralSimple { real_00 },
    }))
}

fn data_spectral_complex(template: u16, reader: &mut BitReader<'_>) -> Result<TemplatePayload> {
    let reference_value = reader.read_f32()?;
    let binary_scale = reader.read_i16_sm()?;
    let decimal_scale = reader.read_i16_sm()?;
    let nbits = reader.read_u8()?;
    let laplacian_scaling = reader.read_i32_sm()?;
    let js = reader.read_u16()?;
    let ks = reader.read_u16()?;
    let ms = reader.read_u16()?;
    let ts = reader.read_u32()?;
    let unpacked_precision = reader.read_u8()?;
    Ok(TemplatePayload::DataRepresentation(CodecParameters {
        template,
        reference_value,
        binary_scale,
        decimal_scale,
        nbits,
        original_type: 0,
        specific: CodecSpecific::SpectralComplex {
            laplacian_scaling,
            js,
            ks,
            ms,
            ts,
            unpacked_precision,
        },
    }))
}

fn data_run_length(template: u16, reader: &mut BitReader<'_>) -> Result<TemplatePayload> {
    let nbits = reader.read_u8()?;
    let max_level = reader.read_u16()?;
    let max_level_default = reader.read_u16()?;
    let decimal_scale = reader.read_i8_sm()? as i16;
    let level_values = (0..max_level_default)
        .map(|_| reader.read_u16())
        .collect::<Result<Vec<_>>>()?;
    Ok(TemplatePayload::DataRepresentation(CodecParameters {
        template,
        reference_value: 0.0,
        binary_scale: 0,
        decimal_scale,
        nbits,
        original_type: 1,
        specific: CodecSpecific::RunLength {
            max_level,
            level_values,
        },
    }))
}
