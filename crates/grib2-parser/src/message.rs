//! GRIB2 records and the fields they carry.
//!
//! A record is the indicator, identification, then one or more fields each
//! made of sections 2..7, 3..7 or 4..7, closed by the `7777` marker. Every
//! field becomes one [`Grib2Message`] holding its own copy of the shared
//! sections.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use projection::GridDescriptor;
use tracing::{debug, warn};

use crate::error::{Grib2Error, MessageError, Result};
use crate::grid;
use crate::sections::{
    parse_bitmap, parse_data_representation, parse_data_section, parse_grid_definition, parse_identification,
    parse_indicator, parse_local_use, parse_product_definition, parse_section_header, Bitmap, DataRepresentation,
    DataSection, GridDefinitionSection, Identification, Indicator, IndicatorRead, LocalUse, ProductDefinition,
    SectionSpan, END_MARKER, INDICATOR_LEN,
};
use crate::tables::Grib2Tables;
use crate::unpacking::{CodecRegistry, DecodedField, DEFAULT_MISSING_VALUE};

/// One field of a GRIB2 record.
#[derive(Debug, Clone, PartialEq)]
pub struct Grib2Message {
    /// Byte offset of the record in the input buffer
    pub offset: usize,
    /// Total length of the record this field belongs to
    pub record_length: usize,
    /// Position of this field inside its record
    pub field_index: usize,
    pub indicator: Indicator,
    pub identification: Identification,
    pub local_use: Option<LocalUse>,
    pub grid_definition: GridDefinitionSection,
    pub product_definition: ProductDefinition,
    pub data_representation: DataRepresentation,
    pub bitmap: Bitmap,
    pub data: DataSection,
    /// Spans of the sections this field was built from, in section order
    pub sections: Vec<SectionSpan>,
}

impl Grib2Message {
    pub fn discipline(&self) -> u8 {
        self.indicator.discipline
    }

    pub fn reference_time(&self) -> DateTime<Utc> {
        self.identification.reference_time
    }

    /// Number of grid points declared by section 3.
    pub fn point_count(&self) -> usize {
        self.grid_definition.num_points as usize
    }

    /// Canonical grid descriptor of this field.
    pub fn grid(&self) -> Result<GridDescriptor> {
        grid::resolve(&self.grid_definition)
    }

    /// Template number of the data representation (the codec key).
    pub fn packing_template(&self) -> u16 {
        self.data_representation.template_number
    }

    /// Decode the field with the default missing-value marker.
    pub fn unpack(&self, registry: &CodecRegistry) -> Result<DecodedField> {
        self.unpack_with_missing(registry, DEFAULT_MISSING_VALUE)
    }

    /// Decode the field over every grid point, in stored order, writing
    /// `missing_value` at absent points.
    pub fn unpack_with_missing(&self, registry: &CodecRegistry, missing_value: f64) -> Result<DecodedField> {
        let point_count = self.point_count();
        let packed_count = self.data_representation.num_packed as usize;

        if self.bitmap.data.is_some() {
            let present = (0..point_count).filter(|&i| self.bitmap.is_present(i)).count();
            if present != packed_count {
                return Err(Grib2Error::invalid_format(format!(
                    "bitmap marks {} points present, section 5 packs {}",
                    present, packed_count
                )));
            }
        } else if packed_count != point_count {
            return Err(Grib2Error::invalid_format(format!(
                "section 5 packs {} values for {} grid points without a bitmap",
                packed_count, point_count
            )));
        }

        debug!(
            template = self.data_representation.template_number,
            codec = registry.codec_name(self.data_representation.template_number).unwrap_or("none"),
            values = packed_count,
            "Unpacking data section"
        );
        let values = registry.decode(&self.data.data, &self.data_representation.params, packed_count)?;
        DecodedField::expand(values, &self.bitmap, point_count, missing_value)
    }

    /// Short parameter name from `tables`.
    pub fn parameter_name(&self, tables: &Grib2Tables) -> String {
        tables.parameter_name(
            self.discipline(),
            self.product_definition.parameter_category,
            self.product_definition.parameter_number,
        )
    }

    /// Description of the first fixed surface from `tables`.
    pub fn level_description(&self, tables: &Grib2Tables) -> String {
        tables.level_description(&self.product_definition.first_surface)
    }
}

/// Result of parsing one record.
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    pub messages: Vec<Grib2Message>,
    /// Bytes the record occupies
    pub consumed: usize,
}

/// Sections of the field being assembled.
#[derive(Default)]
struct FieldState {
    local_use: Option<LocalUse>,
    grid: Option<GridDefinitionSection>,
    product: Option<ProductDefinition>,
    representation: Option<DataRepresentation>,
    bitmap: Option<Bitmap>,
    /// Last bitmap defined in this record, for indicator 254
    defined_bitmap: Option<Bitmap>,
    spans: [Option<SectionSpan>; 8],
}

/// Whether section `next` may follow section `previous`.
fn follows(previous: u8, next: u8) -> bool {
    matches!(
        (previous, next),
        (0, 1) | (1, 2) | (1, 3) | (2, 3) | (3, 4) | (4, 5) | (5, 6) | (6, 7) | (7, 2) | (7, 3) | (7, 4)
    )
}

/// Parse the record starting at `offset` in `data`.
pub fn parse_record(data: &Bytes, offset: usize) -> std::result::Result<ParsedRecord, MessageError> {
    let buf = data.slice(offset.min(data.len())..);

    let indicator = match parse_indicator(&buf).map_err(|e| MessageError::new(e, None))? {
        IndicatorRead::Edition2(indicator) => indicator,
        IndicatorRead::Edition1 { total_length } => {
            let consumed = (total_length >= 8 && total_length <= buf.len()).then_some(total_length);
            return Err(MessageError::new(Grib2Error::UnsupportedEdition(1), consumed));
        }
        IndicatorRead::Other { edition } => {
            return Err(MessageError::new(Grib2Error::UnsupportedEdition(edition), None));
        }
    };

    let total = usize::try_from(indicator.total_length).unwrap_or(usize::MAX);
    if total > buf.len() {
        return Err(MessageError::new(
            Grib2Error::invalid_format(format!(
                "record declares {} bytes, only {} remain",
                indicator.total_length,
                buf.len()
            )),
            None,
        ));
    }
    if total < INDICATOR_LEN + END_MARKER.len() {
        return Err(MessageError::new(
            Grib2Error::invalid_format(format!("record length {} is too short", total)),
            None,
        ));
    }

    let record = buf.slice(..total);
    let messages = parse_sections(&record, offset, indicator).map_err(|e| MessageError::new(e, Some(total)))?;
    Ok(ParsedRecord {
        messages,
        consumed: total,
    })
}

fn parse_sections(record: &Bytes, offset: usize, indicator: Indicator) -> Result<Vec<Grib2Message>> {
    let total = record.len();
    let mut pos = INDICATOR_LEN;
    let mut previous = 0u8;
    let mut identification: Option<Identification> = None;
    let mut field = FieldState::default();
    let mut messages = Vec::new();
    field.spans[0] = Some(SectionSpan {
        number: 0,
        offset,
        length: INDICATOR_LEN,
    });

    loop {
        if pos + END_MARKER.len() <= total && &record[pos..pos + END_MARKER.len()] == END_MARKER {
            if previous != 7 {
                return Err(Grib2Error::invalid_format(format!(
                    "end marker after section {}, expected section {}",
                    previous,
                    previous + 1
                )));
            }
            if pos + END_MARKER.len() != total {
                warn!(
                    offset,
                    marker = pos,
                    length = total,
                    "End marker before the declared record length"
                );
            }
            break;
        }

        let (length, number) = parse_section_header(record.get(pos..).unwrap_or_default())
            .map_err(|_| Grib2Error::invalid_format(format!("missing end marker at byte {}", pos)))?;
        if length < 5 {
            return Err(Grib2Error::invalid_section(number, format!("section length {} is below 5", length)));
        }
        if pos + length > total {
            return Err(Grib2Error::invalid_section(
                number,
                format!("section of {} bytes at {} overruns the {}-byte record", length, pos, total),
            ));
        }
        if !follows(previous, number) {
            return Err(Grib2Error::invalid_format(format!(
                "section {} cannot follow section {}",
                number, previous
            )));
        }

        debug!(section = number, length, offset = offset + pos, "Parsing section");
        let section = record.slice(pos..pos + length);
        let span = SectionSpan {
            number,
            offset: offset + pos,
            length,
        };

        match number {
            1 => identification = Some(parse_identification(&section)?),
            2 => field.local_use = Some(parse_local_use(&section)),
            3 => field.grid = Some(parse_grid_definition(&section)?),
            4 => field.product = Some(parse_product_definition(&section)?),
            5 => field.representation = Some(parse_data_representation(&section)?),
            6 => {
                let bitmap = parse_bitmap(&section, field.defined_bitmap.as_ref())?;
                if bitmap.indicator == 0 {
                    field.defined_bitmap = Some(bitmap.clone());
                }
                field.bitmap = Some(bitmap);
            }
            7 => {
                field.spans[7] = Some(span);
                messages.push(assemble(
                    &field,
                    identification.as_ref(),
                    indicator,
                    parse_data_section(&section),
                    offset,
                    total,
                    messages.len(),
                )?);
            }
            other => return Err(Grib2Error::invalid_format(format!("unknown section number {}", other))),
        }

        field.spans[number as usize] = Some(span);
        previous = number;
        pos += length;
    }

    if messages.is_empty() {
        return Err(Grib2Error::invalid_format("record holds no data section"));
    }
    Ok(messages)
}

fn assemble(
    field: &FieldState,
    identification: Option<&Identification>,
    indicator: Indicator,
    data: DataSection,
    offset: usize,
    record_length: usize,
    field_index: usize,
) -> Result<Grib2Message> {
    let missing = |section: u8| Grib2Error::invalid_format(format!("field without section {}", section));
    Ok(Grib2Message {
        offset,
        record_length,
        field_index,
        indicator,
        identification: identification.cloned().ok_or_else(|| missing(1))?,
        local_use: field.local_use.clone(),
        grid_definition: field.grid.clone().ok_or_else(|| missing(3))?,
        product_definition: field.product.clone().ok_or_else(|| missing(4))?,
        data_representation: field.representation.clone().ok_or_else(|| missing(5))?,
        bitmap: field.bitmap.clone().ok_or_else(|| missing(6))?,
        data,
        sections: field.spans.iter().flatten().copied().collect(),
    })
}
