//! Complex packing (template 5.2) and complex packing with spatial
//! differencing (template 5.3).
//!
//! Section 7 layout: optional spatial-differencing extra descriptors, then
//! the group references, group widths and group lengths (each list padded
//! to a whole octet), then the packed group values back to back. Group bit
//! offsets are a running sum, so they are computed sequentially; each group
//! then unpacks independently on the rayon pool.

use rayon::prelude::*;

use crate::bitstream::BitReader;
use crate::error::{Grib2Error, Result};

use super::{Codec, CodecParameters, CodecSpecific, ComplexPacking};

pub struct ComplexCodec;

impl Codec for ComplexCodec {
    fn name(&self) -> &'static str {
        "complex"
    }

    fn decode(&self, data: &[u8], params: &CodecParameters, count: usize) -> Result<Vec<f64>> {
        let complex = match &params.specific {
            CodecSpecific::Complex(complex) => *complex,
            _ => return Err(Grib2Error::unpacking("complex packing without group descriptors")),
        };
        unpack_complex(data, params, &complex, count)
    }
}

/// One group's descriptors and where its values start.
#[derive(Debug, Clone, Copy)]
struct Group {
    reference: i64,
    width: usize,
    length: usize,
    bit_offset: usize,
}

/// Primary and secondary missing values both end up as `None`.
type Unpacked = Option<i64>;

fn unpacking_err(what: &str, err: Grib2Error) -> Grib2Error {
    Grib2Error::unpacking(format!("{}: {}", what, err))
}

/// Read `count` values of `nbits` each, then skip to the next octet.
fn read_list(reader: &mut BitReader<'_>, nbits: usize, count: usize) -> Result<Vec<u64>> {
    let values = (0..count)
        .map(|_| reader.read_bits_or_zero(nbits))
        .collect::<Result<Vec<_>>>()?;
    reader.align();
    Ok(values)
}

/// Sign-magnitude integer occupying `octets` bytes.
fn read_extra_descriptor(reader: &mut BitReader<'_>, octets: usize) -> Result<i64> {
    if octets == 0 {
        return Ok(0);
    }
    reader.read_signed_sm(octets * 8)
}

pub(crate) fn unpack_complex(
    data: &[u8],
    params: &CodecParameters,
    complex: &ComplexPacking,
    count: usize,
) -> Result<Vec<f64>> {
    if complex.missing_management > 2 {
        return Err(Grib2Error::unpacking(format!(
            "missing value management {} is not defined",
            complex.missing_management
        )));
    }
    if complex.spatial_order > 2 {
        return Err(Grib2Error::unpacking(format!(
            "spatial differencing of order {} is not defined",
            complex.spatial_order
        )));
    }

    let ngroups = complex.groups as usize;
    let nbits = params.nbits as usize;
    let scaling = params.scaling();
    if ngroups == 0 {
        if count == 0 {
            return Ok(Vec::new());
        }
        return Err(Grib2Error::unpacking("complex packing with zero groups"));
    }

    let mut reader = BitReader::new(data);

    // Spatial differencing descriptors: first value(s) and the overall minimum
    let octets = complex.extra_octets as usize;
    let mut first_values = Vec::new();
    let mut overall_min = 0i64;
    if complex.spatial_order > 0 {
        for _ in 0..complex.spatial_order {
            first_values.push(read_extra_descriptor(&mut reader, octets).map_err(|e| unpacking_err("extra descriptors", e))?);
        }
        overall_min = read_extra_descriptor(&mut reader, octets).map_err(|e| unpacking_err("extra descriptors", e))?;
    }

    let references = read_list(&mut reader, nbits, ngroups).map_err(|e| unpacking_err("group references", e))?;
    let widths = read_list(&mut reader, complex.group_width_bits as usize, ngroups)
        .map_err(|e| unpacking_err("group widths", e))?;
    let lengths = read_list(&mut reader, complex.group_length_bits as usize, ngroups)
        .map_err(|e| unpacking_err("group lengths", e))?;

    // Sequential pass: lengths and bit offsets
    let mut groups = Vec::with_capacity(ngroups);
    let mut bit_offset = reader.bit_position();
    let mut total = 0usize;
    for g in 0..ngroups {
        let width = complex.group_width_reference as usize + widths[g] as usize;
        let length = if g + 1 == ngroups {
            complex.last_group_length as usize
        } else {
            complex.group_length_reference as usize + lengths[g] as usize * complex.group_length_increment as usize
        };
        if width > 64 {
            return Err(Grib2Error::unpacking(format!("group {} is {} bits wide", g, width)));
        }
        groups.push(Group {
            reference: references[g] as i64,
            width,
            length,
            bit_offset,
        });
        bit_offset += width * length;
        total += length;
    }

    if total != count {
        return Err(Grib2Error::unpacking(format!(
            "group lengths sum to {}, expected {} values",
            total, count
        )));
    }
    if bit_offset > data.len() * 8 {
        return Err(Grib2Error::unpacking(format!(
            "group values need {} bits, data section holds {}",
            bit_offset,
            data.len() * 8
        )));
    }

    let missing_management = complex.missing_management;
    let group_values: Vec<Vec<Unpacked>> = groups
        .par_iter()
        .map(|group| unpack_group(data, group, nbits, missing_management))
        .collect::<Result<Vec<_>>>()?;

    let mut ints: Vec<Unpacked> = Vec::with_capacity(count);
    for values in group_values {
        ints.extend(values);
    }

    if complex.spatial_order > 0 {
        undo_spatial_differencing(&mut ints, &first_values, overall_min, complex.spatial_order);
    }

    Ok(ints
        .into_iter()
        .map(|v| match v {
            Some(x) => scaling.apply(x as f64),
            None => f64::NAN,
        })
        .collect())
}

fn unpack_group(data: &[u8], group: &Group, nbits: usize, missing_management: u8) -> Result<Vec<Unpacked>> {
    if group.width == 0 {
        // Constant group: only the reference is stored
        let primary = if nbits == 0 { None } else { Some(all_ones(nbits)) };
        let value = match primary {
            Some(p) if missing_management >= 1 && group.reference as u64 == p => None,
            Some(p) if missing_management == 2 && group.reference as u64 == p - 1 => None,
            _ => Some(group.reference),
        };
        return Ok(vec![value; group.length]);
    }

    let mut reader = BitReader::new(data);
    reader.skip_bits(group.bit_offset)?;
    let primary = all_ones(group.width);
    (0..group.length)
        .map(|_| {
            let x = reader.read_bits(group.width)?;
            Ok(match missing_management {
                1 if x == primary => None,
                2 if x == primary || x == primary - 1 => None,
                _ => Some(group.reference + x as i64),
            })
        })
        .collect()
}

fn all_ones(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Rebuild the original integers over the non-missing values.
fn undo_spatial_differencing(values: &mut [Unpacked], first_values: &[i64], overall_min: i64, order: u8) {
    let order = order as usize;
    let mut previous: Vec<i64> = Vec::with_capacity(2);
    let mut seen = 0usize;

    for slot in values.iter_mut() {
        let Some(v) = slot else { continue };
        let rebuilt = if seen < order {
            first_values[seen]
        } else if order == 1 {
            *v + overall_min + previous[0]
        } else {
            *v + overall_min + 2 * previous[1] - previous[0]
        };
        *v = rebuilt;
        if previous.len() == order {
            previous.remove(0);
        }
        previous.push(rebuilt);
        seen += 1;
    }
}
