//! Run length packing with level values (template 5.200), as produced by
//! JMA for radar and nowcast products.
//!
//! Each packed value below `MV + 1` is a level. Values above it extend the
//! run of the preceding level, in base `2^nbits - (MV + 1)` with the least
//! significant digit first.

use crate::error::{Grib2Error, Result};

use super::{Codec, CodecParameters, CodecSpecific};

pub struct RunLengthCodec;

impl Codec for RunLengthCodec {
    fn name(&self) -> &'static str {
        "run_length"
    }

    fn decode(&self, data: &[u8], params: &CodecParameters, count: usize) -> Result<Vec<f64>> {
        let (max_level, level_values) = match &params.specific {
            CodecSpecific::RunLength {
                max_level,
                level_values,
            } => (*max_level, level_values),
            _ => return Err(Grib2Error::unpacking("run length packing without level values")),
        };

        let levels = decode_levels(data, params.nbits, max_level, count)?;
        let decimal = 10f64.powi(-(params.decimal_scale as i32));

        levels
            .into_iter()
            .map(|level| match level {
                0 => Ok(f64::NAN),
                k => level_values
                    .get(k as usize - 1)
                    .map(|v| *v as f64 * decimal)
                    .ok_or_else(|| {
                        Grib2Error::unpacking(format!(
                            "level {} has no representative value ({} defined)",
                            k,
                            level_values.len()
                        ))
                    }),
            })
            .collect()
    }
}

/// Expand the run-length stream into one level per grid point.
pub(crate) fn decode_levels(data: &[u8], nbits: u8, max_level: u16, count: usize) -> Result<Vec<u16>> {
    if nbits == 0 || nbits > 16 {
        return Err(Grib2Error::unpacking(format!("run length packing with {} bits", nbits)));
    }
    let run_base = max_level as u64 + 1;
    let full_range = 1u64 << nbits;
    if run_base >= full_range {
        return Err(Grib2Error::unpacking(format!(
            "maximum level {} leaves no run length digits in {} bits",
            max_level, nbits
        )));
    }
    let radix = full_range - run_base;

    let values = super::read_packed_integers(data, nbits as usize, data.len() * 8 / nbits as usize)?;
    let mut levels: Vec<u16> = Vec::with_capacity(count);
    let mut previous: Option<u16> = None;
    let mut multiplier = 1u64;

    for value in values {
        if value < run_base {
            levels.push(value as u16);
            previous = Some(value as u16);
            multiplier = 1;
        } else {
            let level = previous.ok_or_else(|| Grib2Error::unpacking("run length before any level"))?;
            let run = (value - run_base)
                .checked_mul(multiplier)
                .ok_or_else(|| Grib2Error::unpacking("run length overflow"))?;
            if levels.len() as u64 + run > count as u64 {
                return Err(Grib2Error::unpacking(format!(
                    "run of {} overflows the {} grid points",
                    run, count
                )));
            }
            levels.extend(std::iter::repeat(level).take(run as usize));
            multiplier = multiplier.saturating_mul(radix);
        }
        if levels.len() > count {
            return Err(Grib2Error::unpacking(format!("more than {} levels decoded", count)));
        }
    }

    // Trailing padding bits may decode as an extra level of 0
    if levels.len() == count + 1 && levels.last() == Some(&0) {
        levels.pop();
    }
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_levels_with_runs() {
        let input: Vec<u8> = [3u8, 9, 12, 6, 4, 15, 2, 1, 0, 13, 12, 2, 3].iter().map(|v| v + 240).collect();
        let expected: Vec<u16> = [3u16, 9, 9, 6, 4, 4, 4, 4, 4, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 2, 3]
            .iter()
            .map(|v| v + 240)
            .collect();
        let levels = decode_levels(&input, 8, 250, expected.len()).unwrap();
        assert_eq!(levels, expected);
    }

    #[test]
    fn test_decode_long_run() {
        let levels = decode_levels(&[0x00, 0x14, 0x1c], 8, 3, 6065).unwrap();
        assert_eq!(levels, vec![0; 6065]);
    }

    #[test]
    fn test_level_values_and_missing() {
        // Levels 0, 1, 2, 2 with representative values 10 and 25 at D = 1
        let params = CodecParameters {
            template: 200,
            reference_value: 0.0,
            binary_scale: 0,
            decimal_scale: 1,
            nbits: 4,
            original_type: 1,
            specific: CodecSpecific::RunLength {
                max_level: 2,
                level_values: vec![10, 25],
            },
        };
        // 0, 1, 2, then run digit 3 + 1 = 4 -> one more 2
        let data = [0x01, 0x24];
        let values = RunLengthCodec.decode(&data, &params, 4).unwrap();
        assert!(values[0].is_nan());
        assert_eq!(values[1], 1.0);
        assert_eq!(values[2], 2.5);
        assert_eq!(values[3], 2.5);
    }

    #[test]
    fn test_run_without_level_fails() {
        assert!(decode_levels(&[0xF0], 4, 2, 10).is_err());
    }
}
