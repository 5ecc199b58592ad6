//! Simple packing (template 5.0) and its logarithmic variant (5.61).

use crate::error::{Grib2Error, Result};

use super::{read_packed_integers, Codec, CodecParameters, CodecSpecific};

/// Grid point data, simple packing.
pub struct SimpleCodec;

impl Codec for SimpleCodec {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn decode(&self, data: &[u8], params: &CodecParameters, count: usize) -> Result<Vec<f64>> {
        unpack_simple(data, params, count)
    }
}

/// Simple packing of `ln(Y + B)`; decodes to `exp(Y') - B`.
pub struct SimpleLogCodec;

impl Codec for SimpleLogCodec {
    fn name(&self) -> &'static str {
        "simple_log"
    }

    fn decode(&self, data: &[u8], params: &CodecParameters, count: usize) -> Result<Vec<f64>> {
        let preprocess = match params.specific {
            CodecSpecific::SimpleLog { preprocess } => preprocess as f64,
            _ => return Err(Grib2Error::unpacking("template 5.61 without pre-processing parameter")),
        };
        let values = unpack_simple(data, params, count)?;
        Ok(values.into_iter().map(|v| v.exp() - preprocess).collect())
    }
}

/// Unpack simple packed GRIB2 data.
///
/// Simple packing formula: value = (reference_value + (packed_value * 2^binary_scale)) * 10^(-decimal_scale)
pub fn unpack_simple(data: &[u8], params: &CodecParameters, count: usize) -> Result<Vec<f64>> {
    let scaling = params.scaling();
    if params.nbits == 0 {
        // All values are the reference value
        return Ok(vec![scaling.constant(); count]);
    }

    let packed = read_packed_integers(data, params.nbits as usize, count)?;
    Ok(packed.into_iter().map(|x| scaling.apply(x as f64)).collect())
}

/// Output of [`encode_simple`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimplePacked {
    pub reference_value: f32,
    pub binary_scale: i16,
    pub decimal_scale: i16,
    pub nbits: u8,
    /// Packed integers, MSB first, zero-padded to a whole byte
    pub data: Vec<u8>,
}

/// Largest `f32` not greater than `x`.
fn f32_at_or_below(x: f64) -> f32 {
    let r = x as f32;
    if (r as f64) <= x {
        r
    } else if r > 0.0 {
        f32::from_bits(r.to_bits() - 1)
    } else if r < 0.0 {
        f32::from_bits(r.to_bits() + 1)
    } else {
        -f32::from_bits(1)
    }
}

/// Simple-pack `values` at `nbits` bits after scaling by `10^decimal_scale`.
///
/// Decoding the result reproduces every value within `2^E * 10^-D`.
pub fn encode_simple(values: &[f64], decimal_scale: i16, nbits: u8) -> Result<SimplePacked> {
    if nbits > 32 {
        return Err(Grib2Error::unpacking(format!(
            "simple packing supports at most 32 bits, got {}",
            nbits
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Grib2Error::unpacking("cannot pack non-finite values"));
    }

    let decimal = 10f64.powi(decimal_scale as i32);
    let scaled: Vec<f64> = values.iter().map(|v| v * decimal).collect();
    let min = scaled.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if scaled.is_empty() {
        return Ok(SimplePacked {
            reference_value: 0.0,
            binary_scale: 0,
            decimal_scale,
            nbits,
            data: Vec::new(),
        });
    }

    let reference_value = f32_at_or_below(min);
    let range = max - reference_value as f64;

    if nbits == 0 {
        if range > 0.0 {
            return Err(Grib2Error::unpacking("zero-width packing requires a constant field"));
        }
        return Ok(SimplePacked {
            reference_value,
            binary_scale: 0,
            decimal_scale,
            nbits,
            data: Vec::new(),
        });
    }

    let max_packed = ((1u64 << nbits) - 1) as f64;
    let mut binary_scale: i16 = if range > 0.0 {
        (range / max_packed).log2().ceil() as i16
    } else {
        0
    };
    // Rounding in log2 can land one step off
    while range / 2f64.powi(binary_scale as i32) > max_packed {
        binary_scale += 1;
    }
    while binary_scale > i16::MIN + 1 && range / 2f64.powi(binary_scale as i32 - 1) <= max_packed && range > 0.0 {
        binary_scale -= 1;
    }

    let step = 2f64.powi(binary_scale as i32);
    let mut writer = PackWriter::with_capacity((scaled.len() * nbits as usize + 7) / 8);
    for v in &scaled {
        let x = ((v - reference_value as f64) / step).round().clamp(0.0, max_packed) as u64;
        writer.push(x, nbits as usize);
    }

    Ok(SimplePacked {
        reference_value,
        binary_scale,
        decimal_scale,
        nbits,
        data: writer.finish(),
    })
}

/// Minimal MSB-first bit sink for the encoder.
struct PackWriter {
    bytes: Vec<u8>,
    acc: u64,
    filled: usize,
}

impl PackWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            acc: 0,
            filled: 0,
        }
    }

    fn push(&mut self, value: u64, nbits: usize) {
        for bit in (0..nbits).rev() {
            self.acc = (self.acc << 1) | ((value >> bit) & 1);
            self.filled += 1;
            if self.filled == 8 {
                self.bytes.push(self.acc as u8);
                self.acc = 0;
                self.filled = 0;
            }
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.bytes.push((self.acc << (8 - self.filled)) as u8);
        }
        self.bytes
    }
}
