//! IEEE floating point data (template 5.4).

use crate::error::{Grib2Error, Result};

use super::{Codec, CodecParameters, CodecSpecific};

pub struct IeeeCodec;

impl Codec for IeeeCodec {
    fn name(&self) -> &'static str {
        "ieee"
    }

    fn decode(&self, data: &[u8], params: &CodecParameters, count: usize) -> Result<Vec<f64>> {
        let width = match params.specific {
            CodecSpecific::Ieee { precision: 1 } => 4,
            CodecSpecific::Ieee { precision: 2 } => 8,
            CodecSpecific::Ieee { precision } => {
                return Err(Grib2Error::unpacking(format!("IEEE precision code {}", precision)))
            }
            _ => return Err(Grib2Error::unpacking("IEEE codec without precision")),
        };

        if data.len() < count * width {
            return Err(Grib2Error::unpacking(format!(
                "{} IEEE values need {} bytes, data section holds {}",
                count,
                count * width,
                data.len()
            )));
        }

        let values = data[..count * width]
            .chunks_exact(width)
            .map(|chunk| match *chunk {
                [a, b, c, d] => f32::from_be_bytes([a, b, c, d]) as f64,
                [a, b, c, d, e, f, g, h] => f64::from_be_bytes([a, b, c, d, e, f, g, h]),
                _ => f64::NAN,
            })
            .collect();
        Ok(values)
    }
}
