//! Spherical harmonic coefficients: simple packing (template 5.50) and
//! complex packing (template 5.51).
//!
//! Coefficients are ordered with `m` outermost and `n` running from `m` to
//! the truncation `T`, each a (real, imaginary) pair. A triangular
//! truncation `T` therefore holds `(T + 1)(T + 2)` values.

use crate::bitstream::BitReader;
use crate::error::{Grib2Error, Result};

use super::{read_packed_integers, Codec, CodecParameters, CodecSpecific};

/// Truncation `T` for a triangular coefficient set of `count` values.
pub fn triangular_truncation(count: usize) -> Option<usize> {
    let t = (((1.0 + 4.0 * count as f64).sqrt() - 3.0) / 2.0).round();
    if t < 0.0 {
        return None;
    }
    let t = t as usize;
    ((t + 1) * (t + 2) == count).then_some(t)
}

pub struct SpectralSimpleCodec;

impl Codec for SpectralSimpleCodec {
    fn name(&self) -> &'static str {
        "spectral_simple"
    }

    fn decode(&self, data: &[u8], params: &CodecParameters, count: usize) -> Result<Vec<f64>> {
        let real_00 = match params.specific {
            CodecSpecific::SpectralSimple { real_00 } => real_00 as f64,
            _ => return Err(Grib2Error::unpacking("spectral simple packing without the (0,0) coefficient")),
        };
        if count == 0 {
            return Ok(Vec::new());
        }

        let scaling = params.scaling();
        let mut values = Vec::with_capacity(count);
        values.push(real_00);
        if params.nbits == 0 {
            values.extend(std::iter::repeat(scaling.constant()).take(count - 1));
        } else {
            let packed = read_packed_integers(data, params.nbits as usize, count - 1)?;
            values.extend(packed.into_iter().map(|x| scaling.apply(x as f64)));
        }
        Ok(values)
    }
}

pub struct SpectralComplexCodec;

impl Codec for SpectralComplexCodec {
    fn name(&self) -> &'static str {
        "spectral_complex"
    }

    fn decode(&self, data: &[u8], params: &CodecParameters, count: usize) -> Result<Vec<f64>> {
        let (laplacian_scaling, js, ks, ms, ts, precision) = match params.specific {
            CodecSpecific::SpectralComplex {
                laplacian_scaling,
                js,
                ks,
                ms,
                ts,
                unpacked_precision,
            } => (laplacian_scaling, js as usize, ks as usize, ms as usize, ts as usize, unpacked_precision),
            _ => return Err(Grib2Error::unpacking("spectral complex packing without subset parameters")),
        };

        let truncation = triangular_truncation(count).ok_or_else(|| {
            Grib2Error::unpacking(format!("{} coefficients is not a triangular truncation", count))
        })?;

        let in_subset = |n: usize, m: usize| n <= js && m <= ks.min(ms);
        let subset_size: usize = (0..=truncation)
            .map(|m| (m..=truncation).filter(|&n| in_subset(n, m)).count() * 2)
            .sum();
        if subset_size != ts {
            return Err(Grib2Error::unpacking(format!(
                "unpacked subset holds {} values, pentagonal truncation ({}, {}, {}) implies {}",
                ts, js, ks, ms, subset_size
            )));
        }

        let float_bytes = match precision {
            1 => 4,
            2 => 8,
            other => return Err(Grib2Error::unpacking(format!("IEEE precision code {}", other))),
        };
        let subset_bytes = ts * float_bytes;
        if data.len() < subset_bytes {
            return Err(Grib2Error::unpacking(format!(
                "unpacked subset needs {} bytes, data section holds {}",
                subset_bytes,
                data.len()
            )));
        }

        let mut subset = BitReader::new(&data[..subset_bytes]);
        let packed_count = count - ts;
        let packed = if params.nbits == 0 {
            vec![0u64; packed_count]
        } else {
            read_packed_integers(&data[subset_bytes..], params.nbits as usize, packed_count)?
        };
        let scaling = params.scaling();
        let exponent = -(laplacian_scaling as f64) * 1e-6;

        let mut values = Vec::with_capacity(count);
        let mut packed_iter = packed.into_iter();
        for m in 0..=truncation {
            for n in m..=truncation {
                if in_subset(n, m) {
                    for _ in 0..2 {
                        let v = if float_bytes == 4 {
                            subset.read_f32()? as f64
                        } else {
                            subset.read_f64()?
                        };
                        values.push(v);
                    }
                } else {
                    let factor = ((n * (n + 1)) as f64).powf(exponent);
                    for _ in 0..2 {
                        let x = packed_iter
                            .next()
                            .ok_or_else(|| Grib2Error::unpacking("packed coefficients exhausted"))?;
                        values.push(scaling.apply(x as f64) * factor);
                    }
                }
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangular_truncation() {
        assert_eq!(triangular_truncation(2), Some(0));
        assert_eq!(triangular_truncation(6), Some(1));
        assert_eq!(triangular_truncation(12), Some(2));
        assert_eq!(triangular_truncation(640 * 641), Some(639));
        assert_eq!(triangular_truncation(7), None);
    }

    #[test]
    fn test_spectral_simple() {
        let params = CodecParameters {
            template: 50,
            reference_value: 1.0,
            binary_scale: 0,
            decimal_scale: 0,
            nbits: 8,
            original_type: 0,
            specific: CodecSpecific::SpectralSimple { real_00: 287.5 },
        };
        let values = SpectralSimpleCodec.decode(&[0, 1, 2, 3, 4], &params, 6).unwrap();
        assert_eq!(values, vec![287.5, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_spectral_complex_subset_and_laplacian() {
        // T = 1: (m0 n0), (m0 n1), (m1 n1); subset n <= 0 holds two floats
        let mut data = Vec::new();
        data.extend_from_slice(&280.0f32.to_be_bytes());
        data.extend_from_slice(&0.0f32.to_be_bytes());
        data.extend_from_slice(&[4, 8, 2, 6]);
        let params = CodecParameters {
            template: 51,
            reference_value: 0.0,
            binary_scale: 0,
            decimal_scale: 0,
            nbits: 8,
            original_type: 0,
            specific: CodecSpecific::SpectralComplex {
                laplacian_scaling: 500_000,
                js: 0,
                ks: 0,
                ms: 0,
                ts: 2,
                unpacked_precision: 1,
            },
        };
        let values = SpectralComplexCodec.decode(&data, &params, 6).unwrap();
        // n = 1: factor (1 * 2)^-0.5
        let f = 2f64.powf(-0.5);
        assert_eq!(values[0], 280.0);
        assert_eq!(values[1], 0.0);
        assert!((values[2] - 4.0 * f).abs() < 1e-12);
        assert!((values[3] - 8.0 * f).abs() < 1e-12);
        assert!((values[4] - 2.0 * f).abs() < 1e-12);
        assert!((values[5] - 6.0 * f).abs() < 1e-12);
    }

    #[test]
    fn test_spectral_complex_rejects_bad_subset() {
        let params = CodecParameters {
            template: 51,
            reference_value: 0.0,
            binary_scale: 0,
            decimal_scale: 0,
            nbits: 8,
            original_type: 0,
            specific: CodecSpecific::SpectralComplex {
                laplacian_scaling: 0,
                js: 0,
                ks: 0,
                ms: 0,
                ts: 4,
                unpacked_precision: 1,
            },
        };
        assert!(SpectralComplexCodec.decode(&[0; 32], &params, 6).is_err());
    }
}
