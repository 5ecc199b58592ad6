//! CCSDS adaptive entropy coding (template 5.42).
//!
//! A pure Rust decoder for the CCSDS 121.0-B Rice coding used by GRIB2:
//! blocks of `J` samples, each coded as a zero run, a second extension, a
//! k-bit split or uncompressed, with an optional unit-delay predictor
//! reset every reference sample interval. The decoded integers are then
//! reconstructed with simple packing.

use bitflags::bitflags;
use tracing::trace;

use crate::bitstream::BitReader;
use crate::error::{Grib2Error, Result};

use super::{Codec, CodecParameters, CodecSpecific};

bitflags! {
    /// CCSDS flags as stored in template 5.42.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AecFlags: u8 {
        /// Samples are two's complement
        const DATA_SIGNED = 1 << 0;
        /// 17 to 24 bit samples are stored in 3 bytes
        const DATA_3BYTE = 1 << 1;
        /// Samples are stored MSB first
        const MSB = 1 << 2;
        /// Predictor and folding preprocessing applied
        const DATA_PREPROCESS = 1 << 3;
        /// Restricted option set for small bit depths
        const RESTRICTED = 1 << 4;
        /// Each reference sample interval is padded to an octet
        const PAD_RSI = 1 << 5;
    }
}

/// Zero blocks up to the end of a segment (remainder of sixty-four blocks).
const ROS: u64 = 5;

/// Largest fundamental sequence value in a second extension block.
const SE_MAX: u64 = 90;

/// Decoder parameters of one field.
#[derive(Debug, Clone, Copy)]
pub struct AecParams {
    pub bits_per_sample: u8,
    pub block_size: usize,
    /// Blocks per reference sample interval
    pub rsi: usize,
    pub flags: AecFlags,
}

impl AecParams {
    fn id_len(&self) -> usize {
        let n = self.bits_per_sample;
        if self.flags.contains(AecFlags::RESTRICTED) && n <= 4 {
            return if n <= 2 { 1 } else { 2 };
        }
        if n > 16 {
            5
        } else if n > 8 {
            4
        } else {
            3
        }
    }

    fn validate(&self) -> Result<()> {
        if self.bits_per_sample == 0 || self.bits_per_sample > 32 {
            return Err(Grib2Error::unpacking(format!(
                "AEC with {} bits per sample",
                self.bits_per_sample
            )));
        }
        if self.block_size == 0 || self.rsi == 0 {
            return Err(Grib2Error::unpacking(format!(
                "AEC block size {} and reference sample interval {}",
                self.block_size, self.rsi
            )));
        }
        Ok(())
    }
}

pub struct AecCodec;

impl Codec for AecCodec {
    fn name(&self) -> &'static str {
        "aec"
    }

    fn decode(&self, data: &[u8], params: &CodecParameters, count: usize) -> Result<Vec<f64>> {
        let scaling = params.scaling();
        if params.nbits == 0 {
            return Ok(vec![scaling.constant(); count]);
        }
        let aec = match params.specific {
            CodecSpecific::Aec {
                flags,
                block_size,
                reference_sample_interval,
            } => AecParams {
                bits_per_sample: params.nbits,
                block_size: block_size as usize,
                rsi: reference_sample_interval as usize,
                flags: AecFlags::from_bits_truncate(flags),
            },
            _ => return Err(Grib2Error::unpacking("AEC packing without CCSDS parameters")),
        };

        let samples = decode_samples(data, &aec, count)?;
        Ok(samples.into_iter().map(|x| scaling.apply(x as f64)).collect())
    }
}

/// Decode `count` samples from an AEC stream.
pub fn decode_samples(data: &[u8], params: &AecParams, count: usize) -> Result<Vec<i64>> {
    params.validate()?;
    let mut decoder = BlockDecoder {
        reader: BitReader::new(data),
        params: *params,
        id_len: params.id_len(),
        out: Vec::with_capacity(count + params.block_size * 64),
    };
    decoder.run(count).map_err(|e| match e {
        Grib2Error::OutOfBounds { .. } => Grib2Error::unpacking(format!("AEC stream ended early: {}", e)),
        other => other,
    })?;

    let mut raw = decoder.out;
    raw.truncate(count);
    Ok(postprocess(&raw, params))
}

struct BlockDecoder<'a> {
    reader: BitReader<'a>,
    params: AecParams,
    id_len: usize,
    /// Mapped residuals (or raw samples without preprocessing)
    out: Vec<u64>,
}

impl<'a> BlockDecoder<'a> {
    fn run(&mut self, count: usize) -> Result<()> {
        let block = self.params.block_size;
        let rsi_samples = self.params.rsi * block;
        let n = self.params.bits_per_sample as usize;
        let max_id = (1u64 << self.id_len) - 1;
        let preprocess = self.params.flags.contains(AecFlags::DATA_PREPROCESS);

        while self.out.len() < count {
            let rsi_start = self.out.len();
            while self.out.len() - rsi_start < rsi_samples && self.out.len() < count {
                let used = self.out.len() - rsi_start;
                let reference = preprocess && used == 0;
                let id = self.reader.read_bits(self.id_len)?;

                if id == 0 {
                    let second_extension = self.reader.read_bits(1)? == 1;
                    if reference {
                        let sample = self.reader.read_bits(n)?;
                        self.out.push(sample);
                    }
                    if second_extension {
                        self.second_extension(reference)?;
                    } else {
                        let blocks_done = used / block;
                        let zero_blocks = self.zero_run(blocks_done)?;
                        let zeros = zero_blocks * block - usize::from(reference);
                        self.out.extend(std::iter::repeat(0).take(zeros));
                    }
                } else if id == max_id {
                    for _ in 0..block {
                        let sample = self.reader.read_bits(n)?;
                        self.out.push(sample);
                    }
                } else {
                    self.split(id as usize - 1, reference)?;
                }
            }
            if self.params.flags.contains(AecFlags::PAD_RSI) {
                self.reader.align();
            }
        }
        trace!(samples = self.out.len(), "AEC stream decoded");
        Ok(())
    }

    /// Count zero bits up to the terminating one.
    fn fundamental_sequence(&mut self) -> Result<u64> {
        let mut zeros = 0;
        while self.reader.read_bits(1)? == 0 {
            zeros += 1;
        }
        Ok(zeros)
    }

    fn zero_run(&mut self, blocks_done: usize) -> Result<usize> {
        let mut zero_blocks = self.fundamental_sequence()? + 1;
        if zero_blocks == ROS {
            let to_rsi_end = self.params.rsi - blocks_done;
            let to_segment_end = 64 - blocks_done % 64;
            return Ok(to_rsi_end.min(to_segment_end));
        }
        if zero_blocks > ROS {
            zero_blocks -= 1;
        }
        Ok(zero_blocks as usize)
    }

    fn second_extension(&mut self, reference: bool) -> Result<()> {
        let block = self.params.block_size;
        let mut i = usize::from(reference);
        while i < block {
            let m = self.fundamental_sequence()?;
            if m > SE_MAX {
                return Err(Grib2Error::unpacking(format!("second extension value {} out of range", m)));
            }
            // Largest k with k(k+1)/2 <= m
            let mut k = 0u64;
            while (k + 1) * (k + 2) / 2 <= m {
                k += 1;
            }
            let d1 = m - k * (k + 1) / 2;
            if i % 2 == 0 {
                self.out.push(k - d1);
                i += 1;
            }
            self.out.push(d1);
            i += 1;
        }
        Ok(())
    }

    fn split(&mut self, k: usize, reference: bool) -> Result<()> {
        let n = self.params.bits_per_sample as usize;
        if reference {
            let sample = self.reader.read_bits(n)?;
            self.out.push(sample);
        }
        let start = self.out.len();
        let len = self.params.block_size - usize::from(reference);
        for _ in 0..len {
            let high = self.fundamental_sequence()?;
            self.out.push(high << k);
        }
        if k > 0 {
            for value in &mut self.out[start..start + len] {
                *value += self.reader.read_bits(k)?;
            }
        }
        Ok(())
    }
}

/// Undo preprocessing and apply the sample sign convention.
fn postprocess(raw: &[u64], params: &AecParams) -> Vec<i64> {
    let n = params.bits_per_sample as u32;
    let signed = params.flags.contains(AecFlags::DATA_SIGNED);
    let (xmin, xmax) = if signed {
        (-(1i64 << (n - 1)), (1i64 << (n - 1)) - 1)
    } else {
        (0, ((1u64 << n) - 1) as i64)
    };
    let to_signed = |v: u64| -> i64 {
        if signed && n < 64 && v & (1 << (n - 1)) != 0 {
            v as i64 - (1i64 << n)
        } else {
            v as i64
        }
    };

    if !params.flags.contains(AecFlags::DATA_PREPROCESS) {
        return raw.iter().map(|v| to_signed(*v)).collect();
    }

    let rsi_samples = params.rsi * params.block_size;
    let mut out = Vec::with_capacity(raw.len());
    let mut x = 0i64;
    for (i, &d) in raw.iter().enumerate() {
        if i % rsi_samples == 0 {
            x = to_signed(d);
        } else {
            let d = d as i64;
            let theta = (x - xmin).min(xmax - x);
            if d <= 2 * theta {
                if d % 2 == 0 {
                    x += d / 2;
                } else {
                    x -= (d + 1) / 2;
                }
            } else if x - xmin <= xmax - x {
                x = xmin + d;
            } else {
                x = xmax - d;
            }
        }
        out.push(x);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::BitWriter;

    fn params(block_size: usize, rsi: usize, flags: AecFlags) -> AecParams {
        AecParams {
            bits_per_sample: 8,
            block_size,
            rsi,
            flags,
        }
    }

    fn put_fs(w: &mut BitWriter, value: u64) {
        w.put(0, value as usize);
        w.put(1, 1);
    }

    #[test]
    fn test_block_options_without_preprocessing() {
        let mut w = BitWriter::new();
        // Uncompressed
        w.put(7, 3);
        for s in [10, 20, 30, 40, 50, 60, 70, 80] {
            w.put(s, 8);
        }
        // Split with k = 1
        let split = [5u64, 0, 1, 2, 3, 4, 9, 6];
        w.put(2, 3);
        for s in split {
            put_fs(&mut w, s >> 1);
        }
        for s in split {
            w.put(s & 1, 1);
        }
        // One zero block
        w.put(0, 3);
        w.put(0, 1);
        put_fs(&mut w, 0);
        // Second extension: pairs (0,0) (1,0) (0,1) (2,0)
        w.put(0, 3);
        w.put(1, 1);
        for m in [0, 1, 2, 3] {
            put_fs(&mut w, m);
        }

        let samples = decode_samples(&w.finish(), &params(8, 64, AecFlags::empty()), 32).unwrap();
        assert_eq!(&samples[0..8], &[10, 20, 30, 40, 50, 60, 70, 80]);
        assert_eq!(&samples[8..16], &[5, 0, 1, 2, 3, 4, 9, 6]);
        assert_eq!(&samples[16..24], &[0; 8]);
        assert_eq!(&samples[24..32], &[0, 0, 1, 0, 0, 1, 2, 0]);
    }

    #[test]
    fn test_preprocessing_with_reference_samples() {
        let flags = AecFlags::DATA_PREPROCESS;
        let mut w = BitWriter::new();
        // RSI 1: uncompressed, reference 100 then mapped residuals 2, 3, 0
        w.put(7, 3);
        for s in [100, 2, 3, 0] {
            w.put(s, 8);
        }
        // RSI 2: split k = 0 with reference 200, residuals 1, 0, 4
        w.put(1, 3);
        w.put(200, 8);
        for d in [1, 0, 4] {
            put_fs(&mut w, d);
        }

        let samples = decode_samples(&w.finish(), &params(4, 1, flags), 8).unwrap();
        assert_eq!(samples, vec![100, 101, 99, 99, 200, 199, 199, 201]);
    }

    #[test]
    fn test_zero_run_to_segment_end() {
        let mut w = BitWriter::new();
        w.put(0, 3);
        w.put(0, 1);
        // fs = 4 -> ROS, runs to the end of the 3-block interval
        put_fs(&mut w, 4);
        let samples = decode_samples(&w.finish(), &params(8, 3, AecFlags::empty()), 24).unwrap();
        assert_eq!(samples, vec![0; 24]);
    }

    #[test]
    fn test_flags_from_template() {
        let flags = AecFlags::from_bits_truncate(0x0e);
        assert!(flags.contains(AecFlags::DATA_PREPROCESS | AecFlags::MSB | AecFlags::DATA_3BYTE));
        assert!(!flags.contains(AecFlags::DATA_SIGNED));
    }

    #[test]
    fn test_truncated_stream() {
        let err = decode_samples(&[0xE0], &params(8, 64, AecFlags::empty()), 8).unwrap_err();
        assert!(matches!(err, Grib2Error::UnpackingError(_)));
    }

    #[test]
    fn test_codec_applies_scaling() {
        let mut w = BitWriter::new();
        w.put(7, 3);
        for s in [0, 1, 2, 3] {
            w.put(s, 8);
        }
        let p = CodecParameters {
            template: 42,
            reference_value: 10.0,
            binary_scale: 1,
            decimal_scale: 0,
            nbits: 8,
            original_type: 0,
            specific: CodecSpecific::Aec {
                flags: 0,
                block_size: 4,
                reference_sample_interval: 16,
            },
        };
        let values = AecCodec.decode(&w.finish(), &p, 4).unwrap();
        assert_eq!(values, vec![10.0, 12.0, 14.0, 16.0]);
    }
}
