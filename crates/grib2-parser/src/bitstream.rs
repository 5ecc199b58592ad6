//! Bit-level reader over a byte buffer.
//!
//! GRIB2 packs values MSB-first at arbitrary bit widths. [`BitReader`]
//! reads them sequentially and supports absolute repositioning, so the same
//! reader can walk several sections of one buffer.

use crate::error::{Grib2Error, Result};

/// Sequential, seekable MSB-first bit reader.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Cursor position in bits from the start of `data`
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Total buffer length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Byte containing the cursor (rounded down).
    pub fn byte_position(&self) -> usize {
        self.bit_pos / 8
    }

    pub fn remaining_bits(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_pos)
    }

    pub fn is_aligned(&self) -> bool {
        self.bit_pos % 8 == 0
    }

    /// Advance the cursor to the next byte boundary.
    pub fn align(&mut self) {
        self.bit_pos = (self.bit_pos + 7) / 8 * 8;
    }

    /// Reposition to an absolute byte offset.
    pub fn seek(&mut self, byte_position: usize) -> Result<()> {
        if byte_position > self.data.len() {
            return Err(self.out_of_bounds(byte_position.saturating_sub(self.data.len()) * 8));
        }
        self.bit_pos = byte_position * 8;
        Ok(())
    }

    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.bit_pos += n;
        Ok(())
    }

    fn out_of_bounds(&self, requested: usize) -> Grib2Error {
        Grib2Error::OutOfBounds {
            offset: self.bit_pos,
            requested,
            available: self.remaining_bits(),
        }
    }

    fn ensure(&self, bits: usize) -> Result<()> {
        if bits > self.remaining_bits() {
            Err(self.out_of_bounds(bits))
        } else {
            Ok(())
        }
    }

    /// Read the next `n` bits (1..=64) as an unsigned integer.
    pub fn read_bits(&mut self, n: usize) -> Result<u64> {
        if n == 0 || n > 64 {
            return Err(Grib2Error::invalid_format(format!(
                "bit width must be between 1 and 64, got {}",
                n
            )));
        }
        self.ensure(n)?;

        let mut result: u64 = 0;
        let mut remaining = n;

        while remaining > 0 {
            let byte = self.data[self.bit_pos / 8];
            let bit_offset = self.bit_pos % 8;
            let available = 8 - bit_offset;
            let take = available.min(remaining);

            let shift = available - take;
            let mask = ((1u16 << take) - 1) as u8;
            let bits = (byte >> shift) & mask;

            result = (result << take) | bits as u64;
            remaining -= take;
            self.bit_pos += take;
        }

        Ok(result)
    }

    /// Read `n` bits where `n` may be zero (yielding 0).
    pub fn read_bits_or_zero(&mut self, n: usize) -> Result<u64> {
        if n == 0 {
            Ok(0)
        } else {
            self.read_bits(n)
        }
    }

    /// Read `n` bytes; the cursor must sit on a byte boundary.
    pub fn read_bytes_aligned(&mut self, n: usize) -> Result<&'a [u8]> {
        if !self.is_aligned() {
            return Err(Grib2Error::invalid_format(format!(
                "aligned read at unaligned bit offset {}",
                self.bit_pos
            )));
        }
        self.ensure(n * 8)?;
        let start = self.bit_pos / 8;
        self.bit_pos += n * 8;
        Ok(&self.data[start..start + n])
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_bits(16)? as u16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_bits(32)? as u32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_bits(64)
    }

    /// GRIB2 sign-magnitude 8-bit integer.
    pub fn read_i8_sm(&mut self) -> Result<i8> {
        let raw = self.read_u8()?;
        let magnitude = (raw & 0x7F) as i8;
        Ok(if raw & 0x80 != 0 { -magnitude } else { magnitude })
    }

    /// GRIB2 sign-magnitude 16-bit integer.
    pub fn read_i16_sm(&mut self) -> Result<i16> {
        let raw = self.read_u16()?;
        let magnitude = (raw & 0x7FFF) as i16;
        Ok(if raw & 0x8000 != 0 { -magnitude } else { magnitude })
    }

    /// GRIB2 sign-magnitude 32-bit integer.
    pub fn read_i32_sm(&mut self) -> Result<i32> {
        let raw = self.read_u32()?;
        let magnitude = (raw & 0x7FFF_FFFF) as i32;
        Ok(if raw & 0x8000_0000 != 0 { -magnitude } else { magnitude })
    }

    /// Sign-magnitude integer of `n` bits (2..=64).
    pub fn read_signed_sm(&mut self, n: usize) -> Result<i64> {
        let raw = self.read_bits(n)?;
        let sign_bit = 1u64 << (n - 1);
        let magnitude = (raw & (sign_bit - 1)) as i64;
        Ok(if raw & sign_bit != 0 { -magnitude } else { magnitude })
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }
}

/// Decode a GRIB2 sign-magnitude integer stored in 1, 2 or 4 bytes.
///
/// GRIB2 does not use two's complement: the most significant bit is the
/// sign and the rest is the magnitude. Any other slice length returns 0.
pub fn decode_grib2_signed(bytes: &[u8]) -> i32 {
    match bytes.len() {
        1 => {
            let magnitude = (bytes[0] & 0x7F) as i32;
            if bytes[0] & 0x80 != 0 {
                -magnitude
            } else {
                magnitude
            }
        }
        2 => {
            let raw = u16::from_be_bytes([bytes[0], bytes[1]]);
            let magnitude = (raw & 0x7FFF) as i32;
            if raw & 0x8000 != 0 {
                -magnitude
            } else {
                magnitude
            }
        }
        4 => {
            let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            let magnitude = (raw & 0x7FFF_FFFF) as i32;
            if raw & 0x8000_0000 != 0 {
                -magnitude
            } else {
                magnitude
            }
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_across_bytes() {
        let data = [0b1010_1100, 0b0101_0011];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(7).unwrap(), 0b01100_01);
        assert_eq!(reader.read_bits(6).unwrap(), 0b01_0011);
        assert_eq!(reader.remaining_bits(), 0);
    }

    #[test]
    fn test_read_64_bits() {
        let data = [0xFF; 9];
        let mut reader = BitReader::new(&data);
        reader.skip_bits(4).unwrap();
        assert_eq!(reader.read_bits(64).unwrap(), u64::MAX);
    }

    #[test]
    fn test_invalid_widths() {
        let data = [0u8; 16];
        let mut reader = BitReader::new(&data);
        assert!(matches!(reader.read_bits(0), Err(Grib2Error::InvalidFormat(_))));
        assert!(matches!(reader.read_bits(65), Err(Grib2Error::InvalidFormat(_))));
    }

    #[test]
    fn test_out_of_bounds() {
        let data = [0u8; 2];
        let mut reader = BitReader::new(&data);
        reader.read_bits(12).unwrap();
        let err = reader.read_bits(5).unwrap_err();
        assert_eq!(
            err,
            Grib2Error::OutOfBounds {
                offset: 12,
                requested: 5,
                available: 4
            }
        );
        // Failed reads do not move the cursor
        assert_eq!(reader.bit_position(), 12);
        assert!(reader.seek(3).is_err());
    }

    #[test]
    fn test_aligned_reads_require_alignment() {
        let data = [1, 2, 3, 4];
        let mut reader = BitReader::new(&data);
        reader.read_bits(4).unwrap();
        assert!(matches!(reader.read_bytes_aligned(1), Err(Grib2Error::InvalidFormat(_))));
        reader.align();
        assert_eq!(reader.read_bytes_aligned(2).unwrap(), &[2, 3]);
        reader.seek(0).unwrap();
        assert_eq!(reader.read_bytes_aligned(1).unwrap(), &[1]);
    }

    #[test]
    fn test_sign_magnitude_reads() {
        let data = [0x80, 0x05, 0x00, 0x05, 0x80, 0x00, 0x00, 0x0A, 0x85];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_i16_sm().unwrap(), -5);
        assert_eq!(reader.read_i16_sm().unwrap(), 5);
        assert_eq!(reader.read_i32_sm().unwrap(), -10);
        assert_eq!(reader.read_i8_sm().unwrap(), -5);
    }

    #[test]
    fn test_ieee_float() {
        let bytes = 288.15f32.to_be_bytes();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_f32().unwrap(), 288.15);
    }

    #[test]
    fn test_decode_grib2_signed() {
        assert_eq!(decode_grib2_signed(&[0x81]), -1);
        assert_eq!(decode_grib2_signed(&[0x00, 0x10]), 16);
        assert_eq!(decode_grib2_signed(&[0x80, 0x10]), -16);
        assert_eq!(decode_grib2_signed(&[0x80, 0x0F, 0x42, 0x40]), -1_000_000);
        assert_eq!(decode_grib2_signed(&[1, 2, 3]), 0);
    }
}
