//! MSB-first bit writer for assembling packed payloads in tests.

/// Accumulates values of arbitrary bit width, most significant bit first.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    /// Bits used in the last byte (0 means the last byte is full)
    used: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the low `nbits` bits of `value` (0..=64).
    pub fn put(&mut self, value: u64, nbits: usize) -> &mut Self {
        for bit in (0..nbits).rev() {
            if self.used == 0 {
                self.bytes.push(0);
            }
            let set = bit < 64 && (value >> bit) & 1 == 1;
            if set {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 0x80 >> self.used;
            }
            self.used = (self.used + 1) % 8;
        }
        self
    }

    /// Append a GRIB sign-magnitude integer of `nbits` bits.
    pub fn put_signed(&mut self, value: i64, nbits: usize) -> &mut Self {
        let magnitude = value.unsigned_abs();
        let sign = if value < 0 { 1u64 << (nbits - 1) } else { 0 };
        self.put(sign | magnitude, nbits)
    }

    /// Append `count` zero bits followed by a one bit.
    pub fn put_unary(&mut self, count: usize) -> &mut Self {
        for _ in 0..count {
            self.put(0, 1);
        }
        self.put(1, 1)
    }

    /// Pad with zero bits to the next byte boundary.
    pub fn align(&mut self) -> &mut Self {
        self.used = 0;
        self
    }

    pub fn bit_len(&self) -> usize {
        if self.used == 0 {
            self.bytes.len() * 8
        } else {
            (self.bytes.len() - 1) * 8 + self.used
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_across_bytes() {
        let mut w = BitWriter::new();
        w.put(0b101, 3).put(0b0110001, 7).put(0b010011, 6);
        assert_eq!(w.bit_len(), 16);
        assert_eq!(w.finish(), vec![0b1010_1100, 0b0101_0011]);
    }

    #[test]
    fn test_align_and_signed() {
        let mut w = BitWriter::new();
        w.put(1, 1).align().put_signed(-5, 16);
        assert_eq!(w.finish(), vec![0x80, 0x80, 0x05]);
    }

    #[test]
    fn test_unary() {
        let mut w = BitWriter::new();
        w.put_unary(3).put_unary(0);
        assert_eq!(w.finish(), vec![0b0001_1000]);
    }
}
