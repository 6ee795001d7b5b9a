//! Buffered bit-level writer
//!
//! [`BitWriter`] mirrors [`BitReader`](super::BitReader): values are packed
//! MSB-first into an owned byte window, completed whole bytes are flushed to
//! the sink when the window fills, and the sub-byte remainder is carried
//! across the flush. `finish` pads the final partial byte with zero bits.

use std::io::Write;

use super::{DEFAULT_WINDOW_LEN, MASK};
use crate::error::{Error, Result};

/// Bit-level writer over a byte sink
pub struct BitWriter<W: Write> {
    sink: W,
    /// Owned byte window
    buf: Vec<u8>,
    /// Bit cursor within the window
    cur_bit: usize,
    /// Total bits produced since construction
    total_bits: u64,
}

impl<W: Write> BitWriter<W> {
    /// Create a writer with the default window size
    pub fn new(sink: W) -> Self {
        Self::with_capacity(sink, DEFAULT_WINDOW_LEN)
    }

    /// Create a writer with a custom window size (minimum 8 bytes)
    pub fn with_capacity(sink: W, capacity: usize) -> Self {
        BitWriter {
            sink,
            buf: vec![0u8; capacity.max(8)],
            cur_bit: 0,
            total_bits: 0,
        }
    }

    /// Total bits produced since construction
    pub fn position(&self) -> u64 {
        self.total_bits
    }

    /// Write the low `n` bits (1..=32) of `value`, MSB-first
    pub fn put_bits(&mut self, value: u32, n: u32) -> Result<()> {
        if n == 0 || n > 32 {
            return Err(Error::InvalidBitCount(n));
        }
        if self.cur_bit + n as usize > self.buf.len() << 3 {
            self.flush_window()?;
        }

        let mut remaining = n;
        let mut x = value & MASK[n as usize];
        while remaining > 0 {
            let byte = self.cur_bit >> 3;
            let room = (8 - (self.cur_bit & 7)) as u32;
            let take = room.min(remaining);
            let chunk = (x >> (remaining - take)) & MASK[take as usize];
            self.buf[byte] &= !((MASK[take as usize] as u8) << (room - take));
            self.buf[byte] |= (chunk as u8) << (room - take);
            x &= if remaining > take {
                MASK[(remaining - take) as usize]
            } else {
                0
            };
            self.cur_bit += take as usize;
            self.total_bits += u64::from(take);
            remaining -= take;
        }
        Ok(())
    }

    /// Write a signed value in `n` bits (two's complement truncation)
    pub fn put_signed_bits(&mut self, value: i32, n: u32) -> Result<()> {
        self.put_bits(value as u32, n)
    }

    /// Write an IEEE 754 single as its raw 32-bit pattern
    pub fn put_f32(&mut self, value: f32) -> Result<()> {
        self.put_bits(value.to_bits(), 32)
    }

    /// Write an IEEE 754 double as two 32-bit fields, high word first
    pub fn put_f64(&mut self, value: f64) -> Result<()> {
        let bits = value.to_bits();
        self.put_bits((bits >> 32) as u32, 32)?;
        self.put_bits(bits as u32, 32)
    }

    /// Write the low `n` bits of `value` in little-endian byte order
    pub fn put_bits_le(&mut self, value: u32, n: u32) -> Result<()> {
        if n == 0 || n > 32 {
            return Err(Error::InvalidBitCount(n));
        }
        let bytes = n / 8;
        let leftbits = n % 8;
        for i in 0..bytes {
            self.put_bits((value >> (8 * i)) & MASK[8], 8)?;
        }
        if leftbits > 0 {
            self.put_bits((value >> (8 * bytes)) & MASK[leftbits as usize], leftbits)?;
        }
        Ok(())
    }

    /// Write a signed value in `n` little-endian bits
    pub fn put_signed_bits_le(&mut self, value: i32, n: u32) -> Result<()> {
        self.put_bits_le(value as u32, n)
    }

    /// Write an IEEE 754 single in little-endian byte order
    pub fn put_f32_le(&mut self, value: f32) -> Result<()> {
        self.put_bits_le(value.to_bits(), 32)
    }

    /// Write an IEEE 754 double as two little-endian 32-bit fields, low word first
    pub fn put_f64_le(&mut self, value: f64) -> Result<()> {
        let bits = value.to_bits();
        self.put_bits_le(bits as u32, 32)?;
        self.put_bits_le((bits >> 32) as u32, 32)
    }

    /// Pad with zero bits to the next `n`-bit boundary of the stream position.
    ///
    /// `n` must be a positive multiple of 8. Returns the number of bits written.
    pub fn align(&mut self, n: u32) -> Result<u32> {
        if n == 0 || n % 8 != 0 {
            return Err(Error::InvalidAlignment(n));
        }
        let mut padded = 0u32;
        let rem = (self.total_bits % 8) as u32;
        if rem != 0 {
            self.put_bits(0, 8 - rem)?;
            padded += 8 - rem;
        }
        while self.total_bits % u64::from(n) != 0 {
            self.put_bits(0, 8)?;
            padded += 8;
        }
        Ok(padded)
    }

    /// Flush completed bytes, pad any final partial byte with zero bits, and
    /// return the sink
    pub fn finish(mut self) -> Result<W> {
        if self.cur_bit & 7 != 0 {
            let pad = 8 - (self.cur_bit & 7) as u32;
            self.put_bits(0, pad)?;
        }
        self.flush_window()?;
        self.sink.flush()?;
        Ok(self.sink)
    }

    /// Write completed whole bytes to the sink, keeping the partial trailing
    /// byte at the window front
    fn flush_window(&mut self) -> Result<()> {
        let whole = self.cur_bit >> 3;
        self.sink.write_all(&self.buf[..whole])?;
        self.cur_bit &= 7;
        if self.cur_bit != 0 {
            self.buf[0] = self.buf[whole];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitReader;
    use std::io::Cursor;

    fn written<F: FnOnce(&mut BitWriter<Vec<u8>>)>(f: F) -> Vec<u8> {
        let mut w = BitWriter::new(Vec::new());
        f(&mut w);
        w.finish().unwrap()
    }

    #[test]
    fn test_put_bits_packing() {
        let out = written(|w| {
            w.put_bits(0b1011, 4).unwrap();
            w.put_bits(0b0010_1101, 8).unwrap();
            w.put_bits(0b0101, 4).unwrap();
        });
        assert_eq!(out, vec![0b1011_0010, 0b1101_0101]);
    }

    #[test]
    fn test_round_trip_all_widths() {
        let mut w = BitWriter::new(Vec::new());
        for n in 1..=32u32 {
            let v = if n == 32 {
                0xDEAD_BEEF
            } else {
                (0xDEAD_BEEF_u32) & ((1 << n) - 1)
            };
            w.put_bits(v, n).unwrap();
        }
        let out = w.finish().unwrap();
        let mut r = BitReader::new(Cursor::new(out));
        for n in 1..=32u32 {
            let v = if n == 32 {
                0xDEAD_BEEF
            } else {
                (0xDEAD_BEEF_u32) & ((1 << n) - 1)
            };
            assert_eq!(r.get_bits(n).unwrap(), v, "width {}", n);
        }
    }

    #[test]
    fn test_signed_round_trip() {
        let out = written(|w| w.put_signed_bits(-5, 8).unwrap());
        let mut r = BitReader::new(Cursor::new(out.clone()));
        assert_eq!(r.get_signed_bits(8).unwrap(), -5);
        let mut r = BitReader::new(Cursor::new(out));
        assert_eq!(r.get_bits(8).unwrap(), 251);
    }

    #[test]
    fn test_partial_byte_survives_window_flush() {
        // A 8-byte window forces repeated flushes at a non-aligned cursor.
        let mut w = BitWriter::with_capacity(Vec::new(), 8);
        w.put_bits(0b101, 3).unwrap();
        for _ in 0..100 {
            w.put_bits(0xAB, 8).unwrap();
        }
        let out = w.finish().unwrap();
        let mut r = BitReader::new(Cursor::new(out));
        assert_eq!(r.get_bits(3).unwrap(), 0b101);
        for _ in 0..100 {
            assert_eq!(r.get_bits(8).unwrap(), 0xAB);
        }
    }

    #[test]
    fn test_little_endian_round_trip() {
        let out = written(|w| {
            w.put_bits_le(0x1234, 16).unwrap();
            w.put_bits_le(0x1234_5678, 32).unwrap();
        });
        let mut r = BitReader::new(Cursor::new(out));
        assert_eq!(r.get_bits_le(16).unwrap(), 0x1234);
        assert_eq!(r.get_bits_le(32).unwrap(), 0x1234_5678);
    }

    #[test]
    fn test_float_round_trip() {
        let out = written(|w| {
            w.put_f32(1.5).unwrap();
            w.put_f64(-2.25).unwrap();
            w.put_f32_le(3.75).unwrap();
            w.put_f64_le(0.125).unwrap();
        });
        let mut r = BitReader::new(Cursor::new(out));
        assert_eq!(r.get_f32().unwrap(), 1.5);
        assert_eq!(r.get_f64().unwrap(), -2.25);
        assert_eq!(r.get_f32_le().unwrap(), 3.75);
        assert_eq!(r.get_f64_le().unwrap(), 0.125);
    }

    #[test]
    fn test_align_pads_with_zeros() {
        let out = written(|w| {
            w.put_bits(0b111, 3).unwrap();
            assert_eq!(w.align(8).unwrap(), 5);
            assert_eq!(w.align(8).unwrap(), 0);
            w.put_bits(0xFF, 8).unwrap();
        });
        assert_eq!(out, vec![0b1110_0000, 0xFF]);
    }

    #[test]
    fn test_invalid_bit_count() {
        let mut w = BitWriter::new(Vec::new());
        assert!(matches!(w.put_bits(0, 0), Err(Error::InvalidBitCount(0))));
        assert!(matches!(w.put_bits(0, 33), Err(Error::InvalidBitCount(33))));
    }

    #[test]
    fn test_position() {
        let mut w = BitWriter::new(Vec::new());
        w.put_bits(0, 5).unwrap();
        w.put_bits(0, 27).unwrap();
        assert_eq!(w.position(), 32);
    }
}
