//! Buffered bit-level reader
//!
//! [`BitReader`] wraps any byte source and serves bit-granular reads and
//! peeks from an owned sliding window. Refilling shifts the unread tail of
//! the window to the front and rebases the bit cursor, so a field may span
//! window boundaries transparently. All multi-bit fields are extracted
//! MSB-first (big endian); the `*_le` variants reassemble byte-at-a-time
//! big-endian reads in reverse byte order.

use std::io::Read;

use super::{sign_extend, DEFAULT_WINDOW_LEN, MASK};
use crate::error::{Error, Result};

/// Bit-level reader over a byte source
pub struct BitReader<R: Read> {
    src: R,
    /// Owned byte window
    buf: Vec<u8>,
    /// Valid bytes in the window
    buf_len: usize,
    /// Bit cursor within the window (0 ..= buf_len * 8)
    cur_bit: usize,
    /// Total bits consumed since construction
    total_bits: u64,
    /// Set once the source returns no more bytes
    eof: bool,
}

impl<R: Read> BitReader<R> {
    /// Create a reader with the default window size
    pub fn new(src: R) -> Self {
        Self::with_capacity(src, DEFAULT_WINDOW_LEN)
    }

    /// Create a reader with a custom window size.
    ///
    /// The window must hold the largest field plus alignment slack: below 8
    /// bytes, 32-bit reads can fail with [`Error::NotEnoughData`].
    pub fn with_capacity(src: R, capacity: usize) -> Self {
        BitReader {
            src,
            buf: vec![0u8; capacity.max(1)],
            buf_len: 0,
            cur_bit: 0,
            total_bits: 0,
            eof: false,
        }
    }

    /// Total bits consumed since construction
    pub fn position(&self) -> u64 {
        self.total_bits
    }

    /// True once the underlying source is exhausted
    pub fn at_end(&self) -> bool {
        self.eof
    }

    /// Consume and return the next `n` bits (1..=32), MSB-first
    pub fn get_bits(&mut self, n: u32) -> Result<u32> {
        let x = self.peek_bits(n)?;
        self.advance(n);
        Ok(x)
    }

    /// Consume and return the next `n` bits as a sign-extended value
    pub fn get_signed_bits(&mut self, n: u32) -> Result<i32> {
        let x = self.get_bits(n)?;
        Ok(sign_extend(x, n))
    }

    /// Return the next `n` bits (1..=32) without advancing the cursor
    pub fn peek_bits(&mut self, n: u32) -> Result<u32> {
        check_bit_count(n)?;
        self.ensure(n as usize)?;
        Ok(self.extract(self.cur_bit, n))
    }

    /// Return the next `n` bits as a sign-extended value without advancing
    pub fn peek_signed_bits(&mut self, n: u32) -> Result<i32> {
        let x = self.peek_bits(n)?;
        Ok(sign_extend(x, n))
    }

    /// Consume 32 bits and reinterpret them as an IEEE 754 single
    pub fn get_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.get_bits(32)?))
    }

    /// Consume 64 bits (two 32-bit fields, high word first) as an IEEE 754 double
    pub fn get_f64(&mut self) -> Result<f64> {
        let hi = self.get_bits(32)? as u64;
        let lo = self.get_bits(32)? as u64;
        Ok(f64::from_bits((hi << 32) | lo))
    }

    /// Consume and return the next `n` bits in little-endian byte order
    pub fn get_bits_le(&mut self, n: u32) -> Result<u32> {
        let x = self.peek_bits_le(n)?;
        self.advance(n);
        Ok(x)
    }

    /// Consume and return the next `n` little-endian bits, sign-extended
    pub fn get_signed_bits_le(&mut self, n: u32) -> Result<i32> {
        let x = self.get_bits_le(n)?;
        Ok(sign_extend(x, n))
    }

    /// Return the next `n` bits in little-endian byte order without advancing
    pub fn peek_bits_le(&mut self, n: u32) -> Result<u32> {
        check_bit_count(n)?;
        self.ensure(n as usize)?;
        let bytes = (n / 8) as usize;
        let leftbits = n % 8;
        let mut x = 0u32;
        for i in 0..bytes {
            x |= self.extract(self.cur_bit + 8 * i, 8) << (8 * i as u32);
        }
        if leftbits > 0 {
            x |= self.extract(self.cur_bit + 8 * bytes, leftbits) << (8 * bytes as u32);
        }
        Ok(x)
    }

    /// Return the next `n` little-endian bits, sign-extended, without advancing
    pub fn peek_signed_bits_le(&mut self, n: u32) -> Result<i32> {
        let x = self.peek_bits_le(n)?;
        Ok(sign_extend(x, n))
    }

    /// Consume 32 little-endian bits as an IEEE 754 single
    pub fn get_f32_le(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.get_bits_le(32)?))
    }

    /// Consume 64 little-endian bits (low word first) as an IEEE 754 double
    pub fn get_f64_le(&mut self) -> Result<f64> {
        let lo = self.get_bits_le(32)? as u64;
        let hi = self.get_bits_le(32)? as u64;
        Ok(f64::from_bits((hi << 32) | lo))
    }

    /// Advance the cursor by `n` bits without extracting values.
    ///
    /// Bits consumed before an [`Error::EndOfData`] interruption are still
    /// counted in [`position`](Self::position), which is what lets the index
    /// traversal clamp a truncated final packet to the bytes actually
    /// available.
    pub fn skip_bits(&mut self, n: u64) -> Result<()> {
        let mut remaining = n;
        loop {
            let avail = ((self.buf_len << 3) - self.cur_bit) as u64;
            if remaining <= avail {
                self.cur_bit += remaining as usize;
                self.total_bits += remaining;
                return Ok(());
            }
            self.cur_bit = self.buf_len << 3;
            self.total_bits += avail;
            remaining -= avail;
            if self.eof {
                return Err(Error::EndOfData);
            }
            self.refill()?;
        }
    }

    /// Skip to the next `n`-bit boundary of the overall stream position.
    ///
    /// `n` must be a positive multiple of 8. Returns the number of bits
    /// skipped; on an already aligned cursor that is 0.
    pub fn align(&mut self, n: u32) -> Result<u32> {
        if n == 0 || n % 8 != 0 {
            return Err(Error::InvalidAlignment(n));
        }
        let mut skipped = 0u32;
        let rem = (self.total_bits % 8) as u32;
        if rem != 0 {
            self.skip_bits(u64::from(8 - rem))?;
            skipped += 8 - rem;
        }
        while self.total_bits % u64::from(n) != 0 {
            self.skip_bits(8)?;
            skipped += 8;
        }
        Ok(skipped)
    }

    /// Advance the cursor past bits already guaranteed in the window
    fn advance(&mut self, n: u32) {
        self.cur_bit += n as usize;
        self.total_bits += u64::from(n);
    }

    /// Make sure at least `n` bits are in the window, refilling once if not
    fn ensure(&mut self, n: usize) -> Result<()> {
        if self.cur_bit + n <= self.buf_len << 3 {
            return Ok(());
        }
        if !self.eof {
            self.refill()?;
        }
        let avail = (self.buf_len << 3) - self.cur_bit;
        if n <= avail {
            Ok(())
        } else if self.eof {
            Err(Error::EndOfData)
        } else {
            Err(Error::NotEnoughData {
                requested: n as u32,
                available: avail as u32,
            })
        }
    }

    /// Shift the unread tail to the window front and read fresh bytes
    fn refill(&mut self) -> Result<()> {
        let consumed = self.cur_bit >> 3;
        let tail = self.buf_len - consumed;
        self.buf.copy_within(consumed..self.buf_len, 0);
        self.cur_bit &= 7;

        let mut filled = tail;
        while filled < self.buf.len() {
            match self.src.read(&mut self.buf[filled..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(r) => filled += r,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        self.buf_len = filled;
        Ok(())
    }

    /// Extract `n` bits MSB-first starting at the given bit offset in the window
    fn extract(&self, at: usize, n: u32) -> u32 {
        let n = n as usize;
        let mut j = at >> 3;
        let room = 8 - (at & 7);

        if room >= n {
            return (u32::from(self.buf[j]) >> (room - n)) & MASK[n];
        }

        let end = (at + n - 1) >> 3;
        let leftover = (at + n) & 7;

        let mut x = u32::from(self.buf[j]) & MASK[room];
        j += 1;
        while j < end {
            x = (x << 8) | u32::from(self.buf[j]);
            j += 1;
        }
        if leftover > 0 {
            x = (x << leftover) | ((u32::from(self.buf[j]) >> (8 - leftover)) & MASK[leftover]);
        } else {
            x = (x << 8) | u32::from(self.buf[j]);
        }
        x
    }
}

fn check_bit_count(n: u32) -> Result<()> {
    if n == 0 || n > 32 {
        return Err(Error::InvalidBitCount(n));
    }
    Ok(())
}
