//! Bit-granular stream I/O
//!
//! This module provides buffered, bit-addressable access to byte sources and
//! sinks. [`BitReader`] extracts 1..=32 bit fields (with optional sign
//! extension and lookahead peeks) from any [`std::io::Read`]; [`BitWriter`]
//! is the mirror image over [`std::io::Write`]. Both keep an owned byte
//! window and a bit cursor; the reader refills by shifting the unread tail to
//! the window front, the writer flushes completed bytes and carries the
//! partial trailing byte.

pub mod reader;
pub mod writer;

pub use reader::BitReader;
pub use writer::BitWriter;

/// Default window size in bytes
pub const DEFAULT_WINDOW_LEN: usize = 1024;

/// Value masks: `MASK[n]` keeps the low n bits
pub(crate) const MASK: [u32; 33] = {
    let mut m = [0u32; 33];
    let mut n = 1;
    while n <= 32 {
        m[n] = if n == 32 { u32::MAX } else { (1u32 << n) - 1 };
        n += 1;
    }
    m
};

/// Complement masks, used for sign extension: `CMASK[n]` keeps the high 32-n bits
pub(crate) const CMASK: [u32; 33] = {
    let mut m = [0u32; 33];
    let mut n = 0;
    while n <= 32 {
        m[n] = !MASK[n];
        n += 1;
    }
    m
};

/// Sign masks: `SMASK[n]` selects the sign bit of an n-bit field
pub(crate) const SMASK: [u32; 33] = {
    let mut m = [0u32; 33];
    let mut n = 1;
    while n <= 32 {
        m[n] = 1u32 << (n - 1);
        n += 1;
    }
    m
};

/// Sign-extend an n-bit value to i32
pub(crate) fn sign_extend(value: u32, n: u32) -> i32 {
    if n > 1 && (value & SMASK[n as usize]) != 0 {
        (value | CMASK[n as usize]) as i32
    } else {
        value as i32
    }
}
