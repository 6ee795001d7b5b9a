//! Error types for mpeg1-system

use thiserror::Error;

/// Result type alias for mpeg1-system operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mpeg1-system
#[derive(Error, Debug)]
pub enum Error {
    /// Failure from the underlying physical byte source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bit count outside [1, 32] passed to a bit-level read or write
    #[error("Invalid bit count: {0} (must be in 1..=32)")]
    InvalidBitCount(u32),

    /// Alignment that is not a multiple of 8 passed to `align`
    #[error("Invalid alignment: {0} (must be a multiple of 8)")]
    InvalidAlignment(u32),

    /// The window cannot hold enough bits to satisfy the request
    #[error("Not enough data: requested {requested} bits, {available} available")]
    NotEnoughData { requested: u32, available: u32 },

    /// The underlying source is exhausted
    #[error("End of data")]
    EndOfData,

    /// A fixed-value field in the system stream did not match the grammar
    #[error("Malformed bitstream: expected {element} = {expected:#x}, found {actual:#x} at bit {bit_position}")]
    Malformed {
        element: &'static str,
        expected: u32,
        actual: u32,
        bit_position: u64,
    },

    /// Lookup against a stream id absent from the index
    #[error("Stream not found: {0:#04x}")]
    StreamNotFound(u8),

    /// Persisted index file does not start with the expected magic number
    #[error("Invalid index magic number: {0:#010x}")]
    InvalidIndexMagic(u32),

    /// Persisted index format version is not supported
    #[error("Unsupported index version: {0}")]
    UnsupportedIndexVersion(u8),

    /// Persisted index body violates the index invariants
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(io) => io,
            Error::StreamNotFound(_) => {
                std::io::Error::new(std::io::ErrorKind::NotFound, e)
            }
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

impl Error {
    /// Create a malformed-bitstream error for a fixed-value field
    pub(crate) fn malformed(
        element: &'static str,
        expected: u32,
        actual: u32,
        bit_position: u64,
    ) -> Self {
        Error::Malformed {
            element,
            expected,
            actual,
            bit_position,
        }
    }

    /// Create a corrupt-index error
    pub(crate) fn corrupt_index<S: Into<String>>(msg: S) -> Self {
        Error::CorruptIndex(msg.into())
    }
}
