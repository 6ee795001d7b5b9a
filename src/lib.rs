//! mpeg1-system - MPEG-1 system stream demultiplexing in Rust
//!
//! Bit-level I/O plus a parser, indexer and random-access reader for
//! ISO/IEC 11172-1 system streams (the MPEG-1 multiplex of audio and video
//! elementary streams).
//!
//! # Architecture
//!
//! - `bits`: windowed MSB-first bit reader and writer over any byte source
//! - `system`: the pack/packet grammar, a full validating decoder, and a
//!   fast index-only scan
//! - `index`: per-stream packet index with logical-to-physical offset
//!   translation and binary persistence
//! - `stream`: [`std::io::Read`] + [`std::io::Seek`] view of one
//!   demultiplexed elementary stream
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::sync::Arc;
//! use mpeg1_system::{ElementaryStreamReader, StreamIndex};
//!
//! # fn main() -> mpeg1_system::Result<()> {
//! let index = Arc::new(StreamIndex::build(File::open("movie.mpg")?)?);
//! let video = *index.video_streams().first().expect("no video stream");
//! let mut reader = ElementaryStreamReader::new(File::open("movie.mpg")?, index, video)?;
//! # Ok(())
//! # }
//! ```

pub mod bits;
pub mod error;
pub mod index;
pub mod stream;
pub mod system;

pub use bits::{BitReader, BitWriter};
pub use error::{Error, Result};
pub use index::{IndexElement, StreamIndex, INDEX_MAGIC};
pub use stream::ElementaryStreamReader;
pub use system::{build_index, Pack, Packet, SystemHeader, SystemStreamDecoder};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
