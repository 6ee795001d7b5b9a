//! Per-stream packet index with binary persistence
//!
//! A [`StreamIndex`] maps each elementary stream id to the ordered list of
//! its packet payload spans in the physical file. Logical offsets are a
//! running sum of payload lengths, so the per-stream sequence is strictly
//! increasing and gapless and binary search by logical offset is
//! well-defined.
//!
//! ## File format
//!
//! Big endian throughout, matching the original index files:
//!
//! ```text
//! u32  magic 0x11172101 (low byte = format version)
//! u32  stream count
//! per stream:
//!     u8   stream id
//!     u32  packet count
//!     packet count x { u64 physical start, u32 length }
//! ```
//!
//! Logical offsets are not persisted; they are recomputed on load by the
//! same running-sum rule, and the load path rejects files whose records are
//! out of append order.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::error::{Error, Result};
use crate::system::stream_id;

/// Magic number for persisted indices; the low byte is the format version
pub const INDEX_MAGIC: u32 = 0x1117_2101;

const SUPPORTED_VERSION: u8 = 0x01;

/// One packet payload span: where it lives physically and logically
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexElement {
    /// Byte offset of the payload in the physical (system) stream
    pub physical_start: u64,
    /// Byte offset of the payload in the demultiplexed logical stream
    pub logical_start: u64,
    /// Payload length in bytes
    pub len: u32,
}

impl IndexElement {
    /// Whether the element's logical range contains the given offset
    pub fn contains(&self, logical_offset: u64) -> bool {
        logical_offset >= self.logical_start
            && logical_offset < self.logical_start + u64::from(self.len)
    }

    /// Three-way comparison of this element's logical range against an offset
    fn locate(&self, logical_offset: u64) -> Ordering {
        if self.contains(logical_offset) {
            Ordering::Equal
        } else if logical_offset < self.logical_start {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    }
}

/// Index of packet payload spans, per elementary stream
#[derive(Debug, Clone, Default)]
pub struct StreamIndex {
    streams: BTreeMap<u8, Vec<IndexElement>>,
}

impl StreamIndex {
    /// Create an empty index
    pub fn new() -> Self {
        StreamIndex::default()
    }

    /// Build an index by scanning a complete system stream.
    ///
    /// Runs the index-only traversal; see [`crate::system::build_index`].
    pub fn build<R: Read>(src: R) -> Result<StreamIndex> {
        crate::system::build_index(src)
    }

    /// Append a packet span for a stream.
    ///
    /// The logical offset is derived from the previous element of the same
    /// stream (or 0 for the first).
    pub fn add_packet(&mut self, stream_id: u8, physical_start: u64, len: u32) {
        let elements = self.streams.entry(stream_id).or_default();
        let logical_start = match elements.last() {
            Some(last) => last.logical_start + u64::from(last.len),
            None => 0,
        };
        elements.push(IndexElement {
            physical_start,
            logical_start,
            len,
        });
    }

    /// Translate a logical offset to the physical byte offset.
    ///
    /// `Ok(None)` when the offset falls outside every recorded range (e.g.
    /// past the end of the stream); `Err(StreamNotFound)` when the stream id
    /// has no entry at all.
    pub fn get_physical_position(&self, stream_id: u8, logical_offset: u64) -> Result<Option<u64>> {
        let element = self.find(stream_id, logical_offset)?;
        Ok(element.map(|e| e.physical_start + (logical_offset - e.logical_start)))
    }

    /// Physical offset of the last payload byte of the packet covering the
    /// given logical offset. Bounds a read so it never silently crosses a
    /// packet boundary.
    pub fn get_last_physical_byte_of_packet(
        &self,
        stream_id: u8,
        logical_offset: u64,
    ) -> Result<Option<u64>> {
        let element = self.find(stream_id, logical_offset)?;
        Ok(element.map(|e| e.physical_start + u64::from(e.len) - 1))
    }

    fn find(&self, stream_id: u8, logical_offset: u64) -> Result<Option<&IndexElement>> {
        let elements = self
            .streams
            .get(&stream_id)
            .ok_or(Error::StreamNotFound(stream_id))?;
        match elements.binary_search_by(|e| e.locate(logical_offset)) {
            Ok(i) => Ok(Some(&elements[i])),
            Err(_) => Ok(None),
        }
    }

    /// All indexed stream ids, ascending
    pub fn streams(&self) -> Vec<u8> {
        self.streams.keys().copied().collect()
    }

    /// Indexed stream ids in the video range, ascending
    pub fn video_streams(&self) -> Vec<u8> {
        self.streams
            .keys()
            .copied()
            .filter(|&id| stream_id::is_video(id))
            .collect()
    }

    /// Number of packets indexed for a stream (0 if absent)
    pub fn packet_count(&self, stream_id: u8) -> usize {
        self.streams.get(&stream_id).map_or(0, Vec::len)
    }

    /// Total logical byte length of a stream (0 if absent)
    pub fn logical_len(&self, stream_id: u8) -> u64 {
        self.streams
            .get(&stream_id)
            .and_then(|e| e.last())
            .map_or(0, |last| last.logical_start + u64::from(last.len))
    }

    /// True when no packets have been indexed
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Elements of one stream, in logical order
    pub fn elements(&self, stream_id: u8) -> Result<&[IndexElement]> {
        self.streams
            .get(&stream_id)
            .map(Vec::as_slice)
            .ok_or(Error::StreamNotFound(stream_id))
    }

    /// Serialize the index
    pub fn write_to<W: Write>(&self, mut sink: W) -> Result<()> {
        sink.write_u32::<BigEndian>(INDEX_MAGIC)?;
        sink.write_u32::<BigEndian>(self.streams.len() as u32)?;
        for (&id, elements) in &self.streams {
            sink.write_u8(id)?;
            sink.write_u32::<BigEndian>(elements.len() as u32)?;
            for e in elements {
                sink.write_u64::<BigEndian>(e.physical_start)?;
                sink.write_u32::<BigEndian>(e.len)?;
            }
        }
        Ok(())
    }

    /// Deserialize an index written by [`write_to`](Self::write_to).
    ///
    /// Logical offsets are recomputed by the running-sum rule; since records
    /// are read back in append order this reproduces the original offsets
    /// byte for byte.
    pub fn read_from<R: Read>(mut src: R) -> Result<StreamIndex> {
        let magic = src.read_u32::<BigEndian>()?;
        if magic >> 8 != INDEX_MAGIC >> 8 {
            return Err(Error::InvalidIndexMagic(magic));
        }
        let version = (magic & 0xFF) as u8;
        if version != SUPPORTED_VERSION {
            return Err(Error::UnsupportedIndexVersion(version));
        }

        let mut index = StreamIndex::new();
        let num_streams = src.read_u32::<BigEndian>()?;
        for _ in 0..num_streams {
            let id = src.read_u8()?;
            if index.streams.contains_key(&id) {
                return Err(Error::corrupt_index(format!(
                    "duplicate stream id {id:#04x}"
                )));
            }
            let num_packets = src.read_u32::<BigEndian>()?;
            for _ in 0..num_packets {
                let physical_start = src.read_u64::<BigEndian>()?;
                let len = src.read_u32::<BigEndian>()?;
                if len == 0 {
                    return Err(Error::corrupt_index(format!(
                        "zero-length packet in stream {id:#04x}"
                    )));
                }
                index.add_packet(id, physical_start, len);
            }
        }

        // the running sum makes per-stream offsets gapless by construction;
        // verify it anyway so a mangled body cannot produce a silently
        // inconsistent index
        for (&id, elements) in &index.streams {
            let mut expected = 0u64;
            for e in elements {
                if e.logical_start != expected {
                    return Err(Error::corrupt_index(format!(
                        "non-contiguous logical offsets in stream {id:#04x}"
                    )));
                }
                expected += u64::from(e.len);
            }
        }

        debug!(streams = index.streams.len(), "index loaded");
        Ok(index)
    }
}
