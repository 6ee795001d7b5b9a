//! Random-access reader over one demultiplexed elementary stream
//!
//! [`ElementaryStreamReader`] presents a single audio or video stream from
//! a system stream file as a contiguous byte sequence. Every read
//! translates the logical position through the [`StreamIndex`] to the
//! physical offset of the covering packet payload and is bounded by that
//! packet's end, so a single `read` never silently crosses packet headers.
//!
//! It implements [`std::io::Read`] and [`std::io::Seek`], which lets a
//! downstream elementary-stream decoder consume it like a plain file.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::index::StreamIndex;

/// Reader over one elementary stream, backed by a seekable system stream
pub struct ElementaryStreamReader<R: Read + Seek> {
    src: R,
    index: Arc<StreamIndex>,
    stream_id: u8,
    /// Current offset in the demultiplexed logical stream
    logical_pos: u64,
}

impl<R: Read + Seek> ElementaryStreamReader<R> {
    /// Create a reader positioned at the start of `stream_id`.
    ///
    /// Fails with [`Error::StreamNotFound`] when the index has no packets
    /// for that stream.
    pub fn new(src: R, index: Arc<StreamIndex>, stream_id: u8) -> Result<Self> {
        // surfaces StreamNotFound up front instead of on the first read
        index.elements(stream_id)?;
        debug!(
            stream_id,
            packets = index.packet_count(stream_id),
            "elementary stream selected"
        );
        Ok(ElementaryStreamReader {
            src,
            index,
            stream_id,
            logical_pos: 0,
        })
    }

    /// Switch to another stream of the same file, rewinding to its start
    pub fn select_stream(&mut self, stream_id: u8) -> Result<()> {
        self.index.elements(stream_id)?;
        self.stream_id = stream_id;
        self.logical_pos = 0;
        Ok(())
    }

    /// Switch stream and logical position in one step
    pub fn seek_stream(&mut self, stream_id: u8, logical_offset: u64) -> Result<()> {
        self.index.elements(stream_id)?;
        self.stream_id = stream_id;
        self.logical_pos = logical_offset;
        Ok(())
    }

    /// Currently selected stream id
    pub fn stream_id(&self) -> u8 {
        self.stream_id
    }

    /// Current logical offset
    pub fn position(&self) -> u64 {
        self.logical_pos
    }

    /// Total logical length of the selected stream
    pub fn len(&self) -> u64 {
        self.index.logical_len(self.stream_id)
    }

    /// True when the selected stream has no payload bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The index backing this reader
    pub fn index(&self) -> &StreamIndex {
        &self.index
    }

    /// Read the byte at the current logical offset, or `None` at end of
    /// stream
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let Some(physical) = self
            .index
            .get_physical_position(self.stream_id, self.logical_pos)?
        else {
            return Ok(None);
        };
        self.src.seek(SeekFrom::Start(physical))?;
        let mut byte = [0u8; 1];
        self.src.read_exact(&mut byte)?;
        self.logical_pos += 1;
        Ok(Some(byte[0]))
    }
}

impl<R: Read + Seek> Read for ElementaryStreamReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let Some(physical) = self
            .index
            .get_physical_position(self.stream_id, self.logical_pos)
            .map_err(io::Error::from)?
        else {
            return Ok(0);
        };
        // same element the position lookup hit, so it is always present
        let last = self
            .index
            .get_last_physical_byte_of_packet(self.stream_id, self.logical_pos)
            .map_err(io::Error::from)?
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, Error::EndOfData))?;

        let in_packet = (last - physical + 1) as usize;
        let want = buf.len().min(in_packet);
        self.src.seek(SeekFrom::Start(physical))?;
        let got = self.src.read(&mut buf[..want])?;
        self.logical_pos += got as u64;
        Ok(got)
    }
}

impl<R: Read + Seek> Seek for ElementaryStreamReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.len() as i64;
        let target = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::Current(d) => self.logical_pos as i64 + d,
            SeekFrom::End(d) => len + d,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of stream",
            ));
        }
        self.logical_pos = target as u64;
        Ok(self.logical_pos)
    }
}
