//! Full validating system-stream decoder
//!
//! Decodes packs one at a time, checking every start code, constant nibble
//! and marker bit against the grammar. Any mismatch aborts the parse with
//! [`Error::Malformed`] carrying the offending bit position. After the last
//! pack the stream must close with the ISO 11172 end code.

use std::io::Read;

use tracing::debug;

use super::grammar::{self, Decode, Pack};
use super::{ISO_11172_END_CODE, PACK_START_CODE};
use crate::bits::BitReader;
use crate::error::{Error, Result};

/// Pack-by-pack decoder over a physical byte source
pub struct SystemStreamDecoder<R: Read> {
    reader: BitReader<R>,
    finished: bool,
}

impl<R: Read> SystemStreamDecoder<R> {
    /// Create a decoder over a raw byte source
    pub fn new(src: R) -> Self {
        SystemStreamDecoder {
            reader: BitReader::new(src),
            finished: false,
        }
    }

    /// Decode the next pack, or `None` once the end code has been consumed.
    pub fn next_pack(&mut self) -> Result<Option<Pack>> {
        if self.finished {
            return Ok(None);
        }
        if self.reader.peek_bits(32)? == PACK_START_CODE {
            return grammar::pack::<Decode, R>(&mut self.reader).map(Some);
        }

        let pos = self.reader.position();
        let code = self.reader.get_bits(32)?;
        if code != ISO_11172_END_CODE {
            return Err(Error::malformed(
                "iso_11172_end_code",
                ISO_11172_END_CODE,
                code,
                pos,
            ));
        }
        self.finished = true;
        Ok(None)
    }

    /// Decode every pack through the end code
    pub fn decode_all(&mut self) -> Result<Vec<Pack>> {
        let mut packs = Vec::new();
        while let Some(pack) = self.next_pack()? {
            packs.push(pack);
        }
        debug!(packs = packs.len(), "system stream decoded");
        Ok(packs)
    }

    /// Total bits consumed so far
    pub fn position(&self) -> u64 {
        self.reader.position()
    }
}
