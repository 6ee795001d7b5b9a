//! Index-only system stream traversal
//!
//! Walks the pack/packet grammar in [`Skim`] mode, recording only the
//! payload span of every packet. Constant nibbles and marker bits are
//! skipped without validation, so a stream with cosmetic damage still
//! indexes; structural damage (a bad start code at the top level, or a
//! packet length shorter than its own header fields) still fails.
//!
//! A source that ends mid-pack is treated as a truncated recording: the
//! final packet's span is clamped to the bytes actually present and the
//! index built so far is returned.

use std::io::Read;

use tracing::{debug, warn};

use super::grammar::{self, Skim};
use super::{ISO_11172_END_CODE, PACK_START_CODE};
use crate::bits::BitReader;
use crate::error::{Error, Result};
use crate::index::StreamIndex;

/// Scan a complete system stream and build its packet index
pub fn build_index<R: Read>(src: R) -> Result<StreamIndex> {
    let mut reader = BitReader::new(src);
    let mut index = StreamIndex::new();
    let mut packs = 0usize;

    loop {
        match reader.peek_bits(32) {
            Ok(PACK_START_CODE) => {
                let pack = grammar::pack::<Skim, R>(&mut reader)?;
                packs += 1;
                let mut cut_short = false;
                for p in &pack.packets {
                    if p.payload_len > 0 {
                        index.add_packet(p.stream_id, p.payload_start, p.payload_len);
                    }
                    cut_short |= p.truncated;
                }
                if cut_short {
                    warn!(
                        packs,
                        position = reader.position() / 8,
                        "stream truncated mid-packet, index clamped"
                    );
                    return Ok(index);
                }
            }
            Ok(ISO_11172_END_CODE) => {
                reader.skip_bits(32)?;
                debug!(packs, streams = index.streams().len(), "stream indexed");
                return Ok(index);
            }
            Ok(other) => {
                return Err(Error::malformed(
                    "iso_11172_end_code",
                    ISO_11172_END_CODE,
                    other,
                    reader.position(),
                ));
            }
            Err(Error::EndOfData) => {
                warn!(
                    packs,
                    position = reader.position() / 8,
                    "stream truncated at pack boundary"
                );
                return Ok(index);
            }
            Err(e) => return Err(e),
        }
    }
}
