//! Common test utilities for mpeg1-system integration tests
//!
//! Provides a builder that assembles syntactically valid (or deliberately
//! damaged) system streams bit by bit, so scenario tests can state their
//! input in terms of packs and packets instead of raw byte arrays.

use mpeg1_system::system::{
    ISO_11172_END_CODE, PACKET_START_CODE_PREFIX, PACK_START_CODE, SYSTEM_HEADER_START_CODE,
};
use mpeg1_system::BitWriter;

/// Byte length of a pack header (start code + SCR + mux rate fields)
pub const PACK_HEADER_LEN: u64 = 12;

/// Byte length of a packet header with no optional fields (prefix, id,
/// length, filler byte)
pub const MIN_PACKET_HEADER_LEN: u64 = 7;

/// Commonly used stream ids
pub mod streams {
    pub const VIDEO_0: u8 = 0xE0;
    pub const AUDIO_0: u8 = 0xC0;
    pub const PRIVATE_2: u8 = 0xBF;
}

/// Assembles a system stream for tests
pub struct SystemStreamBuilder {
    w: BitWriter<Vec<u8>>,
}

impl SystemStreamBuilder {
    pub fn new() -> Self {
        SystemStreamBuilder {
            w: BitWriter::new(Vec::new()),
        }
    }

    fn put_clock(&mut self, value: u64) {
        self.w.put_bits(((value >> 30) & 0x7) as u32, 3).unwrap();
        self.w.put_bits(1, 1).unwrap();
        self.w
            .put_bits(((value >> 15) & 0x7FFF) as u32, 15)
            .unwrap();
        self.w.put_bits(1, 1).unwrap();
        self.w.put_bits((value & 0x7FFF) as u32, 15).unwrap();
    }

    /// Open a pack with the given system clock reference and mux rate
    pub fn pack(&mut self, scr: u64, mux_rate: u32) -> &mut Self {
        self.w.put_bits(PACK_START_CODE, 32).unwrap();
        self.w.put_bits(0b0010, 4).unwrap();
        self.put_clock(scr);
        self.w.put_bits(1, 1).unwrap();
        self.w.put_bits(1, 1).unwrap();
        self.w.put_bits(mux_rate, 22).unwrap();
        self.w.put_bits(1, 1).unwrap();
        self
    }

    /// Like [`pack`](Self::pack) but with a wrong constant nibble after the
    /// start code; the clock and rate fields are otherwise intact
    pub fn pack_with_bad_nibble(&mut self, scr: u64, mux_rate: u32) -> &mut Self {
        self.w.put_bits(PACK_START_CODE, 32).unwrap();
        self.w.put_bits(0b0111, 4).unwrap();
        self.put_clock(scr);
        self.w.put_bits(1, 1).unwrap();
        self.w.put_bits(1, 1).unwrap();
        self.w.put_bits(mux_rate, 22).unwrap();
        self.w.put_bits(1, 1).unwrap();
        self
    }

    /// A system header declaring one stream bound
    pub fn system_header(&mut self, rate_bound: u32, stream_id: u8, size_bound: u32) -> &mut Self {
        self.w.put_bits(SYSTEM_HEADER_START_CODE, 32).unwrap();
        self.w.put_bits(9, 16).unwrap(); // 6 fixed bytes + 3 per bound
        self.w.put_bits(1, 1).unwrap();
        self.w.put_bits(rate_bound, 22).unwrap();
        self.w.put_bits(1, 1).unwrap();
        self.w.put_bits(1, 6).unwrap(); // audio_bound
        self.w.put_bits(0, 1).unwrap(); // fixed_flag
        self.w.put_bits(0, 1).unwrap(); // CSPS_flag
        self.w.put_bits(0, 1).unwrap();
        self.w.put_bits(0, 1).unwrap();
        self.w.put_bits(1, 1).unwrap();
        self.w.put_bits(1, 5).unwrap(); // video_bound
        self.w.put_bits(0xFF, 8).unwrap(); // reserved
        self.w.put_bits(u32::from(stream_id), 8).unwrap();
        self.w.put_bits(0b11, 2).unwrap();
        self.w.put_bits(1, 1).unwrap();
        self.w.put_bits(size_bound, 13).unwrap();
        self
    }

    /// A packet with no optional fields, just the filler byte and payload
    pub fn packet(&mut self, stream_id: u8, payload: &[u8]) -> &mut Self {
        self.packet_header(stream_id, payload.len() as u32 + 1);
        self.w.put_bits(0x0F, 8).unwrap();
        self.payload(payload)
    }

    /// A packet carrying stuffing bytes, an STD buffer field and a PTS
    pub fn packet_with_pts(
        &mut self,
        stream_id: u8,
        stuffing: u32,
        pts: u64,
        payload: &[u8],
    ) -> &mut Self {
        self.packet_header(stream_id, stuffing + 2 + 5 + payload.len() as u32);
        for _ in 0..stuffing {
            self.w.put_bits(0xFF, 8).unwrap();
        }
        self.w.put_bits(0b01, 2).unwrap();
        self.w.put_bits(0, 1).unwrap(); // STD_buffer_scale
        self.w.put_bits(32, 13).unwrap(); // STD_buffer_size
        self.w.put_bits(0b0010, 4).unwrap();
        self.put_clock(pts);
        self.w.put_bits(1, 1).unwrap();
        self.payload(payload)
    }

    /// A packet carrying both a PTS and a DTS
    pub fn packet_with_pts_dts(
        &mut self,
        stream_id: u8,
        pts: u64,
        dts: u64,
        payload: &[u8],
    ) -> &mut Self {
        self.packet_header(stream_id, 10 + payload.len() as u32);
        self.w.put_bits(0b0011, 4).unwrap();
        self.put_clock(pts);
        self.w.put_bits(1, 1).unwrap();
        self.w.put_bits(0b0001, 4).unwrap();
        self.put_clock(dts);
        self.w.put_bits(1, 1).unwrap();
        self.payload(payload)
    }

    /// A PRIVATE_STREAM_2 packet; the grammar gives it no optional fields,
    /// so the payload follows the length field directly
    pub fn private_stream_2_packet(&mut self, payload: &[u8]) -> &mut Self {
        self.packet_header(streams::PRIVATE_2, payload.len() as u32);
        self.payload(payload)
    }

    /// A packet whose declared length exceeds the payload actually written,
    /// simulating a recording cut off mid-packet (nothing may follow it)
    pub fn truncated_packet(&mut self, stream_id: u8, declared: u32, present: &[u8]) -> &mut Self {
        assert!(declared as usize > present.len());
        self.packet_header(stream_id, declared + 1);
        self.w.put_bits(0x0F, 8).unwrap();
        self.payload(present)
    }

    /// Raw 32 bits, for end codes and deliberate junk
    pub fn code(&mut self, code: u32) -> &mut Self {
        self.w.put_bits(code, 32).unwrap();
        self
    }

    /// Close the stream with the ISO 11172 end code and return the bytes
    pub fn finish(&mut self) -> Vec<u8> {
        self.code(ISO_11172_END_CODE);
        self.finish_without_end_code()
    }

    /// Return the bytes without appending an end code
    pub fn finish_without_end_code(&mut self) -> Vec<u8> {
        let w = std::mem::replace(&mut self.w, BitWriter::new(Vec::new()));
        w.finish().unwrap()
    }

    fn packet_header(&mut self, stream_id: u8, packet_length: u32) {
        self.w.put_bits(PACKET_START_CODE_PREFIX, 24).unwrap();
        self.w.put_bits(u32::from(stream_id), 8).unwrap();
        self.w.put_bits(packet_length, 16).unwrap();
    }

    fn payload(&mut self, payload: &[u8]) -> &mut Self {
        for &b in payload {
            self.w.put_bits(u32::from(b), 8).unwrap();
        }
        self
    }
}

/// Payload of `len` bytes where each byte encodes its own index, so reads
/// can be checked positionally
pub fn counting_payload(len: usize, offset: u8) -> Vec<u8> {
    (0..len).map(|i| offset.wrapping_add(i as u8)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_emits_expected_lengths() {
        let data = SystemStreamBuilder::new()
            .pack(0, 100)
            .packet(streams::VIDEO_0, &[1, 2, 3])
            .finish();
        // pack header + packet header + 3 payload + end code
        assert_eq!(
            data.len() as u64,
            PACK_HEADER_LEN + MIN_PACKET_HEADER_LEN + 3 + 4
        );
    }

    #[test]
    fn test_counting_payload() {
        assert_eq!(counting_payload(3, 250), vec![250, 251, 252]);
    }
}
