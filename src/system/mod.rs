//! MPEG-1 system stream (ISO/IEC 11172-1) structure
//!
//! A system stream interleaves elementary streams into packs of packets.
//! This module holds the grammar constants, the unified pack/packet
//! traversal, the full validating decoder, and the index-only traversal
//! that feeds a [`StreamIndex`](crate::index::StreamIndex).

pub mod decoder;
pub mod grammar;
pub mod indexer;

pub use decoder::SystemStreamDecoder;
pub use grammar::{Pack, Packet, StreamBound, SystemHeader};
pub use indexer::build_index;

/// 32-bit start code opening every pack
pub const PACK_START_CODE: u32 = 0x0000_01BA;

/// 32-bit start code opening an optional system header inside a pack
pub const SYSTEM_HEADER_START_CODE: u32 = 0x0000_01BB;

/// 32-bit code terminating the system stream
pub const ISO_11172_END_CODE: u32 = 0x0000_01B9;

/// 24-bit prefix opening every packet
pub const PACKET_START_CODE_PREFIX: u32 = 0x00_0001;

/// Stream ids from "Table 1 -- stream_id table" in ISO/IEC 11172-1 §2.4.4.2
pub mod stream_id {
    pub const ALL_AUDIO_STREAMS: u8 = 0xB8;
    pub const ALL_VIDEO_STREAMS: u8 = 0xB9;
    pub const RESERVED_STREAM: u8 = 0xBC;
    pub const PRIVATE_STREAM_1: u8 = 0xBD;
    pub const PADDING_STREAM: u8 = 0xBE;
    pub const PRIVATE_STREAM_2: u8 = 0xBF;

    pub const MIN_AUDIO_STREAM: u8 = 0xC0;
    pub const MAX_AUDIO_STREAM: u8 = 0xDF;
    pub const MIN_VIDEO_STREAM: u8 = 0xE0;
    pub const MAX_VIDEO_STREAM: u8 = 0xEF;
    pub const MIN_RESERVED_DATA_STREAM: u8 = 0xF0;

    /// True for the 32 audio stream ids
    pub fn is_audio(stream_id: u8) -> bool {
        (MIN_AUDIO_STREAM..=MAX_AUDIO_STREAM).contains(&stream_id)
    }

    /// True for the 16 video stream ids
    pub fn is_video(stream_id: u8) -> bool {
        (MIN_VIDEO_STREAM..=MAX_VIDEO_STREAM).contains(&stream_id)
    }

    /// True for the reserved data stream ids
    pub fn is_reserved_data(stream_id: u8) -> bool {
        stream_id >= MIN_RESERVED_DATA_STREAM
    }

    /// Human-readable name of a stream id
    pub fn describe(stream_id: u8) -> String {
        if is_audio(stream_id) {
            return format!("Audio Stream {}", stream_id - MIN_AUDIO_STREAM);
        }
        if is_video(stream_id) {
            return format!("Video Stream {}", stream_id - MIN_VIDEO_STREAM);
        }
        if is_reserved_data(stream_id) {
            return format!("Reserved Data Stream {}", stream_id - MIN_RESERVED_DATA_STREAM);
        }
        match stream_id {
            ALL_AUDIO_STREAMS => "All audio streams".to_string(),
            ALL_VIDEO_STREAMS => "All video streams".to_string(),
            RESERVED_STREAM => "Reserved Stream".to_string(),
            PRIVATE_STREAM_1 => "Private Stream 1".to_string(),
            PADDING_STREAM => "Padding Stream".to_string(),
            PRIVATE_STREAM_2 => "Private Stream 2".to_string(),
            _ => format!("Invalid Stream ID: {:#04X}", stream_id),
        }
    }
}
