//! Unified pack/packet grammar traversal
//!
//! The full validating decode and the fast index-only scan walk one and the
//! same grammar; they differ only in what happens at each field. That
//! difference is captured by the private [`Strategy`] trait: [`Decode`]
//! reads every fixed-value field and fails on mismatch, [`Skim`] advances
//! the cursor blindly. The two traversal modes therefore cannot drift apart
//! as the grammar evolves.
//!
//! Field layout follows ISO/IEC 11172-1 §2.4.3 exactly; every constant
//! nibble and marker bit the standard requires is accounted for in both
//! modes.

use std::io::Read;

use super::{
    stream_id, ISO_11172_END_CODE, PACKET_START_CODE_PREFIX, PACK_START_CODE,
    SYSTEM_HEADER_START_CODE,
};
use crate::bits::BitReader;
use crate::error::{Error, Result};

/// Per-field behavior of a grammar traversal
pub(crate) trait Strategy {
    /// Whether optional value fields are extracted into the record structs
    const MATERIALIZES: bool;
    /// Whether payload truncation at end of data is recoverable
    const RECOVERS_TRUNCATION: bool;

    /// Handle a fixed-value field of `n` bits
    fn fixed<R: Read>(
        r: &mut BitReader<R>,
        n: u32,
        expected: u32,
        element: &'static str,
    ) -> Result<()>;

    /// Handle a value field of `n` bits
    fn value<R: Read>(r: &mut BitReader<R>, n: u32) -> Result<u32>;
}

/// Full decode: validate fixed fields, materialize values
pub(crate) enum Decode {}

/// Index-only scan: advance past everything
pub(crate) enum Skim {}

impl Strategy for Decode {
    const MATERIALIZES: bool = true;
    const RECOVERS_TRUNCATION: bool = false;

    fn fixed<R: Read>(
        r: &mut BitReader<R>,
        n: u32,
        expected: u32,
        element: &'static str,
    ) -> Result<()> {
        let pos = r.position();
        let actual = r.get_bits(n)?;
        if actual != expected {
            return Err(Error::malformed(element, expected, actual, pos));
        }
        Ok(())
    }

    fn value<R: Read>(r: &mut BitReader<R>, n: u32) -> Result<u32> {
        r.get_bits(n)
    }
}

impl Strategy for Skim {
    const MATERIALIZES: bool = false;
    const RECOVERS_TRUNCATION: bool = true;

    fn fixed<R: Read>(
        r: &mut BitReader<R>,
        n: u32,
        _expected: u32,
        _element: &'static str,
    ) -> Result<()> {
        r.skip_bits(u64::from(n))
    }

    fn value<R: Read>(r: &mut BitReader<R>, n: u32) -> Result<u32> {
        r.skip_bits(u64::from(n))?;
        Ok(0)
    }
}

/// One pack: system clock reference, mux rate, optional system header, packets
#[derive(Debug, Clone)]
pub struct Pack {
    /// 33-bit system clock reference
    pub system_clock_reference: u64,
    /// Multiplex rate in units of 50 bytes/second
    pub mux_rate: u32,
    pub system_header: Option<SystemHeader>,
    pub packets: Vec<Packet>,
}

/// System header fields (bounds declared for the whole stream)
#[derive(Debug, Clone)]
pub struct SystemHeader {
    pub rate_bound: u32,
    pub audio_bound: u8,
    pub fixed_flag: bool,
    pub csps_flag: bool,
    pub audio_lock_flag: bool,
    pub video_lock_flag: bool,
    pub video_bound: u8,
    pub stream_bounds: Vec<StreamBound>,
}

/// Per-stream STD buffer bound from the system header
#[derive(Debug, Clone, Copy)]
pub struct StreamBound {
    pub stream_id: u8,
    pub buffer_bound_scale: bool,
    pub buffer_size_bound: u32,
}

/// One packet: stream identity, optional STD/timestamp fields, payload span
#[derive(Debug, Clone)]
pub struct Packet {
    pub stream_id: u8,
    /// Declared length of everything after the length field, in bytes
    pub packet_length: u16,
    pub std_buffer_scale: Option<bool>,
    pub std_buffer_size: Option<u32>,
    /// 33-bit presentation time stamp, if present
    pub pts: Option<u64>,
    /// 33-bit decoding time stamp, if present
    pub dts: Option<u64>,
    /// Byte offset of the payload in the physical stream
    pub payload_start: u64,
    /// Payload length in bytes (clamped when the file is truncated)
    pub payload_len: u32,
    /// True when end of data cut the payload short (index-only traversal)
    pub truncated: bool,
}

/// 33-bit clock value split 3 + 15 + 15 with two interleaved marker bits
pub(crate) fn clock_value<S: Strategy, R: Read>(r: &mut BitReader<R>) -> Result<u64> {
    let hi = u64::from(S::value(r, 3)?);
    S::fixed(r, 1, 1, "marker_bit")?;
    let mid = u64::from(S::value(r, 15)?);
    S::fixed(r, 1, 1, "marker_bit")?;
    let lo = u64::from(S::value(r, 15)?);
    Ok((hi << 30) | (mid << 15) | lo)
}

/// Peek at a structural boundary. `Ok(None)` means the source ended exactly
/// here and the strategy tolerates truncation.
fn boundary_peek<S: Strategy, R: Read>(r: &mut BitReader<R>, n: u32) -> Result<Option<u32>> {
    match r.peek_bits(n) {
        Ok(x) => Ok(Some(x)),
        Err(Error::EndOfData) if S::RECOVERS_TRUNCATION => Ok(None),
        Err(e) => Err(e),
    }
}

/// Traverse one pack and its packets
pub(crate) fn pack<S: Strategy, R: Read>(r: &mut BitReader<R>) -> Result<Pack> {
    S::fixed(r, 32, PACK_START_CODE, "pack_start_code")?;
    S::fixed(r, 4, 0b0010, "constant 0010")?;
    let system_clock_reference = clock_value::<S, R>(r)?;
    S::fixed(r, 1, 1, "marker_bit")?;
    S::fixed(r, 1, 1, "marker_bit")?;
    let mux_rate = S::value(r, 22)?;
    S::fixed(r, 1, 1, "marker_bit")?;

    let system_header = match boundary_peek::<S, R>(r, 32)? {
        Some(SYSTEM_HEADER_START_CODE) => Some(system_header::<S, R>(r)?),
        _ => None,
    };

    let mut packets = Vec::new();
    loop {
        let next32 = match boundary_peek::<S, R>(r, 32)? {
            Some(x) => x,
            None => break,
        };
        if next32 == PACK_START_CODE || next32 == ISO_11172_END_CODE {
            break;
        }
        if next32 >> 8 != PACKET_START_CODE_PREFIX {
            break;
        }
        let pkt = packet::<S, R>(r)?;
        let truncated = pkt.truncated;
        packets.push(pkt);
        if truncated {
            break;
        }
    }

    Ok(Pack {
        system_clock_reference,
        mux_rate,
        system_header,
        packets,
    })
}

/// Traverse one system header
pub(crate) fn system_header<S: Strategy, R: Read>(r: &mut BitReader<R>) -> Result<SystemHeader> {
    S::fixed(r, 32, SYSTEM_HEADER_START_CODE, "system_header_start_code")?;
    let _header_length = S::value(r, 16)?;
    S::fixed(r, 1, 1, "marker_bit")?;
    let rate_bound = S::value(r, 22)?;
    S::fixed(r, 1, 1, "marker_bit")?;
    let audio_bound = S::value(r, 6)? as u8;
    let fixed_flag = S::value(r, 1)? == 1;
    let csps_flag = S::value(r, 1)? == 1;
    let audio_lock_flag = S::value(r, 1)? == 1;
    let video_lock_flag = S::value(r, 1)? == 1;
    S::fixed(r, 1, 1, "marker_bit")?;
    let video_bound = S::value(r, 5)? as u8;
    // reserved byte, 0xFF today but may change in future revisions
    r.skip_bits(8)?;

    let mut stream_bounds = Vec::new();
    while r.peek_bits(1)? == 1 {
        let id = r.get_bits(8)? as u8;
        S::fixed(r, 2, 0b11, "constant 11")?;
        let scale = S::value(r, 1)?;
        let size = S::value(r, 13)?;
        if S::MATERIALIZES {
            stream_bounds.push(StreamBound {
                stream_id: id,
                buffer_bound_scale: scale == 1,
                buffer_size_bound: size,
            });
        }
    }

    Ok(SystemHeader {
        rate_bound,
        audio_bound,
        fixed_flag,
        csps_flag,
        audio_lock_flag,
        video_lock_flag,
        video_bound,
        stream_bounds,
    })
}

/// Traverse one packet, leaving the cursor past its payload
pub(crate) fn packet<S: Strategy, R: Read>(r: &mut BitReader<R>) -> Result<Packet> {
    S::fixed(r, 24, PACKET_START_CODE_PREFIX, "packet_start_code_prefix")?;
    // stream id and length route the packet; both modes materialize them
    let id = r.get_bits(8)? as u8;
    let length_pos = r.position();
    let packet_length = r.get_bits(16)? as u16;

    let mut bytes_consumed: u32 = 0;
    let mut std_buffer_scale = None;
    let mut std_buffer_size = None;
    let mut pts = None;
    let mut dts = None;

    if id != stream_id::PRIVATE_STREAM_2 {
        while r.peek_bits(8)? == 0xFF {
            S::fixed(r, 8, 0xFF, "stuffing_byte")?;
            bytes_consumed += 1;
        }

        if r.peek_bits(2)? == 0b01 {
            S::fixed(r, 2, 0b01, "constant 01")?;
            let scale = S::value(r, 1)?;
            let size = S::value(r, 13)?;
            if S::MATERIALIZES {
                std_buffer_scale = Some(scale == 1);
                std_buffer_size = Some(size);
            }
            bytes_consumed += 2;
        }

        match r.peek_bits(4)? {
            0b0010 => {
                S::fixed(r, 4, 0b0010, "constant 0010")?;
                let p = clock_value::<S, R>(r)?;
                S::fixed(r, 1, 1, "marker_bit")?;
                if S::MATERIALIZES {
                    pts = Some(p);
                }
                bytes_consumed += 5;
            }
            0b0011 => {
                S::fixed(r, 4, 0b0011, "constant 0011")?;
                let p = clock_value::<S, R>(r)?;
                S::fixed(r, 1, 1, "marker_bit")?;
                S::fixed(r, 4, 0b0001, "constant 0001")?;
                let d = clock_value::<S, R>(r)?;
                S::fixed(r, 1, 1, "marker_bit")?;
                if S::MATERIALIZES {
                    pts = Some(p);
                    dts = Some(d);
                }
                bytes_consumed += 10;
            }
            _ => {
                S::fixed(r, 8, 0b0000_1111, "constant 00001111")?;
                bytes_consumed += 1;
            }
        }
    }

    if u32::from(packet_length) < bytes_consumed {
        return Err(Error::malformed(
            "packet_length",
            bytes_consumed,
            u32::from(packet_length),
            length_pos,
        ));
    }
    let declared = u32::from(packet_length) - bytes_consumed;

    let payload_start = r.position() / 8;
    let mut payload_len = declared;
    let mut truncated = false;
    if declared > 0 {
        match r.skip_bits(8 * u64::from(declared)) {
            Ok(()) => {}
            Err(Error::EndOfData) if S::RECOVERS_TRUNCATION => {
                payload_len = (r.position() / 8 - payload_start) as u32;
                truncated = true;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(Packet {
        stream_id: id,
        packet_length,
        std_buffer_scale,
        std_buffer_size,
        pts,
        dts,
        payload_start,
        payload_len,
        truncated,
    })
}
