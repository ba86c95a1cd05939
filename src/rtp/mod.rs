//! RTP transport layer
//!
//! This module provides:
//! - The RTP packet model
//! - Clock conversions between presentation timestamps and RTP timestamps
//! - H.264 (RFC 6184) and H.265 (RFC 7798) depacketizers and packetizers
//!
//! Depacketizers assemble whole access units. Waiting for more packets is
//! reported as [`DecodeOutcome::Incomplete`], not as an error.

mod assembler;
pub mod h264;
pub mod h265;
pub mod packet;
pub mod time;
mod writer;

use bytes::Bytes;

use crate::error::{DecodeError, EncodeError};

pub use packet::{Header, Packet, HEADER_SIZE};
pub use time::{duration_to_ticks, multiply_and_divide, TimestampEncoder};

/// Largest access unit a depacketizer accepts
pub const MAX_ACCESS_UNIT_SIZE: usize = 8 * 1024 * 1024;

/// Largest number of NAL units in one access unit
pub const MAX_NALUS_PER_ACCESS_UNIT: usize = 21600;

/// Why a depacketizer has no access unit to hand out yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incomplete {
    /// The access unit continues in later packets
    MorePacketsNeeded,
    /// A continuation fragment arrived before any starting packet,
    /// as happens when joining a stream mid-way
    NonStartingPacketAndNoPrevious,
}

/// Result of feeding one packet to a depacketizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// A complete access unit, one entry per NAL unit
    Complete(Vec<Bytes>),
    /// Nothing to hand out yet
    Incomplete(Incomplete),
}

/// Turns RTP packets into access units
pub trait Depacketizer {
    fn decode(&mut self, pkt: &Packet) -> Result<DecodeOutcome, DecodeError>;
}

/// Turns access units into RTP packets
///
/// Produced packets carry a zero timestamp: the caller stamps them.
pub trait Packetizer {
    fn encode(&mut self, au: &[Bytes]) -> Result<Vec<Packet>, EncodeError>;
}

/// Settings shared by every packetizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketizerConfig {
    /// RTP payload type
    pub payload_type: u8,
    /// Largest payload of a produced packet, RTP header excluded
    pub payload_max_size: usize,
    /// SSRC to use; random when unset
    pub ssrc: Option<u32>,
    /// Sequence number of the first packet; random when unset
    pub initial_sequence_number: Option<u16>,
}

impl PacketizerConfig {
    pub fn new(payload_type: u8, payload_max_size: usize) -> Self {
        Self {
            payload_type,
            payload_max_size,
            ssrc: None,
            initial_sequence_number: None,
        }
    }

    /// Continue an existing packet stream
    pub fn continuing(mut self, ssrc: u32, sequence_number: u16) -> Self {
        self.ssrc = Some(ssrc);
        self.initial_sequence_number = Some(sequence_number);
        self
    }
}
