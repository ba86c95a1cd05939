//! H.264/AVC NAL units
//!
//! NAL unit header:
//! ```text
//! +---------------+
//! |0|1|2|3|4|5|6|7|
//! +-+-+-+-+-+-+-+-+
//! |F|NRI|  Type   |
//! +---------------+
//! ```
//!
//! Types 1-23 are regular NAL units. RFC 6184 reuses 24-29 for RTP
//! aggregation (STAP/MTAP) and fragmentation (FU-A/FU-B) packets.

use crate::error::FormatError;
use crate::format::{H264Format, ParamKind, TrackFormat};
use crate::rtp::h264::{Decoder, Encoder};
use crate::rtp::PacketizerConfig;

use super::{CodecKind, NalKind, VideoCodec};

/// NAL unit type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaluType {
    /// Non-IDR slice
    Slice = 1,
    /// Slice data partition A
    SlicePartA = 2,
    /// Slice data partition B
    SlicePartB = 3,
    /// Slice data partition C
    SlicePartC = 4,
    /// IDR slice (keyframe)
    Idr = 5,
    /// Supplemental enhancement information
    Sei = 6,
    /// Sequence parameter set
    Sps = 7,
    /// Picture parameter set
    Pps = 8,
    /// Access unit delimiter
    Aud = 9,
    /// End of sequence
    EndSeq = 10,
    /// End of stream
    EndStream = 11,
    /// Filler data
    Filler = 12,
    /// Single-time aggregation packet
    StapA = 24,
    /// Single-time aggregation packet with decoding order number
    StapB = 25,
    /// Multi-time aggregation packet, 16 bit offsets
    Mtap16 = 26,
    /// Multi-time aggregation packet, 24 bit offsets
    Mtap24 = 27,
    /// Fragmentation unit
    FuA = 28,
    /// Fragmentation unit with decoding order number
    FuB = 29,
}

impl NaluType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b & 0x1F {
            1 => Some(NaluType::Slice),
            2 => Some(NaluType::SlicePartA),
            3 => Some(NaluType::SlicePartB),
            4 => Some(NaluType::SlicePartC),
            5 => Some(NaluType::Idr),
            6 => Some(NaluType::Sei),
            7 => Some(NaluType::Sps),
            8 => Some(NaluType::Pps),
            9 => Some(NaluType::Aud),
            10 => Some(NaluType::EndSeq),
            11 => Some(NaluType::EndStream),
            12 => Some(NaluType::Filler),
            24 => Some(NaluType::StapA),
            25 => Some(NaluType::StapB),
            26 => Some(NaluType::Mtap16),
            27 => Some(NaluType::Mtap24),
            28 => Some(NaluType::FuA),
            29 => Some(NaluType::FuB),
            _ => None,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, NaluType::Idr)
    }
}

/// H.264 capability set
#[derive(Debug, Clone, Copy, Default)]
pub struct H264;

impl VideoCodec for H264 {
    const KIND: CodecKind = CodecKind::H264;
    const HEADER_LEN: usize = 1;
    const PARAM_KINDS: &'static [ParamKind] = &[ParamKind::Sps, ParamKind::Pps];
    const STATEFUL_CLOCK: bool = false;

    type Format = H264Format;
    type Encoder = Encoder;
    type Decoder = Decoder;

    fn classify(nalu: &[u8]) -> NalKind {
        let Some(&header) = nalu.first() else {
            return NalKind::Other;
        };

        match NaluType::from_byte(header) {
            Some(NaluType::Sps) => NalKind::ParameterSet(ParamKind::Sps),
            Some(NaluType::Pps) => NalKind::ParameterSet(ParamKind::Pps),
            Some(NaluType::Aud) => NalKind::Delimiter,
            Some(NaluType::Idr) => NalKind::KeyFrame,
            Some(NaluType::StapA) => NalKind::Aggregation,
            Some(NaluType::FuA) => NalKind::Fragment,
            _ => NalKind::Other,
        }
    }

    fn new_encoder(format: &H264Format, config: PacketizerConfig) -> Result<Encoder, FormatError> {
        Encoder::new(config, format.packetization_mode)
    }

    fn new_decoder(format: &H264Format) -> Result<Decoder, FormatError> {
        tracing::trace!(payload_type = format.payload_type(), "Creating H264 decoder");
        Ok(Decoder::new())
    }
}
