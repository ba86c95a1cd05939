//! Video codec capabilities
//!
//! This module provides:
//! - NAL unit classification for H.264 and H.265
//! - Parameter set discovery straight from RTP payloads, without depacketizing
//! - The [`VideoCodec`] capability trait the processor is generic over
//!
//! Both codecs carry NAL units the same way over RTP: single NAL unit
//! packets, aggregation packets made of 16-bit length-prefixed NAL units,
//! and fragmentation units. What differs is the header layout:
//!
//! ```text
//! H.264 (1 byte):  |F|NRI|  Type   |
//! H.265 (2 bytes): |F|   Type    |  LayerId  | TID |
//! ```

pub mod h264;
pub mod h265;

use bytes::{Buf, Bytes};

use crate::error::FormatError;
use crate::format::{ParamKind, ParameterSets, TrackFormat};
use crate::rtp::{Depacketizer, Packetizer, PacketizerConfig};

pub use h264::H264;
pub use h265::H265;

/// Codec variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    H264,
    H265,
}

impl std::fmt::Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecKind::H264 => write!(f, "H264"),
            CodecKind::H265 => write!(f, "H265"),
        }
    }
}

/// What a NAL unit means to the format processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalKind {
    /// Out-of-band parameter set (VPS, SPS, PPS)
    ParameterSet(ParamKind),
    /// Access unit delimiter
    Delimiter,
    /// Start of an independently decodable picture
    KeyFrame,
    /// RTP aggregation packet (STAP-A, AP)
    Aggregation,
    /// RTP fragmentation unit (FU-A, FU)
    Fragment,
    /// Anything else
    Other,
}

/// Capability set of a video codec, selected once per processor
pub trait VideoCodec: Sized + Send + 'static {
    /// Variant tag
    const KIND: CodecKind;

    /// Length of the NAL unit header
    const HEADER_LEN: usize;

    /// Parameter sets the codec needs, in the order they are sent
    const PARAM_KINDS: &'static [ParamKind];

    /// Whether generated packets are timestamped through a stateful
    /// [`TimestampEncoder`](crate::rtp::TimestampEncoder) rather than
    /// recomputed from each presentation timestamp
    const STATEFUL_CLOCK: bool;

    /// Track format descriptor
    type Format: TrackFormat;

    /// Access unit to RTP packetizer
    type Encoder: Packetizer + Send;

    /// RTP to access unit depacketizer
    type Decoder: Depacketizer + Send;

    /// Classify a NAL unit (or an RTP payload) from its header
    fn classify(nalu: &[u8]) -> NalKind;

    /// Build a packetizer for the format
    fn new_encoder(
        format: &Self::Format,
        config: PacketizerConfig,
    ) -> Result<Self::Encoder, FormatError>;

    /// Build a depacketizer for the format
    fn new_decoder(format: &Self::Format) -> Result<Self::Decoder, FormatError>;
}

/// Extract parameter sets from a single RTP payload without decoding it.
///
/// Only sets actually present in the payload are returned. A malformed
/// aggregation packet yields nothing at all, never a partial result.
pub fn extract_params<C: VideoCodec>(payload: &Bytes) -> ParameterSets {
    if payload.len() < C::HEADER_LEN {
        return ParameterSets::default();
    }

    match C::classify(payload) {
        NalKind::ParameterSet(kind) => {
            let mut found = ParameterSets::default();
            found.set(kind, payload.clone());
            found
        }
        NalKind::Aggregation => {
            walk_aggregation::<C>(payload.slice(C::HEADER_LEN..)).unwrap_or_default()
        }
        _ => ParameterSets::default(),
    }
}

fn walk_aggregation<C: VideoCodec>(mut data: Bytes) -> Option<ParameterSets> {
    let mut found = ParameterSets::default();

    while data.len() >= 2 {
        let size = data.get_u16() as usize;
        if size == 0 {
            break;
        }
        if size > data.len() {
            return None;
        }

        let nalu = data.split_to(size);
        if let NalKind::ParameterSet(kind) = C::classify(&nalu) {
            found.set(kind, nalu);
        }
    }

    Some(found)
}
