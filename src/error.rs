//! Error types
//!
//! Expected buffering states (a depacketizer waiting for more packets, a
//! remux pass with nothing to forward) are not errors and never show up here.
//! See [`crate::rtp::DecodeOutcome`].

use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top level error type
#[derive(Debug, Error)]
pub enum Error {
    /// RTP packet could not be parsed
    #[error("rtp: {0}")]
    Rtp(#[from] RtpError),

    /// Depacketization failed for this packet
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),

    /// Packetization failed for this access unit
    #[error("encode: {0}")]
    Encode(#[from] EncodeError),

    /// Invalid codec or processor configuration
    #[error("format: {0}")]
    Format(#[from] FormatError),

    /// Presentation timestamps went backwards on a pipeline that cannot reorder
    #[error("presentation timestamp regressed from {previous:?} to {current:?}")]
    PtsRegression {
        /// Last accepted presentation timestamp
        previous: Duration,
        /// Offending presentation timestamp
        current: Duration,
    },

    /// Outbound track has been shut down
    #[error("track closed")]
    TrackClosed,
}

impl Error {
    /// Whether the error must abort the whole track rather than one item
    pub fn is_fatal_for_track(&self) -> bool {
        matches!(
            self,
            Error::PtsRegression { .. } | Error::Format(_) | Error::TrackClosed
        )
    }
}

/// RTP packet parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtpError {
    /// Buffer shorter than the fixed header
    #[error("packet too short ({0} bytes)")]
    TooShort(usize),

    /// Version field is not 2
    #[error("unsupported version {0}")]
    InvalidVersion(u8),

    /// CSRC list runs past the end of the buffer
    #[error("csrc list exceeds packet size")]
    InvalidCsrc,

    /// Header extension runs past the end of the buffer
    #[error("header extension exceeds packet size")]
    InvalidExtension,

    /// Padding length is zero or larger than the payload
    #[error("invalid padding size {0}")]
    InvalidPadding(u8),
}

/// Depacketization errors
///
/// These are fatal for the packet being decoded. The caller decides whether
/// to drop the packet or abort the track.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Payload shorter than the codec's NAL header
    #[error("payload is too short")]
    PayloadTooShort,

    /// Malformed aggregation packet (STAP-A / AP)
    #[error("invalid aggregation packet: {0}")]
    InvalidAggregation(&'static str),

    /// Malformed fragmentation unit (FU-A / FU)
    #[error("invalid fragmentation unit: {0}")]
    InvalidFragment(&'static str),

    /// A fragment arrived out of sequence
    #[error("discarding frame since a packet is missing (expected {expected}, got {got})")]
    PacketLost {
        /// Sequence number that was expected
        expected: u16,
        /// Sequence number that arrived
        got: u16,
    },

    /// Access unit grew past the size limit
    #[error("access unit size ({size}) is too big, maximum is {max}")]
    AccessUnitTooBig {
        /// Accumulated size in bytes
        size: usize,
        /// Limit in bytes
        max: usize,
    },

    /// Access unit holds too many NAL units
    #[error("access unit contains too many NAL units ({count}), maximum is {max}")]
    TooManyNalus {
        /// Accumulated NAL unit count
        count: usize,
        /// Limit
        max: usize,
    },

    /// Packetization scheme this depacketizer doesn't handle
    #[error("packet type {0} is not supported")]
    UnsupportedPacketType(u8),
}

/// Packetization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Nothing to encode
    #[error("access unit is empty")]
    EmptyAccessUnit,

    /// A NAL unit without even a header
    #[error("NAL unit is too short ({0} bytes)")]
    NaluTooShort(usize),

    /// NAL unit can't be carried in single NAL unit mode
    #[error("NAL unit size ({size}) exceeds maximum payload size ({max})")]
    NaluTooBig {
        /// NAL unit size in bytes
        size: usize,
        /// Maximum payload size in bytes
        max: usize,
    },
}

/// Codec configuration errors, raised when building encoders and decoders
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// H.264 packetization-mode other than 0 or 1
    #[error("packetization mode {0} is not supported")]
    UnsupportedPacketizationMode(u8),

    /// H.265 sprop-max-don-diff other than 0
    #[error("max DON diff {0} is not supported")]
    UnsupportedMaxDonDiff(u16),

    /// Access units handed to a processor that doesn't generate packets
    #[error("packet generation is not enabled")]
    PacketGenerationDisabled,

    /// Payload bound too small to carry fragmentation headers
    #[error("maximum payload size {size} is too small (minimum {min})")]
    PayloadSizeTooSmall {
        /// Configured size
        size: usize,
        /// Minimum workable size
        min: usize,
    },
}
