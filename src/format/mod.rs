//! Track format descriptors
//!
//! A format describes one negotiated video track: codec, payload type,
//! clock rate, codec-specific packetization options and the current
//! parameter sets. The processor mutates the parameter sets while the rest
//! of the program may read them at any time, e.g. to describe the track in
//! a session description.

pub mod h264;
pub mod h265;
pub mod params;

use crate::codec::{CodecKind, H264, H265, VideoCodec};
use crate::error::FormatError;
use crate::rtp::{Packetizer, PacketizerConfig};

pub use h264::H264Format;
pub use h265::H265Format;
pub use params::{
    update_from_access_unit, update_from_payload, ParamKind, ParameterSets, ParameterStore,
};

/// Clock rate of every video payload format handled here
pub const VIDEO_CLOCK_RATE: u32 = 90_000;

/// Accessors shared by all track formats
pub trait TrackFormat: Clone + Send + Sync + 'static {
    fn payload_type(&self) -> u8;

    fn clock_rate(&self) -> u32;

    /// Handle to the track's parameter store
    fn params(&self) -> &ParameterStore;
}

/// A video track format
#[derive(Debug, Clone)]
pub enum Format {
    H264(H264Format),
    H265(H265Format),
}

impl Format {
    pub fn codec(&self) -> CodecKind {
        match self {
            Format::H264(_) => CodecKind::H264,
            Format::H265(_) => CodecKind::H265,
        }
    }

    pub fn payload_type(&self) -> u8 {
        match self {
            Format::H264(f) => f.payload_type(),
            Format::H265(f) => f.payload_type(),
        }
    }

    pub fn clock_rate(&self) -> u32 {
        match self {
            Format::H264(f) => f.clock_rate(),
            Format::H265(f) => f.clock_rate(),
        }
    }

    pub fn params(&self) -> &ParameterStore {
        match self {
            Format::H264(f) => f.params(),
            Format::H265(f) => f.params(),
        }
    }

    /// MIME type as used by WebRTC codec capabilities
    pub fn mime_type(&self) -> &'static str {
        match self {
            Format::H264(_) => "video/H264",
            Format::H265(_) => "video/H265",
        }
    }

    /// Value of the `a=rtpmap` SDP attribute
    pub fn rtpmap(&self) -> String {
        let name = match self {
            Format::H264(_) => "H264",
            Format::H265(_) => "H265",
        };
        format!("{}/{}", name, self.clock_rate())
    }

    /// Value of the `a=fmtp` SDP attribute, built from the latest parameters
    pub fn fmtp(&self) -> String {
        match self {
            Format::H264(f) => f.fmtp(),
            Format::H265(f) => f.fmtp(),
        }
    }

    /// Build a packetizer matching this format, for an outbound track
    pub fn new_packetizer(
        &self,
        config: PacketizerConfig,
    ) -> Result<Box<dyn Packetizer + Send>, FormatError> {
        Ok(match self {
            Format::H264(f) => Box::new(H264::new_encoder(f, config)?),
            Format::H265(f) => Box::new(H265::new_encoder(f, config)?),
        })
    }
}

impl From<H264Format> for Format {
    fn from(format: H264Format) -> Self {
        Format::H264(format)
    }
}

impl From<H265Format> for Format {
    fn from(format: H265Format) -> Self {
        Format::H265(format)
    }
}
