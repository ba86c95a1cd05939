//! # rtp-bridge
//!
//! Format processing for RTP video tracks carrying H.264 (RFC 6184) or
//! H.265 (RFC 7798), as needed to bridge a pulled RTP source to a pushed
//! transport such as WebRTC.
//!
//! For every track, a [`Processor`]:
//! - tracks the codec parameter sets (VPS/SPS/PPS) seen on the wire
//! - forwards received packets as they are when they fit the payload bound
//! - otherwise depacketizes, remuxes and packetizes access units again,
//!   preserving the SSRC and sequence numbering receivers already follow
//!
//! The [`bridge`] module wires a processor to an outbound track shared by
//! every delivery session.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::{Duration, SystemTime};
//!
//! use bytes::Bytes;
//! use rtp_bridge::format::H264Format;
//! use rtp_bridge::rtp::Packet;
//! use rtp_bridge::{Processor, ProcessorConfig};
//!
//! # fn main() -> rtp_bridge::Result<()> {
//! let format = H264Format::default();
//! let mut processor = Processor::new(&ProcessorConfig::default(), format.clone().into())?;
//!
//! let datagram = Bytes::from_static(&[0x80, 0xE0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0x65, 0x88]);
//! let packet = Packet::unmarshal(datagram)?;
//! let unit = processor.process_rtp_packet(packet, SystemTime::now(), Duration::ZERO, false)?;
//!
//! for pkt in unit.rtp_packets() {
//!     // write pkt.marshal() to the outbound transport
//!     let _ = pkt.marshal();
//! }
//! println!("a=fmtp:96 {}", format.fmtp());
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod processor;
pub mod rtp;
pub mod stats;
pub mod unit;

pub use bridge::{Forwarder, Ingress, TrackHandle};
pub use codec::{CodecKind, NalKind, VideoCodec};
pub use config::{ForwarderConfig, ProcessorConfig};
pub use error::{Error, Result};
pub use format::{Format, ParameterSets, ParameterStore};
pub use processor::{CodecProcessor, Processor};
pub use stats::TrackStats;
pub use unit::{AccessUnit, Unit};
