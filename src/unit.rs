//! Pipeline data unit

use std::time::{Duration, SystemTime};

use bytes::Bytes;

use crate::rtp::Packet;

/// NAL units of one decoded instant, in decoding order
pub type AccessUnit = Vec<Bytes>;

/// The elementary item flowing through a track.
///
/// A unit always carries the packets to forward (possibly none) and may carry
/// the access unit they decode to. A unit whose access unit is `None` after
/// processing has nothing to hand to consumers needing decoded output and is
/// dropped by them, it is not an error.
#[derive(Debug, Clone)]
pub struct Unit {
    /// RTP packets carried by the unit
    pub rtp_packets: Vec<Packet>,
    /// Capture wall-clock time
    pub ntp: SystemTime,
    /// Presentation timestamp, relative to the start of the stream
    pub pts: Duration,
    /// Decoded access unit, when available
    pub au: Option<AccessUnit>,
}

impl Unit {
    /// Unit built from a received packet
    pub fn from_packet(pkt: Packet, ntp: SystemTime, pts: Duration) -> Self {
        Self {
            rtp_packets: vec![pkt],
            ntp,
            pts,
            au: None,
        }
    }

    /// Unit built from an access unit, packets are produced by the processor
    pub fn from_access_unit(au: AccessUnit, ntp: SystemTime, pts: Duration) -> Self {
        Self {
            rtp_packets: Vec::new(),
            ntp,
            pts,
            au: Some(au),
        }
    }

    pub fn rtp_packets(&self) -> &[Packet] {
        &self.rtp_packets
    }

    pub fn ntp(&self) -> SystemTime {
        self.ntp
    }

    pub fn pts(&self) -> Duration {
        self.pts
    }

    pub fn has_access_unit(&self) -> bool {
        self.au.as_ref().is_some_and(|au| !au.is_empty())
    }
}
