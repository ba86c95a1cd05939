//! Access unit forwarding to an outbound track

use std::time::Duration;

use crate::codec::CodecKind;
use crate::config::ForwarderConfig;
use crate::error::{Error, Result};
use crate::format::{Format, H264Format, H265Format};
use crate::rtp::{Packetizer, PacketizerConfig};
use crate::unit::Unit;

use super::track::TrackHandle;

/// Packetizes access units for an outbound track and writes them to it
pub struct Forwarder {
    config: ForwarderConfig,
    packetizer: Box<dyn Packetizer + Send>,
    track: TrackHandle,
    last_pts: Option<Duration>,
}

impl Forwarder {
    pub fn new(config: ForwarderConfig, track: TrackHandle) -> Result<Self> {
        // outbound H.264 always allows aggregation and fragmentation
        let format = match track.codec() {
            CodecKind::H264 => Format::from(H264Format::new(config.payload_type, 1)),
            CodecKind::H265 => Format::from(H265Format::new(config.payload_type)),
        };
        let packetizer = format.new_packetizer(PacketizerConfig::new(
            config.payload_type,
            config.packetizer_payload_size(),
        ))?;

        Ok(Self {
            config,
            packetizer,
            track,
            last_pts: None,
        })
    }

    pub fn track(&self) -> &TrackHandle {
        &self.track
    }

    /// Forward the access unit of `unit`.
    ///
    /// Units without an access unit are skipped. Timestamps of the written
    /// packets are offset by the timestamp of the unit's first packet.
    /// Returns the number of packets written.
    pub fn forward(&mut self, unit: &Unit) -> Result<usize> {
        let Some(au) = &unit.au else {
            return Ok(0);
        };
        let Some(first) = unit.rtp_packets.first() else {
            tracing::trace!(track = %self.track.id(), "Access unit without packets, skipping");
            return Ok(0);
        };

        if self.config.reject_pts_regression {
            if let Some(previous) = self.last_pts {
                if unit.pts < previous {
                    tracing::warn!(
                        track = %self.track.id(),
                        previous = ?previous,
                        current = ?unit.pts,
                        "Presentation timestamp went backwards, B-frames are not supported"
                    );
                    return Err(Error::PtsRegression {
                        previous,
                        current: unit.pts,
                    });
                }
            }
        }
        self.last_pts = Some(unit.pts);

        let offset = first.header.timestamp;
        let packets = self.packetizer.encode(au)?;
        let count = packets.len();

        for mut pkt in packets {
            pkt.header.timestamp = pkt.header.timestamp.wrapping_add(offset);
            self.track.write_rtp(pkt)?;
        }

        Ok(count)
    }
}
