//! Per-track format processing
//!
//! A processor sits between a track's RTP source and its consumers. It keeps
//! the track's parameter sets up to date and decides, packet by packet,
//! whether received packets can be forwarded as they are or must be decoded
//! and packetized again.
//!
//! Two states:
//! - passthrough: received packets are forwarded, parameters are still tracked
//! - transcoding: every packet is depacketized, remuxed and packetized again
//!
//! Transcoding starts at construction when packets are generated from access
//! units, or the first time a received packet doesn't fit the payload bound.
//! It never stops.

pub mod remux;

use std::time::{Duration, SystemTime};

use bytes::Bytes;

use crate::codec::{CodecKind, NalKind, VideoCodec, H264, H265};
use crate::config::ProcessorConfig;
use crate::error::{FormatError, Result};
use crate::format::{update_from_access_unit, update_from_payload, Format, TrackFormat};
use crate::rtp::{
    duration_to_ticks, DecodeOutcome, Depacketizer, Packet, Packetizer, PacketizerConfig,
    TimestampEncoder,
};
use crate::stats::TrackStats;
use crate::unit::Unit;

pub use remux::remux_access_unit;

/// Format processor for one codec
pub struct CodecProcessor<C: VideoCodec> {
    max_payload_size: usize,
    packetizer_payload_size: usize,
    format: C::Format,
    encoder: Option<C::Encoder>,
    decoder: Option<C::Decoder>,
    clock: Option<TimestampEncoder>,
    stats: TrackStats,
}

impl<C: VideoCodec> CodecProcessor<C> {
    pub fn new(config: &ProcessorConfig, format: C::Format) -> Result<Self> {
        let clock = C::STATEFUL_CLOCK
            .then(|| TimestampEncoder::new(format.clock_rate(), config.initial_timestamp));

        let mut processor = Self {
            max_payload_size: config.max_payload_size,
            packetizer_payload_size: config.packetizer_payload_size(),
            format,
            encoder: None,
            decoder: None,
            clock,
            stats: TrackStats::new(),
        };

        if config.generate_packets {
            let encoder = processor.build_encoder(None, None)?;
            processor.encoder = Some(encoder);
            processor.stats.transcoding = true;
        }

        Ok(processor)
    }

    pub fn format(&self) -> &C::Format {
        &self.format
    }

    pub fn stats(&self) -> &TrackStats {
        &self.stats
    }

    pub fn is_transcoding(&self) -> bool {
        self.encoder.is_some()
    }

    fn build_encoder(
        &self,
        ssrc: Option<u32>,
        sequence_number: Option<u16>,
    ) -> std::result::Result<C::Encoder, FormatError> {
        let config = PacketizerConfig {
            payload_type: self.format.payload_type(),
            payload_max_size: self.packetizer_payload_size,
            ssrc,
            initial_sequence_number: sequence_number,
        };
        C::new_encoder(&self.format, config)
    }

    fn count_access_unit(&mut self, au: &[Bytes]) {
        self.stats.access_units += 1;
        if au.iter().any(|nalu| C::classify(nalu) == NalKind::KeyFrame) {
            self.stats.keyframes += 1;
        }
    }

    /// Process a received RTP packet.
    ///
    /// `needs_decoded` tells whether some consumer wants access units. The
    /// returned unit carries the packets to forward, which are either `pkt`
    /// itself or freshly packetized ones, plus the access unit when one got
    /// completed.
    pub fn process_rtp_packet(
        &mut self,
        mut pkt: Packet,
        ntp: SystemTime,
        pts: Duration,
        needs_decoded: bool,
    ) -> Result<Unit> {
        pkt.strip_padding();

        self.stats.packets_received += 1;
        self.stats.bytes_received += pkt.payload.len() as u64;

        if update_from_payload::<C>(self.format.params(), &pkt.payload) {
            self.stats.param_updates += 1;
        }

        if self.encoder.is_none() && pkt.marshal_size() > self.max_payload_size {
            let encoder =
                self.build_encoder(Some(pkt.header.ssrc), Some(pkt.header.sequence_number))?;
            self.encoder = Some(encoder);
            self.stats.transcoding = true;

            tracing::info!(
                codec = %C::KIND,
                ssrc = pkt.header.ssrc,
                sequence_number = pkt.header.sequence_number,
                size = pkt.marshal_size(),
                max = self.max_payload_size,
                "RTP packets exceed maximum size, re-encoding them"
            );
        }

        let timestamp = pkt.header.timestamp;
        let mut unit = Unit::from_packet(pkt, ntp, pts);

        if needs_decoded || self.decoder.is_some() || self.encoder.is_some() {
            let decoder = match self.decoder.take() {
                Some(decoder) => decoder,
                None => C::new_decoder(&self.format)?,
            };
            let decoder = self.decoder.insert(decoder);

            let outcome = decoder.decode(&unit.rtp_packets[0]);

            if self.encoder.is_some() {
                unit.rtp_packets.clear();
            }

            match outcome {
                Ok(DecodeOutcome::Complete(au)) => {
                    self.count_access_unit(&au);
                    unit.au = remux_access_unit::<C>(&au, &self.format.params().load());
                }
                Ok(DecodeOutcome::Incomplete(state)) => {
                    tracing::trace!(codec = %C::KIND, ?state, "Access unit incomplete");
                    self.stats.incomplete += 1;
                    return Ok(unit);
                }
                Err(e) => {
                    self.stats.dropped += 1;
                    return Err(e.into());
                }
            }
        }

        let Some(encoder) = self.encoder.as_mut() else {
            self.stats.packets_sent += unit.rtp_packets.len() as u64;
            return Ok(unit);
        };

        if let Some(au) = &unit.au {
            let mut packets = match encoder.encode(au) {
                Ok(packets) => packets,
                Err(e) => {
                    self.stats.dropped += 1;
                    return Err(e.into());
                }
            };
            for packet in &mut packets {
                packet.header.timestamp = timestamp;
            }
            self.stats.packets_sent += packets.len() as u64;
            unit.rtp_packets = packets;
        }

        Ok(unit)
    }

    /// Packetize the access unit of `unit`, filling its packets.
    ///
    /// The access unit is remuxed in place and cleared when nothing is left
    /// of it. Needs a packetizer, i.e. a processor built with
    /// `generate_packets` or one that already started transcoding.
    pub fn process_unit(&mut self, unit: &mut Unit) -> Result<()> {
        let au = unit.au.take().unwrap_or_default();

        if update_from_access_unit::<C>(self.format.params(), &au) {
            self.stats.param_updates += 1;
        }
        if !au.is_empty() {
            self.count_access_unit(&au);
        }

        unit.au = remux_access_unit::<C>(&au, &self.format.params().load());
        let Some(au) = &unit.au else {
            return Ok(());
        };

        let Some(encoder) = self.encoder.as_mut() else {
            return Err(FormatError::PacketGenerationDisabled.into());
        };

        let ticks = match self.clock.as_mut() {
            Some(clock) => clock.encode(unit.pts)?,
            None => duration_to_ticks(unit.pts, self.format.clock_rate()),
        };

        let mut packets = match encoder.encode(au) {
            Ok(packets) => packets,
            Err(e) => {
                self.stats.dropped += 1;
                return Err(e.into());
            }
        };
        for packet in &mut packets {
            packet.header.timestamp = packet.header.timestamp.wrapping_add(ticks);
        }

        self.stats.packets_sent += packets.len() as u64;
        unit.rtp_packets = packets;
        Ok(())
    }
}

/// Format processor of a track, for whichever codec the track uses
pub enum Processor {
    H264(CodecProcessor<H264>),
    H265(CodecProcessor<H265>),
}

impl Processor {
    /// Create the processor matching the track format
    pub fn new(config: &ProcessorConfig, format: Format) -> Result<Self> {
        let processor = match format {
            Format::H264(f) => Processor::H264(CodecProcessor::new(config, f)?),
            Format::H265(f) => Processor::H265(CodecProcessor::new(config, f)?),
        };

        tracing::debug!(
            codec = %processor.codec(),
            max_payload_size = config.max_payload_size,
            generate_packets = config.generate_packets,
            "Format processor created"
        );

        Ok(processor)
    }

    pub fn codec(&self) -> CodecKind {
        match self {
            Processor::H264(_) => CodecKind::H264,
            Processor::H265(_) => CodecKind::H265,
        }
    }

    /// Track format, sharing the processor's parameter store
    pub fn format(&self) -> Format {
        match self {
            Processor::H264(p) => Format::H264(p.format().clone()),
            Processor::H265(p) => Format::H265(p.format().clone()),
        }
    }

    pub fn stats(&self) -> &TrackStats {
        match self {
            Processor::H264(p) => p.stats(),
            Processor::H265(p) => p.stats(),
        }
    }

    pub fn is_transcoding(&self) -> bool {
        match self {
            Processor::H264(p) => p.is_transcoding(),
            Processor::H265(p) => p.is_transcoding(),
        }
    }

    /// See [`CodecProcessor::process_rtp_packet`]
    pub fn process_rtp_packet(
        &mut self,
        pkt: Packet,
        ntp: SystemTime,
        pts: Duration,
        needs_decoded: bool,
    ) -> Result<Unit> {
        match self {
            Processor::H264(p) => p.process_rtp_packet(pkt, ntp, pts, needs_decoded),
            Processor::H265(p) => p.process_rtp_packet(pkt, ntp, pts, needs_decoded),
        }
    }

    /// See [`CodecProcessor::process_unit`]
    pub fn process_unit(&mut self, unit: &mut Unit) -> Result<()> {
        match self {
            Processor::H264(p) => p.process_unit(unit),
            Processor::H265(p) => p.process_unit(unit),
        }
    }
}
