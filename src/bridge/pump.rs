//! Ingress loop driving a track's processor and forwarder

use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::processor::Processor;
use crate::rtp::Packet;
use crate::stats::TrackStats;

use super::forwarder::Forwarder;

/// An RTP packet received from the source, with its timing
#[derive(Debug, Clone)]
pub struct Ingress {
    pub packet: Packet,
    /// Capture wall-clock time
    pub ntp: SystemTime,
    /// Presentation timestamp computed by the source
    pub pts: Duration,
}

impl Ingress {
    pub fn new(packet: Packet, ntp: SystemTime, pts: Duration) -> Self {
        Self { packet, ntp, pts }
    }
}

/// Create the channel feeding [`pump`]
pub fn channel(capacity: usize) -> (mpsc::Sender<Ingress>, mpsc::Receiver<Ingress>) {
    mpsc::channel(capacity.max(1))
}

/// Drain `rx` through the processor and the forwarder until the channel
/// closes.
///
/// Errors affecting a single packet are logged and the packet is dropped.
/// Errors affecting the whole track end the loop.
pub async fn pump(
    mut processor: Processor,
    mut forwarder: Forwarder,
    mut rx: mpsc::Receiver<Ingress>,
) -> Result<TrackStats> {
    let track = forwarder.track().id().to_string();
    tracing::info!(track = %track, codec = %processor.codec(), "Pump started");

    while let Some(item) = rx.recv().await {
        let seq = item.packet.header.sequence_number;

        // the forwarder needs access units
        let unit = match processor.process_rtp_packet(item.packet, item.ntp, item.pts, true) {
            Ok(unit) => unit,
            Err(e) if e.is_fatal_for_track() => {
                tracing::error!(track = %track, error = %e, "Processing failed");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    track = %track,
                    sequence_number = seq,
                    error = %e,
                    "Dropping RTP packet"
                );
                continue;
            }
        };

        match forwarder.forward(&unit) {
            Ok(count) => {
                if count > 0 {
                    tracing::trace!(track = %track, packets = count, "Access unit forwarded");
                }
            }
            Err(e) if e.is_fatal_for_track() => {
                tracing::error!(track = %track, error = %e, "Forwarding failed");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(track = %track, error = %e, "Dropping access unit");
            }
        }
    }

    let stats = processor.stats().clone();
    tracing::info!(
        track = %track,
        packets_received = stats.packets_received,
        access_units = stats.access_units,
        transcoding = stats.transcoding,
        "Ingress closed, pump stopped"
    );

    Ok(stats)
}

/// Spawn [`pump`] on the runtime
pub fn spawn(
    processor: Processor,
    forwarder: Forwarder,
    rx: mpsc::Receiver<Ingress>,
) -> JoinHandle<Result<TrackStats>> {
    tokio::spawn(pump(processor, forwarder, rx))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::bridge::TrackHandle;
    use crate::codec::CodecKind;
    use crate::config::{ForwarderConfig, ProcessorConfig};
    use crate::error::Error;
    use crate::format::{Format, H264Format};
    use crate::rtp::Header;

    fn ingress(seq: u16, pts_ms: u64, marker: bool, payload: &'static [u8]) -> Ingress {
        let packet = Packet::new(
            Header {
                marker,
                payload_type: 96,
                sequence_number: seq,
                timestamp: (pts_ms * 90) as u32,
                ssrc: 1,
                ..Default::default()
            },
            Bytes::from_static(payload),
        );
        Ingress::new(packet, SystemTime::now(), Duration::from_millis(pts_ms))
    }

    fn setup() -> (Processor, Forwarder, TrackHandle) {
        let processor = Processor::new(
            &ProcessorConfig::default(),
            Format::from(H264Format::default()),
        )
        .unwrap();
        let track = TrackHandle::new("video", CodecKind::H264, 64);
        let forwarder = Forwarder::new(ForwarderConfig::default(), track.clone()).unwrap();
        (processor, forwarder, track)
    }

    #[tokio::test]
    async fn test_pump_forwards_until_closed() {
        let (processor, forwarder, track) = setup();
        let mut out = track.subscribe();
        let (tx, rx) = channel(16);
        let handle = spawn(processor, forwarder, rx);

        tx.send(ingress(1, 0, false, &[0x67, 0x64, 0x00, 0x1F]))
            .await
            .unwrap();
        tx.send(ingress(2, 0, false, &[0x68, 0xEE, 0x3C, 0x80]))
            .await
            .unwrap();
        tx.send(ingress(3, 0, true, &[0x65, 0x88])).await.unwrap();
        // malformed, dropped without stopping the pump
        tx.send(ingress(4, 40, true, &[0x7C])).await.unwrap();
        tx.send(ingress(5, 40, true, &[0x41, 0x9A])).await.unwrap();
        drop(tx);

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.packets_received, 5);
        assert_eq!(stats.access_units, 2);
        assert_eq!(stats.dropped, 1);

        // SPS + PPS + IDR aggregated, then the slice
        let first = out.recv().await.unwrap();
        assert_eq!(first.payload[0] & 0x1F, 24);
        assert_eq!(first.header.timestamp, 0);
        let second = out.recv().await.unwrap();
        assert_eq!(&second.payload[..], &[0x41, 0x9A]);
        assert_eq!(second.header.timestamp, 3600);
    }

    #[tokio::test]
    async fn test_pump_stops_on_pts_regression() {
        let (processor, forwarder, _track) = setup();
        let (tx, rx) = channel(16);

        tx.send(ingress(1, 80, true, &[0x65, 0x88])).await.unwrap();
        tx.send(ingress(2, 40, true, &[0x41, 0x9A])).await.unwrap();

        let err = pump(processor, forwarder, rx).await.unwrap_err();
        assert!(matches!(err, Error::PtsRegression { .. }));
    }
}
