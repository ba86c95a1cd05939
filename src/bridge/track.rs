//! Outbound video track

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::codec::CodecKind;
use crate::error::{Error, Result};
use crate::rtp::Packet;

struct TrackInner {
    id: String,
    codec: CodecKind,
    tx: broadcast::Sender<Packet>,
    packets_written: AtomicU64,
    closed: AtomicBool,
}

/// Handle to an outbound video track
///
/// Each delivery session gets a clone and subscribes to the packets written
/// to the track. Packets are cheap to clone since payloads are `Bytes`.
#[derive(Clone)]
pub struct TrackHandle {
    inner: Arc<TrackInner>,
}

impl TrackHandle {
    /// Create a track keeping up to `capacity` packets per lagging subscriber
    pub fn new(id: impl Into<String>, codec: CodecKind, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));

        Self {
            inner: Arc::new(TrackInner {
                id: id.into(),
                codec,
                tx,
                packets_written: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn codec(&self) -> CodecKind {
        self.inner.codec
    }

    /// Subscribe to packets written from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Packet> {
        let rx = self.inner.tx.subscribe();
        tracing::debug!(
            track = %self.inner.id,
            subscribers = self.receiver_count(),
            "Subscriber added"
        );
        rx
    }

    /// Number of active subscribers
    pub fn receiver_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }

    /// Total packets written to the track
    pub fn packets_written(&self) -> u64 {
        self.inner.packets_written.load(Ordering::Relaxed)
    }

    /// Write a packet to every subscriber
    ///
    /// Returns the number of subscribers reached, 0 when there are none.
    pub fn write_rtp(&self, pkt: Packet) -> Result<usize> {
        if self.is_closed() {
            return Err(Error::TrackClosed);
        }

        self.inner.packets_written.fetch_add(1, Ordering::Relaxed);
        // send() fails only when there are no receivers
        Ok(self.inner.tx.send(pkt).unwrap_or(0))
    }

    /// Refuse further writes
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::Relaxed) {
            tracing::info!(track = %self.inner.id, "Track closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for TrackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackHandle")
            .field("id", &self.inner.id)
            .field("codec", &self.inner.codec)
            .field("subscribers", &self.receiver_count())
            .finish()
    }
}
