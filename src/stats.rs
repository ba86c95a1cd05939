//! Per-track statistics

use std::time::{Duration, Instant};

/// Counters of one track's format processing
#[derive(Debug, Clone)]
pub struct TrackStats {
    /// Start time
    pub started_at: Instant,
    /// RTP packets received
    pub packets_received: u64,
    /// RTP packets handed out, forwarded or generated
    pub packets_sent: u64,
    /// Payload bytes received
    pub bytes_received: u64,
    /// Access units fully decoded or received
    pub access_units: u64,
    /// Access units carrying a key frame
    pub keyframes: u64,
    /// Parameter set changes
    pub param_updates: u64,
    /// Packets that left the depacketizer waiting for more
    pub incomplete: u64,
    /// Packets or access units dropped on error
    pub dropped: u64,
    /// Whether packets are being re-encoded
    pub transcoding: bool,
}

impl Default for TrackStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            packets_received: 0,
            packets_sent: 0,
            bytes_received: 0,
            access_units: 0,
            keyframes: 0,
            param_updates: 0,
            incomplete: 0,
            dropped: 0,
            transcoding: false,
        }
    }

    /// Get duration since the track started
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Calculate ingress bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration().as_secs();
        if secs > 0 {
            (self.bytes_received * 8) / secs
        } else {
            0
        }
    }

    /// Fraction of access units that were key frames
    pub fn keyframe_ratio(&self) -> f64 {
        if self.access_units == 0 {
            return 0.0;
        }
        self.keyframes as f64 / self.access_units as f64
    }
}
