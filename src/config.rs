//! Pipeline configuration

use crate::rtp::HEADER_SIZE;

/// Largest UDP payload that avoids IP fragmentation on a 1500 byte MTU
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 1472;

/// Packet size bound used on WebRTC tracks
pub const WEBRTC_MAX_PAYLOAD_SIZE: usize = 1200;

/// Format processor options
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Maximum size of a forwarded RTP packet, header included
    pub max_payload_size: usize,

    /// Produce packets from access units from the start, instead of
    /// forwarding received packets
    pub generate_packets: bool,

    /// First RTP timestamp of generated packets, for codecs with a stateful
    /// clock (None = random)
    pub initial_timestamp: Option<u32>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            generate_packets: false,
            initial_timestamp: None,
        }
    }
}

impl ProcessorConfig {
    /// Set the maximum packet size
    pub fn max_payload_size(mut self, size: usize) -> Self {
        self.max_payload_size = size;
        self
    }

    /// Generate packets from access units
    pub fn generate_packets(mut self) -> Self {
        self.generate_packets = true;
        self
    }

    /// Pin the first RTP timestamp of generated packets
    pub fn initial_timestamp(mut self, ts: u32) -> Self {
        self.initial_timestamp = Some(ts);
        self
    }

    /// Payload bound handed to packetizers
    pub fn packetizer_payload_size(&self) -> usize {
        self.max_payload_size.saturating_sub(HEADER_SIZE)
    }
}

/// Outbound track options
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Maximum size of a written RTP packet, header included
    pub max_payload_size: usize,

    /// Payload type of written packets
    pub payload_type: u8,

    /// Fail on presentation timestamps going backwards (B-frames)
    pub reject_pts_regression: bool,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            max_payload_size: WEBRTC_MAX_PAYLOAD_SIZE,
            payload_type: 96,
            reject_pts_regression: true,
        }
    }
}

impl ForwarderConfig {
    /// Set the maximum packet size
    pub fn max_payload_size(mut self, size: usize) -> Self {
        self.max_payload_size = size;
        self
    }

    /// Set the payload type
    pub fn payload_type(mut self, pt: u8) -> Self {
        self.payload_type = pt;
        self
    }

    /// Let presentation timestamps go backwards
    pub fn allow_pts_regression(mut self) -> Self {
        self.reject_pts_regression = false;
        self
    }

    /// Payload bound handed to packetizers
    pub fn packetizer_payload_size(&self) -> usize {
        self.max_payload_size.saturating_sub(HEADER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_processor_config() {
        let config = ProcessorConfig::default();

        assert_eq!(config.max_payload_size, 1472);
        assert!(!config.generate_packets);
        assert!(config.initial_timestamp.is_none());
        assert_eq!(config.packetizer_payload_size(), 1460);
    }

    #[test]
    fn test_processor_config_builder() {
        let config = ProcessorConfig::default()
            .max_payload_size(1200)
            .generate_packets()
            .initial_timestamp(1000);

        assert_eq!(config.max_payload_size, 1200);
        assert!(config.generate_packets);
        assert_eq!(config.initial_timestamp, Some(1000));
    }

    #[test]
    fn test_default_forwarder_config() {
        let config = ForwarderConfig::default();

        assert_eq!(config.max_payload_size, 1200);
        assert_eq!(config.payload_type, 96);
        assert!(config.reject_pts_regression);
        assert_eq!(config.packetizer_payload_size(), 1188);
    }

    #[test]
    fn test_forwarder_config_builder() {
        let config = ForwarderConfig::default()
            .payload_type(102)
            .allow_pts_regression()
            .max_payload_size(1400);

        assert_eq!(config.payload_type, 102);
        assert!(!config.reject_pts_regression);
        assert_eq!(config.max_payload_size, 1400);
        assert_eq!(config.packetizer_payload_size(), 1388);
    }
}
