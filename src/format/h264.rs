//! H.264 track format (RFC 6184)

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;

use super::params::{ParameterSets, ParameterStore};
use super::{TrackFormat, VIDEO_CLOCK_RATE};

/// H.264 format descriptor
#[derive(Debug, Clone)]
pub struct H264Format {
    /// RTP payload type
    pub payload_type: u8,
    /// 0 = single NAL unit mode, 1 = non-interleaved mode
    pub packetization_mode: u8,
    params: ParameterStore,
}

impl H264Format {
    pub fn new(payload_type: u8, packetization_mode: u8) -> Self {
        Self {
            payload_type,
            packetization_mode,
            params: ParameterStore::default(),
        }
    }

    /// Seed the parameter sets, typically from the session description
    pub fn with_params(self, sps: Option<Bytes>, pps: Option<Bytes>) -> Self {
        self.set_params(sps, pps);
        self
    }

    pub fn sps(&self) -> Option<Bytes> {
        self.params.load().sps.clone()
    }

    pub fn pps(&self) -> Option<Bytes> {
        self.params.load().pps.clone()
    }

    /// Replace both parameter sets at once
    pub fn set_params(&self, sps: Option<Bytes>, pps: Option<Bytes>) {
        self.params.store(ParameterSets {
            vps: None,
            sps,
            pps,
        });
    }

    /// `profile-level-id`, taken from bytes 1..4 of the SPS
    pub fn profile_level_id(&self) -> Option<String> {
        let sps = self.sps()?;
        if sps.len() < 4 {
            return None;
        }
        Some(format!("{:02X}{:02X}{:02X}", sps[1], sps[2], sps[3]))
    }

    /// Format-specific parameters for the `a=fmtp` SDP attribute
    pub fn fmtp(&self) -> String {
        let params = self.params.load();
        let mut attrs = Vec::with_capacity(3);

        if self.packetization_mode != 0 {
            attrs.push(format!("packetization-mode={}", self.packetization_mode));
        }

        if let Some(id) = self.profile_level_id() {
            attrs.push(format!("profile-level-id={}", id));
        }

        let sprop: Vec<String> = [params.sps.as_ref(), params.pps.as_ref()]
            .into_iter()
            .flatten()
            .map(|set| BASE64.encode(set))
            .collect();
        if !sprop.is_empty() {
            attrs.push(format!("sprop-parameter-sets={}", sprop.join(",")));
        }

        attrs.join("; ")
    }
}

impl Default for H264Format {
    fn default() -> Self {
        Self::new(96, 1)
    }
}

impl TrackFormat for H264Format {
    fn payload_type(&self) -> u8 {
        self.payload_type
    }

    fn clock_rate(&self) -> u32 {
        VIDEO_CLOCK_RATE
    }

    fn params(&self) -> &ParameterStore {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPS: &[u8] = &[0x67, 0x64, 0x00, 0x1F, 0xAC];
    const PPS: &[u8] = &[0x68, 0xEE, 0x3C, 0x80];

    #[test]
    fn test_fmtp() {
        let format = H264Format::default()
            .with_params(Some(Bytes::from_static(SPS)), Some(Bytes::from_static(PPS)));

        assert_eq!(format.profile_level_id().as_deref(), Some("64001F"));
        assert_eq!(
            format.fmtp(),
            "packetization-mode=1; profile-level-id=64001F; sprop-parameter-sets=Z2QAH6w=,aO48gA=="
        );
    }

    #[test]
    fn test_fmtp_without_params() {
        let format = H264Format::new(96, 0);
        assert_eq!(format.fmtp(), "");
        assert!(format.profile_level_id().is_none());
    }

    #[test]
    fn test_clones_share_params() {
        let format = H264Format::default();
        let reader = format.clone();

        format.set_params(Some(Bytes::from_static(SPS)), None);
        assert_eq!(reader.sps().as_deref(), Some(SPS));
        assert!(reader.pps().is_none());
    }
}
