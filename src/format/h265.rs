//! H.265 track format (RFC 7798)

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;

use super::params::{ParameterSets, ParameterStore};
use super::{TrackFormat, VIDEO_CLOCK_RATE};

/// H.265 format descriptor
#[derive(Debug, Clone)]
pub struct H265Format {
    /// RTP payload type
    pub payload_type: u8,
    /// `sprop-max-don-diff`, non-zero when NAL units may be sent out of decoding order
    pub max_don_diff: u16,
    params: ParameterStore,
}

impl H265Format {
    pub fn new(payload_type: u8) -> Self {
        Self {
            payload_type,
            max_don_diff: 0,
            params: ParameterStore::default(),
        }
    }

    pub fn max_don_diff(mut self, max_don_diff: u16) -> Self {
        self.max_don_diff = max_don_diff;
        self
    }

    /// Seed the parameter sets, typically from the session description
    pub fn with_params(self, vps: Option<Bytes>, sps: Option<Bytes>, pps: Option<Bytes>) -> Self {
        self.set_params(vps, sps, pps);
        self
    }

    pub fn vps(&self) -> Option<Bytes> {
        self.params.load().vps.clone()
    }

    pub fn sps(&self) -> Option<Bytes> {
        self.params.load().sps.clone()
    }

    pub fn pps(&self) -> Option<Bytes> {
        self.params.load().pps.clone()
    }

    /// Replace all three parameter sets at once
    pub fn set_params(&self, vps: Option<Bytes>, sps: Option<Bytes>, pps: Option<Bytes>) {
        self.params.store(ParameterSets { vps, sps, pps });
    }

    /// Format-specific parameters for the `a=fmtp` SDP attribute
    pub fn fmtp(&self) -> String {
        let params = self.params.load();
        let mut attrs = Vec::with_capacity(4);

        if self.max_don_diff != 0 {
            attrs.push(format!("sprop-max-don-diff={}", self.max_don_diff));
        }

        for (key, set) in [
            ("sprop-vps", &params.vps),
            ("sprop-sps", &params.sps),
            ("sprop-pps", &params.pps),
        ] {
            if let Some(set) = set {
                attrs.push(format!("{}={}", key, BASE64.encode(set)));
            }
        }

        attrs.join("; ")
    }
}

impl Default for H265Format {
    fn default() -> Self {
        Self::new(96)
    }
}

impl TrackFormat for H265Format {
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

    #[test]
    fn test_fmtp() {
        let format = H265Format::default().with_params(
            Some(Bytes::from_static(&[0x40, 0x01, 0x0C])),
            Some(Bytes::from_static(&[0x42, 0x01, 0x01])),
            Some(Bytes::from_static(&[0x44, 0x01, 0xC1])),
        );

        assert_eq!(
            format.fmtp(),
            "sprop-vps=QAEM; sprop-sps=QgEB; sprop-pps=RAHB"
        );
    }

    #[test]
    fn test_fmtp_max_don_diff() {
        let format = H265Format::new(97).max_don_diff(2);
        assert_eq!(format.fmtp(), "sprop-max-don-diff=2");
        assert_eq!(format.payload_type(), 97);
    }

    #[test]
    fn test_set_params() {
        let format = H265Format::default();
        format.set_params(None, Some(Bytes::from_static(&[0x42, 0x01])), None);
        assert!(format.vps().is_none());
        assert_eq!(format.sps().as_deref(), Some(&[0x42, 0x01][..]));
    }
}
