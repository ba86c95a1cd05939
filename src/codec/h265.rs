//! H.265/HEVC NAL units
//!
//! NAL unit header:
//! ```text
//! +---------------+---------------+
//! |0|1|2|3|4|5|6|7|0|1|2|3|4|5|6|7|
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |F|   Type    |  LayerId  | TID |
//! +-------------+-----------------+
//! ```
//!
//! RFC 7798 assigns 48 to aggregation packets, 49 to fragmentation units
//! and 50 to PACI packets.

use crate::error::FormatError;
use crate::format::{H265Format, ParamKind};
use crate::rtp::h265::{Decoder, Encoder};
use crate::rtp::PacketizerConfig;

use super::{CodecKind, NalKind, VideoCodec};

/// NAL unit type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaluType {
    TrailN = 0,
    TrailR = 1,
    TsaN = 2,
    TsaR = 3,
    StsaN = 4,
    StsaR = 5,
    RadlN = 6,
    RadlR = 7,
    RaslN = 8,
    RaslR = 9,
    BlaWLp = 16,
    BlaWRadl = 17,
    BlaNLp = 18,
    /// IDR picture that may have leading RADL pictures
    IdrWRadl = 19,
    /// IDR picture without leading pictures
    IdrNLp = 20,
    /// Clean random access
    Cra = 21,
    /// Video parameter set
    Vps = 32,
    /// Sequence parameter set
    Sps = 33,
    /// Picture parameter set
    Pps = 34,
    /// Access unit delimiter
    Aud = 35,
    EndOfSequence = 36,
    EndOfBitstream = 37,
    FillerData = 38,
    PrefixSei = 39,
    SuffixSei = 40,
    /// Aggregation packet
    Aggregation = 48,
    /// Fragmentation unit
    Fragmentation = 49,
    /// Payload content information
    Paci = 50,
}

impl NaluType {
    /// Read the type from the first header byte
    pub fn from_byte(b: u8) -> Option<Self> {
        match (b >> 1) & 0x3F {
            0 => Some(NaluType::TrailN),
            1 => Some(NaluType::TrailR),
            2 => Some(NaluType::TsaN),
            3 => Some(NaluType::TsaR),
            4 => Some(NaluType::StsaN),
            5 => Some(NaluType::StsaR),
            6 => Some(NaluType::RadlN),
            7 => Some(NaluType::RadlR),
            8 => Some(NaluType::RaslN),
            9 => Some(NaluType::RaslR),
            16 => Some(NaluType::BlaWLp),
            17 => Some(NaluType::BlaWRadl),
            18 => Some(NaluType::BlaNLp),
            19 => Some(NaluType::IdrWRadl),
            20 => Some(NaluType::IdrNLp),
            21 => Some(NaluType::Cra),
            32 => Some(NaluType::Vps),
            33 => Some(NaluType::Sps),
            34 => Some(NaluType::Pps),
            35 => Some(NaluType::Aud),
            36 => Some(NaluType::EndOfSequence),
            37 => Some(NaluType::EndOfBitstream),
            38 => Some(NaluType::FillerData),
            39 => Some(NaluType::PrefixSei),
            40 => Some(NaluType::SuffixSei),
            48 => Some(NaluType::Aggregation),
            49 => Some(NaluType::Fragmentation),
            50 => Some(NaluType::Paci),
            _ => None,
        }
    }

    /// Pictures a receiver can start decoding from
    pub fn is_keyframe(&self) -> bool {
        matches!(self, NaluType::IdrWRadl | NaluType::IdrNLp | NaluType::Cra)
    }
}

/// H.265 capability set
#[derive(Debug, Clone, Copy, Default)]
pub struct H265;

impl VideoCodec for H265 {
    const KIND: CodecKind = CodecKind::H265;
    const HEADER_LEN: usize = 2;
    const PARAM_KINDS: &'static [ParamKind] = &[ParamKind::Vps, ParamKind::Sps, ParamKind::Pps];
    const STATEFUL_CLOCK: bool = true;

    type Format = H265Format;
    type Encoder = Encoder;
    type Decoder = Decoder;

    fn classify(nalu: &[u8]) -> NalKind {
        let Some(&header) = nalu.first() else {
            return NalKind::Other;
        };

        match NaluType::from_byte(header) {
            Some(NaluType::Vps) => NalKind::ParameterSet(ParamKind::Vps),
            Some(NaluType::Sps) => NalKind::ParameterSet(ParamKind::Sps),
            Some(NaluType::Pps) => NalKind::ParameterSet(ParamKind::Pps),
            Some(NaluType::Aud) => NalKind::Delimiter,
            Some(t) if t.is_keyframe() => NalKind::KeyFrame,
            Some(NaluType::Aggregation) => NalKind::Aggregation,
            Some(NaluType::Fragmentation) => NalKind::Fragment,
            _ => NalKind::Other,
        }
    }

    fn new_encoder(format: &H265Format, config: PacketizerConfig) -> Result<Encoder, FormatError> {
        Encoder::new(config, format.max_don_diff)
    }

    fn new_decoder(format: &H265Format) -> Result<Decoder, FormatError> {
        Decoder::new(format.max_don_diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nalu_type() {
        assert_eq!(NaluType::from_byte(0x40), Some(NaluType::Vps));
        assert_eq!(NaluType::from_byte(0x42), Some(NaluType::Sps));
        assert_eq!(NaluType::from_byte(0x44), Some(NaluType::Pps));
        assert_eq!(NaluType::from_byte(0x46), Some(NaluType::Aud));
        assert_eq!(NaluType::from_byte(0x26), Some(NaluType::IdrWRadl));
        assert_eq!(NaluType::from_byte(0x28), Some(NaluType::IdrNLp));
        assert_eq!(NaluType::from_byte(0x2A), Some(NaluType::Cra));
        assert_eq!(NaluType::from_byte(0x02), Some(NaluType::TrailR));
        assert_eq!(NaluType::from_byte(0x60), Some(NaluType::Aggregation));
        assert_eq!(NaluType::from_byte(0x62), Some(NaluType::Fragmentation));
        // forbidden bit and layer id MSB are not part of the type
        assert_eq!(NaluType::from_byte(0xC3), Some(NaluType::Sps));
        assert_eq!(NaluType::from_byte(0x16), None);
    }

    #[test]
    fn test_keyframes() {
        assert!(NaluType::IdrWRadl.is_keyframe());
        assert!(NaluType::IdrNLp.is_keyframe());
        assert!(NaluType::Cra.is_keyframe());
        assert!(!NaluType::BlaWLp.is_keyframe());
        assert!(!NaluType::TrailR.is_keyframe());
    }

    #[test]
    fn test_classify() {
        assert_eq!(H265::classify(&[0x40, 0x01]), NalKind::ParameterSet(ParamKind::Vps));
        assert_eq!(H265::classify(&[0x42, 0x01]), NalKind::ParameterSet(ParamKind::Sps));
        assert_eq!(H265::classify(&[0x44, 0x01]), NalKind::ParameterSet(ParamKind::Pps));
        assert_eq!(H265::classify(&[0x46, 0x01]), NalKind::Delimiter);
        assert_eq!(H265::classify(&[0x2A, 0x01]), NalKind::KeyFrame);
        assert_eq!(H265::classify(&[0x60, 0x01]), NalKind::Aggregation);
        assert_eq!(H265::classify(&[0x62, 0x01]), NalKind::Fragment);
        assert_eq!(H265::classify(&[0x02, 0x01]), NalKind::Other);
        assert_eq!(H265::classify(&[]), NalKind::Other);
    }
}
