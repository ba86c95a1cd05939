//! H.265 RTP payload format (RFC 7798)
//!
//! Only streams without decoding order numbers are handled
//! (`sprop-max-don-diff` = 0), so neither AP nor FU carry a DONL field.
//!
//! ```text
//! AP: | PayloadHdr (Type=48) | size (16) | NAL unit | size (16) | NAL unit | ... |
//! FU: | PayloadHdr (Type=49) | FU header (S|E|FuType) | fragment ... |
//! ```

use bytes::Bytes;

use crate::codec::h265::NaluType;
use crate::error::{DecodeError, EncodeError, FormatError};

use super::assembler::{split_aggregation, FragmentBuffer, FrameBuffer};
use super::writer::{aggregate, batches, fragment, PacketWriter};
use super::{DecodeOutcome, Depacketizer, Incomplete, Packet, Packetizer, PacketizerConfig};

const AGGREGATION: u8 = 48;
const FRAGMENTATION: u8 = 49;
const PACI: u8 = 50;

/// Smallest payload able to carry a FU fragment
const MIN_PAYLOAD_SIZE: usize = 4;

fn nal_type(b0: u8) -> u8 {
    (b0 >> 1) & 0x3F
}

/// H.265 depacketizer
#[derive(Debug, Default)]
pub struct Decoder {
    fragment: FragmentBuffer,
    frame: FrameBuffer,
}

impl Decoder {
    pub fn new(max_don_diff: u16) -> Result<Self, FormatError> {
        if max_don_diff != 0 {
            return Err(FormatError::UnsupportedMaxDonDiff(max_don_diff));
        }
        Ok(Self::default())
    }
}

impl Depacketizer for Decoder {
    fn decode(&mut self, pkt: &Packet) -> Result<DecodeOutcome, DecodeError> {
        let payload = &pkt.payload;
        if payload.len() < 2 {
            return Err(DecodeError::PayloadTooShort);
        }

        let nalus = match nal_type(payload[0]) {
            AGGREGATION => {
                self.fragment.reset();
                split_aggregation(payload.slice(2..))?
            }

            FRAGMENTATION => {
                if payload.len() < 3 {
                    self.fragment.reset();
                    return Err(DecodeError::InvalidFragment("invalid size"));
                }

                let start = payload[2] & 0x80 != 0;
                let end = payload[2] & 0x40 != 0;
                let seq = pkt.header.sequence_number;

                if start {
                    if end {
                        self.fragment.reset();
                        return Err(DecodeError::InvalidFragment(
                            "can't contain both a start and end bit",
                        ));
                    }
                    let typ = payload[2] & 0x3F;
                    let header = [(payload[0] & 0x81) | (typ << 1), payload[1]];
                    self.fragment.start(&header, &payload[3..], seq);
                    return Ok(DecodeOutcome::Incomplete(Incomplete::MorePacketsNeeded));
                }

                if !self.fragment.is_active() {
                    return Ok(DecodeOutcome::Incomplete(
                        Incomplete::NonStartingPacketAndNoPrevious,
                    ));
                }

                if let Err(e) = self.fragment.push(&payload[3..], seq) {
                    self.frame.reset();
                    return Err(e);
                }

                if !end {
                    return Ok(DecodeOutcome::Incomplete(Incomplete::MorePacketsNeeded));
                }

                vec![self.fragment.finish()]
            }

            PACI => {
                self.fragment.reset();
                return Err(DecodeError::UnsupportedPacketType(PACI));
            }

            _ => {
                self.fragment.reset();
                vec![payload.clone()]
            }
        };

        self.frame.push(nalus, pkt.header.marker)
    }
}

/// H.265 packetizer
#[derive(Debug)]
pub struct Encoder {
    writer: PacketWriter,
    payload_max_size: usize,
}

impl Encoder {
    pub fn new(config: PacketizerConfig, max_don_diff: u16) -> Result<Self, FormatError> {
        if max_don_diff != 0 {
            return Err(FormatError::UnsupportedMaxDonDiff(max_don_diff));
        }
        if config.payload_max_size < MIN_PAYLOAD_SIZE {
            return Err(FormatError::PayloadSizeTooSmall {
                size: config.payload_max_size,
                min: MIN_PAYLOAD_SIZE,
            });
        }

        Ok(Self {
            writer: PacketWriter::new(&config),
            payload_max_size: config.payload_max_size,
        })
    }

    pub fn ssrc(&self) -> u32 {
        self.writer.ssrc()
    }

    pub fn next_sequence_number(&self) -> u16 {
        self.writer.next_sequence_number()
    }
}

fn layer_id(nalu: &[u8]) -> u8 {
    ((nalu[0] & 0x01) << 5) | (nalu[1] >> 3)
}

/// AP payload header: F is set if any unit has it, LayerId and TID are the
/// lowest among the units
fn aggregation_header(group: &[Bytes]) -> [u8; 2] {
    let f = group.iter().fold(0, |acc, n| acc | (n[0] & 0x80));
    let layer = group.iter().map(|n| layer_id(n)).min().unwrap_or(0);
    let tid = group.iter().map(|n| n[1] & 0x07).min().unwrap_or(0);

    [f | (AGGREGATION << 1) | (layer >> 5), ((layer & 0x1F) << 3) | tid]
}

fn fragment_nalu(nalu: &Bytes, max: usize) -> Vec<Bytes> {
    let header = [(nalu[0] & 0x81) | (FRAGMENTATION << 1), nalu[1]];
    let typ = nal_type(nalu[0]);

    fragment(&header, &nalu[2..], max - 3, |start, end| {
        (start as u8) << 7 | (end as u8) << 6 | typ
    })
}

impl Packetizer for Encoder {
    fn encode(&mut self, au: &[Bytes]) -> Result<Vec<Packet>, EncodeError> {
        if au.is_empty() {
            return Err(EncodeError::EmptyAccessUnit);
        }
        if let Some(nalu) = au.iter().find(|n| n.len() < 2) {
            return Err(EncodeError::NaluTooShort(nalu.len()));
        }

        let max = self.payload_max_size;
        let mut payloads = Vec::new();

        for range in batches(au, 2, max) {
            let group = &au[range];

            if let [nalu] = group {
                if nalu.len() <= max {
                    payloads.push(nalu.clone());
                } else {
                    payloads.extend(fragment_nalu(nalu, max));
                }
                continue;
            }

            payloads.push(aggregate(&aggregation_header(group), group));
        }

        tracing::trace!(
            nalus = au.len(),
            packets = payloads.len(),
            keyframe = au.iter().any(|n| NaluType::from_byte(n[0]).is_some_and(|t| t.is_keyframe())),
            "H265 access unit packetized"
        );

        Ok(self.writer.write_access_unit(payloads))
    }
}
