//! H.264 RTP payload format (RFC 6184)
//!
//! Packetization mode 0 sends one NAL unit per packet. Mode 1 adds STAP-A
//! aggregation and FU-A fragmentation:
//!
//! ```text
//! FU-A:   | FU indicator (F|NRI|28) | FU header (S|E|R|Type) | fragment ... |
//! STAP-A: | F|NRI|24 | size (16) | NAL unit | size (16) | NAL unit | ... |
//! ```

use bytes::Bytes;

use crate::codec::h264::NaluType;
use crate::error::{DecodeError, EncodeError, FormatError};

use super::assembler::{split_aggregation, FragmentBuffer, FrameBuffer};
use super::writer::{aggregate, batches, fragment, PacketWriter};
use super::{DecodeOutcome, Depacketizer, Incomplete, Packet, Packetizer, PacketizerConfig};

const STAP_A: u8 = 24;
const FU_A: u8 = 28;

/// Smallest payload able to carry a FU-A fragment
const MIN_PAYLOAD_SIZE: usize = 3;

/// H.264 depacketizer
#[derive(Debug, Default)]
pub struct Decoder {
    fragment: FragmentBuffer,
    frame: FrameBuffer,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Depacketizer for Decoder {
    fn decode(&mut self, pkt: &Packet) -> Result<DecodeOutcome, DecodeError> {
        let payload = &pkt.payload;
        if payload.is_empty() {
            return Err(DecodeError::PayloadTooShort);
        }

        let nalus = match payload[0] & 0x1F {
            FU_A => {
                if payload.len() < 2 {
                    self.fragment.reset();
                    return Err(DecodeError::InvalidFragment("invalid size"));
                }

                let start = payload[1] & 0x80 != 0;
                let end = payload[1] & 0x40 != 0;
                let seq = pkt.header.sequence_number;

                if start {
                    if end {
                        self.fragment.reset();
                        return Err(DecodeError::InvalidFragment(
                            "can't contain both a start and end bit",
                        ));
                    }
                    let header = (payload[0] & 0xE0) | (payload[1] & 0x1F);
                    self.fragment.start(&[header], &payload[2..], seq);
                    return Ok(DecodeOutcome::Incomplete(Incomplete::MorePacketsNeeded));
                }

                if !self.fragment.is_active() {
                    return Ok(DecodeOutcome::Incomplete(
                        Incomplete::NonStartingPacketAndNoPrevious,
                    ));
                }

                if let Err(e) = self.fragment.push(&payload[2..], seq) {
                    self.frame.reset();
                    return Err(e);
                }

                if !end {
                    return Ok(DecodeOutcome::Incomplete(Incomplete::MorePacketsNeeded));
                }

                vec![self.fragment.finish()]
            }

            STAP_A => {
                self.fragment.reset();
                split_aggregation(payload.slice(1..))?
            }

            typ @ (25 | 26 | 27 | 29) => {
                self.fragment.reset();
                return Err(DecodeError::UnsupportedPacketType(typ));
            }

            _ => {
                self.fragment.reset();
                vec![payload.clone()]
            }
        };

        self.frame.push(nalus, pkt.header.marker)
    }
}

/// H.264 packetizer
#[derive(Debug)]
pub struct Encoder {
    writer: PacketWriter,
    payload_max_size: usize,
    packetization_mode: u8,
}

impl Encoder {
    pub fn new(config: PacketizerConfig, packetization_mode: u8) -> Result<Self, FormatError> {
        if packetization_mode >= 2 {
            return Err(FormatError::UnsupportedPacketizationMode(packetization_mode));
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
            packetization_mode,
        })
    }

    pub fn ssrc(&self) -> u32 {
        self.writer.ssrc()
    }

    pub fn next_sequence_number(&self) -> u16 {
        self.writer.next_sequence_number()
    }

    fn single_nal_unit(&self, au: &[Bytes]) -> Result<Vec<Bytes>, EncodeError> {
        au.iter()
            .map(|nalu| {
                if nalu.len() > self.payload_max_size {
                    return Err(EncodeError::NaluTooBig {
                        size: nalu.len(),
                        max: self.payload_max_size,
                    });
                }
                Ok(nalu.clone())
            })
            .collect()
    }

    fn non_interleaved(&self, au: &[Bytes]) -> Vec<Bytes> {
        let max = self.payload_max_size;
        let mut payloads = Vec::new();

        for range in batches(au, 1, max) {
            let group = &au[range];

            if let [nalu] = group {
                if nalu.len() <= max {
                    payloads.push(nalu.clone());
                } else {
                    payloads.extend(fragment_nalu(nalu, max));
                }
                continue;
            }

            let f = group.iter().fold(0, |acc, n| acc | (n[0] & 0x80));
            let nri = group.iter().map(|n| n[0] & 0x60).max().unwrap_or(0);
            payloads.push(aggregate(&[f | nri | STAP_A], group));
        }

        payloads
    }
}

fn fragment_nalu(nalu: &Bytes, max: usize) -> Vec<Bytes> {
    let indicator = (nalu[0] & 0xE0) | FU_A;
    let typ = nalu[0] & 0x1F;

    fragment(&[indicator], &nalu[1..], max - 2, |start, end| {
        (start as u8) << 7 | (end as u8) << 6 | typ
    })
}

impl Packetizer for Encoder {
    fn encode(&mut self, au: &[Bytes]) -> Result<Vec<Packet>, EncodeError> {
        if au.is_empty() {
            return Err(EncodeError::EmptyAccessUnit);
        }
        if let Some(nalu) = au.iter().find(|n| n.is_empty()) {
            return Err(EncodeError::NaluTooShort(nalu.len()));
        }

        let payloads = if self.packetization_mode == 0 {
            self.single_nal_unit(au)?
        } else {
            self.non_interleaved(au)
        };

        tracing::trace!(
            nalus = au.len(),
            packets = payloads.len(),
            keyframe = au.iter().any(|n| NaluType::from_byte(n[0]).is_some_and(|t| t.is_keyframe())),
            "H264 access unit packetized"
        );

        Ok(self.writer.write_access_unit(payloads))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtp::Header;

    fn packet(seq: u16, marker: bool, payload: &[u8]) -> Packet {
        Packet::new(
            Header {
                marker,
                payload_type: 96,
                sequence_number: seq,
                ssrc: 0x1234,
                ..Default::default()
            },
            Bytes::copy_from_slice(payload),
        )
    }

    fn encoder(max: usize, mode: u8) -> Encoder {
        Encoder::new(PacketizerConfig::new(96, max).continuing(0xCAFE, 100), mode).unwrap()
    }

    #[test]
    fn test_decode_single() {
        let mut decoder = Decoder::new();
        let outcome = decoder.decode(&packet(1, true, &[0x65, 0x88])).unwrap();
        assert_eq!(
            outcome,
            DecodeOutcome::Complete(vec![Bytes::from_static(&[0x65, 0x88])])
        );
    }

    #[test]
    fn test_decode_waits_for_marker() {
        let mut decoder = Decoder::new();
        let outcome = decoder.decode(&packet(1, false, &[0x67, 0x42])).unwrap();
        assert_eq!(
            outcome,
            DecodeOutcome::Incomplete(Incomplete::MorePacketsNeeded)
        );

        let outcome = decoder.decode(&packet(2, true, &[0x65, 0x88])).unwrap();
        assert_eq!(
            outcome,
            DecodeOutcome::Complete(vec![
                Bytes::from_static(&[0x67, 0x42]),
                Bytes::from_static(&[0x65, 0x88])
            ])
        );
    }

    #[test]
    fn test_decode_stap_a() {
        let mut decoder = Decoder::new();
        let payload = [0x18, 0x00, 0x02, 0x67, 0x42, 0x00, 0x02, 0x68, 0xCE];
        let outcome = decoder.decode(&packet(1, true, &payload)).unwrap();
        assert_eq!(
            outcome,
            DecodeOutcome::Complete(vec![
                Bytes::from_static(&[0x67, 0x42]),
                Bytes::from_static(&[0x68, 0xCE])
            ])
        );
    }

    #[test]
    fn test_decode_fu_a() {
        let mut decoder = Decoder::new();

        let outcome = decoder.decode(&packet(10, false, &[0x7C, 0x85, 1, 2])).unwrap();
        assert_eq!(
            outcome,
            DecodeOutcome::Incomplete(Incomplete::MorePacketsNeeded)
        );
        let outcome = decoder.decode(&packet(11, false, &[0x7C, 0x05, 3])).unwrap();
        assert_eq!(
            outcome,
            DecodeOutcome::Incomplete(Incomplete::MorePacketsNeeded)
        );
        let outcome = decoder.decode(&packet(12, true, &[0x7C, 0x45, 4])).unwrap();
        assert_eq!(
            outcome,
            DecodeOutcome::Complete(vec![Bytes::from_static(&[0x65, 1, 2, 3, 4])])
        );
    }

    #[test]
    fn test_decode_fu_a_without_start() {
        let mut decoder = Decoder::new();
        let outcome = decoder.decode(&packet(11, false, &[0x7C, 0x05, 3])).unwrap();
        assert_eq!(
            outcome,
            DecodeOutcome::Incomplete(Incomplete::NonStartingPacketAndNoPrevious)
        );
    }

    #[test]
    fn test_decode_fu_a_packet_lost() {
        let mut decoder = Decoder::new();
        decoder.decode(&packet(10, false, &[0x7C, 0x85, 1])).unwrap();

        let err = decoder.decode(&packet(12, true, &[0x7C, 0x45, 4])).unwrap_err();
        assert_eq!(err, DecodeError::PacketLost { expected: 11, got: 12 });

        // assembly starts over
        let outcome = decoder.decode(&packet(13, true, &[0x7C, 0x45, 5])).unwrap();
        assert_eq!(
            outcome,
            DecodeOutcome::Incomplete(Incomplete::NonStartingPacketAndNoPrevious)
        );
    }

    #[test]
    fn test_decode_errors() {
        let mut decoder = Decoder::new();
        assert_eq!(
            decoder.decode(&packet(1, true, &[])).unwrap_err(),
            DecodeError::PayloadTooShort
        );
        assert_eq!(
            decoder.decode(&packet(1, true, &[0x7C])).unwrap_err(),
            DecodeError::InvalidFragment("invalid size")
        );
        assert!(decoder.decode(&packet(1, true, &[0x7C, 0xC5, 1])).is_err());
        assert_eq!(
            decoder.decode(&packet(1, true, &[0x19, 0x00])).unwrap_err(),
            DecodeError::UnsupportedPacketType(25)
        );
        assert!(decoder.decode(&packet(1, true, &[0x18, 0x00, 0x09, 0x67])).is_err());
    }

    #[test]
    fn test_encoder_config() {
        assert_eq!(
            Encoder::new(PacketizerConfig::new(96, 1200), 2).unwrap_err(),
            FormatError::UnsupportedPacketizationMode(2)
        );
        assert!(Encoder::new(PacketizerConfig::new(96, 2), 1).is_err());

        let encoder = encoder(1200, 1);
        assert_eq!(encoder.ssrc(), 0xCAFE);
        assert_eq!(encoder.next_sequence_number(), 100);
    }

    #[test]
    fn test_encode_aggregates_small_nalus() {
        let mut encoder = encoder(1200, 1);
        let au = vec![
            Bytes::from_static(&[0x67, 0x42]),
            Bytes::from_static(&[0x68, 0xCE]),
            Bytes::from_static(&[0x65, 0x88]),
        ];

        let packets = encoder.encode(&au).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(
            &packets[0].payload[..],
            &[0x78, 0x00, 0x02, 0x67, 0x42, 0x00, 0x02, 0x68, 0xCE, 0x00, 0x02, 0x65, 0x88]
        );
        assert!(packets[0].header.marker);
        assert_eq!(packets[0].header.sequence_number, 100);
        assert_eq!(packets[0].header.timestamp, 0);
    }

    #[test]
    fn test_encode_fragments_large_nalu() {
        let mut encoder = encoder(10, 1);
        let mut nalu = vec![0x65];
        nalu.extend(1..=20u8);

        let packets = encoder.encode(&[Bytes::from(nalu.clone())]).unwrap();
        assert_eq!(packets.len(), 3);
        assert!(packets.iter().all(|p| p.payload.len() <= 10));
        assert_eq!(packets[0].payload[..2], [0x7C, 0x85]);
        assert_eq!(packets[1].payload[..2], [0x7C, 0x05]);
        assert_eq!(packets[2].payload[..2], [0x7C, 0x45]);
        assert!(!packets[0].header.marker);
        assert!(packets[2].header.marker);
        assert_eq!(
            packets.iter().map(|p| p.header.sequence_number).collect::<Vec<_>>(),
            vec![100, 101, 102]
        );

        let mut decoder = Decoder::new();
        let mut outcome = None;
        for pkt in &packets {
            outcome = Some(decoder.decode(pkt).unwrap());
        }
        assert_eq!(outcome, Some(DecodeOutcome::Complete(vec![Bytes::from(nalu)])));
    }

    #[test]
    fn test_encode_long_nalu_not_aggregated() {
        let mut encoder = encoder(200_000, 1);
        let mut idr = vec![0x65];
        idr.resize(70_000, 0x11);
        let au = vec![Bytes::from(idr), Bytes::from_static(&[0x41, 0x9A])];

        let packets = encoder.encode(&au).unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].payload.len(), 70_000);
        assert_eq!(&packets[1].payload[..], &[0x41, 0x9A]);

        let mut decoder = Decoder::new();
        let mut outcome = None;
        for pkt in &packets {
            outcome = Some(decoder.decode(pkt).unwrap());
        }
        assert_eq!(outcome, Some(DecodeOutcome::Complete(au)));
    }

    #[test]
    fn test_encode_single_nal_unit_mode() {
        let mut encoder = encoder(4, 0);
        let au = vec![
            Bytes::from_static(&[0x67, 0x42]),
            Bytes::from_static(&[0x65, 0x88]),
        ];
        let packets = encoder.encode(&au).unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(&packets[0].payload[..], &[0x67, 0x42]);
        assert!(!packets[0].header.marker);
        assert!(packets[1].header.marker);

        let err = encoder
            .encode(&[Bytes::from_static(&[0x65, 1, 2, 3, 4])])
            .unwrap_err();
        assert_eq!(err, EncodeError::NaluTooBig { size: 5, max: 4 });
    }

    #[test]
    fn test_encode_errors() {
        let mut encoder = encoder(1200, 1);
        assert_eq!(encoder.encode(&[]).unwrap_err(), EncodeError::EmptyAccessUnit);
        assert_eq!(
            encoder.encode(&[Bytes::new()]).unwrap_err(),
            EncodeError::NaluTooShort(0)
        );
    }
}
