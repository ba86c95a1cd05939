//! RTP packet (RFC 3550)
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|X|  CC   |M|     PT      |       sequence number         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           timestamp                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           synchronization source (SSRC) identifier            |
//! +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
//! |            contributing source (CSRC) identifiers             |
//! |                             ....                              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::RtpError;

/// Size of the fixed RTP header
pub const HEADER_SIZE: usize = 12;

/// The only RTP version in use
pub const VERSION: u8 = 2;

/// RTP fixed header plus optional CSRC list and header extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    /// Profile-defined identifier of the header extension
    pub extension_profile: u16,
    /// Header extension body, a multiple of 4 bytes on the wire
    pub extension_payload: Bytes,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: VERSION,
            padding: false,
            extension: false,
            marker: false,
            payload_type: 0,
            sequence_number: 0,
            timestamp: 0,
            ssrc: 0,
            csrc: Vec::new(),
            extension_profile: 0,
            extension_payload: Bytes::new(),
        }
    }
}

impl Header {
    /// Size of the header once serialized
    pub fn marshal_size(&self) -> usize {
        let mut size = HEADER_SIZE + self.csrc.len() * 4;
        if self.extension {
            size += 4 + extension_words(&self.extension_payload) * 4;
        }
        size
    }
}

fn extension_words(payload: &Bytes) -> usize {
    payload.len().div_ceil(4)
}

/// A complete RTP packet
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    pub header: Header,
    pub payload: Bytes,
    /// Number of padding bytes, including the trailing count byte
    pub padding_size: u8,
}

impl Packet {
    /// Create a packet without padding
    pub fn new(header: Header, payload: Bytes) -> Self {
        Self {
            header,
            payload,
            padding_size: 0,
        }
    }

    /// Parse a packet from the wire
    pub fn unmarshal(mut data: Bytes) -> Result<Self, RtpError> {
        if data.len() < HEADER_SIZE {
            return Err(RtpError::TooShort(data.len()));
        }

        let b0 = data.get_u8();
        let version = b0 >> 6;
        if version != VERSION {
            return Err(RtpError::InvalidVersion(version));
        }
        let padding = b0 & 0x20 != 0;
        let extension = b0 & 0x10 != 0;
        let csrc_count = (b0 & 0x0F) as usize;

        let b1 = data.get_u8();
        let marker = b1 & 0x80 != 0;
        let payload_type = b1 & 0x7F;

        let sequence_number = data.get_u16();
        let timestamp = data.get_u32();
        let ssrc = data.get_u32();

        if data.len() < csrc_count * 4 {
            return Err(RtpError::InvalidCsrc);
        }
        let csrc = (0..csrc_count).map(|_| data.get_u32()).collect();

        let (extension_profile, extension_payload) = if extension {
            if data.len() < 4 {
                return Err(RtpError::InvalidExtension);
            }
            let profile = data.get_u16();
            let len = data.get_u16() as usize * 4;
            if data.len() < len {
                return Err(RtpError::InvalidExtension);
            }
            (profile, data.split_to(len))
        } else {
            (0, Bytes::new())
        };

        let padding_size = if padding {
            let count = data.last().copied().unwrap_or(0);
            if count == 0 || count as usize > data.len() {
                return Err(RtpError::InvalidPadding(count));
            }
            data.truncate(data.len() - count as usize);
            count
        } else {
            0
        };

        Ok(Self {
            header: Header {
                version,
                padding,
                extension,
                marker,
                payload_type,
                sequence_number,
                timestamp,
                ssrc,
                csrc,
                extension_profile,
                extension_payload,
            },
            payload: data,
            padding_size,
        })
    }

    /// Size of the packet once serialized, padding included
    pub fn marshal_size(&self) -> usize {
        self.header.marshal_size() + self.payload.len() + self.effective_padding()
    }

    fn effective_padding(&self) -> usize {
        if self.header.padding {
            self.padding_size as usize
        } else {
            0
        }
    }

    /// Serialize the packet
    pub fn marshal(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.marshal_size());
        let header = &self.header;
        let padding = self.effective_padding();

        let mut b0 = (header.version << 6) | (header.csrc.len() as u8 & 0x0F);
        if padding > 0 {
            b0 |= 0x20;
        }
        if header.extension {
            b0 |= 0x10;
        }
        buf.put_u8(b0);

        let mut b1 = header.payload_type & 0x7F;
        if header.marker {
            b1 |= 0x80;
        }
        buf.put_u8(b1);
        buf.put_u16(header.sequence_number);
        buf.put_u32(header.timestamp);
        buf.put_u32(header.ssrc);
        for csrc in header.csrc.iter().take(0x0F) {
            buf.put_u32(*csrc);
        }

        if header.extension {
            let words = extension_words(&header.extension_payload);
            buf.put_u16(header.extension_profile);
            buf.put_u16(words as u16);
            buf.put_slice(&header.extension_payload);
            buf.put_bytes(0, words * 4 - header.extension_payload.len());
        }

        buf.put_slice(&self.payload);

        if padding > 0 {
            buf.put_bytes(0, padding - 1);
            buf.put_u8(padding as u8);
        }

        buf.freeze()
    }

    /// Drop any padding so the packet is forwarded at its minimal size
    pub fn strip_padding(&mut self) {
        self.header.padding = false;
        self.padding_size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes() -> Bytes {
        Bytes::from_static(&[
            0x80, 0xE0, // V=2, M=1, PT=96
            0x12, 0x34, // sequence number
            0x00, 0x01, 0x5F, 0x90, // timestamp 90000
            0xDE, 0xAD, 0xBE, 0xEF, // SSRC
            0x65, 0x88, 0x84, // payload
        ])
    }

    #[test]
    fn test_unmarshal() {
        let pkt = Packet::unmarshal(sample_bytes()).unwrap();
        assert_eq!(pkt.header.version, 2);
        assert!(pkt.header.marker);
        assert_eq!(pkt.header.payload_type, 96);
        assert_eq!(pkt.header.sequence_number, 0x1234);
        assert_eq!(pkt.header.timestamp, 90000);
        assert_eq!(pkt.header.ssrc, 0xDEADBEEF);
        assert_eq!(&pkt.payload[..], &[0x65, 0x88, 0x84]);
        assert_eq!(pkt.marshal_size(), 15);
        assert_eq!(pkt.marshal(), sample_bytes());
    }

    #[test]
    fn test_unmarshal_padding() {
        let data = Bytes::from_static(&[
            0xA0, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, // header, P=1
            0x41, 0x9A, // payload
            0x00, 0x00, 0x03, // 3 bytes of padding
        ]);
        let mut pkt = Packet::unmarshal(data).unwrap();
        assert!(pkt.header.padding);
        assert_eq!(pkt.padding_size, 3);
        assert_eq!(&pkt.payload[..], &[0x41, 0x9A]);
        assert_eq!(pkt.marshal_size(), 17);

        pkt.strip_padding();
        assert_eq!(pkt.marshal_size(), 14);
        assert_eq!(pkt.marshal()[0], 0x80);
    }

    #[test]
    fn test_unmarshal_csrc_and_extension() {
        let data = Bytes::from_static(&[
            0x91, 0x60, 0x00, 0x02, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x01, // CC=1, X=1
            0x00, 0x00, 0x00, 0x07, // CSRC
            0xBE, 0xDE, 0x00, 0x01, // extension profile, 1 word
            0x10, 0xAA, 0x00, 0x00, // extension body
            0x67, // payload
        ]);
        let pkt = Packet::unmarshal(data.clone()).unwrap();
        assert_eq!(pkt.header.csrc, vec![7]);
        assert_eq!(pkt.header.extension_profile, 0xBEDE);
        assert_eq!(pkt.header.extension_payload.len(), 4);
        assert_eq!(&pkt.payload[..], &[0x67]);
        assert_eq!(pkt.marshal(), data);
    }

    #[test]
    fn test_unmarshal_errors() {
        assert_eq!(
            Packet::unmarshal(Bytes::from_static(&[0x80, 0x60])),
            Err(RtpError::TooShort(2))
        );

        let mut bad_version = sample_bytes().to_vec();
        bad_version[0] = 0x40;
        assert_eq!(
            Packet::unmarshal(Bytes::from(bad_version)),
            Err(RtpError::InvalidVersion(1))
        );

        let mut bad_csrc = sample_bytes().to_vec();
        bad_csrc[0] = 0x82;
        assert_eq!(
            Packet::unmarshal(Bytes::from(bad_csrc)),
            Err(RtpError::InvalidCsrc)
        );

        let mut bad_padding = sample_bytes().to_vec();
        bad_padding[0] = 0xA0;
        bad_padding.push(0x09);
        assert_eq!(
            Packet::unmarshal(Bytes::from(bad_padding)),
            Err(RtpError::InvalidPadding(9))
        );
    }
}
