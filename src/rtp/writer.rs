//! Packet emission shared by the packetizers

use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};

use super::{Header, Packet, PacketizerConfig};

/// Stamps payloads with the stream's identity and sequence numbers
#[derive(Debug)]
pub(crate) struct PacketWriter {
    payload_type: u8,
    ssrc: u32,
    sequence_number: u16,
}

impl PacketWriter {
    pub fn new(config: &PacketizerConfig) -> Self {
        Self {
            payload_type: config.payload_type,
            ssrc: config.ssrc.unwrap_or_else(rand::random),
            sequence_number: config
                .initial_sequence_number
                .unwrap_or_else(rand::random),
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn next_sequence_number(&self) -> u16 {
        self.sequence_number
    }

    /// Wrap a payload into the next packet of the stream, timestamp left at 0
    pub fn write(&mut self, payload: Bytes, marker: bool) -> Packet {
        let header = Header {
            marker,
            payload_type: self.payload_type,
            sequence_number: self.sequence_number,
            ssrc: self.ssrc,
            ..Default::default()
        };
        self.sequence_number = self.sequence_number.wrapping_add(1);
        Packet::new(header, payload)
    }

    /// Wrap the payloads of one access unit, marker on the last packet
    pub fn write_access_unit(&mut self, payloads: Vec<Bytes>) -> Vec<Packet> {
        let last = payloads.len().saturating_sub(1);
        payloads
            .into_iter()
            .enumerate()
            .map(|(i, payload)| self.write(payload, i == last))
            .collect()
    }
}

/// Split `body` into chunks of at most `avail` bytes, each prefixed by
/// `header` followed by a fragmentation header built by `fu_header(start, end)`
pub(crate) fn fragment(
    header: &[u8],
    body: &[u8],
    avail: usize,
    fu_header: impl Fn(bool, bool) -> u8,
) -> Vec<Bytes> {
    let count = body.len().div_ceil(avail).max(1);
    let mut out = Vec::with_capacity(count);

    for (i, chunk) in body.chunks(avail).enumerate() {
        let mut buf = Vec::with_capacity(header.len() + 1 + chunk.len());
        buf.extend_from_slice(header);
        buf.push(fu_header(i == 0, i == count - 1));
        buf.extend_from_slice(chunk);
        out.push(Bytes::from(buf));
    }

    out
}

/// Concatenate NAL units behind an aggregation header, each with a 16-bit
/// length prefix
pub(crate) fn aggregate(header: &[u8], nalus: &[Bytes]) -> Bytes {
    let size = header.len() + nalus.iter().map(|n| 2 + n.len()).sum::<usize>();
    let mut buf = BytesMut::with_capacity(size);
    buf.put_slice(header);
    for nalu in nalus {
        buf.put_u16(nalu.len() as u16);
        buf.put_slice(nalu);
    }
    buf.freeze()
}

/// Largest NAL unit a 16-bit length prefix can describe
const MAX_AGGREGATED_NALU_SIZE: usize = u16::MAX as usize;

/// Group consecutive NAL units that fit together in one aggregation packet.
///
/// A group holding one NAL unit is sent on its own (single NAL unit packet or
/// fragmentation units). Aggregated size is the aggregation header plus a
/// 16-bit length prefix per NAL unit, so NAL units too long for the prefix
/// always get a group of their own.
pub(crate) fn batches(au: &[Bytes], header_len: usize, max: usize) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut size = header_len;
    let mut open_is_lone = false;

    for (i, nalu) in au.iter().enumerate() {
        let added = 2 + nalu.len();
        let lone = nalu.len() > MAX_AGGREGATED_NALU_SIZE;
        if i > start && (lone || open_is_lone || size + added > max) {
            out.push(start..i);
            start = i;
            size = header_len;
        }
        size += added;
        open_is_lone = lone;
    }

    if start < au.len() {
        out.push(start..au.len());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_sequence_wraps() {
        let config = PacketizerConfig::new(96, 1200).continuing(0x1234, 65535);
        let mut writer = PacketWriter::new(&config);

        let first = writer.write(Bytes::from_static(&[0x65]), false);
        let second = writer.write(Bytes::from_static(&[0x65]), true);

        assert_eq!(first.header.sequence_number, 65535);
        assert_eq!(second.header.sequence_number, 0);
        assert_eq!(second.header.ssrc, 0x1234);
        assert_eq!(second.header.payload_type, 96);
        assert_eq!(second.header.timestamp, 0);
        assert!(second.header.marker);
        assert_eq!(writer.next_sequence_number(), 1);
    }

    #[test]
    fn test_batches() {
        let au = vec![
            Bytes::from(vec![0x67; 10]),
            Bytes::from(vec![0x68; 4]),
            Bytes::from(vec![0x65; 100]),
            Bytes::from(vec![0x41; 5]),
        ];

        // 1 + 12 + 6 = 19 fits, adding 102 more does not
        let groups = batches(&au, 1, 30);
        assert_eq!(groups, vec![0..2, 2..3, 3..4]);

        let groups = batches(&au, 1, 1000);
        assert_eq!(groups, vec![0..4]);
    }

    #[test]
    fn test_fragment() {
        let body = [1u8, 2, 3, 4, 5];
        let chunks = fragment(&[0x7C], &body, 2, |start, end| {
            (start as u8) << 7 | (end as u8) << 6 | 5
        });

        assert_eq!(chunks.len(), 3);
        assert_eq!(&chunks[0][..], &[0x7C, 0x85, 1, 2]);
        assert_eq!(&chunks[1][..], &[0x7C, 0x05, 3, 4]);
        assert_eq!(&chunks[2][..], &[0x7C, 0x45, 5]);
    }

    #[test]
    fn test_aggregate() {
        let nalus = [Bytes::from_static(&[0x67, 0x42]), Bytes::from_static(&[0x68])];
        let payload = aggregate(&[0x18], &nalus);
        assert_eq!(&payload[..], &[0x18, 0x00, 0x02, 0x67, 0x42, 0x00, 0x01, 0x68]);
    }

    #[test]
    fn test_batches_isolates_long_nalus() {
        let au = vec![
            Bytes::from(vec![0x67; 10]),
            Bytes::from(vec![0x65; 70_000]),
            Bytes::from(vec![0x41; 2]),
            Bytes::from(vec![0x41; 3]),
        ];

        let groups = batches(&au, 1, 200_000);
        assert_eq!(groups, vec![0..1, 1..2, 2..4]);
    }

    #[test]
    fn test_batches_empty() {
        assert!(batches(&[], 1, 1000).is_empty());
    }
}
