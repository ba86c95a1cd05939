//! Reassembly state shared by the depacketizers

use bytes::{Buf, Bytes, BytesMut};

use crate::error::DecodeError;

use super::{DecodeOutcome, Incomplete, MAX_ACCESS_UNIT_SIZE, MAX_NALUS_PER_ACCESS_UNIT};

/// Split the body of an aggregation packet into its NAL units
///
/// `data` starts right after the aggregation header. A zero length ends the
/// list early.
pub(crate) fn split_aggregation(mut data: Bytes) -> Result<Vec<Bytes>, DecodeError> {
    let mut nalus = Vec::new();

    loop {
        if data.len() < 2 {
            return Err(DecodeError::InvalidAggregation("invalid size"));
        }

        let size = data.get_u16() as usize;
        if size == 0 {
            break;
        }
        if size > data.len() {
            return Err(DecodeError::InvalidAggregation("NAL unit size exceeds payload"));
        }

        nalus.push(data.split_to(size));
        if data.is_empty() {
            break;
        }
    }

    if nalus.is_empty() {
        return Err(DecodeError::InvalidAggregation("no NAL units"));
    }

    Ok(nalus)
}

/// A NAL unit being rebuilt from fragmentation units
#[derive(Debug, Default)]
pub(crate) struct FragmentBuffer {
    data: BytesMut,
    next_sequence_number: u16,
    active: bool,
}

impl FragmentBuffer {
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Begin a new NAL unit, dropping any unfinished one
    pub fn start(&mut self, header: &[u8], body: &[u8], sequence_number: u16) {
        self.data.clear();
        self.data.extend_from_slice(header);
        self.data.extend_from_slice(body);
        self.next_sequence_number = sequence_number.wrapping_add(1);
        self.active = true;
    }

    /// Append a continuation fragment
    pub fn push(&mut self, body: &[u8], sequence_number: u16) -> Result<(), DecodeError> {
        if sequence_number != self.next_sequence_number {
            let expected = self.next_sequence_number;
            self.reset();
            return Err(DecodeError::PacketLost {
                expected,
                got: sequence_number,
            });
        }

        let size = self.data.len() + body.len();
        if size > MAX_ACCESS_UNIT_SIZE {
            self.reset();
            return Err(DecodeError::AccessUnitTooBig {
                size,
                max: MAX_ACCESS_UNIT_SIZE,
            });
        }

        self.data.extend_from_slice(body);
        self.next_sequence_number = sequence_number.wrapping_add(1);
        Ok(())
    }

    /// Hand out the rebuilt NAL unit
    pub fn finish(&mut self) -> Bytes {
        self.active = false;
        self.data.split().freeze()
    }

    pub fn reset(&mut self) {
        self.data.clear();
        self.active = false;
    }
}

/// NAL units of the access unit being assembled
#[derive(Debug, Default)]
pub(crate) struct FrameBuffer {
    nalus: Vec<Bytes>,
    size: usize,
}

impl FrameBuffer {
    /// Add the NAL units of one packet. On marker, the access unit is complete.
    pub fn push(&mut self, nalus: Vec<Bytes>, marker: bool) -> Result<DecodeOutcome, DecodeError> {
        let count = self.nalus.len() + nalus.len();
        if count > MAX_NALUS_PER_ACCESS_UNIT {
            self.reset();
            return Err(DecodeError::TooManyNalus {
                count,
                max: MAX_NALUS_PER_ACCESS_UNIT,
            });
        }

        let size = self.size + nalus.iter().map(Bytes::len).sum::<usize>();
        if size > MAX_ACCESS_UNIT_SIZE {
            self.reset();
            return Err(DecodeError::AccessUnitTooBig {
                size,
                max: MAX_ACCESS_UNIT_SIZE,
            });
        }

        self.nalus.extend(nalus);
        self.size = size;

        if !marker {
            return Ok(DecodeOutcome::Incomplete(Incomplete::MorePacketsNeeded));
        }

        self.size = 0;
        Ok(DecodeOutcome::Complete(std::mem::take(&mut self.nalus)))
    }

    pub fn reset(&mut self) {
        self.nalus.clear();
        self.size = 0;
    }
}
