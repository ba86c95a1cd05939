//! RTP clock conversions
//!
//! Presentation timestamps are durations since stream start. RTP timestamps
//! are ticks of the codec clock (90 kHz for video), wrapping at 32 bits.

use std::time::Duration;

use crate::error::{Error, Result};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Compute `v * m / d` without overflowing on the intermediate product.
///
/// The division is split in two: the integer part of `v / d` is scaled
/// first, then the remainder. Results match the exact quotient truncated
/// toward zero, as long as the final value fits in an `i64`.
pub fn multiply_and_divide(v: i64, m: i64, d: i64) -> i64 {
    let secs = v / d;
    let dec = v % d;
    secs * m + dec * m / d
}

/// Convert a presentation timestamp into ticks of `clock_rate`, wrapped to 32 bits
pub fn duration_to_ticks(pts: Duration, clock_rate: u32) -> u32 {
    let nanos = i64::try_from(pts.as_nanos()).unwrap_or(i64::MAX);
    multiply_and_divide(nanos, clock_rate as i64, NANOS_PER_SEC) as u32
}

/// Stateful presentation timestamp to RTP timestamp encoder
///
/// Seeded once with an initial timestamp, it maps every PTS to
/// `initial + ticks(pts)` and refuses timestamps that go backwards.
#[derive(Debug, Clone)]
pub struct TimestampEncoder {
    clock_rate: u32,
    initial_timestamp: u32,
    last_pts: Option<Duration>,
}

impl TimestampEncoder {
    /// Create an encoder. A random initial timestamp is drawn when none is given.
    pub fn new(clock_rate: u32, initial_timestamp: Option<u32>) -> Self {
        Self {
            clock_rate,
            initial_timestamp: initial_timestamp.unwrap_or_else(rand::random),
            last_pts: None,
        }
    }

    pub fn clock_rate(&self) -> u32 {
        self.clock_rate
    }

    pub fn initial_timestamp(&self) -> u32 {
        self.initial_timestamp
    }

    /// Encode a presentation timestamp
    pub fn encode(&mut self, pts: Duration) -> Result<u32> {
        if let Some(previous) = self.last_pts {
            if pts < previous {
                return Err(Error::PtsRegression {
                    previous,
                    current: pts,
                });
            }
        }
        self.last_pts = Some(pts);

        Ok(self
            .initial_timestamp
            .wrapping_add(duration_to_ticks(pts, self.clock_rate)))
    }
}
