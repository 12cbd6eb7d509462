use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// A point on (or span of) the simulated clock, in nanoseconds.
///
/// The virtual clock starts at zero and only ever moves forward, one event at
/// a time. Nanosecond resolution keeps link arithmetic exact for realistic
/// rates (a 96-bit interframe gap at 10 Mb/s is 9600 ns on the dot).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Time(u64);

impl Time {
    pub const ZERO: Time = Time(0);

    pub const fn from_nanos(ns: u64) -> Self {
        Time(ns)
    }

    pub const fn from_micros(us: u64) -> Self {
        Time(us * 1_000)
    }

    pub const fn from_millis(ms: u64) -> Self {
        Time(ms * 1_000_000)
    }

    pub const fn from_secs(s: u64) -> Self {
        Time(s * 1_000_000_000)
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        Time(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        *self = *self + rhs;
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        Time(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.0;
        if ns >= 1_000_000 && ns % 1_000 == 0 {
            // Large times read better in microseconds or milliseconds.
            if ns % 1_000_000 == 0 {
                write!(f, "{}ms", ns / 1_000_000)
            } else {
                write!(f, "{}us", ns / 1_000)
            }
        } else {
            write!(f, "{}ns", ns)
        }
    }
}

/// A link bit-rate in bits per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataRate(u64);

impl DataRate {
    pub const fn from_bps(bps: u64) -> Self {
        DataRate(bps)
    }

    pub const fn from_kbps(kbps: u64) -> Self {
        DataRate(kbps * 1_000)
    }

    pub const fn from_mbps(mbps: u64) -> Self {
        DataRate(mbps * 1_000_000)
    }

    pub const fn from_gbps(gbps: u64) -> Self {
        DataRate(gbps * 1_000_000_000)
    }

    pub const fn bps(self) -> u64 {
        self.0
    }

    /// Serialization time for `bytes` octets at this rate, truncated to whole
    /// nanoseconds. The intermediate product is carried in `u128` so large
    /// frames at low rates cannot overflow.
    pub fn tx_time(self, bytes: usize) -> Time {
        assert!(self.0 > 0, "tx_time on a zero data rate");
        let bits = bytes as u128 * 8;
        Time::from_nanos((bits * 1_000_000_000 / self.0 as u128) as u64)
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bps = self.0;
        if bps >= 1_000_000_000 && bps % 1_000_000_000 == 0 {
            write!(f, "{}Gbps", bps / 1_000_000_000)
        } else if bps >= 1_000_000 && bps % 1_000_000 == 0 {
            write!(f, "{}Mbps", bps / 1_000_000)
        } else if bps >= 1_000 && bps % 1_000 == 0 {
            write!(f, "{}kbps", bps / 1_000)
        } else {
            write!(f, "{}bps", bps)
        }
    }
}
