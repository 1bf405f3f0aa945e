//! Timestamps for frame headers and diagnostic ticks.
//!
//! Nanoseconds since the Unix epoch are the canonical unit. Every clock that
//! feeds the pipeline (system time, simulated time in tests) produces values on
//! this one scale, so declared and arrival stamps can be compared directly.

use std::fmt;
use std::ops::{Add, Sub};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A point in time, in nanoseconds since the Unix epoch.
///
/// A `u64` of nanoseconds covers roughly 584 years past 1970, which is
/// plenty for frame stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
#[cfg_attr(feature = "minicbor", cbor(transparent))]
pub struct Timestamp(#[cfg_attr(feature = "minicbor", n(0))] pub u64);

impl Timestamp {
    /// The Unix epoch.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Create from nanoseconds.
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000_000)
    }

    /// Create from whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * NANOS_PER_SEC)
    }

    /// Create from fractional seconds, rounded to the nearest nanosecond.
    ///
    /// Negative and NaN inputs clamp to [`Timestamp::ZERO`].
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_nan() || secs <= 0.0 {
            return Self::ZERO;
        }
        Self((secs * NANOS_PER_SEC as f64).round() as u64)
    }

    /// The current system time.
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    /// Get the value in nanoseconds.
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Get the value in fractional seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    /// Signed difference `self - earlier` in nanoseconds.
    ///
    /// Negative when `earlier` is actually later than `self`. Saturates at the
    /// `i64` range.
    pub fn signed_nanos_since(&self, earlier: Timestamp) -> i64 {
        let delta = self.0 as i128 - earlier.0 as i128;
        delta.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is later.
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    /// Step back by `d`, stopping at the epoch.
    pub fn saturating_sub(&self, d: Duration) -> Self {
        Self(self.0.saturating_sub(duration_nanos(d)))
    }

    /// Step forward by `d`, stopping at `u64::MAX` nanoseconds.
    pub fn saturating_add(&self, d: Duration) -> Self {
        Self(self.0.saturating_add(duration_nanos(d)))
    }

    /// Whether this is the epoch itself, usually an unset stamp.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

impl From<SystemTime> for Timestamp {
    fn from(t: SystemTime) -> Self {
        t.duration_since(UNIX_EPOCH)
            .map(|d| Self(duration_nanos(d)))
            .unwrap_or(Self::ZERO)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Duration) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.0 / NANOS_PER_SEC, self.0 % NANOS_PER_SEC)
    }
}
