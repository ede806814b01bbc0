//! Tick time model.
//!
//! Every timestamp in Slidecast is an integer number of nanosecond ticks.
//! User-facing values arrive as decimal seconds (`"12.345"`) and are
//! converted with [`to_ticks`], which rounds on the decimal digits before
//! scaling so binary floating-point never touches the timeline.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// Ticks per second (nanosecond resolution).
pub const TICKS_PER_SECOND: u64 = 1_000_000_000;

/// Default number of fractional digits kept by [`to_ticks`].
pub const DEFAULT_ROUNDING_DIGITS: u32 = 3;

/// Largest supported rounding precision; finer digits are below one tick.
const MAX_ROUNDING_DIGITS: u32 = 9;

/// A point or span on the timeline, in nanosecond ticks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Whole seconds as ticks, saturating at the largest tick.
    pub const fn from_secs(secs: u64) -> Self {
        Tick(secs.saturating_mul(TICKS_PER_SECOND))
    }

    /// Whole seconds as ticks, or `None` if they do not fit.
    pub const fn checked_from_secs(secs: u64) -> Option<Self> {
        match secs.checked_mul(TICKS_PER_SECOND) {
            Some(ticks) => Some(Tick(ticks)),
            None => None,
        }
    }

    /// Raw tick count.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Approximate seconds, for display only.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / TICKS_PER_SECOND as f64
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_sub(self, rhs: Tick) -> Tick {
        Tick(self.0.saturating_sub(rhs.0))
    }
}

/// Saturates at the largest tick.
impl Add for Tick {
    type Output = Tick;

    fn add(self, rhs: Tick) -> Tick {
        Tick(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Tick {
    fn add_assign(&mut self, rhs: Tick) {
        *self = *self + rhs;
    }
}

/// Saturates at zero: spans on the timeline are never negative.
impl Sub for Tick {
    type Output = Tick;

    fn sub(self, rhs: Tick) -> Tick {
        self.saturating_sub(rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / TICKS_PER_SECOND;
        let nanos = self.0 % TICKS_PER_SECOND;
        write!(f, "{secs}.{:03}s", nanos / 1_000_000)
    }
}

/// A half-open `[start, end)` span of ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Tick,
    pub end: Tick,
}

impl TimeRange {
    pub fn new(start: Tick, end: Tick) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Tick {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Intersection of two ranges, `None` when they do not overlap.
    pub fn intersect(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(TimeRange { start, end })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The portion of the source recording that is rendered.
///
/// Invariant: `start < end <= presentation_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrimWindow {
    pub start: Tick,
    pub end: Tick,
}

impl TrimWindow {
    /// Build a trim window, checking it against the presentation length.
    pub fn new(start: Tick, end: Tick, presentation_length: Tick) -> Result<Self, TimeParseError> {
        if start >= end {
            return Err(TimeParseError::InvalidTrim {
                start,
                end,
                reason: "start must be before end",
            });
        }
        if end > presentation_length {
            return Err(TimeParseError::InvalidTrim {
                start,
                end,
                reason: "end is past the end of the presentation",
            });
        }
        Ok(Self { start, end })
    }

    /// The whole presentation.
    pub fn full(presentation_length: Tick) -> Self {
        Self {
            start: Tick::ZERO,
            end: presentation_length,
        }
    }

    pub fn duration(&self) -> Tick {
        self.end - self.start
    }

    pub fn as_range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

/// Errors from decimal time parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("malformed time value {value:?}")]
    Malformed { value: String },

    #[error("negative time value {value:?}")]
    Negative { value: String },

    #[error("time value {value:?} is out of range")]
    Overflow { value: String },

    #[error("rounding to {digits} digits is finer than one tick")]
    Precision { digits: u32 },

    #[error("invalid trim window {start}..{end}: {reason}")]
    InvalidTrim {
        start: Tick,
        end: Tick,
        reason: &'static str,
    },
}

/// Convert decimal seconds to ticks with the default 3-digit rounding.
pub fn to_ticks(value: &str) -> Result<Tick, TimeParseError> {
    to_ticks_rounded(value, DEFAULT_ROUNDING_DIGITS)
}

/// Convert decimal seconds to ticks.
///
/// The decimal string is rounded to `rounding_digits` fractional digits
/// using round-half-to-even on its digits, then scaled to ticks. So
/// `"1.2345"` becomes 1.234 s and `"1.2355"` becomes 1.236 s.
pub fn to_ticks_rounded(value: &str, rounding_digits: u32) -> Result<Tick, TimeParseError> {
    if rounding_digits > MAX_ROUNDING_DIGITS {
        return Err(TimeParseError::Precision {
            digits: rounding_digits,
        });
    }

    let malformed = || TimeParseError::Malformed {
        value: value.to_string(),
    };
    let overflow = || TimeParseError::Overflow {
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let unsigned = match trimmed.strip_prefix('-') {
        Some(rest) => {
            if rest.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
                return Err(TimeParseError::Negative {
                    value: value.to_string(),
                });
            }
            rest
        }
        None => trimmed.strip_prefix('+').unwrap_or(trimmed),
    };

    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(malformed());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(malformed());
    }

    let digits = rounding_digits as usize;
    let scale = 10u64.pow(rounding_digits);

    let mut units: u64 = 0;
    for b in int_part.bytes() {
        units = units
            .checked_mul(10)
            .and_then(|u| u.checked_add(u64::from(b - b'0')))
            .ok_or_else(overflow)?;
    }
    units = units.checked_mul(scale).ok_or_else(overflow)?;

    let frac = frac_part.as_bytes();
    let mut kept: u64 = 0;
    for i in 0..digits {
        let digit = frac.get(i).map(|b| u64::from(b - b'0')).unwrap_or(0);
        kept = kept * 10 + digit;
    }
    units = units.checked_add(kept).ok_or_else(overflow)?;

    if frac.len() > digits {
        let first_dropped = frac[digits] - b'0';
        let rest_nonzero = frac[digits + 1..].iter().any(|&b| b != b'0');
        let round_up = match first_dropped {
            0..=4 => false,
            5 if !rest_nonzero => units % 2 == 1,
            _ => true,
        };
        if round_up {
            units = units.checked_add(1).ok_or_else(overflow)?;
        }
    }

    units
        .checked_mul(TICKS_PER_SECOND / scale)
        .map(Tick)
        .ok_or_else(overflow)
}
