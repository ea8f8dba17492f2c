//! Wall-clock time-of-day arithmetic.
//!
//! Times are carried as minutes since midnight and only formatted to
//! `"HH:MM"` at the edges (storage rows, JSON bodies, log lines). Ordering is
//! therefore numeric and never depends on the string representation.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Minutes in a day. `24:00` is a valid end-of-day bound.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("Invalid time format: '{0}' (expected HH:MM)")]
    InvalidTimeFormat(String),

    #[error("Time out of range: {0} minutes")]
    OutOfRange(i64),
}

/// A time of day as a linear minute offset from midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(MINUTES_PER_DAY);

    pub fn from_minutes(minutes: u16) -> Result<Self, TimeError> {
        if minutes > MINUTES_PER_DAY {
            return Err(TimeError::OutOfRange(minutes as i64));
        }
        Ok(Self(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Signed distance in minutes from `self` to `later`.
    pub fn minutes_until(self, later: TimeOfDay) -> i32 {
        later.0 as i32 - self.0 as i32
    }

    pub fn is_aligned_to(self, granularity_minutes: u16) -> bool {
        granularity_minutes != 0 && self.0 % granularity_minutes == 0
    }
}

/// Parses `"HH:MM"` into minutes since midnight.
pub fn to_minutes(time: &str) -> Result<u16, TimeError> {
    let invalid = || TimeError::InvalidTimeFormat(time.to_string());

    let bytes = time.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(invalid());
    }
    if !bytes[..2].iter().chain(&bytes[3..]).all(u8::is_ascii_digit) {
        return Err(invalid());
    }

    let hour: u16 = time[..2].parse().map_err(|_| invalid())?;
    let minute: u16 = time[3..].parse().map_err(|_| invalid())?;

    match (hour, minute) {
        (24, 0) => Ok(MINUTES_PER_DAY),
        (h, m) if h < 24 && m < 60 => Ok(h * 60 + m),
        _ => Err(invalid()),
    }
}

/// Formats minutes since midnight as zero-padded `"HH:MM"`.
pub fn to_time_string(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn add_minutes(time: TimeOfDay, delta: i32) -> Result<TimeOfDay, TimeError> {
    let total = time.0 as i64 + delta as i64;
    if !(0..=MINUTES_PER_DAY as i64).contains(&total) {
        return Err(TimeError::OutOfRange(total));
    }
    Ok(TimeOfDay(total as u16))
}

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`.
/// Intervals that merely touch do not overlap.
pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && a_end > b_start
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_time_string(self.0))
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        to_minutes(s).map(TimeOfDay)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_time_string(self.0))
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        // SQL `time` columns come back as HH:MM:SS
        let trimmed = match raw.len() {
            8 if raw.ends_with(":00") => &raw[..5],
            _ => raw.as_str(),
        };
        trimmed.parse().map_err(de::Error::custom)
    }
}
