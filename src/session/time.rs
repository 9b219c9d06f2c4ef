//! Session time base
//!
//! All timestamps in a session are ticks: nanoseconds since midnight of
//! the session day. Periodic channels never store per-sample timestamps;
//! a burst records its start tick and sample times follow from the
//! channel interval.

use serde::{Deserialize, Serialize};

/// Ticks per second (one tick is one nanosecond)
pub const TICKS_PER_SECOND: i64 = 1_000_000_000;

/// Ticks per millisecond
pub const TICKS_PER_MILLISECOND: i64 = 1_000_000;

/// Ticks in one day (sessions live within a single day)
pub const TICKS_PER_DAY: i64 = 86_400 * TICKS_PER_SECOND;

/// Sample rate of a periodic channel, stored as the tick interval
/// between consecutive samples
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Frequency {
    interval: i64,
}

impl Frequency {
    /// Create a frequency from a rate in hertz
    pub fn hz(hz: f64) -> Self {
        if hz <= 0.0 {
            return Self { interval: 0 };
        }
        Self {
            interval: (TICKS_PER_SECOND as f64 / hz).round() as i64,
        }
    }

    /// Create a frequency from a rate in kilohertz
    pub fn khz(khz: f64) -> Self {
        Self::hz(khz * 1000.0)
    }

    /// Create a frequency directly from a tick interval
    pub fn from_interval(ticks: i64) -> Self {
        Self { interval: ticks }
    }

    /// Tick interval between consecutive samples
    pub fn interval(&self) -> i64 {
        self.interval
    }

    /// Rate in hertz
    pub fn as_hz(&self) -> f64 {
        if self.interval <= 0 {
            return 0.0;
        }
        TICKS_PER_SECOND as f64 / self.interval as f64
    }

    /// A frequency is usable only with a positive interval
    pub fn is_valid(&self) -> bool {
        self.interval > 0
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_valid() {
            return write!(f, "invalid");
        }
        let hz = self.as_hz();
        if hz >= 1000.0 {
            write!(f, "{} kHz", hz / 1000.0)
        } else {
            write!(f, "{} Hz", hz)
        }
    }
}

/// Tick interval for queries (closed interval: [start, end])
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRange {
    /// Start tick (inclusive)
    pub start: i64,
    /// End tick (inclusive)
    pub end: i64,
}

impl TickRange {
    /// Create a new tick range
    ///
    /// # Panics
    /// Panics if start > end
    pub fn new(start: i64, end: i64) -> Self {
        assert!(start <= end, "TickRange: start must not exceed end");
        Self { start, end }
    }

    /// Create a tick range, returning None if inverted
    pub fn try_new(start: i64, end: i64) -> Option<Self> {
        if start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Check if a tick falls within this range
    pub fn contains(&self, tick: i64) -> bool {
        tick >= self.start && tick <= self.end
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &TickRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    /// Get intersection with another range, if any
    pub fn intersection(&self, other: &TickRange) -> Option<Self> {
        Self::try_new(self.start.max(other.start), self.end.min(other.end))
    }

    /// Width of the range in ticks
    pub fn span(&self) -> i64 {
        self.end - self.start
    }

    /// Width of the range in seconds
    pub fn duration_secs(&self) -> f64 {
        self.span() as f64 / TICKS_PER_SECOND as f64
    }
}

/// Format a tick as wall-clock time of day (HH:MM:SS.mmm)
///
/// Ticks outside a single day fall back to the raw number.
pub fn format_ticks(ticks: i64) -> String {
    if !(0..TICKS_PER_DAY).contains(&ticks) {
        return format!("{} ticks", ticks);
    }
    let secs = (ticks / TICKS_PER_SECOND) as u32;
    let millis = (ticks % TICKS_PER_SECOND) / TICKS_PER_MILLISECOND;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        millis
    )
}

/// Parse a tick from either a raw number or a time of day (HH:MM:SS[.fff])
pub fn parse_ticks(input: &str) -> Option<i64> {
    if let Ok(raw) = input.parse::<i64>() {
        return Some(raw);
    }
    let time = chrono::NaiveTime::parse_from_str(input, "%H:%M:%S%.f").ok()?;
    use chrono::Timelike;
    Some(time.num_seconds_from_midnight() as i64 * TICKS_PER_SECOND + time.nanosecond() as i64)
}
