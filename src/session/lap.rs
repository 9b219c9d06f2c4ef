//! Lap segmentation
//!
//! Writers record lap marks (number, type, start tick). Lap windows are
//! derived, never stored: each lap runs from its mark to the next mark,
//! half-open, and the final lap closes at the session end.

use serde::{Deserialize, Serialize};

use super::time::TickRange;

/// Classification of a lap
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LapType {
    /// Flying lap
    Default,
    /// Leaving the pits
    OutLap,
    /// Returning to the pits
    InLap,
}

impl std::fmt::Display for LapType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LapType::Default => write!(f, "Default"),
            LapType::OutLap => write!(f, "OutLap"),
            LapType::InLap => write!(f, "InLap"),
        }
    }
}

/// A lap mark as recorded by the writer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LapMark {
    pub number: u32,
    pub lap_type: LapType,
    /// Start tick of the lap
    pub timestamp: i64,
}

impl LapMark {
    pub fn new(number: u32, lap_type: LapType, timestamp: i64) -> Self {
        Self {
            number,
            lap_type,
            timestamp,
        }
    }
}

/// A lap with its derived window [start_time, end_time)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lap {
    pub number: u32,
    pub lap_type: LapType,
    pub start_time: i64,
    pub end_time: i64,
}

impl Lap {
    /// Check if a tick falls inside this lap (half-open window)
    pub fn contains(&self, tick: i64) -> bool {
        tick >= self.start_time && tick < self.end_time
    }

    pub fn duration(&self) -> i64 {
        self.end_time - self.start_time
    }
}

/// Laps of a session with derived windows, ordered by start tick
#[derive(Debug, Clone, Default)]
pub struct LapIndex {
    laps: Vec<Lap>,
}

impl LapIndex {
    /// Derive lap windows from recorded marks
    ///
    /// Each lap ends where the next begins; the last lap ends at the
    /// session end (or at its own start if the session ends earlier).
    pub fn from_marks(marks: &[LapMark], session_end: i64) -> Self {
        let mut marks = marks.to_vec();
        marks.sort_by_key(|m| m.timestamp);

        let laps = marks
            .iter()
            .enumerate()
            .map(|(i, mark)| {
                let end_time = match marks.get(i + 1) {
                    Some(next) => next.timestamp,
                    None => session_end.max(mark.timestamp),
                };
                Lap {
                    number: mark.number,
                    lap_type: mark.lap_type,
                    start_time: mark.timestamp,
                    end_time,
                }
            })
            .collect();
        Self { laps }
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    /// Find the lap containing a tick
    pub fn lap_at(&self, tick: i64) -> Option<&Lap> {
        let idx = self.laps.partition_point(|lap| lap.start_time <= tick);
        let candidate = self.laps.get(idx.checked_sub(1)?)?;
        candidate.contains(tick).then_some(candidate)
    }

    pub fn lap_by_number(&self, number: u32) -> Option<&Lap> {
        self.laps.iter().find(|lap| lap.number == number)
    }

    /// Laps whose windows intersect the query range
    pub fn overlapping(&self, range: TickRange) -> impl Iterator<Item = &Lap> {
        self.laps
            .iter()
            .filter(move |lap| lap.start_time <= range.end && lap.end_time > range.start)
    }
}
