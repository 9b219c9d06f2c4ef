//! Channel series and resampling
//!
//! Decoded channel data lives in memory as bursts: a start tick plus a
//! run of values at the channel interval. Sample timestamps are always
//! derived, never stored. Resampling projects a point series onto a
//! fixed output grid anchored at the query start; the grid over a window
//! [start, end] with step T has floor((end - start) / T) + 1 ticks.

use crate::session::time::TickRange;

/// How to fill output grid ticks that fall between samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleMode {
    /// Linear interpolation between the surrounding samples
    Linear,
    /// The nearer of the surrounding samples (earlier wins ties)
    Nearest,
    /// The most recent sample at or before the tick
    Hold,
}

/// One contiguous run of samples at the channel rate
#[derive(Debug, Clone)]
struct Burst {
    start_time: i64,
    values: Vec<f64>,
}

impl Burst {
    fn last_time(&self, interval: i64) -> i64 {
        self.start_time + (self.values.len() as i64 - 1).max(0) * interval
    }
}

/// Decoded samples of one channel, in physical units
///
/// Bursts are kept in time order; within a session a channel's bursts
/// never overlap (the writer enforces monotonic appends).
#[derive(Debug, Clone)]
pub struct ChannelSeries {
    interval: i64,
    bursts: Vec<Burst>,
    sample_count: usize,
}

impl ChannelSeries {
    pub fn new(interval: i64) -> Self {
        Self {
            interval,
            bursts: Vec::new(),
            sample_count: 0,
        }
    }

    pub fn interval(&self) -> i64 {
        self.interval
    }

    pub fn push_burst(&mut self, start_time: i64, values: Vec<f64>) {
        if values.is_empty() {
            return;
        }
        self.sample_count += values.len();
        self.bursts.push(Burst { start_time, values });
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Tick of the first sample
    pub fn first_time(&self) -> Option<i64> {
        self.bursts.first().map(|b| b.start_time)
    }

    /// Tick of the last sample
    pub fn last_time(&self) -> Option<i64> {
        self.bursts.last().map(|b| b.last_time(self.interval))
    }

    /// Samples whose derived timestamps fall inside the closed range
    pub fn samples_in(&self, range: TickRange) -> Vec<(i64, f64)> {
        let mut out = Vec::new();
        for burst in &self.bursts {
            if burst.start_time > range.end || burst.last_time(self.interval) < range.start {
                continue;
            }
            let first = if range.start <= burst.start_time {
                0
            } else {
                ((range.start - burst.start_time) + self.interval - 1) / self.interval
            };
            let last = ((range.end - burst.start_time) / self.interval)
                .min(burst.values.len() as i64 - 1);
            for i in first..=last {
                out.push((
                    burst.start_time + i * self.interval,
                    burst.values[i as usize],
                ));
            }
        }
        out
    }

    /// All samples with derived timestamps
    pub fn all_samples(&self) -> Vec<(i64, f64)> {
        let mut out = Vec::with_capacity(self.sample_count);
        for burst in &self.bursts {
            for (i, value) in burst.values.iter().enumerate() {
                out.push((burst.start_time + i as i64 * self.interval, *value));
            }
        }
        out
    }
}

/// Number of output samples for a window resampled at `interval`
pub fn grid_len(range: TickRange, interval: i64) -> usize {
    (range.span() / interval + 1) as usize
}

/// Value of a sorted point series held at a tick
///
/// Ticks before the first point clamp to it; None only for an empty
/// series.
pub fn hold_at(points: &[(i64, f64)], tick: i64) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    let idx = points.partition_point(|p| p.0 <= tick);
    Some(points[idx.saturating_sub(1)].1)
}

/// Project a sorted point series onto the output grid of `range`
///
/// Grid ticks are start + k * interval for k in 0..grid_len. Ticks
/// outside the sampled extent clamp to the nearest edge sample. A grid
/// tick landing exactly on a sample reproduces it in every mode.
pub fn resample(
    points: &[(i64, f64)],
    range: TickRange,
    interval: i64,
    mode: ResampleMode,
) -> Vec<(i64, f64)> {
    if points.is_empty() || interval <= 0 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(grid_len(range, interval));
    for k in 0..grid_len(range, interval) as i64 {
        let tick = range.start + k * interval;
        let idx = points.partition_point(|p| p.0 <= tick);
        let value = if idx == 0 {
            points[0].1
        } else if idx == points.len() {
            points[points.len() - 1].1
        } else {
            let prev = points[idx - 1];
            let next = points[idx];
            match mode {
                ResampleMode::Linear => {
                    let fraction = (tick - prev.0) as f64 / (next.0 - prev.0) as f64;
                    prev.1 + (next.1 - prev.1) * fraction
                }
                ResampleMode::Nearest => {
                    if tick - prev.0 <= next.0 - tick {
                        prev.1
                    } else {
                        next.1
                    }
                }
                ResampleMode::Hold => prev.1,
            }
        };
        out.push((tick, value));
    }
    out
}
