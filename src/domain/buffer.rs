// Bounded per-channel history backing the live chart
use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::domain::reading::{GasChannel, Reading};

/// Fixed-capacity FIFO over the most recent samples: one value sequence per
/// channel plus a timestamp sequence shared by all of them. The six deques
/// always have equal length.
///
/// Missing samples are stored as 0.0 so the chart renders continuously; the
/// audit-facing [`SampleHistory`](crate::domain::history::SampleHistory)
/// keeps the gap instead.
#[derive(Debug)]
pub struct PlotBuffer {
    capacity: usize,
    timestamps: VecDeque<DateTime<Local>>,
    series: [VecDeque<f64>; 5],
}

impl PlotBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            timestamps: VecDeque::with_capacity(capacity),
            series: std::array::from_fn(|_| VecDeque::with_capacity(capacity)),
        }
    }

    /// Append one sample, evicting the oldest row when full. O(1).
    pub fn push(&mut self, reading: &Reading) {
        if self.timestamps.len() == self.capacity {
            self.timestamps.pop_front();
            for series in &mut self.series {
                series.pop_front();
            }
        }
        self.timestamps.push_back(reading.timestamp);
        for (slot, channel) in GasChannel::ALL.iter().enumerate() {
            self.series[slot].push_back(reading.value(*channel).unwrap_or(0.0));
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Immutable copy for rendering. A renderer holding a snapshot never
    /// observes a half-appended row, no matter what pushes happen after.
    pub fn snapshot(&self) -> PlotSnapshot {
        PlotSnapshot {
            timestamps: self.timestamps.iter().copied().collect(),
            series: std::array::from_fn(|slot| self.series[slot].iter().copied().collect()),
        }
    }
}

/// Point-in-time copy of a [`PlotBuffer`], index-aligned across channels.
#[derive(Debug, Clone, Default)]
pub struct PlotSnapshot {
    pub timestamps: Vec<DateTime<Local>>,
    pub series: [Vec<f64>; 5],
}

impl PlotSnapshot {
    pub fn channel(&self, channel: GasChannel) -> &[f64] {
        &self.series[channel as usize]
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reading::GasValues;
    use chrono::TimeZone;

    fn sample(n: u32) -> Reading {
        let timestamp = Local
            .with_ymd_and_hms(2024, 11, 20, 14, n / 60, n % 60)
            .unwrap();
        Reading::ok(
            timestamp,
            GasValues {
                co2: n as f64,
                co: 0.0,
                ch4: 0.0,
                h2: 0.0,
                o2: 20.95,
            },
        )
    }

    #[test]
    fn test_fifo_eviction_keeps_last_n() {
        let mut buffer = PlotBuffer::new(100);
        for n in 1..=105 {
            buffer.push(&sample(n));
        }

        let snapshot = buffer.snapshot();
        assert_eq!(buffer.len(), 100);
        let co2 = snapshot.channel(GasChannel::Co2);
        assert_eq!(co2.first().copied(), Some(6.0));
        assert_eq!(co2.last().copied(), Some(105.0));
    }

    #[test]
    fn test_all_sequences_stay_aligned() {
        let mut buffer = PlotBuffer::new(3);
        for n in 1..=7 {
            buffer.push(&sample(n));
        }

        let snapshot = buffer.snapshot();
        for channel in GasChannel::ALL {
            assert_eq!(snapshot.channel(channel).len(), snapshot.timestamps.len());
        }
    }

    #[test]
    fn test_missing_sample_substitutes_zero() {
        let mut buffer = PlotBuffer::new(10);
        buffer.push(&sample(1));
        buffer.push(&Reading::missing(
            Local.with_ymd_and_hms(2024, 11, 20, 14, 0, 2).unwrap(),
        ));

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.channel(GasChannel::O2), &[20.95, 0.0]);
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_pushes() {
        let mut buffer = PlotBuffer::new(10);
        buffer.push(&sample(1));
        let snapshot = buffer.snapshot();
        buffer.push(&sample(2));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(buffer.len(), 2);
    }
}
