//! Accumulated statistics for a single timing handler.

use alloc::string::String;

use crate::Microseconds;

/// Counters folded from a handler's per-tick samples.
///
/// `count`/`total` cover every sample; the `lag_*` fields cover only the
/// samples taken during ticks that exceeded the tick budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingStats {
    /// Number of completed measurements.
    pub count: u64,

    /// Total time spent inside measurements.
    pub total: Microseconds,

    /// Measurements taken during over-budget ticks.
    pub lag_count: u64,

    /// Time spent inside measurements during over-budget ticks.
    pub lag_total: Microseconds,

    /// Number of over-budget ticks in which this handler was active.
    pub lag_ticks: u64,
}

impl TimingStats {
    /// Create a builder for timing stats.
    pub fn builder() -> TimingStatsBuilder {
        TimingStatsBuilder::default()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Mean time per measurement.
    pub fn average(&self) -> Microseconds {
        self.total.per(self.count)
    }

    /// Mean time per measurement taken during over-budget ticks.
    pub fn lag_average(&self) -> Microseconds {
        self.lag_total.per(self.lag_count)
    }

    /// Share of total time that fell into over-budget ticks, 0.0..=1.0.
    pub fn lag_ratio(&self) -> f64 {
        if self.total.as_micros() == 0 {
            0.0
        } else {
            self.lag_total.as_micros() as f64 / self.total.as_micros() as f64
        }
    }
}

/// Builder for `TimingStats`.
#[derive(Debug, Default)]
pub struct TimingStatsBuilder {
    stats: TimingStats,
}

impl TimingStatsBuilder {
    pub fn count(mut self, count: u64) -> Self {
        self.stats.count = count;
        self
    }

    pub fn total(mut self, total: impl Into<Microseconds>) -> Self {
        self.stats.total = total.into();
        self
    }

    pub fn lag_count(mut self, lag_count: u64) -> Self {
        self.stats.lag_count = lag_count;
        self
    }

    pub fn lag_total(mut self, lag_total: impl Into<Microseconds>) -> Self {
        self.stats.lag_total = lag_total.into();
        self
    }

    pub fn lag_ticks(mut self, lag_ticks: u64) -> Self {
        self.stats.lag_ticks = lag_ticks;
        self
    }

    pub fn build(self) -> TimingStats {
        self.stats
    }
}

/// One handler's line in a History Snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandlerEntry {
    /// Group the handler belongs to (plugin name or the default group).
    pub group: String,

    /// Handler name within its group.
    pub name: String,

    /// Name of the parent handler, used only for display nesting.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub parent: Option<String>,

    /// Statistics accumulated over the snapshot period.
    pub stats: TimingStats,
}
