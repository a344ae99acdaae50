//! History Snapshots and Minute Reports.

use alloc::string::String;
use alloc::vec::Vec;

use crate::{HandlerEntry, Microseconds, TimingStats, TimingStatsBuilder};

/// Server health summary for one minute of ticks.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MinuteReport {
    /// Unix time in seconds at which the minute closed.
    pub time: u64,

    /// Ticks per second measured over the minute.
    pub tps: f64,

    /// Ticks processed during the minute.
    pub ticks: u64,

    /// Average number of online players per tick.
    pub avg_players: f64,

    /// Average player ping in milliseconds, as reported by the host.
    pub avg_ping: f64,

    /// Full Server Tick statistics for the minute.
    pub full_server_tick: TimingStats,
}

impl MinuteReport {
    /// Whether any tick of the minute went over budget.
    pub fn had_lag(&self) -> bool {
        self.full_server_tick.lag_ticks > 0
    }
}

/// A window of aggregated handler statistics.
///
/// One snapshot is produced per history interval. The core keeps the most
/// recent [`HISTORY_CAPACITY`](crate::HISTORY_CAPACITY) of them.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistorySnapshot {
    /// Unix timestamp in milliseconds when the period started.
    pub start_ms: u64,

    /// Unix timestamp in milliseconds when the snapshot was taken.
    pub end_ms: u64,

    /// Ticks timed during the period.
    pub total_ticks: u64,

    /// Total Full Server Tick time over the period.
    pub total_time: Microseconds,

    /// Sum of online players over every timed tick.
    pub player_ticks: u64,

    /// Minute Reports closed during the period, oldest first.
    pub minute_reports: Vec<MinuteReport>,

    /// One entry per handler that recorded during the period.
    pub entries: Vec<HandlerEntry>,
}

impl HistorySnapshot {
    /// Create a builder for constructing snapshots.
    pub fn builder() -> HistorySnapshotBuilder {
        HistorySnapshotBuilder::new()
    }

    /// Wall-clock length of the period.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Average number of online players per tick.
    pub fn avg_players(&self) -> f64 {
        if self.total_ticks == 0 {
            0.0
        } else {
            self.player_ticks as f64 / self.total_ticks as f64
        }
    }

    /// Look up a handler entry.
    pub fn entry(&self, group: &str, name: &str) -> Option<&HandlerEntry> {
        self.entries
            .iter()
            .find(|e| e.group == group && e.name == name)
    }

    /// Entries sorted by total time, slowest first.
    pub fn slowest(&self, limit: usize) -> Vec<&HandlerEntry> {
        let mut entries: Vec<&HandlerEntry> = self.entries.iter().collect();
        entries.sort_by(|a, b| b.stats.total.cmp(&a.stats.total));
        entries.truncate(limit);
        entries
    }
}

/// Builder for `HistorySnapshot` instances.
#[derive(Debug, Default)]
pub struct HistorySnapshotBuilder {
    snapshot: HistorySnapshot,
    end_ms: Option<u64>,
}

impl HistorySnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_ms(mut self, ts: u64) -> Self {
        self.snapshot.start_ms = ts;
        self
    }

    /// Set the end timestamp. Defaults to now when built with `std`.
    pub fn end_ms(mut self, ts: u64) -> Self {
        self.end_ms = Some(ts);
        self
    }

    pub fn total_ticks(mut self, ticks: u64) -> Self {
        self.snapshot.total_ticks = ticks;
        self
    }

    pub fn total_time(mut self, total: impl Into<Microseconds>) -> Self {
        self.snapshot.total_time = total.into();
        self
    }

    pub fn player_ticks(mut self, player_ticks: u64) -> Self {
        self.snapshot.player_ticks = player_ticks;
        self
    }

    pub fn minute_reports(mut self, reports: Vec<MinuteReport>) -> Self {
        self.snapshot.minute_reports = reports;
        self
    }

    /// Add a handler entry with stats built using a closure.
    pub fn entry<F>(
        self,
        group: impl Into<String>,
        name: impl Into<String>,
        parent: Option<String>,
        f: F,
    ) -> Self
    where
        F: FnOnce(TimingStatsBuilder) -> TimingStatsBuilder,
    {
        let stats = f(TimingStats::builder()).build();
        self.handler_entry(HandlerEntry {
            group: group.into(),
            name: name.into(),
            parent,
            stats,
        })
    }

    /// Add a pre-built handler entry.
    pub fn handler_entry(mut self, entry: HandlerEntry) -> Self {
        self.snapshot.entries.push(entry);
        self
    }

    /// Build the snapshot.
    #[cfg(feature = "std")]
    pub fn build(self) -> HistorySnapshot {
        HistorySnapshot {
            end_ms: self.end_ms.unwrap_or_else(crate::current_timestamp_ms),
            ..self.snapshot
        }
    }

    /// Build the snapshot (no_std: end timestamp defaults to zero).
    #[cfg(not(feature = "std"))]
    pub fn build(self) -> HistorySnapshot {
        HistorySnapshot {
            end_ms: self.end_ms.unwrap_or(0),
            ..self.snapshot
        }
    }
}
