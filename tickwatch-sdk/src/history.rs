//! Tick-driven aggregation into Minute Reports and History Snapshots.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use tickwatch_types::{
    current_timestamp_ms, HandlerEntry, HistorySnapshot, Microseconds, MinuteReport, TimingStats,
    HISTORY_CAPACITY,
};

/// Per-period counters plus the bounded snapshot buffer.
///
/// Owned by the driving thread. Cadence is decided by the caller in ticks,
/// never by wall-clock timers, so lag stretches a period instead of
/// shortening it.
#[derive(Debug)]
pub struct TimingHistory {
    snapshots: VecDeque<Arc<HistorySnapshot>>,
    minute_reports: Vec<MinuteReport>,
    timed_ticks: u64,
    player_ticks: u64,
    minute_ticks: u64,
    minute_player_ticks: u64,
    last_minute: Instant,
    period_start_ms: u64,
}

impl Default for TimingHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingHistory {
    pub fn new() -> Self {
        Self {
            snapshots: VecDeque::with_capacity(HISTORY_CAPACITY),
            minute_reports: Vec::new(),
            timed_ticks: 0,
            player_ticks: 0,
            minute_ticks: 0,
            minute_player_ticks: 0,
            last_minute: Instant::now(),
            period_start_ms: current_timestamp_ms(),
        }
    }

    /// Count one timed tick.
    pub(crate) fn record_tick(&mut self, online_players: usize) {
        self.timed_ticks += 1;
        self.player_ticks += online_players as u64;
        self.minute_ticks += 1;
        self.minute_player_ticks += online_players as u64;
    }

    /// Close the minute in progress and queue its report.
    pub(crate) fn close_minute(&mut self, full_server_tick: TimingStats, avg_ping: f64) {
        let elapsed = self.last_minute.elapsed().as_secs_f64();
        let tps = if elapsed > 0.0 {
            self.minute_ticks as f64 / elapsed
        } else {
            0.0
        };
        let avg_players = if self.minute_ticks == 0 {
            0.0
        } else {
            self.minute_player_ticks as f64 / self.minute_ticks as f64
        };

        self.minute_reports.push(MinuteReport {
            time: current_timestamp_ms() / 1000,
            tps,
            ticks: self.minute_ticks,
            avg_players,
            avg_ping,
            full_server_tick,
        });

        self.minute_ticks = 0;
        self.minute_player_ticks = 0;
        self.last_minute = Instant::now();
    }

    /// Build a snapshot of the period so far and push it, evicting the
    /// oldest snapshot once the buffer is full.
    pub(crate) fn snapshot(
        &mut self,
        total_time: Microseconds,
        entries: Vec<HandlerEntry>,
    ) -> Arc<HistorySnapshot> {
        let snapshot = entries.into_iter().fold(
            HistorySnapshot::builder()
                .start_ms(self.period_start_ms)
                .total_ticks(self.timed_ticks)
                .total_time(total_time)
                .player_ticks(self.player_ticks)
                .minute_reports(self.minute_reports.clone()),
            |builder, entry| builder.handler_entry(entry),
        );
        let snapshot = Arc::new(snapshot.build());
        self.push(snapshot.clone());
        snapshot
    }

    fn push(&mut self, snapshot: Arc<HistorySnapshot>) {
        if self.snapshots.len() == HISTORY_CAPACITY {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    /// Start a fresh period: drop queued minute reports and zero the tick
    /// counters.
    pub(crate) fn reset_period(&mut self) {
        self.minute_reports.clear();
        self.timed_ticks = 0;
        self.player_ticks = 0;
        self.minute_ticks = 0;
        self.minute_player_ticks = 0;
        self.last_minute = Instant::now();
        self.period_start_ms = current_timestamp_ms();
    }

    /// Empty both buffers.
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.minute_reports.clear();
    }

    /// Retained snapshots, oldest first.
    pub fn snapshots(&self) -> Vec<Arc<HistorySnapshot>> {
        self.snapshots.iter().cloned().collect()
    }

    /// Minute Reports closed in the current period.
    pub fn minute_reports(&self) -> &[MinuteReport] {
        &self.minute_reports
    }

    /// Ticks timed in the current period.
    pub fn timed_ticks(&self) -> u64 {
        self.timed_ticks
    }

    pub fn player_ticks(&self) -> u64 {
        self.player_ticks
    }

    /// Ticks counted toward the minute in progress.
    pub fn minute_ticks(&self) -> u64 {
        self.minute_ticks
    }

    pub fn period_start_ms(&self) -> u64 {
        self.period_start_ms
    }
}
