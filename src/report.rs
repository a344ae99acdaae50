//! Log summaries of collected timings.

use tickwatch_sdk::{HandlerEntry, HistorySnapshot, Timings};
use tracing::info;

/// Log one History Snapshot and its slowest handlers.
pub fn log_snapshot(snapshot: &HistorySnapshot, limit: usize) {
    let lag_minutes = snapshot
        .minute_reports
        .iter()
        .filter(|minute| minute.had_lag())
        .count();

    info!(
        ticks = snapshot.total_ticks,
        duration_ms = snapshot.duration_ms(),
        total_time = %snapshot.total_time,
        avg_players = snapshot.avg_players(),
        minutes = snapshot.minute_reports.len(),
        lag_minutes,
        "history snapshot"
    );
    log_entries(snapshot.slowest(limit));
}

/// Log handler entries, one line each.
pub fn log_entries<'a>(entries: impl IntoIterator<Item = &'a HandlerEntry>) {
    for entry in entries {
        info!(
            group = %entry.group,
            name = %entry.name,
            count = entry.stats.count,
            total = %entry.stats.total,
            avg = %entry.stats.average(),
            lag_ticks = entry.stats.lag_ticks,
            "handler"
        );
    }
}

/// Entries for handlers active in the period still in progress, slowest
/// first. Hidden configs are left out.
pub fn current_entries(timings: &Timings, limit: usize) -> Vec<HandlerEntry> {
    let mut entries = timings.period_entries();
    entries.sort_by(|a, b| b.stats.total.cmp(&a.stats.total));
    entries.truncate(limit);
    entries
}

/// Log the period still in progress.
pub fn log_current(timings: &Timings, limit: usize) {
    info!(
        ticks = timings.timed_ticks(),
        handlers = timings.handler_count(),
        snapshots = timings.history().len(),
        "current period"
    );
    log_entries(&current_entries(timings, limit));
}
