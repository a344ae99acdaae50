//! Full-tick measurement and budget violation detection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tickwatch_types::TimingStats;

use crate::data::{Access, TimingData};
use crate::handler::TimingHandler;

/// Nominal tick length at 20 ticks per second.
pub const DEFAULT_TICK_BUDGET: Duration = Duration::from_millis(50);

/// Measures whole ticks and decides whether the last one blew its budget.
///
/// Backed by a special handler that the tick sweep skips; the manager folds
/// it by hand after asking [`is_violated`](FullServerTick::is_violated), so
/// the verdict always describes the tick that just ended.
#[derive(Debug)]
pub struct FullServerTick {
    handler: Arc<TimingHandler>,
    minute: TimingData,
    budget_nanos: u64,
    checks: AtomicU64,
}

impl FullServerTick {
    pub(crate) fn new(handler: Arc<TimingHandler>, budget: Duration) -> Self {
        Self {
            handler,
            minute: TimingData::new(Access::Local),
            budget_nanos: budget.as_nanos() as u64,
            checks: AtomicU64::new(0),
        }
    }

    pub fn handler(&self) -> &Arc<TimingHandler> {
        &self.handler
    }

    pub fn budget(&self) -> Duration {
        Duration::from_nanos(self.budget_nanos)
    }

    /// Whether the tick recorded since the last fold exceeded the budget.
    pub fn is_violated(&self) -> bool {
        self.checks.fetch_add(1, Ordering::Relaxed);
        self.handler.data().cur_tick_total() > self.budget_nanos
    }

    /// Number of times the verdict has been asked for.
    pub fn checks(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }

    pub(crate) fn record_tick(&self, nanos: u64) {
        self.handler.add_diff(nanos);
        self.minute.add(nanos);
    }

    pub(crate) fn process_tick(&self, violated: bool) {
        self.handler.process_tick(violated);
        self.minute.process_tick(violated);
    }

    /// Statistics for the minute in progress.
    pub fn minute_stats(&self) -> TimingStats {
        self.minute.stats()
    }

    pub(crate) fn reset_minute(&self) {
        self.minute.reset();
    }
}
