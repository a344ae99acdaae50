//! Per-handler counters.

use std::sync::atomic::{AtomicU64, Ordering};

use tickwatch_types::{Microseconds, TimingStats};

/// How a handler's counters may be touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any thread may record; updates are atomic read-modify-write.
    Shared,
    /// Only the driving thread records; updates are plain load/store.
    Local,
}

#[derive(Debug, Default)]
struct Counter(AtomicU64);

impl Counter {
    #[inline]
    fn add(&self, value: u64, access: Access) {
        match access {
            Access::Shared => {
                self.0.fetch_add(value, Ordering::Relaxed);
            }
            Access::Local => {
                let current = self.0.load(Ordering::Relaxed);
                self.0.store(current.wrapping_add(value), Ordering::Relaxed);
            }
        }
    }

    #[inline]
    fn take(&self, access: Access) -> u64 {
        match access {
            Access::Shared => self.0.swap(0, Ordering::Relaxed),
            Access::Local => {
                let value = self.0.load(Ordering::Relaxed);
                self.0.store(0, Ordering::Relaxed);
                value
            }
        }
    }

    #[inline]
    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    fn clear(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

/// Sample counters for one handler.
///
/// Samples land in the current-tick pair and are folded into the long-lived
/// totals once per tick by [`process_tick`](TimingData::process_tick).
#[derive(Debug)]
pub struct TimingData {
    access: Access,
    count: Counter,
    total: Counter,
    lag_count: Counter,
    lag_total: Counter,
    lag_ticks: Counter,
    cur_tick_count: Counter,
    cur_tick_total: Counter,
}

impl TimingData {
    pub fn new(access: Access) -> Self {
        Self {
            access,
            count: Counter::default(),
            total: Counter::default(),
            lag_count: Counter::default(),
            lag_total: Counter::default(),
            lag_ticks: Counter::default(),
            cur_tick_count: Counter::default(),
            cur_tick_total: Counter::default(),
        }
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// Record one sample of `nanos` into the current tick.
    #[inline]
    pub fn add(&self, nanos: u64) {
        self.cur_tick_count.add(1, self.access);
        self.cur_tick_total.add(nanos, self.access);
    }

    /// Fold the current tick into the totals.
    ///
    /// Returns `false` when the tick held no samples, in which case nothing
    /// changes.
    pub fn process_tick(&self, violated: bool) -> bool {
        if self.cur_tick_count.get() == 0 {
            return false;
        }

        // Count and time are taken separately; a sample racing the fold may
        // split across two ticks but is never lost.
        let samples = self.cur_tick_count.take(self.access);
        let nanos = self.cur_tick_total.take(self.access);

        self.count.add(samples, self.access);
        self.total.add(nanos, self.access);
        if violated {
            self.lag_count.add(samples, self.access);
            self.lag_total.add(nanos, self.access);
            self.lag_ticks.add(1, self.access);
        }
        true
    }

    /// Samples recorded in the tick in progress.
    pub fn cur_tick_count(&self) -> u64 {
        self.cur_tick_count.get()
    }

    /// Nanoseconds recorded in the tick in progress.
    pub fn cur_tick_total(&self) -> u64 {
        self.cur_tick_total.get()
    }

    /// Nanoseconds folded into the totals since the last reset.
    pub fn total_nanos(&self) -> u64 {
        self.total.get()
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.count.clear();
        self.total.clear();
        self.lag_count.clear();
        self.lag_total.clear();
        self.lag_ticks.clear();
        self.cur_tick_count.clear();
        self.cur_tick_total.clear();
    }

    pub fn stats(&self) -> TimingStats {
        TimingStats {
            count: self.count.get(),
            total: Microseconds::from_nanos(self.total.get()),
            lag_count: self.lag_count.get(),
            lag_total: Microseconds::from_nanos(self.lag_total.get()),
            lag_ticks: self.lag_ticks.get(),
        }
    }
}
