//! Timing handlers and their measurement guards.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread::{self, ThreadId};
use std::time::Instant;

use parking_lot::Mutex;
use tickwatch_types::TimingStats;
use tracing::warn;

use crate::data::{Access, TimingData};
use crate::identifier::TimingIdentifier;

/// State shared between the manager and every handler it creates.
#[derive(Debug)]
pub(crate) struct TimingsState {
    /// Global on/off switch consulted by `check_enabled`.
    pub(crate) enabled: AtomicBool,
    /// Handlers that recorded at least one sample this period, in the order
    /// they first did so.
    pub(crate) active: Mutex<Vec<Arc<TimingHandler>>>,
}

impl TimingsState {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            active: Mutex::new(Vec::new()),
        }
    }
}

/// Accumulator of duration samples for one [`TimingIdentifier`].
///
/// Handlers are created by the registry, never directly. A protected
/// identifier yields a handler that may be started from any thread; an
/// unprotected one yields a handler whose brackets must all run on the
/// driving thread. Debug builds assert the latter.
///
/// # Example
///
/// ```rust
/// use tickwatch_sdk::Timings;
///
/// let timings = Timings::new();
/// let handler = timings.get_handler("core", "pathfinding", None, true);
///
/// let guard = handler.start();
/// // ... measured work ...
/// guard.stop();
/// ```
pub struct TimingHandler {
    id: Arc<TimingIdentifier>,
    this: Weak<TimingHandler>,
    state: Arc<TimingsState>,
    record: TimingData,
    special: bool,
    enabled: AtomicBool,
    added: AtomicBool,
    timed: AtomicBool,
    depth: AtomicU32,
    generation: AtomicU32,
    owner: OnceLock<ThreadId>,
}

impl TimingHandler {
    pub(crate) fn new(
        id: Arc<TimingIdentifier>,
        special: bool,
        state: Arc<TimingsState>,
    ) -> Arc<Self> {
        let access = if id.is_protected() {
            Access::Shared
        } else {
            Access::Local
        };
        let enabled = state.enabled.load(Ordering::Relaxed);

        Arc::new_cyclic(|this| Self {
            id,
            this: this.clone(),
            state,
            record: TimingData::new(access),
            special,
            enabled: AtomicBool::new(enabled),
            added: AtomicBool::new(false),
            timed: AtomicBool::new(false),
            depth: AtomicU32::new(0),
            generation: AtomicU32::new(0),
            owner: OnceLock::new(),
        })
    }

    /// Begin a measured region.
    ///
    /// The region ends when the returned guard is stopped or dropped. While
    /// the handler is disabled this does nothing and the guard is inert.
    #[inline]
    pub fn start(&self) -> TimingGuard<'_> {
        if !self.is_enabled() {
            return TimingGuard::inert(self);
        }

        let records = match self.record.access() {
            Access::Shared => {
                self.depth.fetch_add(1, Ordering::Relaxed);
                true
            }
            Access::Local => {
                self.assert_owner();
                let depth = self.depth.load(Ordering::Relaxed) + 1;
                self.depth.store(depth, Ordering::Relaxed);
                // Re-entrant brackets only count once.
                depth == 1
            }
        };

        TimingGuard {
            handler: self,
            started: Some((Instant::now(), self.generation.load(Ordering::Relaxed))),
            records,
        }
    }

    /// Measure a closure.
    pub fn time<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.start();
        f()
    }

    fn finish(&self, started: Instant, generation: u32, records: bool) {
        let nanos = started.elapsed().as_nanos() as u64;

        if generation != self.generation.load(Ordering::Relaxed) {
            // A reset landed while this bracket was open.
            return;
        }

        match self.record.access() {
            Access::Shared => {
                let _ = self
                    .depth
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| {
                        Some(d.saturating_sub(1))
                    });
            }
            Access::Local => {
                let depth = self.depth.load(Ordering::Relaxed);
                self.depth.store(depth.saturating_sub(1), Ordering::Relaxed);
            }
        }

        if records && self.is_enabled() {
            self.add_diff(nanos);
        }
    }

    /// Record an externally measured sample.
    pub(crate) fn add_diff(&self, nanos: u64) {
        self.record.add(nanos);
        if !self.timed.load(Ordering::Relaxed) {
            self.timed.store(true, Ordering::Relaxed);
        }
        if !self.added.load(Ordering::Relaxed) {
            // Resets clear `added` under the same lock.
            let mut active = self.state.active.lock();
            if !self.added.swap(true, Ordering::AcqRel) {
                if let Some(this) = self.this.upgrade() {
                    active.push(this);
                }
            }
        }
    }

    /// Fold this tick's samples into the handler's totals.
    ///
    /// Driving thread only.
    pub fn process_tick(&self, violated: bool) {
        if self.record.access() == Access::Local && self.depth.load(Ordering::Relaxed) != 0 {
            warn!(handler = %self.id, "timing still running at end of tick");
            self.depth.store(0, Ordering::Relaxed);
            self.generation.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.record.process_tick(violated);
    }

    /// Clear accumulated data.
    ///
    /// A soft reset clears the counters of the current period. A full reset
    /// also forgets that the handler ever recorded and re-reads the global
    /// enabled switch.
    pub fn reset(&self, full: bool) {
        self.record.reset();
        self.depth.store(0, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Relaxed);
        self.added.store(false, Ordering::Release);
        if full {
            self.timed.store(false, Ordering::Relaxed);
            self.check_enabled();
        }
    }

    /// Re-read the global enabled switch.
    pub fn check_enabled(&self) {
        let enabled = self.state.enabled.load(Ordering::Relaxed);
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Whether this handler is processed manually rather than by the tick sweep.
    pub fn is_special(&self) -> bool {
        self.special
    }

    /// Whether a measured region is currently open.
    pub fn is_running(&self) -> bool {
        self.depth.load(Ordering::Relaxed) > 0
    }

    /// Whether anything was recorded since the last full reset.
    pub fn has_timed(&self) -> bool {
        self.timed.load(Ordering::Relaxed)
    }

    pub fn identifier(&self) -> &Arc<TimingIdentifier> {
        &self.id
    }

    pub fn is_protected(&self) -> bool {
        self.record.access() == Access::Shared
    }

    pub fn stats(&self) -> TimingStats {
        self.record.stats()
    }

    pub(crate) fn data(&self) -> &TimingData {
        &self.record
    }

    #[inline]
    fn assert_owner(&self) {
        if cfg!(debug_assertions) {
            let current = thread::current().id();
            let owner = *self.owner.get_or_init(|| current);
            debug_assert_eq!(
                owner, current,
                "unprotected timing {} used off its driving thread",
                self.id
            );
        }
    }
}

impl fmt::Debug for TimingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimingHandler")
            .field("id", &self.id)
            .field("special", &self.special)
            .field("enabled", &self.is_enabled())
            .field("stats", &self.stats())
            .finish()
    }
}

/// An open measured region.
///
/// Dropping the guard closes the region and records its duration.
#[must_use = "the measurement ends as soon as the guard is dropped"]
pub struct TimingGuard<'a> {
    handler: &'a TimingHandler,
    started: Option<(Instant, u32)>,
    records: bool,
}

impl<'a> TimingGuard<'a> {
    fn inert(handler: &'a TimingHandler) -> Self {
        Self {
            handler,
            started: None,
            records: false,
        }
    }

    /// Close the region now.
    pub fn stop(self) {}

    /// Whether closing this guard will record a sample.
    pub fn is_recording(&self) -> bool {
        self.started.is_some() && self.records
    }
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        if let Some((started, generation)) = self.started.take() {
            self.handler.finish(started, generation, self.records);
        }
    }
}
