//! The timing manager: registry owner, tick driver and reset protocol.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tickwatch_types::{current_timestamp_ms, HandlerEntry, HistorySnapshot, MinuteReport};
use tracing::{debug, info};

use crate::handler::{TimingHandler, TimingsState};
use crate::history::TimingHistory;
use crate::host::{Headless, HostStatus, PluginLookup};
use crate::identifier::{TimingIdentifier, DEFAULT_GROUP};
use crate::registry::TimingRegistry;
use crate::tick::{FullServerTick, DEFAULT_TICK_BUDGET};

/// Name of the handler measuring whole ticks.
pub const FULL_SERVER_TICK: &str = "Full Server Tick";
/// Name of the handler measuring the per-tick sweep itself.
pub const TIMINGS_TICK: &str = "Timings Tick";
/// Name of the group handler every plugin's combined total hangs under.
pub const PLUGINS: &str = "Plugins";
/// Name of a plugin's aggregate handler.
pub const COMBINED_TOTAL: &str = "Combined Total";

/// Ticks per Minute Report at 20 ticks per second.
pub const DEFAULT_TICKS_PER_MINUTE: u64 = 1200;
/// Ticks per History Snapshot (five minutes at 20 ticks per second).
pub const DEFAULT_HISTORY_INTERVAL: u64 = 6000;

/// Plugin names whose commands are timed in the default group.
const BUILTIN_COMMAND_OWNERS: [&str; 3] = ["minecraft", "bukkit", "Spigot"];

/// State touched only by the driving thread.
#[derive(Debug)]
struct Driver {
    history: TimingHistory,
    tick_started: Option<Instant>,
    started_at_ms: u64,
}

/// Process-wide timing manager.
///
/// Any thread may request handlers; one driving thread calls
/// [`begin_tick`](Timings::begin_tick) and [`end_tick`](Timings::end_tick)
/// around every server tick. Resets are requested with
/// [`reset`](Timings::reset) and applied at the start of the next tick, so a
/// reset never tears an in-flight sweep.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tickwatch_sdk::Timings;
///
/// let timings = Arc::new(Timings::new());
/// let entities = timings.of_safe("Entity Tick");
///
/// for _ in 0..3 {
///     timings.begin_tick();
///     entities.time(|| {
///         // ... tick entities ...
///     });
///     timings.end_tick();
/// }
///
/// assert_eq!(entities.stats().count, 3);
/// ```
#[derive(Debug)]
pub struct Timings {
    state: Arc<TimingsState>,
    registry: TimingRegistry,
    full_server_tick: FullServerTick,
    timings_tick: Arc<TimingHandler>,
    plugins: Arc<TimingHandler>,
    driver: Mutex<Driver>,
    needs_full_reset: AtomicBool,
    needs_recheck_enabled: AtomicBool,
    ticks_per_minute: u64,
    history_interval: u64,
    hidden_configs: Vec<String>,
    privacy: bool,
    host: Box<dyn HostStatus>,
}

impl Timings {
    /// Create a manager with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for configuring the manager.
    pub fn builder() -> TimingsBuilder {
        TimingsBuilder::new()
    }

    // ------------------------------------------------------------------
    // Handler acquisition
    // ------------------------------------------------------------------

    /// Get the handler for an identifier, creating it on first request.
    ///
    /// Callable from any thread. `protect` selects the thread-safe variant
    /// and is fixed for the identifier's lifetime.
    pub fn get_handler(
        &self,
        group: &str,
        name: &str,
        parent: Option<Arc<TimingIdentifier>>,
        protect: bool,
    ) -> Arc<TimingHandler> {
        self.registry
            .get_or_create(TimingIdentifier::new(group, name, parent, protect))
    }

    /// Handler in the default group for work confined to the driving thread.
    pub fn of_safe(&self, name: &str) -> Arc<TimingHandler> {
        self.get_handler(DEFAULT_GROUP, name, None, false)
    }

    /// Thread-safe handler filed under a plugin's combined total.
    pub fn of_plugin(&self, plugin: &str, name: &str) -> Arc<TimingHandler> {
        let combined = self.get_handler(
            plugin,
            COMBINED_TOTAL,
            Some(self.plugins.identifier().clone()),
            true,
        );
        self.get_handler(plugin, name, Some(combined.identifier().clone()), true)
    }

    /// Handler for a command.
    ///
    /// Built-in owners and plugins the lookup cannot resolve fall back to
    /// the default group.
    pub fn command_timing(
        &self,
        plugin: &str,
        command: &str,
        lookup: &impl PluginLookup,
    ) -> Arc<TimingHandler> {
        let name = format!("Command: {plugin}:{command}");
        let group = if BUILTIN_COMMAND_OWNERS.contains(&plugin) {
            None
        } else {
            lookup.plugin_group(plugin)
        };

        match group {
            Some(group) => self.of_plugin(&group, &name),
            None => self.of_safe(&name),
        }
    }

    // ------------------------------------------------------------------
    // Tick driving (driving thread only)
    // ------------------------------------------------------------------

    /// Start of a server tick.
    ///
    /// Applies a pending full reset, or failing that a pending enabled
    /// recheck, then starts measuring the tick.
    pub fn begin_tick(&self) {
        if self.needs_full_reset.load(Ordering::Acquire) {
            self.reset_timings();
        } else if self.needs_recheck_enabled.load(Ordering::Acquire) {
            self.recheck_enabled();
        }

        let mut driver = self.driver.lock();
        driver.tick_started = self
            .full_server_tick
            .handler()
            .is_enabled()
            .then(Instant::now);
    }

    /// End of a server tick.
    ///
    /// Records the tick, sweeps the active handlers and rolls Minute Reports
    /// and History Snapshots on their tick boundaries.
    pub fn end_tick(&self) {
        let mut driver = self.driver.lock();
        let Some(started) = driver.tick_started.take() else {
            return;
        };
        if !self.is_enabled() {
            return;
        }

        self.full_server_tick
            .record_tick(started.elapsed().as_nanos() as u64);

        let overhead = self.timings_tick.start();
        let violated = self.tick_locked(&mut driver);
        self.full_server_tick.process_tick(violated);

        let ticks = driver.history.timed_ticks();
        if ticks > 0 && ticks % self.ticks_per_minute == 0 {
            driver.history.close_minute(
                self.full_server_tick.minute_stats(),
                self.host.average_ping(),
            );
            self.full_server_tick.reset_minute();
            debug!(ticks, "minute report closed");
        }
        if ticks > 0 && ticks % self.history_interval == 0 {
            let total_time = self.full_server_tick.handler().stats().total;
            let snapshot = driver.history.snapshot(total_time, self.period_entries());
            debug!(
                ticks,
                entries = snapshot.entries.len(),
                minutes = snapshot.minute_reports.len(),
                "history snapshot taken"
            );
            self.reset_timings_locked(&mut driver);
        }

        drop(overhead);
        self.timings_tick.process_tick(violated);
    }

    /// Sweep the active handlers for the tick that just ended.
    ///
    /// Does nothing while disabled. Otherwise asks the Full Server Tick
    /// whether the tick went over budget and folds every non-special active
    /// handler with that verdict.
    ///
    /// [`end_tick`](Timings::end_tick) already runs this sweep. Call it only
    /// from hosts that do not bracket ticks with `begin_tick`/`end_tick`,
    /// otherwise the tick is counted twice.
    pub fn tick(&self) {
        let mut driver = self.driver.lock();
        self.tick_locked(&mut driver);
    }

    fn tick_locked(&self, driver: &mut Driver) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let violated = self.full_server_tick.is_violated();
        {
            let active = self.state.active.lock();
            for handler in active.iter() {
                if handler.is_special() {
                    // Folded by hand in end_tick.
                    continue;
                }
                handler.process_tick(violated);
            }
        }

        driver.history.record_tick(self.host.online_players());
        violated
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Request a full reset at the start of the next tick.
    pub fn reset(&self) {
        self.needs_full_reset.store(true, Ordering::Release);
    }

    /// Whether a full reset is waiting for the next tick.
    pub fn is_reset_pending(&self) -> bool {
        self.needs_full_reset.load(Ordering::Acquire)
    }

    /// Apply pending reset work now.
    ///
    /// With a full reset pending every registered handler and the snapshot
    /// buffer are cleared. Otherwise only handlers active this period are
    /// soft reset. Either way a new aggregation period begins.
    pub fn reset_timings(&self) {
        let mut driver = self.driver.lock();
        self.reset_timings_locked(&mut driver);
    }

    fn reset_timings_locked(&self, driver: &mut Driver) {
        // Hold the active set across the whole reset so a handler recording
        // concurrently lands in the next period, not in a cleared list.
        let mut active = self.state.active.lock();

        if self.needs_full_reset.swap(false, Ordering::AcqRel) {
            self.registry.for_each(|handler| handler.reset(true));
            self.full_server_tick.reset_minute();
            driver.history.clear();
            driver.started_at_ms = current_timestamp_ms();
            self.needs_recheck_enabled.store(false, Ordering::Release);
            info!(handlers = self.registry.len(), "timings reset");
        } else {
            for handler in active.iter() {
                handler.reset(false);
            }
        }

        active.clear();
        drop(active);
        driver.history.reset_period();
    }

    /// Turn collection on or off.
    ///
    /// Handlers pick up the change at the start of the next tick. Turning
    /// collection back on also schedules a full reset.
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.state.enabled.swap(enabled, Ordering::AcqRel);
        if was == enabled {
            return;
        }
        self.needs_recheck_enabled.store(true, Ordering::Release);
        if enabled {
            self.reset();
        }
        info!(enabled, "timings toggled");
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::Acquire)
    }

    /// Disable collection immediately, for server shutdown.
    pub fn stop_server(&self) {
        self.state.enabled.store(false, Ordering::Release);
        self.recheck_enabled();
        info!("timings stopped");
    }

    /// Make every handler re-read the global enabled switch.
    pub fn recheck_enabled(&self) {
        self.registry.for_each(|handler| handler.check_enabled());
        self.needs_recheck_enabled.store(false, Ordering::Release);
    }

    // ------------------------------------------------------------------
    // Read surface
    // ------------------------------------------------------------------

    /// Retained History Snapshots, oldest first.
    pub fn history(&self) -> Vec<Arc<HistorySnapshot>> {
        self.driver.lock().history.snapshots()
    }

    /// Minute Reports closed in the current period.
    pub fn minute_reports(&self) -> Vec<MinuteReport> {
        self.driver.lock().history.minute_reports().to_vec()
    }

    /// Ticks timed in the current period.
    pub fn timed_ticks(&self) -> u64 {
        self.driver.lock().history.timed_ticks()
    }

    /// Sum of online players over the ticks timed this period.
    pub fn player_ticks(&self) -> u64 {
        self.driver.lock().history.player_ticks()
    }

    /// Unix time in milliseconds of the last full reset.
    pub fn started_at_ms(&self) -> u64 {
        self.driver.lock().started_at_ms
    }

    /// All registered handlers in registration order.
    pub fn handlers(&self) -> Vec<Arc<TimingHandler>> {
        self.registry.handlers()
    }

    /// Handlers that recorded this period, in the order they first did.
    pub fn active_handlers(&self) -> Vec<Arc<TimingHandler>> {
        self.state.active.lock().clone()
    }

    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of handlers ever constructed.
    pub fn handlers_created(&self) -> usize {
        self.registry.created()
    }

    pub fn registry(&self) -> &TimingRegistry {
        &self.registry
    }

    pub fn full_server_tick(&self) -> &FullServerTick {
        &self.full_server_tick
    }

    pub fn timings_tick(&self) -> &Arc<TimingHandler> {
        &self.timings_tick
    }

    pub fn ticks_per_minute(&self) -> u64 {
        self.ticks_per_minute
    }

    pub fn history_interval(&self) -> u64 {
        self.history_interval
    }

    pub fn hidden_configs(&self) -> &[String] {
        &self.hidden_configs
    }

    /// Whether reports built from this data should withhold server identity.
    pub fn is_private(&self) -> bool {
        self.privacy
    }

    /// Whether an identifier is excluded from snapshots.
    pub fn is_hidden(&self, id: &TimingIdentifier) -> bool {
        self.hidden_configs
            .iter()
            .any(|hidden| hidden == id.group() || hidden == id.name())
    }

    /// Entries for handlers active this period, in the order they first
    /// recorded. Hidden configs are left out.
    pub fn period_entries(&self) -> Vec<HandlerEntry> {
        self.state
            .active
            .lock()
            .iter()
            .filter(|handler| !self.is_hidden(handler.identifier()))
            .map(|handler| {
                let id = handler.identifier();
                HandlerEntry {
                    group: id.group().to_string(),
                    name: id.name().to_string(),
                    parent: id.parent().map(|p| p.name().to_string()),
                    stats: handler.stats(),
                }
            })
            .collect()
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Timings {
    fn drop(&mut self) {
        // Handlers outliving the manager go quiet and stop referencing each
        // other through the active set.
        self.state.enabled.store(false, Ordering::Release);
        self.registry.for_each(|handler| handler.check_enabled());
        self.state.active.lock().clear();
    }
}

/// Builder for configuring [`Timings`].
#[derive(Debug)]
pub struct TimingsBuilder {
    enabled: bool,
    tick_budget: Duration,
    ticks_per_minute: u64,
    history_interval: u64,
    hidden_configs: Vec<String>,
    privacy: bool,
    host: Option<Box<dyn HostStatus>>,
}

impl Default for TimingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingsBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            enabled: true,
            tick_budget: DEFAULT_TICK_BUDGET,
            ticks_per_minute: DEFAULT_TICKS_PER_MINUTE,
            history_interval: DEFAULT_HISTORY_INTERVAL,
            hidden_configs: Vec::new(),
            privacy: false,
            host: None,
        }
    }

    /// Whether collection starts enabled. Defaults to `true`.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Tick length above which a tick counts as a violation.
    ///
    /// Defaults to 50ms.
    pub fn tick_budget(mut self, budget: Duration) -> Self {
        self.tick_budget = budget;
        self
    }

    /// Ticks per Minute Report. Defaults to 1200.
    pub fn ticks_per_minute(mut self, ticks: u64) -> Self {
        self.ticks_per_minute = ticks;
        self
    }

    /// Ticks per History Snapshot. Defaults to 6000.
    pub fn history_interval(mut self, ticks: u64) -> Self {
        self.history_interval = ticks;
        self
    }

    /// Group or handler names to leave out of snapshots.
    pub fn hidden_configs<I, S>(mut self, hidden: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden_configs = hidden.into_iter().map(Into::into).collect();
        self
    }

    pub fn privacy(mut self, privacy: bool) -> Self {
        self.privacy = privacy;
        self
    }

    /// Source of player and ping figures. Defaults to [`Headless`].
    pub fn host(mut self, host: impl HostStatus + 'static) -> Self {
        self.host = Some(Box::new(host));
        self
    }

    /// Build the manager and its built-in handlers.
    pub fn build(self) -> Timings {
        let state = Arc::new(TimingsState::new(self.enabled));
        let registry = TimingRegistry::new(state.clone());

        let full =
            registry.get_or_create_special(TimingIdentifier::ungrouped(FULL_SERVER_TICK, false));
        let timings_tick = registry.get_or_create_special(TimingIdentifier::new(
            DEFAULT_GROUP,
            TIMINGS_TICK,
            Some(full.identifier().clone()),
            false,
        ));
        let plugins = registry.get_or_create(TimingIdentifier::ungrouped(PLUGINS, false));

        Timings {
            state,
            registry,
            full_server_tick: FullServerTick::new(full, self.tick_budget),
            timings_tick,
            plugins,
            driver: Mutex::new(Driver {
                history: TimingHistory::new(),
                tick_started: None,
                started_at_ms: current_timestamp_ms(),
            }),
            needs_full_reset: AtomicBool::new(false),
            needs_recheck_enabled: AtomicBool::new(false),
            ticks_per_minute: self.ticks_per_minute.max(1),
            history_interval: self.history_interval.max(1),
            hidden_configs: self.hidden_configs,
            privacy: self.privacy,
            host: self.host.unwrap_or_else(|| Box::new(Headless)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[derive(Debug)]
    struct Lobby(usize);

    impl HostStatus for Lobby {
        fn online_players(&self) -> usize {
            self.0
        }

        fn average_ping(&self) -> f64 {
            35.0
        }
    }

    fn run_ticks(timings: &Timings, ticks: usize, work: &[&Arc<TimingHandler>]) {
        for _ in 0..ticks {
            timings.begin_tick();
            for handler in work {
                handler.time(|| {});
            }
            timings.end_tick();
        }
    }

    #[test]
    fn builder_defaults() {
        let timings = Timings::new();
        assert!(timings.is_enabled());
        assert!(!timings.is_private());
        assert_eq!(timings.ticks_per_minute(), DEFAULT_TICKS_PER_MINUTE);
        assert_eq!(timings.history_interval(), DEFAULT_HISTORY_INTERVAL);
        assert_eq!(timings.full_server_tick().budget(), DEFAULT_TICK_BUDGET);
        // Full Server Tick, Timings Tick and Plugins
        assert_eq!(timings.handler_count(), 3);
        assert!(timings.full_server_tick().handler().is_special());
        assert!(timings.timings_tick().is_special());
    }

    #[test]
    fn builder_clamps_zero_periods() {
        let timings = Timings::builder()
            .ticks_per_minute(0)
            .history_interval(0)
            .build();
        assert_eq!(timings.ticks_per_minute(), 1);
        assert_eq!(timings.history_interval(), 1);
    }

    #[test]
    fn same_identifier_same_handler() {
        let timings = Timings::new();
        let a = timings.get_handler("core", "tick", None, true);
        let b = timings.get_handler("core", "tick", None, true);
        let c = timings.get_handler("core", "tick", None, false);

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(a.is_protected());
        assert!(!c.is_protected());
    }

    #[test]
    fn concurrent_get_handler_creates_exactly_one() {
        let timings = Arc::new(Timings::new());
        let before = timings.handlers_created();

        let workers: Vec<_> = (0..2)
            .map(|_| {
                let timings = Arc::clone(&timings);
                thread::spawn(move || {
                    (0..1000)
                        .map(|_| timings.get_handler("core", "tick", None, true))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let handlers: Vec<Arc<TimingHandler>> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();

        assert!(handlers.iter().all(|h| Arc::ptr_eq(h, &handlers[0])));
        assert_eq!(timings.handlers_created() - before, 1);
        assert_eq!(timings.handler_count(), before + 1);
    }

    #[test]
    fn many_threads_many_identifiers() {
        let timings = Arc::new(Timings::new());
        let before = timings.handler_count();

        let workers: Vec<_> = (0..8)
            .map(|t| {
                let timings = Arc::clone(&timings);
                thread::spawn(move || {
                    for i in 0..50 {
                        let shared = timings.get_handler("core", "shared", None, true);
                        let own = timings.get_handler("core", &format!("t{t}-{i}"), None, true);
                        shared.time(|| {});
                        own.time(|| {});
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(timings.handler_count(), before + 1 + 8 * 50);
        assert_eq!(timings.handlers_created(), timings.handler_count());
        let shared = timings.get_handler("core", "shared", None, true);
        assert_eq!(shared.data().cur_tick_count(), 400);
    }

    #[test]
    fn tick_folds_active_handlers() {
        let timings = Timings::builder().tick_budget(Duration::from_secs(60)).build();
        let entities = timings.of_safe("Entity Tick");
        let idle = timings.of_safe("Idle");

        run_ticks(&timings, 3, &[&entities]);

        assert_eq!(entities.stats().count, 3);
        assert_eq!(entities.stats().lag_ticks, 0);
        assert!(idle.stats().is_empty());
        assert_eq!(timings.timed_ticks(), 3);
        assert_eq!(timings.full_server_tick().handler().stats().count, 3);
        assert_eq!(timings.full_server_tick().checks(), 3);
    }

    #[test]
    fn five_violated_ticks_count_five() {
        let timings = Timings::builder().tick_budget(Duration::ZERO).build();
        let a = timings.of_safe("A");
        let b = timings.get_handler("plugin", "B", None, true);

        for _ in 0..5 {
            timings.begin_tick();
            a.time(|| thread::sleep(Duration::from_millis(1)));
            b.time(|| {});
            timings.end_tick();
        }

        assert_eq!(a.stats().lag_ticks, 5);
        assert_eq!(b.stats().lag_ticks, 5);
        assert_eq!(a.stats().lag_count, 5);
        assert_eq!(timings.full_server_tick().handler().stats().lag_ticks, 5);
    }

    #[test]
    fn tick_while_disabled_mutates_nothing() {
        let timings = Timings::new();
        let handler = timings.of_safe("Entity Tick");

        timings.begin_tick();
        handler.time(|| {});
        timings.stop_server();
        timings.tick();
        timings.end_tick();

        assert_eq!(timings.full_server_tick().checks(), 0);
        assert_eq!(timings.timed_ticks(), 0);
        assert!(handler.stats().is_empty());
        assert_eq!(handler.data().cur_tick_count(), 1);
        assert!(!handler.is_enabled());

        // Disabled handlers ignore new brackets entirely
        handler.time(|| {});
        assert_eq!(handler.data().cur_tick_count(), 1);
    }

    #[test]
    fn full_reset_is_deferred_to_next_tick() {
        let timings = Timings::builder().history_interval(2).build();
        let handler = timings.of_safe("Entity Tick");
        run_ticks(&timings, 4, &[&handler]);
        handler.time(|| {});
        timings.tick();
        assert_eq!(timings.history().len(), 2);
        assert_eq!(handler.stats().count, 1);

        timings.reset();
        assert!(timings.is_reset_pending());
        assert_eq!(handler.stats().count, 1);

        timings.begin_tick();
        assert!(!timings.is_reset_pending());
        for h in timings.handlers() {
            assert!(h.stats().is_empty(), "{} not cleared", h.identifier());
            assert!(!h.has_timed());
        }
        assert!(timings.history().is_empty());
        assert!(timings.active_handlers().is_empty());

        let again = timings.of_safe("Entity Tick");
        assert!(Arc::ptr_eq(&again, &handler));
        assert!(again.stats().is_empty());
        timings.end_tick();
    }

    #[test]
    fn soft_reset_clears_only_active_handlers() {
        let timings = Timings::builder().history_interval(1000).build();
        let active = timings.of_safe("Active");
        let dormant = timings.of_safe("Dormant");

        run_ticks(&timings, 2, &[&active]);
        assert_eq!(timings.active_handlers().len(), 3);

        timings.reset_timings();
        assert!(active.stats().is_empty());
        assert!(active.has_timed());
        assert!(dormant.stats().is_empty());
        assert!(!dormant.has_timed());
        assert!(timings.active_handlers().is_empty());
        assert_eq!(timings.timed_ticks(), 0);
    }

    #[test]
    fn soft_reset_leaves_inactive_counters_alone() {
        let timings = Timings::builder().history_interval(1000).build();
        let active = timings.of_safe("Active");
        let outside = timings.get_handler("plugin", "Outside", None, true);

        // Folded by hand, so never part of the active set sweep
        outside.data().add(1_000);
        outside.data().process_tick(false);
        timings.active_handlers().iter().for_each(|h| assert!(!Arc::ptr_eq(h, &outside)));

        run_ticks(&timings, 1, &[&active]);
        timings.reset_timings();

        assert!(active.stats().is_empty());
        assert_eq!(outside.stats().count, 1);
    }

    #[test]
    fn snapshots_roll_on_history_interval() {
        let timings = Timings::builder()
            .ticks_per_minute(2)
            .history_interval(4)
            .host(Lobby(10))
            .build();
        let handler = timings.of_safe("Entity Tick");

        run_ticks(&timings, 3, &[&handler]);
        assert!(timings.history().is_empty());
        assert_eq!(timings.minute_reports().len(), 1);

        run_ticks(&timings, 1, &[&handler]);
        let history = timings.history();
        assert_eq!(history.len(), 1);

        let snapshot = &history[0];
        assert_eq!(snapshot.total_ticks, 4);
        assert_eq!(snapshot.player_ticks, 40);
        assert_eq!(snapshot.minute_reports.len(), 2);
        assert_eq!(snapshot.minute_reports[0].ticks, 2);
        assert!((snapshot.minute_reports[0].avg_players - 10.0).abs() < f64::EPSILON);
        assert!((snapshot.minute_reports[0].avg_ping - 35.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.minute_reports[0].full_server_tick.count, 2);
        assert_eq!(snapshot.entry(DEFAULT_GROUP, "Entity Tick").unwrap().stats.count, 4);
        assert_eq!(
            snapshot.entry(DEFAULT_GROUP, FULL_SERVER_TICK).unwrap().stats.count,
            4
        );

        // The period restarted
        assert_eq!(timings.timed_ticks(), 0);
        assert!(timings.minute_reports().is_empty());
        assert!(handler.stats().is_empty());
    }

    #[test]
    fn history_keeps_the_newest_twelve() {
        let timings = Timings::builder().history_interval(1).build();
        let handler = timings.of_safe("Entity Tick");

        run_ticks(&timings, 1, &[&handler]);
        let first = Arc::downgrade(&timings.history()[0]);
        run_ticks(&timings, 11, &[&handler]);
        assert_eq!(timings.history().len(), 12);
        assert!(first.upgrade().is_some());

        run_ticks(&timings, 1, &[&handler]);
        let history = timings.history();
        assert_eq!(history.len(), 12);
        assert!(first.upgrade().is_none());
        assert!(history.windows(2).all(|w| w[0].end_ms <= w[1].end_ms));
    }

    #[test]
    fn snapshots_only_list_handlers_active_that_period() {
        let timings = Timings::builder().history_interval(2).build();
        let both = timings.of_safe("Both");
        let first_only = timings.of_safe("First Only");

        run_ticks(&timings, 2, &[&both, &first_only]);
        run_ticks(&timings, 2, &[&both]);

        let history = timings.history();
        assert!(history[0].entry(DEFAULT_GROUP, "First Only").is_some());
        assert!(history[1].entry(DEFAULT_GROUP, "First Only").is_none());
        assert_eq!(history[1].entry(DEFAULT_GROUP, "Both").unwrap().stats.count, 2);
    }

    #[test]
    fn hidden_handlers_stay_out_of_snapshots() {
        let timings = Timings::builder()
            .history_interval(1)
            .hidden_configs(["secret-plugin", "Private Work"])
            .privacy(true)
            .build();
        let hidden_group = timings.of_plugin("secret-plugin", "Anything");
        let hidden_name = timings.of_safe("Private Work");
        let shown = timings.of_safe("Public Work");

        timings.begin_tick();
        hidden_group.time(|| {});
        hidden_name.time(|| {});
        shown.time(|| {});
        timings.end_tick();

        let snapshot = &timings.history()[0];
        assert!(timings.is_private());
        assert!(snapshot.entry("secret-plugin", "Anything").is_none());
        assert!(snapshot.entry(DEFAULT_GROUP, "Private Work").is_none());
        assert!(snapshot.entry(DEFAULT_GROUP, "Public Work").is_some());
    }

    #[test]
    fn plugin_handlers_nest_under_combined_total() {
        let timings = Timings::new();
        let handler = timings.of_plugin("worldedit", "Region Copy");

        assert!(handler.is_protected());
        let parent = handler.identifier().parent().unwrap();
        assert_eq!(parent.name(), COMBINED_TOTAL);
        assert_eq!(parent.group(), "worldedit");
        assert_eq!(parent.parent().unwrap().name(), PLUGINS);
    }

    #[test]
    fn command_timing_falls_back_to_default_group() {
        let timings = Timings::new();
        let lookup = |name: &str| (name == "worldedit").then(|| "WorldEdit".to_string());

        let known = timings.command_timing("worldedit", "/set", &lookup);
        assert_eq!(known.identifier().group(), "WorldEdit");
        assert_eq!(known.identifier().name(), "Command: worldedit:/set");

        let missing = timings.command_timing("ghost", "/boo", &lookup);
        assert_eq!(missing.identifier().group(), DEFAULT_GROUP);
        assert!(!missing.is_protected());

        let builtin = timings.command_timing("minecraft", "tp", &lookup);
        assert_eq!(builtin.identifier().group(), DEFAULT_GROUP);
    }

    #[test]
    fn set_enabled_applies_at_next_tick() {
        let timings = Timings::new();
        let handler = timings.of_safe("Entity Tick");

        timings.set_enabled(false);
        assert!(handler.is_enabled());
        timings.begin_tick();
        assert!(!handler.is_enabled());
        timings.end_tick();
        assert_eq!(timings.timed_ticks(), 0);

        timings.set_enabled(true);
        assert!(timings.is_reset_pending());
        run_ticks(&timings, 1, &[&handler]);
        assert!(handler.is_enabled());
        assert_eq!(handler.stats().count, 1);
    }

    #[test]
    fn handlers_created_after_disable_start_disabled() {
        let timings = Timings::new();
        timings.stop_server();
        let late = timings.of_safe("Late");
        assert!(!late.is_enabled());
        assert!(!late.start().is_recording());
    }

    #[test]
    fn period_entries_follow_first_record_order() {
        let timings = Timings::builder()
            .history_interval(1000)
            .hidden_configs(["Hidden"])
            .build();
        let second = timings.of_safe("Second");
        let first = timings.of_safe("First");
        let hidden = timings.of_safe("Hidden");

        timings.begin_tick();
        first.time(|| {});
        hidden.time(|| {});
        second.time(|| {});
        timings.end_tick();

        let names: Vec<String> = timings
            .period_entries()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["First", "Second", FULL_SERVER_TICK, TIMINGS_TICK]);
    }

    #[test]
    fn end_tick_sweeps_each_tick_once() {
        let timings = Timings::builder().history_interval(1000).build();
        let handler = timings.of_safe("Entity Tick");
        run_ticks(&timings, 2, &[&handler]);

        assert_eq!(timings.timed_ticks(), 2);
        assert_eq!(timings.full_server_tick().checks(), 2);
        assert_eq!(handler.stats().count, 2);
    }

    #[test]
    fn timings_tick_measures_sweep_overhead() {
        let timings = Timings::builder().history_interval(1000).build();
        let handler = timings.of_safe("Entity Tick");
        run_ticks(&timings, 3, &[&handler]);

        assert_eq!(timings.timings_tick().stats().count, 3);
        assert_eq!(
            timings.timings_tick().identifier().parent().unwrap().name(),
            FULL_SERVER_TICK
        );
    }
}
