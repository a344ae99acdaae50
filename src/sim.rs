//! A simulated server main loop driving [`Timings`].
//!
//! The driving thread runs [`SimulatedServer::tick`] once per tick: it
//! opens the tick, times a fixed set of synthetic workloads against
//! driving-thread handlers and closes the tick. [`Workers`] time work
//! concurrently on OS threads against protected plugin handlers.

use std::hint;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tickwatch_sdk::{HostStatus, TimingHandler, Timings};
use tracing::{debug, warn};

/// Plugins the simulated command lookup knows about.
pub const KNOWN_PLUGINS: [&str; 3] = ["worldedit", "essentials", "backup"];

/// Player count shared between the loop and the timing manager.
#[derive(Debug, Clone, Default)]
pub struct SimulatedHost {
    players: Arc<AtomicUsize>,
}

impl SimulatedHost {
    pub fn new(players: usize) -> Self {
        Self {
            players: Arc::new(AtomicUsize::new(players)),
        }
    }

    pub fn set_players(&self, players: usize) {
        self.players.store(players, Ordering::Relaxed);
    }
}

impl HostStatus for SimulatedHost {
    fn online_players(&self) -> usize {
        self.players.load(Ordering::Relaxed)
    }

    fn average_ping(&self) -> f64 {
        20.0 + self.online_players() as f64 * 0.5
    }
}

/// Resolve a command's owning plugin to its display group.
pub fn plugin_group(name: &str) -> Option<String> {
    KNOWN_PLUGINS.contains(&name).then(|| name.to_string())
}

/// Spin for roughly `duration` so the work shows up as CPU time.
fn busy(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        hint::spin_loop();
    }
}

/// Per-tick workloads measured on the driving thread.
#[derive(Debug)]
struct Workloads {
    entities: Arc<TimingHandler>,
    tile_entities: Arc<TimingHandler>,
    chunk_io: Arc<TimingHandler>,
    world_save: Arc<TimingHandler>,
}

#[derive(Debug)]
pub struct SimulatedServer {
    timings: Arc<Timings>,
    host: SimulatedHost,
    work: Workloads,
    base_players: usize,
    lag_every: u64,
    ticks: u64,
}

impl SimulatedServer {
    /// Create a server driving `timings`. Must be called on the driving thread.
    pub fn new(
        timings: Arc<Timings>,
        host: SimulatedHost,
        base_players: usize,
        lag_every: u64,
    ) -> Self {
        let work = Workloads {
            entities: timings.of_safe("Entity Tick"),
            tile_entities: timings.of_safe("Tile Entity Tick"),
            chunk_io: timings.of_safe("Chunk IO"),
            world_save: timings.of_safe("World Save"),
        };
        host.set_players(base_players);

        Self {
            timings,
            host,
            work,
            base_players,
            lag_every,
            ticks: 0,
        }
    }

    /// Run one full server tick.
    pub fn tick(&mut self) {
        self.ticks += 1;
        // Players drift a little every 200 ticks.
        if self.ticks % 200 == 0 {
            let drift = ((self.ticks / 200) % 5) as usize;
            self.host.set_players(self.base_players + drift);
        }

        self.timings.begin_tick();

        let players = self.host.online_players() as u32;
        self.work
            .entities
            .time(|| busy(Duration::from_micros(150 + 20 * u64::from(players))));
        self.work
            .tile_entities
            .time(|| busy(Duration::from_micros(80)));
        if self.ticks % 10 == 0 {
            self.work.chunk_io.time(|| busy(Duration::from_micros(400)));
        }
        if self.ticks % 100 == 0 {
            let command = self
                .timings
                .command_timing("worldedit", "/set", &plugin_group);
            command.time(|| busy(Duration::from_micros(300)));
        }
        if self.lag_every > 0 && self.ticks % self.lag_every == 0 {
            let stall = self.timings.full_server_tick().budget() + Duration::from_millis(10);
            debug!(tick = self.ticks, ?stall, "injecting lag");
            self.work.world_save.time(|| thread::sleep(stall));
        }

        self.timings.end_tick();
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn timings(&self) -> &Arc<Timings> {
        &self.timings
    }
}

/// Background threads timing work against protected plugin handlers.
#[derive(Debug)]
pub struct Workers {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<u64>>,
}

impl Workers {
    /// Spawn `count` worker threads.
    pub fn spawn(timings: &Arc<Timings>, count: usize) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(count);

        for id in 0..count {
            let plugin = KNOWN_PLUGINS[id % KNOWN_PLUGINS.len()];
            let handler = timings.of_plugin(plugin, "Async Chunk Load");
            let stop = Arc::clone(&stop);

            let handle = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || {
                    let mut jobs = 0u64;
                    while !stop.load(Ordering::Relaxed) {
                        handler.time(|| busy(Duration::from_micros(200)));
                        jobs += 1;
                        thread::sleep(Duration::from_millis(2));
                    }
                    jobs
                })?;
            handles.push(handle);
        }

        Ok(Self { stop, handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop every worker and return the total number of jobs they timed.
    pub fn shutdown(self) -> u64 {
        self.stop.store(true, Ordering::Relaxed);
        self.handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    warn!("worker thread panicked");
                    0
                })
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickwatch_sdk::{COMBINED_TOTAL, DEFAULT_GROUP};

    fn server(history_interval: u64, lag_every: u64) -> SimulatedServer {
        let host = SimulatedHost::new(0);
        let timings = Arc::new(
            Timings::builder()
                .ticks_per_minute(10)
                .history_interval(history_interval)
                .host(host.clone())
                .build(),
        );
        SimulatedServer::new(timings, host, 4, lag_every)
    }

    #[test]
    fn test_ticks_fill_history() {
        let mut server = server(20, 0);
        for _ in 0..40 {
            server.tick();
        }

        let history = server.timings().history();
        assert_eq!(server.ticks(), 40);
        assert_eq!(history.len(), 2);
        let snapshot = &history[1];
        assert_eq!(snapshot.total_ticks, 20);
        assert_eq!(snapshot.player_ticks, 80);
        assert_eq!(snapshot.minute_reports.len(), 2);
        assert_eq!(snapshot.entry(DEFAULT_GROUP, "Entity Tick").unwrap().stats.count, 20);
        assert_eq!(snapshot.entry(DEFAULT_GROUP, "Chunk IO").unwrap().stats.count, 2);
    }

    #[test]
    fn test_injected_lag_is_flagged() {
        let mut server = server(1000, 5);
        for _ in 0..10 {
            server.tick();
        }

        let stats = server.timings().full_server_tick().handler().stats();
        assert_eq!(stats.count, 10);
        assert!(stats.lag_ticks >= 2);
        let save = server.timings().of_safe("World Save").stats();
        assert_eq!(save.count, 2);
        assert!(save.lag_ticks >= 2);
    }

    #[test]
    fn test_command_timing_uses_plugin_group() {
        let mut server = server(1000, 0);
        for _ in 0..100 {
            server.tick();
        }

        let handler = server
            .timings()
            .command_timing("worldedit", "/set", &plugin_group);
        assert_eq!(handler.stats().count, 1);
        assert_eq!(
            handler.identifier().parent().unwrap().name(),
            COMBINED_TOTAL
        );
    }

    #[test]
    fn test_workers_record_concurrently() {
        let timings = Arc::new(Timings::new());
        let workers = Workers::spawn(&timings, 3).unwrap();
        assert_eq!(workers.len(), 3);
        thread::sleep(Duration::from_millis(100));
        let jobs = workers.shutdown();
        assert!(jobs >= 3);

        let recorded: u64 = KNOWN_PLUGINS
            .iter()
            .map(|plugin| {
                timings
                    .of_plugin(plugin, "Async Chunk Load")
                    .stats()
                    .count
            })
            .sum();
        // Nothing was folded by a tick yet
        assert_eq!(recorded, 0);
        assert_eq!(timings.active_handlers().len(), 3);
    }

    #[test]
    fn test_host_reports_players_and_ping() {
        let host = SimulatedHost::new(10);
        assert_eq!(host.online_players(), 10);
        assert!((host.average_ping() - 25.0).abs() < f64::EPSILON);
        assert_eq!(plugin_group("backup").as_deref(), Some("backup"));
        assert_eq!(plugin_group("unknown"), None);
    }
}
