use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tickwatch::duration::format_duration;
use tickwatch::report;
use tickwatch::settings::Settings;
use tickwatch::sim::{SimulatedHost, SimulatedServer, Workers};
use tickwatch::HistorySnapshot;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tickwatch")]
#[command(about = "Run a simulated tick loop and report its timings")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ticks to run (0 runs until Ctrl-C)
    #[arg(long)]
    ticks: Option<u64>,

    /// Target ticks per second
    #[arg(long)]
    tps: Option<u32>,

    /// Baseline online player count
    #[arg(long)]
    players: Option<usize>,

    /// Inject an over-budget tick every N ticks (0 disables)
    #[arg(long)]
    lag_every: Option<u64>,

    /// Worker threads timing plugin work
    #[arg(long)]
    workers: Option<usize>,

    /// Tick budget (e.g., "50ms")
    #[arg(long)]
    tick_budget: Option<String>,

    /// Ticks per Minute Report
    #[arg(long)]
    ticks_per_minute: Option<u64>,

    /// Ticks per History Snapshot
    #[arg(long)]
    history_interval: Option<u64>,

    /// Number of slowest handlers to log
    #[arg(long, default_value = "5")]
    top: usize,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Command-line flags take precedence over file and environment values.
    fn apply(&self, settings: &mut Settings) {
        if let Some(ticks) = self.ticks {
            settings.ticks = ticks;
        }
        if let Some(tps) = self.tps {
            settings.tps = tps;
        }
        if let Some(players) = self.players {
            settings.players = players;
        }
        if let Some(lag_every) = self.lag_every {
            settings.lag_every = lag_every;
        }
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if let Some(ref budget) = self.tick_budget {
            settings.tick_budget = budget.clone();
        }
        if let Some(ticks) = self.ticks_per_minute {
            settings.ticks_per_minute = ticks;
        }
        if let Some(ticks) = self.history_interval {
            settings.history_interval = ticks;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    settings.validate()?;

    // The tick loop runs on this thread; workers get their own OS threads.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(run(settings, args.top))
}

async fn run(settings: Settings, top: usize) -> Result<()> {
    let host = SimulatedHost::new(settings.players);
    let timings = Arc::new(settings.build_timings(host.clone())?);
    let workers = Workers::spawn(&timings, settings.workers).context("failed to spawn workers")?;
    let mut server = SimulatedServer::new(
        Arc::clone(&timings),
        host,
        settings.players,
        settings.lag_every,
    );

    let server_name = (!timings.is_private()).then_some(settings.server_name.as_str());
    info!(
        server = server_name.unwrap_or("<private>"),
        tps = settings.tps,
        budget = %format_duration(timings.full_server_tick().budget()),
        ticks_per_minute = timings.ticks_per_minute(),
        history_interval = timings.history_interval(),
        workers = workers.len(),
        "tick loop starting"
    );

    let mut interval = time::interval(settings.tick_interval());
    // A lagging tick stretches the schedule rather than bursting to catch up.
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut last_snapshot: Option<Arc<HistorySnapshot>> = None;

    while settings.ticks == 0 || server.ticks() < settings.ticks {
        tokio::select! {
            _ = interval.tick() => {}
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                }
                info!(ticks = server.ticks(), "interrupted");
                break;
            }
        }

        server.tick();

        if let Some(latest) = timings.history().pop() {
            let seen = last_snapshot
                .as_ref()
                .is_some_and(|last| Arc::ptr_eq(last, &latest));
            if !seen {
                report::log_snapshot(&latest, top);
                last_snapshot = Some(latest);
            }
        }
    }

    let jobs = workers.shutdown();
    info!(ticks = server.ticks(), worker_jobs = jobs, "tick loop finished");
    report::log_current(&timings, top);

    timings.stop_server();
    Ok(())
}
