//! # tickwatch-sdk
//!
//! Tick-synchronized timing aggregation for server main loops.
//!
//! Code anywhere in the process asks [`Timings`] for a [`TimingHandler`] by
//! group and name and brackets work with it. Once per tick the driving thread
//! folds every active handler's samples into its totals, flags ticks that
//! went over budget, and every few thousand ticks rolls the period into a
//! bounded buffer of [`HistorySnapshot`]s.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use tickwatch_sdk::Timings;
//!
//! let timings = Arc::new(Timings::builder().history_interval(100).build());
//!
//! // Thread-safe handlers may be used from any thread
//! let worker = {
//!     let timings = Arc::clone(&timings);
//!     thread::spawn(move || {
//!         let io = timings.of_plugin("backup", "Chunk Save");
//!         io.time(|| { /* ... */ });
//!     })
//! };
//! worker.join().unwrap();
//!
//! // The main loop drives ticks
//! let entities = timings.of_safe("Entity Tick");
//! for _ in 0..100 {
//!     timings.begin_tick();
//!     entities.time(|| { /* ... */ });
//!     timings.end_tick();
//! }
//!
//! assert_eq!(timings.history().len(), 1);
//! ```
//!
//! ## Threading
//!
//! - **Handler lookup**: any thread; lookups of known identifiers share a
//!   read lock
//! - **Protected handlers**: any thread; counters are atomic
//! - **Unprotected handlers**: driving thread only (asserted in debug builds)
//! - **Tick driving and resets**: driving thread only

mod data;
mod handler;
mod history;
mod host;
mod identifier;
mod registry;
mod tick;
mod timings;

pub use data::{Access, TimingData};
pub use handler::{TimingGuard, TimingHandler};
pub use history::TimingHistory;
pub use host::{Headless, HostStatus, PluginLookup};
pub use identifier::{TimingIdentifier, DEFAULT_GROUP};
pub use registry::TimingRegistry;
pub use tick::{FullServerTick, DEFAULT_TICK_BUDGET};
pub use timings::{
    Timings, TimingsBuilder, COMBINED_TOTAL, DEFAULT_HISTORY_INTERVAL, DEFAULT_TICKS_PER_MINUTE,
    FULL_SERVER_TICK, PLUGINS, TIMINGS_TICK,
};

// Re-export types for convenience
pub use tickwatch_types::{
    HandlerEntry, HistorySnapshot, Microseconds, MinuteReport, TimingStats, HISTORY_CAPACITY,
};
