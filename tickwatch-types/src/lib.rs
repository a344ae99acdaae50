//! # tickwatch-types
//!
//! Data types produced by the tickwatch timing core. Everything in here is an
//! immutable record: the core builds these values at tick, minute and history
//! boundaries and hands them to whoever reads the report surface.
//!
//! ## Features
//!
//! - `std` (default): Standard library support (wall-clock timestamps)
//! - `serde`: Serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use tickwatch_types::{HistorySnapshot, Microseconds, TimingStats};
//!
//! let snapshot = HistorySnapshot::builder()
//!     .start_ms(1_703_160_000_000)
//!     .end_ms(1_703_160_300_000)
//!     .total_ticks(6000)
//!     .entry("Minecraft", "Entity Tick", None, |s| {
//!         s.count(6000).total(Microseconds::from_millis(4200))
//!     })
//!     .build();
//!
//! assert_eq!(snapshot.entries.len(), 1);
//! assert_eq!(snapshot.duration_ms(), 300_000);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod duration;
mod history;
mod stats;

pub use duration::*;
pub use history::*;
pub use stats::*;

/// Number of History Snapshots retained before the oldest is evicted.
pub const HISTORY_CAPACITY: usize = 12;

/// Get current timestamp in milliseconds since Unix epoch.
#[cfg(feature = "std")]
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
