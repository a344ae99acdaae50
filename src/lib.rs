//! # tickwatch
//!
//! A simulated server main loop driving [`tickwatch_sdk::Timings`], plus the
//! configuration and reporting around it.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌───────────────┐
//! │   settings   │───▶│ SimulatedServer  │───▶│    Timings    │
//! │ (file + env) │    │ (driving thread) │    │     (sdk)     │
//! └──────────────┘    └──────────────────┘    └───────┬───────┘
//!                     ┌──────────────────┐            │
//!                     │     Workers      │────────────┤
//!                     │   (OS threads)   │            ▼
//!                     └──────────────────┘    ┌───────────────┐
//!                                             │    report     │
//!                                             │    (logs)     │
//!                                             └───────────────┘
//! ```
//!
//! - **[`settings`]**: layered [`Settings`] loaded with the `config` crate
//! - **[`sim`]**: [`SimulatedServer`] ticks synthetic workloads;
//!   [`Workers`] time plugin work off the driving thread
//! - **[`report`]**: snapshot and current-period log lines
//! - **[`duration`]**: duration strings such as `"50ms"`
//!
//! ## Usage
//!
//! ```bash
//! # Run 12000 ticks at 20 TPS with a lag spike every 600 ticks
//! tickwatch --ticks 12000 --lag-every 600
//!
//! # Short periods for a quick look
//! tickwatch --ticks 400 --ticks-per-minute 20 --history-interval 100 -v
//! ```

pub mod duration;
pub mod report;
pub mod settings;
pub mod sim;

pub use settings::{Settings, SettingsError};
pub use sim::{SimulatedHost, SimulatedServer, Workers};

// Re-export the timing surface for binary and library users
pub use tickwatch_sdk::{HistorySnapshot, Timings, TimingsBuilder};
