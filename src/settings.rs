//! Layered configuration for the simulated server.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! `TICKWATCH_*` environment variables. Command-line flags are applied on
//! top by the binary.

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tickwatch_sdk::{
    HostStatus, Timings, TimingsBuilder, DEFAULT_HISTORY_INTERVAL, DEFAULT_TICKS_PER_MINUTE,
};

use crate::duration::parse_duration;

/// Errors raised while loading or interpreting settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A configuration source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A duration string was malformed.
    #[error("invalid duration {input:?}: {reason}")]
    Duration { input: String, reason: String },

    /// A value was well-formed but unusable.
    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether collection starts enabled.
    pub enabled: bool,
    /// Tick length above which a tick counts as lag, e.g. "50ms".
    pub tick_budget: String,
    pub ticks_per_minute: u64,
    pub history_interval: u64,
    /// Groups or handler names left out of History Snapshots.
    pub hidden_configs: Vec<String>,
    /// Withhold the server name from exported reports.
    pub privacy: bool,
    pub server_name: String,
    /// Target ticks per second of the simulated loop.
    pub tps: u32,
    /// Ticks to run; 0 runs until interrupted.
    pub ticks: u64,
    /// Baseline online player count.
    pub players: usize,
    /// Inject an over-budget tick every this many ticks; 0 disables.
    pub lag_every: u64,
    /// Worker threads timing work against plugin handlers.
    pub workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_budget: "50ms".to_string(),
            ticks_per_minute: DEFAULT_TICKS_PER_MINUTE,
            history_interval: DEFAULT_HISTORY_INTERVAL,
            hidden_configs: Vec::new(),
            privacy: false,
            server_name: "tickwatch".to_string(),
            tps: 20,
            ticks: 0,
            players: 8,
            lag_every: 0,
            workers: 2,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("TICKWATCH")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("hidden_configs"),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check values that deserialize fine but cannot drive a server.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tps == 0 {
            return Err(SettingsError::Invalid {
                key: "tps",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.ticks_per_minute == 0 {
            return Err(SettingsError::Invalid {
                key: "ticks_per_minute",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.history_interval == 0 {
            return Err(SettingsError::Invalid {
                key: "history_interval",
                reason: "must be at least 1".to_string(),
            });
        }
        self.tick_budget()?;
        Ok(())
    }

    pub fn tick_budget(&self) -> Result<Duration, SettingsError> {
        parse_duration(&self.tick_budget)
    }

    /// Wall-clock period between ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tps.max(1)))
    }

    /// Builder pre-loaded with the timing-related settings.
    pub fn timings_builder(&self) -> Result<TimingsBuilder, SettingsError> {
        Ok(Timings::builder()
            .enabled(self.enabled)
            .tick_budget(self.tick_budget()?)
            .ticks_per_minute(self.ticks_per_minute)
            .history_interval(self.history_interval)
            .hidden_configs(self.hidden_configs.iter().cloned())
            .privacy(self.privacy))
    }

    /// Build the manager with the given host status provider.
    pub fn build_timings(&self, host: impl HostStatus + 'static) -> Result<Timings, SettingsError> {
        Ok(self.timings_builder()?.host(host).build())
    }
}
