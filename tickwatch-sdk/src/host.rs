//! Hooks into the hosting server.

use std::fmt::Debug;

/// Live server figures sampled once per tick and once per minute.
pub trait HostStatus: Send + Sync + Debug {
    /// Players currently online.
    fn online_players(&self) -> usize {
        0
    }

    /// Average player ping in milliseconds.
    fn average_ping(&self) -> f64 {
        0.0
    }
}

/// Host that reports no players.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl HostStatus for Headless {}

/// Resolves plugin names to the group their timings are filed under.
pub trait PluginLookup {
    /// Returns `None` when no plugin by that name is loaded.
    fn plugin_group(&self, name: &str) -> Option<String>;
}

impl<F> PluginLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn plugin_group(&self, name: &str) -> Option<String> {
        self(name)
    }
}
