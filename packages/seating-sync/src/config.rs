use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::history::DEFAULT_HISTORY_LIMIT;

const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Engine tuning loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet window before a debounced reconciliation pass runs.
    pub debounce_window: Duration,
    /// Layout snapshots kept for undo/redo.
    pub history_limit: usize,
    /// Events buffered per bus subscriber before it lags.
    pub bus_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            history_limit: DEFAULT_HISTORY_LIMIT,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let debounce_window = match lookup("SEATING_DEBOUNCE_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .context("SEATING_DEBOUNCE_MS must be a number of milliseconds")?,
            ),
            None => defaults.debounce_window,
        };
        let history_limit = match lookup("SEATING_HISTORY_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse()
                .context("SEATING_HISTORY_LIMIT must be a valid number")?,
            None => defaults.history_limit,
        };
        let bus_capacity = match lookup("SEATING_BUS_CAPACITY") {
            Some(raw) => raw
                .trim()
                .parse()
                .context("SEATING_BUS_CAPACITY must be a valid number")?,
            None => defaults.bus_capacity,
        };

        anyhow::ensure!(history_limit > 0, "SEATING_HISTORY_LIMIT must be at least 1");
        anyhow::ensure!(bus_capacity > 0, "SEATING_BUS_CAPACITY must be at least 1");

        Ok(Self {
            debounce_window,
            history_limit,
            bus_capacity,
        })
    }
}
