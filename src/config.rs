use std::path::PathBuf;
use std::time::Duration;

use crate::engine::SearchOptions;
use crate::limits::*;

/// Process settings, read once from `RENTAVAIL_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    pub max_results: usize,
    pub search_horizon_days: i64,
    pub max_attempts: usize,
    pub compact_threshold: u64,
    pub reaper_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            metrics_port: None,
            max_results: DEFAULT_MAX_RESULTS,
            search_horizon_days: DEFAULT_SEARCH_HORIZON_DAYS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            reaper_interval: Duration::from_secs(DEFAULT_REAPER_INTERVAL_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            lookup(key).and_then(|s| s.trim().parse().ok())
        }

        let defaults = Self::default();
        Self {
            data_dir: lookup("RENTAVAIL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            metrics_port: parsed(&lookup, "RENTAVAIL_METRICS_PORT"),
            max_results: parsed(&lookup, "RENTAVAIL_MAX_RESULTS")
                .unwrap_or(defaults.max_results)
                .min(MAX_SEARCH_RESULTS),
            search_horizon_days: parsed(&lookup, "RENTAVAIL_SEARCH_HORIZON_DAYS")
                .unwrap_or(defaults.search_horizon_days)
                .clamp(0, MAX_SEARCH_HORIZON_DAYS),
            max_attempts: parsed(&lookup, "RENTAVAIL_MAX_ATTEMPTS")
                .unwrap_or(defaults.max_attempts)
                .min(MAX_SEARCH_ATTEMPTS),
            compact_threshold: parsed(&lookup, "RENTAVAIL_COMPACT_THRESHOLD")
                .unwrap_or(defaults.compact_threshold),
            reaper_interval: parsed(&lookup, "RENTAVAIL_REAPER_INTERVAL_SECS")
                .filter(|&secs: &u64| secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.reaper_interval),
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            max_results: self.max_results,
            search_horizon_days: self.search_horizon_days,
            max_attempts: self.max_attempts,
            ..SearchOptions::default()
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("reservations.wal")
    }
}
