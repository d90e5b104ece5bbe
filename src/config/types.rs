use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub pricing: PricingPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookingConfig {
    /// Minimum nights when no minimum-stay rule matches.
    #[serde(default = "default_min_nights")]
    pub default_min_nights: u32,
    /// Offset used to turn stored timestamps into calendar days.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            default_min_nights: default_min_nights(),
            utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Re-read the snapshot this often. Unset or 0 loads it once at startup.
    #[serde(default)]
    pub reload_interval_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            reload_interval_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_max_tracked_keys")]
    pub max_tracked_keys: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            max_tracked_keys: default_max_tracked_keys(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PricingPolicy {
    /// Fail snapshot loading when two seasons overlap instead of pricing the
    /// shared nights by the first one declared.
    #[serde(default)]
    pub reject_overlapping_seasons: bool,
}

fn default_min_nights() -> u32 {
    2
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("snapshot.yaml")
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_tracked_keys() -> usize {
    10_000
}
