//! Configuration and response types for the statistics engine.

use std::time::Duration;

use chromegle_stats_core::CategoryTotals;
use serde::{Deserialize, Serialize};

/// The aggregate statistics served to clients.
///
/// Field names are the public wire contract of the statistics endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// Distinct identities active in any category within the recent window.
    pub online_users: u64,
    /// Distinct identities per category within the recent window.
    pub ten_minutes: CategoryTotals,
    /// Events since local midnight.
    pub today: CategoryTotals,
    /// Events over the trailing week, today included.
    pub week: CategoryTotals,
    /// Every event ever counted.
    pub forever: CategoryTotals,
}

/// Configuration for the statistics service.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    /// Width of the recent-activity window in minutes.
    #[serde(default = "StatsConfig::default_recent_window")]
    pub recent_window_minutes: u32,

    /// Days before today included in the weekly bucket.
    #[serde(default = "StatsConfig::default_week_days")]
    pub week_days: u32,

    /// How long a computed snapshot stays cached, in seconds.
    #[serde(default = "StatsConfig::default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    /// Cache key of the statistics snapshot.
    #[serde(default = "StatsConfig::default_cache_key")]
    pub cache_key: String,
}

impl StatsConfig {
    const fn default_recent_window() -> u32 {
        10
    }

    const fn default_week_days() -> u32 {
        7
    }

    const fn default_cache_ttl() -> u64 {
        120
    }

    fn default_cache_key() -> String {
        "chromegle:statistics".to_string()
    }

    /// Get the cache TTL as a `Duration`.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            recent_window_minutes: Self::default_recent_window(),
            week_days: Self::default_week_days(),
            cache_ttl_seconds: Self::default_cache_ttl(),
            cache_key: Self::default_cache_key(),
        }
    }
}

/// Configuration for the geolocation read-through cache.
#[derive(Debug, Clone, Deserialize)]
pub struct GeolocationConfig {
    /// Base URL of the geolocation API.
    #[serde(default = "GeolocationConfig::default_base_url")]
    pub base_url: String,

    /// How long a lookup result stays cached, in seconds.
    #[serde(default = "GeolocationConfig::default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    /// Prefix of the per-address cache key.
    #[serde(default = "GeolocationConfig::default_key_prefix")]
    pub cache_key_prefix: String,
}

impl GeolocationConfig {
    fn default_base_url() -> String {
        "https://get.geojs.io".to_string()
    }

    const fn default_cache_ttl() -> u64 {
        7200 // 2 hours
    }

    fn default_key_prefix() -> String {
        "chromegle:geolocate:".to_string()
    }

    /// Get the cache TTL as a `Duration`.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Cache key for an address.
    #[must_use]
    pub fn cache_key(&self, address: &str) -> String {
        format!("{}{address}", self.cache_key_prefix)
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            cache_ttl_seconds: Self::default_cache_ttl(),
            cache_key_prefix: Self::default_key_prefix(),
        }
    }
}
