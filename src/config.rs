//! Configuration management for rokuremote
//!
//! Handles config file loading, discovery/polling defaults and channel presets.
//! Config is stored at ~/.config/rokuremote/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::discovery::ROKU_SEARCH_TARGET;

/// Default discovery listen window (seconds)
pub const DEFAULT_DISCOVERY_TIMEOUT: u64 = 10;
/// Default power-state poll interval (seconds)
pub const DEFAULT_POWER_POLL_INTERVAL: u64 = 10;
/// Default periodic rediscovery interval (seconds)
pub const DEFAULT_REDISCOVER_INTERVAL: u64 = 5 * 60;

/// A channel the interactive remote can launch with a digit key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPreset {
    /// ECP channel id, e.g. "12" for Netflix
    pub id: String,
    pub label: String,
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// SSDP search target (default roku:ecp)
    pub search_target: Option<String>,
    /// Discovery listen window in seconds
    pub discovery_timeout: Option<u64>,
    /// Device to control when none is given (friendly name or base URL)
    pub default_device: Option<String>,
    /// Seconds between power-state polls
    pub power_poll_interval: Option<u64>,
    /// Seconds between background rediscovery sweeps
    pub rediscover_interval: Option<u64>,
    /// Log level (debug, info, warn, error)
    pub log_level: Option<String>,
    /// Launch presets, bound to 1-9 in the order given
    #[serde(default)]
    pub channels: Vec<ChannelPreset>,
}

impl Config {
    /// Get config file path (~/.config/rokuremote/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rokuremote").join("config.toml"))
    }

    /// Load config from the default file, or return default if not found
    pub fn load() -> Self {
        Self::path().map(|p| Self::load_from(&p)).unwrap_or_default()
    }

    /// Load config from a specific file, or return default if unreadable
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn search_target(&self) -> &str {
        self.search_target
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(ROKU_SEARCH_TARGET)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(
            self.discovery_timeout
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_DISCOVERY_TIMEOUT),
        )
    }

    pub fn power_poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.power_poll_interval
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_POWER_POLL_INTERVAL),
        )
    }

    /// Presets with a usable id, at most one per digit key
    pub fn channel_presets(&self) -> Vec<ChannelPreset> {
        self.channels
            .iter()
            .filter(|c| !c.id.trim().is_empty())
            .take(9)
            .cloned()
            .collect()
    }

    pub fn rediscover_interval(&self) -> Duration {
        Duration::from_secs(
            self.rediscover_interval
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_REDISCOVER_INTERVAL),
        )
    }
}
