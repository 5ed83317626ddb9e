//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CAPSIFT_*)
//! 2. TOML config file (if CAPSIFT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CAPSIFT_*)
/// 2. TOML config file (if CAPSIFT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host substring a DOM candidate's source URL must contain.
    ///
    /// Set via CAPSIFT_TARGET_HOST environment variable.
    #[serde(default = "default_target_host")]
    pub target_host: String,

    /// Icon-size bar: a candidate needs one dimension strictly above this
    /// many pixels to count as a content card rather than page chrome.
    ///
    /// Set via CAPSIFT_MIN_CARD_PX environment variable.
    #[serde(default = "default_min_card_px")]
    pub min_card_px: u32,

    /// Junk bar for unmatched candidates: with both dimensions strictly
    /// below this, an image that matched nothing in the capture index is
    /// assumed to be unrelated page furniture.
    ///
    /// Set via CAPSIFT_JUNK_PX environment variable.
    #[serde(default = "default_junk_px")]
    pub junk_px: u32,

    /// Broadcast debounce window in milliseconds.
    ///
    /// Set via CAPSIFT_DEBOUNCE_MS environment variable.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum mining recursion depth into a JSON payload.
    ///
    /// Set via CAPSIFT_MAX_MINE_DEPTH environment variable.
    #[serde(default = "default_max_mine_depth")]
    pub max_mine_depth: usize,

    /// Drain slice budget for the scan scheduler, in milliseconds.
    /// 0 disables budgeted draining and falls back to a fixed short delay
    /// followed by a single full drain.
    ///
    /// Set via CAPSIFT_DRAIN_SLICE_MS environment variable.
    #[serde(default = "default_drain_slice_ms")]
    pub drain_slice_ms: u64,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via CAPSIFT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via CAPSIFT_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via CAPSIFT_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Directory deep-scanned assets are written to.
    ///
    /// Set via CAPSIFT_DOWNLOAD_DIR environment variable.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

fn default_target_host() -> String {
    "ibyteimg.com".into()
}

fn default_min_card_px() -> u32 {
    140
}

fn default_junk_px() -> u32 {
    400
}

fn default_debounce_ms() -> u64 {
    1_500
}

fn default_max_mine_depth() -> usize {
    8
}

fn default_drain_slice_ms() -> u64 {
    50
}

fn default_user_agent() -> String {
    "capsift/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./capcut_assets")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_host: default_target_host(),
            min_card_px: default_min_card_px(),
            junk_px: default_junk_px(),
            debounce_ms: default_debounce_ms(),
            max_mine_depth: default_max_mine_depth(),
            drain_slice_ms: default_drain_slice_ms(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            download_dir: default_download_dir(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Debounce window as Duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Drain slice budget as Duration; zero means the fallback drain mode.
    pub fn drain_slice(&self) -> Duration {
        Duration::from_millis(self.drain_slice_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CAPSIFT_`
    /// 2. TOML file from `CAPSIFT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CAPSIFT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CAPSIFT_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
