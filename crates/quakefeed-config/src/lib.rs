//! Configuration loading for Quakefeed.
//! Reads quakefeed.toml from the current directory or the path in QUAKEFEED_CONFIG.

use quakefeed_common::{QuakefeedError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub map: MapConfig,
}

/// Where predictions come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String { "http://localhost:5000".to_string() }
fn default_timeout_ms() -> u64  { 5_000 }

impl Default for SourceConfig {
    fn default() -> Self {
        Self { base_url: default_base_url(), timeout_ms: default_timeout_ms() }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "bool_true")]
    pub autostart: bool,
    /// Allowed gap between the reported and recomputed absolute error.
    #[serde(default = "default_error_tolerance")]
    pub error_tolerance: f64,
}

fn default_interval_ms()     -> u64  { 2_000 }
fn bool_true()               -> bool { true }
fn default_error_tolerance() -> f64  { 1e-6 }

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            autostart: bool_true(),
            error_tolerance: default_error_tolerance(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String { "127.0.0.1:3001".to_string() }

impl Default for WebConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// Map presentation hints handed to the render adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_center")]
    pub default_center: [f64; 2],
    #[serde(default = "default_zoom")]
    pub default_zoom: u8,
    #[serde(default = "default_fit_padding")]
    pub fit_padding_px: u32,
    #[serde(default = "default_fit_max_zoom")]
    pub fit_max_zoom: u8,
    #[serde(default = "default_recent_rows")]
    pub recent_rows: usize,
}

fn default_center()       -> [f64; 2] { [31.5, 77.0] }
fn default_zoom()         -> u8       { 7 }
fn default_fit_padding()  -> u32      { 50 }
fn default_fit_max_zoom() -> u8       { 10 }
fn default_recent_rows()  -> usize    { 4 }

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_center: default_center(),
            default_zoom: default_zoom(),
            fit_padding_px: default_fit_padding(),
            fit_max_zoom: default_fit_max_zoom(),
            recent_rows: default_recent_rows(),
        }
    }
}


impl Config {
    /// Load configuration from quakefeed.toml.
    /// Checks QUAKEFEED_CONFIG env var first, then current directory.
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load() -> Result<Self> {
        let path = std::env::var("QUAKEFEED_CONFIG")
            .unwrap_or_else(|_| "quakefeed.toml".to_string());

        let mut config = Self::load_from(&path)?;
        if let Ok(bind) = std::env::var("QUAKEFEED_BIND") {
            config.web.bind = bind;
        }
        Ok(config)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| QuakefeedError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.poll.interval_ms == 0 {
            return Err(QuakefeedError::Config("poll.interval_ms must be greater than zero".into()));
        }
        if self.source.timeout_ms == 0 {
            return Err(QuakefeedError::Config("source.timeout_ms must be greater than zero".into()));
        }
        if self.poll.error_tolerance.is_nan() || self.poll.error_tolerance < 0.0 {
            return Err(QuakefeedError::Config("poll.error_tolerance must be non-negative".into()));
        }
        Ok(())
    }
}
