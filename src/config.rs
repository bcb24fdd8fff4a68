//! Runtime configuration.
//!
//! Values resolve in priority order: CLI flag, environment variable, config
//! file, built-in default. The bot token is only ever read from the
//! environment.
use crate::delivery::DEFAULT_DISCORD_API_BASE;
use crate::lookup::DEFAULT_API_ENDPOINT;
use crate::schedule::WeeklySchedule;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DATA_FILE: &str = "PLATEWATCH_DATA_FILE";
pub const ENV_API_ENDPOINT: &str = "PLATEWATCH_API_ENDPOINT";
pub const ENV_DISCORD_TOKEN: &str = "PLATEWATCH_DISCORD_TOKEN";

const DEFAULT_DATA_FILE: &str = "registered_plates.json";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data_file: PathBuf,
    pub api_endpoint: String,
    pub max_plates_per_owner: usize,
    pub sweep_pause_secs: u64,
    pub sweep_weekday: String,
    /// Local wall-clock time, `HH:MM`.
    pub sweep_time: String,
    pub http_timeout_secs: u64,
    pub discord_api_base: String,
    #[serde(skip)]
    pub discord_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            max_plates_per_owner: 4,
            sweep_pause_secs: 10,
            sweep_weekday: "mon".to_string(),
            sweep_time: "09:00".to_string(),
            http_timeout_secs: 30,
            discord_api_base: DEFAULT_DISCORD_API_BASE.to_string(),
            discord_token: None,
        }
    }
}

impl Config {
    pub fn schedule(&self) -> Result<WeeklySchedule> {
        WeeklySchedule::parse(&self.sweep_weekday, &self.sweep_time)
    }

    pub fn sweep_pause(&self) -> Duration {
        Duration::from_secs(self.sweep_pause_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Per-user config location, e.g. `~/.config/platewatch/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("platewatch").join(CONFIG_FILE_NAME))
}

/// Load config from `explicit`, or from the default location when present.
///
/// An explicit path must exist; a missing default file just means defaults.
pub fn load_config_file(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => path,
            None => return Ok(Config::default()),
        },
    };
    let bytes = fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
    let config: Config = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Overlay environment values, read through `var` so tests need not touch the
/// process environment.
pub fn apply_env_overrides<F>(config: &mut Config, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| var(key).filter(|value| !value.trim().is_empty());
    if let Some(path) = non_empty(ENV_DATA_FILE) {
        config.data_file = PathBuf::from(path);
    }
    if let Some(endpoint) = non_empty(ENV_API_ENDPOINT) {
        config.api_endpoint = endpoint;
    }
    config.discord_token = non_empty(ENV_DISCORD_TOKEN);
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.api_endpoint.trim().is_empty() {
        return Err(anyhow!("api_endpoint must be non-empty"));
    }
    if config.discord_api_base.trim().is_empty() {
        return Err(anyhow!("discord_api_base must be non-empty"));
    }
    if config.data_file.as_os_str().is_empty() {
        return Err(anyhow!("data_file must be non-empty"));
    }
    if config.max_plates_per_owner == 0 {
        return Err(anyhow!("max_plates_per_owner must be at least 1"));
    }
    if config.http_timeout_secs == 0 {
        return Err(anyhow!("http_timeout_secs must be at least 1"));
    }
    config.schedule().context("invalid sweep schedule")?;
    Ok(())
}
