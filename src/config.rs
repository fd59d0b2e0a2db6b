//! Application configuration management.
//!
//! Holds where the separation backend lives, how long to wait on it, and
//! the defaults every playback session starts from. Stored as TOML in the
//! user's config directory (typically ~/.config/stemdeck/config.toml).

use crate::constants::{DEFAULT_API_BASE_URL, DEFAULT_STEM_EXTENSION, DEFAULT_VOLUME};
use crate::session::{FailurePolicy, SessionConfig};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_info_timeout_secs")]
    pub info_timeout_secs: u64,
    #[serde(default = "default_demux_timeout_secs")]
    pub demux_timeout_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_stem_extension")]
    pub stem_extension: String,
    #[serde(default = "default_volume")]
    pub default_volume: f32,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_info_timeout_secs() -> u64 {
    30
}

fn default_demux_timeout_secs() -> u64 {
    1200
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_stem_extension() -> String {
    DEFAULT_STEM_EXTENSION.to_string()
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            info_timeout_secs: default_info_timeout_secs(),
            demux_timeout_secs: default_demux_timeout_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            stem_extension: default_stem_extension(),
            default_volume: default_volume(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
        // Check for XDG_CONFIG_HOME first (useful for testing)
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config).join("stemdeck")
        } else {
            dirs::config_dir()
                .ok_or("Unable to find config directory")?
                .join("stemdeck")
        };
        Ok(config_dir)
    }

    pub fn config_path() -> Result<PathBuf, Box<dyn Error>> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self, Box<dyn Error>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Default::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        let config_path = Self::config_path()?;
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(&config_path, toml_string)?;

        Ok(())
    }

    pub fn exists() -> Result<bool, Box<dyn Error>> {
        Ok(Self::config_path()?.exists())
    }

    /// The subset a playback session needs.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            default_volume: self.default_volume.clamp(0.0, 1.0),
            failure_policy: self.failure_policy,
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        match key {
            "api_base_url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err("api_base_url must start with http:// or https://".into());
                }
                self.api_base_url = value.to_string();
            }
            "info_timeout_secs" => self.info_timeout_secs = parse_secs(value)?,
            "demux_timeout_secs" => self.demux_timeout_secs = parse_secs(value)?,
            "fetch_timeout_secs" => self.fetch_timeout_secs = parse_secs(value)?,
            "stem_extension" => {
                let ext = value.trim().trim_start_matches('.');
                if ext.is_empty() {
                    return Err("stem_extension must not be empty".into());
                }
                self.stem_extension = ext.to_string();
            }
            "default_volume" => {
                let volume = value
                    .parse::<f32>()
                    .map_err(|_| "Value must be a number between 0.0 and 1.0")?;
                if !(0.0..=1.0).contains(&volume) {
                    return Err("Value must be a number between 0.0 and 1.0".into());
                }
                self.default_volume = volume;
            }
            "failure_policy" => self.failure_policy = value.parse::<FailurePolicy>()?,
            _ => return Err(format!("Unknown configuration key: {key}").into()),
        }
        Ok(())
    }
}

fn parse_secs(value: &str) -> Result<u64, Box<dyn Error>> {
    match value.parse::<u64>() {
        Ok(0) | Err(_) => Err("Value must be a positive number of seconds".into()),
        Ok(secs) => Ok(secs),
    }
}
