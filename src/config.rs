use anyhow::{Context, Result, anyhow};
use chrono::NaiveTime;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::StateManager;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub integration: IntegrationConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Overrides the platform data directory
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub auto_send: bool,
    pub poll_interval_secs: u64,
    /// Local time of day messages go out, `HH:MM`
    pub send_time: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { auto_send: true, poll_interval_secs: 10, send_time: "09:00".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    pub webhook_url: Option<String>,
}

impl SchedulerConfig {
    pub fn send_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.send_time, "%H:%M").map_err(|e| {
            anyhow!("Invalid send_time '{}' in config (expected HH:MM): {}", self.send_time, e)
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl Config {
    /// Read the config at `path`, writing defaults there if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        match Self::read_from(path)? {
            Some(config) => Ok(config),
            None => {
                let default_config = Config::default();
                default_config.save_to(path)?;
                Ok(default_config)
            }
        }
    }

    /// Read the config at `path` without creating it; `None` when it is missing
    pub fn read_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.scheduler.send_time()?;
        Ok(Some(config))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(StateManager::default_dir()?),
        }
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "celebrate", "celebrate")
        .context("Failed to determine config directory")?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}
