//! Configuration loading

use anyhow::Result;
use boardlink_core::TrackerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerSection,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSection {
    /// Storage key for the persisted selection
    #[serde(default = "default_selection_key")]
    pub selection_key: String,
    /// Buffered notifications per lagging subscriber
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            selection_key: default_selection_key(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_selection_key() -> String {
    TrackerConfig::default().selection_key
}

fn default_channel_capacity() -> usize {
    TrackerConfig::default().channel_capacity
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the persisted selection (in-memory when unset)
    #[serde(default)]
    pub path: Option<String>,
}

impl Config {
    /// Convert to TrackerConfig
    pub fn to_tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            selection_key: self.tracker.selection_key.clone(),
            channel_capacity: self.tracker.channel_capacity,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let config = Config {
        tracker: TrackerSection::default(),
        storage: StorageConfig {
            path: Some("./boardlink-state.json".to_string()),
        },
    };

    let content = toml::to_string_pretty(&config)?;
    std::fs::write(path, content)?;
    Ok(())
}
