//! Tracker configuration

use serde::{Deserialize, Serialize};

/// Settings for a [`DeviceTracker`](crate::tracker::DeviceTracker)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Storage key the selection is persisted under
    #[serde(default = "default_selection_key")]
    pub selection_key: String,
    /// Events buffered per lagging subscriber on each notification channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            selection_key: default_selection_key(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_selection_key() -> String {
    "boardlink-selection".to_string()
}

fn default_channel_capacity() -> usize {
    100
}
