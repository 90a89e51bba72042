//! The user's declared device/endpoint choice and its persistence

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::device::{Device, Endpoint};
use crate::storage::{KeyValueStorage, StorageError};

/// Selected device and endpoint, independent of what is attached right now
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_device: Option<Device>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_endpoint: Option<Endpoint>,
}

impl Selection {
    pub fn new(device: Option<Device>, endpoint: Option<Endpoint>) -> Self {
        Self {
            selected_device: device,
            selected_endpoint: endpoint,
        }
    }

    /// Select a device on the endpoint it currently reports
    pub fn of_device(device: Device) -> Self {
        let endpoint = device.endpoint.clone();
        Self::new(Some(device), endpoint)
    }

    pub fn is_empty(&self) -> bool {
        self.selected_device.is_none() && self.selected_endpoint.is_none()
    }

    /// Whether `device` is the selected device sitting on the selected endpoint.
    ///
    /// Devices are compared by name and type identifier; the endpoint the
    /// device carries must equal the selected endpoint.
    pub fn same_as(&self, device: &Device) -> bool {
        let Some(selected) = &self.selected_device else {
            return false;
        };
        selected.name == device.name
            && selected.type_id == device.type_id
            && Endpoint::same_as(self.selected_endpoint.as_ref(), device.endpoint.as_ref())
    }
}

/// Storage handle used to write a selection back out
#[derive(Clone)]
pub struct SelectionPersistence {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl SelectionPersistence {
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored selection.
    ///
    /// A missing or unreadable entry yields an empty selection.
    pub fn load(&self) -> Selection {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "No stored selection, starting empty");
                return Selection::default();
            }
            Err(e) => {
                warn!(
                    key = %self.key,
                    error = %e,
                    "Failed to read stored selection, starting empty"
                );
                return Selection::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(selection) => {
                info!(key = %self.key, "Loaded stored selection");
                selection
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Stored selection is corrupt, starting empty");
                Selection::default()
            }
        }
    }

    /// Write the selection to storage
    pub fn save(&self, selection: &Selection) -> Result<(), StorageError> {
        let raw = serde_json::to_string(selection)?;
        self.storage.set(&self.key, &raw)
    }
}

impl std::fmt::Debug for SelectionPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionPersistence")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Owner of the current selection
#[derive(Debug)]
pub struct SelectionStore {
    current: Arc<Selection>,
    persistence: SelectionPersistence,
}

impl SelectionStore {
    /// Create the store, seeded from whatever storage holds under the key
    pub fn load(persistence: SelectionPersistence) -> Self {
        let current = Arc::new(persistence.load());
        Self {
            current,
            persistence,
        }
    }

    pub fn get(&self) -> Arc<Selection> {
        Arc::clone(&self.current)
    }

    /// Replace the selection. No validation against the inventory is done.
    pub fn set(&mut self, selection: Selection) -> Arc<Selection> {
        self.current = Arc::new(selection);
        Arc::clone(&self.current)
    }

    pub fn persistence(&self) -> &SelectionPersistence {
        &self.persistence
    }
}
