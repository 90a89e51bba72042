//! Device tracker: inventory + selection + reconciliation behind one lock
//!
//! Every mutation runs mutate -> reconcile -> publish while holding the
//! tracker lock, so subscribers and readers never observe a half-applied
//! change. Readers get `Arc` snapshots that are replaced, never mutated.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::available::{can_verify, compute_available};
use crate::config::TrackerConfig;
use crate::device::AttachItem;
use crate::inventory::{
    InventoryChange, InventoryDiff, InventoryError, InventorySnapshot, InventoryStore,
};
use crate::notify::{AvailableDevices, Notifier};
use crate::selection::{Selection, SelectionPersistence, SelectionStore};
use crate::storage::KeyValueStorage;

/// Consumer side of a discovery backend registration
pub trait InventorySink: Send + Sync {
    /// Apply one attach/detach batch
    fn apply_diff(&self, diff: &InventoryDiff) -> Result<Arc<InventoryChange>, InventoryError>;

    /// Replace the whole inventory, optionally without notifying
    fn replace_inventory(
        &self,
        snapshot: InventorySnapshot,
        silent: bool,
    ) -> Result<(), InventoryError>;

    /// Clear the inventory without notifying
    fn reset_inventory(&self);
}

struct TrackerState {
    inventory: InventoryStore,
    selection: SelectionStore,
    available: AvailableDevices,
}

impl TrackerState {
    fn reconcile(&mut self) -> AvailableDevices {
        let available = compute_available(&self.inventory.snapshot(), &self.selection.get());
        self.available = Arc::new(available);
        Arc::clone(&self.available)
    }
}

/// Authoritative "available devices" view over live inventory and the user's selection
pub struct DeviceTracker {
    state: Mutex<TrackerState>,
    notifier: Notifier,
}

impl DeviceTracker {
    /// Create a tracker with an empty inventory and the selection stored under the configured key
    pub fn new(config: &TrackerConfig, storage: Arc<dyn KeyValueStorage>) -> Self {
        let persistence = SelectionPersistence::new(storage, config.selection_key.clone());
        let mut state = TrackerState {
            inventory: InventoryStore::new(),
            selection: SelectionStore::load(persistence),
            available: Arc::new(Vec::new()),
        };
        state.reconcile();

        Self {
            state: Mutex::new(state),
            notifier: Notifier::new(config.channel_capacity),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply a discovery batch and publish the inventory and available changes.
    ///
    /// A rejected batch leaves every snapshot untouched and publishes nothing.
    pub fn apply_diff(
        &self,
        to_attach: &[AttachItem],
        to_detach: &[AttachItem],
    ) -> Result<Arc<InventoryChange>, InventoryError> {
        let mut state = self.lock();
        let change = Arc::new(state.inventory.apply_diff(to_attach, to_detach)?);
        let available = state.reconcile();

        debug!(
            devices = change.new_state.devices.len(),
            endpoints = change.new_state.endpoints.len(),
            available = available.len(),
            "Inventory changed"
        );

        self.notifier.inventory_changed(Arc::clone(&change));
        self.notifier.available_changed(available);
        Ok(change)
    }

    /// Replace the whole inventory.
    ///
    /// With `silent` set the available list is still recomputed, but nothing is published.
    /// A snapshot with a device on an unlisted endpoint is rejected and changes nothing.
    pub fn replace_inventory(
        &self,
        snapshot: InventorySnapshot,
        silent: bool,
    ) -> Result<Option<Arc<InventoryChange>>, InventoryError> {
        let mut state = self.lock();
        let change = state.inventory.replace(snapshot, silent)?.map(Arc::new);
        let available = state.reconcile();

        if let Some(change) = &change {
            self.notifier.inventory_changed(Arc::clone(change));
            self.notifier.available_changed(available);
        }
        Ok(change)
    }

    /// Clear the inventory without notifying
    pub fn reset(&self) {
        let mut state = self.lock();
        state.inventory.reset();
        state.reconcile();
        debug!("Inventory reset");
    }

    pub fn inventory(&self) -> Arc<InventorySnapshot> {
        self.lock().inventory.snapshot()
    }

    /// Current available devices, in reconciliation order
    pub fn available_devices(&self) -> AvailableDevices {
        Arc::clone(&self.lock().available)
    }

    pub fn selection(&self) -> Arc<Selection> {
        self.lock().selection.get()
    }

    /// Replace the selection, reconcile, publish, then persist it.
    ///
    /// A failed save is logged; the new selection stays in effect.
    ///
    /// The save runs after the tracker lock is released. Two concurrent
    /// callers may therefore save in the opposite order to the one they
    /// published in, leaving storage one selection behind memory until the
    /// next call. Callers that need storage to match must serialize their
    /// `set_selection` calls.
    pub fn set_selection(&self, selection: Selection) -> AvailableDevices {
        let (available, saved, persistence) = {
            let mut state = self.lock();
            let saved = state.selection.set(selection);
            let available = state.reconcile();
            self.notifier.available_changed(Arc::clone(&available));
            (available, saved, state.selection.persistence().clone())
        };

        info!(
            device = ?saved.selected_device.as_ref().map(|d| d.name.as_str()),
            endpoint = ?saved.selected_endpoint.as_ref().map(|e| e.to_string()),
            "Selection changed"
        );

        if let Err(e) = persistence.save(&saved) {
            warn!(key = %persistence.key(), error = %e, "Failed to persist selection");
        }
        available
    }

    /// Whether the current inventory has live hardware behind `selection`
    pub fn can_verify(&self, selection: &Selection) -> bool {
        let inventory = self.inventory();
        can_verify(&inventory, selection)
    }

    pub fn subscribe_inventory(&self) -> broadcast::Receiver<Arc<InventoryChange>> {
        self.notifier.subscribe_inventory()
    }

    pub fn subscribe_available(&self) -> broadcast::Receiver<AvailableDevices> {
        self.notifier.subscribe_available()
    }
}

impl InventorySink for DeviceTracker {
    fn apply_diff(&self, diff: &InventoryDiff) -> Result<Arc<InventoryChange>, InventoryError> {
        DeviceTracker::apply_diff(self, &diff.attach, &diff.detach)
    }

    fn replace_inventory(
        &self,
        snapshot: InventorySnapshot,
        silent: bool,
    ) -> Result<(), InventoryError> {
        DeviceTracker::replace_inventory(self, snapshot, silent).map(|_| ())
    }

    fn reset_inventory(&self) {
        DeviceTracker::reset(self);
    }
}

impl std::fmt::Debug for DeviceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceTracker")
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}
