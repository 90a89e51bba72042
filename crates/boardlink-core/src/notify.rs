//! Change notification channels
//!
//! Two independent broadcast channels: one fires for every accepted
//! inventory change, the other for every reconciliation pass. Events are
//! shared `Arc` snapshots, so each subscriber sees the same immutable value.
//! Dropping a receiver unsubscribes it.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

use crate::available::AvailableDevice;
use crate::inventory::InventoryChange;

/// Snapshot of the available-devices list as published to subscribers
pub type AvailableDevices = Arc<Vec<AvailableDevice>>;

pub struct Notifier {
    inventory_tx: broadcast::Sender<Arc<InventoryChange>>,
    available_tx: broadcast::Sender<AvailableDevices>,
}

impl Notifier {
    /// Create both channels, each buffering up to `capacity` events per lagging receiver
    pub fn new(capacity: usize) -> Self {
        let (inventory_tx, _) = broadcast::channel(capacity.max(1));
        let (available_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inventory_tx,
            available_tx,
        }
    }

    pub fn subscribe_inventory(&self) -> broadcast::Receiver<Arc<InventoryChange>> {
        self.inventory_tx.subscribe()
    }

    pub fn subscribe_available(&self) -> broadcast::Receiver<AvailableDevices> {
        self.available_tx.subscribe()
    }

    pub fn inventory_changed(&self, change: Arc<InventoryChange>) {
        // No receivers is not an error
        let delivered = self.inventory_tx.send(change).unwrap_or(0);
        trace!(receivers = delivered, "Published inventory change");
    }

    pub fn available_changed(&self, available: AvailableDevices) {
        let delivered = self.available_tx.send(available).unwrap_or(0);
        trace!(receivers = delivered, "Published available devices");
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("inventory_receivers", &self.inventory_tx.receiver_count())
            .field("available_receivers", &self.available_tx.receiver_count())
            .finish()
    }
}
