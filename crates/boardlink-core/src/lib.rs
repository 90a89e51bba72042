//! Boardlink Core - Attached device inventory and selection reconciliation
//!
//! This crate provides the foundational types for the Boardlink system:
//! - Endpoint and device value types reported by discovery
//! - Inventory store applying attach/detach batches
//! - Selection store persisted through a key/value storage
//! - Reconciliation of inventory and selection into available devices
//! - Device tracker publishing inventory and availability changes

pub mod available;
pub mod config;
pub mod device;
pub mod inventory;
pub mod notify;
pub mod selection;
pub mod storage;
pub mod tracker;

pub use available::{can_verify, compute_available, AvailableDevice, Classification};
pub use config::TrackerConfig;
pub use device::{AttachItem, Device, Endpoint};
pub use inventory::{
    InventoryChange, InventoryDiff, InventoryError, InventorySnapshot, InventoryStore,
};
pub use notify::{AvailableDevices, Notifier};
pub use selection::{Selection, SelectionPersistence, SelectionStore};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use tracker::{DeviceTracker, InventorySink};
