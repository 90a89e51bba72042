//! Application state management

use anyhow::Result;
use boardlink_core::{
    AvailableDevices, DeviceTracker, FileStorage, KeyValueStorage, MemoryStorage,
};
use boardlink_discovery::{DiscoveryBackend, ManualDiscovery, Registration};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Authoritative available-devices view
    pub tracker: Arc<DeviceTracker>,
    /// Backend fed by the event feed
    pub discovery: ManualDiscovery,
    /// Keeps the tracker registered with the backend
    registration: Registration,
}

impl AppState {
    /// Create new application state
    pub fn new(config: &Config) -> Result<Self> {
        let storage = open_storage(config)?;
        let tracker = Arc::new(DeviceTracker::new(&config.to_tracker_config(), storage));

        let discovery = ManualDiscovery::new();
        let registration = discovery.register(tracker.clone());
        debug!(registration = %registration.id(), "Tracker registered with discovery");

        Ok(Self {
            tracker,
            discovery,
            registration,
        })
    }

    /// Print every available-devices change until the tracker goes away
    pub fn spawn_reporter(&self) -> JoinHandle<()> {
        let mut rx = self.tracker.subscribe_available();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(available) => print_available(&available),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped = skipped, "Reporter lagged behind availability changes");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Deregister from discovery and clear the inventory
    pub fn shutdown(self) {
        self.discovery.dispose();
        drop(self.registration);
        info!("Discovery disposed");
    }
}

fn open_storage(config: &Config) -> Result<Arc<dyn KeyValueStorage>> {
    match &config.storage.path {
        Some(path) => {
            let storage = FileStorage::open(path)?;
            info!(path = %storage.path().display(), "Using file storage");
            Ok(Arc::new(storage))
        }
        None => {
            info!("No storage path configured, selection will not outlive this run");
            Ok(Arc::new(MemoryStorage::new()))
        }
    }
}

/// Print the available devices list, one entry per line
pub fn print_available(available: &AvailableDevices) {
    println!("Available devices ({}):", available.len());
    for entry in available.iter() {
        println!("  {}", entry);
    }
}
