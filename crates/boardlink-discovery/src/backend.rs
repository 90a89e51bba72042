//! Registration of inventory sinks with a discovery backend

use boardlink_core::InventorySink;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tracing::debug;
use uuid::Uuid;

/// A source of attach/detach batches
pub trait DiscoveryBackend {
    /// Start pushing batches to `sink` until the returned handle is dropped
    fn register(&self, sink: Arc<dyn InventorySink>) -> Registration;
}

/// Sinks currently registered with a backend
#[derive(Default)]
pub struct SinkRegistry {
    sinks: RwLock<Vec<(Uuid, Arc<dyn InventorySink>)>>,
}

impl SinkRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<(Uuid, Arc<dyn InventorySink>)>> {
        self.sinks.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<(Uuid, Arc<dyn InventorySink>)>> {
        self.sinks.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a sink and hand back its deregistration handle
    pub fn register(self: &Arc<Self>, sink: Arc<dyn InventorySink>) -> Registration {
        let id = Uuid::new_v4();
        self.write().push((id, sink));
        debug!(registration = %id, "Inventory sink registered");
        Registration {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: Uuid) -> bool {
        let mut sinks = self.write();
        let before = sinks.len();
        sinks.retain(|(sink_id, _)| *sink_id != id);
        before != sinks.len()
    }

    /// Drop every registration
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Registered sinks, in registration order
    pub fn sinks(&self) -> Vec<Arc<dyn InventorySink>> {
        self.read().iter().map(|(_, sink)| Arc::clone(sink)).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// Handle for a registered sink; dropping it deregisters the sink
#[must_use = "dropping a Registration deregisters the sink immediately"]
pub struct Registration {
    id: Uuid,
    registry: Weak<SinkRegistry>,
}

impl Registration {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the sink still receives batches
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.read().iter().any(|(id, _)| *id == self.id))
    }

    /// Explicitly stop receiving batches
    pub fn deregister(self) {
        drop(self);
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.id) {
                debug!(registration = %self.id, "Inventory sink deregistered");
            }
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
