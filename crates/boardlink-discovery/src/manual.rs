//! Discovery backend driven by explicit attach/detach calls
//!
//! Used when the inventory comes from somewhere other than a hardware scan:
//! a replayed event feed, an external watcher, or tests.

use boardlink_core::{AttachItem, InventoryDiff, InventoryError, InventorySink, InventorySnapshot};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::{DiscoveryBackend, Registration, SinkRegistry};

pub struct ManualDiscovery {
    registry: Arc<SinkRegistry>,
}

impl ManualDiscovery {
    pub fn new() -> Self {
        Self {
            registry: SinkRegistry::new(),
        }
    }

    /// Push a batch of attachments
    pub fn attach<I>(&self, items: I) -> Result<(), InventoryError>
    where
        I: IntoIterator,
        I::Item: Into<AttachItem>,
    {
        self.apply(&InventoryDiff::attach(items.into_iter().map(Into::into)))
    }

    /// Push a batch of detachments
    pub fn detach<I>(&self, items: I) -> Result<(), InventoryError>
    where
        I: IntoIterator,
        I::Item: Into<AttachItem>,
    {
        self.apply(&InventoryDiff::detach(items.into_iter().map(Into::into)))
    }

    /// Push a diff to every registered sink.
    ///
    /// Every sink sees the batch; the first rejection is returned.
    pub fn apply(&self, diff: &InventoryDiff) -> Result<(), InventoryError> {
        let mut first_error = None;
        for sink in self.registry.sinks() {
            if let Err(e) = sink.apply_diff(diff) {
                warn!(error = %e, "Inventory sink rejected discovery batch");
                first_error.get_or_insert(e);
            }
        }
        debug!(
            attached = diff.attach.len(),
            detached = diff.detach.len(),
            sinks = self.registry.len(),
            "Pushed discovery batch"
        );
        first_error.map_or(Ok(()), Err)
    }

    /// Report a full inventory to every sink.
    ///
    /// Every sink sees the snapshot; the first rejection is returned.
    pub fn replace(&self, snapshot: InventorySnapshot, silent: bool) -> Result<(), InventoryError> {
        let mut first_error = None;
        for sink in self.registry.sinks() {
            if let Err(e) = sink.replace_inventory(snapshot.clone(), silent) {
                warn!(error = %e, "Inventory sink rejected full inventory");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Clear every sink's inventory without notifying
    pub fn reset(&self) {
        for sink in self.registry.sinks() {
            sink.reset_inventory();
        }
    }

    /// Reset every sink, then drop all registrations
    pub fn dispose(&self) {
        self.reset();
        self.registry.clear();
        debug!("Manual discovery disposed");
    }

    pub fn sink_count(&self) -> usize {
        self.registry.len()
    }
}

impl Default for ManualDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryBackend for ManualDiscovery {
    fn register(&self, sink: Arc<dyn InventorySink>) -> Registration {
        self.registry.register(sink)
    }
}
