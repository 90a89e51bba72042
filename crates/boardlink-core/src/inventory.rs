//! Live inventory of attached devices and endpoints
//!
//! The store owns the current [`InventorySnapshot`] and replaces it wholesale
//! on every accepted diff. A diff is applied to a working copy first, so a
//! rejected diff leaves the published snapshot untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::device::{AttachItem, Device, Endpoint};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Device {device} is not attached (attached devices: {})", list(.attached))]
    NotAttached { device: Device, attached: Vec<Device> },
    #[error("Endpoint {endpoint} is not available (available endpoints: {})", list(.available))]
    EndpointNotAvailable {
        endpoint: Endpoint,
        available: Vec<Endpoint>,
    },
    #[error("Endpoint {endpoint} is still used by device {device}")]
    EndpointInUse { endpoint: Endpoint, device: Device },
}

fn list<T: std::fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "none".to_string();
    }
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Devices and endpoints currently reported by discovery, in attach order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

impl InventorySnapshot {
    pub fn new(devices: Vec<Device>, endpoints: Vec<Endpoint>) -> Self {
        Self { devices, endpoints }
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty() && self.endpoints.is_empty()
    }

    /// Find the live endpoint a device is bound to
    pub fn endpoint_for(&self, device: &Device) -> Option<&Endpoint> {
        let wanted = device.endpoint.as_ref()?;
        self.endpoints.iter().find(|e| *e == wanted)
    }

    /// Check whether an endpoint is currently live
    pub fn has_endpoint(&self, endpoint: &Endpoint) -> bool {
        self.endpoints.contains(endpoint)
    }

    /// Check that every device's endpoint is listed among the live endpoints
    pub fn validate(&self) -> Result<(), InventoryError> {
        for device in &self.devices {
            if let Some(endpoint) = &device.endpoint {
                if !self.has_endpoint(endpoint) {
                    return Err(InventoryError::EndpointNotAvailable {
                        endpoint: endpoint.clone(),
                        available: self.endpoints.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn attach(&mut self, item: &AttachItem) {
        match item {
            AttachItem::Device(device) => {
                // Endpoint first so every intermediate state stays consistent
                if let Some(endpoint) = &device.endpoint {
                    self.endpoints.push(endpoint.clone());
                }
                self.devices.push(device.clone());
            }
            AttachItem::Endpoint(endpoint) => self.endpoints.push(endpoint.clone()),
        }
    }

    fn detach(
        &mut self,
        item: &AttachItem,
        before: &InventorySnapshot,
    ) -> Result<(), InventoryError> {
        match item {
            AttachItem::Device(device) => {
                let index = self
                    .devices
                    .iter()
                    .position(|d| d == device)
                    .ok_or_else(|| InventoryError::NotAttached {
                        device: device.clone(),
                        attached: before.devices.clone(),
                    })?;
                self.devices.remove(index);
                if let Some(endpoint) = &device.endpoint {
                    self.remove_endpoint(endpoint, before)?;
                }
            }
            AttachItem::Endpoint(endpoint) => {
                self.remove_endpoint(endpoint, before)?;
                // A bare endpoint may only go once no remaining device sits on it
                if !self.has_endpoint(endpoint) {
                    let user = self.devices.iter().find(|d| d.has_endpoint(endpoint));
                    if let Some(device) = user {
                        return Err(InventoryError::EndpointInUse {
                            endpoint: endpoint.clone(),
                            device: device.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn remove_endpoint(
        &mut self,
        endpoint: &Endpoint,
        before: &InventorySnapshot,
    ) -> Result<(), InventoryError> {
        let index = self
            .endpoints
            .iter()
            .position(|e| e == endpoint)
            .ok_or_else(|| InventoryError::EndpointNotAvailable {
                endpoint: endpoint.clone(),
                available: before.endpoints.clone(),
            })?;
        self.endpoints.remove(index);
        Ok(())
    }
}

/// A batch of attach/detach items pushed by a discovery backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDiff {
    #[serde(default)]
    pub attach: Vec<AttachItem>,
    #[serde(default)]
    pub detach: Vec<AttachItem>,
}

impl InventoryDiff {
    pub fn attach(items: impl IntoIterator<Item = AttachItem>) -> Self {
        Self {
            attach: items.into_iter().collect(),
            detach: Vec::new(),
        }
    }

    pub fn detach(items: impl IntoIterator<Item = AttachItem>) -> Self {
        Self {
            attach: Vec::new(),
            detach: items.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attach.is_empty() && self.detach.is_empty()
    }
}

/// Before/after pair produced by every accepted inventory mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryChange {
    pub old_state: Arc<InventorySnapshot>,
    pub new_state: Arc<InventorySnapshot>,
    pub changed_at: DateTime<Utc>,
}

/// Owner of the current inventory snapshot
#[derive(Debug, Default)]
pub struct InventoryStore {
    current: Arc<InventorySnapshot>,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot (cheap `Arc` clone)
    pub fn snapshot(&self) -> Arc<InventorySnapshot> {
        Arc::clone(&self.current)
    }

    /// Apply a discovery diff: attachments first, then detachments.
    ///
    /// Fails without touching the current snapshot if any detachment names a
    /// device or endpoint that is not present at that point of the batch.
    pub fn apply_diff(
        &mut self,
        to_attach: &[AttachItem],
        to_detach: &[AttachItem],
    ) -> Result<InventoryChange, InventoryError> {
        let old_state = Arc::clone(&self.current);
        let mut next = (*old_state).clone();

        for item in to_attach {
            next.attach(item);
        }
        for item in to_detach {
            next.detach(item, &old_state)?;
        }

        debug!(
            attached = to_attach.len(),
            detached = to_detach.len(),
            devices = next.devices.len(),
            endpoints = next.endpoints.len(),
            "Applied inventory diff"
        );

        self.current = Arc::new(next);
        Ok(InventoryChange {
            old_state,
            new_state: Arc::clone(&self.current),
            changed_at: Utc::now(),
        })
    }

    /// Replace the whole inventory at once.
    ///
    /// The snapshot must be consistent: every device endpoint also listed
    /// among the endpoints. Returns `Ok(None)` when `silent` is set, so no
    /// notification goes out.
    pub fn replace(
        &mut self,
        snapshot: InventorySnapshot,
        silent: bool,
    ) -> Result<Option<InventoryChange>, InventoryError> {
        snapshot.validate()?;
        let old_state = std::mem::replace(&mut self.current, Arc::new(snapshot));
        if silent {
            return Ok(None);
        }
        Ok(Some(InventoryChange {
            old_state,
            new_state: Arc::clone(&self.current),
            changed_at: Utc::now(),
        }))
    }

    /// Clear both lists without producing a change
    pub fn reset(&mut self) {
        self.current = Arc::new(InventorySnapshot::default());
    }
}
