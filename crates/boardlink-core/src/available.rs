//! Reconciliation of live inventory against the user's selection
//!
//! [`compute_available`] is a pure function: it reads an inventory snapshot
//! and a selection and builds the ordered list of [`AvailableDevice`]s from
//! scratch. The resulting list is ordered as follows:
//! 1. attached devices, in attach order
//! 2. live endpoints no attached device claims
//! 3. the selected device, when none of the above backs the selection

use serde::{Deserialize, Serialize};

use crate::device::{Device, Endpoint};
use crate::inventory::InventorySnapshot;
use crate::selection::Selection;

/// How well an available device is backed by live hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Catalog-known device on a live endpoint
    Recognized,
    /// Unknown to the catalog, but the user named it and its endpoint is live
    Guessed,
    /// Unidentified hardware, or a selection with no live endpoint
    Incomplete,
}

impl Classification {
    /// Whether real hardware backs an entry with this classification
    pub fn is_live(self) -> bool {
        matches!(self, Self::Recognized | Self::Guessed)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Recognized => "recognized",
            Self::Guessed => "guessed",
            Self::Incomplete => "incomplete",
        };
        f.write_str(label)
    }
}

/// A classified candidate device, rebuilt on every reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableDevice {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
    pub state: Classification,
    pub selected: bool,
}

impl AvailableDevice {
    fn attached(device: &Device, inventory: &InventorySnapshot) -> Self {
        let live = device
            .endpoint
            .as_ref()
            .is_some_and(|endpoint| inventory.has_endpoint(endpoint));
        let state = if device.is_catalog_known() && live {
            Classification::Recognized
        } else {
            Classification::Incomplete
        };
        Self {
            name: device.name.clone(),
            type_id: device.type_id.clone(),
            endpoint: device.endpoint.clone(),
            state,
            selected: false,
        }
    }

    fn unresolved(endpoint: &Endpoint) -> Self {
        Self {
            name: String::new(),
            type_id: None,
            endpoint: Some(endpoint.clone()),
            state: Classification::Incomplete,
            selected: false,
        }
    }

    /// Entry kept for a selected device whose endpoint is gone
    fn preserved(device: &Device) -> Self {
        Self {
            name: device.name.clone(),
            type_id: device.type_id.clone(),
            endpoint: None,
            state: Classification::Incomplete,
            selected: true,
        }
    }

    pub fn has_endpoint(&self, endpoint: &Endpoint) -> bool {
        self.endpoint.as_ref() == Some(endpoint)
    }

    /// No identity at all, only a live endpoint
    pub fn is_unresolved(&self) -> bool {
        self.name.is_empty() && self.type_id.is_none()
    }

    fn richness(&self) -> u8 {
        let mut score = 0;
        if self.type_id.is_some() {
            score += 2;
        }
        if !self.name.is_empty() {
            score += 1;
        }
        score
    }

    /// View this entry as a device value
    pub fn to_device(&self) -> Device {
        Device {
            name: self.name.clone(),
            type_id: self.type_id.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

impl std::fmt::Display for AvailableDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marker = if self.selected { "*" } else { " " };
        let name = if self.name.is_empty() { "<unknown>" } else { &self.name };
        write!(f, "{} {} ({})", marker, name, self.state)?;
        if let Some(type_id) = &self.type_id {
            write!(f, " [{}]", type_id)?;
        }
        match &self.endpoint {
            Some(endpoint) => write!(f, " at {}", endpoint),
            None => write!(f, " not connected"),
        }
    }
}

/// Insert `entry`, merging it into an existing entry on the same endpoint.
///
/// The richer of the two keeps the earlier position; ties keep the earlier entry.
fn push_merged(available: &mut Vec<AvailableDevice>, entry: AvailableDevice) {
    if let Some(endpoint) = &entry.endpoint {
        if let Some(existing) = available.iter_mut().find(|e| e.has_endpoint(endpoint)) {
            if entry.richness() > existing.richness() {
                *existing = entry;
            }
            return;
        }
    }
    available.push(entry);
}

/// Build the ordered, classified list of available devices
pub fn compute_available(
    inventory: &InventorySnapshot,
    selection: &Selection,
) -> Vec<AvailableDevice> {
    let capacity = inventory.devices.len() + inventory.endpoints.len() + 1;
    let mut available = Vec::with_capacity(capacity);

    for device in &inventory.devices {
        push_merged(&mut available, AvailableDevice::attached(device, inventory));
    }
    for endpoint in &inventory.endpoints {
        push_merged(&mut available, AvailableDevice::unresolved(endpoint));
    }

    let anchored = match &selection.selected_endpoint {
        Some(endpoint) => available.iter_mut().find(|e| e.has_endpoint(endpoint)),
        None => None,
    };

    match anchored {
        Some(entry) => {
            entry.selected = true;
            if let Some(device) = &selection.selected_device {
                if entry.is_unresolved() {
                    entry.name = device.name.clone();
                    entry.type_id = device.type_id.clone();
                    entry.state = Classification::Guessed;
                }
            }
        }
        None => {
            if let Some(device) = &selection.selected_device {
                available.push(AvailableDevice::preserved(device));
            }
        }
    }

    available
}

/// Whether live hardware backs `selection` in `inventory`
pub fn can_verify(inventory: &InventorySnapshot, selection: &Selection) -> bool {
    compute_available(inventory, selection)
        .iter()
        .find(|entry| entry.selected)
        .is_some_and(|entry| entry.state.is_live())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uno() -> Device {
        Device::named("Uno")
            .with_type_id("avr:uno")
            .with_endpoint(Endpoint::serial("/dev/ttyACM0"))
    }

    fn mkr() -> Device {
        Device::named("MKR1000")
            .with_type_id("samd:mkr1000")
            .with_endpoint(Endpoint::serial("/dev/ttyACM1"))
    }

    fn usb0() -> Endpoint {
        Endpoint::serial("/dev/ttyUSB0")
    }

    fn inventory(devices: Vec<Device>, bare: Vec<Endpoint>) -> InventorySnapshot {
        let mut endpoints: Vec<Endpoint> =
            devices.iter().filter_map(|d| d.endpoint.clone()).collect();
        endpoints.extend(bare);
        InventorySnapshot::new(devices, endpoints)
    }

    #[test]
    fn test_empty_inventory_and_selection() {
        let available = compute_available(&InventorySnapshot::default(), &Selection::default());
        assert!(available.is_empty());
    }

    #[test]
    fn test_attached_catalog_device_is_recognized() {
        let available = compute_available(&inventory(vec![uno()], vec![]), &Selection::default());

        assert_eq!(available.len(), 1);
        assert_eq!(available[0].state, Classification::Recognized);
        assert!(!available[0].selected);
        assert_eq!(available[0].endpoint, Some(Endpoint::serial("/dev/ttyACM0")));
    }

    #[test]
    fn test_bare_endpoint_is_incomplete() {
        let available = compute_available(&inventory(vec![], vec![usb0()]), &Selection::default());

        assert_eq!(available.len(), 1);
        assert_eq!(available[0].state, Classification::Incomplete);
        assert_eq!(available[0].name, "");
        assert_eq!(available[0].type_id, None);
    }

    #[test]
    fn test_unknown_named_device_is_incomplete() {
        let board = Device::named("Mystery").with_endpoint(usb0());
        let available = compute_available(&inventory(vec![board], vec![]), &Selection::default());

        assert_eq!(available.len(), 1);
        assert_eq!(available[0].state, Classification::Incomplete);
        assert_eq!(available[0].name, "Mystery");
    }

    #[test]
    fn test_order_devices_then_endpoints_then_preserved() {
        let nano = Device::named("Nano").with_type_id("avr:nano");
        let selection = Selection::new(Some(nano), None);
        let available = compute_available(&inventory(vec![uno(), mkr()], vec![usb0()]), &selection);

        let names: Vec<_> = available.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Uno", "MKR1000", "", "Nano"]);
        assert!(available[3].selected);
        assert_eq!(available[3].endpoint, None);
        assert_eq!(available[3].state, Classification::Incomplete);
    }

    #[test]
    fn test_selection_on_recognized_device() {
        let selection = Selection::of_device(uno());
        let available = compute_available(&inventory(vec![uno()], vec![]), &selection);

        assert_eq!(available.len(), 1);
        assert!(available[0].selected);
        assert_eq!(available[0].state, Classification::Recognized);
        assert!(can_verify(&inventory(vec![uno()], vec![]), &selection));
    }

    #[test]
    fn test_selection_names_unresolved_endpoint() {
        let selection = Selection::new(Some(Device::named("guessed")), Some(usb0()));
        let snapshot = inventory(vec![], vec![usb0()]);
        let available = compute_available(&snapshot, &selection);

        assert_eq!(available.len(), 1);
        assert_eq!(available[0].state, Classification::Guessed);
        assert_eq!(available[0].name, "guessed");
        assert_eq!(available[0].type_id, None);
        assert!(available[0].selected);
        assert!(can_verify(&snapshot, &selection));
    }

    #[test]
    fn test_selection_does_not_rename_identified_device() {
        let selection = Selection::new(
            Some(Device::named("Other")),
            Some(Endpoint::serial("/dev/ttyACM0")),
        );
        let available = compute_available(&inventory(vec![uno()], vec![]), &selection);

        assert_eq!(available.len(), 1);
        assert_eq!(available[0].name, "Uno");
        assert_eq!(available[0].state, Classification::Recognized);
        assert!(available[0].selected);
    }

    #[test]
    fn test_endpoint_only_selection() {
        let selection = Selection::new(None, Some(usb0()));
        let snapshot = inventory(vec![], vec![usb0()]);
        let available = compute_available(&snapshot, &selection);

        assert_eq!(available.len(), 1);
        assert!(available[0].selected);
        assert_eq!(available[0].state, Classification::Incomplete);
        assert!(!can_verify(&snapshot, &selection));

        let gone = compute_available(&InventorySnapshot::default(), &selection);
        assert!(gone.is_empty());
    }

    #[test]
    fn test_selection_survives_disconnect() {
        let nodemcu =
            Device::named("NodeMCU 0.9 (ESP-12 Module)").with_type_id("esp8266:esp8266:nodemcu");
        let selection = Selection::new(Some(nodemcu.clone().with_endpoint(usb0())), Some(usb0()));

        let live = compute_available(&inventory(vec![uno()], vec![usb0()]), &selection);
        assert_eq!(live.len(), 2);
        assert_eq!(live[1].state, Classification::Guessed);

        let snapshot = inventory(vec![uno()], vec![]);
        let gone = compute_available(&snapshot, &selection);
        assert_eq!(gone.len(), 2);
        let selected = gone.iter().find(|e| e.selected).unwrap();
        assert_eq!(selected.endpoint, None);
        assert_eq!(selected.name, nodemcu.name);
        assert_eq!(selected.type_id, nodemcu.type_id);
        assert_eq!(selected.state, Classification::Incomplete);
        assert!(!can_verify(&snapshot, &selection));
    }

    #[test]
    fn test_duplicate_endpoint_richer_entry_wins() {
        let port = Endpoint::serial("/dev/ttyACM0");
        let unknown = Device::named("").with_endpoint(port.clone());
        let snapshot = InventorySnapshot::new(vec![unknown, uno()], vec![port.clone(), port]);
        let available = compute_available(&snapshot, &Selection::default());

        assert_eq!(available.len(), 1);
        assert_eq!(available[0].name, "Uno");
        assert_eq!(available[0].state, Classification::Recognized);
    }

    #[test]
    fn test_catalog_device_without_endpoint_is_incomplete() {
        let nano = Device::named("Nano").with_type_id("avr:nano");
        let available = compute_available(&inventory(vec![nano], vec![]), &Selection::default());
        assert_eq!(available[0].state, Classification::Incomplete);
    }

    #[test]
    fn test_catalog_device_on_dead_endpoint_is_incomplete() {
        let snapshot = InventorySnapshot::new(vec![uno()], vec![usb0()]);
        let available = compute_available(&snapshot, &Selection::of_device(uno()));

        assert_eq!(available[0].name, "Uno");
        assert_eq!(available[0].state, Classification::Incomplete);
        assert!(!can_verify(&snapshot, &Selection::of_device(uno())));
    }

    #[test]
    fn test_endpoint_reattached_next_to_device_stays_single_entry() {
        let port = Endpoint::serial("/dev/ttyACM0");
        let snapshot = InventorySnapshot::new(vec![uno()], vec![port.clone(), port]);
        let available = compute_available(&snapshot, &Selection::default());

        assert_eq!(available.len(), 1);
        assert_eq!(available[0].name, "Uno");
        assert_eq!(available[0].state, Classification::Recognized);
    }

    #[test]
    fn test_nothing_selected_cannot_verify() {
        assert!(!can_verify(&inventory(vec![uno()], vec![]), &Selection::default()));
    }

    #[test]
    fn test_deterministic() {
        let snapshot = inventory(vec![uno(), mkr()], vec![usb0()]);
        let selection = Selection::new(Some(Device::named("guessed")), Some(usb0()));
        assert_eq!(
            compute_available(&snapshot, &selection),
            compute_available(&snapshot, &selection)
        );
    }
}
