//! End-to-end availability scenarios: discovery batches and selection changes
//! flowing through a registered tracker.

use boardlink_core::{
    AttachItem, AvailableDevice, Classification, Device, DeviceTracker, Endpoint, InventoryError,
    MemoryStorage, Selection, TrackerConfig,
};
use boardlink_discovery::{DiscoveryBackend, ManualDiscovery, Registration};
use std::sync::Arc;

const RECOGNIZED: Classification = Classification::Recognized;
const GUESSED: Classification = Classification::Guessed;
const INCOMPLETE: Classification = Classification::Incomplete;

fn esp8266() -> Endpoint {
    Endpoint::serial("/dev/cu.SLAB_USBtoUART")
}

fn uno() -> Device {
    Device::named("Arduino Uno")
        .with_type_id("arduino:avr:uno")
        .with_endpoint(Endpoint::serial("/dev/cu.usbmodem14501"))
}

fn mkr1000() -> Device {
    Device::named("Arduino MKR1000")
        .with_type_id("arduino:samd:mkr1000")
        .with_endpoint(Endpoint::serial("/dev/cu.usbmodem14601"))
}

fn nano() -> Device {
    Device::named("Arduino Nano").with_type_id("arduino:avr:nano")
}

struct Fixture {
    discovery: ManualDiscovery,
    tracker: Arc<DeviceTracker>,
    _registration: Registration,
}

impl Fixture {
    fn new() -> Self {
        let discovery = ManualDiscovery::new();
        let tracker = Arc::new(DeviceTracker::new(
            &TrackerConfig::default(),
            Arc::new(MemoryStorage::new()),
        ));
        let registration = discovery.register(tracker.clone());
        Self {
            discovery,
            tracker,
            _registration: registration,
        }
    }

    fn attach(&self, items: Vec<AttachItem>) {
        self.discovery.attach(items).unwrap();
    }

    fn detach(&self, items: Vec<AttachItem>) {
        self.discovery.detach(items).unwrap();
    }

    fn available(&self) -> Vec<AvailableDevice> {
        self.tracker.available_devices().to_vec()
    }
}

#[test]
fn no_available_devices_by_default() {
    let fixture = Fixture::new();
    assert!(fixture.available().is_empty());
}

#[test]
fn attached_board_is_recognized() {
    let fixture = Fixture::new();
    fixture.attach(vec![mkr1000().into()]);

    let available = fixture.available();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].state, RECOGNIZED);
    assert!(!available[0].selected);
}

#[test]
fn attached_unknown_endpoint_is_incomplete() {
    let fixture = Fixture::new();
    fixture.attach(vec![esp8266().into()]);

    let available = fixture.available();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].state, INCOMPLETE);
    assert_eq!(available[0].name, "");
}

#[test]
fn detached_board_is_removed() {
    let fixture = Fixture::new();
    fixture.attach(vec![mkr1000().into(), uno().into(), esp8266().into()]);
    assert_eq!(fixture.available().len(), 3);

    fixture.detach(vec![mkr1000().into()]);
    assert_eq!(fixture.available().len(), 2);
}

#[test]
fn detached_unknown_endpoint_is_removed() {
    let fixture = Fixture::new();
    fixture.attach(vec![mkr1000().into(), uno().into(), esp8266().into()]);
    assert_eq!(fixture.available().len(), 3);

    fixture.detach(vec![esp8266().into()]);
    assert_eq!(fixture.available().len(), 2);
}

#[test]
fn batched_detach_removes_each_item_once() {
    let fixture = Fixture::new();
    fixture.attach(vec![mkr1000().into(), uno().into(), esp8266().into()]);
    assert_eq!(fixture.available().len(), 3);

    fixture.detach(vec![mkr1000().into(), esp8266().into()]);

    let available = fixture.available();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].name, uno().name);
    assert_eq!(fixture.tracker.inventory().endpoints.len(), 1);
}

#[test]
fn endpoint_reattached_after_board_stays_recognized() {
    let fixture = Fixture::new();
    let port = Endpoint::serial("/dev/cu.usbmodem14501");
    fixture.attach(vec![uno().into()]);
    fixture.attach(vec![port.into()]);

    let available = fixture.available();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].state, RECOGNIZED);
    assert_eq!(available[0].name, uno().name);
}

#[test]
fn endpoint_of_attached_board_cannot_be_detached_alone() {
    let fixture = Fixture::new();
    fixture.attach(vec![uno().into()]);
    let before = fixture.tracker.inventory();

    let err = fixture
        .discovery
        .detach([Endpoint::serial("/dev/cu.usbmodem14501")])
        .unwrap_err();
    assert!(matches!(err, InventoryError::EndpointInUse { .. }));
    assert_eq!(fixture.tracker.inventory(), before);
    assert_eq!(fixture.available()[0].state, RECOGNIZED);
}

#[test]
fn selection_without_hardware_is_available() {
    let fixture = Fixture::new();
    fixture.tracker.set_selection(Selection::new(Some(nano()), None));

    let available = fixture.available();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].state, INCOMPLETE);
    assert!(available[0].selected);
}

#[test]
fn selection_endpoint_is_discarded_when_board_is_detached() {
    let fixture = Fixture::new();
    fixture.attach(vec![mkr1000().into()]);
    let available = fixture.available();
    assert_eq!(available[0].state, RECOGNIZED);
    assert!(!available[0].selected);

    let endpoint = fixture.tracker.inventory().endpoint_for(&mkr1000()).cloned();
    fixture
        .tracker
        .set_selection(Selection::new(Some(mkr1000()), endpoint));
    let available = fixture.available();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].state, RECOGNIZED);
    assert!(available[0].selected);

    fixture.detach(vec![mkr1000().into()]);
    let available = fixture.available();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].state, INCOMPLETE);
    assert!(available[0].selected);
    assert_eq!(available[0].endpoint, None);
    assert_eq!(available[0].name, "Arduino MKR1000");
}

#[test]
fn selected_unknown_board_is_guessed() {
    let fixture = Fixture::new();
    fixture.attach(vec![esp8266().into()]);
    fixture
        .tracker
        .set_selection(Selection::new(Some(Device::named("guessed")), Some(esp8266())));

    let available = fixture.available();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].state, GUESSED);
    assert_eq!(available[0].name, "guessed");
    assert_eq!(available[0].type_id, None);
    assert!(fixture.tracker.can_verify(&fixture.tracker.selection()));
}

#[test]
fn gone_endpoint_does_not_reconnect_selection() {
    let fixture = Fixture::new();
    fixture.attach(vec![esp8266().into(), uno().into()]);
    let nodemcu =
        Device::named("NodeMCU 0.9 (ESP-12 Module)").with_type_id("esp8266:esp8266:nodemcu");
    fixture
        .tracker
        .set_selection(Selection::new(Some(nodemcu.clone()), Some(esp8266())));

    fixture.detach(vec![esp8266().into()]);

    let available = fixture.available();
    assert_eq!(available.len(), 2);
    let selected = available.iter().find(|entry| entry.selected).unwrap();
    assert_eq!(selected.endpoint, None);
    assert_eq!(selected.name, nodemcu.name);
    assert_eq!(selected.type_id, nodemcu.type_id);
    assert!(!fixture.tracker.can_verify(&fixture.tracker.selection()));
}

#[test]
fn failed_detach_keeps_inventory() {
    let fixture = Fixture::new();
    fixture.attach(vec![uno().into()]);
    let before = fixture.tracker.inventory();

    assert!(fixture
        .discovery
        .detach([AttachItem::from(uno()), AttachItem::from(mkr1000())])
        .is_err());
    assert_eq!(fixture.tracker.inventory(), before);
    assert_eq!(fixture.available().len(), 1);
}

#[tokio::test]
async fn subscribers_see_each_change_once() {
    let fixture = Fixture::new();
    let mut inventory_rx = fixture.tracker.subscribe_inventory();
    let mut available_rx = fixture.tracker.subscribe_available();

    fixture.attach(vec![uno().into(), esp8266().into()]);
    fixture
        .tracker
        .set_selection(Selection::new(Some(Device::named("guessed")), Some(esp8266())));

    let change = inventory_rx.recv().await.unwrap();
    assert_eq!(change.old_state.devices.len(), 0);
    assert_eq!(change.new_state.devices.len(), 1);
    assert_eq!(change.new_state.endpoints.len(), 2);

    let after_attach = available_rx.recv().await.unwrap();
    assert!(after_attach.iter().all(|entry| !entry.selected));

    let after_select = available_rx.recv().await.unwrap();
    assert_eq!(after_select[1].state, GUESSED);
    assert!(inventory_rx.try_recv().is_err());
}
