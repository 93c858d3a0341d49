// ── Device directory & event normalizer ──
//
// The canonical per-device state table. Populated wholesale from the
// REST snapshot, then mutated record-by-record as incremental messages
// arrive. Single-writer (the client's run loop) / multi-reader (engines
// and consumer accessors), so storage is a DashMap with no outer lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

use evok_api::wire::RawDevice;

use crate::error::CoreError;
use crate::model::{DeviceEvent, DeviceKey, DeviceKind, DeviceRecord, RelaySubtype};

/// Canonical mapping from (`kind`, `subtype`, `circuit`) to the latest
/// [`DeviceRecord`].
///
/// A replace is always a full overwrite of the keyed slot -- the
/// directory never holds stale duplicates. Listings are returned sorted
/// by `circuit` ascending.
pub struct DeviceDirectory {
    devices: DashMap<DeviceKey, Arc<DeviceRecord>>,
    loaded: AtomicBool,
    last_load: watch::Sender<Option<DateTime<Utc>>>,
}

impl DeviceDirectory {
    pub fn new() -> Self {
        let (last_load, _) = watch::channel(None);
        Self {
            devices: DashMap::new(),
            loaded: AtomicBool::new(false),
            last_load,
        }
    }

    // ── Mutation (normalizer only) ───────────────────────────────────

    /// Replace the entire directory content from a snapshot.
    ///
    /// Wire records of unsupported device classes are dropped here;
    /// everything else becomes the new canonical state.
    pub fn load(&self, snapshot: Vec<RawDevice>) {
        self.devices.clear();
        for raw in snapshot {
            let Some(record) = DeviceRecord::from_wire(raw) else {
                continue;
            };
            self.devices.insert(record.key(), Arc::new(record));
        }
        self.loaded.store(true, Ordering::Release);
        self.last_load.send_replace(Some(Utc::now()));
        debug!(devices = self.devices.len(), "directory loaded");
    }

    /// Ingest one incremental wire record.
    ///
    /// Overwrites the keyed slot (last-write-wins) and returns the typed
    /// change event carrying new and previous state. Records of
    /// unsupported device classes yield `None`.
    pub fn ingest(&self, raw: RawDevice) -> Option<DeviceEvent> {
        let record = DeviceRecord::from_wire(raw)?;
        let previous = self
            .devices
            .insert(record.key(), Arc::new(record.clone()))
            .map(|prev| (*prev).clone());

        Some(DeviceEvent {
            category: record.category(),
            record,
            previous,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// All records, sorted by circuit ascending.
    pub fn all(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        self.ensure_loaded()?;
        let mut records: Vec<DeviceRecord> = self
            .devices
            .iter()
            .map(|entry| (**entry.value()).clone())
            .collect();
        records.sort_by(|a, b| a.circuit.cmp(&b.circuit));
        Ok(records)
    }

    /// All digital inputs, sorted by circuit ascending.
    pub fn inputs(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        self.list(DeviceKind::Input, None)
    }

    /// All physical relays, sorted by circuit ascending.
    pub fn relays(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        self.list(DeviceKind::Relay, Some(RelaySubtype::Physical))
    }

    /// All digital outputs, sorted by circuit ascending.
    pub fn digital_outputs(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        self.list(DeviceKind::Relay, Some(RelaySubtype::Digital))
    }

    /// All user LEDs, sorted by circuit ascending.
    pub fn leds(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        self.list(DeviceKind::Led, None)
    }

    /// All analogue inputs, sorted by circuit ascending.
    pub fn analogue_inputs(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        self.list(DeviceKind::AnalogueInput, None)
    }

    /// All analogue outputs, sorted by circuit ascending.
    pub fn analogue_outputs(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        self.list(DeviceKind::AnalogueOutput, None)
    }

    /// Look up one record by kind (+ relay subtype) and circuit.
    ///
    /// Fails with `InvalidCircuit` naming the requested circuit when the
    /// key is absent.
    pub fn get(
        &self,
        kind: DeviceKind,
        subtype: Option<RelaySubtype>,
        circuit: &str,
    ) -> Result<DeviceRecord, CoreError> {
        self.ensure_loaded()?;
        let key = DeviceKey {
            kind,
            subtype,
            circuit: circuit.to_owned(),
        };
        self.devices
            .get(&key)
            .map(|entry| (**entry.value()).clone())
            .ok_or_else(|| {
                let category = subtype.map_or(kind.wire_name(), RelaySubtype::wire_name);
                CoreError::invalid_circuit(category, circuit)
            })
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Timestamp of the most recent snapshot load.
    pub fn last_load(&self) -> Option<DateTime<Utc>> {
        *self.last_load.borrow()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn list(
        &self,
        kind: DeviceKind,
        subtype: Option<RelaySubtype>,
    ) -> Result<Vec<DeviceRecord>, CoreError> {
        self.ensure_loaded()?;
        let mut records: Vec<DeviceRecord> = self
            .devices
            .iter()
            .filter(|entry| {
                let record = entry.value();
                record.kind == kind && (subtype.is_none() || record.subtype == subtype)
            })
            .map(|entry| (**entry.value()).clone())
            .collect();
        records.sort_by(|a, b| a.circuit.cmp(&b.circuit));
        Ok(records)
    }

    fn ensure_loaded(&self) -> Result<(), CoreError> {
        if self.loaded.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(CoreError::DirectoryNotReady)
        }
    }
}

impl Default for DeviceDirectory {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::EventCategory;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(dev: &str, circuit: &str, value: f64, relay_type: Option<&str>) -> RawDevice {
        RawDevice {
            dev: dev.into(),
            circuit: circuit.into(),
            value: Some(value),
            relay_type: relay_type.map(String::from),
            extra: json!({}),
        }
    }

    fn loaded_directory() -> DeviceDirectory {
        let directory = DeviceDirectory::new();
        directory.load(vec![
            raw("relay", "2_02", 0.0, Some("physical")),
            raw("relay", "1_01", 1.0, Some("physical")),
            raw("relay", "2_01", 0.0, Some("digital")),
            raw("input", "1_01", 0.0, None),
            raw("input", "1_02", 0.0, None),
            raw("led", "1_01", 0.0, None),
            raw("ai", "1_01", 3.3, None),
            raw("ao", "1_01", 0.0, None),
        ]);
        directory
    }

    #[test]
    fn every_accessor_fails_before_load() {
        let directory = DeviceDirectory::new();
        assert!(matches!(directory.all(), Err(CoreError::DirectoryNotReady)));
        assert!(matches!(directory.inputs(), Err(CoreError::DirectoryNotReady)));
        assert!(matches!(directory.relays(), Err(CoreError::DirectoryNotReady)));
        assert!(matches!(
            directory.digital_outputs(),
            Err(CoreError::DirectoryNotReady)
        ));
        assert!(matches!(directory.leds(), Err(CoreError::DirectoryNotReady)));
        assert!(matches!(
            directory.analogue_inputs(),
            Err(CoreError::DirectoryNotReady)
        ));
        assert!(matches!(
            directory.analogue_outputs(),
            Err(CoreError::DirectoryNotReady)
        ));
        assert!(matches!(
            directory.get(DeviceKind::Led, None, "1_01"),
            Err(CoreError::DirectoryNotReady)
        ));
    }

    #[test]
    fn listings_are_filtered_and_sorted() {
        let directory = loaded_directory();

        let relays = directory.relays().unwrap();
        assert_eq!(
            relays.iter().map(|r| r.circuit.as_str()).collect::<Vec<_>>(),
            vec!["1_01", "2_02"]
        );
        assert!(relays.iter().all(|r| r.subtype == Some(RelaySubtype::Physical)));

        let outputs = directory.digital_outputs().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].circuit, "2_01");
        assert!(outputs.iter().all(|r| r.subtype == Some(RelaySubtype::Digital)));

        let inputs = directory.inputs().unwrap();
        assert_eq!(
            inputs.iter().map(|r| r.circuit.as_str()).collect::<Vec<_>>(),
            vec!["1_01", "1_02"]
        );
    }

    #[test]
    fn ingest_is_last_write_wins() {
        let directory = loaded_directory();

        let event = directory
            .ingest(raw("relay", "1_01", 0.0, Some("physical")))
            .unwrap();
        assert_eq!(event.category, EventCategory::Relay);
        assert_eq!(event.record.value, 0.0);
        assert_eq!(event.previous.as_ref().unwrap().value, 1.0);

        let event = directory
            .ingest(raw("relay", "1_01", 1.0, Some("physical")))
            .unwrap();
        assert_eq!(event.previous.as_ref().unwrap().value, 0.0);

        let current = directory
            .get(DeviceKind::Relay, Some(RelaySubtype::Physical), "1_01")
            .unwrap();
        assert_eq!(current.value, 1.0);
    }

    #[test]
    fn ingest_of_unseen_circuit_has_no_previous() {
        let directory = loaded_directory();
        let before = directory.len();

        let event = directory.ingest(raw("input", "3_07", 1.0, None)).unwrap();
        assert!(event.previous.is_none());
        assert_eq!(directory.len(), before + 1);
    }

    #[test]
    fn ingest_drops_unsupported_classes() {
        let directory = loaded_directory();
        assert!(directory.ingest(raw("temp", "26AB", 20.1, None)).is_none());
    }

    #[test]
    fn get_unknown_circuit_names_it() {
        let directory = loaded_directory();
        let err = directory
            .get(DeviceKind::Relay, Some(RelaySubtype::Physical), "9_99")
            .unwrap_err();
        match err {
            CoreError::InvalidCircuit { category, circuit } => {
                assert_eq!(category, "physical");
                assert_eq!(circuit, "9_99");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_replaces_wholesale() {
        let directory = loaded_directory();
        directory.load(vec![raw("led", "1_02", 1.0, None)]);

        assert_eq!(directory.len(), 1);
        assert!(directory.get(DeviceKind::Led, None, "1_02").is_ok());
        assert!(matches!(
            directory.get(DeviceKind::Input, None, "1_01"),
            Err(CoreError::InvalidCircuit { .. })
        ));
        assert!(directory.last_load().is_some());
    }
}
