// ── Domain model ──
//
// Canonical types bridging the raw evok-api wire shapes into what the
// directory, engines, and consumers work with. Conversion normalizes the
// `dev`/`relay_type` string tags into enums; unknown device classes are
// dropped at the boundary (with a log) rather than carried as stringly
// typed records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use evok_api::wire::RawDevice;

// ── DeviceKind ───────────────────────────────────────────────────────

/// The device class of one addressable channel.
///
/// Relays carry a [`RelaySubtype`] distinguishing physical relays from
/// digital outputs; the two are driven by different hardware and have
/// independent consumer logic downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceKind {
    Relay,
    Led,
    Input,
    AnalogueInput,
    AnalogueOutput,
    ControllerInfo,
}

impl DeviceKind {
    /// The `dev` tag the controller uses on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Relay => "relay",
            Self::Led => "led",
            Self::Input => "input",
            Self::AnalogueInput => "ai",
            Self::AnalogueOutput => "ao",
            Self::ControllerInfo => "neuron",
        }
    }

    /// Parse a wire `dev` tag. Unknown tags yield `None`.
    pub fn from_wire(dev: &str) -> Option<Self> {
        match dev {
            "relay" => Some(Self::Relay),
            "led" => Some(Self::Led),
            "input" => Some(Self::Input),
            "ai" => Some(Self::AnalogueInput),
            "ao" => Some(Self::AnalogueOutput),
            "neuron" => Some(Self::ControllerInfo),
            _ => None,
        }
    }
}

// ── RelaySubtype ─────────────────────────────────────────────────────

/// Relay hardware subtype: a physical relay or a digital output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelaySubtype {
    Physical,
    Digital,
}

impl RelaySubtype {
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Digital => "digital",
        }
    }
}

// ── DeviceRecord ─────────────────────────────────────────────────────

/// The latest known state of one addressable channel.
///
/// Uniqueness invariant: at most one record per (`kind`, `subtype`,
/// `circuit`) key in the directory. `circuit` is a string identifier of
/// the form `"<section>_<index>"`, compared lexicographically for stable
/// ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRecord {
    pub kind: DeviceKind,
    pub subtype: Option<RelaySubtype>,
    pub circuit: String,
    pub value: f64,
    /// Remaining wire fields (controller-info model/sn/ver2, input modes, ...).
    pub extra: Value,
}

impl DeviceRecord {
    /// Convert a wire record into a domain record.
    ///
    /// Returns `None` for device classes outside the supported set
    /// (1-Wire sensors, watchdog channels, ...). Relay records without a
    /// `"physical"` relay_type are digital outputs, matching how the
    /// controller drives them.
    pub fn from_wire(raw: RawDevice) -> Option<Self> {
        let kind = DeviceKind::from_wire(&raw.dev)?;
        let subtype = match kind {
            DeviceKind::Relay => Some(if raw.relay_type.as_deref() == Some("physical") {
                RelaySubtype::Physical
            } else {
                RelaySubtype::Digital
            }),
            _ => None,
        };

        Some(Self {
            kind,
            subtype,
            circuit: raw.circuit,
            value: raw.value.unwrap_or(0.0),
            extra: raw.extra,
        })
    }

    /// Boolean reading of the channel value.
    ///
    /// The conversion rule is exact: a channel is "on" if and only if
    /// `value == 1`. Any other value (including analogue readings that
    /// happen to be near 1) is "off".
    pub fn is_on(&self) -> bool {
        self.value == 1.0
    }

    /// The directory key for this record.
    pub fn key(&self) -> DeviceKey {
        DeviceKey {
            kind: self.kind,
            subtype: self.subtype,
            circuit: self.circuit.clone(),
        }
    }

    /// The consumer-facing event category for this record.
    pub fn category(&self) -> EventCategory {
        match (self.kind, self.subtype) {
            (DeviceKind::Relay, Some(RelaySubtype::Digital)) => EventCategory::DigitalOutput,
            (DeviceKind::Relay, _) => EventCategory::Relay,
            (DeviceKind::Led, _) => EventCategory::Led,
            (DeviceKind::Input, _) => EventCategory::Input,
            (DeviceKind::AnalogueInput, _) => EventCategory::AnalogueInput,
            (DeviceKind::AnalogueOutput, _) => EventCategory::AnalogueOutput,
            (DeviceKind::ControllerInfo, _) => EventCategory::ControllerInfo,
        }
    }
}

// ── DeviceKey ────────────────────────────────────────────────────────

/// Directory key: (`kind`, `subtype`, `circuit`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceKey {
    pub kind: DeviceKind,
    pub subtype: Option<RelaySubtype>,
    pub circuit: String,
}

// ── EventCategory ────────────────────────────────────────────────────

/// Consumer-facing device change category.
///
/// Derived from `kind`, except relay records which split into two
/// distinct categories by subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventCategory {
    Relay,
    DigitalOutput,
    Led,
    Input,
    AnalogueInput,
    AnalogueOutput,
    ControllerInfo,
}

impl EventCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relay => "relay",
            Self::DigitalOutput => "digitalOutput",
            Self::Led => "led",
            Self::Input => "input",
            Self::AnalogueInput => "analogueInput",
            Self::AnalogueOutput => "analogueOutput",
            Self::ControllerInfo => "controllerInfo",
        }
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Events ───────────────────────────────────────────────────────────

/// A normalized per-device change event carrying old and new state.
#[derive(Debug, Clone)]
pub struct DeviceEvent {
    pub category: EventCategory,
    pub record: DeviceRecord,
    pub previous: Option<DeviceRecord>,
}

/// A classified press gesture on a digital input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gesture {
    Single,
    Double,
    Long,
}

/// A gesture recognized on one input circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureEvent {
    pub circuit: String,
    pub gesture: Gesture,
}

/// Connection lifecycle transitions surfaced to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connected,
    Disconnected,
}

/// The single enumerated event type delivered through the client's
/// subscription interface.
#[derive(Debug, Clone)]
pub enum EvokEvent {
    /// A device record changed (carries old and new state).
    Device(DeviceEvent),
    /// A press gesture was recognized on a digital input.
    Gesture(GestureEvent),
    /// The connection came up or went down.
    Lifecycle(LifecycleEvent),
    /// A virtual impulse relay's displayed state changed.
    PulseRelay {
        subtype: RelaySubtype,
        circuit: String,
        on: bool,
    },
}

// ── Tests ────────────────────────────────────────────────────────────
