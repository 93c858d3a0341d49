// Evok wire shapes
//
// Models for the controller's JSON payloads. Fields use `#[serde(default)]`
// liberally because the payload shape varies across device classes; anything
// beyond the core set lands in `extra` so nothing is silently dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

// ── RawDevice ────────────────────────────────────────────────────────

/// One device record as the controller sends it, in both the REST
/// snapshot and incremental WebSocket messages.
///
/// `dev` is the device class tag (`"relay"`, `"input"`, `"led"`, `"ai"`,
/// `"ao"`, `"neuron"`, ...); `relay_type` is only present for relays and
/// distinguishes physical relays from digital outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDevice {
    pub dev: String,

    #[serde(default)]
    pub circuit: String,

    /// Numeric channel value. Boolean devices use `1`/`0`.
    #[serde(default)]
    pub value: Option<f64>,

    #[serde(default)]
    pub relay_type: Option<String>,

    /// All remaining fields the controller sends (model, sn, modes, ...).
    #[serde(flatten)]
    pub extra: Value,
}

// ── Incoming ─────────────────────────────────────────────────────────

/// An incremental WebSocket payload.
///
/// The controller emits an array of records for most device classes but a
/// bare object for some (1-Wire, controller info). Both shapes are valid;
/// `into_vec` normalizes to a sequence before any further processing.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Incoming {
    Many(Vec<RawDevice>),
    One(RawDevice),
}

impl Incoming {
    /// Flatten to a sequence of one or more records, preserving array order.
    pub fn into_vec(self) -> Vec<RawDevice> {
        match self {
            Self::Many(records) => records,
            Self::One(record) => vec![record],
        }
    }
}

/// Parse a WebSocket text frame into a record batch.
pub fn parse_batch(text: &str) -> Result<Vec<RawDevice>, Error> {
    let incoming: Incoming =
        serde_json::from_str(text).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: text.to_owned(),
        })?;
    Ok(incoming.into_vec())
}

// ── SetCommand ───────────────────────────────────────────────────────

/// Outbound command: `{"cmd":"set","dev":...,"circuit":...,"value":...}`.
///
/// The controller expects `value` as a string: `"1"`/`"0"` for boolean
/// outputs, a numeric string for analogue outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetCommand {
    pub cmd: &'static str,
    pub dev: String,
    pub circuit: String,
    pub value: String,
}

impl SetCommand {
    /// Build a set-command for a boolean output.
    pub fn binary(dev: impl Into<String>, circuit: impl Into<String>, on: bool) -> Self {
        Self {
            cmd: "set",
            dev: dev.into(),
            circuit: circuit.into(),
            value: if on { "1" } else { "0" }.to_owned(),
        }
    }

    /// Build a set-command for an analogue output.
    pub fn analogue(dev: impl Into<String>, circuit: impl Into<String>, value: f64) -> Self {
        Self {
            cmd: "set",
            dev: dev.into(),
            circuit: circuit.into(),
            value: value.to_string(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
