// ── Output timers and virtual pulse relays ──
//
// Two features share one engine because they watch the same stream of
// output changes:
//
//  * auto-off: a configured output that turns on is turned back off
//    after its timeout, measured from the most recent ON transition;
//  * pulse relays: outputs wired to pulse-driven hardware (impulse
//    relays, garage doors) whose real state is invisible, so a virtual
//    on/off state is kept here and flipped on every observed pulse.
//
// Like the gesture engine this is a pure state machine over explicit
// `Instant`s; the run loop feeds it changes and polls its deadlines.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use evok_api::SetCommand;

use crate::config::TimerConfig;
use crate::model::{DeviceKind, DeviceRecord, RelaySubtype};
use crate::timer::{OneShot, earliest};

/// What the engine wants done in response to a stimulus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputAction {
    /// Issue a wire command.
    Command(SetCommand),
    /// The virtual state of a pulse relay changed.
    PulseChanged {
        subtype: RelaySubtype,
        circuit: String,
        on: bool,
    },
}

#[derive(Debug)]
struct OutputEntry {
    timeout: Duration,
    pulse: bool,
    name: Option<String>,
    auto_off: OneShot,
    /// The next observed ON transition is our own pulse command echoing
    /// back; swallow it instead of flipping the virtual state.
    ignore_next_toggle: bool,
    virtual_on: bool,
}

/// Auto-off timers and pulse-relay state for one endpoint's outputs.
#[derive(Debug, Default)]
pub struct OutputEngine {
    outputs: BTreeMap<(RelaySubtype, String), OutputEntry>,
}

impl OutputEngine {
    pub fn new(timers: &[TimerConfig]) -> Self {
        let outputs = timers
            .iter()
            .map(|timer| {
                let key = (timer.relay_type, timer.circuit.clone());
                let entry = OutputEntry {
                    timeout: timer.timeout,
                    pulse: timer.pulse,
                    name: timer.name.clone(),
                    auto_off: OneShot::new(),
                    ignore_next_toggle: false,
                    virtual_on: false,
                };
                (key, entry)
            })
            .collect();
        Self { outputs }
    }

    /// Arm auto-off timers for outputs already on in the snapshot.
    ///
    /// Replayed snapshot state never flips pulse-relay virtual state:
    /// only live transitions do.
    pub fn seed(&mut self, records: &[DeviceRecord], now: Instant) {
        for record in records {
            let Some(entry) = self.entry_for(record) else {
                continue;
            };
            entry.auto_off.cancel();
            if record.is_on() {
                let _ = entry.auto_off.arm(now, entry.timeout);
                debug!(
                    circuit = %record.circuit,
                    timeout = ?entry.timeout,
                    "output already on, auto-off armed from snapshot"
                );
            }
        }
    }

    /// Process one observed output change.
    ///
    /// Under maintenance the virtual mirror is frozen: hardware is
    /// expected to be poked directly during servicing, and those
    /// toggles must not desynchronize the displayed state.
    pub fn on_output_change(
        &mut self,
        record: &DeviceRecord,
        previous: Option<&DeviceRecord>,
        now: Instant,
        maintenance: bool,
    ) -> Vec<OutputAction> {
        let circuit = record.circuit.clone();
        let Some(subtype) = record.subtype else {
            return Vec::new();
        };
        let Some(entry) = self.entry_for(record) else {
            return Vec::new();
        };

        let was_on = previous.is_some_and(DeviceRecord::is_on);
        let mut actions = Vec::new();

        if record.is_on() && !was_on {
            entry.auto_off.cancel();
            let _ = entry.auto_off.arm(now, entry.timeout);

            if entry.pulse {
                if entry.ignore_next_toggle {
                    entry.ignore_next_toggle = false;
                } else if maintenance {
                    debug!(circuit = %circuit, "maintenance mode, mirror not switched");
                } else {
                    // A pulse we did not send: somebody toggled the
                    // output directly, so mirror the flip.
                    entry.virtual_on = !entry.virtual_on;
                    info!(
                        circuit = %circuit,
                        name = entry.name.as_deref(),
                        on = entry.virtual_on,
                        "pulse relay toggled externally"
                    );
                    actions.push(OutputAction::PulseChanged {
                        subtype,
                        circuit,
                        on: entry.virtual_on,
                    });
                }
            }
        } else if !record.is_on() && was_on {
            entry.auto_off.cancel();
        }

        actions
    }

    /// Drive a pulse relay to `requested`.
    ///
    /// The physical output is always pulsed ON (the downstream hardware
    /// toggles on pulses, not levels); the virtual state is set to the
    /// requested value directly. Under maintenance the flip is cosmetic
    /// and no command is issued.
    pub fn pulse(
        &mut self,
        subtype: RelaySubtype,
        circuit: &str,
        requested: bool,
        maintenance: bool,
    ) -> Vec<OutputAction> {
        let Some(entry) = self.outputs.get_mut(&(subtype, circuit.to_owned())) else {
            return Vec::new();
        };
        if !entry.pulse {
            return Vec::new();
        }
        if entry.virtual_on == requested {
            // Already displaying the requested state; pulsing would
            // flip the downstream hardware out of sync.
            debug!(circuit, requested, "pulse request is a no-op");
            return Vec::new();
        }

        entry.virtual_on = requested;
        let mut actions = vec![OutputAction::PulseChanged {
            subtype,
            circuit: circuit.to_owned(),
            on: requested,
        }];

        if maintenance {
            info!(circuit, "maintenance mode, pulse suppressed");
        } else {
            entry.ignore_next_toggle = true;
            actions.push(OutputAction::Command(SetCommand::binary(
                "relay", circuit, true,
            )));
        }
        actions
    }

    /// The virtual state of a configured pulse relay.
    pub fn virtual_state(&self, subtype: RelaySubtype, circuit: &str) -> Option<bool> {
        self.outputs
            .get(&(subtype, circuit.to_owned()))
            .filter(|entry| entry.pulse)
            .map(|entry| entry.virtual_on)
    }

    /// Fire every auto-off timer due at `now`.
    pub fn poll(&mut self, now: Instant) -> Vec<OutputAction> {
        let mut actions = Vec::new();
        for ((_, circuit), entry) in &mut self.outputs {
            if entry.auto_off.fire_if_due(now) {
                info!(
                    circuit = %circuit,
                    name = entry.name.as_deref(),
                    timeout = ?entry.timeout,
                    "auto-off timeout elapsed, turning output off"
                );
                actions.push(OutputAction::Command(SetCommand::binary(
                    "relay",
                    circuit.clone(),
                    false,
                )));
            }
        }
        actions
    }

    /// The earliest pending auto-off deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(self.outputs.values().map(|entry| entry.auto_off.deadline()))
    }

    /// Cancel every pending timer. Invoked on teardown. Virtual
    /// pulse-relay state survives reconnects.
    pub fn reset(&mut self) {
        for entry in self.outputs.values_mut() {
            entry.auto_off.cancel();
            entry.ignore_next_toggle = false;
        }
    }

    fn entry_for(&mut self, record: &DeviceRecord) -> Option<&mut OutputEntry> {
        if record.kind != DeviceKind::Relay {
            return None;
        }
        let subtype = record.subtype?;
        self.outputs.get_mut(&(subtype, record.circuit.clone()))
    }
}

// ── Tests ────────────────────────────────────────────────────────────
