// ── Digital input gesture engine ──
//
// One state machine per input circuit, no cross-circuit interaction.
// Raw down/up edges are classified into single-press, double-press, and
// repeating long-press gestures. The engine is a pure state machine over
// explicit `Instant`s: edges arrive through `on_edge`, timer expirations
// through `poll`, and the owning run loop sleeps until `next_deadline`.
// Exactly one of {double, long-press(es), single, suppressed} occurs per
// down→up cycle.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use evok_api::SetCommand;

use crate::model::{DeviceRecord, Gesture, GestureEvent};
use crate::rules::RuleSet;
use crate::timer::{OneShot, Ticker, earliest};

/// What the engine wants done in response to a stimulus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureAction {
    /// Surface a gesture event to consumers.
    Emit(GestureEvent),
    /// Issue a rule side-effect command.
    Command(SetCommand),
}

/// Gesture thresholds, shared by all circuits of one endpoint.
#[derive(Debug, Clone)]
pub struct GestureConfig {
    pub double_press_max_delay: Duration,
    pub long_press_min_delay: Duration,
    pub max_repeat_count: u32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            double_press_max_delay: Duration::from_millis(500),
            long_press_min_delay: Duration::from_millis(1000),
            max_repeat_count: 10,
        }
    }
}

/// Per-circuit recognition state.
#[derive(Debug)]
struct InputState {
    /// Stable ordinal assigned at setup, ascending by circuit order.
    label_index: u32,
    down: bool,
    /// Pending single-press confirmation window.
    debounce: OneShot,
    /// Long-press repeat ticker, running only while held.
    repeat: Ticker,
    repeat_count: u32,
    /// A long-press already fired for the current hold; suppress the
    /// press event on release.
    long_press_release_pending: bool,
}

impl InputState {
    fn new(label_index: u32, repeat_period: Duration) -> Self {
        Self {
            label_index,
            down: false,
            debounce: OneShot::new(),
            repeat: Ticker::new(repeat_period),
            repeat_count: 0,
            long_press_release_pending: false,
        }
    }
}

/// Gesture recognition for all input circuits of one endpoint.
pub struct GestureEngine {
    config: GestureConfig,
    rules: RuleSet,
    inputs: BTreeMap<String, InputState>,
    next_label: u32,
}

impl GestureEngine {
    pub fn new(config: GestureConfig, rules: RuleSet) -> Self {
        Self {
            config,
            rules,
            inputs: BTreeMap::new(),
            next_label: 0,
        }
    }

    /// Register the input circuits found in the snapshot, assigning
    /// label indexes ascending by circuit order.
    pub fn setup(&mut self, inputs: &[DeviceRecord]) {
        let mut circuits: Vec<&str> = inputs.iter().map(|r| r.circuit.as_str()).collect();
        circuits.sort_unstable();
        for circuit in circuits {
            self.state_for(circuit);
        }
    }

    /// Process one raw edge event for `circuit`.
    pub fn on_edge(&mut self, circuit: &str, pressed: bool, now: Instant) -> Vec<GestureAction> {
        let window = self.config.double_press_max_delay;

        let fired = {
            let state = self.state_for(circuit);
            if pressed {
                state.down = true;
                if !state.repeat.is_running() {
                    debug!(circuit, label = state.label_index, "long-press ticker started");
                    let _ = state.repeat.start(now);
                }
                None
            } else {
                state.repeat.cancel();
                if !state.down {
                    // Spurious release: never saw the matching press.
                    return Vec::new();
                }
                state.down = false;

                if state.debounce.is_armed() {
                    // Second release inside the debounce window.
                    state.debounce.cancel();
                    state.repeat_count = 0;
                    debug!(circuit, label = state.label_index, "double press");
                    Some(Gesture::Double)
                } else if state.long_press_release_pending {
                    // Release after a long-press already fired.
                    state.long_press_release_pending = false;
                    state.repeat_count = 0;
                    None
                } else {
                    let _ = state.debounce.arm(now, window);
                    None
                }
            }
        };

        fired
            .map(|gesture| self.resolve(circuit, gesture))
            .unwrap_or_default()
    }

    /// Fire every timer due at `now`.
    pub fn poll(&mut self, now: Instant) -> Vec<GestureAction> {
        let max_repeats = self.config.max_repeat_count;
        let mut fired: Vec<(String, Gesture)> = Vec::new();

        for (circuit, state) in &mut self.inputs {
            if state.debounce.fire_if_due(now) {
                // Debounce window elapsed unconfirmed: a single press.
                debug!(circuit = %circuit, label = state.label_index, "single press");
                fired.push((circuit.clone(), Gesture::Single));
            }
            if state.repeat.fire_if_due(now) {
                if state.repeat_count >= max_repeats {
                    warn!(
                        circuit = %circuit,
                        label = state.label_index,
                        repeats = state.repeat_count,
                        "repeat ceiling reached -- your button may be stuck"
                    );
                } else {
                    state.repeat_count += 1;
                    state.long_press_release_pending = true;
                    debug!(circuit = %circuit, label = state.label_index, "long press");
                    fired.push((circuit.clone(), Gesture::Long));
                }
            }
        }

        fired
            .into_iter()
            .flat_map(|(circuit, gesture)| self.resolve(&circuit, gesture))
            .collect()
    }

    /// The earliest pending timer deadline across all circuits.
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(
            self.inputs
                .values()
                .flat_map(|state| [state.debounce.deadline(), state.repeat.deadline()]),
        )
    }

    /// Cancel every pending timer. Invoked on teardown.
    pub fn reset(&mut self) {
        for state in self.inputs.values_mut() {
            state.debounce.cancel();
            state.repeat.cancel();
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Run the rule hook for a recognized gesture, then emit unless muted.
    fn resolve(&self, circuit: &str, gesture: Gesture) -> Vec<GestureAction> {
        let event = GestureAction::Emit(GestureEvent {
            circuit: circuit.to_owned(),
            gesture,
        });

        match self.rules.apply(circuit, gesture) {
            None => vec![event],
            Some(outcome) => {
                let mut actions: Vec<GestureAction> = outcome
                    .commands
                    .into_iter()
                    .map(GestureAction::Command)
                    .collect();
                if !outcome.mute {
                    actions.push(event);
                }
                actions
            }
        }
    }

    fn state_for(&mut self, circuit: &str) -> &mut InputState {
        let period = self.config.long_press_min_delay;
        let next_label = &mut self.next_label;
        self.inputs.entry(circuit.to_owned()).or_insert_with(|| {
            *next_label += 1;
            InputState::new(*next_label, period)
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────
