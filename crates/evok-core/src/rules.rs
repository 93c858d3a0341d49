// ── Gesture rules ──
//
// A rule intercepts one (input circuit, gesture) tuple before the event
// reaches consumers. It may trigger side-effect output commands, and may
// mute the event entirely -- letting a press act purely as an actuator
// trigger. Mute and side effects are independent: a muted rule still
// runs its actions, an unmuted one surfaces the event after them.

use tracing::debug;

use evok_api::SetCommand;

use crate::config::{RuleAction, RuleConfig};
use crate::model::Gesture;

/// Evaluation result of the first matching rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    /// Set-commands to issue before (possibly) emitting the event.
    pub commands: Vec<SetCommand>,
    /// Suppress the gesture event entirely.
    pub mute: bool,
}

/// The configured rules for one endpoint. First match wins.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<RuleConfig>,
}

impl RuleSet {
    pub fn new(rules: Vec<RuleConfig>) -> Self {
        Self { rules }
    }

    /// Evaluate the hook for one recognized gesture.
    ///
    /// Returns `None` when no rule matches; the caller emits the event
    /// unchanged. A rule's side-effect commands are returned rather than
    /// executed here -- the engines stay free of I/O.
    pub fn apply(&self, circuit: &str, gesture: Gesture) -> Option<RuleOutcome> {
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.when.circuit == circuit && rule.when.gesture == gesture)?;

        debug!(rule = %rule.name, circuit, ?gesture, "rule matched");

        let commands = rule
            .then
            .iter()
            .map(|action| match action {
                RuleAction::Relay { circuit, state, .. } => {
                    SetCommand::binary("relay", circuit.clone(), *state)
                }
                RuleAction::Led { circuit, state } => {
                    SetCommand::binary("led", circuit.clone(), *state)
                }
            })
            .collect();

        Some(RuleOutcome {
            commands,
            mute: rule.mute,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::RuleTrigger;
    use crate::model::RelaySubtype;

    fn rules() -> RuleSet {
        RuleSet::new(vec![
            RuleConfig {
                name: "hall pulse".into(),
                when: RuleTrigger {
                    circuit: "1_03".into(),
                    gesture: Gesture::Single,
                },
                then: vec![
                    RuleAction::Relay {
                        relay_type: RelaySubtype::Digital,
                        circuit: "2_01".into(),
                        state: true,
                    },
                    RuleAction::Led {
                        circuit: "1_01".into(),
                        state: false,
                    },
                ],
                mute: true,
            },
            RuleConfig {
                name: "announce only".into(),
                when: RuleTrigger {
                    circuit: "1_03".into(),
                    gesture: Gesture::Double,
                },
                then: Vec::new(),
                mute: false,
            },
        ])
    }

    #[test]
    fn matching_rule_yields_commands_and_mute() {
        let outcome = rules().apply("1_03", Gesture::Single).unwrap();
        assert!(outcome.mute);
        assert_eq!(
            outcome.commands,
            vec![
                SetCommand::binary("relay", "2_01", true),
                SetCommand::binary("led", "1_01", false),
            ]
        );
    }

    #[test]
    fn mute_and_side_effects_are_independent() {
        let outcome = rules().apply("1_03", Gesture::Double).unwrap();
        assert!(!outcome.mute);
        assert!(outcome.commands.is_empty());
    }

    #[test]
    fn no_match_means_no_interception() {
        assert!(rules().apply("1_03", Gesture::Long).is_none());
        assert!(rules().apply("2_05", Gesture::Single).is_none());
    }
}
