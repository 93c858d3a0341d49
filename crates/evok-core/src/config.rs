// ── Endpoint configuration ──
//
// These types describe one controller endpoint and the behavior layered
// on top of it (gesture thresholds, output timers, rules, watchdog).
// The host application constructs an `EndpointConfig` and hands it in --
// core never reads config files. Field names mirror the JSON shape hosts
// already use (camelCase), and duration fields accept either an integer
// millisecond count or a humantime string ("90s", "1h 30m").

use std::time::Duration;

use serde::Deserialize;

use evok_api::TransportConfig;

use crate::model::{Gesture, RelaySubtype};

/// Configuration for one controller endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointConfig {
    /// Stable endpoint identifier.
    pub id: String,
    /// Display name, used as a logging prefix.
    pub name: String,
    /// Controller host name or IP.
    pub host: String,
    /// REST API port.
    pub port: u16,
    /// WebSocket port.
    pub ws_port: u16,

    /// Window for distinguishing a single click from the first half of a
    /// double click.
    #[serde(deserialize_with = "duration_ms::deserialize")]
    pub double_press_max_delay: Duration,
    /// Hold time before the first long-press fires; also the repeat period.
    #[serde(deserialize_with = "duration_ms::deserialize")]
    pub long_press_min_delay: Duration,
    /// Ceiling on long-press repeats, guarding against a stuck input.
    pub max_repeat_count: u32,

    /// Auto-off / pulse timer entries.
    pub timers: Vec<TimerConfig>,
    /// Gesture rules (side-effect commands, optional event muting).
    pub rules: Vec<RuleConfig>,

    pub watchdog: WatchdogConfig,

    /// Fixed delay between reconnect attempts after a connect failure.
    #[serde(deserialize_with = "duration_ms::deserialize")]
    pub reconnect_interval: Duration,
    /// REST request timeout.
    #[serde(deserialize_with = "duration_ms::deserialize")]
    pub timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: "Untitled UniPi".into(),
            host: "localhost".into(),
            port: 80,
            ws_port: 8080,
            double_press_max_delay: Duration::from_millis(500),
            long_press_min_delay: Duration::from_millis(1000),
            max_repeat_count: 10,
            timers: Vec::new(),
            rules: Vec::new(),
            watchdog: WatchdogConfig::default(),
            reconnect_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
        }
    }
}

impl EndpointConfig {
    /// Derive the transport parameters for this endpoint.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            host: self.host.clone(),
            rest_port: self.port,
            ws_port: self.ws_port,
            timeout: self.timeout,
        }
    }
}

/// One auto-off / pulse timer, keyed by (subtype, circuit).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    pub relay_type: RelaySubtype,
    pub circuit: String,
    /// Auto-off delay armed when the output turns on.
    #[serde(deserialize_with = "duration_ms::deserialize")]
    pub timeout: Duration,
    /// Maintain a paired virtual impulse relay for this output.
    #[serde(default)]
    pub pulse: bool,
    #[serde(default)]
    pub name: Option<String>,
}

/// Watchdog tuning. Defaults match the controller's traffic cadence:
/// evok streams updates often enough that five silent 3-second ticks
/// reliably indicate a half-open socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatchdogConfig {
    #[serde(deserialize_with = "duration_ms::deserialize")]
    pub interval: Duration,
    /// Missed-tick ceiling that forces a reconnect.
    pub max_missed: u32,
    /// User LED toggled each tick as a liveness indicator. Cosmetic.
    pub led_circuit: Option<String>,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_missed: 5,
            led_circuit: Some("1_01".into()),
        }
    }
}

/// A rule intercepting one (input circuit, gesture) pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    #[serde(default)]
    pub name: String,
    pub when: RuleTrigger,
    #[serde(default)]
    pub then: Vec<RuleAction>,
    /// Suppress the gesture event entirely; side effects still run.
    #[serde(default)]
    pub mute: bool,
}

/// The (circuit, gesture) tuple a rule matches on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTrigger {
    pub circuit: String,
    #[serde(alias = "event")]
    pub gesture: Gesture,
}

/// A side-effect output command a rule issues when triggered.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "dev", rename_all = "camelCase")]
pub enum RuleAction {
    #[serde(rename = "relay", rename_all = "camelCase")]
    Relay {
        relay_type: RelaySubtype,
        circuit: String,
        state: bool,
    },
    #[serde(rename = "led", rename_all = "camelCase")]
    Led { circuit: String, state: bool },
}

// ── Duration parsing ─────────────────────────────────────────────────

/// Deserialize a `Duration` from either an integer millisecond count or
/// a humantime string such as `"500ms"`, `"90s"` or `"1h 30m"`.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Millis(u64),
        Human(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Millis(ms) => Ok(Duration::from_millis(ms)),
            Repr::Human(s) => humantime::parse_duration(&s).map_err(D::Error::custom),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
