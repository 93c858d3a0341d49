// evok-core: Stateful device mirror and behavior layer over evok-api.

pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod gesture;
pub mod model;
pub mod output;
pub mod rules;
pub mod timer;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{ConnectionState, EvokClient};
pub use config::{EndpointConfig, RuleAction, RuleConfig, RuleTrigger, TimerConfig, WatchdogConfig};
pub use directory::DeviceDirectory;
pub use error::CoreError;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    DeviceEvent, DeviceKey, DeviceKind, DeviceRecord, EventCategory, EvokEvent, Gesture,
    GestureEvent, LifecycleEvent, RelaySubtype,
};
