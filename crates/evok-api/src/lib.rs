// evok-api: Async Rust client for the Evok remote I/O controller API
// (REST snapshot + WebSocket event stream + set-commands).

pub mod error;
pub mod rest;
pub mod socket;
pub mod transport;
pub mod wire;

pub use error::Error;
pub use rest::RestClient;
pub use socket::{EvokSocket, SocketEvent, SocketReader, SocketWriter};
pub use transport::TransportConfig;
pub use wire::{Incoming, RawDevice, SetCommand};
