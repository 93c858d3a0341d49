// ── Core error types ──
//
// User-facing errors from evok-core. These are NOT transport-specific --
// consumers never see HTTP status codes or socket failures directly.
// The `From<evok_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach controller: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Not connected")]
    NotConnected,

    #[error("Client already started (clients are single-shot)")]
    AlreadyStarted,

    // ── Directory errors ─────────────────────────────────────────────
    /// A query was attempted before the first snapshot load completed.
    #[error("Device directory not ready")]
    DirectoryNotReady,

    /// A single-device accessor was asked for a circuit absent from the
    /// directory.
    #[error("Invalid {category} circuit: {circuit}")]
    InvalidCircuit { category: String, circuit: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn invalid_circuit(category: impl Into<String>, circuit: impl Into<String>) -> Self {
        Self::InvalidCircuit {
            category: category.into(),
            circuit: circuit.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<evok_api::Error> for CoreError {
    fn from(err: evok_api::Error) -> Self {
        match err {
            evok_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid endpoint URL: {e}"),
            },
            other => CoreError::ConnectionFailed {
                reason: other.to_string(),
            },
        }
    }
}
