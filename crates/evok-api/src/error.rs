use thiserror::Error;

/// Top-level error type for the `evok-api` crate.
///
/// Covers every transport failure mode: the one-shot REST snapshot,
/// the persistent WebSocket channel, and payload decoding.
/// `evok-core` maps these into its own domain-facing variants.
#[derive(Debug, Error)]
pub enum Error {
    // ── HTTP transport ──────────────────────────────────────────────
    /// Low-level HTTP error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response from the REST API.
    #[error("REST request failed with HTTP {status}")]
    Http { status: u16 },

    /// URL construction error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection could not be established.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// Error on an established WebSocket connection.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Attempted to use a channel that has already been closed.
    #[error("WebSocket channel closed")]
    ChannelClosed,
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Every transport-level failure against a co-located controller is
    /// treated as recoverable; only payload decoding is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_)
            | Self::Http { .. }
            | Self::WebSocketConnect(_)
            | Self::WebSocket(_)
            | Self::ChannelClosed => true,
            Self::InvalidUrl(_) | Self::Deserialization { .. } => false,
        }
    }
}
