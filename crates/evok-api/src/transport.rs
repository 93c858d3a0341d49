// Shared transport configuration.
//
// Both the REST client and the WebSocket channel derive their endpoints
// from this config, avoiding duplicated URL construction. Evok listens on
// plain HTTP/WS on the local network, so there is no TLS machinery here.

use std::time::Duration;

use url::Url;

use crate::error::Error;

/// Endpoint and tuning parameters for talking to one Evok controller.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Controller host name or IP address.
    pub host: String,
    /// REST API port (snapshot fetch).
    pub rest_port: u16,
    /// WebSocket port (event stream + commands).
    pub ws_port: u16,
    /// Request timeout for REST calls.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            rest_port: 80,
            ws_port: 8080,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Base URL of the REST API: `http://{host}:{rest_port}`.
    pub fn rest_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&format!("http://{}:{}", self.host, self.rest_port))?)
    }

    /// URL of the WebSocket endpoint: `ws://{host}:{ws_port}/ws`.
    pub fn ws_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&format!("ws://{}:{}/ws", self.host, self.ws_port))?)
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        Ok(reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("evok-api/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn url_construction() {
        let config = TransportConfig {
            host: "192.168.1.50".into(),
            rest_port: 8088,
            ws_port: 8089,
            ..TransportConfig::default()
        };

        assert_eq!(config.rest_url().unwrap().as_str(), "http://192.168.1.50:8088/");
        assert_eq!(config.ws_url().unwrap().as_str(), "ws://192.168.1.50:8089/ws");
    }

    #[test]
    fn default_ports_match_evok() {
        let config = TransportConfig::default();
        assert_eq!(config.rest_port, 80);
        assert_eq!(config.ws_port, 8080);
    }
}
