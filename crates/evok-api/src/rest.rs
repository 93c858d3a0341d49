// REST snapshot client
//
// One-shot fetch of the full device listing that seeds the device
// directory at connect time. Incremental updates arrive over the
// WebSocket channel, not here.

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::wire::RawDevice;

/// HTTP client for the Evok REST API.
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    /// Create a new REST client from a `TransportConfig`.
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
            base_url: config.rest_url()?,
        })
    }

    /// Create a REST client with a pre-built `reqwest::Client`.
    ///
    /// Used by tests to point at a mock server.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the full device-state snapshot from `GET /rest/all`.
    ///
    /// Returns every addressable channel on the controller as one flat
    /// listing. A non-2xx status maps to [`Error::Http`]; a malformed
    /// body to [`Error::Deserialization`] with the body retained.
    pub async fn fetch_all(&self) -> Result<Vec<RawDevice>, Error> {
        let url = self.base_url.join("rest/all")?;
        debug!(%url, "GET snapshot");

        let resp = self.http.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        debug!(bytes = body.len(), "snapshot received");

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}
