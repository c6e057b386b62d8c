use std::time::Duration;

use tracing::debug;

use super::ImageSource;
use crate::config::settings::Settings;
use crate::error::ChopError;

/// Blocking HTTP(S) image fetcher. One request per call, no retries.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, connect_timeout: Duration) -> crate::error::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| ChopError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Use a preconfigured client (custom proxy, TLS or timeout setup).
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }

    pub fn from_settings(settings: &Settings) -> crate::error::Result<Self> {
        Self::new(
            Duration::from_secs(settings.fetch_timeout_secs),
            Duration::from_secs(settings.connect_timeout_secs),
        )
    }
}

impl ImageSource for HttpFetcher {
    fn fetch(&self, url: &str) -> crate::error::Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ChopError::fetch(format!("failed to fetch {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChopError::fetch(format!("HTTP {status} fetching {url}")));
        }

        let bytes = response
            .bytes()
            .map_err(|e| ChopError::fetch(format!("failed to read body of {url}: {e}")))?;
        debug!(url, bytes = bytes.len(), "fetched source image");

        Ok(bytes.to_vec())
    }
}
