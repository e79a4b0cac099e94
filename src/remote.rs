use std::time::Duration;

use camino::Utf8Path;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::error::DataError;
use crate::store::Store;

pub trait RemoteSource: Send + Sync {
    fn get_text(&self, url: &str) -> Result<String, DataError>;
    fn download(&self, url: &str, destination: &Utf8Path) -> Result<(), DataError>;
}

#[derive(Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Result<Self, DataError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("tdata/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DataError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| DataError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, DataError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| DataError::Http(err.to_string()))?;
        Self::handle_status(response)
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, DataError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "request failed".to_string());
        Err(DataError::HttpStatus { status, message })
    }
}

impl RemoteSource for HttpSource {
    fn get_text(&self, url: &str) -> Result<String, DataError> {
        self.get(url)?
            .text()
            .map_err(|err| DataError::Http(err.to_string()))
    }

    fn download(&self, url: &str, destination: &Utf8Path) -> Result<(), DataError> {
        let bytes = self
            .get(url)?
            .bytes()
            .map_err(|err| DataError::Http(err.to_string()))?;
        Store::write_bytes_atomic(destination, &bytes)
    }
}

/// Fetches `url` and stores the body verbatim at `destination`.
///
/// A body containing `missing_marker` means the remote has no data for the
/// request; nothing is written in that case.
pub fn fetch_via_direct_url<R: RemoteSource + ?Sized>(
    remote: &R,
    url: &str,
    missing_marker: &str,
    destination: &Utf8Path,
) -> Result<String, DataError> {
    let body = remote.get_text(url)?;
    ensure_available(&body, missing_marker, url)?;
    Store::write_bytes_atomic(destination, body.as_bytes())?;
    Ok(body)
}

/// Fails with `RemoteResourceUnavailable` when the page text carries the marker.
pub fn ensure_available(body: &str, missing_marker: &str, url: &str) -> Result<(), DataError> {
    if body.contains(missing_marker) {
        warn!(url, "remote reports no data ({missing_marker:?})");
        return Err(DataError::RemoteResourceUnavailable(format!(
            "{url}: {missing_marker}"
        )));
    }
    Ok(())
}
