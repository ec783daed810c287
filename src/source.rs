//! Acquisition of raw spreadsheet bytes from a remote URL or a local file.

use crate::error::ErrorKind;
use crate::error::LookupError;
use chrono::Utc;
use log::debug;
use log::info;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Query parameter appended to remote requests so caches never answer them
const CACHE_BUSTING_PARAM: &str = "t";

/// Supplies raw dataset bytes to a loader session.
pub trait DatasetSource {
    /// Performs one HTTP GET and returns the response body.
    ///
    /// # Errors
    /// `NetworkError` on transport failure or timeout, `HttpStatusError` on a non-2xx status.
    fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, LookupError>;

    /// Reads a whole local file into memory.
    fn read_local(&self, path: &Path) -> Result<Vec<u8>, LookupError> {
        let bytes = std::fs::read(path).map_err(|e| LookupError::io(path.display(), e))?;
        debug!("Read {} bytes from '{}'", bytes.len(), path.display());
        Ok(bytes)
    }
}

/// Production source backed by a blocking HTTP client.
pub struct HttpSource {
    http: reqwest::blocking::Client,
}

impl HttpSource {
    /// Builds the HTTP client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, LookupError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::WithContextError {
                kind: ErrorKind::Network,
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { http })
    }
}

impl DatasetSource for HttpSource {
    fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, LookupError> {
        info!("Fetching '{}'", url);
        let network_error = |source| LookupError::NetworkError {
            url: url.to_owned(),
            source,
        };
        let response = self.http.get(url).send().map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::HttpStatusError {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(network_error)?;
        debug!("Received {} bytes from '{}'", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// Appends `t=<unix millis>` to a URL so intermediaries cannot serve stale bytes.
pub fn cache_busted(url: &str) -> Result<String, LookupError> {
    let mut url = Url::parse(url)?;
    url.query_pairs_mut()
        .append_pair(CACHE_BUSTING_PARAM, &Utc::now().timestamp_millis().to_string());
    Ok(url.into())
}

/// Derives a display label from a URL or file name.
///
/// Takes the last `/` or `\` separated segment and drops any query string;
/// falls back to `default_name` when nothing usable is left. The result is
/// always a bare file name.
pub fn provenance_label(name: &str, default_name: &str) -> String {
    let name = name.split(['?', '#']).next().unwrap_or_default();
    let label = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if label.is_empty() || label == "." || label == ".." {
        default_name.to_owned()
    } else {
        label.to_owned()
    }
}

/// Checks if a location names a remote URL rather than a local path
pub fn is_remote_url(location: &str) -> bool {
    if let Ok(url) = Url::parse(location) {
        matches!(url.scheme(), "http" | "https")
    } else {
        false
    }
}
