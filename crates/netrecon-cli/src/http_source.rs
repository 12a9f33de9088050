//! Snapshot sources reachable over HTTP.

#![allow(clippy::result_large_err)]

use std::time::Duration;

use netrecon_core::errors::{ExError, ReconError};
use netrecon_engine::{JsonFileSource, ObservationSource, Snapshot};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON payload fetched with a blocking GET, such as the phone directory
/// `exp.php` export
pub struct HttpJsonSource {
    name: String,
    url: String,
    timeout: Duration,
}

impl HttpJsonSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn unavailable(&self, reason: impl std::fmt::Display) -> ExError {
        ExError::from(ReconError::SourceUnavailable {
            source_name: self.name.clone(),
            reason: format!("{}: {}", self.url, reason),
        })
    }
}

impl ObservationSource for HttpJsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<Snapshot, ExError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| self.unavailable(e))?;
        let response = client
            .get(&self.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.unavailable(e))?;
        let bytes = response.bytes().map_err(|e| self.unavailable(e))?;
        tracing::debug!(
            component = module_path!(),
            source = %self.name,
            url = %self.url,
            bytes = bytes.len(),
            "snapshot downloaded"
        );
        Snapshot::from_bytes(self.name.clone(), &bytes)
    }
}

/// An `http://` or `https://` location is fetched, anything else is read
/// as a file
pub fn open_source(name: &str, location: &str) -> Box<dyn ObservationSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpJsonSource::new(name, location))
    } else {
        Box::new(JsonFileSource::new(name, location))
    }
}
