//! Observation sources and the payload adapters that turn a snapshot into
//! typed records.
//!
//! A source is fetched once per run and fully materialised before any
//! registry write. Adapters validate the payload at this boundary; after
//! parsing, records are immutable.

#![allow(clippy::result_large_err)]

pub mod ip_scan;
pub mod phone_directory;
pub mod proxmox;

use std::path::{Path, PathBuf};

use netrecon_core::errors::{ExError, ReconError};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

pub use ip_scan::{IpScan, SubnetBatch};
pub use phone_directory::PhoneDirectory;
pub use proxmox::ProxmoxInventory;

/// One bulk read of an upstream system
pub trait ObservationSource {
    /// Name used in errors and logs
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// `SourceUnavailable` when the upstream cannot be read, `InvalidInput`
    /// when what it returned is not JSON.
    fn fetch(&self) -> Result<Snapshot, ExError>;
}

/// Raw payload of one fetch
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub source: String,
    pub payload: serde_json::Value,
    /// SHA-256 of the bytes as fetched, hex encoded
    pub digest: String,
}

impl Snapshot {
    /// # Errors
    ///
    /// `InvalidInput` when `bytes` is not a JSON document.
    pub fn from_bytes(source: impl Into<String>, bytes: &[u8]) -> Result<Self, ExError> {
        let source = source.into();
        let payload = serde_json::from_slice(bytes).map_err(|e| {
            ExError::from(ReconError::InvalidPayload {
                source_name: source.clone(),
                reason: e.to_string(),
            })
        })?;
        Ok(Self {
            source,
            payload,
            digest: hex::encode(Sha256::digest(bytes)),
        })
    }

    /// Deserialize the payload into an adapter's wire type
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the payload does not have the expected shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ExError> {
        T::deserialize(&self.payload).map_err(|e| self.invalid(e.to_string()))
    }

    pub(crate) fn invalid(&self, reason: impl Into<String>) -> ExError {
        ExError::from(ReconError::InvalidPayload {
            source_name: self.source.clone(),
            reason: reason.into(),
        })
    }
}

/// Snapshot stored in a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ObservationSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<Snapshot, ExError> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            ExError::from(ReconError::SourceUnavailable {
                source_name: self.name.clone(),
                reason: format!("{}: {}", self.path.display(), e),
            })
        })?;
        tracing::debug!(
            component = module_path!(),
            source = %self.name,
            path = %self.path.display(),
            bytes = bytes.len(),
            "snapshot read"
        );
        Snapshot::from_bytes(self.name.clone(), &bytes)
    }
}

/// Snapshot held in memory
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    bytes: Vec<u8>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl ObservationSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<Snapshot, ExError> {
        Snapshot::from_bytes(self.name.clone(), &self.bytes)
    }
}

/// Identifiers that upstream sends either as strings or as numbers
pub(crate) mod loose_id {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Text(s)) => s.trim().to_string(),
            Some(Raw::Int(i)) => i.to_string(),
            Some(Raw::Float(f)) => f.to_string(),
            None => String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netrecon_core::errors::ExErrorKind;

    #[test]
    fn test_digest_is_stable() {
        let a = Snapshot::from_bytes("s", br#"{"a":1}"#).unwrap();
        let b = Snapshot::from_bytes("s", br#"{"a":1}"#).unwrap();
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.digest.len(), 64);
    }

    #[test]
    fn test_garbage_is_invalid_input() {
        let err = Snapshot::from_bytes("s", b"<html>").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let source = JsonFileSource::new("directory", "/nonexistent/netrecon.json");
        let err = source.fetch().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::SourceUnavailable);
    }
}
