//! TOML configuration of the `netrecon` binary
//!
//! ```toml
//! [run]
//! script_name = "netrecon"
//! db = "/var/lib/netrecon/registry.db"
//! log_profile = "production"
//!
//! [contacts]
//! source = "http://phones.corp/exp.php"
//! import_groups = true
//! import_contacts = true
//!
//! [ipscan]
//! source = "/var/lib/netrecon/scan.json"
//! subnet_pause_secs = 5
//! subnet_tag = "scan"
//!
//! [proxmox]
//! source = "/var/lib/netrecon/pve.json"
//! tag = "prox_scan"
//! ```
//!
//! Every key is optional; command-line flags override the file.

#![allow(clippy::result_large_err)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use netrecon_core::errors::{ExError, ExErrorKind};
use netrecon_engine::pipelines::{PIPELINE_CONTACTS, PIPELINE_IPSCAN, PIPELINE_PROXMOX};
use netrecon_engine::ReconConfig;
use serde::Deserialize;

pub const DEFAULT_DB: &str = "netrecon.db";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub run: RunSection,
    pub contacts: ContactsSection,
    pub ipscan: IpScanSection,
    pub proxmox: ProxmoxSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    pub script_name: Option<String>,
    pub db: Option<PathBuf>,
    pub log_profile: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContactsSection {
    pub source: Option<String>,
    pub script_name: Option<String>,
    pub import_groups: Option<bool>,
    pub import_contacts: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IpScanSection {
    pub source: Option<String>,
    pub script_name: Option<String>,
    pub subnet_pause_secs: Option<u64>,
    pub subnet_tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxmoxSection {
    pub source: Option<String>,
    pub script_name: Option<String>,
    pub tag: Option<String>,
}

fn config_error(path: &Path, reason: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("load_config")
        .with_message(format!("{}: {}", path.display(), reason))
}

impl FileConfig {
    /// # Errors
    ///
    /// `Config` when the file cannot be read or is not valid configuration.
    pub fn load(path: &Path) -> Result<Self, ExError> {
        let text = std::fs::read_to_string(path).map_err(|e| config_error(path, e))?;
        toml::from_str(&text).map_err(|e| config_error(path, e))
    }

    /// Source location configured for `pipeline`
    pub fn source(&self, pipeline: &str) -> Option<&str> {
        match pipeline {
            PIPELINE_CONTACTS => self.contacts.source.as_deref(),
            PIPELINE_IPSCAN => self.ipscan.source.as_deref(),
            PIPELINE_PROXMOX => self.proxmox.source.as_deref(),
            _ => None,
        }
    }

    pub fn db(&self) -> PathBuf {
        self.run.db.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
    }

    /// Engine settings for `pipeline`; a section's script name wins over
    /// the one in `[run]`
    pub fn recon_config(&self, pipeline: &str) -> ReconConfig {
        let section_script = match pipeline {
            PIPELINE_CONTACTS => self.contacts.script_name.as_deref(),
            PIPELINE_IPSCAN => self.ipscan.script_name.as_deref(),
            PIPELINE_PROXMOX => self.proxmox.script_name.as_deref(),
            _ => None,
        };
        let mut config = match section_script.or(self.run.script_name.as_deref()) {
            Some(name) => ReconConfig::new(name),
            None => ReconConfig::default(),
        };
        if let Some(secs) = self.ipscan.subnet_pause_secs {
            config = config.with_subnet_pause(Duration::from_secs(secs));
        }
        if let Some(tag) = &self.ipscan.subnet_tag {
            config = config.with_subnet_tag(tag.as_str());
        }
        if let Some(tag) = &self.proxmox.tag {
            config = config.with_proxmox_tag(tag.as_str());
        }
        if let Some(enabled) = self.contacts.import_groups {
            config = config.with_import_groups(enabled);
        }
        if let Some(enabled) = self.contacts.import_contacts {
            config = config.with_import_contacts(enabled);
        }
        config
    }
}
