//! Run configuration passed explicitly to the engine and pipelines.

use std::time::Duration;

/// Default pause between subnet batches of an IP scan
pub const DEFAULT_SUBNET_PAUSE: Duration = Duration::from_secs(5);

/// Registry tag put on objects the Proxmox sweep manages
pub const DEFAULT_PROXMOX_TAG: &str = "prox_scan";

/// Settings shared by every pipeline of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconConfig {
    /// Name written into created-by descriptions and comments
    pub script_name: String,
    /// Pause between subnet batches of an IP scan
    pub subnet_pause: Duration,
    /// Only scan subnets carrying this tag
    pub subnet_tag: Option<String>,
    /// Registry tag object ensured before a Proxmox sweep
    pub proxmox_tag: String,
    /// Directory sync: reconcile departments
    pub import_groups: bool,
    /// Directory sync: reconcile people
    pub import_contacts: bool,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            script_name: "netrecon".to_string(),
            subnet_pause: DEFAULT_SUBNET_PAUSE,
            subnet_tag: None,
            proxmox_tag: DEFAULT_PROXMOX_TAG.to_string(),
            import_groups: true,
            import_contacts: true,
        }
    }
}

impl ReconConfig {
    pub fn new(script_name: impl Into<String>) -> Self {
        Self {
            script_name: script_name.into(),
            ..Self::default()
        }
    }

    pub fn with_subnet_pause(mut self, pause: Duration) -> Self {
        self.subnet_pause = pause;
        self
    }

    pub fn with_subnet_tag(mut self, tag: impl Into<String>) -> Self {
        self.subnet_tag = Some(tag.into());
        self
    }

    pub fn with_proxmox_tag(mut self, tag: impl Into<String>) -> Self {
        self.proxmox_tag = tag.into();
        self
    }

    pub fn with_import_groups(mut self, enabled: bool) -> Self {
        self.import_groups = enabled;
        self
    }

    pub fn with_import_contacts(mut self, enabled: bool) -> Self {
        self.import_contacts = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconConfig::default();
        assert_eq!(config.subnet_pause, Duration::from_secs(5));
        assert_eq!(config.proxmox_tag, "prox_scan");
        assert!(config.subnet_tag.is_none());
        assert!(config.import_groups && config.import_contacts);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ReconConfig::new("sync_contacts").with_subnet_pause(Duration::ZERO);
        assert_eq!(config.script_name, "sync_contacts");
        assert_eq!(config.subnet_pause, Duration::ZERO);
    }
}
