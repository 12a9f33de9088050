use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a registry entity
///
/// Tag uniqueness is scoped per kind: two entities of different kinds may
/// carry the same external id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    ContactGroup,
    Contact,
    IpAddress,
    ClusterType,
    Cluster,
    DeviceRole,
    Device,
    Interface,
    VirtualMachine,
    VmInterface,
    Tag,
}

impl EntityKind {
    pub const ALL: [EntityKind; 11] = [
        EntityKind::ContactGroup,
        EntityKind::Contact,
        EntityKind::IpAddress,
        EntityKind::ClusterType,
        EntityKind::Cluster,
        EntityKind::DeviceRole,
        EntityKind::Device,
        EntityKind::Interface,
        EntityKind::VirtualMachine,
        EntityKind::VmInterface,
        EntityKind::Tag,
    ];

    /// Stable snake_case name used in logs and persisted rows
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::ContactGroup => "contact_group",
            EntityKind::Contact => "contact",
            EntityKind::IpAddress => "ip_address",
            EntityKind::ClusterType => "cluster_type",
            EntityKind::Cluster => "cluster",
            EntityKind::DeviceRole => "device_role",
            EntityKind::Device => "device",
            EntityKind::Interface => "interface",
            EntityKind::VirtualMachine => "virtual_machine",
            EntityKind::VmInterface => "vm_interface",
            EntityKind::Tag => "tag",
        }
    }

    /// Parse the stable name back into a kind
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    /// Whether entities of this kind must carry a non-empty name
    ///
    /// IP addresses are identified by the address itself; their name is the
    /// address and may be repeated in the DNS name field.
    pub fn requires_name(&self) -> bool {
        !matches!(self, EntityKind::IpAddress)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
