//! Typed observation records.
//!
//! One struct per observation kind. Records are built and validated once at
//! the source boundary and are immutable for the rest of the run.

use std::fmt;

use super::kind::EntityKind;

/// Common view of an observation record used by matching and diffing
pub trait Observation: fmt::Debug {
    /// Stable key, unique within one snapshot
    fn external_id(&self) -> &str;

    /// Human-readable name; not unique
    fn display_name(&self) -> &str;

    /// External id of the parent observation, if the record has one
    fn parent_external_id(&self) -> Option<&str> {
        None
    }
}

impl<T: Observation + ?Sized> Observation for &T {
    fn external_id(&self) -> &str {
        (**self).external_id()
    }
    fn display_name(&self) -> &str {
        (**self).display_name()
    }
    fn parent_external_id(&self) -> Option<&str> {
        (**self).parent_external_id()
    }
}

/// Join key segments into a scoped external id (`cluster/node/eth0`)
pub fn scoped_key(parts: &[&str]) -> String {
    parts.join("/")
}

/// A phone directory department
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub address: String,
    pub mail: String,
}

impl Observation for GroupRecord {
    fn external_id(&self) -> &str {
        &self.id
    }
    fn display_name(&self) -> &str {
        &self.name
    }
    fn parent_external_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
}

/// A phone directory person
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    pub title: String,
    pub group_id: Option<String>,
    /// Raw phone as published; normalized by the contact profile
    pub phone: String,
    pub room: String,
}

impl Observation for ContactRecord {
    fn external_id(&self) -> &str {
        &self.id
    }
    fn display_name(&self) -> &str {
        &self.name
    }
    fn parent_external_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }
}

/// A live host found by a subnet scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpAddressRecord {
    /// Address with the subnet mask appended (`10.0.0.5/24`)
    pub address: String,
    /// Reverse-resolved host name, empty when unknown
    pub dns_name: String,
    pub subnet: String,
}

impl Observation for IpAddressRecord {
    fn external_id(&self) -> &str {
        &self.address
    }
    fn display_name(&self) -> &str {
        &self.address
    }
}

/// A Proxmox cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRecord {
    pub name: String,
    pub cluster_type: String,
    pub site: Option<String>,
    pub description: Option<String>,
}

impl Observation for ClusterRecord {
    fn external_id(&self) -> &str {
        &self.name
    }
    fn display_name(&self) -> &str {
        &self.name
    }
}

/// A Proxmox node (PVE or PBS host)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub external_id: String,
    pub cluster: String,
    pub name: String,
    pub role: String,
    pub online: bool,
    pub version: Option<String>,
    pub cpus: Option<i64>,
    pub memory_gib: Option<i64>,
    /// Management address with mask
    pub primary_ip: Option<String>,
}

impl Observation for DeviceRecord {
    fn external_id(&self) -> &str {
        &self.external_id
    }
    fn display_name(&self) -> &str {
        &self.name
    }
    fn parent_external_id(&self) -> Option<&str> {
        Some(&self.cluster)
    }
}

/// A network interface of a Proxmox node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceRecord {
    pub external_id: String,
    pub device_external_id: String,
    pub name: String,
    pub iface_type: String,
    pub mac: Option<String>,
    pub mtu: Option<i64>,
    pub enabled: bool,
    /// External id of the bridge this interface is a port of
    pub bridge: Option<String>,
    pub addresses: Vec<String>,
}

impl Observation for InterfaceRecord {
    fn external_id(&self) -> &str {
        &self.external_id
    }
    fn display_name(&self) -> &str {
        &self.name
    }
    fn parent_external_id(&self) -> Option<&str> {
        Some(&self.device_external_id)
    }
}

/// Guest type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmType {
    Lxc,
    Qemu,
}

impl VmType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VmType::Lxc => "LXC",
            VmType::Qemu => "QEMU",
        }
    }
}

/// A Proxmox guest (LXC container or QEMU virtual machine)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRecord {
    pub external_id: String,
    pub cluster: String,
    pub vmid: i64,
    pub name: String,
    pub vm_type: VmType,
    pub running: bool,
    pub vcpus: Option<i64>,
    pub memory_mb: Option<i64>,
    pub disk_mb: Option<i64>,
    pub os_type: Option<String>,
    /// Set when the guest has exactly one IPv4 address
    pub primary_ip: Option<String>,
    /// Guest has several addresses and none can be chosen automatically
    pub ambiguous_primary: bool,
}

impl Observation for VmRecord {
    fn external_id(&self) -> &str {
        &self.external_id
    }
    fn display_name(&self) -> &str {
        &self.name
    }
    fn parent_external_id(&self) -> Option<&str> {
        Some(&self.cluster)
    }
}

/// A network interface of a Proxmox guest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmInterfaceRecord {
    pub external_id: String,
    pub vm_external_id: String,
    pub name: String,
    pub mac: Option<String>,
    pub mtu: Option<i64>,
    pub enabled: bool,
    /// Host bridge name, empty when the guest is not bridged
    pub bridge: String,
    pub addresses: Vec<String>,
}

impl Observation for VmInterfaceRecord {
    fn external_id(&self) -> &str {
        &self.external_id
    }
    fn display_name(&self) -> &str {
        &self.name
    }
    fn parent_external_id(&self) -> Option<&str> {
        Some(&self.vm_external_id)
    }
}

/// Link of an IPv4 address to the interface that carries it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpAssignmentRecord {
    pub address: String,
    pub interface_kind: EntityKind,
    pub interface_external_id: String,
}

impl Observation for IpAssignmentRecord {
    fn external_id(&self) -> &str {
        &self.address
    }
    fn display_name(&self) -> &str {
        &self.address
    }
    fn parent_external_id(&self) -> Option<&str> {
        Some(&self.interface_external_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_key_joins_with_slash() {
        assert_eq!(scoped_key(&["pve", "node1", "eth0"]), "pve/node1/eth0");
    }

    #[test]
    fn test_group_parent_external_id() {
        let group = GroupRecord {
            id: "831".to_string(),
            name: "Dept A".to_string(),
            parent_id: Some("900".to_string()),
            address: String::new(),
            mail: String::new(),
        };
        assert_eq!(group.external_id(), "831");
        assert_eq!(group.parent_external_id(), Some("900"));
    }
}
