//! Proxmox cluster: the cluster, its nodes and their interfaces, guests and
//! their interfaces, and the IPv4 addresses carried by those interfaces.
//!
//! Every profile is scoped to one cluster: external ids below the cluster
//! are prefixed with the cluster name (`pve/node1/eth0`), and pass 1 only
//! considers entities whose tag carries that prefix.

use std::marker::PhantomData;

use crate::diff::{FieldRule, FieldTarget};
use crate::matcher::NameFallback;
use crate::model::{
    ClusterRecord, DeviceRecord, EntityKind, FieldValue, InterfaceRecord, IpAssignmentRecord,
    Observation, RegistryEntity, VmInterfaceRecord, VmRecord,
};
use crate::normalize::{make_node_description, make_vm_description, make_vm_iface_description};
use crate::profile::{tag_in_scope, KindProfile, RetirePolicy};

use super::{STATUS_ACTIVE, STATUS_OFFLINE};

pub const CLUSTER_TYPE: &str = "Proxmox";
pub const VM_ROLE: &str = "server";
pub const FIELD_PRIMARY_IP4: &str = "primary_ip4";

fn created_by(script_name: &str) -> String {
    format!("Created by script '{}'", script_name)
}

fn status(active: bool) -> &'static str {
    if active {
        STATUS_ACTIVE
    } else {
        STATUS_OFFLINE
    }
}

/// The cluster itself
#[derive(Debug, Clone)]
pub struct ClusterProfile {
    cluster: String,
    script_name: String,
}

impl ClusterProfile {
    pub fn new(cluster: impl Into<String>, script_name: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            script_name: script_name.into(),
        }
    }
}

impl KindProfile for ClusterProfile {
    type Record = ClusterRecord;

    fn kind(&self) -> EntityKind {
        EntityKind::Cluster
    }

    fn field_rules(&self, record: &ClusterRecord) -> Vec<FieldRule> {
        vec![
            FieldRule::set(FieldTarget::Name, record.name.as_str()),
            FieldRule::lookup(
                FieldTarget::field("cluster_type"),
                EntityKind::ClusterType,
                record.cluster_type.as_str(),
            ),
            FieldRule::set(FieldTarget::field("site"), FieldValue::opt_text(record.site.as_deref()))
                .preserve(),
            FieldRule::set(
                FieldTarget::field("description"),
                FieldValue::opt_text(record.description.as_deref()),
            )
            .preserve(),
            FieldRule::set(FieldTarget::field("comments"), created_by(&self.script_name))
                .create_only(),
        ]
    }

    fn retire_policy(&self) -> RetirePolicy {
        RetirePolicy::Keep
    }

    fn owns(&self, entity: &RegistryEntity) -> bool {
        entity.tag() == Some(self.cluster.as_str())
    }

    fn adopts_untracked(&self) -> bool {
        true
    }
}

/// Cluster nodes; a node that disappeared is marked offline
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    cluster: String,
    script_name: String,
}

impl DeviceProfile {
    pub fn new(cluster: impl Into<String>, script_name: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            script_name: script_name.into(),
        }
    }
}

impl KindProfile for DeviceProfile {
    type Record = DeviceRecord;

    fn kind(&self) -> EntityKind {
        EntityKind::Device
    }

    fn field_rules(&self, record: &DeviceRecord) -> Vec<FieldRule> {
        // Details are only known for nodes that answered.
        let description = match (&record.version, record.cpus, record.memory_gib) {
            (Some(version), Some(cpus), Some(mem)) if record.online => {
                FieldValue::text(make_node_description(&record.role, version, cpus, mem))
            }
            _ => FieldValue::Null,
        };
        vec![
            FieldRule::set(FieldTarget::Name, record.name.as_str()),
            FieldRule::lookup(FieldTarget::Parent, EntityKind::Cluster, record.cluster.as_str()),
            FieldRule::lookup(FieldTarget::field("role"), EntityKind::DeviceRole, record.role.as_str())
                .preserve(),
            FieldRule::set(FieldTarget::field("status"), status(record.online)),
            FieldRule::set(FieldTarget::field("description"), description).preserve(),
            FieldRule::set(FieldTarget::field("comments"), created_by(&self.script_name))
                .create_only(),
        ]
    }

    fn retire_policy(&self) -> RetirePolicy {
        RetirePolicy::mark("status", STATUS_OFFLINE)
    }

    fn owns(&self, entity: &RegistryEntity) -> bool {
        tag_in_scope(entity, &self.cluster)
    }

    fn adopts_untracked(&self) -> bool {
        true
    }
}

/// Node network interfaces
///
/// MTU uses the `Always` policy: an interface without an MTU clears the
/// registry value. Guest interfaces preserve it instead.
#[derive(Debug, Clone)]
pub struct InterfaceProfile {
    cluster: String,
    script_name: String,
}

impl InterfaceProfile {
    pub fn new(cluster: impl Into<String>, script_name: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            script_name: script_name.into(),
        }
    }
}

impl KindProfile for InterfaceProfile {
    type Record = InterfaceRecord;

    fn kind(&self) -> EntityKind {
        EntityKind::Interface
    }

    fn field_rules(&self, record: &InterfaceRecord) -> Vec<FieldRule> {
        let bridge = match &record.bridge {
            Some(bridge) => FieldRule::lookup(FieldTarget::field("bridge"), EntityKind::Interface, bridge.as_str()),
            None => FieldRule::set(FieldTarget::field("bridge"), FieldValue::Null),
        };
        vec![
            FieldRule::set(FieldTarget::Name, record.name.as_str()),
            FieldRule::lookup(
                FieldTarget::Parent,
                EntityKind::Device,
                record.device_external_id.as_str(),
            ),
            FieldRule::set(FieldTarget::field("type"), record.iface_type.as_str()).create_only(),
            FieldRule::set(FieldTarget::field("mac"), FieldValue::opt_text(record.mac.as_deref()))
                .preserve()
                .ignore_case(),
            FieldRule::set_opt(FieldTarget::field("mtu"), record.mtu.map(FieldValue::Int)),
            FieldRule::set(FieldTarget::field("enabled"), record.enabled),
            bridge,
            FieldRule::set(FieldTarget::field("description"), created_by(&self.script_name))
                .create_only(),
        ]
    }

    fn retire_policy(&self) -> RetirePolicy {
        RetirePolicy::Keep
    }

    fn owns(&self, entity: &RegistryEntity) -> bool {
        tag_in_scope(entity, &self.cluster)
    }

    fn name_fallback(&self) -> NameFallback {
        NameFallback::Disabled
    }
}

/// Guests; a guest that disappeared is marked offline
///
/// Zero or missing sizes never overwrite a known value.
#[derive(Debug, Clone)]
pub struct VmProfile {
    cluster: String,
    script_name: String,
}

impl VmProfile {
    pub fn new(cluster: impl Into<String>, script_name: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            script_name: script_name.into(),
        }
    }
}

impl KindProfile for VmProfile {
    type Record = VmRecord;

    fn kind(&self) -> EntityKind {
        EntityKind::VirtualMachine
    }

    fn field_rules(&self, record: &VmRecord) -> Vec<FieldRule> {
        let description = record
            .os_type
            .as_deref()
            .map(|os| FieldValue::text(make_vm_description(record.vm_type.as_str(), os)));
        vec![
            FieldRule::set(FieldTarget::Name, record.name.as_str()),
            FieldRule::lookup(FieldTarget::Parent, EntityKind::Cluster, record.cluster.as_str()),
            FieldRule::set(FieldTarget::field("status"), status(record.running)),
            FieldRule::lookup(FieldTarget::field("role"), EntityKind::DeviceRole, VM_ROLE)
                .create_only(),
            FieldRule::set(FieldTarget::field("serial"), record.vmid.to_string()),
            FieldRule::set(FieldTarget::field("vcpus"), FieldValue::nonzero(record.vcpus)).preserve(),
            FieldRule::set(FieldTarget::field("memory"), FieldValue::nonzero(record.memory_mb))
                .preserve(),
            FieldRule::set(FieldTarget::field("disk"), FieldValue::nonzero(record.disk_mb)).preserve(),
            FieldRule::set_opt(FieldTarget::field("description"), description).preserve(),
            FieldRule::set(FieldTarget::field("comments"), created_by(&self.script_name))
                .create_only(),
        ]
    }

    fn retire_policy(&self) -> RetirePolicy {
        RetirePolicy::mark("status", STATUS_OFFLINE)
    }

    fn owns(&self, entity: &RegistryEntity) -> bool {
        tag_in_scope(entity, &self.cluster)
    }
}

/// Guest network interfaces, keyed by MAC within their guest
#[derive(Debug, Clone)]
pub struct VmInterfaceProfile {
    cluster: String,
}

impl VmInterfaceProfile {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }
}

impl KindProfile for VmInterfaceProfile {
    type Record = VmInterfaceRecord;

    fn kind(&self) -> EntityKind {
        EntityKind::VmInterface
    }

    fn field_rules(&self, record: &VmInterfaceRecord) -> Vec<FieldRule> {
        vec![
            FieldRule::set(FieldTarget::Name, record.name.as_str()),
            FieldRule::lookup(
                FieldTarget::Parent,
                EntityKind::VirtualMachine,
                record.vm_external_id.as_str(),
            ),
            FieldRule::set(FieldTarget::field("mac"), FieldValue::opt_text(record.mac.as_deref()))
                .preserve()
                .ignore_case(),
            FieldRule::set(FieldTarget::field("mtu"), FieldValue::nonzero(record.mtu)).preserve(),
            FieldRule::set(FieldTarget::field("enabled"), record.enabled),
            FieldRule::set(
                FieldTarget::field("description"),
                make_vm_iface_description(&record.bridge),
            ),
        ]
    }

    fn retire_policy(&self) -> RetirePolicy {
        RetirePolicy::Delete
    }

    fn owns(&self, entity: &RegistryEntity) -> bool {
        tag_in_scope(entity, &self.cluster)
    }

    fn name_fallback(&self) -> NameFallback {
        NameFallback::Disabled
    }
}

/// IPv4 addresses linked to the node or guest interface carrying them
#[derive(Debug, Clone)]
pub struct IpAssignmentProfile {
    script_name: String,
}

impl IpAssignmentProfile {
    pub fn new(script_name: impl Into<String>) -> Self {
        Self {
            script_name: script_name.into(),
        }
    }
}

impl KindProfile for IpAssignmentProfile {
    type Record = IpAssignmentRecord;

    fn kind(&self) -> EntityKind {
        EntityKind::IpAddress
    }

    fn field_rules(&self, record: &IpAssignmentRecord) -> Vec<FieldRule> {
        vec![
            FieldRule::set(FieldTarget::Name, record.address.as_str()),
            FieldRule::set(
                FieldTarget::field("assigned_object_type"),
                record.interface_kind.as_str(),
            ),
            FieldRule::lookup(
                FieldTarget::field("assigned_object"),
                record.interface_kind,
                record.interface_external_id.as_str(),
            ),
            FieldRule::set(FieldTarget::field("status"), STATUS_ACTIVE).create_only(),
            FieldRule::set(FieldTarget::field("description"), created_by(&self.script_name))
                .create_only(),
        ]
    }

    fn retire_policy(&self) -> RetirePolicy {
        RetirePolicy::Keep
    }

    /// Addresses are shared with other sources; pass 1 never touches them.
    fn owns(&self, _entity: &RegistryEntity) -> bool {
        false
    }

    fn name_fallback(&self) -> NameFallback {
        NameFallback::Disabled
    }

    fn adopts_untracked(&self) -> bool {
        true
    }
}

/// Records that may designate a primary IPv4 address
pub trait PrimaryIp: Observation {
    fn primary_ip(&self) -> Option<&str>;

    /// Several candidate addresses and none selected upstream
    fn primary_ambiguous(&self) -> bool {
        false
    }
}

impl PrimaryIp for DeviceRecord {
    fn primary_ip(&self) -> Option<&str> {
        self.primary_ip.as_deref()
    }
}

impl PrimaryIp for VmRecord {
    fn primary_ip(&self) -> Option<&str> {
        self.primary_ip.as_deref()
    }

    fn primary_ambiguous(&self) -> bool {
        self.ambiguous_primary
    }
}

/// Primary address of nodes and guests
///
/// Runs after the address links exist. Only updates entities created by the
/// device or guest sweep and never clears a primary address.
#[derive(Debug, Clone)]
pub struct PrimaryIpProfile<R> {
    kind: EntityKind,
    _record: PhantomData<R>,
}

impl PrimaryIpProfile<DeviceRecord> {
    pub fn devices() -> Self {
        Self {
            kind: EntityKind::Device,
            _record: PhantomData,
        }
    }
}

impl PrimaryIpProfile<VmRecord> {
    pub fn guests() -> Self {
        Self {
            kind: EntityKind::VirtualMachine,
            _record: PhantomData,
        }
    }
}

impl<R: PrimaryIp> KindProfile for PrimaryIpProfile<R> {
    type Record = R;

    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn field_rules(&self, record: &R) -> Vec<FieldRule> {
        let rule = match record.primary_ip() {
            Some(ip) => FieldRule::lookup(FieldTarget::field(FIELD_PRIMARY_IP4), EntityKind::IpAddress, ip),
            None => FieldRule::set(FieldTarget::field(FIELD_PRIMARY_IP4), FieldValue::Null),
        };
        vec![rule.preserve()]
    }

    fn retire_policy(&self) -> RetirePolicy {
        RetirePolicy::Keep
    }

    fn owns(&self, _entity: &RegistryEntity) -> bool {
        false
    }

    fn creates_missing(&self) -> bool {
        false
    }

    fn advisories(&self, record: &R, existing: Option<&RegistryEntity>) -> Vec<String> {
        match existing {
            Some(entity) if record.primary_ambiguous() && entity.field(FIELD_PRIMARY_IP4).is_null() => {
                vec![format!(
                    "{} has several addresses, choose the primary address manually",
                    entity.label()
                )]
            }
            _ => Vec::new(),
        }
    }
}
