//! Proxmox cluster snapshot: the cluster, its nodes with their network
//! interfaces, and the LXC and QEMU guests of every node with their
//! configuration maps and optional guest-agent network info.
//!
//! External ids are scoped by the cluster name: `pve/node1`,
//! `pve/node1/vmbr0`, `pve/101`, `pve/101/bc:24:11:2e:51:0a`.

#![allow(clippy::result_large_err)]

use std::collections::{BTreeMap, BTreeSet};

use netrecon_core::errors::ExError;
use netrecon_core::kinds::proxmox::CLUSTER_TYPE;
use netrecon_core::model::{
    scoped_key, ClusterRecord, DeviceRecord, EntityKind, InterfaceRecord, IpAssignmentRecord,
    VmInterfaceRecord, VmRecord, VmType,
};
use netrecon_core::normalize::{calc_disks, parse_net_config};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::Snapshot;
use crate::prerequisites::ROLE_PVE;

pub const IFACE_TYPE_ETHERNET: &str = "1000base-t";
pub const IFACE_TYPE_BRIDGE: &str = "bridge";
pub const IFACE_TYPE_VIRTUAL: &str = "virtual";

const GIB: i64 = 1024 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct Payload {
    cluster: Cluster,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct Cluster {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    site: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Node {
    node: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default, deserialize_with = "opt_int")]
    maxcpu: Option<i64>,
    #[serde(default, deserialize_with = "opt_int")]
    maxmem: Option<i64>,
    /// Management address with mask
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    network: Vec<NodeIface>,
    #[serde(default)]
    lxc: Vec<Guest>,
    #[serde(default)]
    qemu: Vec<Guest>,
}

#[derive(Debug, Deserialize)]
struct NodeIface {
    iface: String,
    #[serde(rename = "type", default)]
    iface_type: String,
    #[serde(default, deserialize_with = "flag")]
    active: bool,
    #[serde(default, deserialize_with = "opt_int")]
    mtu: Option<i64>,
    #[serde(default)]
    mac: Option<String>,
    #[serde(default)]
    bridge_ports: Option<String>,
    #[serde(default)]
    cidr: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Guest {
    #[serde(deserialize_with = "int")]
    vmid: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default, deserialize_with = "opt_int")]
    cpus: Option<i64>,
    #[serde(default)]
    config: BTreeMap<String, Value>,
    #[serde(default)]
    agent_network: Option<AgentNetwork>,
}

/// `network-get-interfaces` answer of the QEMU guest agent
#[derive(Debug, Deserialize)]
struct AgentNetwork {
    #[serde(default)]
    result: Vec<AgentIface>,
}

#[derive(Debug, Deserialize)]
struct AgentIface {
    name: String,
    #[serde(rename = "hardware-address", default)]
    hardware_address: String,
    #[serde(rename = "ip-addresses", default)]
    ip_addresses: Vec<AgentAddress>,
}

#[derive(Debug, Deserialize)]
struct AgentAddress {
    #[serde(rename = "ip-address-type")]
    address_type: String,
    #[serde(rename = "ip-address")]
    address: String,
    prefix: u8,
}

fn int_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn opt_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.as_ref().and_then(int_of))
}

fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    int_of(&value).ok_or_else(|| serde::de::Error::custom(format!("expected an integer, got {}", value)))
}

/// `1`, `true` and `"1"` all mean set
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(other) => int_of(&other).is_some_and(|i| i != 0),
        None => false,
    })
}

fn config_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Records of one cluster snapshot, in the order they are reconciled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxmoxInventory {
    pub cluster: ClusterRecord,
    pub devices: Vec<DeviceRecord>,
    /// Bridges of each node come before its other interfaces
    pub interfaces: Vec<InterfaceRecord>,
    pub vms: Vec<VmRecord>,
    pub vm_interfaces: Vec<VmInterfaceRecord>,
    pub assignments: Vec<IpAssignmentRecord>,
}

impl ProxmoxInventory {
    pub fn cluster_name(&self) -> &str {
        &self.cluster.name
    }

    /// # Errors
    ///
    /// `InvalidInput` when the payload has the wrong shape, the cluster has
    /// no name, or a node name or guest id occurs twice.
    pub fn parse(snapshot: &Snapshot) -> Result<Self, ExError> {
        let payload: Payload = snapshot.decode()?;
        let cluster = payload.cluster.name.trim().to_string();
        if cluster.is_empty() {
            return Err(snapshot.invalid("cluster has no name"));
        }

        let mut inventory = ProxmoxInventory {
            cluster: ClusterRecord {
                name: cluster.clone(),
                cluster_type: CLUSTER_TYPE.to_string(),
                site: payload.cluster.site.filter(|s| !s.is_empty()),
                description: payload.cluster.description.filter(|s| !s.is_empty()),
            },
            devices: Vec::new(),
            interfaces: Vec::new(),
            vms: Vec::new(),
            vm_interfaces: Vec::new(),
            assignments: Vec::new(),
        };
        let mut nodes_seen = BTreeSet::new();
        let mut vmids_seen = BTreeSet::new();
        let mut addresses = AddressBook::default();

        for node in payload.nodes {
            if !nodes_seen.insert(node.node.clone()) {
                return Err(snapshot.invalid(format!("duplicate node {}", node.node)));
            }
            let device_id = scoped_key(&[cluster.as_str(), node.node.as_str()]);
            let online = node.status == "online";
            inventory.devices.push(DeviceRecord {
                external_id: device_id.clone(),
                cluster: cluster.clone(),
                name: node.node.clone(),
                role: node.role.clone().unwrap_or_else(|| ROLE_PVE.to_string()),
                online,
                version: node.version.clone().or_else(|| payload.version.clone()),
                cpus: node.maxcpu,
                memory_gib: node.maxmem.map(|bytes| bytes / GIB),
                primary_ip: node.address.clone().filter(|a| !a.is_empty()),
            });

            for iface in node_interfaces(&device_id, &node.network) {
                for address in &iface.addresses {
                    addresses.link(address, EntityKind::Interface, &iface.external_id);
                }
                inventory.interfaces.push(iface);
            }

            let guests = node
                .lxc
                .iter()
                .map(|g| (VmType::Lxc, g))
                .chain(node.qemu.iter().map(|g| (VmType::Qemu, g)));
            for (vm_type, guest) in guests {
                if !vmids_seen.insert(guest.vmid) {
                    return Err(snapshot.invalid(format!("duplicate guest id {}", guest.vmid)));
                }
                let (mut vm, ifaces) = guest_records(&cluster, vm_type, guest);
                let mut guest_ips = BTreeSet::new();
                for iface in &ifaces {
                    for address in &iface.addresses {
                        guest_ips.insert(address.clone());
                        addresses.link(address, EntityKind::VmInterface, &iface.external_id);
                    }
                }
                if guest_ips.len() == 1 {
                    vm.primary_ip = guest_ips.into_iter().next();
                } else {
                    vm.ambiguous_primary = guest_ips.len() > 1;
                }
                inventory.vms.push(vm);
                inventory.vm_interfaces.extend(ifaces);
            }
        }
        inventory.assignments = addresses.into_records();

        tracing::debug!(
            component = module_path!(),
            cluster = %inventory.cluster.name,
            nodes = inventory.devices.len(),
            interfaces = inventory.interfaces.len(),
            guests = inventory.vms.len(),
            guest_interfaces = inventory.vm_interfaces.len(),
            addresses = inventory.assignments.len(),
            "proxmox snapshot parsed"
        );
        Ok(inventory)
    }
}

/// Address links in first-seen order; an address claimed twice keeps its
/// first interface
#[derive(Default)]
struct AddressBook {
    records: Vec<IpAssignmentRecord>,
    seen: BTreeSet<String>,
}

impl AddressBook {
    fn link(&mut self, address: &str, kind: EntityKind, iface: &str) {
        if !self.seen.insert(address.to_string()) {
            tracing::warn!(
                component = module_path!(),
                address,
                interface = iface,
                "address already linked to another interface, skipped"
            );
            return;
        }
        self.records.push(IpAssignmentRecord {
            address: address.to_string(),
            interface_kind: kind,
            interface_external_id: iface.to_string(),
        });
    }

    fn into_records(self) -> Vec<IpAssignmentRecord> {
        self.records
    }
}

/// Interfaces of one node, bridges first so that ports can reference them
fn node_interfaces(device_id: &str, network: &[NodeIface]) -> Vec<InterfaceRecord> {
    let mut bridge_of: BTreeMap<&str, String> = BTreeMap::new();
    for iface in network.iter().filter(|i| i.iface_type == "bridge") {
        let bridge_id = scoped_key(&[device_id, iface.iface.as_str()]);
        for port in iface.bridge_ports.as_deref().unwrap_or("").split_whitespace() {
            bridge_of.insert(port, bridge_id.clone());
        }
    }

    let mut ordered: Vec<&NodeIface> = network.iter().collect();
    ordered.sort_by_key(|i| i.iface_type != "bridge");

    ordered
        .into_iter()
        .map(|iface| {
            let iface_type = match iface.iface_type.as_str() {
                "eth" => IFACE_TYPE_ETHERNET,
                "bridge" => IFACE_TYPE_BRIDGE,
                other => {
                    tracing::warn!(
                        component = module_path!(),
                        device = device_id,
                        interface = %iface.iface,
                        iface_type = other,
                        "unknown interface type, recorded as virtual"
                    );
                    IFACE_TYPE_VIRTUAL
                }
            };
            InterfaceRecord {
                external_id: scoped_key(&[device_id, iface.iface.as_str()]),
                device_external_id: device_id.to_string(),
                name: iface.iface.clone(),
                iface_type: iface_type.to_string(),
                mac: iface.mac.clone().filter(|m| !m.is_empty()),
                mtu: iface.mtu,
                enabled: iface.active,
                bridge: bridge_of.get(iface.iface.as_str()).cloned(),
                addresses: iface.cidr.iter().filter(|c| !c.is_empty()).cloned().collect(),
            }
        })
        .collect()
}

/// IPv4 addresses the guest agent reports for `mac`, with their prefix
fn agent_addresses(agent: Option<&AgentNetwork>, mac: &str) -> Option<(String, Vec<String>)> {
    let found = agent?
        .result
        .iter()
        .find(|i| i.hardware_address.eq_ignore_ascii_case(mac))?;
    let ips = found
        .ip_addresses
        .iter()
        .filter(|a| a.address_type == "ipv4")
        .map(|a| format!("{}/{}", a.address, a.prefix))
        .collect();
    Some((found.name.clone(), ips))
}

/// A guest and its network devices `net0`, `net1`, ... up to the first gap
fn guest_records(cluster: &str, vm_type: VmType, guest: &Guest) -> (VmRecord, Vec<VmInterfaceRecord>) {
    let vmid = guest.vmid.to_string();
    let vm_id = scoped_key(&[cluster, vmid.as_str()]);
    let config: BTreeMap<String, String> = guest
        .config
        .iter()
        .map(|(k, v)| (k.clone(), config_text(v)))
        .collect();

    let disk_mb = match calc_disks(&config) {
        Ok(total) => Some(total),
        Err(err) => {
            tracing::warn!(
                component = module_path!(),
                vm = %vm_id,
                error = %err,
                "disk size unknown"
            );
            None
        }
    };
    let running = guest.status == "running";
    let vm = VmRecord {
        external_id: vm_id.clone(),
        cluster: cluster.to_string(),
        vmid: guest.vmid,
        name: guest.name.clone(),
        vm_type,
        running,
        vcpus: guest.cpus,
        memory_mb: guest.config.get("memory").and_then(int_of),
        disk_mb,
        os_type: config.get("ostype").cloned(),
        primary_ip: None,
        ambiguous_primary: false,
    };

    // The agent only answers for running guests.
    let agent = if running { guest.agent_network.as_ref() } else { None };
    let mut ifaces = Vec::new();
    let mut index = 0;
    while let Some(conf) = config.get(&format!("net{}", index)) {
        let device = format!("net{}", index);
        index += 1;
        let net = match parse_net_config(conf) {
            Ok(net) => net,
            Err(err) => {
                tracing::warn!(
                    component = module_path!(),
                    vm = %vm_id,
                    device = %device,
                    error = %err,
                    "network device skipped"
                );
                continue;
            }
        };
        let from_agent = net.mac.as_deref().and_then(|mac| agent_addresses(agent, mac));
        let name = net
            .name
            .clone()
            .or_else(|| from_agent.as_ref().map(|(name, _)| name.clone()))
            .unwrap_or_else(|| device.clone());
        let addresses = match (&net.ip, from_agent) {
            (Some(ip), _) => vec![ip.clone()],
            (None, Some((_, ips))) => ips,
            (None, None) => Vec::new(),
        };
        let key = net
            .mac
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| device.clone());
        ifaces.push(VmInterfaceRecord {
            external_id: scoped_key(&[vm_id.as_str(), key.as_str()]),
            vm_external_id: vm_id.clone(),
            name,
            mac: net.mac,
            mtu: net.mtu,
            enabled: net.enabled,
            bridge: net.bridge,
            addresses,
        });
    }
    (vm, ifaces)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "cluster": {"name": "pve", "description": "lab cluster"},
        "version": "8.1.4",
        "nodes": [
            {
                "node": "n1", "status": "online", "maxcpu": 16, "maxmem": 68719476736,
                "address": "10.0.0.11/24",
                "network": [
                    {"iface": "eno1", "type": "eth", "active": 1, "mtu": 1500},
                    {"iface": "vmbr0", "type": "bridge", "active": 1, "bridge_ports": "eno1", "cidr": "10.0.0.11/24"}
                ],
                "lxc": [
                    {"vmid": 101, "name": "ct1", "status": "running", "cpus": 2,
                     "config": {"ostype": "debian", "memory": 512, "rootfs": "local:vm-101-disk-0,size=8G",
                                "net0": "name=eth0,bridge=vmbr0,hwaddr=BC:24:11:00:00:01,ip=10.0.0.50/24,type=veth"}}
                ],
                "qemu": [
                    {"vmid": "102", "name": "vm1", "status": "running", "cpus": 4,
                     "config": {"ostype": "l26", "memory": "2048", "scsi0": "local:vm-102-disk-0,size=32G",
                                "ide2": "none,media=cdrom", "agent": "1",
                                "net0": "virtio=BC:24:11:00:00:02,bridge=vmbr0",
                                "net1": "virtio=BC:24:11:00:00:03,bridge=vmbr1,link_down=1"},
                     "agent_network": {"result": [
                        {"name": "ens18", "hardware-address": "bc:24:11:00:00:02",
                         "ip-addresses": [
                            {"ip-address-type": "ipv4", "ip-address": "10.0.0.60", "prefix": 24},
                            {"ip-address-type": "ipv6", "ip-address": "fe80::1", "prefix": 64}
                         ]},
                        {"name": "ens19", "hardware-address": "bc:24:11:00:00:03",
                         "ip-addresses": [{"ip-address-type": "ipv4", "ip-address": "192.168.5.2", "prefix": 24}]}
                     ]}}
                ]
            },
            {"node": "n2", "status": "offline"}
        ]
    }"#;

    fn inventory() -> ProxmoxInventory {
        let snap = Snapshot::from_bytes("proxmox", SNAPSHOT.as_bytes()).unwrap();
        ProxmoxInventory::parse(&snap).unwrap()
    }

    #[test]
    fn test_nodes_become_devices() {
        let inv = inventory();
        assert_eq!(inv.cluster.name, "pve");
        assert_eq!(inv.devices.len(), 2);

        let n1 = &inv.devices[0];
        assert_eq!(n1.external_id, "pve/n1");
        assert_eq!(n1.role, "PVE");
        assert_eq!(n1.memory_gib, Some(64));
        assert_eq!(n1.version.as_deref(), Some("8.1.4"));
        assert_eq!(n1.primary_ip.as_deref(), Some("10.0.0.11/24"));
        assert!(!inv.devices[1].online);
    }

    #[test]
    fn test_bridges_come_first_and_ports_point_at_them() {
        let inv = inventory();
        assert_eq!(inv.interfaces[0].name, "vmbr0");
        assert_eq!(inv.interfaces[0].iface_type, IFACE_TYPE_BRIDGE);
        assert_eq!(inv.interfaces[1].bridge.as_deref(), Some("pve/n1/vmbr0"));
        assert_eq!(inv.interfaces[1].iface_type, IFACE_TYPE_ETHERNET);
    }

    #[test]
    fn test_guests_sizes_and_addresses() {
        let inv = inventory();
        let ct = &inv.vms[0];
        assert_eq!(ct.vm_type, VmType::Lxc);
        assert_eq!(ct.disk_mb, Some(8_000));
        assert_eq!(ct.memory_mb, Some(512));
        assert_eq!(ct.primary_ip.as_deref(), Some("10.0.0.50/24"));

        let vm = &inv.vms[1];
        assert_eq!(vm.vmid, 102);
        assert_eq!(vm.disk_mb, Some(32_000));
        assert_eq!(vm.primary_ip, None);
        assert!(vm.ambiguous_primary);
    }

    #[test]
    fn test_guest_interfaces_use_agent_names() {
        let inv = inventory();
        let names: Vec<&str> = inv.vm_interfaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["eth0", "ens18", "ens19"]);
        assert_eq!(inv.vm_interfaces[1].external_id, "pve/102/bc:24:11:00:00:02");
        assert_eq!(inv.vm_interfaces[1].addresses, vec!["10.0.0.60/24"]);
        assert!(!inv.vm_interfaces[2].enabled);
    }

    #[test]
    fn test_assignments_cover_node_and_guest_addresses() {
        let inv = inventory();
        let links: Vec<(&str, EntityKind)> = inv
            .assignments
            .iter()
            .map(|a| (a.address.as_str(), a.interface_kind))
            .collect();
        assert_eq!(
            links,
            vec![
                ("10.0.0.11/24", EntityKind::Interface),
                ("10.0.0.50/24", EntityKind::VmInterface),
                ("10.0.0.60/24", EntityKind::VmInterface),
                ("192.168.5.2/24", EntityKind::VmInterface),
            ]
        );
    }

    #[test]
    fn test_duplicate_vmid_rejected() {
        let snap = Snapshot::from_bytes(
            "proxmox",
            br#"{"cluster": {"name": "pve"}, "nodes": [
                {"node": "a", "status": "online", "lxc": [{"vmid": 1, "name": "x"}]},
                {"node": "b", "status": "online", "qemu": [{"vmid": 1, "name": "y"}]}
            ]}"#,
        )
        .unwrap();
        assert!(ProxmoxInventory::parse(&snap).is_err());
    }
}
