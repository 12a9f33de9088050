#![allow(dead_code)]

use netrecon_core::errors::{ExError, ExErrorKind};
use netrecon_core::model::{
    ContactRecord, EntityDraft, EntityId, EntityKind, GroupRecord, RegistryEntity,
};
use netrecon_core::{InMemoryRegistry, RegistryStore};

/// Directory department observation
pub fn group(id: &str, name: &str, parent: Option<&str>) -> GroupRecord {
    GroupRecord {
        id: id.to_string(),
        name: name.to_string(),
        parent_id: parent.map(str::to_string),
        address: String::new(),
        mail: String::new(),
    }
}

/// Directory person observation
pub fn contact(id: &str, name: &str, group_id: &str, phone: &str) -> ContactRecord {
    ContactRecord {
        id: id.to_string(),
        name: name.to_string(),
        title: String::new(),
        group_id: Some(group_id.to_string()),
        phone: phone.to_string(),
        room: String::new(),
    }
}

/// Create a tracked contact group and return it
pub fn create_group(
    store: &mut InMemoryRegistry,
    tag: &str,
    name: &str,
    parent: Option<EntityId>,
) -> RegistryEntity {
    let mut draft = EntityDraft::new(EntityKind::ContactGroup, name).with_tag(tag);
    if let Some(parent) = parent {
        draft = draft.with_parent(parent);
    }
    store.create(draft).unwrap()
}

/// Every entity of the store, ordered by id
pub fn dump(store: &InMemoryRegistry) -> Vec<RegistryEntity> {
    store.entities().cloned().collect()
}

/// Store whose updates fail for one tag, as a broken row would
pub struct FailingStore {
    pub inner: InMemoryRegistry,
    pub failing_tag: String,
}

impl FailingStore {
    pub fn new(inner: InMemoryRegistry, failing_tag: &str) -> Self {
        Self {
            inner,
            failing_tag: failing_tag.to_string(),
        }
    }
}

impl RegistryStore for FailingStore {
    fn find_by_tag(&self, kind: EntityKind, tag: &str) -> Result<Option<RegistryEntity>, ExError> {
        self.inner.find_by_tag(kind, tag)
    }

    fn find_all_of_kind(&self, kind: EntityKind) -> Result<Vec<RegistryEntity>, ExError> {
        self.inner.find_all_of_kind(kind)
    }

    fn find_by_name(&self, kind: EntityKind, name: &str) -> Result<Vec<RegistryEntity>, ExError> {
        self.inner.find_by_name(kind, name)
    }

    fn get(&self, id: EntityId) -> Result<RegistryEntity, ExError> {
        self.inner.get(id)
    }

    fn create(&mut self, draft: EntityDraft) -> Result<RegistryEntity, ExError> {
        self.inner.create(draft)
    }

    fn update(&mut self, entity: &RegistryEntity) -> Result<(), ExError> {
        if entity.tag() == Some(self.failing_tag.as_str()) {
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_op("update")
                .with_entity_id(entity.id.to_string())
                .with_message("disk I/O error"));
        }
        self.inner.update(entity)
    }

    fn delete(&mut self, id: EntityId) -> Result<(), ExError> {
        self.inner.delete(id)
    }
}

/// Store that keeps a copy of every entity passed to `update`
pub struct RecordingStore {
    pub inner: InMemoryRegistry,
    pub updates: Vec<RegistryEntity>,
}

impl RecordingStore {
    pub fn new(inner: InMemoryRegistry) -> Self {
        Self {
            inner,
            updates: Vec::new(),
        }
    }
}

impl RegistryStore for RecordingStore {
    fn find_by_tag(&self, kind: EntityKind, tag: &str) -> Result<Option<RegistryEntity>, ExError> {
        self.inner.find_by_tag(kind, tag)
    }

    fn find_all_of_kind(&self, kind: EntityKind) -> Result<Vec<RegistryEntity>, ExError> {
        self.inner.find_all_of_kind(kind)
    }

    fn find_by_name(&self, kind: EntityKind, name: &str) -> Result<Vec<RegistryEntity>, ExError> {
        self.inner.find_by_name(kind, name)
    }

    fn get(&self, id: EntityId) -> Result<RegistryEntity, ExError> {
        self.inner.get(id)
    }

    fn create(&mut self, draft: EntityDraft) -> Result<RegistryEntity, ExError> {
        self.inner.create(draft)
    }

    fn update(&mut self, entity: &RegistryEntity) -> Result<(), ExError> {
        self.updates.push(entity.clone());
        self.inner.update(entity)
    }

    fn delete(&mut self, id: EntityId) -> Result<(), ExError> {
        self.inner.delete(id)
    }
}

pub const DIRECTORY: &str = r#"{
    "str": [
        {"str_id": "1", "str_name": "Administration", "str_parent": "0", "adres": "Main sq. 1", "mail": "admin@corp"},
        {"str_id": "2", "str_name": "IT Department", "str_parent": "1", "adres": "Main sq. 1", "mail": ""}
    ],
    "ppl": [
        {"str_id": "2", "ppl_id": "10", "ppl_fio": "Jane Doe", "dlg_name": "Head of IT", "ppl_tel": "+7 (486) 255-01-01", "ppl_cab": "407"},
        {"str_id": "2", "ppl_id": "11", "ppl_fio": "John Roe", "dlg_name": "Engineer", "ppl_tel": ":598332", "ppl_cab": "408"},
        {"str_id": "2", "ppl_id": "12", "ppl_fio": "", "dlg_name": "Engineer", "ppl_tel": "", "ppl_cab": ""}
    ]
}"#;

pub const IP_SCAN: &str = r#"{
    "subnets": [
        {"prefix": "10.0.0.0/24", "status": "active", "tags": ["scan"],
         "hosts": [{"address": "10.0.0.5", "hostname": "WEB01.corp"}, {"address": "10.0.0.6", "hostname": ""}]},
        {"prefix": "10.0.1.0/24", "status": "active", "tags": ["scan"],
         "hosts": [{"address": "10.0.1.7", "hostname": "db01.corp"}]},
        {"prefix": "10.0.9.0/24", "status": "deprecated", "tags": ["scan"],
         "hosts": [{"address": "10.0.9.1"}]}
    ]
}"#;

pub const PROXMOX: &str = r#"{
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
                            "net0": "name=eth0,bridge=vmbr0,hwaddr=BC:24:11:00:00:01,ip=10.0.0.50/24"}}
            ],
            "qemu": [
                {"vmid": 102, "name": "vm1", "status": "running", "cpus": 4,
                 "config": {"ostype": "l26", "memory": "2048", "scsi0": "local:vm-102-disk-0,size=32G",
                            "net0": "virtio=BC:24:11:00:00:02,bridge=vmbr0",
                            "net1": "virtio=BC:24:11:00:00:03,bridge=vmbr1"},
                 "agent_network": {"result": [
                    {"name": "ens18", "hardware-address": "bc:24:11:00:00:02",
                     "ip-addresses": [{"ip-address-type": "ipv4", "ip-address": "10.0.0.60", "prefix": 24}]},
                    {"name": "ens19", "hardware-address": "bc:24:11:00:00:03",
                     "ip-addresses": [{"ip-address-type": "ipv4", "ip-address": "192.168.5.2", "prefix": 24}]}
                 ]}}
            ]
        },
        {"node": "n2", "status": "offline"}
    ]
}"#;
