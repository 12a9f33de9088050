use netrecon_core::model::{
    ContactRecord, EntityDraft, EntityId, EntityKind, GroupRecord, RegistryEntity,
};
use netrecon_core::{InMemoryRegistry, RegistryStore};

/// Create a new empty registry for testing
#[allow(dead_code)]
pub fn new_store() -> InMemoryRegistry {
    InMemoryRegistry::new()
}

/// Directory department observation
#[allow(dead_code)]
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
#[allow(dead_code)]
pub fn contact(id: &str, name: &str, group_id: &str) -> ContactRecord {
    ContactRecord {
        id: id.to_string(),
        name: name.to_string(),
        title: String::new(),
        group_id: Some(group_id.to_string()),
        phone: String::new(),
        room: String::new(),
    }
}

/// Tracked registry entity not yet stored anywhere
#[allow(dead_code)]
pub fn tracked(id: i64, kind: EntityKind, tag: &str, name: &str) -> RegistryEntity {
    RegistryEntity::from_draft(EntityId(id), EntityDraft::new(kind, name).with_tag(tag))
}

/// Create a tracked contact group in the store and return it
#[allow(dead_code)]
pub fn create_group(store: &mut InMemoryRegistry, tag: &str, name: &str) -> RegistryEntity {
    store
        .create(EntityDraft::new(EntityKind::ContactGroup, name).with_tag(tag))
        .unwrap()
}
