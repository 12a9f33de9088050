#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{create_group, new_store};
use netrecon_core::errors::ExErrorKind;
use netrecon_core::model::{EntityDraft, EntityId, EntityKind, FieldValue};
use netrecon_core::rules::validation::MAX_NAME_LEN;
use netrecon_core::RegistryStore;

// ===== CREATE =====

#[test]
fn test_create_with_unknown_parent_is_rejected() {
    // Given an empty registry
    let mut store = new_store();

    // When a group is created under a parent that does not exist
    let err = store
        .create(EntityDraft::new(EntityKind::ContactGroup, "Orphan").with_parent(EntityId(404)))
        .unwrap_err();

    // Then the write is refused and nothing is stored
    assert_eq!(err.kind(), ExErrorKind::ValidationFailed);
    assert_eq!(err.op(), Some("create"));
    assert!(store.is_empty());
}

#[test]
fn test_create_with_empty_tag_is_rejected() {
    let mut store = new_store();

    let err = store
        .create(EntityDraft::new(EntityKind::Contact, "Jane Doe").with_tag(""))
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::ValidationFailed);
}

#[test]
fn test_control_characters_in_name_are_rejected() {
    let mut store = new_store();

    let err = store
        .create(EntityDraft::new(EntityKind::Contact, "Jane\u{0}Doe"))
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::ValidationFailed);
}

#[test]
fn test_name_at_the_limit_is_accepted() {
    let mut store = new_store();

    let created = store
        .create(EntityDraft::new(EntityKind::Contact, "ж".repeat(MAX_NAME_LEN)))
        .unwrap();

    assert_eq!(created.name.chars().count(), MAX_NAME_LEN);
}

#[test]
fn test_ip_address_may_have_empty_name() {
    let mut store = new_store();

    let created = store
        .create(EntityDraft::new(EntityKind::IpAddress, "").with_tag("10.0.0.5/24"))
        .unwrap();

    assert_eq!(created.tag(), Some("10.0.0.5/24"));
}

// ===== UPDATE =====

#[test]
fn test_update_cannot_change_kind() {
    let mut store = new_store();
    let group = create_group(&mut store, "1", "Administration");

    let mut changed = group.clone();
    changed.kind = EntityKind::Contact;
    let err = store.update(&changed).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::ValidationFailed);
    assert_eq!(store.get(group.id).unwrap().kind, EntityKind::ContactGroup);
}

#[test]
fn test_relink_onto_taken_tag_is_duplicate() {
    // Given two tracked groups
    let mut store = new_store();
    create_group(&mut store, "1", "Administration");
    let other = create_group(&mut store, "2", "IT");

    // When the second is relinked to the first one's tag
    let mut relinked = other.clone();
    relinked.external_id_tag = Some("1".to_string());
    let err = store.update(&relinked).unwrap_err();

    // Then the store refuses and keeps the old tag
    assert_eq!(err.kind(), ExErrorKind::DuplicateTag);
    assert_eq!(err.external_id(), Some("1"));
    assert_eq!(store.get(other.id).unwrap().tag(), Some("2"));
}

#[test]
fn test_update_with_dangling_reference_field_is_rejected() {
    let mut store = new_store();
    let iface = store
        .create(EntityDraft::new(EntityKind::Interface, "eno1").with_tag("pve/n1/eno1"))
        .unwrap();

    let mut changed = iface.clone();
    changed
        .fields
        .insert("bridge".to_string(), FieldValue::Ref(EntityId(999)));
    let err = store.update(&changed).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::ValidationFailed);
    assert!(store.get(iface.id).unwrap().field("bridge").is_null());
}

#[test]
fn test_update_of_missing_entity_is_not_found() {
    let mut store = new_store();
    let group = create_group(&mut store, "1", "Administration");
    store.delete(group.id).unwrap();

    let err = store.update(&group).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::NotFound);
}
