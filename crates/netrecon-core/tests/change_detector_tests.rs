#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{create_group, group, new_store};
use netrecon_core::diff::{diff, render_change_summary, FieldRule, FieldTarget};
use netrecon_core::kinds::ContactGroupProfile;
use netrecon_core::model::{EntityDraft, EntityKind, FieldValue};
use netrecon_core::{KindProfile, RegistryStore};

#[test]
fn test_rename_and_reparent_has_two_entries() {
    let mut store = new_store();
    let root = create_group(&mut store, "0", "Root");
    let new_parent = create_group(&mut store, "900", "Dept B");
    let entity = store
        .create(
            EntityDraft::new(EntityKind::ContactGroup, "Dept A")
                .with_tag("831")
                .with_parent(root.id)
                .with_field("slug", "grp831")
                .with_field("description", ""),
        )
        .unwrap();

    let record = group("831", "Dept A2", Some("900"));
    let rules = ContactGroupProfile.field_rules(&record);
    let changes = diff(Some(&entity), &record, &rules, &store).unwrap();

    assert_eq!(changes.len(), 2);
    let name = changes.get(&FieldTarget::Name).unwrap();
    assert_eq!(name.new, FieldValue::text("Dept A2"));
    let parent = changes.get(&FieldTarget::Parent).unwrap();
    assert_eq!(parent.old, FieldValue::Ref(root.id));
    assert_eq!(parent.new, FieldValue::Ref(new_parent.id));
    assert_eq!(
        render_change_summary(&changes),
        format!("name: 'Dept A' -> 'Dept A2', parent: {} -> {}", root.id, new_parent.id)
    );
}

#[test]
fn test_unchanged_entity_yields_empty_change_set() {
    let mut store = new_store();
    let record = group("831", "Dept A", None);
    let rules = ContactGroupProfile.field_rules(&record);
    let created = diff(None, &record, &rules, &store).unwrap();
    let entity = store.create(created.to_draft(EntityKind::ContactGroup)).unwrap();

    let again = diff(Some(&entity), &record, &rules, &store).unwrap();
    assert!(again.is_empty(), "unexpected changes: {:?}", again);
}

#[test]
fn test_name_relink_reports_tag_first() {
    let mut store = new_store();
    let entity = create_group(&mut store, "831", "Dept A");
    let record = group("832", "Dept A", None);
    let rules = vec![FieldRule::set(FieldTarget::Name, "Dept A")];

    let changes = diff(Some(&entity), &record, &rules, &store).unwrap();

    assert_eq!(changes.len(), 1);
    assert_eq!(changes.changes[0].target, FieldTarget::Tag);
    assert_eq!(changes.changes[0].old, FieldValue::text("831"));
    assert_eq!(changes.changes[0].new, FieldValue::text("832"));
}

#[test]
fn test_preserve_policy_never_clears() {
    let mut store = new_store();
    let entity = store
        .create(
            EntityDraft::new(EntityKind::VmInterface, "net0")
                .with_tag("pve/101/aa")
                .with_field("mtu", 9000),
        )
        .unwrap();
    let record = group("pve/101/aa", "net0", None);

    let preserve = vec![FieldRule::set(FieldTarget::field("mtu"), FieldValue::Null).preserve()];
    assert!(diff(Some(&entity), &record, &preserve, &store).unwrap().is_empty());

    let always = vec![FieldRule::set(FieldTarget::field("mtu"), FieldValue::Null)];
    let changes = diff(Some(&entity), &record, &always, &store).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes.changes[0].old, FieldValue::Int(9000));
    assert!(changes.changes[0].new.is_null());
}

#[test]
fn test_create_only_ignored_on_update() {
    let mut store = new_store();
    let entity = store
        .create(
            EntityDraft::new(EntityKind::IpAddress, "10.0.0.5/24")
                .with_tag("10.0.0.5/24")
                .with_field("description", "edited by hand"),
        )
        .unwrap();
    let record = group("10.0.0.5/24", "10.0.0.5/24", None);
    let rules = vec![
        FieldRule::set(FieldTarget::field("description"), "Automatically added by script x")
            .create_only(),
    ];

    assert!(diff(Some(&entity), &record, &rules, &store).unwrap().is_empty());
    let created = diff(None, &record, &rules, &store).unwrap();
    assert_eq!(created.len(), 2);
}

#[test]
fn test_unresolvable_parent_is_null() {
    let store = new_store();
    let record = group("831", "Dept A", Some("404"));
    let rules = ContactGroupProfile.field_rules(&record);

    let changes = diff(None, &record, &rules, &store).unwrap();
    assert!(changes.get(&FieldTarget::Parent).is_none());
    let draft = changes.to_draft(EntityKind::ContactGroup);
    assert_eq!(draft.parent, None);
    assert_eq!(draft.external_id_tag.as_deref(), Some("831"));
    assert_eq!(draft.fields.get("slug"), Some(&FieldValue::text("grp831")));
}
