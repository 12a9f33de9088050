// Two-pass sweep behaviour over the phone directory kinds:
// creation, rename and reparent, relink, deletion, ambiguity, failure isolation

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{contact, create_group, group, FailingStore, RecordingStore};
use netrecon_core::errors::ExErrorKind;
use netrecon_core::kinds::{ContactGroupProfile, ContactProfile};
use netrecon_core::model::{EntityDraft, EntityKind, FieldValue};
use netrecon_core::{InMemoryRegistry, RegistryStore};
use netrecon_engine::{Action, LogLevel, ReconConfig, ReconciliationEngine, RunMode};

fn commit(store: &mut InMemoryRegistry) -> ReconciliationEngine<'_, InMemoryRegistry> {
    ReconciliationEngine::new(store, ReconConfig::default(), RunMode::Commit)
}

#[test]
fn test_new_observations_are_created_with_parents() {
    // Given an empty registry
    let mut store = InMemoryRegistry::new();

    // When a root and a child department are reconciled
    let mut engine = commit(&mut store);
    let summary = engine
        .reconcile(
            &ContactGroupProfile,
            &[group("1", "Administration", None), group("2", "IT", Some("1"))],
        )
        .unwrap();
    let report = engine.finish();

    // Then both exist, tagged, and the child points at the root
    assert_eq!(summary.created, 2);
    assert_eq!(report.actions_at(LogLevel::Change).count(), 2);
    let root = store.find_by_tag(EntityKind::ContactGroup, "1").unwrap().unwrap();
    let child = store.find_by_tag(EntityKind::ContactGroup, "2").unwrap().unwrap();
    assert_eq!(child.parent, Some(root.id));
    assert_eq!(child.field("slug"), &FieldValue::text("grp2"));
}

#[test]
fn test_rename_and_reparent_is_one_update_with_two_changes() {
    // Given C under A, and B elsewhere
    let mut store = InMemoryRegistry::new();
    let a = create_group(&mut store, "1", "A", None);
    let b = create_group(&mut store, "2", "B", None);
    let c = create_group(&mut store, "3", "C", Some(a.id));
    for entity in [&a, &b, &c] {
        let mut e = store.get(entity.id).unwrap();
        let slug = format!("grp{}", e.tag().unwrap());
        e.fields.insert("slug".into(), FieldValue::text(slug));
        e.fields.insert("description".into(), FieldValue::text(""));
        store.update(&e).unwrap();
    }

    // When C is renamed and moved under B upstream
    let mut engine = commit(&mut store);
    let summary = engine
        .reconcile(
            &ContactGroupProfile,
            &[group("1", "A", None), group("2", "B", None), group("3", "C2", Some("2"))],
        )
        .unwrap();
    let report = engine.finish();

    // Then exactly one update carrying name and parent
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.unchanged, 2);
    let changes: Vec<_> = report.actions.iter().filter(|a| a.action == Action::Update).collect();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].entity, "3");
    assert_eq!(changes[0].message.matches(" -> ").count(), 2);

    let moved = store.get(c.id).unwrap();
    assert_eq!(moved.name, "C2");
    assert_eq!(moved.parent, Some(b.id));
}

#[test]
fn test_name_match_relinks_tag() {
    // Given a department whose upstream id changed
    let mut store = InMemoryRegistry::new();
    let old = create_group(&mut store, "831", "Dept A", None);

    // When the snapshot carries the same name under a new id
    let mut engine = commit(&mut store);
    let summary = engine
        .reconcile(&ContactGroupProfile, &[group("832", "Dept A", None)])
        .unwrap();
    let report = engine.finish();

    // Then the entity is relinked, not recreated
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.created, 0);
    assert_eq!(report.actions[0].action, Action::Relink);
    assert_eq!(store.get(old.id).unwrap().tag(), Some("832"));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_stale_namesake_of_live_department_is_retired() {
    // Given two departments called HR, of which only 200 is still published
    let mut store = InMemoryRegistry::new();
    let stale = create_group(&mut store, "100", "HR", None);
    let live = create_group(&mut store, "200", "HR", None);
    let snapshot = [group("200", "HR", None)];

    // When the directory is reconciled
    let mut engine = commit(&mut store);
    let summary = engine.reconcile(&ContactGroupProfile, &snapshot).unwrap();
    engine.finish();

    // Then the stale one is removed instead of relinked onto the taken id
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.failed, 0);
    assert!(store.get(stale.id).is_err());
    assert_eq!(store.get(live.id).unwrap().tag(), Some("200"));

    // And a second run has nothing left to do
    let mut engine = commit(&mut store);
    let again = engine.reconcile(&ContactGroupProfile, &snapshot).unwrap();
    engine.finish();
    assert_eq!(again.failed, 0);
    assert_eq!(again.mutations(), 0);
    assert_eq!(again.unchanged, 1);
}

#[test]
fn test_move_under_new_department_never_clears_parent() {
    // Given B under A
    let mut inner = InMemoryRegistry::new();
    let a = create_group(&mut inner, "1", "A", None);
    let b = create_group(&mut inner, "2", "B", Some(a.id));
    let mut store = RecordingStore::new(inner);

    // When B moves under a department that is new in the same snapshot
    let mut engine = ReconciliationEngine::new(&mut store, ReconConfig::default(), RunMode::Commit);
    let summary = engine
        .reconcile(
            &ContactGroupProfile,
            &[group("1", "A", None), group("3", "New", Some("1")), group("2", "B", Some("3"))],
        )
        .unwrap();
    engine.finish();

    // Then no write of B ever drops its parent, and it ends up under the new one
    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 0);
    assert!(store
        .updates
        .iter()
        .filter(|e| e.id == b.id)
        .all(|e| e.parent.is_some()));
    let new = store.find_by_tag(EntityKind::ContactGroup, "3").unwrap().unwrap();
    assert_eq!(store.get(b.id).unwrap().parent, Some(new.id));
}

#[test]
fn test_vanished_department_is_deleted_and_detached() {
    // Given a department with a person in it
    let mut store = InMemoryRegistry::new();
    let gone = create_group(&mut store, "555", "Closed Unit", None);
    let person = store
        .create(
            EntityDraft::new(EntityKind::Contact, "Jane Doe")
                .with_tag("10")
                .with_parent(gone.id),
        )
        .unwrap();

    // When the department is no longer published
    let mut engine = commit(&mut store);
    let summary = engine
        .reconcile(&ContactGroupProfile, &[group("1", "Administration", None)])
        .unwrap();
    let report = engine.finish();

    // Then it is removed and the person survives without a group
    assert_eq!(summary.deleted, 1);
    assert!(report
        .actions
        .iter()
        .any(|a| a.action == Action::Delete && a.entity == "555"));
    assert!(store.find_by_tag(EntityKind::ContactGroup, "555").unwrap().is_none());
    assert_eq!(store.get(person.id).unwrap().parent, None);
}

#[test]
fn test_ambiguous_rename_leaves_entity_alone() {
    // Given a tracked person whose id vanished
    let mut store = InMemoryRegistry::new();
    let jane = store
        .create(EntityDraft::new(EntityKind::Contact, "Jane Doe").with_tag("777"))
        .unwrap();

    // When two new records share her name
    let mut engine = commit(&mut store);
    let summary = engine
        .reconcile(
            &ContactProfile,
            &[contact("779", "Jane Doe", "2", "1"), contact("778", "Jane Doe", "3", "2")],
        )
        .unwrap();
    let report = engine.finish();

    // Then she keeps her tag, a warning names both candidates, and both are created
    let ambiguous: Vec<_> = report
        .actions
        .iter()
        .filter(|a| a.action == Action::Ambiguous)
        .collect();
    assert_eq!(ambiguous.len(), 1);
    assert_eq!(ambiguous[0].entity, "777");
    assert!(ambiguous[0].message.contains("779, 778"));
    assert_eq!(summary.warned, 1);
    assert_eq!(summary.created, 2);
    assert_eq!(store.get(jane.id).unwrap().tag(), Some("777"));
}

#[test]
fn test_vacancies_are_not_written() {
    let mut store = InMemoryRegistry::new();
    let mut engine = commit(&mut store);
    let summary = engine
        .reconcile(&ContactProfile, &[contact("12", "  ", "2", "")])
        .unwrap();
    engine.finish();

    assert_eq!(summary.created, 0);
    assert!(store.is_empty());
}

#[test]
fn test_store_failure_is_isolated_to_one_entity() {
    // Given two departments, one of which cannot be written
    let mut inner = InMemoryRegistry::new();
    create_group(&mut inner, "1", "A", None);
    create_group(&mut inner, "2", "B", None);
    let mut store = FailingStore::new(inner, "2");

    // When both are renamed
    let mut engine = ReconciliationEngine::new(&mut store, ReconConfig::default(), RunMode::Commit);
    let summary = engine
        .reconcile(&ContactGroupProfile, &[group("1", "A2", None), group("2", "B2", None)])
        .unwrap();
    let report = engine.finish();

    // Then one failure is logged and the other entity is still updated
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.updated, 1);
    let failures: Vec<_> = report.actions_at(LogLevel::Failure).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].entity, "2");
    assert!(failures[0].message.contains("disk I/O error"));
    assert_eq!(
        store.inner.find_by_tag(EntityKind::ContactGroup, "1").unwrap().unwrap().name,
        "A2"
    );
    assert!(report.has_failures());
}

#[test]
fn test_prerequisite_found_by_tag_is_not_recreated() {
    let mut store = InMemoryRegistry::new();
    let role = store
        .create(EntityDraft::new(EntityKind::DeviceRole, "PVE").with_tag("PVE"))
        .unwrap();

    let mut engine = commit(&mut store);
    let ensured = engine.ensure_prerequisite(EntityKind::DeviceRole, "PVE", &[]).unwrap();
    let report = engine.finish();

    assert_eq!(ensured.id(), role.id);
    assert!(report.actions.is_empty());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_missing_prerequisite_is_missing_dependency() {
    let mut store = InMemoryRegistry::new();
    let mut engine = commit(&mut store);

    let err = engine
        .ensure_prerequisite(EntityKind::DeviceRole, "", &[])
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::MissingDependency);
}
