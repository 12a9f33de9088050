#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{contact, group, tracked};
use netrecon_core::matcher::{resolve, MatchResult, MatchVia};
use netrecon_core::model::EntityKind;
use proptest::prelude::*;

#[test]
fn test_primary_key_wins_over_name() {
    let entity = tracked(1, EntityKind::ContactGroup, "831", "Old Name");
    let observations = vec![group("900", "Old Name", None), group("831", "New Name", None)];

    match resolve(&entity, &observations) {
        MatchResult::UniqueMatch { record, via } => {
            assert_eq!(record.id, "831");
            assert_eq!(via, MatchVia::ExternalId);
        }
        other => panic!("expected unique match, got {:?}", other),
    }
}

#[test]
fn test_single_name_match_requires_relink() {
    let entity = tracked(1, EntityKind::ContactGroup, "831", "Dept A");
    let observations = vec![group("832", "Dept A", Some("900"))];

    match resolve(&entity, &observations) {
        MatchResult::UniqueMatch { record, via } => {
            assert_eq!(record.id, "832");
            assert_eq!(via, MatchVia::Name);
        }
        other => panic!("expected unique match, got {:?}", other),
    }
}

#[test]
fn test_no_candidates_is_no_match() {
    let entity = tracked(1, EntityKind::ContactGroup, "555", "Gone");
    let observations = vec![group("831", "Dept A", None)];

    assert_eq!(resolve(&entity, &observations), MatchResult::NoMatch);
}

#[test]
fn test_duplicate_names_are_ambiguous_in_snapshot_order() {
    let entity = tracked(1, EntityKind::Contact, "777", "Jane Doe");
    let observations = vec![
        contact("779", "Jane Doe", "1"),
        contact("12", "John Roe", "1"),
        contact("778", "Jane Doe", "2"),
    ];

    let result = resolve(&entity, &observations);
    assert!(matches!(result, MatchResult::AmbiguousMatch(ref c) if c.len() == 2));
    assert_eq!(result.candidate_ids(), vec!["779", "778"]);
}

#[test]
fn test_untracked_entity_only_matches_by_name() {
    let entity = netrecon_core::RegistryEntity::from_draft(
        netrecon_core::EntityId(3),
        netrecon_core::EntityDraft::new(EntityKind::ContactGroup, "Dept A"),
    );
    let observations = vec![group("831", "Dept A", None)];

    assert!(matches!(
        resolve(&entity, &observations),
        MatchResult::UniqueMatch { via: MatchVia::Name, .. }
    ));
}

proptest! {
    // An observation carrying the entity's tag always yields a unique match,
    // whatever the names on either side.
    #[test]
    fn prop_primary_key_stability(
        tag in "[0-9]{1,5}",
        entity_name in "[A-Za-z ]{0,12}",
        names in proptest::collection::vec("[A-Za-z ]{0,12}", 0..6),
        observed_name in "[A-Za-z ]{0,12}",
    ) {
        let entity = tracked(1, EntityKind::ContactGroup, &tag, &entity_name);
        let mut observations: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, n)| group(&format!("x{}", i), n, None))
            .collect();
        observations.push(group(&tag, &observed_name, None));

        match resolve(&entity, &observations) {
            MatchResult::UniqueMatch { record, via } => {
                prop_assert_eq!(&record.id, &tag);
                prop_assert_eq!(via, MatchVia::ExternalId);
            }
            other => prop_assert!(false, "expected unique match, got {:?}", other),
        }
    }
}
