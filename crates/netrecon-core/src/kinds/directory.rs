//! Phone directory: departments become contact groups, people become contacts.

use crate::diff::{FieldRule, FieldTarget};
use crate::model::{ContactRecord, EntityKind, FieldValue, GroupRecord};
use crate::normalize::{make_description, make_phone, make_slug};
use crate::profile::{KindProfile, RetirePolicy};

fn parent_rule(kind: EntityKind, parent_id: Option<&str>) -> FieldRule {
    match parent_id {
        Some(id) if !id.is_empty() => FieldRule::lookup(FieldTarget::Parent, kind, id),
        _ => FieldRule::set(FieldTarget::Parent, FieldValue::Null),
    }
}

/// Departments of the phone directory
#[derive(Debug, Clone, Default)]
pub struct ContactGroupProfile;

impl KindProfile for ContactGroupProfile {
    type Record = GroupRecord;

    fn kind(&self) -> EntityKind {
        EntityKind::ContactGroup
    }

    fn field_rules(&self, record: &GroupRecord) -> Vec<FieldRule> {
        vec![
            FieldRule::set(FieldTarget::Name, record.name.as_str()),
            FieldRule::set(FieldTarget::field("slug"), make_slug(&record.id)),
            parent_rule(EntityKind::ContactGroup, record.parent_id.as_deref()),
            FieldRule::set(
                FieldTarget::field("description"),
                make_description(&record.address, &record.mail),
            ),
        ]
    }

    fn retire_policy(&self) -> RetirePolicy {
        RetirePolicy::Delete
    }
}

/// People of the phone directory
#[derive(Debug, Clone, Default)]
pub struct ContactProfile;

impl KindProfile for ContactProfile {
    type Record = ContactRecord;

    fn kind(&self) -> EntityKind {
        EntityKind::Contact
    }

    fn field_rules(&self, record: &ContactRecord) -> Vec<FieldRule> {
        vec![
            FieldRule::set(FieldTarget::Name, record.name.as_str()),
            FieldRule::set(FieldTarget::field("title"), record.title.as_str()),
            parent_rule(EntityKind::ContactGroup, record.group_id.as_deref()),
            FieldRule::set(FieldTarget::field("address"), record.room.as_str()),
            FieldRule::set(FieldTarget::field("phone"), make_phone(&record.phone)),
        ]
    }

    fn retire_policy(&self) -> RetirePolicy {
        RetirePolicy::Delete
    }

    /// Vacancies without a person's name are never written
    fn accepts(&self, record: &ContactRecord) -> bool {
        !record.name.trim().is_empty()
    }
}
