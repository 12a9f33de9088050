use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::kind::EntityKind;
use super::value::FieldValue;

/// Store-assigned entity identity
///
/// Opaque to the reconciliation core. Staged (dry-run) creations use
/// negative ids so they never collide with persisted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl EntityId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

static NULL_VALUE: FieldValue = FieldValue::Null;

/// One persisted registry item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// External id of the observation this entity was last linked to
    pub external_id_tag: Option<String>,
    pub name: String,
    pub parent: Option<EntityId>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl RegistryEntity {
    /// Materialize a draft under a store-assigned id
    pub fn from_draft(id: EntityId, draft: EntityDraft) -> Self {
        Self {
            id,
            kind: draft.kind,
            external_id_tag: draft.external_id_tag,
            name: draft.name,
            parent: draft.parent,
            fields: draft.fields,
        }
    }

    /// Whether this entity carries an external-id tag
    pub fn is_tracked(&self) -> bool {
        self.external_id_tag.is_some()
    }

    pub fn tag(&self) -> Option<&str> {
        self.external_id_tag.as_deref()
    }

    /// Field value, `Null` when the field is not set
    pub fn field(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&NULL_VALUE)
    }

    /// Short identity used in log lines: `kind #id 'name'`
    pub fn label(&self) -> String {
        format!("{} {} '{}'", self.kind, self.id, self.name)
    }
}

/// An entity that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDraft {
    pub kind: EntityKind,
    pub external_id_tag: Option<String>,
    pub name: String,
    pub parent: Option<EntityId>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl EntityDraft {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            external_id_tag: None,
            name: name.into(),
            parent: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.external_id_tag = Some(tag.into());
        self
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}
