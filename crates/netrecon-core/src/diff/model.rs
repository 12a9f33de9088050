//! Change detection input and output types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{EntityDraft, EntityKind, FieldValue, RegistryEntity};

/// Which part of an entity a rule or change addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTarget {
    Name,
    Parent,
    /// The external-id tag
    Tag,
    Field(String),
}

impl FieldTarget {
    pub fn field(name: impl Into<String>) -> Self {
        FieldTarget::Field(name.into())
    }
}

impl fmt::Display for FieldTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldTarget::Name => f.write_str("name"),
            FieldTarget::Parent => f.write_str("parent"),
            FieldTarget::Tag => f.write_str("tag"),
            FieldTarget::Field(name) => f.write_str(name),
        }
    }
}

/// Where the desired value of a rule comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    Literal(FieldValue),
    /// Entity of `kind` tagged `external_id`, resolved at diff time;
    /// unresolvable lookups yield `Null`
    Lookup {
        kind: EntityKind,
        external_id: String,
    },
}

/// How absent observation data is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Missing data clears the registry value
    Always,
    /// Missing data never overwrites a present value
    PreserveWhenAbsent,
    /// Written when the entity is created, never compared afterwards
    CreateOnly,
}

/// Equality used when comparing values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compare {
    Exact,
    /// Text compares case-insensitively (MAC addresses, DNS names)
    IgnoreCase,
}

/// One entry of a kind's ordered field mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub target: FieldTarget,
    pub source: ValueSource,
    pub policy: Policy,
    pub compare: Compare,
}

impl FieldRule {
    /// A literal rule with `Always` policy and exact comparison
    pub fn set(target: FieldTarget, value: impl Into<FieldValue>) -> Self {
        Self {
            target,
            source: ValueSource::Literal(value.into()),
            policy: Policy::Always,
            compare: Compare::Exact,
        }
    }

    /// A reference rule resolved through the store
    pub fn lookup(target: FieldTarget, kind: EntityKind, external_id: impl Into<String>) -> Self {
        Self {
            target,
            source: ValueSource::Lookup {
                kind,
                external_id: external_id.into(),
            },
            policy: Policy::Always,
            compare: Compare::Exact,
        }
    }

    /// Literal rule for an optional value; `None` becomes `Null`
    pub fn set_opt(target: FieldTarget, value: Option<FieldValue>) -> Self {
        Self::set(target, value.unwrap_or(FieldValue::Null))
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn preserve(self) -> Self {
        self.with_policy(Policy::PreserveWhenAbsent)
    }

    pub fn create_only(self) -> Self {
        self.with_policy(Policy::CreateOnly)
    }

    pub fn ignore_case(mut self) -> Self {
        self.compare = Compare::IgnoreCase;
        self
    }
}

/// One differing field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub target: FieldTarget,
    pub old: FieldValue,
    pub new: FieldValue,
}

/// Ordered set of field changes; empty means no-op
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub changes: Vec<FieldChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: FieldChange) {
        self.changes.push(change);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldChange> {
        self.changes.iter()
    }

    /// Change for a target, if any
    pub fn get(&self, target: &FieldTarget) -> Option<&FieldChange> {
        self.changes.iter().find(|c| &c.target == target)
    }

    /// Write every change into the entity
    pub fn apply(&self, entity: &mut RegistryEntity) {
        for change in &self.changes {
            match &change.target {
                FieldTarget::Name => {
                    entity.name = change.new.as_text().unwrap_or_default().to_string();
                }
                FieldTarget::Parent => entity.parent = change.new.as_ref_id(),
                FieldTarget::Tag => {
                    entity.external_id_tag = change.new.as_text().map(str::to_string);
                }
                FieldTarget::Field(name) => {
                    if change.new.is_null() {
                        entity.fields.remove(name);
                    } else {
                        entity.fields.insert(name.clone(), change.new.clone());
                    }
                }
            }
        }
    }

    /// Build a creation draft of `kind` from the changes
    pub fn to_draft(&self, kind: EntityKind) -> EntityDraft {
        let mut draft = EntityDraft::new(kind, "");
        for change in &self.changes {
            match &change.target {
                FieldTarget::Name => {
                    draft.name = change.new.as_text().unwrap_or_default().to_string();
                }
                FieldTarget::Parent => draft.parent = change.new.as_ref_id(),
                FieldTarget::Tag => {
                    draft.external_id_tag = change.new.as_text().map(str::to_string);
                }
                FieldTarget::Field(name) => {
                    if !change.new.is_null() {
                        draft.fields.insert(name.clone(), change.new.clone());
                    }
                }
            }
        }
        draft
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a FieldChange;
    type IntoIter = std::slice::Iter<'a, FieldChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
