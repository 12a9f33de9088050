//! Kind profiles.
//!
//! A profile is the capability set that parameterizes the generic matcher,
//! change detector and engine for one entity kind: which entities it owns,
//! how observations map to field rules, and what happens to entities that
//! disappeared upstream.

use crate::diff::FieldRule;
use crate::matcher::NameFallback;
use crate::model::{EntityKind, FieldValue, Observation, RegistryEntity};

/// What pass 1 does with an owned entity that matched no observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetirePolicy {
    /// Hard delete, logged as a prominent removal
    Delete,
    /// Leave the entity alone; debug log only
    Keep,
    /// Set one field to a marker value (for example `status = offline`)
    Mark { field: String, value: FieldValue },
}

impl RetirePolicy {
    pub fn mark(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        RetirePolicy::Mark {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Per-kind reconciliation strategy
pub trait KindProfile {
    type Record: Observation;

    /// Kind of the registry entities this profile reconciles
    fn kind(&self) -> EntityKind;

    /// Ordered field mapping for one observation
    fn field_rules(&self, record: &Self::Record) -> Vec<FieldRule>;

    fn retire_policy(&self) -> RetirePolicy;

    /// Whether pass 1 considers this entity; defaults to every tracked entity
    fn owns(&self, entity: &RegistryEntity) -> bool {
        entity.is_tracked()
    }

    /// Whether pass 2 reconciles this observation
    fn accepts(&self, _record: &Self::Record) -> bool {
        true
    }

    fn name_fallback(&self) -> NameFallback {
        NameFallback::Enabled
    }

    /// Whether pass 2 links a single untracked entity with the observation's
    /// name instead of creating a duplicate
    fn adopts_untracked(&self) -> bool {
        false
    }

    /// Whether pass 2 creates entities for unmatched observations
    fn creates_missing(&self) -> bool {
        true
    }

    /// Warnings about an observation that need an operator's attention
    fn advisories(&self, _record: &Self::Record, _existing: Option<&RegistryEntity>) -> Vec<String> {
        Vec::new()
    }
}

/// Tracked entity whose tag falls under `prefix/`
pub fn tag_in_scope(entity: &RegistryEntity, prefix: &str) -> bool {
    entity
        .tag()
        .and_then(|t| t.strip_prefix(prefix))
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityDraft, EntityId};

    #[test]
    fn test_tag_in_scope() {
        let tagged = |tag: &str| {
            RegistryEntity::from_draft(EntityId(1), EntityDraft::new(EntityKind::Device, "n").with_tag(tag))
        };
        assert!(tag_in_scope(&tagged("pve/node1"), "pve"));
        assert!(!tag_in_scope(&tagged("pve2/node1"), "pve"));
        assert!(!tag_in_scope(&tagged("pve"), "pve"));
    }
}
