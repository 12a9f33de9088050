//! Change detection engine.
//!
//! The core entry point is [`diff`], which evaluates a profile's field rules
//! for one observation against the current state of a registry entity.

#![allow(clippy::result_large_err)]

use crate::diff::model::{ChangeSet, Compare, FieldChange, FieldRule, FieldTarget, Policy, ValueSource};
use crate::errors::ExError;
use crate::model::{EntityId, EntityKind, FieldValue, Observation, RegistryEntity};
use crate::ops::store::RegistryStore;

/// Translates an external id into the registry entity currently tagged with it
///
/// Re-run on every diff: parents re-tagged earlier in the same run are seen.
pub trait RefResolver {
    /// # Errors
    ///
    /// Propagates store read failures.
    fn resolve_ref(&self, kind: EntityKind, external_id: &str) -> Result<Option<EntityId>, ExError>;
}

impl<S: RegistryStore + ?Sized> RefResolver for S {
    fn resolve_ref(&self, kind: EntityKind, external_id: &str) -> Result<Option<EntityId>, ExError> {
        if external_id.is_empty() {
            return Ok(None);
        }
        Ok(self.find_by_tag(kind, external_id)?.map(|e| e.id))
    }
}

/// What an `Always` rule does when its lookup finds no entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    /// Clear the field
    Clear,
    /// Leave the field out of the change set; the referenced entity may
    /// still be created later in the run
    Defer,
}

/// Compute the minimal change set between `existing` and an observation
///
/// With `existing == None` the result describes a creation: every rule with
/// a non-null value, plus the tag. Otherwise `CreateOnly` rules are skipped,
/// `PreserveWhenAbsent` rules with a null value are skipped, and the tag
/// relink is reported first when the entity carries a different tag.
///
/// # Errors
///
/// Propagates reference resolution failures from the resolver.
pub fn diff<R, Q>(
    existing: Option<&RegistryEntity>,
    observation: &R,
    rules: &[FieldRule],
    resolver: &Q,
) -> Result<ChangeSet, ExError>
where
    R: Observation + ?Sized,
    Q: RefResolver + ?Sized,
{
    diff_with(existing, observation, rules, resolver, Unresolved::Clear)
}

/// [`diff`] with explicit handling of lookups that resolve to nothing
///
/// # Errors
///
/// Propagates reference resolution failures from the resolver.
pub fn diff_with<R, Q>(
    existing: Option<&RegistryEntity>,
    observation: &R,
    rules: &[FieldRule],
    resolver: &Q,
    unresolved: Unresolved,
) -> Result<ChangeSet, ExError>
where
    R: Observation + ?Sized,
    Q: RefResolver + ?Sized,
{
    let mut changes = ChangeSet::new();

    let tag = observation.external_id();
    let old_tag = existing.and_then(|e| e.tag());
    if old_tag != Some(tag) {
        changes.push(FieldChange {
            target: FieldTarget::Tag,
            old: FieldValue::opt_text(old_tag),
            new: FieldValue::text(tag),
        });
    }

    for rule in rules {
        if existing.is_some() && rule.policy == Policy::CreateOnly {
            continue;
        }
        let new = desired_value(rule, resolver)?;
        if new.is_null() && (existing.is_none() || rule.policy == Policy::PreserveWhenAbsent) {
            continue;
        }
        if new.is_null() && unresolved == Unresolved::Defer && is_pending_lookup(rule) {
            continue;
        }
        let old = existing
            .map(|e| current_value(e, &rule.target))
            .unwrap_or(FieldValue::Null);
        if values_equal(&old, &new, rule.compare) {
            continue;
        }
        changes.push(FieldChange {
            target: rule.target.clone(),
            old,
            new,
        });
    }

    Ok(changes)
}

fn desired_value<Q: RefResolver + ?Sized>(rule: &FieldRule, resolver: &Q) -> Result<FieldValue, ExError> {
    match &rule.source {
        ValueSource::Literal(value) => Ok(value.clone()),
        ValueSource::Lookup { kind, external_id } => Ok(resolver
            .resolve_ref(*kind, external_id)?
            .map(FieldValue::Ref)
            .unwrap_or(FieldValue::Null)),
    }
}

fn is_pending_lookup(rule: &FieldRule) -> bool {
    matches!(&rule.source, ValueSource::Lookup { external_id, .. } if !external_id.is_empty())
}

/// Current value of a target on an entity
pub fn current_value(entity: &RegistryEntity, target: &FieldTarget) -> FieldValue {
    match target {
        FieldTarget::Name => FieldValue::text(entity.name.clone()),
        FieldTarget::Parent => entity.parent.map(FieldValue::Ref).unwrap_or(FieldValue::Null),
        FieldTarget::Tag => FieldValue::opt_text(entity.tag()),
        FieldTarget::Field(name) => entity.field(name).clone(),
    }
}

fn values_equal(old: &FieldValue, new: &FieldValue, compare: Compare) -> bool {
    match (compare, old, new) {
        (Compare::IgnoreCase, FieldValue::Text(a), FieldValue::Text(b)) => {
            a.to_lowercase() == b.to_lowercase()
        }
        _ => old == new,
    }
}
