use std::collections::BTreeMap;

use crate::errors::ReconError;
use crate::model::{EntityDraft, EntityId, EntityKind, FieldValue, RegistryEntity};

use super::invariants;

/// Longest accepted entity name, in characters
pub const MAX_NAME_LEN: usize = 100;

/// Validate an entity about to be created
///
/// `exists` answers whether a referenced entity id is present in the store.
///
/// # Errors
///
/// - `InvalidName` when the name is missing for a kind that requires one,
///   too long, or contains control characters
/// - `InvalidName` when the tag is present but empty
/// - `DanglingReference` when the parent or a reference field points nowhere
pub fn validate_draft<F>(draft: &EntityDraft, exists: F) -> Result<(), ReconError>
where
    F: Fn(EntityId) -> bool,
{
    validate_parts(
        draft.kind,
        draft.external_id_tag.as_deref(),
        &draft.name,
        draft.parent,
        &draft.fields,
        &exists,
    )
}

/// Validate the new state of an existing entity
///
/// `parent_of` returns the current parent of a known id (`None` for unknown
/// ids) and is used for both reference existence and cycle detection.
///
/// # Errors
///
/// Same as [`validate_draft`], plus `DanglingReference` when the parent
/// chain would become cyclic.
pub fn validate_entity<F>(entity: &RegistryEntity, parent_of: F) -> Result<(), ReconError>
where
    F: Fn(EntityId) -> Option<Option<EntityId>>,
{
    let exists = |id: EntityId| parent_of(id).is_some();
    validate_parts(
        entity.kind,
        entity.tag(),
        &entity.name,
        entity.parent,
        &entity.fields,
        &exists,
    )?;
    if invariants::creates_parent_cycle(entity.id, entity.parent, &parent_of) {
        return Err(ReconError::DanglingReference {
            kind: entity.kind.to_string(),
            reference: format!(
                "cyclic parent {}",
                entity.parent.map(|p| p.to_string()).unwrap_or_default()
            ),
        });
    }
    Ok(())
}

fn validate_parts(
    kind: EntityKind,
    tag: Option<&str>,
    name: &str,
    parent: Option<EntityId>,
    fields: &BTreeMap<String, FieldValue>,
    exists: &dyn Fn(EntityId) -> bool,
) -> Result<(), ReconError> {
    if kind.requires_name() && name.trim().is_empty() {
        return Err(ReconError::InvalidName {
            kind: kind.to_string(),
            reason: "name is required".to_string(),
        });
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ReconError::InvalidName {
            kind: kind.to_string(),
            reason: format!("name longer than {} characters", MAX_NAME_LEN),
        });
    }
    if name.chars().any(char::is_control) {
        return Err(ReconError::InvalidName {
            kind: kind.to_string(),
            reason: "name contains control characters".to_string(),
        });
    }
    if tag == Some("") {
        return Err(ReconError::InvalidName {
            kind: kind.to_string(),
            reason: "external id tag is empty".to_string(),
        });
    }

    if let Some(parent) = parent {
        if !exists(parent) {
            return Err(ReconError::DanglingReference {
                kind: kind.to_string(),
                reference: parent.to_string(),
            });
        }
    }
    for (field, value) in fields {
        if let FieldValue::Ref(id) = value {
            if !exists(*id) {
                return Err(ReconError::DanglingReference {
                    kind: kind.to_string(),
                    reference: format!("{} in field '{}'", id, field),
                });
            }
        }
    }
    Ok(())
}
