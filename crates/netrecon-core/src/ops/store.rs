#![allow(clippy::result_large_err)]

use std::collections::BTreeMap;

use crate::errors::{ExError, ExErrorKind, ReconError};
use crate::model::{EntityDraft, EntityId, EntityKind, RegistryEntity};
use crate::rules::{validate_draft, validate_entity};

/// Registry persistence contract used by the reconciliation engine
///
/// Every write is an independent unit of work; the engine neither starts
/// nor requires cross-entity transactions. Implementations must reject a
/// create or update that would give two entities of the same kind the same
/// external-id tag (`ExErrorKind::DuplicateTag`).
pub trait RegistryStore {
    /// Entity of `kind` tagged `tag`
    ///
    /// If pre-existing rows violate tag uniqueness, the lowest id wins.
    ///
    /// # Errors
    ///
    /// `Persistence` on infrastructure failure.
    fn find_by_tag(&self, kind: EntityKind, tag: &str) -> Result<Option<RegistryEntity>, ExError>;

    /// All entities of `kind`, ordered by id
    ///
    /// # Errors
    ///
    /// `Persistence` on infrastructure failure.
    fn find_all_of_kind(&self, kind: EntityKind) -> Result<Vec<RegistryEntity>, ExError>;

    /// Entities of `kind` with exactly this name, ordered by id
    ///
    /// # Errors
    ///
    /// `Persistence` on infrastructure failure.
    fn find_by_name(&self, kind: EntityKind, name: &str) -> Result<Vec<RegistryEntity>, ExError>;

    /// # Errors
    ///
    /// `NotFound` when no entity has this id.
    fn get(&self, id: EntityId) -> Result<RegistryEntity, ExError>;

    /// Persist a new entity and return it with its assigned id
    ///
    /// # Errors
    ///
    /// `ValidationFailed` or `DuplicateTag` when the draft is rejected,
    /// `Persistence` on infrastructure failure.
    fn create(&mut self, draft: EntityDraft) -> Result<RegistryEntity, ExError>;

    /// Replace the stored state of an existing entity
    ///
    /// # Errors
    ///
    /// `NotFound`, `ValidationFailed`, `DuplicateTag` or `Persistence`.
    fn update(&mut self, entity: &RegistryEntity) -> Result<(), ExError>;

    /// Remove an entity
    ///
    /// Children lose their parent and reference fields that pointed at the
    /// removed entity are cleared, as the registry does on deletion.
    ///
    /// # Errors
    ///
    /// `NotFound` when no entity has this id, `Persistence` on failure.
    fn delete(&mut self, id: EntityId) -> Result<(), ExError>;
}

/// In-memory registry
///
/// A `BTreeMap`-backed store for tests and for dry runs without a database.
/// Not thread-safe; designed for single-threaded use.
#[derive(Debug, Clone)]
pub struct InMemoryRegistry {
    entities: BTreeMap<EntityId, RegistryEntity>,
    next_id: i64,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Insert a row bypassing validation and tag uniqueness
    ///
    /// Models rows written by other tools; the store keeps its own id
    /// sequence ahead of any inserted id.
    pub fn insert_unchecked(&mut self, entity: RegistryEntity) {
        self.next_id = self.next_id.max(entity.id.as_i64() + 1);
        self.entities.insert(entity.id, entity);
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities, ordered by id
    pub fn entities(&self) -> impl Iterator<Item = &RegistryEntity> {
        self.entities.values()
    }

    fn parent_of(&self, id: EntityId) -> Option<Option<EntityId>> {
        self.entities.get(&id).map(|e| e.parent)
    }

    fn check_tag_free(
        &self,
        kind: EntityKind,
        tag: Option<&str>,
        own_id: Option<EntityId>,
    ) -> Result<(), ReconError> {
        let Some(tag) = tag else {
            return Ok(());
        };
        let taken = self
            .entities
            .values()
            .any(|e| e.kind == kind && e.tag() == Some(tag) && Some(e.id) != own_id);
        if taken {
            return Err(ReconError::DuplicateTag {
                kind: kind.to_string(),
                tag: tag.to_string(),
            });
        }
        Ok(())
    }

    fn not_found(id: EntityId, op: &str) -> ExError {
        ExError::from(ReconError::EntityNotFound {
            entity_id: id.to_string(),
        })
        .with_op(op)
    }
}

impl RegistryStore for InMemoryRegistry {
    fn find_by_tag(&self, kind: EntityKind, tag: &str) -> Result<Option<RegistryEntity>, ExError> {
        Ok(self
            .entities
            .values()
            .find(|e| e.kind == kind && e.tag() == Some(tag))
            .cloned())
    }

    fn find_all_of_kind(&self, kind: EntityKind) -> Result<Vec<RegistryEntity>, ExError> {
        Ok(self
            .entities
            .values()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect())
    }

    fn find_by_name(&self, kind: EntityKind, name: &str) -> Result<Vec<RegistryEntity>, ExError> {
        Ok(self
            .entities
            .values()
            .filter(|e| e.kind == kind && e.name == name)
            .cloned()
            .collect())
    }

    fn get(&self, id: EntityId) -> Result<RegistryEntity, ExError> {
        self.entities
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::not_found(id, "get"))
    }

    fn create(&mut self, draft: EntityDraft) -> Result<RegistryEntity, ExError> {
        validate_draft(&draft, |id| self.entities.contains_key(&id))
            .map_err(|e| ExError::from(e).with_op("create"))?;
        self.check_tag_free(draft.kind, draft.external_id_tag.as_deref(), None)
            .map_err(|e| ExError::from(e).with_op("create"))?;

        let id = EntityId(self.next_id);
        self.next_id += 1;
        let entity = RegistryEntity::from_draft(id, draft);
        self.entities.insert(id, entity.clone());
        Ok(entity)
    }

    fn update(&mut self, entity: &RegistryEntity) -> Result<(), ExError> {
        let stored = self
            .entities
            .get(&entity.id)
            .ok_or_else(|| Self::not_found(entity.id, "update"))?;
        if stored.kind != entity.kind {
            return Err(ExError::new(ExErrorKind::ValidationFailed)
                .with_op("update")
                .with_entity_id(entity.id.to_string())
                .with_message(format!(
                    "kind cannot change from {} to {}",
                    stored.kind, entity.kind
                )));
        }
        validate_entity(entity, |id| self.parent_of(id))
            .map_err(|e| ExError::from(e).with_op("update").with_entity_id(entity.id.to_string()))?;
        self.check_tag_free(entity.kind, entity.tag(), Some(entity.id))
            .map_err(|e| ExError::from(e).with_op("update").with_entity_id(entity.id.to_string()))?;

        self.entities.insert(entity.id, entity.clone());
        Ok(())
    }

    fn delete(&mut self, id: EntityId) -> Result<(), ExError> {
        self.entities
            .remove(&id)
            .ok_or_else(|| Self::not_found(id, "delete"))?;
        for entity in self.entities.values_mut() {
            detach_reference(entity, id);
        }
        Ok(())
    }
}

/// Clear every link from `entity` to `removed`
///
/// Returns whether anything changed.
pub fn detach_reference(entity: &mut RegistryEntity, removed: EntityId) -> bool {
    let mut changed = false;
    if entity.parent == Some(removed) {
        entity.parent = None;
        changed = true;
    }
    let before = entity.fields.len();
    entity
        .fields
        .retain(|_, value| value.as_ref_id() != Some(removed));
    changed || entity.fields.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldValue;

    #[test]
    fn test_duplicate_tag_rejected_on_create() {
        let mut store = InMemoryRegistry::new();
        store
            .create(EntityDraft::new(EntityKind::ContactGroup, "A").with_tag("1"))
            .unwrap();
        let err = store
            .create(EntityDraft::new(EntityKind::ContactGroup, "B").with_tag("1"))
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::DuplicateTag);
    }

    #[test]
    fn test_same_tag_allowed_across_kinds() {
        let mut store = InMemoryRegistry::new();
        store
            .create(EntityDraft::new(EntityKind::ContactGroup, "A").with_tag("1"))
            .unwrap();
        assert!(store
            .create(EntityDraft::new(EntityKind::Contact, "B").with_tag("1"))
            .is_ok());
    }

    #[test]
    fn test_preexisting_duplicates_resolve_to_lowest_id() {
        let mut store = InMemoryRegistry::new();
        for id in [5, 3] {
            store.insert_unchecked(RegistryEntity::from_draft(
                EntityId(id),
                EntityDraft::new(EntityKind::Contact, format!("c{}", id)).with_tag("dup"),
            ));
        }
        let found = store.find_by_tag(EntityKind::Contact, "dup").unwrap().unwrap();
        assert_eq!(found.id, EntityId(3));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let mut store = InMemoryRegistry::new();
        let err = store.delete(EntityId(42)).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
    }

    #[test]
    fn test_delete_detaches_children_and_refs() {
        let mut store = InMemoryRegistry::new();
        let bridge = store.create(EntityDraft::new(EntityKind::Interface, "vmbr0")).unwrap();
        let port = store
            .create(
                EntityDraft::new(EntityKind::Interface, "eno1")
                    .with_parent(bridge.id)
                    .with_field("bridge", FieldValue::Ref(bridge.id)),
            )
            .unwrap();
        store.delete(bridge.id).unwrap();
        let port = store.get(port.id).unwrap();
        assert_eq!(port.parent, None);
        assert!(port.field("bridge").is_null());
    }

    #[test]
    fn test_update_rejects_parent_cycle() {
        let mut store = InMemoryRegistry::new();
        let a = store.create(EntityDraft::new(EntityKind::ContactGroup, "A")).unwrap();
        let b = store
            .create(EntityDraft::new(EntityKind::ContactGroup, "B").with_parent(a.id))
            .unwrap();
        let mut a2 = a.clone();
        a2.parent = Some(b.id);
        let err = store.update(&a2).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ValidationFailed);
    }
}
