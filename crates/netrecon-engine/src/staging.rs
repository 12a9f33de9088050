//! Staged store for dry runs.
//!
//! Each kind is read from the underlying store once and kept as a merged
//! view indexed by tag; writes land in an overlay and are validated exactly like the real store validates them, so a dry
//! run makes the same decisions and logs the same lines as a committing
//! run. Staged creations get negative ids.

#![allow(clippy::result_large_err)]

use std::cell::{RefCell, RefMut};
use std::collections::{BTreeMap, BTreeSet};

use netrecon_core::errors::{ExError, ExErrorKind, ReconError};
use netrecon_core::model::{EntityDraft, EntityId, EntityKind, RegistryEntity};
use netrecon_core::ops::{detach_reference, RegistryStore};
use netrecon_core::rules::{validate_draft, validate_entity};

/// Base rows first in id order, then staged creations in creation order
type OrderKey = (bool, i64);

fn order_key(id: EntityId) -> OrderKey {
    let raw = id.as_i64();
    (raw < 0, raw.abs())
}

/// Merged view of one kind: base rows with the overlay applied
#[derive(Default)]
struct KindView {
    entities: BTreeMap<OrderKey, RegistryEntity>,
    /// Several keys only when the base already held duplicate tags
    by_tag: BTreeMap<String, BTreeSet<OrderKey>>,
}

impl KindView {
    fn insert(&mut self, entity: RegistryEntity) {
        let key = order_key(entity.id);
        self.remove(entity.id);
        if let Some(tag) = entity.tag() {
            self.by_tag.entry(tag.to_string()).or_default().insert(key);
        }
        self.entities.insert(key, entity);
    }

    fn remove(&mut self, id: EntityId) {
        let key = order_key(id);
        let Some(old) = self.entities.remove(&key) else {
            return;
        };
        if let Some(tag) = old.tag() {
            if let Some(keys) = self.by_tag.get_mut(tag) {
                keys.remove(&key);
                if keys.is_empty() {
                    self.by_tag.remove(tag);
                }
            }
        }
    }

    /// Lowest id wins, like the committed store
    fn find_by_tag(&self, tag: &str) -> Option<&RegistryEntity> {
        let key = self.by_tag.get(tag)?.first()?;
        self.entities.get(key)
    }
}

/// Write overlay on top of a read-only store
pub struct StagedStore<'a, S: RegistryStore + ?Sized> {
    base: &'a S,
    /// `None` marks a staged deletion
    overlay: BTreeMap<EntityId, Option<RegistryEntity>>,
    /// Each kind is read from the base once, on first use
    views: RefCell<BTreeMap<EntityKind, KindView>>,
    next_id: i64,
}

impl<'a, S: RegistryStore + ?Sized> StagedStore<'a, S> {
    pub fn new(base: &'a S) -> Self {
        Self {
            base,
            overlay: BTreeMap::new(),
            views: RefCell::new(BTreeMap::new()),
            next_id: -1,
        }
    }

    /// Number of entities with staged writes
    pub fn staged_count(&self) -> usize {
        self.overlay.len()
    }

    /// Staged state of every touched entity; `None` for deletions
    pub fn staged(&self) -> impl Iterator<Item = (EntityId, Option<&RegistryEntity>)> {
        self.overlay.iter().map(|(id, e)| (*id, e.as_ref()))
    }

    fn lookup(&self, id: EntityId) -> Result<Option<RegistryEntity>, ExError> {
        match self.overlay.get(&id) {
            Some(staged) => Ok(staged.clone()),
            None if id.as_i64() < 0 => Ok(None),
            None => match self.base.get(id) {
                Ok(entity) => Ok(Some(entity)),
                Err(e) if e.kind() == ExErrorKind::NotFound => Ok(None),
                Err(e) => Err(e),
            },
        }
    }

    /// The merged view of `kind`, loading it from the base on first use
    fn view(&self, kind: EntityKind) -> Result<RefMut<'_, KindView>, ExError> {
        if !self.views.borrow().contains_key(&kind) {
            let mut view = KindView::default();
            for entity in self.base.find_all_of_kind(kind)? {
                if !self.overlay.contains_key(&entity.id) {
                    view.insert(entity);
                }
            }
            for staged in self.overlay.values().flatten() {
                if staged.kind == kind {
                    view.insert(staged.clone());
                }
            }
            self.views.borrow_mut().insert(kind, view);
        }
        Ok(RefMut::map(self.views.borrow_mut(), |views| {
            views.entry(kind).or_default()
        }))
    }

    /// Record a staged entity in the overlay and its kind's view
    fn stage(&mut self, entity: RegistryEntity) -> Result<(), ExError> {
        self.view(entity.kind)?.insert(entity.clone());
        self.overlay.insert(entity.id, Some(entity));
        Ok(())
    }

    fn parent_of(&self, id: EntityId) -> Option<Option<EntityId>> {
        self.lookup(id).ok().flatten().map(|e| e.parent)
    }

    fn check_tag_free(
        &self,
        kind: EntityKind,
        tag: Option<&str>,
        own_id: Option<EntityId>,
    ) -> Result<(), ExError> {
        let Some(tag) = tag else {
            return Ok(());
        };
        let own = own_id.map(order_key);
        let taken = self
            .view(kind)?
            .by_tag
            .get(tag)
            .is_some_and(|keys| keys.iter().any(|key| Some(*key) != own));
        if taken {
            return Err(ReconError::DuplicateTag {
                kind: kind.to_string(),
                tag: tag.to_string(),
            }
            .into());
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

impl<S: RegistryStore + ?Sized> RegistryStore for StagedStore<'_, S> {
    fn find_by_tag(&self, kind: EntityKind, tag: &str) -> Result<Option<RegistryEntity>, ExError> {
        Ok(self.view(kind)?.find_by_tag(tag).cloned())
    }

    fn find_all_of_kind(&self, kind: EntityKind) -> Result<Vec<RegistryEntity>, ExError> {
        Ok(self.view(kind)?.entities.values().cloned().collect())
    }

    fn find_by_name(&self, kind: EntityKind, name: &str) -> Result<Vec<RegistryEntity>, ExError> {
        Ok(self
            .view(kind)?
            .entities
            .values()
            .filter(|e| e.name == name)
            .cloned()
            .collect())
    }

    fn get(&self, id: EntityId) -> Result<RegistryEntity, ExError> {
        self.lookup(id)?.ok_or_else(|| Self::not_found(id, "get"))
    }

    fn create(&mut self, draft: EntityDraft) -> Result<RegistryEntity, ExError> {
        validate_draft(&draft, |id| self.parent_of(id).is_some())
            .map_err(|e| ExError::from(e).with_op("create"))?;
        self.check_tag_free(draft.kind, draft.external_id_tag.as_deref(), None)
            .map_err(|e| e.with_op("create"))?;

        let id = EntityId(self.next_id);
        self.next_id -= 1;
        let entity = RegistryEntity::from_draft(id, draft);
        self.stage(entity.clone())?;
        Ok(entity)
    }

    fn update(&mut self, entity: &RegistryEntity) -> Result<(), ExError> {
        let stored = self
            .lookup(entity.id)?
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
        validate_entity(entity, |id| self.parent_of(id)).map_err(|e| {
            ExError::from(e)
                .with_op("update")
                .with_entity_id(entity.id.to_string())
        })?;
        self.check_tag_free(entity.kind, entity.tag(), Some(entity.id))
            .map_err(|e| e.with_op("update").with_entity_id(entity.id.to_string()))?;

        self.stage(entity.clone())
    }

    fn delete(&mut self, id: EntityId) -> Result<(), ExError> {
        let Some(removed) = self.lookup(id)? else {
            return Err(Self::not_found(id, "delete"));
        };
        self.view(removed.kind)?.remove(id);
        self.overlay.insert(id, None);

        let mut detached = Vec::new();
        for kind in EntityKind::ALL {
            for entity in self.view(kind)?.entities.values() {
                let mut entity = entity.clone();
                if detach_reference(&mut entity, id) {
                    detached.push(entity);
                }
            }
        }
        for entity in detached {
            self.stage(entity)?;
        }
        Ok(())
    }
}
