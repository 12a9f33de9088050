//! SQLite-backed registry store
//!
//! Every write runs in its own transaction; the engine treats each entity as
//! an independent unit of work.

#![allow(clippy::result_large_err)]

use crate::db::{self, Location};
use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use crate::repo::hydration::{encode_fields, hydrate, read_row, EntityRow, ENTITY_COLUMNS};
use netrecon_core::errors::{ExError, ExErrorKind, ReconError};
use netrecon_core::model::{EntityDraft, EntityId, EntityKind, RegistryEntity};
use netrecon_core::ops::{detach_reference, RegistryStore};
use netrecon_core::rules::{validate_draft, validate_entity};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;

/// Registry store persisted in a SQLite database
pub struct SqliteRegistry {
    conn: Connection,
}

impl SqliteRegistry {
    /// Open (or create) a registry database and bring its schema up to date
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(db::connect(Location::File(path.as_ref()))?)
    }

    /// Fresh in-memory registry (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::connect(Location::Memory)?)
    }

    /// Wrap a configured connection, applying pending migrations
    pub fn from_connection(mut conn: Connection) -> Result<Self> {
        apply_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    /// Underlying connection, for inspection in tests and tooling
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Number of stored entities
    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))
            .map_err(from_rusqlite)?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    fn query_entities<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<RegistryEntity>> {
        let mut stmt = self.conn.prepare(sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(params, read_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<EntityRow>, _>>()
            .map_err(from_rusqlite)?;
        rows.into_iter().map(hydrate).collect()
    }

    fn parent_of(&self, id: EntityId) -> Option<Option<EntityId>> {
        self.conn
            .query_row(
                "SELECT parent_id FROM entities WHERE id = ?",
                [id.as_i64()],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()
            .ok()
            .flatten()
            .map(|parent| parent.map(EntityId))
    }

    fn check_tag_free(
        &self,
        kind: EntityKind,
        tag: Option<&str>,
        own_id: Option<EntityId>,
    ) -> Result<()> {
        let Some(tag) = tag else {
            return Ok(());
        };
        let taken: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM entities WHERE kind = ?1 AND external_id_tag = ?2 AND id != ?3 LIMIT 1",
                params![kind.as_str(), tag, own_id.map(|id| id.as_i64()).unwrap_or(0)],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        if taken.is_some() {
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

/// Rewrite every row that references `removed` through a field
fn detach_field_refs(tx: &Transaction<'_>, removed: EntityId) -> Result<()> {
    let sql = format!(
        "SELECT {} FROM entities WHERE fields LIKE '%\"type\":\"ref\"%' ORDER BY id",
        ENTITY_COLUMNS
    );
    let mut stmt = tx.prepare(&sql).map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([], read_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<EntityRow>, _>>()
        .map_err(from_rusqlite)?;
    drop(stmt);

    let now = chrono::Utc::now().timestamp();
    for row in rows {
        let mut entity = hydrate(row)?;
        if detach_reference(&mut entity, removed) {
            tx.execute(
                "UPDATE entities SET fields = ?1, updated_at = ?2 WHERE id = ?3",
                params![encode_fields(&entity.fields)?, now, entity.id.as_i64()],
            )
            .map_err(from_rusqlite)?;
        }
    }
    Ok(())
}

impl RegistryStore for SqliteRegistry {
    fn find_by_tag(&self, kind: EntityKind, tag: &str) -> Result<Option<RegistryEntity>> {
        let sql = format!(
            "SELECT {} FROM entities WHERE kind = ?1 AND external_id_tag = ?2 ORDER BY id LIMIT 1",
            ENTITY_COLUMNS
        );
        Ok(self
            .query_entities(&sql, params![kind.as_str(), tag])?
            .into_iter()
            .next())
    }

    fn find_all_of_kind(&self, kind: EntityKind) -> Result<Vec<RegistryEntity>> {
        let sql = format!(
            "SELECT {} FROM entities WHERE kind = ?1 ORDER BY id",
            ENTITY_COLUMNS
        );
        self.query_entities(&sql, params![kind.as_str()])
    }

    fn find_by_name(&self, kind: EntityKind, name: &str) -> Result<Vec<RegistryEntity>> {
        let sql = format!(
            "SELECT {} FROM entities WHERE kind = ?1 AND name = ?2 ORDER BY id",
            ENTITY_COLUMNS
        );
        self.query_entities(&sql, params![kind.as_str(), name])
    }

    fn get(&self, id: EntityId) -> Result<RegistryEntity> {
        let sql = format!("SELECT {} FROM entities WHERE id = ?1", ENTITY_COLUMNS);
        self.query_entities(&sql, params![id.as_i64()])?
            .into_iter()
            .next()
            .ok_or_else(|| Self::not_found(id, "get"))
    }

    fn create(&mut self, draft: EntityDraft) -> Result<RegistryEntity> {
        validate_draft(&draft, |id| self.parent_of(id).is_some())
            .map_err(|e| ExError::from(e).with_op("create"))?;
        self.check_tag_free(draft.kind, draft.external_id_tag.as_deref(), None)
            .map_err(|e| e.with_op("create"))?;

        let fields = encode_fields(&draft.fields)?;
        let now = chrono::Utc::now().timestamp();
        self.conn
            .execute(
                "INSERT INTO entities (kind, external_id_tag, name, parent_id, fields, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    draft.kind.as_str(),
                    draft.external_id_tag,
                    draft.name,
                    draft.parent.map(|p| p.as_i64()),
                    fields,
                    now,
                ],
            )
            .map_err(|e| from_rusqlite(e).with_op("create"))?;

        let id = EntityId(self.conn.last_insert_rowid());
        Ok(RegistryEntity::from_draft(id, draft))
    }

    fn update(&mut self, entity: &RegistryEntity) -> Result<()> {
        let stored = self.get(entity.id).map_err(|e| e.with_op("update"))?;
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

        let fields = encode_fields(&entity.fields)?;
        let now = chrono::Utc::now().timestamp();
        self.conn
            .execute(
                "UPDATE entities
                 SET external_id_tag = ?1, name = ?2, parent_id = ?3, fields = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    entity.external_id_tag,
                    entity.name,
                    entity.parent.map(|p| p.as_i64()),
                    fields,
                    now,
                    entity.id.as_i64(),
                ],
            )
            .map_err(|e| from_rusqlite(e).with_op("update"))?;
        Ok(())
    }

    fn delete(&mut self, id: EntityId) -> Result<()> {
        let tx = self.conn.transaction().map_err(from_rusqlite)?;

        let removed = tx
            .execute("DELETE FROM entities WHERE id = ?1", [id.as_i64()])
            .map_err(|e| from_rusqlite(e).with_op("delete"))?;
        if removed == 0 {
            return Err(Self::not_found(id, "delete"));
        }

        tx.execute(
            "UPDATE entities SET parent_id = NULL WHERE parent_id = ?1",
            [id.as_i64()],
        )
        .map_err(from_rusqlite)?;
        detach_field_refs(&tx, id)?;

        tx.commit().map_err(from_rusqlite)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_increasing_ids() {
        let mut store = SqliteRegistry::open_in_memory().unwrap();
        let a = store
            .create(EntityDraft::new(EntityKind::ContactGroup, "A").with_tag("1"))
            .unwrap();
        let b = store
            .create(EntityDraft::new(EntityKind::ContactGroup, "B").with_tag("2"))
            .unwrap();
        assert!(b.id > a.id);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = SqliteRegistry::open_in_memory().unwrap();
        let err = store.get(EntityId(99)).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
    }
}
