//! Hydration layer - converts `entities` rows into registry entities

#![allow(clippy::result_large_err)]

use crate::errors::{corrupt_row, encode_error, Result};
use netrecon_core::model::{EntityId, EntityKind, FieldValue, RegistryEntity};
use rusqlite::Row;
use std::collections::BTreeMap;

/// Column list matching [`read_row`]
pub const ENTITY_COLUMNS: &str = "id, kind, external_id_tag, name, parent_id, fields";

/// Raw `entities` row before decoding
#[derive(Debug, Clone)]
pub struct EntityRow {
    pub id: i64,
    pub kind: String,
    pub external_id_tag: Option<String>,
    pub name: String,
    pub parent_id: Option<i64>,
    pub fields: String,
}

/// Read a row selected with [`ENTITY_COLUMNS`]
pub fn read_row(row: &Row<'_>) -> rusqlite::Result<EntityRow> {
    Ok(EntityRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        external_id_tag: row.get(2)?,
        name: row.get(3)?,
        parent_id: row.get(4)?,
        fields: row.get(5)?,
    })
}

/// Decode a raw row into a registry entity
///
/// # Errors
///
/// `Serialization` when the kind is unknown or the field map is not valid
/// JSON.
pub fn hydrate(row: EntityRow) -> Result<RegistryEntity> {
    let kind = EntityKind::parse(&row.kind)
        .ok_or_else(|| corrupt_row(row.id, &format!("unknown kind '{}'", row.kind)))?;
    let fields: BTreeMap<String, FieldValue> = serde_json::from_str(&row.fields)
        .map_err(|e| corrupt_row(row.id, &format!("invalid fields: {}", e)))?;

    Ok(RegistryEntity {
        id: EntityId(row.id),
        kind,
        external_id_tag: row.external_id_tag,
        name: row.name,
        parent: row.parent_id.map(EntityId),
        fields,
    })
}

/// Encode a field map for the `fields` column
///
/// Null values are dropped; a missing key reads back as `Null`.
pub fn encode_fields(fields: &BTreeMap<String, FieldValue>) -> Result<String> {
    let present: BTreeMap<&String, &FieldValue> =
        fields.iter().filter(|(_, v)| !v.is_null()).collect();
    serde_json::to_string(&present).map_err(encode_error)
}
