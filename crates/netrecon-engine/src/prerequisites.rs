//! Registry objects a pipeline needs before its first sweep.

#![allow(clippy::result_large_err)]

use netrecon_core::errors::ExError;
use netrecon_core::kinds::proxmox::{CLUSTER_TYPE, VM_ROLE};
use netrecon_core::model::EntityKind;
use netrecon_core::ops::RegistryStore;

use crate::config::ReconConfig;
use crate::engine::{Ensured, ReconciliationEngine};
use crate::summary::KindSummary;

/// Node roles, as reported by the Proxmox snapshot
pub const ROLE_PVE: &str = "PVE";
pub const ROLE_PBS: &str = "PBS";

/// One object ensured by `(kind, name)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerequisite {
    pub kind: EntityKind,
    pub name: String,
    /// Extra fields written when the object has to be created
    pub fields: Vec<(String, String)>,
}

impl Prerequisite {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = name.to_lowercase().replace(' ', "-");
        Self {
            kind,
            name,
            fields: vec![("slug".to_string(), slug)],
        }
    }
}

/// What a Proxmox sweep needs: its tag, the cluster type and the device roles
pub fn proxmox(config: &ReconConfig) -> Vec<Prerequisite> {
    vec![
        Prerequisite::new(EntityKind::Tag, config.proxmox_tag.as_str()),
        Prerequisite::new(EntityKind::ClusterType, CLUSTER_TYPE),
        Prerequisite::new(EntityKind::DeviceRole, ROLE_PVE),
        Prerequisite::new(EntityKind::DeviceRole, ROLE_PBS),
        Prerequisite::new(EntityKind::DeviceRole, VM_ROLE),
    ]
}

/// Ensure every prerequisite in order and record one summary per kind
///
/// # Errors
///
/// `MissingDependency` on the first object that cannot be ensured; the
/// caller must not sweep anything that depends on it.
pub fn ensure_all<S: RegistryStore + ?Sized>(
    engine: &mut ReconciliationEngine<'_, S>,
    prerequisites: &[Prerequisite],
) -> Result<(), ExError> {
    let mut summaries: Vec<KindSummary> = Vec::new();
    for prerequisite in prerequisites {
        let fields: Vec<(&str, &str)> = prerequisite
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let ensured = engine.ensure_prerequisite(prerequisite.kind, &prerequisite.name, &fields)?;

        let index = match summaries.iter().position(|s| s.kind == Some(prerequisite.kind)) {
            Some(index) => index,
            None => {
                summaries.push(KindSummary::new(prerequisite.kind));
                summaries.len() - 1
            }
        };
        let summary = &mut summaries[index];
        match ensured {
            Ensured::Existing(_) => summary.unchanged += 1,
            Ensured::Adopted(_) => summary.updated += 1,
            Ensured::Created(_) => summary.created += 1,
        }
    }
    for summary in summaries {
        engine.record_summary(summary);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RunMode;
    use netrecon_core::model::EntityDraft;
    use netrecon_core::InMemoryRegistry;

    #[test]
    fn test_proxmox_prerequisites_created_once() {
        let mut store = InMemoryRegistry::new();
        let config = ReconConfig::default();
        {
            let mut engine = ReconciliationEngine::new(&mut store, config.clone(), RunMode::Commit);
            ensure_all(&mut engine, &proxmox(&config)).unwrap();
            let report = engine.finish();
            assert_eq!(report.summary_for(EntityKind::DeviceRole).created, 3);
        }
        let mut engine = ReconciliationEngine::new(&mut store, config.clone(), RunMode::Commit);
        ensure_all(&mut engine, &proxmox(&config)).unwrap();
        let report = engine.finish();
        assert_eq!(report.totals().created, 0);
        assert_eq!(report.summary_for(EntityKind::DeviceRole).unchanged, 3);
    }

    #[test]
    fn test_untracked_role_is_adopted() {
        let mut store = InMemoryRegistry::new();
        let existing = store
            .create(EntityDraft::new(EntityKind::DeviceRole, "PVE"))
            .unwrap();

        let mut engine = ReconciliationEngine::new(&mut store, ReconConfig::default(), RunMode::Commit);
        ensure_all(&mut engine, &[Prerequisite::new(EntityKind::DeviceRole, "PVE")]).unwrap();
        engine.finish();

        let role = store.get(existing.id).unwrap();
        assert_eq!(role.tag(), Some("PVE"));
        assert_eq!(store.len(), 1);
    }
}
