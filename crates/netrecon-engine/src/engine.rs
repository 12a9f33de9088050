//! Reconciliation engine.
//!
//! ## Sweep of one kind (in order):
//! 1. Pass 1: every tracked entity the profile owns is resolved against the
//!    observation set. No match retires it per the profile's policy, a
//!    unique match is diffed and updated (relinking the tag when matched by
//!    name), an ambiguous match is reported and left alone.
//! 2. Pass 2: every accepted observation is looked up by tag (optionally
//!    adopting a single untracked entity of the same name), then diffed and
//!    updated, or created.
//!
//! Store failures while handling a single entity become failure lines and
//! the sweep moves on; failing to list the kind and missing prerequisites
//! abort it.

#![allow(clippy::result_large_err)]

use std::collections::BTreeSet;

use netrecon_core::diff::{diff, diff_with, render_change_summary, render_field_list, Unresolved};
use netrecon_core::errors::{ExError, ReconError};
use netrecon_core::matcher::{resolve_with, MatchResult, MatchVia};
use netrecon_core::model::{EntityDraft, EntityId, EntityKind, Observation, RegistryEntity};
use netrecon_core::ops::RegistryStore;
use netrecon_core::profile::{KindProfile, RetirePolicy};
use netrecon_core::{log_action, log_op_end, log_op_error, log_op_start};
use netrecon_core_types::RunContext;
use serde::Serialize;

use crate::config::ReconConfig;
use crate::staging::StagedStore;
use crate::summary::{Action, ActionLogEntry, KindSummary, LogLevel, RunReport};

/// Whether writes reach the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Commit,
    /// Writes are staged in memory and discarded at the end of the run
    DryRun,
}

impl RunMode {
    pub fn from_commit_flag(commit: bool) -> Self {
        if commit {
            RunMode::Commit
        } else {
            RunMode::DryRun
        }
    }
}

/// Store the engine writes through: the real one, or an overlay on it
enum Target<'s, S: RegistryStore + ?Sized> {
    Direct(&'s mut S),
    Staged(StagedStore<'s, S>),
}

impl<S: RegistryStore + ?Sized> RegistryStore for Target<'_, S> {
    fn find_by_tag(&self, kind: EntityKind, tag: &str) -> Result<Option<RegistryEntity>, ExError> {
        match self {
            Target::Direct(store) => store.find_by_tag(kind, tag),
            Target::Staged(store) => store.find_by_tag(kind, tag),
        }
    }

    fn find_all_of_kind(&self, kind: EntityKind) -> Result<Vec<RegistryEntity>, ExError> {
        match self {
            Target::Direct(store) => store.find_all_of_kind(kind),
            Target::Staged(store) => store.find_all_of_kind(kind),
        }
    }

    fn find_by_name(&self, kind: EntityKind, name: &str) -> Result<Vec<RegistryEntity>, ExError> {
        match self {
            Target::Direct(store) => store.find_by_name(kind, name),
            Target::Staged(store) => store.find_by_name(kind, name),
        }
    }

    fn get(&self, id: EntityId) -> Result<RegistryEntity, ExError> {
        match self {
            Target::Direct(store) => store.get(id),
            Target::Staged(store) => store.get(id),
        }
    }

    fn create(&mut self, draft: EntityDraft) -> Result<RegistryEntity, ExError> {
        match self {
            Target::Direct(store) => store.create(draft),
            Target::Staged(store) => store.create(draft),
        }
    }

    fn update(&mut self, entity: &RegistryEntity) -> Result<(), ExError> {
        match self {
            Target::Direct(store) => store.update(entity),
            Target::Staged(store) => store.update(entity),
        }
    }

    fn delete(&mut self, id: EntityId) -> Result<(), ExError> {
        match self {
            Target::Direct(store) => store.delete(id),
            Target::Staged(store) => store.delete(id),
        }
    }
}

/// Outcome of ensuring one prerequisite object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    Existing(EntityId),
    Adopted(EntityId),
    Created(EntityId),
}

impl Ensured {
    pub fn id(&self) -> EntityId {
        match self {
            Ensured::Existing(id) | Ensured::Adopted(id) | Ensured::Created(id) => *id,
        }
    }
}

/// Two-pass reconciliation of kind profiles against one registry
pub struct ReconciliationEngine<'s, S: RegistryStore + ?Sized> {
    store: Target<'s, S>,
    config: ReconConfig,
    context: RunContext,
    report: RunReport,
}

impl<'s, S: RegistryStore + ?Sized> ReconciliationEngine<'s, S> {
    pub fn new(store: &'s mut S, config: ReconConfig, mode: RunMode) -> Self {
        Self::with_context(store, config, mode, RunContext::new())
    }

    pub fn with_context(store: &'s mut S, config: ReconConfig, mode: RunMode, context: RunContext) -> Self {
        let store = match mode {
            RunMode::Commit => Target::Direct(store),
            RunMode::DryRun => Target::Staged(StagedStore::new(store)),
        };
        let mut report = RunReport::new(context.run_id.clone(), mode);
        report.pipeline = context.pipeline.clone();
        Self {
            store,
            config,
            context,
            report,
        }
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    pub fn mode(&self) -> RunMode {
        self.report.mode
    }

    /// Read access to the store as the run currently sees it
    pub fn store(&self) -> &dyn RegistryStore {
        &self.store
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Record the digest of the snapshot this run reconciles
    pub fn set_snapshot_digest(&mut self, digest: impl Into<String>) {
        self.report.snapshot_digest = Some(digest.into());
    }

    /// Close the run and hand back its report; staged writes are dropped
    pub fn finish(mut self) -> RunReport {
        self.report.finished_at = Some(chrono::Utc::now());
        let totals = self.report.totals();
        tracing::info!(
            component = module_path!(),
            run_id = %self.context.run_id,
            mode = ?self.report.mode,
            created = totals.created,
            updated = totals.updated,
            deleted = totals.deleted,
            warned = totals.warned,
            failed = totals.failed,
            "run finished"
        );
        self.report
    }

    /// Reconcile one kind against its observation set
    ///
    /// # Errors
    ///
    /// Failing to list the kind and any non entity-local error abort the
    /// sweep. Entity-local failures are counted in `failed` instead.
    pub fn reconcile<P: KindProfile>(
        &mut self,
        profile: &P,
        observations: &[P::Record],
    ) -> Result<KindSummary, ExError> {
        let kind = profile.kind();
        log_op_start!("reconcile", kind = kind.as_str(), run_id = %self.context.run_id);
        let start = std::time::Instant::now();

        match self.sweep(profile, observations) {
            Ok(summary) => {
                log_op_end!(
                    "reconcile",
                    duration_ms = start.elapsed().as_millis() as u64,
                    kind = kind.as_str(),
                    created = summary.created,
                    updated = summary.updated,
                    deleted = summary.deleted,
                    failed = summary.failed
                );
                self.report.summaries.push(summary.clone());
                Ok(summary)
            }
            Err(err) => {
                log_op_error!(
                    "reconcile",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    kind = kind.as_str()
                );
                Err(err.with_run_id(self.context.run_id.clone()))
            }
        }
    }

    fn sweep<P: KindProfile>(
        &mut self,
        profile: &P,
        observations: &[P::Record],
    ) -> Result<KindSummary, ExError> {
        let kind = profile.kind();
        let mut summary = KindSummary::new(kind);
        let accepted: Vec<&P::Record> = observations.iter().filter(|r| profile.accepts(r)).collect();
        // Entities written in pass 1 are not counted again in pass 2.
        let mut touched: BTreeSet<EntityId> = BTreeSet::new();

        let owned: Vec<RegistryEntity> = self
            .store
            .find_all_of_kind(kind)?
            .into_iter()
            .filter(|e| profile.owns(e))
            .collect();

        // Records whose entity already failed in pass 1 are not retried.
        let mut failed: BTreeSet<String> = BTreeSet::new();

        for entity in owned {
            let candidates = match self.unclaimed(kind, &entity, &accepted) {
                Ok(candidates) => candidates,
                Err(err) => {
                    self.isolate(Err(err), kind, entity_key(&entity), &mut summary)?;
                    continue;
                }
            };
            let mut matched = None;
            let outcome = match resolve_with(&entity, &candidates, profile.name_fallback()) {
                MatchResult::NoMatch => self.retire(profile, &entity, &mut summary, &mut touched),
                MatchResult::UniqueMatch { record, via } => {
                    matched = Some(record.external_id().to_string());
                    self.refresh(profile, &entity, *record, via, &mut summary, &mut touched)
                }
                MatchResult::AmbiguousMatch(candidates) => {
                    let ids: Vec<String> = candidates.iter().map(|c| c.external_id().to_string()).collect();
                    let err = ExError::from(ReconError::AmbiguousMatch {
                        name: entity.name.clone(),
                        candidates: ids.clone(),
                    });
                    self.log(
                        Action::Ambiguous,
                        kind,
                        entity_key(&entity),
                        format!(
                            "{} matches several records by name ({}), left unchanged [{}]",
                            entity.label(),
                            ids.join(", "),
                            err.code()
                        ),
                    );
                    summary.warned += 1;
                    Ok(())
                }
            };
            let key = matched.clone().unwrap_or_else(|| entity_key(&entity));
            if self.isolate(outcome, kind, key, &mut summary)? {
                failed.extend(matched);
            }
        }

        for record in accepted {
            if failed.contains(record.external_id()) {
                continue;
            }
            let outcome = self.upsert(profile, record, &mut summary, &touched);
            self.isolate(outcome, kind, record.external_id().to_string(), &mut summary)?;
        }

        Ok(summary)
    }

    /// Observations `entity` may match: name matches whose external id is
    /// already another entity's tag are dropped, so a stale entity sharing a
    /// name with a live one retires instead of relinking onto a taken tag.
    fn unclaimed<'r, R: Observation>(
        &self,
        kind: EntityKind,
        entity: &RegistryEntity,
        accepted: &[&'r R],
    ) -> Result<Vec<&'r R>, ExError> {
        let mut candidates = Vec::with_capacity(accepted.len());
        for record in accepted {
            let external_id = record.external_id();
            let keep = if entity.tag() == Some(external_id) || record.display_name() != entity.name {
                true
            } else {
                match self.store.find_by_tag(kind, external_id)? {
                    Some(holder) => holder.id == entity.id,
                    None => true,
                }
            };
            if keep {
                candidates.push(*record);
            }
        }
        Ok(candidates)
    }

    /// Pass 1, no match
    fn retire<P: KindProfile>(
        &mut self,
        profile: &P,
        entity: &RegistryEntity,
        summary: &mut KindSummary,
        touched: &mut BTreeSet<EntityId>,
    ) -> Result<(), ExError> {
        let kind = profile.kind();
        match profile.retire_policy() {
            RetirePolicy::Delete => {
                self.store
                    .delete(entity.id)
                    .map_err(|e| e.with_entity_kind(kind.as_str()))?;
                summary.deleted += 1;
                self.log(
                    Action::Delete,
                    kind,
                    entity_key(entity),
                    format!("REMOVED {}: no longer present upstream", entity.label()),
                );
            }
            RetirePolicy::Keep => {
                self.log(
                    Action::Keep,
                    kind,
                    entity_key(entity),
                    format!("{} not present upstream, kept", entity.label()),
                );
            }
            RetirePolicy::Mark { field, value } => {
                if entity.field(&field) == &value {
                    self.log(
                        Action::Keep,
                        kind,
                        entity_key(entity),
                        format!("{} not present upstream, already {}", entity.label(), value),
                    );
                    return Ok(());
                }
                let mut marked = entity.clone();
                marked.fields.insert(field.clone(), value.clone());
                self.store
                    .update(&marked)
                    .map_err(|e| e.with_entity_kind(kind.as_str()))?;
                summary.updated += 1;
                touched.insert(entity.id);
                self.log(
                    Action::Retire,
                    kind,
                    entity_key(entity),
                    format!(
                        "{} not present upstream: {}: {} -> {}",
                        entity.label(),
                        field,
                        entity.field(&field),
                        value
                    ),
                );
            }
        }
        Ok(())
    }

    /// Pass 1, unique match
    fn refresh<P: KindProfile>(
        &mut self,
        profile: &P,
        entity: &RegistryEntity,
        record: &P::Record,
        via: MatchVia,
        summary: &mut KindSummary,
        touched: &mut BTreeSet<EntityId>,
    ) -> Result<(), ExError> {
        let kind = profile.kind();
        let rules = profile.field_rules(record);
        // A reference to an observation pass 2 has yet to create is written there.
        let changes = diff_with(Some(entity), record, &rules, &self.store, Unresolved::Defer)?;
        if changes.is_empty() {
            return Ok(());
        }

        let mut updated = entity.clone();
        changes.apply(&mut updated);
        self.store
            .update(&updated)
            .map_err(|e| e.with_entity_kind(kind.as_str()).with_external_id(record.external_id()))?;
        summary.updated += 1;
        touched.insert(entity.id);

        let action = match via {
            MatchVia::ExternalId => Action::Update,
            MatchVia::Name => Action::Relink,
        };
        self.log(
            action,
            kind,
            record.external_id().to_string(),
            format!("{}: {}", entity.label(), render_change_summary(&changes)),
        );
        Ok(())
    }

    /// Pass 2
    fn upsert<P: KindProfile>(
        &mut self,
        profile: &P,
        record: &P::Record,
        summary: &mut KindSummary,
        touched: &BTreeSet<EntityId>,
    ) -> Result<(), ExError> {
        let kind = profile.kind();
        let external_id = record.external_id();

        let mut adopted = false;
        let existing = match self.store.find_by_tag(kind, external_id)? {
            Some(entity) => Some(entity),
            None if profile.adopts_untracked() => {
                let found = self.adoptable(kind, record.display_name())?;
                adopted = found.is_some();
                found
            }
            None => None,
        };

        let rules = profile.field_rules(record);
        let current = match existing {
            Some(entity) => {
                let changes = diff(Some(&entity), record, &rules, &self.store)?;
                if changes.is_empty() {
                    if !touched.contains(&entity.id) {
                        summary.unchanged += 1;
                        self.log(
                            Action::Unchanged,
                            kind,
                            external_id.to_string(),
                            format!("{} is up to date", entity.label()),
                        );
                    }
                    Some(entity)
                } else {
                    let mut updated = entity.clone();
                    changes.apply(&mut updated);
                    self.store.update(&updated).map_err(|e| {
                        e.with_entity_kind(kind.as_str()).with_external_id(external_id)
                    })?;
                    if !touched.contains(&entity.id) {
                        summary.updated += 1;
                    }
                    let action = if adopted { Action::Adopt } else { Action::Update };
                    self.log(
                        action,
                        kind,
                        external_id.to_string(),
                        format!("{}: {}", entity.label(), render_change_summary(&changes)),
                    );
                    Some(updated)
                }
            }
            None if profile.creates_missing() => {
                let changes = diff(None, record, &rules, &self.store)?;
                let created = self
                    .store
                    .create(changes.to_draft(kind))
                    .map_err(|e| e.with_entity_kind(kind.as_str()).with_external_id(external_id))?;
                summary.created += 1;
                self.log(
                    Action::Create,
                    kind,
                    external_id.to_string(),
                    format!("Adding {}: {}", created.label(), render_field_list(&changes)),
                );
                Some(created)
            }
            None => {
                self.log(
                    Action::Skip,
                    kind,
                    external_id.to_string(),
                    format!("no {} tagged {}, nothing to update", kind, external_id),
                );
                None
            }
        };

        for advisory in profile.advisories(record, current.as_ref()) {
            summary.warned += 1;
            self.log(Action::Advisory, kind, external_id.to_string(), advisory);
        }
        Ok(())
    }

    /// The single untracked entity of `kind` named `name`, if there is exactly one
    fn adoptable(&self, kind: EntityKind, name: &str) -> Result<Option<RegistryEntity>, ExError> {
        if name.is_empty() {
            return Ok(None);
        }
        let mut untracked: Vec<RegistryEntity> = self
            .store
            .find_by_name(kind, name)?
            .into_iter()
            .filter(|e| !e.is_tracked())
            .collect();
        if untracked.len() == 1 {
            Ok(untracked.pop())
        } else {
            Ok(None)
        }
    }

    /// Make sure an object of `kind` named `name` exists and is tagged with
    /// its name, so field rules can look it up
    ///
    /// # Errors
    ///
    /// `MissingDependency` when the object can neither be found nor created.
    pub fn ensure_prerequisite(
        &mut self,
        kind: EntityKind,
        name: &str,
        fields: &[(&str, &str)],
    ) -> Result<Ensured, ExError> {
        let run_id = self.context.run_id.clone();
        let missing = |cause: ExError| {
            ExError::from(ReconError::MissingDependency {
                kind: kind.to_string(),
                name: name.to_string(),
            })
            .with_message(format!("Missing required {} '{}': {}", kind, name, cause))
            .with_run_id(run_id.clone())
        };

        if let Some(found) = self.store.find_by_tag(kind, name).map_err(missing)? {
            return Ok(Ensured::Existing(found.id));
        }

        if let Some(mut found) = self.adoptable(kind, name).map_err(missing)? {
            found.external_id_tag = Some(name.to_string());
            self.store.update(&found).map_err(missing)?;
            self.log(
                Action::Adopt,
                kind,
                name.to_string(),
                format!("{} linked as prerequisite", found.label()),
            );
            return Ok(Ensured::Adopted(found.id));
        }

        let mut draft = EntityDraft::new(kind, name).with_tag(name);
        for (field, value) in fields {
            draft = draft.with_field(*field, *value);
        }
        let created = self.store.create(draft).map_err(missing)?;
        self.log(
            Action::Create,
            kind,
            name.to_string(),
            format!("Adding prerequisite {}", created.label()),
        );
        Ok(Ensured::Created(created.id))
    }

    /// Append a summary computed outside [`Self::reconcile`]
    pub fn record_summary(&mut self, summary: KindSummary) {
        self.report.summaries.push(summary);
    }

    /// Report an issue that concerns the run rather than one entity
    pub fn warn(&mut self, kind: EntityKind, entity: impl Into<String>, message: impl Into<String>) {
        self.log(Action::Advisory, kind, entity.into(), message.into());
    }

    /// Turn an entity-local error into a failure line and report whether
    /// one was logged; propagate the rest
    fn isolate(
        &mut self,
        outcome: Result<(), ExError>,
        kind: EntityKind,
        entity: String,
        summary: &mut KindSummary,
    ) -> Result<bool, ExError> {
        match outcome {
            Ok(()) => Ok(false),
            Err(err) if err.kind().is_entity_local() => {
                summary.failed += 1;
                self.log(Action::Failure, kind, entity, err.to_string());
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }

    fn log(&mut self, action: Action, kind: EntityKind, entity: String, message: String) {
        let level = action.level();
        match level {
            LogLevel::Debug => {
                log_action!(debug, action.as_str(), kind.as_str(), entity.as_str(), "{}", message);
            }
            LogLevel::Info => {
                log_action!(info, action.as_str(), kind.as_str(), entity.as_str(), "{}", message);
            }
            LogLevel::Change if action == Action::Delete => {
                log_action!(warn, action.as_str(), kind.as_str(), entity.as_str(), "{}", message);
            }
            LogLevel::Change => {
                log_action!(info, action.as_str(), kind.as_str(), entity.as_str(), "{}", message);
            }
            LogLevel::Warning => {
                log_action!(warn, action.as_str(), kind.as_str(), entity.as_str(), "{}", message);
            }
            LogLevel::Failure => {
                log_action!(error, action.as_str(), kind.as_str(), entity.as_str(), "{}", message);
            }
        }
        self.report.actions.push(ActionLogEntry {
            level,
            action,
            kind,
            entity,
            message,
        });
    }
}

/// Key an entity by its tag, falling back to its label
fn entity_key(entity: &RegistryEntity) -> String {
    entity
        .tag()
        .map(str::to_string)
        .unwrap_or_else(|| entity.label())
}
