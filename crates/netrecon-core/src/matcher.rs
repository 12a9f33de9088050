//! Entity matching.
//!
//! Resolves a tracked registry entity against the observation set of one
//! run: external id first, then exact display name, escalating to an
//! ambiguous result when several observations share the name.

use crate::model::{Observation, RegistryEntity};

/// How a unique match was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchVia {
    /// The observation's external id equals the entity's tag
    ExternalId,
    /// Found by name under a different external id; the tag must be relinked
    Name,
}

/// Result of resolving one entity against the observation set
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult<'a, R> {
    /// No candidate: the entity no longer exists upstream
    NoMatch,
    /// Exactly one candidate
    UniqueMatch { record: &'a R, via: MatchVia },
    /// Two or more observations share the entity's name, in snapshot order
    AmbiguousMatch(Vec<&'a R>),
}

impl<R: Observation> MatchResult<'_, R> {
    /// External ids of all candidates
    pub fn candidate_ids(&self) -> Vec<String> {
        match self {
            MatchResult::NoMatch => vec![],
            MatchResult::UniqueMatch { record, .. } => vec![record.external_id().to_string()],
            MatchResult::AmbiguousMatch(records) => records
                .iter()
                .map(|r| r.external_id().to_string())
                .collect(),
        }
    }
}

/// Whether the name fallback is tried after the external id lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameFallback {
    Enabled,
    /// For kinds whose names repeat across parents (interfaces, addresses)
    Disabled,
}

/// Resolve an entity with the name fallback enabled
pub fn resolve<'a, R: Observation>(entity: &RegistryEntity, observations: &'a [R]) -> MatchResult<'a, R> {
    resolve_with(entity, observations, NameFallback::Enabled)
}

/// Resolve an entity against the observation set
///
/// The external id match wins regardless of any other field. Name matching
/// is case-sensitive and exact; an entity with an empty name never takes the
/// name fallback.
pub fn resolve_with<'a, R: Observation>(
    entity: &RegistryEntity,
    observations: &'a [R],
    fallback: NameFallback,
) -> MatchResult<'a, R> {
    if let Some(tag) = entity.tag() {
        if let Some(record) = observations.iter().find(|o| o.external_id() == tag) {
            return MatchResult::UniqueMatch {
                record,
                via: MatchVia::ExternalId,
            };
        }
    }

    if fallback == NameFallback::Disabled || entity.name.is_empty() {
        return MatchResult::NoMatch;
    }

    let mut by_name: Vec<&R> = observations
        .iter()
        .filter(|o| o.display_name() == entity.name)
        .collect();
    match by_name.len() {
        0 => MatchResult::NoMatch,
        1 => MatchResult::UniqueMatch {
            record: by_name.remove(0),
            via: MatchVia::Name,
        },
        _ => MatchResult::AmbiguousMatch(by_name),
    }
}
