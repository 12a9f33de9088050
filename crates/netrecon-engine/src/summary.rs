//! Run accounting: per-kind counters and the action log.

use netrecon_core::model::EntityKind;
use netrecon_core_types::schema;
use netrecon_core_types::RunId;
use serde::Serialize;
use std::fmt;

use crate::engine::RunMode;

/// Severity of an action log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Change,
    Warning,
    Failure,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Change => "change",
            LogLevel::Warning => "warning",
            LogLevel::Failure => "failure",
        }
    }
}

/// What the engine did to one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Relink,
    Adopt,
    Delete,
    Retire,
    Keep,
    Skip,
    Unchanged,
    Ambiguous,
    Advisory,
    Failure,
}

impl Action {
    /// Canonical action name used in structured log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => schema::ACTION_CREATE,
            Action::Update => schema::ACTION_UPDATE,
            Action::Relink => schema::ACTION_RELINK,
            Action::Adopt => schema::ACTION_ADOPT,
            Action::Delete => schema::ACTION_DELETE,
            Action::Retire => schema::ACTION_RETIRE,
            Action::Keep => schema::ACTION_KEEP,
            Action::Skip => schema::ACTION_SKIP,
            Action::Unchanged => schema::ACTION_UNCHANGED,
            Action::Ambiguous => schema::ACTION_AMBIGUOUS,
            Action::Advisory => schema::ACTION_ADVISORY,
            Action::Failure => schema::ACTION_FAILURE,
        }
    }

    /// Level the action is reported at
    pub fn level(&self) -> LogLevel {
        match self {
            Action::Keep | Action::Skip | Action::Unchanged => LogLevel::Debug,
            Action::Create
            | Action::Update
            | Action::Relink
            | Action::Adopt
            | Action::Delete
            | Action::Retire => LogLevel::Change,
            Action::Ambiguous | Action::Advisory => LogLevel::Warning,
            Action::Failure => LogLevel::Failure,
        }
    }
}

/// One line of the action log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionLogEntry {
    pub level: LogLevel,
    pub action: Action,
    pub kind: EntityKind,
    /// External id of the observation, or the entity label when there is none
    pub entity: String,
    pub message: String,
}

impl fmt::Display for ActionLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {}: {}",
            self.level.as_str(),
            self.action.as_str(),
            self.kind,
            self.entity,
            self.message
        )
    }
}

/// Counters for one reconciled kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub kind: Option<EntityKind>,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub warned: usize,
    pub failed: usize,
}

impl KindSummary {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Number of entities written
    pub fn mutations(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    fn absorb(&mut self, other: &KindSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.unchanged += other.unchanged;
        self.warned += other.warned;
        self.failed += other.failed;
    }
}

impl fmt::Display for KindSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind.map(|k| k.as_str()).unwrap_or("total");
        write!(
            f,
            "{}: created={} updated={} deleted={} unchanged={} warned={} failed={}",
            kind, self.created, self.updated, self.deleted, self.unchanged, self.warned, self.failed
        )
    }
}

/// Everything one run decided, in order
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub pipeline: Option<String>,
    pub mode: RunMode,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    /// SHA-256 of the snapshot the run was fed, when known
    pub snapshot_digest: Option<String>,
    pub summaries: Vec<KindSummary>,
    pub actions: Vec<ActionLogEntry>,
}

impl RunReport {
    pub fn new(run_id: RunId, mode: RunMode) -> Self {
        Self {
            run_id,
            pipeline: None,
            mode,
            started_at: chrono::Utc::now(),
            finished_at: None,
            snapshot_digest: None,
            summaries: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Counters summed over every kind
    pub fn totals(&self) -> KindSummary {
        let mut total = KindSummary::default();
        for summary in &self.summaries {
            total.absorb(summary);
        }
        total
    }

    /// Counters of one kind, summed when the kind was reconciled more than once
    pub fn summary_for(&self, kind: EntityKind) -> KindSummary {
        let mut total = KindSummary::new(kind);
        for summary in self.summaries.iter().filter(|s| s.kind == Some(kind)) {
            total.absorb(summary);
        }
        total
    }

    pub fn actions_at(&self, level: LogLevel) -> impl Iterator<Item = &ActionLogEntry> {
        self.actions.iter().filter(move |a| a.level == level)
    }

    /// Whether any entity failed
    pub fn has_failures(&self) -> bool {
        self.summaries.iter().any(|s| s.failed > 0)
    }

    /// Decisions of the run without timing, identity or store ids
    ///
    /// Two runs over the same store and snapshot yield the same decisions
    /// regardless of mode; only the ids quoted in messages differ.
    pub fn decisions(&self) -> Vec<(LogLevel, Action, EntityKind, String)> {
        self.actions
            .iter()
            .map(|a| (a.level, a.action, a.kind, a.entity.clone()))
            .collect()
    }

    /// Plain-text rendering for terminals, one line per action at or above
    /// `min_level`, followed by the counters
    pub fn render_text(&self, min_level: LogLevel) -> String {
        let mut out = String::new();
        for entry in self.actions.iter().filter(|a| a.level >= min_level) {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        for summary in &self.summaries {
            out.push_str(&summary.to_string());
            out.push('\n');
        }
        out.push_str(&self.totals().to_string());
        if self.mode == RunMode::DryRun {
            out.push_str(" (dry run, nothing written)");
        }
        out.push('\n');
        out
    }
}
