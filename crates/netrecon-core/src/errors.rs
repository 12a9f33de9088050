use netrecon_core_types::RunId;
use thiserror::Error;

/// Result type alias using ReconError
pub type Result<T> = std::result::Result<T, ReconError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and the action log of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input/boundary
    InvalidInput,
    InvalidFormat,
    Config,

    // Registry
    NotFound,
    ValidationFailed,
    DuplicateTag,

    // Reconciliation policy
    AmbiguousMatch,
    MissingDependency,

    // Integration/IO
    SourceUnavailable,
    Persistence,
    Serialization,
    Io,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidFormat => "ERR_INVALID_FORMAT",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::ValidationFailed => "ERR_VALIDATION_FAILED",
            ExErrorKind::DuplicateTag => "ERR_DUPLICATE_TAG",
            ExErrorKind::AmbiguousMatch => "ERR_AMBIGUOUS_MATCH",
            ExErrorKind::MissingDependency => "ERR_MISSING_DEPENDENCY",
            ExErrorKind::SourceUnavailable => "ERR_SOURCE_UNAVAILABLE",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether an error of this kind is recovered at the entity boundary
    ///
    /// Store rejections are logged against the entity and the sweep moves on;
    /// everything else aborts the run.
    pub fn is_entity_local(&self) -> bool {
        matches!(
            self,
            ExErrorKind::NotFound
                | ExErrorKind::ValidationFailed
                | ExErrorKind::DuplicateTag
                | ExErrorKind::Persistence
                | ExErrorKind::InvalidFormat
        )
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling and the entity
/// context needed to write a useful failure line into the action log.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_kind: Option<String>,
    entity_id: Option<String>,
    external_id: Option<String>,
    run_id: Option<RunId>,
    message: String,
    candidates: Option<Vec<String>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_kind: None,
            entity_id: None,
            external_id: None,
            run_id: None,
            message: String::new(),
            candidates: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity kind context
    pub fn with_entity_kind(mut self, kind: impl Into<String>) -> Self {
        self.entity_kind = Some(kind.into());
        self
    }

    /// Add registry entity id context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add external id context
    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    /// Add run id context
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add candidate external ids (used for AmbiguousMatch)
    pub fn with_candidates(mut self, ids: Vec<String>) -> Self {
        self.candidates = Some(ids);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity kind context, if any
    pub fn entity_kind(&self) -> Option<&str> {
        self.entity_kind.as_deref()
    }

    /// Get the registry entity id context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the external id context, if any
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    /// Get the run id context, if any
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get candidate external ids, if any (populated on AmbiguousMatch)
    pub fn candidates(&self) -> Option<&[String]> {
        self.candidates.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(kind) = &self.entity_kind {
            write!(f, " (kind: {})", kind)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(external_id) = &self.external_id {
            write!(f, " (external_id: {})", external_id)?;
        }
        if let Some(candidates) = &self.candidates {
            write!(f, " (candidates: {})", candidates.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain error taxonomy for reconciliation operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconError {
    // ===== Source Errors =====
    /// The observation source could not be read
    #[error("Source {source_name} unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// The observation source returned a payload that does not validate
    #[error("Source {source_name} returned an invalid payload: {reason}")]
    InvalidPayload { source_name: String, reason: String },

    // ===== Format Errors =====
    /// Disk configuration string has no parseable size token
    #[error("Invalid disk configuration '{conf}': {reason}")]
    InvalidDiskConf { conf: String, reason: String },

    /// Network device configuration string is malformed
    #[error("Invalid network configuration '{conf}'")]
    InvalidNetConf { conf: String },

    // ===== Registry Errors =====
    /// Entity not found in the registry
    #[error("Entity not found: {entity_id}")]
    EntityNotFound { entity_id: String },

    /// Another entity of the same kind already carries this tag
    #[error("Duplicate {kind} tag: {tag}")]
    DuplicateTag { kind: String, tag: String },

    /// Entity name fails validation
    #[error("Invalid {kind} name: {reason}")]
    InvalidName { kind: String, reason: String },

    /// Entity references a parent or field target that does not exist
    #[error("{kind} references missing entity {reference}")]
    DanglingReference { kind: String, reference: String },

    // ===== Reconciliation Errors =====
    /// A prerequisite registry object could not be found or created
    #[error("Missing required {kind} '{name}'")]
    MissingDependency { kind: String, name: String },

    /// More than one observation shares the entity's name
    #[error("Ambiguous match for '{name}': {candidates:?}")]
    AmbiguousMatch {
        name: String,
        candidates: Vec<String>,
    },

    // ===== Generic Errors =====
    /// Serialization error (JSON/TOML encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from ReconError to ExError
impl From<ReconError> for ExError {
    fn from(err: ReconError) -> Self {
        let message = err.to_string();
        match err {
            ReconError::SourceUnavailable { source_name, .. } => {
                ExError::new(ExErrorKind::SourceUnavailable)
                    .with_op("fetch")
                    .with_entity_kind(source_name)
                    .with_message(message)
            }
            ReconError::InvalidPayload { source_name, .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("fetch")
                    .with_entity_kind(source_name)
                    .with_message(message)
            }
            ReconError::InvalidDiskConf { .. } => ExError::new(ExErrorKind::InvalidFormat)
                .with_op("parse_disk_conf")
                .with_message(message),
            ReconError::InvalidNetConf { .. } => ExError::new(ExErrorKind::InvalidFormat)
                .with_op("parse_net_config")
                .with_message(message),
            ReconError::EntityNotFound { entity_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(entity_id)
                .with_message(message),
            ReconError::DuplicateTag { kind, tag } => ExError::new(ExErrorKind::DuplicateTag)
                .with_entity_kind(kind)
                .with_external_id(tag)
                .with_message(message),
            ReconError::InvalidName { kind, .. } => ExError::new(ExErrorKind::ValidationFailed)
                .with_entity_kind(kind)
                .with_message(message),
            ReconError::DanglingReference { kind, reference } => {
                ExError::new(ExErrorKind::ValidationFailed)
                    .with_entity_kind(kind)
                    .with_entity_id(reference)
                    .with_message(message)
            }
            ReconError::MissingDependency { kind, .. } => {
                ExError::new(ExErrorKind::MissingDependency)
                    .with_op("ensure_prerequisite")
                    .with_entity_kind(kind)
                    .with_message(message)
            }
            ReconError::AmbiguousMatch { candidates, .. } => {
                ExError::new(ExErrorKind::AmbiguousMatch)
                    .with_op("resolve")
                    .with_candidates(candidates)
                    .with_message(message)
            }
            ReconError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            ReconError::Internal { .. } => ExError::new(ExErrorKind::Internal).with_message(message),
        }
    }
}
