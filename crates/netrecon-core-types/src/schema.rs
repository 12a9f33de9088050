//! Canonical schema constants for structured logging and events
//!
//! These constants keep the action log consistent between the engine,
//! the store adapters and the CLI.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Entity identifiers
pub const FIELD_KIND: &str = "kind";
pub const FIELD_ENTITY_ID: &str = "entity_id";
pub const FIELD_EXTERNAL_ID: &str = "external_id";
pub const FIELD_ACTION: &str = "action";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_ACTION: &str = "action";

// Reconciliation action names
pub const ACTION_CREATE: &str = "create";
pub const ACTION_UPDATE: &str = "update";
pub const ACTION_DELETE: &str = "delete";
pub const ACTION_RETIRE: &str = "retire";
pub const ACTION_AMBIGUOUS: &str = "ambiguous";
pub const ACTION_FAILURE: &str = "failure";
pub const ACTION_UNCHANGED: &str = "unchanged";
pub const ACTION_RELINK: &str = "relink";
pub const ACTION_ADOPT: &str = "adopt";
pub const ACTION_KEEP: &str = "keep";
pub const ACTION_SKIP: &str = "skip";
pub const ACTION_ADVISORY: &str = "advisory";
