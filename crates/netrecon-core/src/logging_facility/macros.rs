//! Canonical logging macros
//!
//! These macros provide a structured, consistent way to log operations and
//! reconciliation actions.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use netrecon_core::log_op_start;
/// log_op_start!("reconcile");
/// log_op_start!("reconcile", kind = "contact");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use netrecon_core::log_op_end;
/// log_op_end!("reconcile", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// # Example
///
/// ```
/// # use netrecon_core::{log_op_error, errors::ReconError};
/// let err = ReconError::EntityNotFound { entity_id: "7".to_string() };
/// log_op_error!("update", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        use $crate::errors::ExError;
        let ex_err: ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        use $crate::errors::ExError;
        let ex_err: ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            $($field)*
        );
    }};
}

/// Log one reconciliation action
///
/// `$level` is one of the `tracing` level macros (`debug`, `info`, `warn`,
/// `error`); the trailing arguments are the human-readable message.
///
/// # Example
///
/// ```
/// # use netrecon_core::log_action;
/// log_action!(info, "create", "contact_group", "831", "Adding group {}", "Dept A");
/// ```
#[macro_export]
macro_rules! log_action {
    ($level:ident, $action:expr, $kind:expr, $external_id:expr, $($arg:tt)+) => {
        tracing::$level!(
            component = module_path!(),
            event = $crate::schema::EVENT_ACTION,
            action = $action,
            kind = $kind,
            external_id = $external_id,
            $($arg)+
        );
    };
}
