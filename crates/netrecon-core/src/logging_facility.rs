//! Structured logging for reconciliation runs
//!
//! Every event carries `component` and `event`; op boundaries add `op` and
//! `duration_ms`, and action lines add `action`, `kind` and `external_id`
//! so one entity's history can be filtered out of a run's log.
//!
//! ```rust
//! use netrecon_core::logging_facility::{init, Profile};
//!
//! init(Profile::parse("development"));
//! ```
//!
//! Macros: `log_op_start!`, `log_op_end!`, `log_op_error!` and
//! `log_action!`. Tests install [`init_test_capture`] instead of `init`.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
