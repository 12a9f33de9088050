//! Core types shared across netrecon facilities
//!
//! This crate provides foundational types used by both error handling
//! and logging facilities:
//!
//! - **Correlation types**: RunId, RunContext
//! - **Schema constants**: Canonical field keys, event names and action names

pub mod correlation;
pub mod schema;

pub use correlation::{RunContext, RunId};
