//! Write-time validation of registry entities.

pub mod invariants;
pub mod validation;

pub use validation::{validate_draft, validate_entity};
