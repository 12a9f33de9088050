//! Field-level change detection.
//!
//! Compares a registry entity (or nothing, for a creation) with the ordered
//! field rules a kind profile derives from one observation, and produces
//! the minimal [`ChangeSet`].
//!
//! ## Entry point
//!
//! ```ignore
//! use netrecon_core::diff::{diff, render_change_summary};
//!
//! let changes = diff(Some(&entity), &record, &rules, &store)?;
//! let summary = render_change_summary(&changes);
//! ```
//!
//! ## Guarantees
//!
//! - **Order**: changes come out in rule order, with the tag relink first.
//! - **Conservative updates**: `PreserveWhenAbsent` rules never clear data.
//! - **Identity comparison**: references compare by resolved entity id.

pub mod engine;
pub mod human_summary;
pub mod model;

pub use engine::{diff, diff_with, RefResolver, Unresolved};
pub use human_summary::{render_change_summary, render_field_list};
pub use model::{ChangeSet, Compare, FieldChange, FieldRule, FieldTarget, Policy, ValueSource};
