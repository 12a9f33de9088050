//! Human-readable rendering of change sets for action log lines.

use crate::diff::model::ChangeSet;

/// Render a change set as `field: old -> new` items joined by `, `
///
/// An empty change set renders as `no changes`.
pub fn render_change_summary(changes: &ChangeSet) -> String {
    if changes.is_empty() {
        return "no changes".to_string();
    }
    changes
        .iter()
        .map(|c| format!("{}: {} -> {}", c.target, c.old, c.new))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the values of a creation as `field=value` items
pub fn render_field_list(changes: &ChangeSet) -> String {
    changes
        .iter()
        .map(|c| format!("{}={}", c.target, c.new))
        .collect::<Vec<_>>()
        .join(", ")
}
