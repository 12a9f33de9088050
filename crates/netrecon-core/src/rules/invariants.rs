use std::collections::HashSet;

use crate::model::EntityId;

/// Check whether setting `parent` on entity `id` would close a parent cycle
///
/// Walks the parent chain upward from `parent` using `parent_of`. Stops at a
/// root or at an id the lookup does not know.
pub fn creates_parent_cycle<F>(id: EntityId, parent: Option<EntityId>, parent_of: F) -> bool
where
    F: Fn(EntityId) -> Option<Option<EntityId>>,
{
    let mut visited = HashSet::new();
    let mut current = parent;

    while let Some(node) = current {
        if node == id || !visited.insert(node) {
            return true;
        }
        current = match parent_of(node) {
            Some(next) => next,
            None => break,
        };
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_detects_cycle_through_chain() {
        // 1 -> 2 -> 3 (root)
        let parents: HashMap<EntityId, Option<EntityId>> = [
            (EntityId(1), Some(EntityId(2))),
            (EntityId(2), Some(EntityId(3))),
            (EntityId(3), None),
        ]
        .into_iter()
        .collect();
        let lookup = |id: EntityId| parents.get(&id).copied();

        assert!(creates_parent_cycle(EntityId(3), Some(EntityId(1)), lookup));
        assert!(!creates_parent_cycle(EntityId(4), Some(EntityId(1)), lookup));
        assert!(creates_parent_cycle(EntityId(5), Some(EntityId(5)), lookup));
    }
}
