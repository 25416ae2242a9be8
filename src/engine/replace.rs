//! Tab id swaps (discard, reload into a new process).

use super::MutationEngine;
use crate::error::StoreError;
use crate::forest::{Forest, TabId};
use crate::notify::ChangeEvent;

/// Put `new` where `old` was, with the same parent, and re-point `old`'s
/// children at `new`. Returns `false` if `old` is not in the forest.
pub fn replace_in_place(forest: &mut Forest, old: TabId, new: TabId) -> bool {
    if !forest.contains(old) {
        return false;
    }
    if old == new {
        return true;
    }

    // A stray entry for the new id would become a duplicate
    forest.remove(new);

    let Some(index) = forest.index_of(old) else {
        return false;
    };
    let Some(entry) = forest.remove(old) else {
        return false;
    };
    forest.insert_at(index, new, entry.parent);
    forest.reparent_children(old, Some(new));
    true
}

impl MutationEngine {
    /// Carry a tab's position over to its new id
    pub async fn on_tab_replaced(&self, added: TabId, removed: TabId) -> Result<(), StoreError> {
        self.store
            .run_exclusive(|guard| async move {
                let mut collection = self.store.get(&guard);

                let reported = match self.host.tab(added).await {
                    Ok(tab) => Some(tab.window_id),
                    Err(e) => {
                        log::debug!("Replacement tab {} not found on host: {}", added, e);
                        None
                    }
                };
                let window_id = reported
                    .filter(|w| collection.get(*w).is_some_and(|f| f.contains(removed)))
                    .or_else(|| collection.window_of(removed));

                let Some(window_id) = window_id else {
                    log::debug!("Replace of untracked tab {}", removed);
                    return Ok(());
                };
                let Some(forest) = collection.get_mut(window_id) else {
                    return Ok(());
                };
                if !replace_in_place(forest, removed, added) {
                    return Ok(());
                }

                self.store.set(&guard, &collection)?;
                self.hub.publish(ChangeEvent::TabReplaced {
                    window_id,
                    old_id: removed,
                    new_id: added,
                });
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_keeps_position_and_children() {
        let mut f = Forest::from_pairs([(1, None), (2, Some(1)), (3, Some(2)), (4, None)]);
        assert!(replace_in_place(&mut f, 2, 20));
        assert_eq!(
            f.to_pairs(),
            vec![(1, None), (20, Some(1)), (3, Some(20)), (4, None)]
        );
        assert!(f.check_invariants().is_ok());
    }

    #[test]
    fn test_replace_missing_old() {
        let mut f = Forest::from_pairs([(1, None)]);
        assert!(!replace_in_place(&mut f, 5, 6));
        assert_eq!(f.to_pairs(), vec![(1, None)]);
    }

    #[test]
    fn test_replace_drops_stray_new_entry() {
        let mut f = Forest::from_pairs([(7, None), (1, None), (2, Some(1))]);
        assert!(replace_in_place(&mut f, 1, 7));
        assert_eq!(f.to_pairs(), vec![(7, None), (2, Some(7))]);
    }
}
