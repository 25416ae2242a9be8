//! Tab removal and re-parenting of the orphans it leaves.

use super::MutationEngine;
use crate::error::StoreError;
use crate::forest::{Forest, ForestEntry, TabId, WindowId};
use crate::notify::ChangeEvent;

/// Delete `tab` and promote its first child into its place.
///
/// The first former child takes the removed tab's parent; every later
/// former child is re-hung under that first child. Grandchildren keep their
/// parents, so the run stays contiguous.
pub fn remove_and_promote(forest: &mut Forest, tab: TabId) -> Option<ForestEntry> {
    let removed = forest.remove(tab)?;

    let children = forest.children(tab);
    if let Some((first, rest)) = children.split_first() {
        forest.set(*first, removed.parent);
        for child in rest {
            forest.set(*child, Some(*first));
        }
    }

    Some(removed)
}

impl MutationEngine {
    /// Forget a closed tab, closing its window if it was the last one
    pub async fn on_tab_removed(&self, tab_id: TabId, window_id: WindowId) -> Result<(), StoreError> {
        self.store
            .run_exclusive(|guard| async move {
                let mut collection = self.store.get(&guard);
                let Some(forest) = collection.get_mut(window_id) else {
                    log::debug!("Remove of tab {} in untracked window {}", tab_id, window_id);
                    return Ok(());
                };
                if remove_and_promote(forest, tab_id).is_none() {
                    log::debug!("Remove of untracked tab {}", tab_id);
                    return Ok(());
                }

                let emptied = forest.is_empty();
                if emptied {
                    collection.remove(window_id);
                }
                self.store.set(&guard, &collection)?;

                if emptied {
                    self.windows.close_if_present(window_id).await;
                } else {
                    self.hub
                        .publish(ChangeEvent::TabRemoved { window_id, tab_id });
                }
                Ok(())
            })
            .await
    }
}
