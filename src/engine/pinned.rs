//! Pin and unpin handling.
//!
//! Pinned tabs form a prefix of root entries. Pinning moves a tab to the end
//! of that prefix, unpinning sends it to the end of the forest.
//!
//! Detaching for a pin hands every child to the tab's own parent, unlike
//! removal which promotes the first child. Both keep the forest valid.

use super::MutationEngine;
use crate::error::StoreError;
use crate::forest::{Collection, Forest, ForestEntry, TabId, WindowId};
use crate::notify::ChangeEvent;
use std::collections::HashSet;

/// Take `tab` out of the tree, re-hanging its children on its parent
pub fn detach(forest: &mut Forest, tab: TabId) -> Option<ForestEntry> {
    let removed = forest.remove(tab)?;
    forest.reparent_children(tab, removed.parent);
    Some(removed)
}

/// Insert `tab` as a root right after the last entry the host reports
/// pinned, stopping at the first entry that is not
pub fn place_pinned<F>(forest: &mut Forest, tab: TabId, is_pinned: F)
where
    F: Fn(TabId) -> bool,
{
    let mut last_pinned = None;
    for entry in forest.iter() {
        if !is_pinned(entry.tab) {
            break;
        }
        if entry.tab != tab {
            last_pinned = Some(entry.tab);
        }
    }

    let index = last_pinned
        .and_then(|last| forest.index_of(last))
        .map_or(0, |i| i + 1);
    forest.insert_at(index, tab, None);
}

impl MutationEngine {
    /// Apply a pinned-state change reported by the host
    pub async fn on_pinned_changed(
        &self,
        tab_id: TabId,
        pinned: bool,
        window_id: WindowId,
    ) -> Result<(), StoreError> {
        self.store
            .run_exclusive(|guard| async move {
                let mut collection = self.store.get(&guard);
                if !self
                    .reposition_pinned(&mut collection, tab_id, pinned, window_id, false)
                    .await
                {
                    return Ok(());
                }

                self.store.set(&guard, &collection)?;
                self.hub.publish(ChangeEvent::ResyncRequested { window_id });
                Ok(())
            })
            .await
    }

    /// Tabs the host currently reports pinned in `window_id`. A failed query
    /// counts as none pinned.
    pub(crate) async fn host_pinned(&self, window_id: WindowId) -> HashSet<TabId> {
        match self.host.query_tabs(window_id).await {
            Ok(tabs) => tabs.iter().filter(|t| t.pinned).map(|t| t.id).collect(),
            Err(e) => {
                log::debug!("Could not query tabs of window {}: {}", window_id, e);
                HashSet::new()
            }
        }
    }

    /// Move `tab_id` to where its pinned state says it belongs.
    ///
    /// Runs inside the caller's exclusive body. `is_created` means the tab
    /// is not in the forest yet. Returns `false` when nothing was changed.
    pub(crate) async fn reposition_pinned(
        &self,
        collection: &mut Collection,
        tab_id: TabId,
        pinned: bool,
        window_id: WindowId,
        is_created: bool,
    ) -> bool {
        let Some(forest) = collection.get(window_id) else {
            log::debug!("Pin change for tab {} in untracked window {}", tab_id, window_id);
            return false;
        };
        if !is_created && !forest.contains(tab_id) {
            log::debug!("Pin change for untracked tab {}", tab_id);
            return false;
        }

        let host_pinned = if pinned {
            self.host_pinned(window_id).await
        } else {
            HashSet::new()
        };

        let Some(forest) = collection.get_mut(window_id) else {
            return false;
        };
        if !is_created {
            detach(forest, tab_id);
        }
        if pinned {
            place_pinned(forest, tab_id, |t| host_pinned.contains(&t));
        } else {
            forest.push(tab_id, None);
        }
        true
    }
}
