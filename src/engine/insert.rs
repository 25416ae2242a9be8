//! Placement of newly created tabs.

use super::MutationEngine;
use crate::error::StoreError;
use crate::forest::{Forest, TabId};
use crate::host::HostTab;
use crate::notify::ChangeEvent;

/// Splice `tab` in as a child of `opener`, after everything the opener
/// already owns.
///
/// The anchor is found by scanning backwards for either the opener itself or
/// its last child. From the last child we keep descending into the last
/// child of the visited entry, so the new tab lands after the whole run.
/// If the opener is not in the forest the tab is appended as a root.
pub fn place_under_opener(forest: &mut Forest, tab: TabId, opener: TabId) {
    let entries = forest.entries();

    let mut anchor = None;
    let mut via_child = false;
    for entry in entries.iter().rev() {
        if entry.parent == Some(opener) {
            anchor = Some(entry.tab);
            via_child = true;
            break;
        }
        if entry.tab == opener {
            anchor = Some(entry.tab);
            break;
        }
    }

    let Some(mut last) = anchor else {
        log::debug!("Opener {} not tracked, appending tab {} as root", opener, tab);
        forest.push(tab, None);
        return;
    };

    if via_child {
        // Bounded by the entry count so a corrupt cycle cannot spin forever
        for _ in 0..entries.len() {
            match entries.iter().rev().find(|e| e.parent == Some(last)) {
                Some(child) => last = child.tab,
                None => break,
            }
        }
    }

    let index = forest.index_of(last).map_or(forest.len(), |i| i + 1);
    forest.insert_at(index, tab, Some(opener));
}

impl MutationEngine {
    /// Track a newly created tab
    pub async fn on_tab_created(&self, tab: HostTab) -> Result<(), StoreError> {
        if self.is_panel(&tab) {
            log::debug!("Ignoring side panel tab {}", tab.id);
            return Ok(());
        }

        self.store
            .run_exclusive(|guard| async move {
                let mut collection = self.store.get(&guard);
                if collection.get_or_insert(tab.window_id).contains(tab.id) {
                    log::debug!("Tab {} already tracked", tab.id);
                    return Ok(());
                }

                if tab.pinned {
                    self.reposition_pinned(&mut collection, tab.id, true, tab.window_id, true)
                        .await;
                } else {
                    let opener = match tab.opener_tab_id {
                        Some(opener) => match self.host.tab(opener).await {
                            Ok(info) if !info.pinned => Some(opener),
                            Ok(_) => None,
                            Err(e) => {
                                log::debug!("Opener {} of tab {} unavailable: {}", opener, tab.id, e);
                                None
                            }
                        },
                        None => None,
                    };

                    let forest = collection.get_or_insert(tab.window_id);
                    match opener {
                        Some(opener) => place_under_opener(forest, tab.id, opener),
                        None => forest.push(tab.id, None),
                    }
                }

                self.store.set(&guard, &collection)?;
                self.hub.publish(ChangeEvent::TabInserted {
                    window_id: tab.window_id,
                    tab,
                });
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest(pairs: &[(TabId, Option<TabId>)]) -> Forest {
        Forest::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_first_child_goes_right_after_opener() {
        let mut f = forest(&[(1, None), (2, None)]);
        place_under_opener(&mut f, 3, 1);
        assert_eq!(f.to_pairs(), vec![(1, None), (3, Some(1)), (2, None)]);
    }

    #[test]
    fn test_lands_after_whole_subtree() {
        let mut f = forest(&[(1, None), (2, Some(1)), (3, Some(2)), (4, None)]);
        place_under_opener(&mut f, 5, 1);
        assert_eq!(
            f.to_pairs(),
            vec![(1, None), (2, Some(1)), (3, Some(2)), (5, Some(1)), (4, None)]
        );
    }

    #[test]
    fn test_descends_through_last_children() {
        // 1
        //   2
        //   3
        //     4
        //       5
        // 6
        let mut f = forest(&[
            (1, None),
            (2, Some(1)),
            (3, Some(1)),
            (4, Some(3)),
            (5, Some(4)),
            (6, None),
        ]);
        place_under_opener(&mut f, 7, 1);
        assert_eq!(f.tabs().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 7, 6]);
        assert_eq!(f.parent_of(7), Some(Some(1)));
    }

    #[test]
    fn test_unknown_opener_appends_root() {
        let mut f = forest(&[(1, None)]);
        place_under_opener(&mut f, 2, 42);
        assert_eq!(f.to_pairs(), vec![(1, None), (2, None)]);
        assert!(f.check_invariants().is_ok());
    }

    #[test]
    fn test_cycle_does_not_hang() {
        let mut f = forest(&[(1, None), (2, Some(3)), (3, Some(2))]);
        place_under_opener(&mut f, 9, 2);
        assert!(f.contains(9));
    }
}
