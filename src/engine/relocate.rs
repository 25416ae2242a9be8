//! Moving a contiguous run of tabs, within a window or across windows.

use super::MutationEngine;
use crate::error::StoreError;
use crate::forest::{Collection, TabId, WindowId};
use crate::notify::ChangeEvent;
use crate::protocol::MoveTabs;
use std::fmt;

/// Why a move command was dropped as stale
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveSkip {
    UnknownWindow(WindowId),
    MovingNotFound(TabId),
    TargetNotFound(TabId),
    /// Dropping a run onto one of its own tabs would create a cycle
    TargetInsideChunk(TabId),
    /// The caller's count does not fit the forest
    ChunkOutOfRange { start: usize, len: usize },
    /// The caller's count does not cover exactly the moving tab's subtree
    ChunkMismatch { claimed: usize, span: usize },
    /// Pinned tabs only move through pin changes
    PinnedTab(TabId),
}

impl fmt::Display for MoveSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveSkip::UnknownWindow(window) => write!(f, "window {} is not tracked", window),
            MoveSkip::MovingNotFound(tab) => write!(f, "moving tab {} is not tracked", tab),
            MoveSkip::TargetNotFound(tab) => write!(f, "target tab {} is not tracked", tab),
            MoveSkip::TargetInsideChunk(tab) => {
                write!(f, "target tab {} is part of the moved run", tab)
            }
            MoveSkip::ChunkOutOfRange { start, len } => {
                write!(f, "run of {} entries at {} exceeds the forest", len, start)
            }
            MoveSkip::ChunkMismatch { claimed, span } => {
                write!(f, "run of {} entries does not match subtree of {}", claimed, span)
            }
            MoveSkip::PinnedTab(tab) => write!(f, "tab {} is pinned", tab),
        }
    }
}

/// Cut the run starting at the moving tab and splice it next to the target.
///
/// `revalidate` recomputes the run length as the moving tab's subtree span
/// instead of trusting `command.items_number`; without it a count that is
/// not exactly that span is skipped. `is_pinned` reports the host's pinned
/// state. Returns the moved tab ids in order.
pub fn relocate<F>(
    collection: &mut Collection,
    command: &MoveTabs,
    revalidate: bool,
    is_pinned: F,
) -> Result<Vec<TabId>, MoveSkip>
where
    F: Fn(TabId) -> bool,
{
    let moving = command.tab_id_moving;
    let target = command.tab_id_target;
    let origin = collection
        .get(command.window_id_orig)
        .ok_or(MoveSkip::UnknownWindow(command.window_id_orig))?;
    let destination = collection
        .get(command.window_id_dest)
        .ok_or(MoveSkip::UnknownWindow(command.window_id_dest))?;

    let start = origin
        .index_of(moving)
        .ok_or(MoveSkip::MovingNotFound(moving))?;
    if !destination.contains(target) {
        return Err(MoveSkip::TargetNotFound(target));
    }

    // An unpinned target sits past the pinned prefix, so the drop point does too
    for tab in [moving, target] {
        if is_pinned(tab) {
            return Err(MoveSkip::PinnedTab(tab));
        }
    }
    if command.window_id_orig == command.window_id_dest
        && (target == moving || origin.is_descendant_of(target, moving))
    {
        return Err(MoveSkip::TargetInsideChunk(target));
    }

    let span = origin.subtree_span(moving).unwrap_or(1);
    let len = if revalidate {
        if span != command.items_number {
            log::warn!(
                "Move of tab {} claimed {} entries, subtree has {}",
                moving,
                command.items_number,
                span
            );
        }
        span
    } else {
        let claimed = command.items_number;
        if claimed == 0 || start + claimed > origin.len() {
            return Err(MoveSkip::ChunkOutOfRange {
                start,
                len: claimed,
            });
        }
        if claimed != span {
            return Err(MoveSkip::ChunkMismatch { claimed, span });
        }
        claimed
    };

    let moved: Vec<TabId> = origin.entries()[start..start + len]
        .iter()
        .map(|e| e.tab)
        .collect();
    let new_parent = if command.moving_above {
        destination.parent_of(target).flatten()
    } else {
        Some(target)
    };

    let Some(origin) = collection.get_mut(command.window_id_orig) else {
        return Err(MoveSkip::UnknownWindow(command.window_id_orig));
    };
    let mut chunk = origin.take_range(start, len);
    if let Some(root) = chunk.first_mut() {
        root.parent = new_parent;
    }

    let Some(destination) = collection.get_mut(command.window_id_dest) else {
        return Err(MoveSkip::UnknownWindow(command.window_id_dest));
    };
    let target_index = destination
        .index_of(target)
        .ok_or(MoveSkip::TargetNotFound(target))?;
    let at = if command.moving_above {
        target_index
    } else {
        target_index + 1
    };
    destination.insert_run(at, chunk);

    Ok(moved)
}

impl MutationEngine {
    /// Execute a drag/drop or programmatic move
    pub async fn move_tabs(&self, command: MoveTabs) -> Result<(), StoreError> {
        let origin = command.window_id_orig;
        let destination = command.window_id_dest;

        self.store
            .run_exclusive(|guard| async move {
                let mut collection = self.store.get(&guard);
                let mut host_pinned = self.host_pinned(origin).await;
                if destination != origin {
                    host_pinned.extend(self.host_pinned(destination).await);
                }

                match relocate(
                    &mut collection,
                    &command,
                    self.options.revalidate_move_chunk,
                    |tab| host_pinned.contains(&tab),
                ) {
                    Ok(moved) => {
                        let mut close_origin = false;
                        if origin != destination {
                            self.move_on_host(&moved, &command).await;
                            if collection.get(origin).is_some_and(|f| f.is_empty()) {
                                collection.remove(origin);
                                close_origin = true;
                            }
                        }

                        self.store.set(&guard, &collection)?;
                        if close_origin {
                            self.windows.close_if_present(origin).await;
                        }
                    }
                    Err(skip) => log::debug!("Skipping move: {}", skip),
                }

                if !command.sync_bypass {
                    self.hub
                        .publish(ChangeEvent::ResyncRequested { window_id: origin });
                    if destination != origin {
                        self.hub.publish(ChangeEvent::ResyncRequested {
                            window_id: destination,
                        });
                    }
                }
                Ok(())
            })
            .await
    }

    /// Mirror a cross-window move in the host's tab strips. Failures are
    /// races with the user and only logged.
    async fn move_on_host(&self, moved: &[TabId], command: &MoveTabs) {
        let target = match self.host.tab(command.tab_id_target).await {
            Ok(target) => target,
            Err(e) => {
                log::debug!("Move target {} gone on host: {}", command.tab_id_target, e);
                return;
            }
        };
        let index = if command.moving_above {
            target.index
        } else {
            target.index + 1
        };
        if let Err(e) = self
            .host
            .move_tabs(moved, command.window_id_dest, index)
            .await
        {
            log::debug!("Host refused to move tabs {:?}: {}", moved, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::Forest;

    fn command(moving: TabId, target: TabId, above: bool, items: usize) -> MoveTabs {
        MoveTabs {
            window_id_orig: 1,
            window_id_dest: 1,
            tab_id_moving: moving,
            tab_id_target: target,
            moving_above: above,
            items_number: items,
            sync_bypass: false,
        }
    }

    fn single_window(pairs: &[(TabId, Option<TabId>)]) -> Collection {
        let mut collection = Collection::new();
        collection.insert(1, Forest::from_pairs(pairs.iter().copied()));
        collection
    }

    #[test]
    fn test_move_subtree_below_target() {
        // 1 (2 3) 4  ->  4 (1 (2 3))
        let mut c = single_window(&[(1, None), (2, Some(1)), (3, Some(1)), (4, None)]);
        let moved = relocate(&mut c, &command(1, 4, false, 3), true, |_| false).unwrap();

        assert_eq!(moved, vec![1, 2, 3]);
        let f = c.get(1).unwrap();
        assert_eq!(
            f.to_pairs(),
            vec![(4, None), (1, Some(4)), (2, Some(1)), (3, Some(1))]
        );
        assert!(f.check_layout(|_| false).is_ok());
    }

    #[test]
    fn test_move_above_takes_target_parent() {
        let mut c = single_window(&[(1, None), (2, Some(1)), (3, None), (4, Some(3))]);
        relocate(&mut c, &command(3, 2, true, 2), true, |_| false).unwrap();

        let f = c.get(1).unwrap();
        assert_eq!(
            f.to_pairs(),
            vec![(1, None), (3, Some(1)), (4, Some(3)), (2, Some(1))]
        );
        assert!(f.check_layout(|_| false).is_ok());
    }

    #[test]
    fn test_revalidation_fixes_short_count() {
        let mut c = single_window(&[(1, None), (2, Some(1)), (3, None)]);
        let moved = relocate(&mut c, &command(1, 3, false, 1), true, |_| false).unwrap();
        assert_eq!(moved, vec![1, 2]);
    }

    #[test]
    fn test_trusted_count_out_of_range() {
        let mut c = single_window(&[(1, None), (2, None)]);
        assert_eq!(
            relocate(&mut c, &command(2, 1, true, 5), false, |_| false),
            Err(MoveSkip::ChunkOutOfRange { start: 1, len: 5 })
        );
        assert_eq!(c.get(1).unwrap().to_pairs(), vec![(1, None), (2, None)]);
    }

    #[test]
    fn test_target_inside_chunk_rejected() {
        let mut c = single_window(&[(1, None), (2, Some(1)), (3, None)]);
        assert_eq!(
            relocate(&mut c, &command(1, 2, false, 2), true, |_| false),
            Err(MoveSkip::TargetInsideChunk(2))
        );
    }

    #[test]
    fn test_trusted_count_must_cover_subtree() {
        let mut c = single_window(&[(1, None), (2, Some(1)), (3, None)]);
        assert_eq!(
            relocate(&mut c, &command(1, 3, false, 1), false, |_| false),
            Err(MoveSkip::ChunkMismatch {
                claimed: 1,
                span: 2
            })
        );
        assert_eq!(
            c.get(1).unwrap().to_pairs(),
            vec![(1, None), (2, Some(1)), (3, None)]
        );

        relocate(&mut c, &command(1, 3, false, 2), false, |_| false).unwrap();
        assert_eq!(
            c.get(1).unwrap().to_pairs(),
            vec![(3, None), (1, Some(3)), (2, Some(1))]
        );
    }

    #[test]
    fn test_descendant_target_rejected_without_revalidation() {
        let mut c = single_window(&[(1, None), (2, Some(1)), (3, Some(2))]);
        assert_eq!(
            relocate(&mut c, &command(1, 3, false, 1), false, |_| false),
            Err(MoveSkip::TargetInsideChunk(3))
        );
        let f = c.get(1).unwrap();
        assert_eq!(f.to_pairs(), vec![(1, None), (2, Some(1)), (3, Some(2))]);
        assert!(f.check_invariants().is_ok());
    }

    #[test]
    fn test_pinned_tabs_do_not_move() {
        let mut c = single_window(&[(1, None), (2, None), (3, Some(2))]);
        let pinned = |t: TabId| t == 1;

        assert_eq!(
            relocate(&mut c, &command(2, 1, true, 2), true, pinned),
            Err(MoveSkip::PinnedTab(1))
        );
        assert_eq!(
            relocate(&mut c, &command(1, 3, false, 1), true, pinned),
            Err(MoveSkip::PinnedTab(1))
        );

        let f = c.get(1).unwrap();
        assert_eq!(f.to_pairs(), vec![(1, None), (2, None), (3, Some(2))]);
        assert!(f.check_layout(pinned).is_ok());
    }

    #[test]
    fn test_stale_ids_skip() {
        let mut c = single_window(&[(1, None)]);
        assert_eq!(
            relocate(&mut c, &command(9, 1, true, 1), true, |_| false),
            Err(MoveSkip::MovingNotFound(9))
        );
        assert_eq!(
            relocate(&mut c, &command(1, 9, true, 1), true, |_| false),
            Err(MoveSkip::TargetNotFound(9))
        );

        let mut cross = command(1, 1, true, 1);
        cross.window_id_dest = 5;
        assert_eq!(
            relocate(&mut c, &cross, true, |_| false),
            Err(MoveSkip::UnknownWindow(5))
        );
    }

    #[test]
    fn test_cross_window_move() {
        let mut c = Collection::new();
        c.insert(1, Forest::from_pairs([(1, None), (2, Some(1))]));
        c.insert(2, Forest::from_pairs([(10, None)]));

        let mut cmd = command(1, 10, false, 2);
        cmd.window_id_dest = 2;
        relocate(&mut c, &cmd, true, |_| false).unwrap();

        assert!(c.get(1).unwrap().is_empty());
        assert_eq!(
            c.get(2).unwrap().to_pairs(),
            vec![(10, None), (1, Some(10)), (2, Some(1))]
        );
    }
}
