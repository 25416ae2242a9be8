//! Ordered per-window tab forest and the window collection.
//!
//! A [`Forest`] is an insertion-ordered mapping from tab id to parent id.
//! Position encodes display order; a tab's descendants sit in a contiguous
//! run right after it. A [`Collection`] maps each window to its forest and is
//! the unit of persistence.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Host-assigned tab identifier
pub type TabId = u64;

/// Host-assigned window identifier
pub type WindowId = u64;

/// One row of a forest: a tab and the tab it hangs under (`None` = root)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForestEntry {
    pub tab: TabId,
    pub parent: Option<TabId>,
}

impl ForestEntry {
    pub fn new(tab: TabId, parent: Option<TabId>) -> Self {
        Self { tab, parent }
    }
}

/// A structural invariant a forest failed to uphold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The same tab id appears twice
    DuplicateTab(TabId),
    /// A parent id that is not a key of the forest
    DanglingParent { tab: TabId, parent: TabId },
    /// Following parents from `tab` never reaches a root
    Cycle(TabId),
    /// A pinned tab that is not a root entry
    PinnedWithParent(TabId),
    /// A pinned tab placed after an unpinned one
    PinnedAfterUnpinned(TabId),
    /// A descendant separated from its ancestor's contiguous run
    DetachedDescendant { tab: TabId, ancestor: TabId },
}

/// Ordered tab → parent mapping for one window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    entries: Vec<ForestEntry>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a forest from ordered `(tab, parent)` pairs.
    ///
    /// Repeated tab ids keep their first position and take the last parent,
    /// matching insertion-ordered map semantics.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (TabId, Option<TabId>)>,
    {
        let mut forest = Self::new();
        for (tab, parent) in pairs {
            forest.set(tab, parent);
        }
        forest
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ForestEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ForestEntry> {
        self.entries.iter()
    }

    /// Tab ids in display order
    pub fn tabs(&self) -> impl Iterator<Item = TabId> + '_ {
        self.entries.iter().map(|e| e.tab)
    }

    pub fn to_pairs(&self) -> Vec<(TabId, Option<TabId>)> {
        self.entries.iter().map(|e| (e.tab, e.parent)).collect()
    }

    pub fn contains(&self, tab: TabId) -> bool {
        self.index_of(tab).is_some()
    }

    pub fn index_of(&self, tab: TabId) -> Option<usize> {
        self.entries.iter().position(|e| e.tab == tab)
    }

    /// Parent of `tab`: `None` if the tab is absent, `Some(None)` for a root
    pub fn parent_of(&self, tab: TabId) -> Option<Option<TabId>> {
        self.entries.iter().find(|e| e.tab == tab).map(|e| e.parent)
    }

    /// Insert or update. Existing keys keep their position.
    pub fn set(&mut self, tab: TabId, parent: Option<TabId>) {
        match self.entries.iter_mut().find(|e| e.tab == tab) {
            Some(entry) => entry.parent = parent,
            None => self.entries.push(ForestEntry::new(tab, parent)),
        }
    }

    /// Append at the end. The caller guarantees `tab` is not already present.
    pub fn push(&mut self, tab: TabId, parent: Option<TabId>) {
        self.entries.push(ForestEntry::new(tab, parent));
    }

    /// Splice an entry in at `index` (clamped to the end)
    pub fn insert_at(&mut self, index: usize, tab: TabId, parent: Option<TabId>) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, ForestEntry::new(tab, parent));
    }

    /// Remove a tab, returning the entry it had
    pub fn remove(&mut self, tab: TabId) -> Option<ForestEntry> {
        let index = self.index_of(tab)?;
        Some(self.entries.remove(index))
    }

    /// Cut `len` entries starting at `start` out of the forest
    pub fn take_range(&mut self, start: usize, len: usize) -> Vec<ForestEntry> {
        let end = start.saturating_add(len).min(self.entries.len());
        let start = start.min(end);
        self.entries.drain(start..end).collect()
    }

    /// Splice a run of entries in at `index` (clamped to the end)
    pub fn insert_run(&mut self, index: usize, run: Vec<ForestEntry>) {
        let index = index.min(self.entries.len());
        self.entries.splice(index..index, run);
    }

    /// Re-point every entry whose parent is `from` to `to`
    pub fn reparent_children(&mut self, from: TabId, to: Option<TabId>) {
        for entry in self.entries.iter_mut().filter(|e| e.parent == Some(from)) {
            entry.parent = to;
        }
    }

    /// Direct children of `tab` in display order
    pub fn children(&self, tab: TabId) -> Vec<TabId> {
        self.entries
            .iter()
            .filter(|e| e.parent == Some(tab))
            .map(|e| e.tab)
            .collect()
    }

    /// Number of ancestors of `tab` present in the forest.
    ///
    /// Stops at the first parent that is not a key, and never walks more
    /// steps than there are entries.
    pub fn depth(&self, tab: TabId) -> usize {
        let mut depth = 0;
        let mut current = self.parent_of(tab).flatten();
        while let Some(parent) = current {
            let Some(next) = self.parent_of(parent) else {
                break;
            };
            depth += 1;
            if depth >= self.entries.len() {
                break;
            }
            current = next;
        }
        depth
    }

    /// Whether `ancestor` appears on the parent chain of `tab`
    pub fn is_descendant_of(&self, tab: TabId, ancestor: TabId) -> bool {
        let mut current = self.parent_of(tab).flatten();
        let mut steps = 0;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.entries.len() {
                return false;
            }
            current = self.parent_of(parent).flatten();
        }
        false
    }

    /// Length of the contiguous run made of `tab` followed by its descendants
    pub fn subtree_span(&self, tab: TabId) -> Option<usize> {
        let start = self.index_of(tab)?;
        let mut len = 1;
        for entry in &self.entries[start + 1..] {
            if !self.is_descendant_of(entry.tab, tab) {
                break;
            }
            len += 1;
        }
        Some(len)
    }

    /// Tab to activate when `tab` is closed.
    ///
    /// Preference: the following entry if it is a child, the next sibling,
    /// the previous sibling, the parent, then the first entry.
    pub fn activation_successor(&self, tab: TabId) -> Option<TabId> {
        let Some(index) = self.index_of(tab) else {
            return self.entries.first().map(|e| e.tab);
        };
        let parent = self.entries[index].parent;

        if let Some(next) = self.entries.get(index + 1)
            && next.parent == Some(tab)
        {
            return Some(next.tab);
        }

        if let Some(sibling) = self.entries[index + 1..]
            .iter()
            .find(|e| e.parent == parent)
        {
            return Some(sibling.tab);
        }

        if let Some(sibling) = self.entries[..index]
            .iter()
            .rev()
            .find(|e| e.parent == parent)
        {
            return Some(sibling.tab);
        }

        if let Some(parent) = parent
            && self.entries[..index].iter().any(|e| e.tab == parent)
        {
            return Some(parent);
        }

        self.entries
            .iter()
            .map(|e| e.tab)
            .find(|candidate| *candidate != tab)
    }

    /// Check duplicate keys, dangling parents and cycles
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !seen.insert(entry.tab) {
                return Err(InvariantViolation::DuplicateTab(entry.tab));
            }
        }

        for entry in &self.entries {
            if let Some(parent) = entry.parent
                && !seen.contains(&parent)
            {
                return Err(InvariantViolation::DanglingParent {
                    tab: entry.tab,
                    parent,
                });
            }
        }

        for entry in &self.entries {
            let mut current = entry.parent;
            let mut steps = 0;
            while let Some(parent) = current {
                steps += 1;
                if steps > self.entries.len() {
                    return Err(InvariantViolation::Cycle(entry.tab));
                }
                current = self.parent_of(parent).flatten();
            }
        }

        Ok(())
    }

    /// Check the pinned-prefix and contiguous-subtree rules.
    ///
    /// `is_pinned` reports the host's pinned state for a tab.
    pub fn check_layout<F>(&self, is_pinned: F) -> Result<(), InvariantViolation>
    where
        F: Fn(TabId) -> bool,
    {
        let mut seen_unpinned = false;
        for entry in &self.entries {
            if is_pinned(entry.tab) {
                if seen_unpinned {
                    return Err(InvariantViolation::PinnedAfterUnpinned(entry.tab));
                }
                if entry.parent.is_some() {
                    return Err(InvariantViolation::PinnedWithParent(entry.tab));
                }
            } else {
                seen_unpinned = true;
            }
        }

        for (index, entry) in self.entries.iter().enumerate() {
            let Some(parent) = entry.parent else {
                continue;
            };
            let Some(parent_index) = self.index_of(parent) else {
                continue;
            };
            if parent_index > index {
                return Err(InvariantViolation::DetachedDescendant {
                    tab: entry.tab,
                    ancestor: parent,
                });
            }
            for between in &self.entries[parent_index + 1..index] {
                if !self.is_descendant_of(between.tab, parent) {
                    return Err(InvariantViolation::DetachedDescendant {
                        tab: entry.tab,
                        ancestor: parent,
                    });
                }
            }
        }

        Ok(())
    }
}

/// All tracked windows and their forests, in window insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    windows: Vec<(WindowId, Forest)>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.windows.iter().any(|(id, _)| *id == window)
    }

    pub fn get(&self, window: WindowId) -> Option<&Forest> {
        self.windows
            .iter()
            .find(|(id, _)| *id == window)
            .map(|(_, forest)| forest)
    }

    pub fn get_mut(&mut self, window: WindowId) -> Option<&mut Forest> {
        self.windows
            .iter_mut()
            .find(|(id, _)| *id == window)
            .map(|(_, forest)| forest)
    }

    /// Forest for `window`, creating an empty one at the end if needed
    pub fn get_or_insert(&mut self, window: WindowId) -> &mut Forest {
        let index = match self.windows.iter().position(|(id, _)| *id == window) {
            Some(index) => index,
            None => {
                self.windows.push((window, Forest::new()));
                self.windows.len() - 1
            }
        };
        &mut self.windows[index].1
    }

    /// Insert or replace a window's forest. Existing windows keep their position.
    pub fn insert(&mut self, window: WindowId, forest: Forest) {
        match self.get_mut(window) {
            Some(existing) => *existing = forest,
            None => self.windows.push((window, forest)),
        }
    }

    pub fn remove(&mut self, window: WindowId) -> Option<Forest> {
        let index = self.windows.iter().position(|(id, _)| *id == window)?;
        Some(self.windows.remove(index).1)
    }

    pub fn windows(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.windows.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (WindowId, &Forest)> {
        self.windows.iter().map(|(id, forest)| (*id, forest))
    }

    /// Window whose forest holds `tab`
    pub fn window_of(&self, tab: TabId) -> Option<WindowId> {
        self.windows
            .iter()
            .find(|(_, forest)| forest.contains(tab))
            .map(|(id, _)| *id)
    }
}

/// Wire form of a collection: `[[window, [[tab, parent|null], ...]], ...]`
pub type WireCollection = Vec<(WindowId, Vec<(TabId, Option<TabId>)>)>;

impl From<&Collection> for WireCollection {
    fn from(collection: &Collection) -> Self {
        collection
            .iter()
            .map(|(window, forest)| (window, forest.to_pairs()))
            .collect()
    }
}

impl From<WireCollection> for Collection {
    fn from(wire: WireCollection) -> Self {
        let mut collection = Collection::new();
        for (window, pairs) in wire {
            collection.insert(window, Forest::from_pairs(pairs));
        }
        collection
    }
}

impl Serialize for Collection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireCollection::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Collection {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        WireCollection::deserialize(deserializer).map(Collection::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest(pairs: &[(TabId, Option<TabId>)]) -> Forest {
        Forest::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_set_keeps_position() {
        let mut f = forest(&[(1, None), (2, None), (3, None)]);
        f.set(2, Some(1));
        assert_eq!(f.to_pairs(), vec![(1, None), (2, Some(1)), (3, None)]);
    }

    #[test]
    fn test_from_pairs_duplicate_keeps_first_position_last_value() {
        let f = forest(&[(1, None), (2, None), (1, Some(2))]);
        assert_eq!(f.to_pairs(), vec![(1, Some(2)), (2, None)]);
    }

    #[test]
    fn test_depth_counts_present_ancestors() {
        let f = forest(&[(1, None), (2, Some(1)), (3, Some(2)), (4, Some(99))]);
        assert_eq!(f.depth(1), 0);
        assert_eq!(f.depth(3), 2);
        assert_eq!(f.depth(4), 0);
    }

    #[test]
    fn test_depth_terminates_on_cycle() {
        let f = forest(&[(1, Some(2)), (2, Some(1))]);
        assert!(f.depth(1) <= 2);
    }

    #[test]
    fn test_subtree_span() {
        let f = forest(&[(1, None), (2, Some(1)), (3, Some(2)), (4, Some(1)), (5, None)]);
        assert_eq!(f.subtree_span(1), Some(4));
        assert_eq!(f.subtree_span(2), Some(2));
        assert_eq!(f.subtree_span(5), Some(1));
        assert_eq!(f.subtree_span(42), None);
    }

    #[test]
    fn test_activation_successor_order() {
        // 1
        //   2
        //   3
        // 4
        let f = forest(&[(1, None), (2, Some(1)), (3, Some(1)), (4, None)]);
        assert_eq!(f.activation_successor(1), Some(2), "first child");
        assert_eq!(f.activation_successor(2), Some(3), "next sibling");
        assert_eq!(f.activation_successor(3), Some(2), "previous sibling");
        assert_eq!(f.activation_successor(4), Some(1), "previous root sibling");

        let lone_child = forest(&[(1, None), (2, Some(1))]);
        assert_eq!(lone_child.activation_successor(2), Some(1), "parent");
    }

    #[test]
    fn test_check_invariants() {
        assert!(forest(&[(1, None), (2, Some(1))]).check_invariants().is_ok());
        assert_eq!(
            forest(&[(1, Some(7))]).check_invariants(),
            Err(InvariantViolation::DanglingParent { tab: 1, parent: 7 })
        );
        assert!(matches!(
            forest(&[(1, Some(2)), (2, Some(1))]).check_invariants(),
            Err(InvariantViolation::Cycle(_))
        ));
    }

    #[test]
    fn test_check_layout_pinned_prefix() {
        let f = forest(&[(1, None), (2, None), (3, None)]);
        assert!(f.check_layout(|t| t == 1).is_ok());
        assert_eq!(
            f.check_layout(|t| t == 2),
            Err(InvariantViolation::PinnedAfterUnpinned(2))
        );
    }

    #[test]
    fn test_check_layout_detached_descendant() {
        let f = forest(&[(1, None), (2, None), (3, Some(1))]);
        assert_eq!(
            f.check_layout(|_| false),
            Err(InvariantViolation::DetachedDescendant {
                tab: 3,
                ancestor: 1
            })
        );
    }

    #[test]
    fn test_collection_keeps_window_order() {
        let mut c = Collection::new();
        c.insert(9, Forest::new());
        c.insert(3, Forest::new());
        c.get_or_insert(5).push(1, None);
        assert_eq!(c.windows().collect::<Vec<_>>(), vec![9, 3, 5]);
        assert_eq!(c.window_of(1), Some(5));
        assert!(c.remove(3).is_some());
        assert_eq!(c.windows().collect::<Vec<_>>(), vec![9, 5]);
    }
}
