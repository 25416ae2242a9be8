//! Observer-side replica of one window's forest.
//!
//! A replica is what a tree view renders: one row per tab with its pinned
//! flag and indentation depth. It never mutates the store. Incremental
//! events patch it, [`ChangeEvent::ResyncRequested`] (or a lagged
//! subscription) rebuilds it from the current forest and host tabs.

use super::ChangeEvent;
use crate::engine::MutationEngine;
use crate::error::StoreError;
use crate::forest::{Forest, TabId, WindowId};
use crate::host::HostTab;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// One rendered tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaRow {
    pub tab: TabId,
    pub pinned: bool,
    pub depth: usize,
}

/// What a patch or reconcile changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: Vec<TabId>,
    pub added: Vec<TabId>,
    /// Rows whose depth or pinned flag changed
    pub relevelled: Vec<TabId>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.relevelled.is_empty()
    }

    pub fn merge(&mut self, other: ReconcileReport) {
        self.removed.extend(other.removed);
        self.added.extend(other.added);
        self.relevelled.extend(other.relevelled);
    }
}

/// Rows of one window in display order, pinned rows first
#[derive(Debug, Clone)]
pub struct ForestReplica {
    window_id: WindowId,
    rows: Vec<ReplicaRow>,
}

impl ForestReplica {
    pub fn new(window_id: WindowId) -> Self {
        Self {
            window_id,
            rows: Vec::new(),
        }
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    pub fn rows(&self) -> &[ReplicaRow] {
        &self.rows
    }

    pub fn tabs(&self) -> Vec<TabId> {
        self.rows.iter().map(|r| r.tab).collect()
    }

    pub fn row(&self, tab: TabId) -> Option<&ReplicaRow> {
        self.rows.iter().find(|r| r.tab == tab)
    }

    /// Rebuild the rows from `forest` and what the host reports.
    ///
    /// Only tabs present in both survive. Reconciling twice against the same
    /// inputs reports nothing the second time.
    pub fn reconcile(&mut self, forest: &Forest, host_tabs: &[HostTab]) -> ReconcileReport {
        let host: HashMap<TabId, &HostTab> = host_tabs
            .iter()
            .filter(|t| t.window_id == self.window_id)
            .map(|t| (t.id, t))
            .collect();

        let mut pinned_rows = Vec::new();
        let mut rows = Vec::new();
        for tab in forest.tabs() {
            let Some(info) = host.get(&tab) else {
                continue;
            };
            if info.pinned {
                pinned_rows.push(ReplicaRow {
                    tab,
                    pinned: true,
                    depth: 0,
                });
            } else {
                rows.push(ReplicaRow {
                    tab,
                    pinned: false,
                    depth: forest.depth(tab),
                });
            }
        }
        pinned_rows.extend(rows);
        let next = pinned_rows;

        let before: HashMap<TabId, &ReplicaRow> = self.rows.iter().map(|r| (r.tab, r)).collect();
        let after: HashSet<TabId> = next.iter().map(|r| r.tab).collect();

        let mut report = ReconcileReport {
            removed: self
                .rows
                .iter()
                .map(|r| r.tab)
                .filter(|t| !after.contains(t))
                .collect(),
            ..ReconcileReport::default()
        };
        for row in &next {
            match before.get(&row.tab) {
                None => report.added.push(row.tab),
                Some(old) if old.depth != row.depth || old.pinned != row.pinned => {
                    report.relevelled.push(row.tab)
                }
                Some(_) => {}
            }
        }

        self.rows = next;
        report
    }

    /// Patch the replica for one event. `forest` and `host_tabs` are the
    /// current state, which may already be ahead of the event.
    pub fn apply(
        &mut self,
        event: &ChangeEvent,
        forest: &Forest,
        host_tabs: &[HostTab],
    ) -> ReconcileReport {
        if event.window_id() != self.window_id {
            return ReconcileReport::default();
        }

        match event {
            ChangeEvent::TabInserted { tab, .. } => self.insert_row(tab, forest),
            ChangeEvent::TabRemoved { tab_id, .. } => {
                let mut report = ReconcileReport::default();
                if let Some(pos) = self.rows.iter().position(|r| r.tab == *tab_id) {
                    self.rows.remove(pos);
                    report.removed.push(*tab_id);
                }
                report.relevelled = self.relevel(forest);
                report
            }
            ChangeEvent::TabReplaced { old_id, new_id, .. } => {
                let mut report = ReconcileReport::default();
                if let Some(row) = self.rows.iter_mut().find(|r| r.tab == *old_id) {
                    row.tab = *new_id;
                    report.removed.push(*old_id);
                    report.added.push(*new_id);
                }
                report
            }
            ChangeEvent::ResyncRequested { .. } => self.reconcile(forest, host_tabs),
        }
    }

    fn insert_row(&mut self, tab: &HostTab, forest: &Forest) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let Some(forest_index) = forest.index_of(tab.id) else {
            return report;
        };
        if self.row(tab.id).is_some() {
            return report;
        }

        // After the closest preceding forest entry that already has a row
        let at = forest.entries()[..forest_index]
            .iter()
            .rev()
            .find_map(|e| self.rows.iter().position(|r| r.tab == e.tab))
            .map_or(0, |i| i + 1);
        let depth = if tab.pinned { 0 } else { forest.depth(tab.id) };
        self.rows.insert(
            at,
            ReplicaRow {
                tab: tab.id,
                pinned: tab.pinned,
                depth,
            },
        );
        report.added.push(tab.id);
        report
    }

    fn relevel(&mut self, forest: &Forest) -> Vec<TabId> {
        let mut changed = Vec::new();
        for row in self.rows.iter_mut().filter(|r| !r.pinned) {
            let depth = forest.depth(row.tab);
            if depth != row.depth {
                row.depth = depth;
                changed.push(row.tab);
            }
        }
        changed
    }
}

/// Keeps a [`ForestReplica`] current from an engine subscription
pub struct ReplicaObserver {
    engine: Arc<MutationEngine>,
    receiver: Receiver<ChangeEvent>,
    replica: ForestReplica,
}

impl ReplicaObserver {
    /// Subscribe before the first resync so no event is missed
    pub fn new(engine: Arc<MutationEngine>, window_id: WindowId) -> Self {
        let receiver = engine.subscribe();
        Self {
            engine,
            receiver,
            replica: ForestReplica::new(window_id),
        }
    }

    pub fn replica(&self) -> &ForestReplica {
        &self.replica
    }

    /// Rebuild the replica from scratch
    pub async fn resync(&mut self) -> Result<ReconcileReport, StoreError> {
        let window_id = self.replica.window_id();
        let forest = self.engine.get_forest(window_id).await;
        let host_tabs = self.engine.host().query_tabs(window_id).await?;
        Ok(self.replica.reconcile(&forest, &host_tabs))
    }

    async fn apply_current(&mut self, event: &ChangeEvent) -> Result<ReconcileReport, StoreError> {
        let window_id = self.replica.window_id();
        let forest = self.engine.get_forest(window_id).await;
        let host_tabs = self.engine.host().query_tabs(window_id).await?;
        Ok(self.replica.apply(event, &forest, &host_tabs))
    }

    /// Wait for the next event about this window and apply it. `None` once
    /// the engine is gone.
    pub async fn next(&mut self) -> Option<Result<ReconcileReport, StoreError>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.window_id() != self.replica.window_id() => continue,
                Ok(event) => return Some(self.apply_current(&event).await),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Replica observer lagged by {} events, resyncing", skipped);
                    return Some(self.resync().await);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Apply everything already queued without waiting
    pub async fn drain(&mut self) -> Result<ReconcileReport, StoreError> {
        let mut report = ReconcileReport::default();
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.window_id() != self.replica.window_id() => {}
                Ok(event) => report.merge(self.apply_current(&event).await?),
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("Replica observer lagged by {} events, resyncing", skipped);
                    report.merge(self.resync().await?);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return Ok(report),
            }
        }
    }

    /// Follow the subscription until it closes
    pub async fn run(mut self) {
        while let Some(result) = self.next().await {
            if let Err(e) = result {
                log::debug!("Replica of window {} not updated: {}", self.replica.window_id(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_tabs(window: WindowId, ids: &[(TabId, bool)]) -> Vec<HostTab> {
        ids.iter()
            .enumerate()
            .map(|(index, (id, pinned))| HostTab {
                index,
                ..HostTab::new(*id, window).pinned(*pinned)
            })
            .collect()
    }

    #[test]
    fn test_reconcile_orders_and_levels() {
        let forest = Forest::from_pairs([(1, None), (2, Some(1)), (3, Some(2)), (4, None)]);
        let tabs = host_tabs(1, &[(1, false), (2, false), (3, false), (4, false)]);
        let mut replica = ForestReplica::new(1);

        let report = replica.reconcile(&forest, &tabs);
        assert_eq!(report.added, vec![1, 2, 3, 4]);
        assert_eq!(
            replica.rows().iter().map(|r| r.depth).collect::<Vec<_>>(),
            vec![0, 1, 2, 0]
        );

        assert!(replica.reconcile(&forest, &tabs).is_empty());
    }

    #[test]
    fn test_reconcile_drops_tabs_host_lost() {
        let forest = Forest::from_pairs([(1, None), (2, Some(1))]);
        let mut replica = ForestReplica::new(1);
        replica.reconcile(&forest, &host_tabs(1, &[(1, false), (2, false)]));

        let report = replica.reconcile(&forest, &host_tabs(1, &[(1, false)]));
        assert_eq!(report.removed, vec![2]);
        assert_eq!(replica.tabs(), vec![1]);
    }

    #[test]
    fn test_pinned_rows_first() {
        let forest = Forest::from_pairs([(1, None), (2, None), (3, None)]);
        let mut replica = ForestReplica::new(1);
        replica.reconcile(&forest, &host_tabs(1, &[(3, true), (1, false), (2, false)]));
        assert_eq!(replica.tabs(), vec![3, 1, 2]);
    }

    #[test]
    fn test_apply_incremental() {
        let tabs = host_tabs(1, &[(1, false), (2, false), (3, false)]);
        let mut replica = ForestReplica::new(1);
        replica.reconcile(&Forest::from_pairs([(1, None), (3, None)]), &tabs);

        let forest = Forest::from_pairs([(1, None), (2, Some(1)), (3, None)]);
        let report = replica.apply(
            &ChangeEvent::TabInserted {
                window_id: 1,
                tab: HostTab::new(2, 1).opened_by(1),
            },
            &forest,
            &tabs,
        );
        assert_eq!(report.added, vec![2]);
        assert_eq!(replica.tabs(), vec![1, 2, 3]);
        assert_eq!(replica.row(2).map(|r| r.depth), Some(1));

        let forest = Forest::from_pairs([(2, None), (3, None)]);
        let report = replica.apply(
            &ChangeEvent::TabRemoved {
                window_id: 1,
                tab_id: 1,
            },
            &forest,
            &tabs,
        );
        assert_eq!(report.removed, vec![1]);
        assert_eq!(report.relevelled, vec![2]);

        replica.apply(
            &ChangeEvent::TabReplaced {
                window_id: 1,
                old_id: 3,
                new_id: 30,
            },
            &forest,
            &tabs,
        );
        assert_eq!(replica.tabs(), vec![2, 30]);
    }

    #[test]
    fn test_other_window_ignored() {
        let mut replica = ForestReplica::new(1);
        let report = replica.apply(
            &ChangeEvent::ResyncRequested { window_id: 2 },
            &Forest::from_pairs([(5, None)]),
            &host_tabs(2, &[(5, false)]),
        );
        assert!(report.is_empty());
        assert!(replica.rows().is_empty());
    }
}
