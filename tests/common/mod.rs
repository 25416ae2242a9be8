//! Shared integration test helpers for tabstree.
//!
//! Include this module at the top of each test file that needs it:
//!
//! ```ignore
//! mod common;
//! use common::Harness;
//! ```
//!
//! The `#[allow(dead_code)]` attribute suppresses warnings when only a
//! subset of helpers is used per file.

#![allow(dead_code)]

use std::sync::Arc;
use tabstree::host::{HostTab, SimulatedHost, TabHost};
use tabstree::persistence::{KeyValueStore, MemoryKv};
use tabstree::protocol::{LifecycleEvent, MoveTabs};
use tabstree::{EngineOptions, HierarchyStore, MutationEngine, TabId, WindowId};

/// Simulated browser plus an engine wired to it
pub struct Harness {
    pub host: Arc<SimulatedHost>,
    pub engine: Arc<MutationEngine>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self::with_backend(Box::new(MemoryKv::new()), options)
    }

    pub fn with_backend(backend: Box<dyn KeyValueStore>, options: EngineOptions) -> Self {
        Self::with_host(Arc::new(SimulatedHost::new()), backend, options)
    }

    pub fn with_host(
        host: Arc<SimulatedHost>,
        backend: Box<dyn KeyValueStore>,
        options: EngineOptions,
    ) -> Self {
        let store = Arc::new(HierarchyStore::with_backend(backend, "tabstruct"));
        let engine = Arc::new(MutationEngine::new(store, host.clone(), options));
        Self { host, engine }
    }

    /// Apply an event to the simulated browser, then hand it to the engine
    pub async fn send(&self, event: LifecycleEvent) {
        self.host.apply_event(&event);
        self.engine.dispatch(event).await;
    }

    /// Open a tab at the end of its window's strip
    pub async fn open(&self, tab: HostTab) -> HostTab {
        let stored = self.host.push_tab(tab);
        self.engine
            .dispatch(LifecycleEvent::TabCreated(stored.clone()))
            .await;
        stored
    }

    /// Open a root tab
    pub async fn open_root(&self, id: TabId, window: WindowId) -> HostTab {
        self.open(HostTab::new(id, window)).await
    }

    /// Open a tab credited to `opener`
    pub async fn open_child(&self, id: TabId, window: WindowId, opener: TabId) -> HostTab {
        self.open(HostTab::new(id, window).opened_by(opener)).await
    }

    pub async fn close(&self, id: TabId, window: WindowId) {
        self.send(LifecycleEvent::TabRemoved {
            tab_id: id,
            window_id: window,
        })
        .await;
    }

    pub async fn set_pinned(&self, id: TabId, window: WindowId, pinned: bool) {
        self.send(LifecycleEvent::TabUpdated {
            tab_id: id,
            window_id: window,
            pinned: Some(pinned),
        })
        .await;
    }

    pub async fn pairs(&self, window: WindowId) -> Vec<(TabId, Option<TabId>)> {
        self.engine.get_forest(window).await.to_pairs()
    }

    pub async fn tabs(&self, window: WindowId) -> Vec<TabId> {
        self.engine.get_forest(window).await.tabs().collect()
    }

    /// Check every structural invariant against the simulated host
    pub async fn assert_invariants(&self) {
        let collection = self.engine.snapshot().await;
        for (window, forest) in collection.iter() {
            forest
                .check_invariants()
                .unwrap_or_else(|v| panic!("window {window}: {v:?} in {:?}", forest.to_pairs()));
            forest
                .check_layout(|t| self.host.is_pinned(t))
                .unwrap_or_else(|v| panic!("window {window}: {v:?} in {:?}", forest.to_pairs()));
            for tab in forest.tabs() {
                let info = self
                    .host
                    .tab(tab)
                    .await
                    .unwrap_or_else(|e| panic!("tracked tab {tab} missing on host: {e}"));
                assert_eq!(info.window_id, window, "tab {tab} tracked in wrong window");
            }
        }
    }
}

/// Build a move command
pub fn move_cmd(
    origin: WindowId,
    dest: WindowId,
    moving: TabId,
    target: TabId,
    above: bool,
    items: usize,
) -> MoveTabs {
    MoveTabs {
        window_id_orig: origin,
        window_id_dest: dest,
        tab_id_moving: moving,
        tab_id_target: target,
        moving_above: above,
        items_number: items,
        sync_bypass: false,
    }
}
