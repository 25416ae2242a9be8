//! Mutation engine: the lifecycle handlers that reshape the forests.
//!
//! Each public handler is exactly one exclusive body: read the whole
//! collection, compute the new forest(s), write the whole collection back,
//! then publish notifications. Handlers only await at host and storage
//! boundaries, so in-memory transitions are atomic with respect to each
//! other.
//!
//! The algorithms live in submodules as plain functions over [`Forest`] so
//! they can be tested without a runtime:
//!
//! - [`insert`]: placement of newly created tabs under their opener
//! - [`remove`]: deletion with re-parenting of orphaned children
//! - [`relocate`]: drag/drop and programmatic moves, possibly cross-window
//! - [`pinned`]: pin/unpin reordering around the pinned prefix
//! - [`replace`]: id swaps on discard/reactivation

pub mod insert;
pub mod pinned;
pub mod relocate;
pub mod remove;
pub mod replace;

use crate::error::StoreError;
use crate::forest::{Collection, Forest, TabId, WindowId};
use crate::host::TabHost;
use crate::notify::{ChangeEvent, NotificationHub};
use crate::protocol::{LifecycleEvent, Request, Response};
use crate::store::HierarchyStore;
use crate::window::WindowLifecycle;
use std::sync::Arc;
use tabstree_config::Config;

/// Behaviour switches taken from [`Config`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Tabs showing this URL (the side panel itself) are not tracked
    pub panel_url: Option<String>,
    /// Recompute moved chunk spans instead of trusting `items_number`
    pub revalidate_move_chunk: bool,
    /// Per-subscriber buffer of change events
    pub notification_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        Self {
            panel_url: config.panel_url.clone(),
            revalidate_move_chunk: config.revalidate_move_chunk,
            notification_capacity: config.notification_capacity,
        }
    }
}

/// Owns the handles every lifecycle handler needs
pub struct MutationEngine {
    store: Arc<HierarchyStore>,
    host: Arc<dyn TabHost>,
    windows: WindowLifecycle,
    hub: NotificationHub,
    options: EngineOptions,
}

impl std::fmt::Debug for MutationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationEngine")
            .field("store", &self.store)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl MutationEngine {
    pub fn new(store: Arc<HierarchyStore>, host: Arc<dyn TabHost>, options: EngineOptions) -> Self {
        Self {
            windows: WindowLifecycle::new(Arc::clone(&host)),
            hub: NotificationHub::new(options.notification_capacity),
            store,
            host,
            options,
        }
    }

    pub fn store(&self) -> &Arc<HierarchyStore> {
        &self.store
    }

    pub fn host(&self) -> &Arc<dyn TabHost> {
        &self.host
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChangeEvent> {
        self.hub.subscribe()
    }

    /// Route a lifecycle event to its handler.
    ///
    /// Errors are logged here; nothing in the tree is worth surfacing to a
    /// user, the next resync heals any inconsistency.
    pub async fn dispatch(&self, event: LifecycleEvent) {
        log::debug!("Lifecycle event: {:?}", event);
        let result = match event {
            LifecycleEvent::TabCreated(tab) => self.on_tab_created(tab).await,
            LifecycleEvent::TabRemoved { tab_id, window_id } => {
                self.on_tab_removed(tab_id, window_id).await
            }
            LifecycleEvent::TabUpdated {
                tab_id,
                window_id,
                pinned,
            } => match pinned {
                Some(pinned) => self.on_pinned_changed(tab_id, pinned, window_id).await,
                None => Ok(()),
            },
            LifecycleEvent::TabReplaced {
                added_tab_id,
                removed_tab_id,
            } => self.on_tab_replaced(added_tab_id, removed_tab_id).await,
            LifecycleEvent::WindowRemoved { window_id } => self.on_window_removed(window_id).await,
            LifecycleEvent::ProcessStart | LifecycleEvent::ProfileStart => self.initialize().await,
        };

        if let Err(e) = result {
            log::error!("Lifecycle handler failed: {}", e);
        }
    }

    /// Answer a request from an observer or UI collaborator
    pub async fn handle_request(&self, request: Request) -> Response {
        match request {
            Request::GetForest { window_id } => Response::Forest {
                window_id,
                entries: self.get_forest(window_id).await.to_pairs(),
            },
            Request::MoveTabs(command) => {
                if let Err(e) = self.move_tabs(command).await {
                    log::error!("Move failed: {}", e);
                }
                Response::Ack
            }
            Request::ActivationSuccessor { window_id, tab_id } => Response::Successor {
                tab_id: self.activation_successor(window_id, tab_id).await,
            },
        }
    }

    /// Rebuild every forest from the host: one root entry per tab, in tab
    /// strip order
    pub async fn initialize(&self) -> Result<(), StoreError> {
        self.store
            .run_exclusive(|guard| async move {
                let windows = self.host.list_windows().await?;

                let mut collection = Collection::new();
                for window in windows {
                    let mut tabs = window.tabs;
                    tabs.sort_by_key(|t| t.index);
                    let forest = Forest::from_pairs(
                        tabs.iter()
                            .filter(|t| !self.is_panel(t))
                            .map(|t| (t.id, None)),
                    );
                    collection.insert(window.id, forest);
                }

                self.store.set(&guard, &collection)?;
                log::info!("Initialized tab hierarchy for {} windows", collection.len());

                for window_id in collection.windows() {
                    self.hub.publish(ChangeEvent::ResyncRequested { window_id });
                }
                Ok(())
            })
            .await
    }

    /// Evict the forest of a closed window
    pub async fn on_window_removed(&self, window_id: WindowId) -> Result<(), StoreError> {
        self.store
            .run_exclusive(|guard| async move {
                let mut collection = self.store.get(&guard);
                if WindowLifecycle::forget(&mut collection, window_id) {
                    self.store.set(&guard, &collection)?;
                    log::debug!("Evicted forest of window {}", window_id);
                }
                Ok(())
            })
            .await
    }

    /// Ordered forest of one window (empty if unknown)
    pub async fn get_forest(&self, window_id: WindowId) -> Forest {
        self.store
            .run_exclusive(|guard| async move {
                self.store
                    .get(&guard)
                    .get(window_id)
                    .cloned()
                    .unwrap_or_default()
            })
            .await
    }

    /// The whole collection
    pub async fn snapshot(&self) -> Collection {
        self.store
            .run_exclusive(|guard| async move { self.store.get(&guard) })
            .await
    }

    /// Tab to activate when `tab_id` closes
    pub async fn activation_successor(&self, window_id: WindowId, tab_id: TabId) -> Option<TabId> {
        self.get_forest(window_id)
            .await
            .activation_successor(tab_id)
    }

    /// Drop all persisted state
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.store
            .run_exclusive(|guard| async move { self.store.clear(&guard) })
            .await
    }

    fn is_panel(&self, tab: &crate::host::HostTab) -> bool {
        self.options
            .panel_url
            .as_deref()
            .is_some_and(|url| tab.shows_url(url))
    }
}
