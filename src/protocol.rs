//! Message contracts between the store and its collaborators.
//!
//! Transport-agnostic: the types are serde-tagged with `type` so they can be
//! carried as JSON (one object per line for `tabstree replay`).

use crate::forest::{TabId, WindowId};
use crate::host::HostTab;
use serde::{Deserialize, Serialize};

/// Lifecycle notifications coming from the host tab/window system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A tab was created
    TabCreated(HostTab),

    /// A tab was closed
    TabRemoved { tab_id: TabId, window_id: WindowId },

    /// Tab properties changed; only the pinned flag matters to the store
    TabUpdated {
        tab_id: TabId,
        window_id: WindowId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pinned: Option<bool>,
    },

    /// The host swapped a tab's id (discard / reactivation)
    TabReplaced {
        added_tab_id: TabId,
        removed_tab_id: TabId,
    },

    /// A window was closed
    WindowRemoved { window_id: WindowId },

    /// The process started (install or upgrade)
    ProcessStart,

    /// A browser profile with the extension started
    ProfileStart,
}

/// Drag/drop or programmatic relocation of a contiguous run of tabs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTabs {
    pub window_id_orig: WindowId,
    pub window_id_dest: WindowId,
    /// Root of the moved run
    pub tab_id_moving: TabId,
    /// Tab the run is dropped on
    pub tab_id_target: TabId,
    /// Drop above the target (as its sibling) instead of below (as its child)
    pub moving_above: bool,
    /// Number of consecutive entries the caller believes make up the run
    pub items_number: usize,
    /// The caller will trigger its own resync
    #[serde(default)]
    pub sync_bypass: bool,
}

/// Requests observers and UI collaborators send to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ordered `(tab, parent)` pairs of one window
    GetForest { window_id: WindowId },

    /// Relocate tabs
    MoveTabs(MoveTabs),

    /// Which tab should become active if `tab_id` closes
    ActivationSuccessor { window_id: WindowId, tab_id: TabId },
}

/// Replies to [`Request`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Forest of the requested window; empty if the window is unknown
    Forest {
        window_id: WindowId,
        entries: Vec<(TabId, Option<TabId>)>,
    },

    /// Suggested tab to activate, if any
    Successor { tab_id: Option<TabId> },

    /// Command accepted and applied (or skipped as stale)
    Ack,
}
