//! Boundary to the host browser's tab/window control surface.
//!
//! The store never talks to the browser directly; it goes through
//! [`TabHost`]. Real deployments bridge this trait to the extension APIs,
//! tests and the `replay` command use [`SimulatedHost`].

pub mod simulated;

pub use simulated::{HostCall, SimulatedHost};

use crate::error::HostError;
use crate::forest::{TabId, WindowId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Host-side view of a tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostTab {
    pub id: TabId,
    pub window_id: WindowId,
    /// Position in the host's own tab strip
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub pinned: bool,
    /// Tab credited with opening this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_tab_id: Option<TabId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// URL still loading when the tab was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_url: Option<String>,
    #[serde(default)]
    pub active: bool,
}

impl HostTab {
    pub fn new(id: TabId, window_id: WindowId) -> Self {
        Self {
            id,
            window_id,
            index: 0,
            pinned: false,
            opener_tab_id: None,
            url: None,
            pending_url: None,
            active: false,
        }
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn opened_by(mut self, opener: TabId) -> Self {
        self.opener_tab_id = Some(opener);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Whether either the committed or the pending URL is `url`
    pub fn shows_url(&self, url: &str) -> bool {
        self.url.as_deref() == Some(url) || self.pending_url.as_deref() == Some(url)
    }
}

/// A normal (non-popup, non-devtools) window and its tabs in index order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostWindow {
    pub id: WindowId,
    pub tabs: Vec<HostTab>,
}

/// The host browser's tab and window operations.
///
/// Every call may race with the user; callers decide which failures are
/// expected and swallow them.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// All normal windows with their tabs
    async fn list_windows(&self) -> Result<Vec<HostWindow>, HostError>;

    /// Current state of one tab
    async fn tab(&self, tab_id: TabId) -> Result<HostTab, HostError>;

    /// Tabs of one window in index order
    async fn query_tabs(&self, window_id: WindowId) -> Result<Vec<HostTab>, HostError>;

    /// Move `tab_ids` (in order) into `window_id` starting at `index`
    async fn move_tabs(
        &self,
        tab_ids: &[TabId],
        window_id: WindowId,
        index: usize,
    ) -> Result<(), HostError>;

    /// Whether the window still exists
    async fn window_exists(&self, window_id: WindowId) -> Result<bool, HostError>;

    /// Close a window
    async fn remove_window(&self, window_id: WindowId) -> Result<(), HostError>;
}
