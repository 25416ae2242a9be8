//! Change notifications broadcast after each mutation.
//!
//! Publishing is fire-and-forget: having no subscriber is normal. Observers
//! keep their own replica of a window's forest and either patch it from the
//! incremental events or reconcile it fully on [`ChangeEvent::ResyncRequested`].

pub mod replica;

pub use replica::{ForestReplica, ReconcileReport, ReplicaObserver, ReplicaRow};

use crate::forest::{TabId, WindowId};
use crate::host::HostTab;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Typed notification scoped to one window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// A tab was added to the window's forest
    TabInserted { window_id: WindowId, tab: HostTab },

    /// A tab left the window's forest
    TabRemoved { window_id: WindowId, tab_id: TabId },

    /// A tab kept its place under a new id
    TabReplaced {
        window_id: WindowId,
        old_id: TabId,
        new_id: TabId,
    },

    /// Enough changed that observers should reconcile from scratch
    ResyncRequested { window_id: WindowId },
}

impl ChangeEvent {
    pub fn window_id(&self) -> WindowId {
        match self {
            ChangeEvent::TabInserted { window_id, .. }
            | ChangeEvent::TabRemoved { window_id, .. }
            | ChangeEvent::TabReplaced { window_id, .. }
            | ChangeEvent::ResyncRequested { window_id } => *window_id,
        }
    }
}

/// Broadcast hub handing every subscriber its own copy of each event
#[derive(Debug, Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<ChangeEvent>,
}

impl NotificationHub {
    /// `capacity` bounds how far a slow subscriber may fall behind before it
    /// is told it lagged
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Send to whoever is listening; nobody listening is not an error
    pub fn publish(&self, event: ChangeEvent) {
        log::debug!("Publishing {:?}", event);
        if self.sender.send(event).is_err() {
            log::trace!("No subscribers for change event");
        }
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(tabstree_config::defaults::notification_capacity())
    }
}
