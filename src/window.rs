//! Window lifecycle: evicting forests and closing drained windows.
//!
//! Closing a window races with the user closing it too, so every host call
//! here tolerates the window having already gone.

use crate::forest::{Collection, WindowId};
use crate::host::TabHost;
use std::sync::Arc;

#[derive(Clone)]
pub struct WindowLifecycle {
    host: Arc<dyn TabHost>,
}

impl std::fmt::Debug for WindowLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowLifecycle").finish_non_exhaustive()
    }
}

impl WindowLifecycle {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self { host }
    }

    /// Close `window_id` if the host still knows it.
    ///
    /// Returns `true` only when this call closed the window. Host failures
    /// mean someone else got there first and are logged, never returned.
    pub async fn close_if_present(&self, window_id: WindowId) -> bool {
        match self.host.window_exists(window_id).await {
            Ok(true) => match self.host.remove_window(window_id).await {
                Ok(()) => {
                    log::info!("Closed empty window {}", window_id);
                    true
                }
                Err(e) => {
                    log::debug!("Window {} went away before close: {}", window_id, e);
                    false
                }
            },
            Ok(false) => false,
            Err(e) => {
                log::debug!("Could not query window {}: {}", window_id, e);
                false
            }
        }
    }

    /// Drop the forest of a window. Returns whether one existed.
    pub fn forget(collection: &mut Collection, window_id: WindowId) -> bool {
        collection.remove(window_id).is_some()
    }
}
