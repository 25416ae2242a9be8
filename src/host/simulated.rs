//! In-memory host used by tests and the `replay` command.
//!
//! Keeps a browser-like model of windows and tab strips, records every call
//! made through [`TabHost`], and can be told to fail window operations to
//! exercise race handling.

use super::{HostTab, HostWindow, TabHost};
use crate::error::HostError;
use crate::forest::{TabId, WindowId};
use crate::protocol::LifecycleEvent;
use async_trait::async_trait;
use parking_lot::Mutex;

/// A recorded mutating call to the simulated host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    MoveTabs {
        tab_ids: Vec<TabId>,
        window_id: WindowId,
        index: usize,
    },
    RemoveWindow(WindowId),
}

#[derive(Debug, Default)]
struct SimState {
    windows: Vec<(WindowId, Vec<HostTab>)>,
    calls: Vec<HostCall>,
    fail_window_calls: bool,
}

impl SimState {
    fn strip_mut(&mut self, window_id: WindowId) -> Option<&mut Vec<HostTab>> {
        self.windows
            .iter_mut()
            .find(|(id, _)| *id == window_id)
            .map(|(_, tabs)| tabs)
    }

    fn find_tab(&self, tab_id: TabId) -> Option<&HostTab> {
        self.windows
            .iter()
            .flat_map(|(_, tabs)| tabs.iter())
            .find(|t| t.id == tab_id)
    }

    fn take_tab(&mut self, tab_id: TabId) -> Option<HostTab> {
        for (_, tabs) in &mut self.windows {
            if let Some(pos) = tabs.iter().position(|t| t.id == tab_id) {
                let tab = tabs.remove(pos);
                reindex(tabs);
                return Some(tab);
            }
        }
        None
    }
}

fn reindex(tabs: &mut [HostTab]) {
    for (index, tab) in tabs.iter_mut().enumerate() {
        tab.index = index;
    }
}

/// Deterministic stand-in for the browser
#[derive(Debug, Default)]
pub struct SimulatedHost {
    state: Mutex<SimState>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an empty window (no-op if it exists)
    pub fn open_window(&self, window_id: WindowId) {
        let mut state = self.state.lock();
        if state.strip_mut(window_id).is_none() {
            state.windows.push((window_id, Vec::new()));
        }
    }

    /// Add a tab to its window's strip at `tab.index` (clamped) and return
    /// the stored tab. Pinned tabs are kept inside the pinned block.
    pub fn add_tab(&self, tab: HostTab) -> HostTab {
        let mut state = self.state.lock();
        if state.strip_mut(tab.window_id).is_none() {
            state.windows.push((tab.window_id, Vec::new()));
        }
        let Some(strip) = state.strip_mut(tab.window_id) else {
            return tab;
        };
        let pinned_count = strip.iter().filter(|t| t.pinned).count();
        let index = if tab.pinned {
            tab.index.min(pinned_count)
        } else {
            tab.index.clamp(pinned_count, strip.len())
        };
        strip.insert(index, tab);
        reindex(strip);
        strip[index].clone()
    }

    /// Append a tab at the end of the window's strip
    pub fn push_tab(&self, tab: HostTab) -> HostTab {
        self.add_tab(HostTab {
            index: usize::MAX,
            ..tab
        })
    }

    /// Close a tab; returns the window it lived in
    pub fn close_tab(&self, tab_id: TabId) -> Option<WindowId> {
        self.state.lock().take_tab(tab_id).map(|t| t.window_id)
    }

    /// Toggle the pinned flag, moving the tab to the pinned boundary like
    /// browsers do
    pub fn set_pinned(&self, tab_id: TabId, pinned: bool) -> Option<HostTab> {
        let mut state = self.state.lock();
        let mut tab = state.take_tab(tab_id)?;
        drop(state);
        tab.pinned = pinned;
        let pinned_count = self
            .state
            .lock()
            .windows
            .iter()
            .find(|(id, _)| *id == tab.window_id)
            .map(|(_, tabs)| tabs.iter().filter(|t| t.pinned).count())
            .unwrap_or(0);
        tab.index = pinned_count;
        Some(self.add_tab(tab))
    }

    /// Swap a tab's id in place (discard / reload)
    pub fn replace_tab(&self, old_id: TabId, new_id: TabId) -> Option<HostTab> {
        let mut state = self.state.lock();
        for (_, tabs) in &mut state.windows {
            if let Some(tab) = tabs.iter_mut().find(|t| t.id == old_id) {
                tab.id = new_id;
                return Some(tab.clone());
            }
        }
        None
    }

    /// Drop a window and all of its tabs
    pub fn close_window(&self, window_id: WindowId) {
        self.state.lock().windows.retain(|(id, _)| *id != window_id);
    }

    /// Make `window_exists` / `remove_window` fail as if the window raced away
    pub fn fail_window_calls(&self, fail: bool) {
        self.state.lock().fail_window_calls = fail;
    }

    /// Recorded mutating calls, oldest first
    pub fn calls(&self) -> Vec<HostCall> {
        self.state.lock().calls.clone()
    }

    /// Pinned state by tab id, for invariant checks
    pub fn is_pinned(&self, tab_id: TabId) -> bool {
        self.state
            .lock()
            .find_tab(tab_id)
            .map(|t| t.pinned)
            .unwrap_or(false)
    }

    /// Bring the simulated browser in line with an event before the store
    /// sees it, so host queries made while handling it answer consistently.
    pub fn apply_event(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::TabCreated(tab) => {
                self.add_tab(tab.clone());
            }
            LifecycleEvent::TabRemoved { tab_id, .. } => {
                self.close_tab(*tab_id);
            }
            LifecycleEvent::TabUpdated {
                tab_id,
                pinned: Some(pinned),
                ..
            } => {
                self.set_pinned(*tab_id, *pinned);
            }
            LifecycleEvent::TabUpdated { pinned: None, .. } => {}
            LifecycleEvent::TabReplaced {
                added_tab_id,
                removed_tab_id,
            } => {
                self.replace_tab(*removed_tab_id, *added_tab_id);
            }
            LifecycleEvent::WindowRemoved { window_id } => self.close_window(*window_id),
            LifecycleEvent::ProcessStart | LifecycleEvent::ProfileStart => {}
        }
    }
}

#[async_trait]
impl TabHost for SimulatedHost {
    async fn list_windows(&self) -> Result<Vec<HostWindow>, HostError> {
        Ok(self
            .state
            .lock()
            .windows
            .iter()
            .map(|(id, tabs)| HostWindow {
                id: *id,
                tabs: tabs.clone(),
            })
            .collect())
    }

    async fn tab(&self, tab_id: TabId) -> Result<HostTab, HostError> {
        self.state
            .lock()
            .find_tab(tab_id)
            .cloned()
            .ok_or(HostError::TabNotFound(tab_id))
    }

    async fn query_tabs(&self, window_id: WindowId) -> Result<Vec<HostTab>, HostError> {
        self.state
            .lock()
            .strip_mut(window_id)
            .map(|tabs| tabs.clone())
            .ok_or(HostError::WindowNotFound(window_id))
    }

    async fn move_tabs(
        &self,
        tab_ids: &[TabId],
        window_id: WindowId,
        index: usize,
    ) -> Result<(), HostError> {
        let mut state = self.state.lock();
        state.calls.push(HostCall::MoveTabs {
            tab_ids: tab_ids.to_vec(),
            window_id,
            index,
        });
        if state.strip_mut(window_id).is_none() {
            return Err(HostError::WindowNotFound(window_id));
        }

        let mut moving = Vec::with_capacity(tab_ids.len());
        for tab_id in tab_ids {
            if let Some(mut tab) = state.take_tab(*tab_id) {
                tab.window_id = window_id;
                moving.push(tab);
            }
        }
        if let Some(strip) = state.strip_mut(window_id) {
            let at = index.min(strip.len());
            strip.splice(at..at, moving);
            reindex(strip);
        }
        Ok(())
    }

    async fn window_exists(&self, window_id: WindowId) -> Result<bool, HostError> {
        let mut state = self.state.lock();
        if state.fail_window_calls {
            return Err(HostError::WindowNotFound(window_id));
        }
        Ok(state.strip_mut(window_id).is_some())
    }

    async fn remove_window(&self, window_id: WindowId) -> Result<(), HostError> {
        let mut state = self.state.lock();
        state.calls.push(HostCall::RemoveWindow(window_id));
        if state.fail_window_calls {
            return Err(HostError::WindowNotFound(window_id));
        }
        state.windows.retain(|(id, _)| *id != window_id);
        Ok(())
    }
}
