//! Window records and the state reported by window content.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::host::{HostHandle, WindowOptions};

/// Process-unique window id, assigned when the window is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(u64);

impl WindowId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a window.
///
/// `Opening -> Open -> CloseRequested -> ReadyToClose -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowState {
    Opening,
    Open,
    /// `before-close` was sent; waiting for the content to acknowledge.
    CloseRequested,
    ReadyToClose,
    Closed,
}

/// Editing status last reported by the window content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditState {
    pub modified: bool,
    pub undo: Option<String>,
    pub redo: Option<String>,
}

/// Category of the tab active in a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TabKind {
    Instrument,
    Project,
    Home,
    History,
    ShortcutsAndGroups,
    Extensions,
    Settings,
    Notebooks,
}

/// One open window.
///
/// The record owns the host handle; dropping the record out of the registry
/// always goes together with destroying the handle.
#[derive(Debug)]
pub struct WindowRecord {
    pub(crate) id: WindowId,
    pub(crate) locator: String,
    pub(crate) handle: HostHandle,
    pub(crate) ready_to_close: bool,
    pub(crate) focused: bool,
    pub(crate) edit_state: EditState,
    pub(crate) active_tab: Option<TabKind>,
    pub(crate) lifecycle: WindowState,
    pub(crate) close_requested_at: Option<Instant>,
    pub(crate) options: WindowOptions,
}

impl WindowRecord {
    pub(crate) fn new(
        id: WindowId,
        locator: String,
        handle: HostHandle,
        options: WindowOptions,
    ) -> Self {
        Self {
            id,
            locator,
            handle,
            ready_to_close: false,
            focused: false,
            edit_state: EditState::default(),
            active_tab: None,
            lifecycle: WindowState::Opening,
            close_requested_at: None,
            options,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn handle(&self) -> &HostHandle {
        &self.handle
    }

    pub fn is_ready_to_close(&self) -> bool {
        self.ready_to_close
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn state(&self) -> WindowState {
        self.lifecycle
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            id: self.id,
            locator: self.locator.clone(),
            state: self.lifecycle,
            ready_to_close: self.ready_to_close,
            focused: self.focused,
            edit_state: self.edit_state.clone(),
            active_tab: self.active_tab,
            options: self.options.clone(),
        }
    }
}

/// A copy of a record's observable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowSnapshot {
    pub id: WindowId,
    pub locator: String,
    pub state: WindowState,
    pub ready_to_close: bool,
    pub focused: bool,
    pub edit_state: EditState,
    pub active_tab: Option<TabKind>,
    pub options: WindowOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_kind_wire_names() {
        let tab: TabKind = serde_json::from_str("\"shortcuts-and-groups\"").unwrap();
        assert_eq!(tab, TabKind::ShortcutsAndGroups);
        assert_eq!(serde_json::to_string(&TabKind::Notebooks).unwrap(), "\"notebooks\"");
    }

    #[test]
    fn test_edit_state_defaults_missing_fields() {
        let state: EditState = serde_json::from_str(r#"{"modified": true}"#).unwrap();
        assert!(state.modified);
        assert_eq!(state.undo, None);
    }

    #[test]
    fn test_new_record_is_opening_and_not_ready() {
        let record = WindowRecord::new(
            WindowId::new(1),
            "home".into(),
            HostHandle::new(7),
            WindowOptions::default(),
        );
        assert_eq!(record.state(), WindowState::Opening);
        assert!(!record.is_ready_to_close());
        assert!(!record.is_focused());
        assert_eq!(record.id().to_string(), "#1");
    }
}
